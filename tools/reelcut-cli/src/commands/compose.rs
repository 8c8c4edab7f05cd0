//! Export a highlight reel.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;

use reelcut_common::config::AppConfig;
use reelcut_highlight_model::{load_highlights, HighlightRecord};
use reelcut_render_engine::{
    plan_highlights, probe_source, CompositionNote, ExportOutcome, ExportProgress,
    FfmpegBackend, HighlightExporter, NormalizationNote,
};

pub async fn run(
    config: &AppConfig,
    source: PathBuf,
    highlights: PathBuf,
    output: Option<PathBuf>,
    title: Option<String>,
    debug_report: bool,
) -> anyhow::Result<()> {
    let intervals = load_highlights(&highlights)
        .with_context(|| format!("Failed to load highlights from {}", highlights.display()))?;
    let media = probe_source(&source).await?;
    let plan = plan_highlights(&media, &intervals, &config.overlay)?;

    let output_path = output.unwrap_or_else(|| default_output(config, &source));
    let title = title.unwrap_or_else(|| stem(&source));

    println!("Composing highlights from: {}", source.display());
    println!("  Output: {}", output_path.display());
    println!(
        "  Segments: {} ({:.2}s)",
        plan.segments.len(),
        plan.total_duration().as_secs_f64()
    );
    println!(
        "  Render size: {}x{} @ {} fps ({})",
        plan.orientation.render_target.width,
        plan.orientation.render_target.height,
        plan.orientation.render_target.frame_rate,
        plan.orientation.orientation.as_str()
    );
    for note in &plan.notes {
        match note {
            NormalizationNote::Reordered { first_out_of_order } => println!(
                "  [WARN] Highlights were out of order (first at #{first_out_of_order}); sorted"
            ),
        }
    }
    for note in &plan.composition.notes {
        match note {
            CompositionNote::AudioOmitted { label, reason, .. } => {
                println!("  [WARN] Segment {label} has no audio: {reason}")
            }
        }
    }

    let backend = FfmpegBackend::new().with_debug_report(debug_report);
    let progress_cb = Box::new(|p: ExportProgress| {
        print!(
            "\r  Progress: {:.1}% ({}/{} frames, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.frames_rendered,
            p.total_frames,
            p.eta_secs,
        );
        let _ = std::io::stdout().flush();
    });
    let exporter =
        HighlightExporter::new(Box::new(backend), config.export.clone()).with_progress(progress_cb);

    let cancel = exporter.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling export");
            cancel.cancel();
        }
    });

    match plan.export_with(&exporter, &output_path).await {
        ExportOutcome::Success {
            output,
            duration,
            segment_count,
        } => {
            println!(
                "\nExport complete: {} ({segment_count} segments, {:.2}s)",
                output.display(),
                duration.as_secs_f64()
            );

            let record_path = HighlightRecord::sidecar_path(&output);
            plan.record(title, &output)
                .save(&record_path)
                .with_context(|| format!("Failed to write {}", record_path.display()))?;
            println!("  Record: {}", record_path.display());
            Ok(())
        }
        ExportOutcome::Failure {
            kind,
            reason,
            partial_artifact_cleaned,
        } => {
            println!();
            if !partial_artifact_cleaned {
                tracing::warn!("A partial output file may remain next to the destination");
            }
            anyhow::bail!("Export failed ({kind}): {reason}")
        }
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "highlights".to_string())
}

fn default_output(config: &AppConfig, source: &Path) -> PathBuf {
    config
        .output_dir
        .join(format!("{}-highlights.mp4", stem(source)))
}
