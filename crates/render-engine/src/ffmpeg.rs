//! ffmpeg render backend.
//!
//! One ffmpeg invocation per export. The filter graph trims each segment
//! out of the source, applies the display orientation, concatenates, and
//! burns in the labels:
//!
//! ```text
//! [0:v] trim,setpts,<orient> ─┐
//! [0:a] atrim,asetpts ────────┤
//!   ...                       ├─► concat ─► drawtext × N ─► format ─► [vout]
//! anullsrc (silence fill) ────┘                                       [aout]
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use reelcut_common::config::{ExportProfile, OverlayStyle};
use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_highlight_model::{MediaTime, TimeRange};

use crate::compositor::{CompositionTrack, TrackEdit};
use crate::export::{ExportJob, ExportProgress, ExportStage, ProgressCallback, RenderBackend};
use crate::orientation::Orientation;
use crate::overlay::OverlayAnnotation;

const STALL_WARNING_SECS: u64 = 10;

/// Renders export jobs with the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    binary: PathBuf,
    debug_report: bool,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegBackend {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            debug_report: false,
        }
    }

    /// Use a specific ffmpeg executable.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Write the full command line next to the destination before rendering.
    pub fn with_debug_report(mut self, enabled: bool) -> Self {
        self.debug_report = enabled;
        self
    }

    fn write_debug_report(&self, job: &ExportJob, args: &[String]) {
        let path = job.destination.with_extension("ffmpeg-debug.txt");
        let mut report = String::new();
        let _ = writeln!(report, "source: {}", job.source.display());
        let _ = writeln!(report, "destination: {}", job.destination.display());
        let _ = writeln!(
            report,
            "render_target: {}x{} @ {}",
            job.render_target.width, job.render_target.height, job.render_target.frame_rate
        );
        let _ = writeln!(report, "segments: {}", job.composition.segment_count());
        let _ = writeln!(report, "total_frames: {}", job.total_frames());
        let _ = writeln!(report, "\n{} {}", self.binary.display(), args.join(" "));

        match std::fs::write(&path, report) {
            Ok(()) => tracing::info!(path = %path.display(), "Wrote ffmpeg debug report"),
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "Failed to write ffmpeg debug report")
            }
        }
    }
}

#[async_trait]
impl RenderBackend for FfmpegBackend {
    async fn render(
        &self,
        job: &ExportJob,
        progress: Option<&ProgressCallback>,
    ) -> ReelcutResult<()> {
        let args = build_ffmpeg_args(job)?;
        if self.debug_report {
            self.write_debug_report(job, &args);
        }

        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ReelcutError::export(format!("Failed to start ffmpeg: {e}")))?;

        let total_frames = job.total_frames();
        let expected_secs = job.composition.duration.as_secs_f64();
        tracing::info!(
            pid = child.id(),
            args_len = args.len(),
            total_frames,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ReelcutError::export("Failed to capture ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelcutError::export("Failed to capture ffmpeg stderr"))?;

        // ffmpeg blocks once the stderr pipe fills up.
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            match stderr.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let started = std::time::Instant::now();
        let mut lines = BufReader::new(stdout).lines();
        let mut state = ProgressState::default();
        let mut last_secs = 0.0f64;
        let mut last_advance = std::time::Instant::now();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| ReelcutError::export(format!("Failed reading ffmpeg progress: {e}")))?
        {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            state.update(key, value);
            if key != "progress" {
                continue;
            }

            if state.out_time_secs > last_secs + 0.001 {
                last_secs = state.out_time_secs;
                last_advance = std::time::Instant::now();
            } else if last_advance.elapsed().as_secs() >= STALL_WARNING_SECS {
                tracing::warn!(
                    out_time_secs = state.out_time_secs,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for 10s"
                );
                last_advance = std::time::Instant::now();
            }

            if let Some(cb) = progress {
                cb(progress_report(
                    &state,
                    total_frames,
                    expected_secs,
                    started.elapsed().as_secs_f64(),
                ));
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ReelcutError::export(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .await
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(ReelcutError::export(format!(
                "ffmpeg export failed (status {status}): {}",
                last_lines(&stderr_output, 20)
            )));
        }

        tracing::info!(
            elapsed_secs = started.elapsed().as_secs_f64(),
            out_time_secs = state.out_time_secs,
            "ffmpeg finished"
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Complete ffmpeg argument list for `job`.
pub fn build_ffmpeg_args(job: &ExportJob) -> ReelcutResult<Vec<String>> {
    let graph = build_filter_graph(job)?;
    let has_audio = job.composition.audio.is_some();

    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        "-y".into(),
        // Orientation is applied explicitly in the graph.
        "-noautorotate".into(),
        "-i".into(),
        job.source.to_string_lossy().into_owned(),
        "-filter_complex".into(),
        graph,
        "-map".into(),
        "[vout]".into(),
    ];
    if has_audio {
        args.extend(["-map".into(), "[aout]".into()]);
    }
    args.extend([
        "-r".into(),
        job.render_target.frame_rate.to_string(),
    ]);
    args.extend(codec_args_for_profile(&job.profile, has_audio));
    args.extend([
        "-progress".into(),
        "pipe:1".into(),
        "-nostats".into(),
        "-f".into(),
        "mp4".into(),
        job.staging_path.to_string_lossy().into_owned(),
    ]);
    Ok(args)
}

/// The `-filter_complex` description for `job`.
pub fn build_filter_graph(job: &ExportJob) -> ReelcutResult<String> {
    let composition = &job.composition;
    if composition.video.edits.is_empty() {
        return Err(ReelcutError::config("Composition has no video edits"));
    }

    let orientation = composition
        .instructions
        .first()
        .map(|ins| ins.orientation)
        .unwrap_or(Orientation::Identity);
    let orient = orientation_filter(orientation)
        .map(|f| format!(",{f}"))
        .unwrap_or_default();

    let mut chains: Vec<String> = Vec::new();
    let video_stream = composition.video.source_stream;
    for (i, edit) in composition.video.edits.iter().enumerate() {
        let TrackEdit::Media { source, .. } = edit else {
            return Err(ReelcutError::config(format!(
                "Video edit {i} has no media to copy"
            )));
        };
        let (start, end) = trim_bounds(source, composition.source_offset);
        chains.push(format!(
            "[0:{video_stream}]trim=start={start}:end={end},setpts=PTS-STARTPTS{orient}[v{i}]"
        ));
    }

    if let Some(audio) = &composition.audio {
        chains.extend(audio_chains(
            audio,
            composition.source_offset,
            job.profile.audio_sample_rate,
        ));
    }

    let n = composition.video.edits.len();
    let mut concat_inputs = String::new();
    for i in 0..n {
        concat_inputs.push_str(&format!("[v{i}]"));
        if composition.audio.is_some() {
            concat_inputs.push_str(&format!("[a{i}]"));
        }
    }
    if composition.audio.is_some() {
        chains.push(format!(
            "{concat_inputs}concat=n={n}:v=1:a=1[vcat][aout]"
        ));
    } else {
        chains.push(format!("{concat_inputs}concat=n={n}:v=1:a=0[vcat]"));
    }

    let mut tail: Vec<String> = job
        .overlays
        .annotations
        .iter()
        .map(|annotation| drawtext_filter(annotation, &job.overlays.style))
        .collect();
    tail.push("format=yuv420p".to_string());
    chains.push(format!("[vcat]{}[vout]", tail.join(",")));

    Ok(chains.join(";"))
}

/// `trim`/`atrim` bounds for `source` on ffmpeg's input clock, which starts
/// at the container start rather than the first video frame.
fn trim_bounds(source: &TimeRange, offset: MediaTime) -> (String, String) {
    let offset = offset.as_secs_f64();
    (
        secs(source.start.as_secs_f64() + offset),
        secs(source.end().as_secs_f64() + offset),
    )
}

fn audio_chains(track: &CompositionTrack, offset: MediaTime, sample_rate: u32) -> Vec<String> {
    let stream = track.source_stream;
    track
        .edits
        .iter()
        .enumerate()
        .map(|(i, edit)| match edit {
            TrackEdit::Media { source, .. } => {
                let (start, end) = trim_bounds(source, offset);
                format!(
                    "[0:{stream}]atrim=start={start}:end={end},asetpts=PTS-STARTPTS,\
                     aresample={sample_rate},aformat=sample_rates={sample_rate}:channel_layouts=stereo[a{i}]"
                )
            }
            TrackEdit::Empty { output, .. } => format!(
                "anullsrc=r={sample_rate}:cl=stereo,atrim=duration={dur}[a{i}]",
                dur = secs(output.duration.as_secs_f64()),
            ),
        })
        .collect()
}

/// Filter that turns coded frames upright.
pub fn orientation_filter(orientation: Orientation) -> Option<&'static str> {
    match orientation {
        Orientation::Identity => None,
        Orientation::Rotate90 => Some("transpose=clock"),
        Orientation::Rotate180 => Some("hflip,vflip"),
        Orientation::Rotate270 => Some("transpose=cclock"),
        Orientation::FlipHorizontal => Some("hflip"),
        Orientation::FlipVertical => Some("vflip"),
        Orientation::Transpose => Some("transpose=cclock_flip"),
        Orientation::AntiTranspose => Some("transpose=clock_flip"),
    }
}

fn drawtext_filter(annotation: &OverlayAnnotation, style: &OverlayStyle) -> String {
    let begin = annotation.begin_time.as_secs_f64();
    let duration = annotation.duration.as_secs_f64();
    let points: Vec<(f64, f64)> = annotation
        .keyframes
        .iter()
        .map(|k| (begin + k.fraction * duration, k.opacity))
        .collect();

    let font = match &style.font_file {
        Some(path) => format!("fontfile={}", quote_option(&path.to_string_lossy())),
        None => format!("font={}", quote_option(&style.font_family)),
    };

    format!(
        "drawtext={font}:expansion=none:text={text}:fontsize={size:.2}:fontcolor={color}:\
         x={x:.2}:y={y:.2}:alpha='clip({alpha},0,1)':enable='between(t,{start},{end})'",
        text = quote_option(&annotation.text),
        size = style.font_size,
        color = quote_option(&style.color),
        x = annotation.frame.x,
        y = annotation.frame.y,
        alpha = build_piecewise_expr(points),
        start = secs(begin),
        end = secs(begin + duration),
    )
}

/// Quote a filter option value so `:` `,` and `'` survive both parsing levels.
fn quote_option(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "'\\''");
    format!("'{escaped}'")
}

fn secs(value: f64) -> String {
    format!("{value:.6}")
}

/// Piecewise-linear expression in `t` through `points`.
fn build_piecewise_expr(mut points: Vec<(f64, f64)>) -> String {
    if points.is_empty() {
        return "0".to_string();
    }

    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Keep the later value at coincident times so steps stay sharp.
    let mut sanitized: Vec<(f64, f64)> = Vec::with_capacity(points.len());
    for (t, v) in points {
        match sanitized.last_mut() {
            Some((last_t, last_v)) if (t - *last_t).abs() < 1e-6 => {
                *last_t = t;
                *last_v = v;
            }
            _ => sanitized.push((t, v)),
        }
    }

    let Some(&(_, last_v)) = sanitized.last() else {
        return "0".to_string();
    };
    let mut expr = format!("{last_v:.6}");
    for pair in sanitized.windows(2).rev() {
        let (t0, v0) = pair[0];
        let (t1, v1) = pair[1];
        let interp = format!(
            "{v0:.6}+({delta:.6})*(t-{t0:.6})/{dur:.6}",
            delta = v1 - v0,
            dur = t1 - t0
        );
        expr = format!("if(lt(t,{t1:.6}),{interp},{expr})");
    }

    expr
}

fn codec_args_for_profile(profile: &ExportProfile, with_audio: bool) -> Vec<String> {
    let mut args = vec![
        "-c:v".to_string(),
        profile.video_codec.clone(),
        "-preset".to_string(),
        profile.preset.clone(),
        "-crf".to_string(),
        profile.crf.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
    ];
    if with_audio {
        args.extend([
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            format!("{}k", profile.audio_bitrate_kbps.max(64)),
        ]);
    }
    args.extend(["-movflags".to_string(), "+faststart".to_string()]);
    args
}

/// Whether `binary` resolves to an executable on `PATH`, or is one when it
/// names a path. Nothing is spawned.
pub fn command_exists(binary: impl AsRef<Path>) -> bool {
    let binary = binary.as_ref();
    if binary.as_os_str().is_empty() {
        return false;
    }
    if binary.components().count() > 1 {
        return is_executable(binary);
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| is_executable(&dir.join(binary))))
        .unwrap_or(false)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

fn last_lines(output: &str, count: usize) -> String {
    let lines: Vec<&str> = output.trim().lines().collect();
    lines[lines.len().saturating_sub(count)..].join("\n")
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // Despite the name, ffmpeg reports microseconds here too.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(
    state: &ProgressState,
    total_frames: u64,
    expected_duration_secs: f64,
    elapsed_secs: f64,
) -> ExportProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    let frames_rendered = (progress * total_frames as f64).round() as u64;
    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    ExportProgress {
        progress: if state.complete { 1.0 } else { progress },
        frames_rendered,
        total_frames,
        eta_secs,
        stage: if state.complete {
            ExportStage::Finalizing
        } else {
            ExportStage::Rendering
        },
    }
}
