//! Show source media information.

use std::path::PathBuf;

use reelcut_render_engine::{probe_source, resolve_orientation};

pub async fn run(source: PathBuf) -> anyhow::Result<()> {
    let media = probe_source(&source).await?;

    println!("Source: {}", media.path.display());
    println!("  Duration: {:.3}s", media.duration.as_secs_f64());
    if !media.start_offset.is_zero() {
        println!(
            "  First frame at: {:.3}s (spans below are measured from it)",
            media.start_offset.as_secs_f64()
        );
    }
    println!();

    if let Some(v) = &media.video {
        println!("Video (stream {}):", v.stream_index);
        println!("  Codec: {}", v.codec);
        println!("  Coded size: {}x{}", v.natural_width, v.natural_height);
        println!("  Frame rate: {} ({:.3} fps)", v.frame_rate, v.frame_rate.as_f64());
        println!(
            "  Span: {:.3}s .. {:.3}s",
            v.time_range.start.as_secs_f64(),
            v.time_range.end().as_secs_f64()
        );
        match resolve_orientation(&media) {
            Ok(resolved) => println!(
                "  Display: {}x{} ({})",
                resolved.render_target.width,
                resolved.render_target.height,
                resolved.orientation.as_str()
            ),
            Err(e) => println!("  [WARN] Display transform unusable: {e}"),
        }
    }

    println!();
    match &media.audio {
        Some(a) => {
            println!("Audio (stream {}):", a.stream_index);
            println!("  Codec: {}", a.codec);
            println!("  Sample rate: {} Hz, {} channels", a.sample_rate, a.channels);
            println!(
                "  Span: {:.3}s .. {:.3}s",
                a.time_range.start.as_secs_f64(),
                a.time_range.end().as_secs_f64()
            );
        }
        None => println!("Audio: none (highlights will be silent)"),
    }

    Ok(())
}
