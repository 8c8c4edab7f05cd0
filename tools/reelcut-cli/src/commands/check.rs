//! Check system capabilities.

use std::process::Command;

use reelcut_render_engine::ffmpeg::command_exists;

pub fn run() -> anyhow::Result<()> {
    println!("Reelcut System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg = command_exists("ffmpeg");
    let ffprobe = command_exists("ffprobe");
    report("ffmpeg", ffmpeg, "install ffmpeg and make sure it is on PATH");
    report("ffprobe", ffprobe, "ffprobe ships with ffmpeg");

    let drawtext = ffmpeg && has_filter("drawtext");
    report(
        "drawtext filter",
        drawtext,
        "labels need an ffmpeg built with libfreetype",
    );

    println!();
    if ffmpeg && ffprobe && drawtext {
        println!("All required capabilities are available. Reelcut is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
    }

    Ok(())
}

fn report(name: &str, ok: bool, fix: &str) {
    if ok {
        println!("[OK] {name}");
    } else {
        println!("[MISSING] {name}: {fix}");
    }
}

fn has_filter(name: &str) -> bool {
    Command::new("ffmpeg")
        .args(["-hide_banner", "-filters"])
        .output()
        .map(|out| {
            String::from_utf8_lossy(&out.stdout)
                .lines()
                .any(|line| line.split_whitespace().nth(1) == Some(name))
        })
        .unwrap_or(false)
}
