//! Print the edit plan without encoding.

use std::path::PathBuf;

use anyhow::Context;

use reelcut_common::config::AppConfig;
use reelcut_highlight_model::load_highlights;
use reelcut_render_engine::{plan_highlights, probe_source};

pub async fn run(config: &AppConfig, source: PathBuf, highlights: PathBuf) -> anyhow::Result<()> {
    let intervals = load_highlights(&highlights)
        .with_context(|| format!("Failed to load highlights from {}", highlights.display()))?;
    let media = probe_source(&source).await?;
    let plan = plan_highlights(&media, &intervals, &config.overlay)?;

    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
