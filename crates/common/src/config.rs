//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where exported highlight videos land by default.
    pub output_dir: PathBuf,

    /// Label overlay appearance.
    #[serde(default)]
    pub overlay: OverlayStyle,

    /// Encoder settings for the single export profile.
    #[serde(default)]
    pub export: ExportProfile,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Appearance of the per-segment label burned into the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayStyle {
    /// Font size in output pixels.
    pub font_size: f64,

    /// Distance from the top and right edges, in output pixels.
    pub margin: f64,

    /// Font family handed to the renderer (fontconfig name).
    pub font_family: String,

    /// Optional explicit font file; takes precedence over `font_family`.
    #[serde(default)]
    pub font_file: Option<PathBuf>,

    /// Text color (ffmpeg color syntax).
    pub color: String,

    /// Upper bound for the fade-in and fade-out windows, in seconds.
    pub max_fade_secs: f64,
}

/// Fixed high-quality export profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportProfile {
    /// ffmpeg video encoder.
    pub video_codec: String,

    /// Constant rate factor.
    pub crf: u32,

    /// Encoder preset.
    pub preset: String,

    /// Audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,

    /// Sample rate used for silence fills.
    pub audio_sample_rate: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reelcut=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: dirs_default_output(),
            overlay: OverlayStyle::default(),
            export: ExportProfile::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font_size: 40.0,
            margin: 20.0,
            font_family: "Helvetica:style=Bold".to_string(),
            font_file: None,
            color: "red".to_string(),
            max_fade_secs: 0.5,
        }
    }
}

impl Default for ExportProfile {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            crf: 18,
            preset: "medium".to_string(),
            audio_bitrate_kbps: 192,
            audio_sample_rate: 48000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reelcut").join("config.json")
}

/// Default output directory.
fn dirs_default_output() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("reelcut").join("highlights")
}
