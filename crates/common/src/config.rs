//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where sessions are stored.
    pub sessions_dir: PathBuf,

    /// Default recording settings.
    pub recording: RecordingDefaults,

    /// Timeline thumbnail settings.
    pub thumbnail: ThumbnailDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default recording parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingDefaults {
    /// Audio sample rate (Hz).
    pub audio_sample_rate: u32,

    /// Bytes per mono audio sample.
    pub audio_sample_size: u32,

    /// Arc-length spacing between resampled stroke points, in normalized
    /// x-axis units (the canvas spans 2.0 units horizontally).
    pub resample_spacing: f64,

    /// Canvas height / width ratio. Scales the y axis when measuring
    /// stroke arc length.
    pub canvas_ratio: f64,

    /// Maximum number of points the geometry buffer accepts.
    pub point_capacity: usize,

    /// Display refresh rate driving replay (Hz).
    pub display_refresh_hz: u32,
}

/// Timeline thumbnail strip parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailDefaults {
    /// Horizontal resolution of the strip.
    pub pixels_per_second: f64,

    /// Audio samples folded into one amplitude bar.
    pub samples_per_bar: u32,

    /// Height of the audio strip in pixels.
    pub audio_height: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "inkcast_timeline=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sessions_dir: dirs_default_sessions(),
            recording: RecordingDefaults::default(),
            thumbnail: ThumbnailDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RecordingDefaults {
    fn default() -> Self {
        Self {
            audio_sample_rate: 40_000,
            audio_sample_size: 2,
            resample_spacing: 0.002,
            canvas_ratio: 2.0,
            point_capacity: 10_000_000,
            display_refresh_hz: 60,
        }
    }
}

impl Default for ThumbnailDefaults {
    fn default() -> Self {
        Self {
            pixels_per_second: 20.0,
            samples_per_bar: 10,
            audio_height: 34,
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
    base.join("inkcast").join("config.json")
}

/// Default sessions directory.
fn dirs_default_sessions() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("inkcast").join("sessions")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let raw = r#"{ "recording": { "audio_sample_rate": 48000 } }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.recording.audio_sample_rate, 48000);
        assert_eq!(config.recording.audio_sample_size, 2);
        assert_eq!(config.recording.display_refresh_hz, 60);
        assert!((config.thumbnail.pixels_per_second - 20.0).abs() < 1e-9);
        assert_eq!(config.logging.level, "info");
    }
}
