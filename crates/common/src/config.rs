//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory searched for subtitle fonts given by file name.
    pub font_dir: PathBuf,

    /// External media tool locations.
    #[serde(default)]
    pub media_tools: MediaToolsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Locations of the ffmpeg/ffprobe binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaToolsConfig {
    /// ffmpeg executable (name resolved through PATH, or absolute path).
    pub ffmpeg: PathBuf,

    /// ffprobe executable.
    pub ffprobe: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "narramix=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            font_dir: default_font_dir(),
            media_tools: MediaToolsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for MediaToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
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
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
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

    /// Resolve a configured subtitle font name to a file path.
    ///
    /// Absolute paths are used as-is; bare names are looked up in `font_dir`.
    pub fn resolve_font(&self, font: &str) -> PathBuf {
        let candidate = Path::new(font);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.font_dir.join(candidate)
        }
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("narramix").join("config.json")
}

/// Default font directory.
fn default_font_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("narramix").join("fonts")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_font_relative_uses_font_dir() {
        let config = AppConfig {
            font_dir: PathBuf::from("/opt/fonts"),
            ..AppConfig::default()
        };
        assert_eq!(
            config.resolve_font("NotoSans.ttf"),
            PathBuf::from("/opt/fonts/NotoSans.ttf")
        );
        assert_eq!(
            config.resolve_font("/usr/share/fonts/a.ttf"),
            PathBuf::from("/usr/share/fonts/a.ttf")
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"font_dir": "/fonts"}"#).unwrap();
        assert_eq!(config.media_tools.ffmpeg, PathBuf::from("ffmpeg"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_missing_path_falls_back() {
        let config = AppConfig::load_from(Path::new("/nonexistent/narramix/config.json"));
        assert_eq!(config.media_tools.ffprobe, PathBuf::from("ffprobe"));
    }
}
