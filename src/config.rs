//! Session configuration loaded from `config/roomtag.toml`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default config file location relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/roomtag.toml";

/// Top-level session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// TCP listen address for the viewer control socket.
    pub listen: String,
    /// Optional Unix socket path; takes precedence over `listen` when set.
    pub uds: Option<PathBuf>,
    /// Optional auth token the viewer must present in its hello.
    pub token: Option<String>,
    /// Initial session-global box opacity.
    pub opacity: f32,
    /// Directory exported layout-set files are written to.
    pub export_dir: PathBuf,
    /// Optional JSON vocabulary file replacing the built-in indoor
    /// vocabulary. Vocabulary order is part of the file format, so this
    /// must match the vocabulary any imported sets were exported with.
    pub vocabulary: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:7878".to_string(),
            uds: None,
            token: None,
            opacity: roomtag_layoutset::DEFAULT_OPACITY,
            export_dir: PathBuf::from("exports"),
            vocabulary: None,
        }
    }
}

impl SessionConfig {
    /// Load the config, falling back to defaults when the file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = SessionConfig::load(Path::new("does/not/exist.toml")).unwrap();
        assert_eq!(config.listen, "127.0.0.1:7878");
        assert_eq!(config.opacity, roomtag_layoutset::DEFAULT_OPACITY);
        assert!(config.token.is_none());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: SessionConfig = toml::from_str("listen = \"0.0.0.0:9000\"").unwrap();
        assert_eq!(config.listen, "0.0.0.0:9000");
        assert_eq!(config.export_dir, PathBuf::from("exports"));
    }
}
