//! Settings file plus command-line overrides

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mdreview_core::SegmentationMode;
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 8765;

/// Values read from `~/.mdreview/config.toml`; every key is optional
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub endpoint: Option<String>,
    pub port: u16,
    pub mode: SegmentationMode,
    pub log_level: String,
    pub timeout_secs: u64,
    pub export: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            port: DEFAULT_PORT,
            mode: SegmentationMode::Block,
            log_level: "info".to_string(),
            timeout_secs: 10,
            export: true,
        }
    }
}

impl Config {
    /// Load from an explicit path, or from the default location if present
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Where the payload is posted
    pub fn submit_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}/submit", self.port))
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".mdreview").join("config.toml"))
}
