//! Application settings for the CLI.
//!
//! Loaded from a TOML file when present; every key has a sensible default
//! so a bare checkout works without configuration. Components receive
//! explicit values at construction; there is no ambient settings global.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::scheduler::DEFAULT_WORKER_COUNT;

/// CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory of per-source JSON definitions.
    #[serde(default = "default_sources_dir")]
    pub sources_dir: PathBuf,
    /// Concurrent runs when scraping all due sources.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_sources_dir() -> PathBuf {
    PathBuf::from("sources")
}

fn default_workers() -> usize {
    DEFAULT_WORKER_COUNT
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sources_dir: default_sources_dir(),
            workers: default_workers(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit path, `naukri.toml` in the working
    /// directory, or defaults, in that order.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let candidate = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("naukri.toml"));

        if candidate.is_file() {
            let data = std::fs::read_to_string(&candidate)?;
            Ok(toml::from_str(&data)
                .map_err(|e| anyhow::anyhow!("{}: {e}", candidate.display()))?)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.sources_dir, PathBuf::from("sources"));
        assert_eq!(settings.workers, DEFAULT_WORKER_COUNT);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str("workers = 8").unwrap();
        assert_eq!(settings.workers, 8);
        assert_eq!(settings.sources_dir, PathBuf::from("sources"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = Settings::load(Some(Path::new("/nonexistent/naukri.toml"))).unwrap();
        assert_eq!(settings.workers, DEFAULT_WORKER_COUNT);
    }
}
