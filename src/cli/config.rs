//! TOML configuration file support.
//!
//! Settings that rarely change between runs can live in a config file:
//!
//! ```toml
//! # mzgroup.toml
//! [archive]
//! host = "massive-ftp.ucsd.edu"
//! port = 21
//! peak_prefix = "z01"
//! default_prefix = "v01"
//! fallback_prefix = "x01"
//!
//! [[archive.replacements]]
//! pattern = "MSV000083508/ccms_peak_centroided"
//! replacement = "MSV000083508/ccms_peak"
//!
//! [failure_log]
//! pipeline_dir = "/data/pipeline"
//! task_id = "7"
//! download_dir = "/scratch"
//! ```
//!
//! Command-line flags and environment variables take precedence.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use mzgroup::remote::ArchiveLayout;

/// Root configuration structure for mzgroup.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Archive server and path layout.
    #[serde(default)]
    pub archive: ArchiveLayout,

    /// Failure log and working directories.
    #[serde(default)]
    pub failure_log: FailureLogConfig,
}

/// Where failure records and downloads go.
#[derive(Debug, Default, Deserialize)]
pub struct FailureLogConfig {
    /// Directory holding the `failed_logs_<task>` directory.
    pub pipeline_dir: Option<PathBuf>,

    /// Task id used in the failure directory name.
    pub task_id: Option<String>,

    /// Directory downloaded files are written to.
    pub download_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mzgroup::remote::PathReplacement;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [archive]
            host = "ftp.example.org"
            port = 2121
            fallback_prefix = "y01"

            [[archive.replacements]]
            pattern = "a"
            replacement = "b"

            [failure_log]
            pipeline_dir = "/pipeline"
            task_id = "42"
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.archive.host, "ftp.example.org");
        assert_eq!(config.archive.port, 2121);
        assert_eq!(config.archive.peak_prefix, "z01");
        assert_eq!(config.archive.fallback_prefix, "y01");
        assert_eq!(
            config.archive.replacements,
            vec![PathReplacement::new("a", "b")]
        );
        assert_eq!(
            config.failure_log.pipeline_dir,
            Some(PathBuf::from("/pipeline"))
        );
        assert_eq!(config.failure_log.task_id.as_deref(), Some("42"));
        assert_eq!(config.failure_log.download_dir, None);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.archive, ArchiveLayout::default());
        assert_eq!(config.failure_log.task_id, None);
    }

    #[test]
    fn test_invalid_config() {
        assert!(Config::from_str("[archive]\nport = \"twenty-one\"").is_err());
    }
}
