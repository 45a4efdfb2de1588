//! # Node Configuration
//!
//! ```toml
//! data_dir = "./assetft-data"
//!
//! [log]
//! level = "assetft_node=info,assetft_protocol=info"
//! format = "pretty"
//!
//! [params]
//! authority = "gov"
//! module_account = "assetft"
//! ```
//!
//! Resolution order: built-in defaults, then the config file (explicit
//! `--config`, else `assetft.toml` in the data directory if present), then
//! CLI flags and their environment fallbacks.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use assetft_protocol::ModuleParams;

use crate::cli::AssetFtNodeCli;
use crate::logging::{LogFormat, DEFAULT_LOG_LEVEL};

/// Name of the config file inside a data directory.
pub const CONFIG_FILE_NAME: &str = "assetft.toml";

const DEFAULT_DATA_DIR: &str = "./assetft-data";
const DB_DIR_NAME: &str = "db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Everything the node needs to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub data_dir: PathBuf,
    pub log: LogConfig,
    pub params: ModuleParams,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log: LogConfig::default(),
            params: ModuleParams::default(),
        }
    }
}

impl NodeConfig {
    /// Parses a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("failed to parse node config")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize node config")
    }

    /// Builds the effective config for one invocation.
    pub fn resolve(cli: &AssetFtNodeCli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => {
                let data_dir = cli
                    .data_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
                let candidate = data_dir.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::load(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(cli);
        Ok(config)
    }

    /// CLI flags win over whatever the file said.
    pub fn apply_overrides(&mut self, cli: &AssetFtNodeCli) {
        if let Some(data_dir) = &cli.data_dir {
            self.data_dir = data_dir.clone();
        }
        if let Some(level) = &cli.log_level {
            self.log.level = level.clone();
        }
        if let Some(format) = cli.log_format {
            self.log.format = format;
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_DIR_NAME)
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> AssetFtNodeCli {
        AssetFtNodeCli::try_parse_from(args).unwrap()
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = NodeConfig::from_toml("").unwrap();
        assert_eq!(config, NodeConfig::default());
    }

    #[test]
    fn sections_are_parsed() {
        let raw = r#"
            data_dir = "/var/lib/assetft"

            [log]
            level = "debug"
            format = "json"

            [params]
            authority = "council"
            issue_fee = { denom = "ucore", amount = "10" }
        "#;
        let config = NodeConfig::from_toml(raw).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/assetft"));
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.params.authority.as_str(), "council");
        assert_eq!(config.params.issue_fee.as_ref().map(|c| c.amount), Some(10));
        assert_eq!(config.params.module_account.as_str(), "assetft");
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        assert!(NodeConfig::from_toml("[log]\nformat = \"xml\"").is_err());
    }

    #[test]
    fn flags_override_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[log]\nlevel = \"warn\"\nformat = \"json\"\n").unwrap();

        let path_str = path.to_str().unwrap();
        let config =
            NodeConfig::resolve(&cli(&["assetft-node", "-c", path_str, "--log-level", "trace", "version"]))
                .unwrap();
        assert_eq!(config.log.level, "trace");
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn config_is_found_in_the_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[params]\nauthority = \"dao\"\n",
        )
        .unwrap();

        let dir_str = dir.path().to_str().unwrap();
        let config = NodeConfig::resolve(&cli(&["assetft-node", "-d", dir_str, "version"])).unwrap();
        assert_eq!(config.params.authority.as_str(), "dao");
        assert_eq!(config.data_dir, dir.path());
        assert_eq!(config.db_path(), dir.path().join("db"));
    }

    #[test]
    fn defaults_survive_a_toml_round_trip() {
        let config = NodeConfig::default();
        let raw = config.to_toml().unwrap();
        assert_eq!(NodeConfig::from_toml(&raw).unwrap(), config);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let err = NodeConfig::resolve(&cli(&["assetft-node", "-c", "/nonexistent/assetft.toml", "version"]))
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to read config file"));
    }
}
