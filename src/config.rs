//! Configuration file support for ferro-txmap.
//!
//! # Example Configuration
//!
//! ```toml
//! [pipeline]
//! workers = 8
//! chunk_size = 5000
//!
//! [retry]
//! max_attempts = 5
//! initial_backoff_ms = 50
//! max_backoff_ms = 2000
//! multiplier = 2.0
//!
//! [output]
//! status_column = true
//! ```
//!
//! # Config File Locations
//!
//! Configuration is searched in this order (first found wins):
//! 1. the path given with `--config`
//! 2. `.ferro-txmap.toml` in current directory
//! 3. `~/.config/ferro/txmap.toml`
//!
//! CLI flags take precedence over config file settings.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

use crate::batch::{PipelineConfig, RetryPolicy};
use crate::error::FerroError;
use crate::io::OutputLayout;

/// Parsed configuration from a `.ferro-txmap.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TxMapConfig {
    pub pipeline: PipelineSection,
    pub retry: RetryPolicy,
    pub output: OutputSection,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSection {
    /// Worker threads; defaults to the number of CPUs.
    pub workers: Option<usize>,
    /// Query rows per chunk.
    pub chunk_size: Option<usize>,
}

/// `[output]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub status_column: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            status_column: true,
        }
    }
}

/// Settings given on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub workers: Option<usize>,
    pub chunk_size: Option<usize>,
    pub max_attempts: Option<u32>,
    pub omit_status: bool,
}

impl TxMapConfig {
    /// Load configuration from `explicit` or else the default locations.
    ///
    /// A missing explicit file is an error; missing default files are not.
    /// Returns the default configuration when no file is found.
    pub fn load(explicit: Option<&Path>) -> Result<Self, FerroError> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        let cwd_config = PathBuf::from(".ferro-txmap.toml");
        if cwd_config.exists() {
            return Self::load_from_path(&cwd_config);
        }

        if let Some(home) = dirs_home() {
            let home_config = home.join(".config").join("ferro").join("txmap.toml");
            if home_config.exists() {
                return Self::load_from_path(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self, FerroError> {
        let content = fs::read_to_string(path).map_err(|e| FerroError::Config {
            msg: format!("cannot read {}: {}", path.display(), e),
        })?;
        let config = Self::parse(&content).map_err(|e| FerroError::Config {
            msg: format!("{}: {}", path.display(), e),
        })?;
        info!("Using configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML content.
    pub fn parse(content: &str) -> Result<Self, FerroError> {
        Ok(toml::from_str(content)?)
    }

    /// Merge this config with CLI arguments.
    /// CLI arguments take precedence.
    pub fn merge_with_cli(&self, cli: &CliOverrides) -> (PipelineConfig, OutputLayout) {
        let mut pipeline = PipelineConfig::default().retry(self.retry.clone());

        if let Some(workers) = cli.workers.or(self.pipeline.workers) {
            pipeline = pipeline.workers(workers);
        }
        if let Some(chunk_size) = cli.chunk_size.or(self.pipeline.chunk_size) {
            pipeline = pipeline.chunk_size(chunk_size);
        }
        if let Some(max_attempts) = cli.max_attempts {
            pipeline.retry = pipeline.retry.max_attempts(max_attempts);
        }

        let layout = OutputLayout {
            status_column: self.output.status_column && !cli.omit_status,
        };
        (pipeline, layout)
    }
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
