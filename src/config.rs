//! Configuration management for the Rollup Codes MCP Server

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::snapshot::{GitSnapshotSource, LocalSnapshotSource, SnapshotSource};

pub const DEFAULT_REPOSITORY_URL: &str = "https://github.com/LimeChain/RollupCodes.git";

/// Configuration for the Rollup Codes MCP Server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Git repository holding the documentation and chain specifications
    #[serde(default = "default_repository_url")]
    pub repository_url: String,

    /// Branch to clone
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Existing checkout to read instead of cloning
    #[serde(default)]
    pub local_path: Option<PathBuf>,

    /// Specification directory, relative to the repository root
    #[serde(default = "default_specs_dir")]
    pub specs_dir: PathBuf,

    /// Documentation directory, relative to the repository root
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,
}

fn default_repository_url() -> String {
    DEFAULT_REPOSITORY_URL.to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_specs_dir() -> PathBuf {
    PathBuf::from("chain-specs/specifications")
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("src/docs")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repository_url: default_repository_url(),
            branch: default_branch(),
            local_path: None,
            specs_dir: default_specs_dir(),
            docs_dir: default_docs_dir(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// Missing keys take their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read config file: {}", path_ref.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path_ref.display()))
    }

    /// Load configuration from default location.
    ///
    /// Tries `~/.rollup-codes-mcp-config.json` first and falls back to the built-in defaults.
    pub fn load_default() -> Self {
        if let Ok(home) = std::env::var("HOME") {
            let default_path = Path::new(&home).join(".rollup-codes-mcp-config.json");
            if default_path.exists() {
                match Self::from_file(&default_path) {
                    Ok(config) => {
                        info!(path = %default_path.display(), "loaded config");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %default_path.display(), error = %e, "failed to parse config");
                    }
                }
            }
        }

        info!("using default config");
        Self::default()
    }

    /// The snapshot source this configuration describes.
    ///
    /// A `local_path` takes precedence over the repository URL.
    pub fn snapshot_source(&self) -> Box<dyn SnapshotSource + Send> {
        match &self.local_path {
            Some(root) => Box::new(LocalSnapshotSource::new(root.clone())),
            None => Box::new(GitSnapshotSource::new(
                self.repository_url.clone(),
                self.branch.clone(),
            )),
        }
    }
}
