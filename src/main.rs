//! Rollup Codes MCP Server - Entry point

use anyhow::{Context, Result};
use clap::Parser;
use rmcp::{service::ServiceExt, transport::stdio};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rollup_codes_mcp::{config::Config, initialize_catalog, RollupCodesHandler};

/// Rollup Codes MCP Server - rollup metadata for agents
#[derive(Parser, Debug)]
#[command(name = "rollup-codes-mcp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Read an existing checkout instead of cloning the repository
    #[arg(long, value_name = "DIR")]
    local: Option<PathBuf>,

    /// Repository to clone
    #[arg(long, value_name = "URL")]
    repository: Option<String>,

    /// Branch to clone
    #[arg(long, value_name = "NAME")]
    branch: Option<String>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(local) = &self.local {
            config.local_path = Some(local.clone());
        }
        if let Some(repository) = &self.repository {
            config.repository_url = repository.clone();
        }
        if let Some(branch) = &self.branch {
            config.branch = branch.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the MCP protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref config_path) => Config::from_file(config_path)?,
        None => Config::load_default(),
    };
    cli.apply_overrides(&mut config);

    // Clone and extraction are blocking file and network I/O
    let catalog = tokio::task::spawn_blocking(move || {
        let source = config.snapshot_source();
        initialize_catalog(&*source, &config)
    })
    .await
    .context("Catalog initialization task failed")??;

    let handler = RollupCodesHandler::new(catalog);

    let service = handler
        .serve(stdio())
        .await
        .inspect_err(|e| tracing::error!("Server error: {}", e))?;

    tracing::info!("rollup-codes MCP server running on stdio");
    service.waiting().await?;

    tracing::info!("rollup-codes MCP server shutting down");
    Ok(())
}
