#![allow(clippy::collapsible_if)]
#![allow(clippy::type_complexity)]

// Core modules
pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use config::ConfluenceConfig;
pub use data::SnapshotFile;
pub use domain::{Candle, ConfluenceLevel, DiscoveredZone, MarketMetrics, Signal, SourceType};
pub use engine::{AnalysisInput, ConfluenceEngine, ZoneDiscoveryResult};
pub use error::{ConfluenceError, Result};
pub use models::OhlcvTimeSeries;

// CLI argument parsing
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Snapshot file with one or more analysis inputs (`.json` or `.bin`)
    #[arg(long)]
    pub input: PathBuf,

    /// JSON configuration; defaults are used for anything it omits
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print results as JSON instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Write JSON results to this file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Load a JSON configuration file and validate it.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<ConfluenceConfig> {
    use anyhow::Context;

    let text = std::fs::read_to_string(path)
        .context(format!("Failed to read config: {}", path.display()))?;
    let config: ConfluenceConfig = serde_json::from_str(&text)
        .context(format!("Failed to parse config: {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
