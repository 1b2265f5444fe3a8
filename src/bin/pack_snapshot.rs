use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use confluence_zones::SnapshotFile;

/// Convert a snapshot between JSON and bincode (format follows the extension).
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Source snapshot
    input: PathBuf,

    /// Destination; defaults to the input path with a `.bin` extension
    output: Option<PathBuf>,

    /// Keep only these symbols (repeatable)
    #[arg(long = "symbol")]
    symbols: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    let snapshot = SnapshotFile::load_from_path(&args.input)
        .with_context(|| format!("Failed to load source snapshot {:?}", args.input))?;
    log::info!("Loaded {} input(s) from {:?}", snapshot.inputs.len(), args.input);

    let mut inputs = snapshot.inputs;
    if !args.symbols.is_empty() {
        let wanted: Vec<String> = args.symbols.iter().map(|s| s.to_uppercase()).collect();
        inputs.retain(|input| wanted.contains(&input.symbol.to_uppercase()));
    }

    let output_path = args
        .output
        .unwrap_or_else(|| args.input.with_extension("bin"));
    let packed = SnapshotFile::new(inputs);
    packed.save_to_path(&output_path)?;

    log::info!(
        "Snapshot written to {:?} with {} input(s)",
        output_path,
        packed.inputs.len()
    );
    Ok(())
}
