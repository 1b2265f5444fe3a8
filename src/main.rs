use anyhow::{Context, Result};
use clap::Parser;

use confluence_zones::utils::TimeUtils;
use confluence_zones::utils::time_utils::ms_to_utc;
use confluence_zones::{
    Cli, ConfluenceConfig, ConfluenceEngine, SnapshotFile, ZoneDiscoveryResult, load_config,
};

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Cli::parse();
    #[cfg(debug_assertions)]
    log::info!("Parsed arguments: {:?}", args);

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ConfluenceConfig::default(),
    };
    let engine = ConfluenceEngine::new(config)?;
    let snapshot = SnapshotFile::load_from_path(&args.input)?;

    let mut results = Vec::with_capacity(snapshot.inputs.len());
    for (input, outcome) in snapshot.inputs.iter().zip(engine.run_batch(&snapshot.inputs)) {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => log::error!("{}: run failed: {}", input.symbol, e),
        }
    }

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&results)?;
        std::fs::write(path, json).context(format!("Failed to write {}", path.display()))?;
        log::info!("Wrote {} result(s) to {}", results.len(), path.display());
    } else if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            print_result(result);
        }
    }

    if results.len() < snapshot.inputs.len() {
        anyhow::bail!(
            "{} of {} run(s) failed",
            snapshot.inputs.len() - results.len(),
            snapshot.inputs.len()
        );
    }
    Ok(())
}

fn print_result(result: &ZoneDiscoveryResult) {
    let m = &result.metrics;
    println!(
        "\n{} @ {}  price {:.4}  daily ATR {:.4}  m15 ATR {:.4}",
        result.symbol,
        result.analysis_time.format(TimeUtils::STANDARD_DATETIME_FORMAT),
        m.current_price,
        m.daily_atr,
        m.m15_atr
    );
    println!(
        "{:>3}  {:<10} {:<3} {:>7}  {:>10} {:>10} {:>7}  {:>6}  sources",
        "id", "type", "lvl", "score", "low", "high", "width", "dist%"
    );
    for zone in &result.zones {
        let sources: Vec<&str> = zone.contributing_signals.iter().map(|s| s.name()).collect();
        println!(
            "{:>3}  {:<10} {:<3} {:>7.2}  {:>10.4} {:>10.4} {:>7.4}  {:>6.2}  {}",
            zone.zone_id,
            zone.zone_type.to_string(),
            zone.confluence_level.to_string(),
            zone.confluence_score,
            zone.zone_low,
            zone.zone_high,
            zone.zone_width,
            zone.distance_percentage,
            sources.join(", ")
        );
        if let Some(best) = &zone.best_candle {
            println!(
                "     best candle {}  {:.4}-{:.4}  overlap {:.2}  {}d old  x{:.2}",
                ms_to_utc(best.candle.timestamp_ms).format(TimeUtils::STANDARD_DATETIME_FORMAT),
                best.candle.low_price,
                best.candle.high_price,
                best.overlap_pct,
                best.days_old,
                zone.recency_score.unwrap_or(1.0)
            );
        }
    }

    let stats = &result.statistics;
    println!(
        "signals {} ({} in range)  zones {}  L3+ {}  avg score {:.2}  inherited {}  recent {}  {} ms",
        stats.total_signals_considered,
        stats.signals_in_range,
        stats.zones_discovered,
        stats.zones_at_or_above_l3,
        stats.average_score,
        stats.zones_inherited,
        stats.zones_recency_boosted,
        result.duration_ms
    );
    if stats.low_confidence {
        println!("low confidence: {} distinct source type(s)", stats.distinct_source_types);
    }
    for warning in &stats.warnings {
        println!("warning [{}]: {}", warning.source, warning.message);
    }
}
