use std::time::Instant;

use rayon::prelude::*;

use crate::analysis::best_candle::apply_candle_recency;
use crate::analysis::inheritance::apply_fractal_inheritance;
use crate::analysis::levels::atr_band_signals;
use crate::analysis::refinement::refine_and_rank;
use crate::analysis::swings::fractal_signals;
use crate::analysis::zone_scoring::{cluster_in_range, filter_active_range};
use crate::analysis::ReferenceLevels;
use crate::config::{ConfluenceConfig, PRINT_SOURCE_SUMMARY};
use crate::domain::market_metrics::MarketMetrics;
use crate::domain::signal::{Signal, SourceKind};
use crate::error::{ConfluenceError, Result};

use super::context::RunContext;
use super::messages::{AnalysisInput, ZoneDiscoveryResult};
use super::stats::RunStatistics;

/// Stateless driver for confluence discovery. Holds only a validated
/// configuration; every run builds its own `RunContext`.
#[derive(Debug, Clone)]
pub struct ConfluenceEngine {
    config: ConfluenceConfig,
}

impl ConfluenceEngine {
    /// Validates the configuration up front so runs never start with a bad one.
    pub fn new(config: ConfluenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ConfluenceConfig {
        &self.config
    }

    fn resolve_metrics(&self, input: &AnalysisInput) -> Result<MarketMetrics> {
        match input.metrics {
            Some(metrics) => {
                metrics.validate()?;
                Ok(metrics)
            }
            None => MarketMetrics::from_series(&input.daily, &input.m15, self.config.atr_period),
        }
    }

    /// Run the full pipeline for one symbol.
    ///
    /// Source failures, including NaN or infinite bar values, are recorded as
    /// warnings and the run continues. Only structurally broken bar series or
    /// unavailable market metrics abort it.
    pub fn run(&self, input: &AnalysisInput) -> Result<ZoneDiscoveryResult> {
        let start = Instant::now();

        input.m15.validate()?;
        input.daily.validate()?;
        let metrics = self.resolve_metrics(input)?;

        let mut ctx = RunContext::new(self.config.clone(), metrics, input.analysis_time);
        let mut stats = RunStatistics::default();

        // 1. Fan out the leaf sources, fan in before clustering
        let ((volume, pivots), (swings, reference)) = rayon::join(
            || rayon::join(|| ctx.volume_nodes(input), || ctx.pivots(input)),
            || rayon::join(|| ctx.swings(input), || ctx.reference_levels(input)),
        );

        let fractals = match swings {
            Ok(fractals) => fractals,
            Err(e) => {
                absorb(&mut stats, SourceKind::Swings, e)?;
                Vec::new()
            }
        };
        let reference_levels = match reference {
            Ok(levels) => levels,
            Err(e) => {
                absorb(&mut stats, SourceKind::ReferenceLevels, e)?;
                ReferenceLevels::default()
            }
        };

        // 2. Standardize
        let mut signals: Vec<Signal> = Vec::new();
        let outputs = [
            (SourceKind::VolumeProfile, volume),
            (SourceKind::Pivots, pivots),
            (
                SourceKind::Swings,
                Ok(fractal_signals(&fractals, &ctx.metrics, &ctx.config)),
            ),
            (
                SourceKind::ReferenceLevels,
                Ok(reference_levels.to_signals(&ctx.metrics, &ctx.config)),
            ),
            (
                SourceKind::AtrBands,
                Ok(atr_band_signals(&ctx.metrics, &ctx.config)),
            ),
            (
                SourceKind::ManualLevels,
                Ok(input.manual_levels.to_signals(&ctx.metrics, &ctx.config)),
            ),
        ];
        for (kind, output) in outputs {
            match output.and_then(|batch| check_finite(kind, batch)) {
                Ok(batch) => {
                    if PRINT_SOURCE_SUMMARY {
                        log::info!("{}: {} signals", kind, batch.len());
                    }
                    signals.extend(batch);
                }
                Err(e) => absorb(&mut stats, kind, e)?,
            }
        }
        signals.retain(|s| ctx.is_enabled(s.source_type()));

        stats.record_signals(&signals);
        ctx.signals = signals;

        // 3. Cluster, score and tier (single-threaded)
        let in_range = filter_active_range(
            &ctx.signals,
            &ctx.metrics,
            ctx.config.cluster.scan_range_atr,
        );
        stats.record_in_range(&in_range);
        let mut zones = cluster_in_range(in_range, &ctx.metrics, &ctx.config);

        // 4. Fractal inheritance
        stats.zones_inherited =
            apply_fractal_inheritance(&mut zones, &fractals, &ctx.metrics, &ctx.config);

        // 5. Best candle and recency
        stats.zones_recency_boosted =
            apply_candle_recency(&mut zones, &input.m15, ctx.analysis_time, &ctx.config);

        // 6. Refine and rank
        let zones = refine_and_rank(zones, &ctx.metrics, &ctx.config.refinement);
        stats.record_zones(&zones);

        let duration_ms = start.elapsed().as_millis() as u64;
        log::info!(
            "{}: {} signals ({} in range), {} zones, {} at L3+, {} warnings in {} ms",
            input.symbol,
            stats.total_signals_considered,
            stats.signals_in_range,
            stats.zones_discovered,
            stats.zones_at_or_above_l3,
            stats.warnings.len(),
            duration_ms
        );
        if stats.low_confidence {
            log::warn!(
                "{}: only {} distinct source type(s), zones are low confidence",
                input.symbol,
                stats.distinct_source_types
            );
        }

        Ok(ZoneDiscoveryResult {
            symbol: input.symbol.clone(),
            analysis_time: input.analysis_time,
            metrics: ctx.metrics,
            zones,
            fractals,
            reference_levels,
            statistics: stats,
            duration_ms,
        })
    }

    /// Run many symbols in parallel. Results come back in input order.
    pub fn run_batch(&self, inputs: &[AnalysisInput]) -> Vec<Result<ZoneDiscoveryResult>> {
        inputs.par_iter().map(|input| self.run(input)).collect()
    }
}

/// Per-source failures become warnings; anything else aborts the run.
fn absorb(stats: &mut RunStatistics, kind: SourceKind, err: ConfluenceError) -> Result<()> {
    if err.is_per_source() {
        stats.warn(kind, &err);
        Ok(())
    } else {
        Err(err)
    }
}

fn check_finite(kind: SourceKind, batch: Vec<Signal>) -> Result<Vec<Signal>> {
    match batch.iter().find(|s| !s.is_finite()) {
        Some(bad) => Err(ConfluenceError::Computation {
            origin: kind,
            detail: format!("non-finite value in signal {}", bad.name()),
        }),
        None => Ok(batch),
    }
}
