//! Boost zones that coincide with a validated swing point.

use crate::analysis::swings::fractal_signals;
use crate::config::{ConfluenceConfig, OverlapMetric, PRINT_INHERITANCE_MATCHES};
use crate::domain::fractal::Fractal;
use crate::domain::market_metrics::MarketMetrics;
use crate::domain::zone::DiscoveredZone;
use crate::utils::maths_utils::{intersection_over_smaller, intersection_over_union};

pub fn overlap_fraction(metric: OverlapMetric, zone: &DiscoveredZone, fractal: &Fractal) -> f64 {
    let f = match metric {
        OverlapMetric::IntersectionOverUnion => intersection_over_union,
        OverlapMetric::IntersectionOverSmaller => intersection_over_smaller,
    };
    f(zone.zone_low, zone.zone_high, fractal.zone_low, fractal.zone_high)
}

/// Index and overlap of the best-matching fractal. Ties go to the earliest.
pub fn best_fractal_match(
    zone: &DiscoveredZone,
    fractals: &[Fractal],
    metric: OverlapMetric,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, fractal) in fractals.iter().enumerate() {
        let overlap = overlap_fraction(metric, zone, fractal);
        if overlap > 0.0 && best.is_none_or(|(_, b)| overlap > b) {
            best = Some((idx, overlap));
        }
    }
    best
}

/// Multiply the score of every zone whose best fractal overlap reaches the
/// threshold, re-tier it and record the fractal as a contributor unless it
/// already is one.
/// Returns the number of zones boosted.
pub fn apply_fractal_inheritance(
    zones: &mut [DiscoveredZone],
    fractals: &[Fractal],
    metrics: &MarketMetrics,
    config: &ConfluenceConfig,
) -> usize {
    let inheritance = &config.inheritance;
    if !inheritance.enabled || fractals.is_empty() {
        return 0;
    }

    let mut boosted = 0;
    for zone in zones.iter_mut() {
        let Some((idx, overlap)) = best_fractal_match(zone, fractals, inheritance.metric) else {
            continue;
        };
        if overlap < inheritance.overlap_threshold {
            continue;
        }

        let fractal = &fractals[idx];
        if PRINT_INHERITANCE_MATCHES {
            log::info!(
                "zone {:.4}-{:.4} inherits {} (overlap {:.3})",
                zone.zone_low,
                zone.zone_high,
                fractal.name(),
                overlap
            );
        }

        zone.confluence_score = (zone.confluence_score * inheritance.inheritance_boost).max(0.0);
        zone.confluence_level = config.tiers.level_for(zone.confluence_score);
        zone.fractal_overlap = Some(overlap);
        let name = fractal.name();
        if !zone.contributing_signals.iter().any(|s| s.name() == name) {
            zone.contributing_signals
                .extend(fractal_signals(std::slice::from_ref(fractal), metrics, config));
        }
        boosted += 1;
    }
    boosted
}
