use std::collections::BTreeSet;

use crate::config::{ConfluenceConfig, PRINT_CLUSTER_DETAILS, ScoringConfig};
use crate::domain::market_metrics::MarketMetrics;
use crate::domain::signal::{Signal, SourceType};
use crate::domain::zone::{DiscoveredZone, ZoneType};

/// How a cluster's score was assembled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    /// Sum of member weights.
    pub base_score: f64,
    pub distinct_types: usize,
    pub diversity_multiplier: f64,
    /// Distance between the lowest and highest member centre. Unlike the
    /// zone width used for trimming, member bound padding is not included.
    pub span: f64,
    /// 1.0 when the span is within the penalty threshold.
    pub width_penalty_divisor: f64,
    /// Score after bonus and penalty, before compression.
    pub uncapped_score: f64,
    pub final_score: f64,
}

/// Keep only signals whose centre lies inside `current ± k × daily_atr`.
pub fn filter_active_range(signals: &[Signal], metrics: &MarketMetrics, k: f64) -> Vec<Signal> {
    let (scan_low, scan_high) = metrics.scan_range(k);
    signals
        .iter()
        .filter(|s| s.center_price() >= scan_low && s.center_price() <= scan_high)
        .cloned()
        .collect()
}

/// Deterministic order: centre, then source type, then name.
pub fn sort_signals(signals: &mut [Signal]) {
    signals.sort_by(|a, b| {
        a.center_price()
            .total_cmp(&b.center_price())
            .then_with(|| a.source_type().cmp(&b.source_type()))
            .then_with(|| a.name().cmp(b.name()))
    });
}

/// Single-linkage chain over sorted centres.
///
/// A new cluster starts whenever the gap to the previous centre exceeds
/// `cluster_distance`. Input must already be sorted.
pub fn cluster_signals(sorted: Vec<Signal>, cluster_distance: f64) -> Vec<Vec<Signal>> {
    let mut clusters: Vec<Vec<Signal>> = Vec::new();
    let mut current: Vec<Signal> = Vec::new();

    for signal in sorted {
        if let Some(prev) = current.last() {
            // If the gap to the previous centre is wider than the bridge, the chain breaks.
            if signal.center_price() - prev.center_price() > cluster_distance {
                clusters.push(std::mem::take(&mut current));
            }
        }
        current.push(signal);
    }
    if !current.is_empty() {
        clusters.push(current);
    }
    clusters
}

fn center_span(cluster: &[Signal]) -> f64 {
    match (cluster.first(), cluster.last()) {
        (Some(first), Some(last)) => last.center_price() - first.center_price(),
        _ => 0.0,
    }
}

/// Split a chained cluster at its widest internal gap until every piece's
/// centre span fits `max_span`. The first gap wins on ties.
pub fn resplit_cluster(cluster: Vec<Signal>, max_span: f64) -> Vec<Vec<Signal>> {
    if cluster.len() < 2 || center_span(&cluster) <= max_span {
        return vec![cluster];
    }

    let mut split_at = 1;
    let mut widest = f64::NEG_INFINITY;
    for i in 1..cluster.len() {
        let gap = cluster[i].center_price() - cluster[i - 1].center_price();
        if gap > widest {
            widest = gap;
            split_at = i;
        }
    }

    let mut left = cluster;
    let right = left.split_off(split_at);
    let mut pieces = resplit_cluster(left, max_span);
    pieces.extend(resplit_cluster(right, max_span));
    pieces
}

/// Weighted score with diversity bonus, width penalty and soft ceiling.
pub fn score_cluster(cluster: &[Signal], m15_atr: f64, scoring: &ScoringConfig) -> ScoreBreakdown {
    let base_score: f64 = cluster.iter().map(|s| s.weight()).sum();

    let distinct_types = cluster
        .iter()
        .map(|s| s.source_type())
        .collect::<BTreeSet<SourceType>>()
        .len();
    let diversity_multiplier =
        1.0 + scoring.bonus_rate * (distinct_types.saturating_sub(1)) as f64;

    let span = center_span(cluster);
    let penalty_width = scoring.width_penalty_threshold * m15_atr;
    let width_penalty_divisor = if span > penalty_width {
        1.0 + (span / penalty_width - 1.0) * scoring.penalty_factor
    } else {
        1.0
    };

    let uncapped_score = base_score * diversity_multiplier / width_penalty_divisor;
    let final_score = if uncapped_score > scoring.score_ceiling {
        scoring.score_ceiling + (uncapped_score - scoring.score_ceiling) * scoring.compression_factor
    } else {
        uncapped_score
    };

    ScoreBreakdown {
        base_score,
        distinct_types,
        diversity_multiplier,
        span,
        width_penalty_divisor,
        uncapped_score,
        final_score: final_score.max(0.0),
    }
}

/// Turn a scored cluster into a zone. `zone_id` is assigned later by ranking.
pub fn build_zone(
    cluster: Vec<Signal>,
    breakdown: &ScoreBreakdown,
    metrics: &MarketMetrics,
    config: &ConfluenceConfig,
) -> DiscoveredZone {
    let total_weight: f64 = cluster.iter().map(|s| s.weight()).sum();
    let center_price = if total_weight > 0.0 {
        cluster
            .iter()
            .map(|s| s.center_price() * s.weight())
            .sum::<f64>()
            / total_weight
    } else {
        cluster.iter().map(|s| s.center_price()).sum::<f64>() / cluster.len().max(1) as f64
    };

    let mut zone_low = cluster
        .iter()
        .map(|s| s.zone_low())
        .fold(f64::INFINITY, f64::min);
    let mut zone_high = cluster
        .iter()
        .map(|s| s.zone_high())
        .fold(f64::NEG_INFINITY, f64::max);

    let max_width = config.cluster.max_zone_width_atr * metrics.m15_atr;
    if zone_high - zone_low > max_width {
        zone_low = center_price - max_width / 2.0;
        zone_high = center_price + max_width / 2.0;
    }

    let min_width = config.cluster.min_zone_width_atr * metrics.m15_atr;
    if zone_high - zone_low < min_width {
        zone_low = center_price - min_width / 2.0;
        zone_high = center_price + min_width / 2.0;
    }

    let score = breakdown.final_score;
    let mut zone = DiscoveredZone {
        zone_id: 0,
        zone_low,
        zone_high,
        center_price,
        zone_width: zone_high - zone_low,
        zone_type: ZoneType::for_center(center_price, metrics.current_price),
        confluence_score: score,
        confluence_level: config.tiers.level_for(score),
        contributing_signals: cluster,
        distance_from_price: 0.0,
        distance_percentage: 0.0,
        fractal_overlap: None,
        best_candle: None,
        recency_score: None,
    };
    zone.update_distance(metrics.current_price);
    zone
}

/// Clusters and scores standardized signals into zones, in price order.
///
/// Returns the zones together with the number of signals that survived the
/// active range filter.
pub fn discover_zones(
    signals: &[Signal],
    metrics: &MarketMetrics,
    config: &ConfluenceConfig,
) -> (Vec<DiscoveredZone>, usize) {
    let in_range = filter_active_range(signals, metrics, config.cluster.scan_range_atr);
    let signals_in_range = in_range.len();
    (cluster_in_range(in_range, metrics, config), signals_in_range)
}

/// Cluster, score and build zones from signals already inside the active range.
pub fn cluster_in_range(
    mut in_range: Vec<Signal>,
    metrics: &MarketMetrics,
    config: &ConfluenceConfig,
) -> Vec<DiscoveredZone> {
    if in_range.is_empty() {
        return Vec::new();
    }
    sort_signals(&mut in_range);

    let cluster_distance = config.cluster.cluster_distance_atr * metrics.m15_atr;
    let mut clusters = cluster_signals(in_range, cluster_distance);

    if config.cluster.resplit_oversized {
        let max_span = config.cluster.max_zone_width_atr * metrics.m15_atr;
        clusters = clusters
            .into_iter()
            .flat_map(|c| resplit_cluster(c, max_span))
            .collect();
    }

    clusters
        .into_iter()
        .map(|cluster| {
            let breakdown = score_cluster(&cluster, metrics.m15_atr, &config.scoring);
            if PRINT_CLUSTER_DETAILS {
                let names: Vec<&str> = cluster.iter().map(|s| s.name()).collect();
                log::info!("cluster {:?}: {:?}", names, breakdown);
            }
            build_zone(cluster, &breakdown, metrics, config)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::Timeframe;
    use crate::domain::zone::ConfluenceLevel;

    fn sig(source_type: SourceType, name: &str, center: f64, weight: f64) -> Signal {
        Signal::centered(source_type, name, center, 0.3, weight, Timeframe::Daily)
    }

    fn metrics() -> MarketMetrics {
        MarketMetrics::new(100.0, 5.0, 1.0).unwrap()
    }

    #[test]
    fn test_single_signal_scores_its_weight() {
        let config = ConfluenceConfig::default();
        let signals = vec![sig(SourceType::VolumeNode, "HVN7d-1", 100.0, 3.0)];
        let (zones, in_range) = discover_zones(&signals, &metrics(), &config);
        assert_eq!(in_range, 1);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].confluence_score, 3.0);
        assert_eq!(zones[0].confluence_level, ConfluenceLevel::L2);
        assert_eq!(zones[0].zone_type, ZoneType::Support);
    }

    #[test]
    fn test_three_distinct_sources_get_diversity_bonus() {
        let config = ConfluenceConfig::default();
        let signals = vec![
            sig(SourceType::VolumeNode, "HVN", 99.9, 3.0),
            sig(SourceType::Fractal, "swing", 100.0, 2.5),
            sig(SourceType::PivotWeekly, "W_R3", 100.1, 2.0),
        ];
        let (zones, _) = discover_zones(&signals, &metrics(), &config);
        assert_eq!(zones.len(), 1);
        let zone = &zones[0];
        assert!((zone.confluence_score - 9.0).abs() < 1e-9);
        assert_eq!(zone.confluence_level, ConfluenceLevel::L4);
        let expected_center = (99.9 * 3.0 + 100.0 * 2.5 + 100.1 * 2.0) / 7.5;
        assert!((zone.center_price - expected_center).abs() < 1e-12);
        assert_eq!(zone.contributing_signals.len(), 3);
    }

    #[test]
    fn test_wide_cluster_is_penalised_and_trimmed() {
        let config = ConfluenceConfig::default();
        let m = MarketMetrics::new(101.5, 5.0, 1.0).unwrap();
        let signals = vec![
            sig(SourceType::DailyLevel, "DL1", 100.0, 1.0),
            sig(SourceType::DailyLevel, "DL2", 101.5, 1.0),
            sig(SourceType::DailyLevel, "DL3", 103.0, 1.0),
        ];
        let cluster = signals.clone();
        let breakdown = score_cluster(&cluster, 1.0, &config.scoring);
        assert_eq!(breakdown.span, 3.0);
        assert!((breakdown.width_penalty_divisor - 1.25).abs() < 1e-12);
        assert!((breakdown.final_score - 3.0 / 1.25).abs() < 1e-12);

        let (zones, _) = discover_zones(&signals, &m, &config);
        assert_eq!(zones.len(), 1);
        let zone = &zones[0];
        assert!(zone.zone_width <= 3.0 + 1e-12);
        assert!((zone.zone_low - 100.0).abs() < 1e-12);
        assert!((zone.zone_high - 103.0).abs() < 1e-12);
    }

    #[test]
    fn test_oversized_zone_is_centred_on_weighted_center() {
        let config = ConfluenceConfig::default();
        let signals = vec![
            sig(SourceType::VolumeNode, "HVN30d-1", 100.0, 10.0),
            sig(SourceType::DailyLevel, "DL1", 101.4, 0.1),
            sig(SourceType::DailyLevel, "DL2", 102.8, 0.1),
        ];
        let (zones, _) = discover_zones(&signals, &metrics(), &config);
        assert_eq!(zones.len(), 1);
        let zone = &zones[0];
        let center = (100.0 * 10.0 + 101.4 * 0.1 + 102.8 * 0.1) / 10.2;
        assert!((zone.center_price - center).abs() < 1e-12);
        assert!((zone.zone_width - 3.0).abs() < 1e-9);
        assert!((zone.zone_low - (center - 1.5)).abs() < 1e-9);
        assert!((zone.zone_high - (center + 1.5)).abs() < 1e-9);
    }

    #[test]
    fn test_span_excludes_member_padding() {
        let config = ConfluenceConfig::default();
        let signals = vec![
            sig(SourceType::DailyLevel, "DL1", 100.0, 1.0),
            sig(SourceType::DailyLevel, "DL2", 100.5, 1.0),
        ];
        let breakdown = score_cluster(&signals, 1.0, &config.scoring);
        assert!((breakdown.span - 0.5).abs() < 1e-12);

        let (zones, _) = discover_zones(&signals, &metrics(), &config);
        assert!((zones[0].zone_width - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_empty_active_range() {
        let config = ConfluenceConfig::default();
        let signals = vec![
            sig(SourceType::PivotMonthly, "M_R4", 150.0, 4.0),
            sig(SourceType::PivotMonthly, "M_S4", 50.0, 4.0),
        ];
        let (zones, in_range) = discover_zones(&signals, &metrics(), &config);
        assert!(zones.is_empty());
        assert_eq!(in_range, 0);
    }

    #[test]
    fn test_score_ceiling_compresses_excess() {
        let config = ConfluenceConfig::default();
        let cluster: Vec<Signal> = (0..12)
            .map(|i| sig(SourceType::PivotMonthly, &format!("M{}", i), 100.0, 5.0))
            .collect();
        let breakdown = score_cluster(&cluster, 1.0, &config.scoring);
        assert_eq!(breakdown.uncapped_score, 60.0);
        assert!((breakdown.final_score - 51.0).abs() < 1e-12);
    }

    #[test]
    fn test_gap_beyond_cluster_distance_splits() {
        let config = ConfluenceConfig::default();
        let signals = vec![
            sig(SourceType::DailyLevel, "DL1", 98.0, 1.0),
            sig(SourceType::DailyLevel, "DL2", 99.5, 1.0),
            sig(SourceType::DailyLevel, "DL3", 101.1, 1.0),
        ];
        let (zones, _) = discover_zones(&signals, &metrics(), &config);
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].contributing_signals.len(), 2);
        assert_eq!(zones[1].zone_type, ZoneType::Resistance);
    }

    #[test]
    fn test_resplit_takes_widest_gap_first() {
        let signals = vec![
            sig(SourceType::DailyLevel, "a", 100.0, 1.0),
            sig(SourceType::DailyLevel, "b", 101.0, 1.0),
            sig(SourceType::DailyLevel, "c", 102.4, 1.0),
            sig(SourceType::DailyLevel, "d", 103.4, 1.0),
            sig(SourceType::DailyLevel, "e", 104.4, 1.0),
        ];
        let pieces = resplit_cluster(signals, 3.0);
        let sizes: Vec<usize> = pieces.iter().map(|p| p.len()).collect();
        assert_eq!(sizes, vec![2, 3]);
    }

    #[test]
    fn test_sort_breaks_ties_by_type_then_name() {
        let mut signals = vec![
            sig(SourceType::PivotDaily, "b", 100.0, 1.0),
            sig(SourceType::VolumeNode, "z", 100.0, 1.0),
            sig(SourceType::PivotDaily, "a", 100.0, 1.0),
        ];
        sort_signals(&mut signals);
        let names: Vec<&str> = signals.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["z", "a", "b"]);
    }

    #[test]
    fn test_degenerate_zone_widened_to_minimum() {
        let config = ConfluenceConfig::default();
        let point = Signal::centered(SourceType::AtrLevel, "ATR_HIGH", 102.0, 0.0, 0.8, Timeframe::Daily);
        let (zones, _) = discover_zones(&[point], &metrics(), &config);
        assert!(zones[0].zone_high > zones[0].zone_low);
        assert!((zones[0].zone_width - 0.1).abs() < 1e-12);
    }
}
