use serde::{Deserialize, Serialize};

use crate::config::{ConfluenceConfig, SessionConfig, VolumeTimeframe};
use crate::domain::candle::Candle;
use crate::domain::market_metrics::MarketMetrics;
use crate::domain::signal::{Signal, SourceKind, SourceType, Timeframe};
use crate::error::{ConfluenceError, Result};
use crate::models::timeseries::OhlcvTimeSeries;
use crate::models::volume_profile::{PriceLevel, VolumeProfile};
use crate::utils::TimeUtils;
use crate::utils::maths_utils::get_max_index;
use crate::utils::time_utils::{ms_to_utc, time_in_window};

/// A contiguous "island" of high-volume buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeNode {
    /// Lowest bucket bound in the island.
    pub low: f64,
    /// Highest bucket bound in the island.
    pub high: f64,
    /// Volume-weighted centroid of the bucket centres.
    pub center_price: f64,
    /// Centre of the single heaviest bucket.
    pub peak_price: f64,
    pub total_volume: f64,
    pub total_percent: f64,
    pub level_count: usize,
}

/// Nodes found for one lookback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeNodes {
    pub days: u32,
    pub weight: f64,
    pub bars_used: usize,
    pub nodes: Vec<VolumeNode>,
}

/// Whether a bar's open time falls in a session we accumulate volume for.
pub fn in_profile_session(timestamp_ms: i64, sessions: &SessionConfig, extended: bool) -> bool {
    let time = ms_to_utc(timestamp_ms).time();
    if time_in_window(time, sessions.regular_open, sessions.regular_close) {
        return true;
    }
    extended
        && (time_in_window(time, sessions.premarket_start, sessions.regular_open)
            || time_in_window(time, sessions.regular_close, sessions.postmarket_end))
}

/// Attach scaled ranks (100 = heaviest, 1 = lightest) to every level.
///
/// Levels are ordered by volume share descending, then by distance of the
/// bucket centre to `current_price`, then by bucket index.
pub fn rank_levels(levels: &[PriceLevel], current_price: f64) -> Vec<(PriceLevel, f64)> {
    let mut sorted: Vec<PriceLevel> = levels.to_vec();
    sorted.sort_by(|a, b| {
        b.percent_of_total
            .total_cmp(&a.percent_of_total)
            .then_with(|| {
                (a.center - current_price)
                    .abs()
                    .total_cmp(&(b.center - current_price).abs())
            })
            .then_with(|| a.index.cmp(&b.index))
    });

    let n = sorted.len();
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, level)| {
            let rank = if n > 1 {
                (100.0 - (i as f64 * 99.0 / (n - 1) as f64)).floor()
            } else {
                100.0
            };
            (level, rank)
        })
        .collect()
}

/// Identifies volume nodes using the "Islands" strategy.
///
/// 1. Keeps every level whose rank meets `percentile_threshold`.
/// 2. Merges kept levels whose bucket indices are adjacent.
/// 3. Computes mass, peak and volume-weighted centre for each island.
///
/// Nodes are returned heaviest first (by `total_percent`).
pub fn find_volume_nodes(
    levels: &[PriceLevel],
    percentile_threshold: f64,
    current_price: f64,
) -> Vec<VolumeNode> {
    // Step 1: Identify all "Land" levels, in price order
    let mut kept: Vec<PriceLevel> = rank_levels(levels, current_price)
        .into_iter()
        .filter(|(_, rank)| *rank >= percentile_threshold)
        .map(|(level, _)| level)
        .collect();
    if kept.is_empty() {
        return Vec::new();
    }
    kept.sort_by_key(|level| level.index);

    let finalize_island = |island: &[PriceLevel]| -> VolumeNode {
        let total_volume: f64 = island.iter().map(|l| l.volume).sum();
        let weighted: f64 = island.iter().map(|l| l.center * l.volume).sum();
        let center_price = if total_volume > 0.0 {
            weighted / total_volume
        } else {
            island.iter().map(|l| l.center).sum::<f64>() / island.len() as f64
        };
        let volumes: Vec<f64> = island.iter().map(|l| l.volume).collect();
        let peak = island[get_max_index(&volumes)];

        VolumeNode {
            low: island.iter().map(|l| l.low).fold(f64::INFINITY, f64::min),
            high: island.iter().map(|l| l.high).fold(f64::NEG_INFINITY, f64::max),
            center_price,
            peak_price: peak.center,
            total_volume,
            total_percent: island.iter().map(|l| l.percent_of_total).sum(),
            level_count: island.len(),
        }
    };

    // Step 2: Break islands wherever bucket indices stop being consecutive
    let mut nodes = Vec::new();
    let mut island_start = 0;
    for i in 1..kept.len() {
        if kept[i].index - kept[i - 1].index > 1 {
            nodes.push(finalize_island(&kept[island_start..i]));
            island_start = i;
        }
    }
    nodes.push(finalize_island(&kept[island_start..]));

    nodes.sort_by(|a, b| {
        b.total_percent
            .total_cmp(&a.total_percent)
            .then_with(|| a.center_price.total_cmp(&b.center_price))
    });
    nodes
}

/// Volume nodes for the `timeframe.days` ending at the last bar in `m15`.
pub fn analyze_timeframe(
    m15: &OhlcvTimeSeries,
    timeframe: VolumeTimeframe,
    config: &ConfluenceConfig,
    current_price: f64,
) -> TimeframeNodes {
    let vp = &config.volume_profile;
    let empty = |bars_used| TimeframeNodes {
        days: timeframe.days,
        weight: timeframe.weight,
        bars_used,
        nodes: Vec::new(),
    };

    let Some(end_ms) = m15.last_timestamp_ms() else {
        return empty(0);
    };
    let start_ms = end_ms - timeframe.days as i64 * TimeUtils::MS_IN_D;
    let (start, end) = m15.indices_since(start_ms);

    let candles: Vec<Candle> = (start..end)
        .map(|idx| m15.get_candle(idx))
        .filter(|c| in_profile_session(c.timestamp_ms, &config.sessions, vp.include_extended_hours))
        .filter(|c| c.volume > 0.0)
        .collect();

    let Some(profile) = VolumeProfile::from_candles(&candles, vp.levels) else {
        return empty(candles.len());
    };

    // Only buckets that actually traded take part in ranking.
    let traded: Vec<PriceLevel> = profile
        .price_levels()
        .into_iter()
        .filter(|l| l.volume > 0.0)
        .collect();

    let mut nodes = find_volume_nodes(&traded, vp.percentile_threshold, current_price);
    nodes.truncate(vp.max_nodes_per_timeframe);

    TimeframeNodes {
        nodes,
        ..empty(candles.len())
    }
}

/// Volume-node signals for every configured lookback window.
pub fn volume_node_signals(
    m15: &OhlcvTimeSeries,
    metrics: &MarketMetrics,
    config: &ConfluenceConfig,
) -> Result<Vec<Signal>> {
    if m15.is_empty() {
        return Err(ConfluenceError::DataInsufficient {
            origin: SourceKind::VolumeProfile,
            required: 1,
            available: 0,
        });
    }
    m15.require_finite(SourceKind::VolumeProfile, true)?;

    let settings = config.sources.get(SourceType::VolumeNode);
    let width = settings.width_atr * metrics.m15_atr;

    let mut signals = Vec::new();
    for timeframe in &config.volume_profile.timeframes {
        let result = analyze_timeframe(m15, *timeframe, config, metrics.current_price);
        log::debug!(
            "volume profile {}d: {} bars, {} nodes",
            result.days,
            result.bars_used,
            result.nodes.len()
        );
        for (rank, node) in result.nodes.iter().enumerate() {
            signals.push(Signal::centered(
                SourceType::VolumeNode,
                format!("HVN{}d-{}", result.days, rank + 1),
                node.center_price,
                width,
                settings.weight * result.weight,
                Timeframe::Lookback { days: result.days },
            ));
        }
    }
    Ok(signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    use crate::utils::time_utils::date_time_to_ms;

    fn level(index: usize, volume: f64, total: f64) -> PriceLevel {
        let low = 100.0 + index as f64;
        PriceLevel {
            index,
            low,
            high: low + 1.0,
            center: low + 0.5,
            volume,
            percent_of_total: volume / total * 100.0,
        }
    }

    #[test]
    fn test_rank_scaling_and_tie_break() {
        let total = 40.0;
        let levels = vec![
            level(0, 10.0, total),
            level(1, 5.0, total),
            level(2, 10.0, total),
            level(3, 15.0, total),
        ];
        // Levels 0 and 2 tie on volume; level 2 is nearer 103.0.
        let ranked = rank_levels(&levels, 103.0);
        let order: Vec<usize> = ranked.iter().map(|(l, _)| l.index).collect();
        assert_eq!(order, vec![3, 2, 0, 1]);
        let ranks: Vec<f64> = ranked.iter().map(|(_, r)| *r).collect();
        assert_eq!(ranks, vec![100.0, 67.0, 34.0, 1.0]);
    }

    #[test]
    fn test_adjacent_levels_merge_into_weighted_node() {
        let total = 100.0;
        let mut levels: Vec<PriceLevel> = (0..10).map(|i| level(i, 1.0, total)).collect();
        levels[4] = level(4, 30.0, total);
        levels[5] = level(5, 50.0, total);
        // Two of ten levels: ranks 100 and 89, both above 80.
        let nodes = find_volume_nodes(&levels, 80.0, 105.0);
        assert_eq!(nodes.len(), 1);
        let node = &nodes[0];
        assert_eq!(node.low, 104.0);
        assert_eq!(node.high, 106.0);
        assert_eq!(node.peak_price, 105.5);
        let expected = (104.5 * 30.0 + 105.5 * 50.0) / 80.0;
        assert!((node.center_price - expected).abs() < 1e-12);
        assert!((node.total_percent - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_separated_levels_form_separate_nodes() {
        let total = 100.0;
        let mut levels: Vec<PriceLevel> = (0..10).map(|i| level(i, 1.0, total)).collect();
        levels[1] = level(1, 40.0, total);
        levels[7] = level(7, 30.0, total);
        let nodes = find_volume_nodes(&levels, 80.0, 105.0);
        assert_eq!(nodes.len(), 2);
        // Heaviest first.
        assert_eq!(nodes[0].peak_price, 101.5);
        assert_eq!(nodes[1].peak_price, 107.5);
    }

    #[test]
    fn test_session_filter_respects_extended_flag() {
        let sessions = SessionConfig::default();
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let at = |h, m| date_time_to_ms(date, NaiveTime::from_hms_opt(h, m, 0).unwrap());

        assert!(in_profile_session(at(14, 0), &sessions, false));
        assert!(!in_profile_session(at(9, 0), &sessions, false));
        assert!(in_profile_session(at(9, 0), &sessions, true));
        assert!(in_profile_session(at(22, 45), &sessions, true));
        assert!(!in_profile_session(at(3, 0), &sessions, true));
    }

    #[test]
    fn test_signals_carry_timeframe_weight() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let start = date_time_to_ms(date, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        let candles: Vec<Candle> = (0..20)
            .map(|i| {
                let p = if i % 2 == 0 { 100.0 } else { 110.0 };
                Candle::new(start + i * TimeUtils::MS_IN_15_MIN, p, p + 0.2, p - 0.2, p, 100.0)
            })
            .collect();
        let m15 = OhlcvTimeSeries::from_candles(&candles);
        let metrics = MarketMetrics::new(105.0, 5.0, 1.0).unwrap();
        let config = ConfluenceConfig::default();

        let signals = volume_node_signals(&m15, &metrics, &config).unwrap();
        assert!(!signals.is_empty());
        // Every lookback covers the same bars, so each window finds the same nodes.
        let per_window = signals.len() / 3;
        assert_eq!(signals.len(), per_window * 3);
        assert!(signals.iter().any(|s| s.weight() == 5.0));
        assert!(signals.iter().any(|s| s.weight() == 1.0));
        for s in &signals {
            assert!((s.zone_high() - s.zone_low() - 0.3).abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_series_is_insufficient() {
        let metrics = MarketMetrics::new(105.0, 5.0, 1.0).unwrap();
        let err = volume_node_signals(&OhlcvTimeSeries::default(), &metrics, &ConfluenceConfig::default())
            .unwrap_err();
        assert!(err.is_per_source());
    }
}
