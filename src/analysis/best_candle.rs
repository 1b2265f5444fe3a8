//! Tag each zone with the M15 bar that traded through it most, and boost
//! zones whose best bar is recent.

use chrono::{DateTime, Utc};

use crate::config::{CandleConfig, ConfluenceConfig};
use crate::domain::zone::{BestCandle, DiscoveredZone};
use crate::models::timeseries::OhlcvTimeSeries;
use crate::utils::TimeUtils;
use crate::utils::maths_utils::intersection_length;

/// Index and overlap fraction of the bar in `[start, end)` whose range overlaps
/// the zone most, relative to the bar's own range. Ties go to the earliest.
/// Flat and non-finite bars are skipped.
pub fn best_candle_for(
    zone_low: f64,
    zone_high: f64,
    m15: &OhlcvTimeSeries,
    (start, end): (usize, usize),
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for idx in start..end {
        let candle = m15.get_candle(idx);
        let range = candle.range();
        if !candle.prices_finite() || range <= 0.0 {
            continue;
        }
        let overlap = intersection_length(zone_low, zone_high, candle.low_price, candle.high_price);
        let pct = overlap / range;
        if pct > 0.0 && best.is_none_or(|(_, b)| pct > b) {
            best = Some((idx, pct));
        }
    }
    best
}

pub fn recency_multiplier(days_old: i64, config: &CandleConfig) -> f64 {
    if days_old <= config.recent_days {
        config.recent_boost
    } else if days_old <= config.fresh_days {
        config.fresh_boost
    } else {
        1.0
    }
}

/// Attach the best candle from the lookback window to every zone and scale
/// its score by the recency multiplier, re-tiering as needed.
/// Returns the number of zones whose score was raised.
pub fn apply_candle_recency(
    zones: &mut [DiscoveredZone],
    m15: &OhlcvTimeSeries,
    analysis_time: DateTime<Utc>,
    config: &ConfluenceConfig,
) -> usize {
    let candles = &config.candles;
    if !candles.enabled || m15.is_empty() {
        return 0;
    }

    let analysis_ms = analysis_time.timestamp_millis();
    let window = m15.indices_between(
        analysis_ms - candles.lookback_days * TimeUtils::MS_IN_D,
        analysis_ms,
    );

    let mut boosted = 0;
    for zone in zones.iter_mut() {
        let Some((idx, overlap_pct)) = best_candle_for(zone.zone_low, zone.zone_high, m15, window)
        else {
            continue;
        };
        let candle = m15.get_candle(idx);
        let days_old = (analysis_ms - candle.timestamp_ms).div_euclid(TimeUtils::MS_IN_D);
        let multiplier = recency_multiplier(days_old, candles);

        log::debug!(
            "zone {:.4}-{:.4} best candle {} days old (overlap {:.3}, x{:.2})",
            zone.zone_low,
            zone.zone_high,
            days_old,
            overlap_pct,
            multiplier
        );

        zone.confluence_score *= multiplier;
        zone.confluence_level = config.tiers.level_for(zone.confluence_score);
        zone.best_candle = Some(BestCandle {
            candle,
            overlap_pct,
            days_old,
        });
        zone.recency_score = Some(multiplier);
        if multiplier > 1.0 {
            boosted += 1;
        }
    }
    boosted
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    use crate::domain::candle::Candle;
    use crate::domain::zone::{ConfluenceLevel, ZoneType};
    use crate::utils::time_utils::{date_time_to_ms, ms_to_utc};

    fn zone(low: f64, high: f64, score: f64) -> DiscoveredZone {
        DiscoveredZone {
            zone_id: 0,
            zone_low: low,
            zone_high: high,
            center_price: (low + high) / 2.0,
            zone_width: high - low,
            zone_type: ZoneType::Support,
            confluence_score: score,
            confluence_level: ConfluenceLevel::L3,
            contributing_signals: Vec::new(),
            distance_from_price: 0.0,
            distance_percentage: 0.0,
            fractal_overlap: None,
            best_candle: None,
            recency_score: None,
        }
    }

    fn analysis_ms() -> i64 {
        date_time_to_ms(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(), NaiveTime::MIN)
    }

    /// One bar per entry, `days_ago` before the analysis time.
    fn series(bars: &[(i64, f64, f64)]) -> OhlcvTimeSeries {
        let mut sorted = bars.to_vec();
        sorted.sort_by_key(|(days_ago, _, _)| -days_ago);
        let mut m15 = OhlcvTimeSeries::default();
        for (days_ago, low, high) in sorted {
            let ts = analysis_ms() - days_ago * TimeUtils::MS_IN_D;
            m15.push(Candle::new(ts, low, high, low, high, 100.0));
        }
        m15
    }

    fn enabled() -> ConfluenceConfig {
        let mut config = ConfluenceConfig::default();
        config.candles.enabled = true;
        config
    }

    #[test]
    fn test_overlap_is_relative_to_candle_range() {
        // Bar 0 overlaps 2.0 of its 6.0 range, bar 1 overlaps 0.5 of its 1.0 range.
        let m15 = series(&[(20, 99.0, 105.0), (15, 101.5, 102.5)]);
        let best = best_candle_for(100.0, 102.0, &m15, (0, m15.len()));
        assert_eq!(best, Some((1, 0.5)));
    }

    #[test]
    fn test_ties_go_to_earliest_and_flat_bars_are_skipped() {
        let m15 = series(&[(20, 100.0, 100.0), (15, 100.0, 101.0), (12, 100.0, 101.0)]);
        assert_eq!(best_candle_for(99.0, 102.0, &m15, (0, 3)), Some((1, 1.0)));
        assert_eq!(best_candle_for(105.0, 106.0, &m15, (0, 3)), None);
    }

    #[test]
    fn test_recency_tiers() {
        let config = CandleConfig::default();
        assert_eq!(recency_multiplier(0, &config), 1.2);
        assert_eq!(recency_multiplier(5, &config), 1.2);
        assert_eq!(recency_multiplier(6, &config), 1.1);
        assert_eq!(recency_multiplier(10, &config), 1.1);
        assert_eq!(recency_multiplier(11, &config), 1.0);
    }

    #[test]
    fn test_recent_best_candle_boosts_and_retiers() {
        let m15 = series(&[(40, 99.0, 101.0), (3, 99.5, 100.5), (12, 104.0, 105.0)]);
        let mut zones = vec![zone(99.0, 101.0, 7.0), zone(104.0, 105.0, 4.0)];
        let boosted = apply_candle_recency(&mut zones, &m15, ms_to_utc(analysis_ms()), &enabled());
        assert_eq!(boosted, 1);

        // The 40-day-old bar is outside the lookback, so the 3-day-old one wins.
        let best = zones[0].best_candle.unwrap();
        assert_eq!(best.days_old, 3);
        assert_eq!(best.overlap_pct, 1.0);
        assert_eq!(zones[0].recency_score, Some(1.2));
        assert!((zones[0].confluence_score - 8.4).abs() < 1e-12);
        assert_eq!(zones[0].confluence_level, ConfluenceLevel::L4);

        let stale = zones[1].best_candle.unwrap();
        assert_eq!(stale.days_old, 12);
        assert_eq!(zones[1].recency_score, Some(1.0));
        assert_eq!(zones[1].confluence_score, 4.0);
    }

    #[test]
    fn test_disabled_pass_leaves_zones_untouched() {
        let m15 = series(&[(1, 99.0, 101.0)]);
        let mut zones = vec![zone(99.0, 101.0, 7.0)];
        let config = ConfluenceConfig::default();
        assert_eq!(apply_candle_recency(&mut zones, &m15, ms_to_utc(analysis_ms()), &config), 0);
        assert_eq!(zones[0].best_candle, None);
        assert_eq!(zones[0].recency_score, None);
        assert_eq!(zones[0].confluence_score, 7.0);
    }
}
