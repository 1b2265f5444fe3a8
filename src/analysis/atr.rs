//! Average True Range helpers.

use crate::domain::market_metrics::MarketMetrics;
use crate::domain::signal::SourceKind;
use crate::error::{ConfluenceError, Result};
use crate::models::timeseries::OhlcvTimeSeries;

/// M15 ATR as a fraction of daily ATR when intraday bars are too short.
pub const M15_ATR_FALLBACK_RATIO: f64 = 0.25;

/// True range per bar. The first bar has no previous close and uses its own range.
pub fn true_ranges(series: &OhlcvTimeSeries) -> Vec<f64> {
    let mut prev_close = None;
    series
        .candles()
        .map(|candle| {
            let tr = candle.true_range(prev_close);
            prev_close = Some(candle.close_price);
            tr
        })
        .collect()
}

/// Simple moving average of `values` over `period`, emitting a value from the
/// first bar onwards (average of whatever is available during warm-up).
pub fn rolling_atr(values: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut window_sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        window_sum += v;
        if i >= period {
            window_sum -= values[i - period];
        }
        let count = (i + 1).min(period);
        out.push(window_sum / count as f64);
    }
    out
}

/// ATR over the final `period` bars, each measured against its previous close.
/// Needs `period + 1` bars.
pub fn latest_atr(series: &OhlcvTimeSeries, period: usize, origin: SourceKind) -> Result<f64> {
    let required = period + 1;
    if period == 0 || series.len() < required {
        return Err(ConfluenceError::DataInsufficient {
            origin,
            required,
            available: series.len(),
        });
    }
    let trs = true_ranges(series);
    let tail = &trs[trs.len() - period..];
    let atr = tail.iter().sum::<f64>() / period as f64;
    if !atr.is_finite() {
        return Err(ConfluenceError::Computation {
            origin,
            detail: format!("ATR evaluated to {}", atr),
        });
    }
    Ok(atr)
}

impl MarketMetrics {
    /// Current price is the last M15 close. Daily ATR is mandatory; M15 ATR
    /// falls back to a fixed fraction of it when intraday history is short.
    pub fn from_series(
        daily: &OhlcvTimeSeries,
        m15: &OhlcvTimeSeries,
        period: usize,
    ) -> Result<Self> {
        let current_price = m15
            .last_close()
            .or_else(|| daily.last_close())
            .ok_or_else(|| {
                ConfluenceError::MissingMarketMetrics("no bars to take a current price from".into())
            })?;

        let daily_atr = latest_atr(daily, period, SourceKind::AtrBands).map_err(|e| {
            ConfluenceError::MissingMarketMetrics(format!("daily ATR unavailable: {}", e))
        })?;

        let m15_atr = match latest_atr(m15, period, SourceKind::AtrBands) {
            Ok(atr) if atr > 0.0 => atr,
            Ok(_) | Err(_) => {
                log::warn!(
                    "M15 ATR unavailable ({} bars), using {} x daily ATR",
                    m15.len(),
                    M15_ATR_FALLBACK_RATIO
                );
                daily_atr * M15_ATR_FALLBACK_RATIO
            }
        };

        MarketMetrics::new(current_price, daily_atr, m15_atr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Candle;
    use crate::utils::TimeUtils;

    fn constant_range_series(n: usize, step_ms: i64, range: f64) -> OhlcvTimeSeries {
        let candles: Vec<Candle> = (0..n)
            .map(|i| Candle::new(i as i64 * step_ms, 100.0, 100.0 + range, 100.0, 100.0, 1.0))
            .collect();
        OhlcvTimeSeries::from_candles(&candles)
    }

    #[test]
    fn test_rolling_atr_warm_up_uses_available_bars() {
        let atr = rolling_atr(&[2.0, 4.0, 6.0, 8.0], 2);
        assert_eq!(atr, vec![2.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn test_true_ranges_include_gaps() {
        let series = OhlcvTimeSeries::from_candles(&[
            Candle::new(0, 10.0, 11.0, 9.0, 10.0, 1.0),
            Candle::new(1, 13.0, 14.0, 12.5, 13.5, 1.0),
        ]);
        assert_eq!(true_ranges(&series), vec![2.0, 4.0]);
    }

    #[test]
    fn test_latest_atr_requires_period_plus_one() {
        let series = constant_range_series(14, 1, 2.0);
        let err = latest_atr(&series, 14, SourceKind::Swings).unwrap_err();
        assert_eq!(
            err,
            ConfluenceError::DataInsufficient {
                origin: SourceKind::Swings,
                required: 15,
                available: 14
            }
        );

        let series = constant_range_series(15, 1, 2.0);
        assert_eq!(latest_atr(&series, 14, SourceKind::Swings).unwrap(), 2.0);
    }

    #[test]
    fn test_metrics_from_series_falls_back_for_short_m15() {
        let daily = constant_range_series(20, TimeUtils::MS_IN_D, 4.0);
        let m15 = constant_range_series(3, TimeUtils::MS_IN_15_MIN, 0.5);
        let metrics = MarketMetrics::from_series(&daily, &m15, 14).unwrap();
        assert_eq!(metrics.current_price, 100.0);
        assert_eq!(metrics.daily_atr, 4.0);
        assert_eq!(metrics.m15_atr, 1.0);
    }

    #[test]
    fn test_metrics_from_series_fails_without_daily_atr() {
        let daily = constant_range_series(5, TimeUtils::MS_IN_D, 4.0);
        let m15 = constant_range_series(30, TimeUtils::MS_IN_15_MIN, 0.5);
        let err = MarketMetrics::from_series(&daily, &m15, 14).unwrap_err();
        assert!(matches!(err, ConfluenceError::MissingMarketMetrics(_)));
    }
}
