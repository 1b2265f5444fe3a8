use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::candle::Candle;
use crate::domain::signal::SourceKind;
use crate::error::{ConfluenceError, Result};
use crate::utils::time_utils::ms_to_utc;

// ============================================================================
// OhlcvTimeSeries: Raw bar data for one symbol at one bar size
// ============================================================================

/// Columnar OHLCV bars. Timestamps are bar open times in UTC epoch millis and
/// must be strictly increasing; gaps between bars are allowed.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct OhlcvTimeSeries {
    pub timestamps_ms: Vec<i64>,

    // Prices
    pub open_prices: Vec<f64>,
    pub high_prices: Vec<f64>,
    pub low_prices: Vec<f64>,
    pub close_prices: Vec<f64>,

    // Volumes
    pub volumes: Vec<f64>,
}

impl OhlcvTimeSeries {
    pub fn from_candles(candles: &[Candle]) -> Self {
        let mut series = OhlcvTimeSeries::default();
        for candle in candles {
            series.push(*candle);
        }
        series
    }

    pub fn push(&mut self, candle: Candle) {
        self.timestamps_ms.push(candle.timestamp_ms);
        self.open_prices.push(candle.open_price);
        self.high_prices.push(candle.high_price);
        self.low_prices.push(candle.low_price);
        self.close_prices.push(candle.close_price);
        self.volumes.push(candle.volume);
    }

    /// Caller guarantees `idx < self.len()`.
    pub fn get_candle(&self, idx: usize) -> Candle {
        Candle::new(
            self.timestamps_ms[idx],
            self.open_prices[idx],
            self.high_prices[idx],
            self.low_prices[idx],
            self.close_prices[idx],
            self.volumes[idx],
        )
    }

    pub fn len(&self) -> usize {
        self.timestamps_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps_ms.is_empty()
    }

    pub fn candles(&self) -> impl Iterator<Item = Candle> + '_ {
        (0..self.len()).map(move |idx| self.get_candle(idx))
    }

    pub fn last_close(&self) -> Option<f64> {
        self.close_prices.last().copied()
    }

    pub fn last_timestamp_ms(&self) -> Option<i64> {
        self.timestamps_ms.last().copied()
    }

    pub fn last_time(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp_ms().map(ms_to_utc)
    }

    /// First index whose timestamp is at or after `start_ms`, through the end.
    pub fn indices_since(&self, start_ms: i64) -> (usize, usize) {
        let start = self.timestamps_ms.partition_point(|ts| *ts < start_ms);
        (start, self.len())
    }

    /// Indices of bars whose timestamps fall in `[start_ms, end_ms)`.
    pub fn indices_between(&self, start_ms: i64, end_ms: i64) -> (usize, usize) {
        let start = self.timestamps_ms.partition_point(|ts| *ts < start_ms);
        let end = self.timestamps_ms.partition_point(|ts| *ts < end_ms);
        (start, end.max(start))
    }

    /// Bars strictly before `date` (UTC midnight). Used to exclude the in-progress day.
    pub fn indices_before_date(&self, date: NaiveDate) -> (usize, usize) {
        let cutoff = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or(i64::MIN);
        (0, self.timestamps_ms.partition_point(|ts| *ts < cutoff))
    }

    /// Check structural soundness: equal column lengths, strictly increasing
    /// timestamps, `high >= low` and non-negative volume. Non-finite values
    /// are left to the sources that read them (see `require_finite`).
    pub fn validate(&self) -> Result<()> {
        let n = self.timestamps_ms.len();
        let lengths = [
            self.open_prices.len(),
            self.high_prices.len(),
            self.low_prices.len(),
            self.close_prices.len(),
            self.volumes.len(),
        ];
        if lengths.iter().any(|len| *len != n) {
            return Err(ConfluenceError::InvalidInput(format!(
                "column lengths differ: timestamps {} vs {:?}",
                n, lengths
            )));
        }

        if let Some(pos) = self.timestamps_ms.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ConfluenceError::InvalidInput(format!(
                "timestamps not strictly increasing at index {}",
                pos + 1
            )));
        }

        for (idx, candle) in self.candles().enumerate() {
            if candle.high_price < candle.low_price {
                return Err(ConfluenceError::InvalidInput(format!(
                    "bar {} has high {} below low {}",
                    idx, candle.high_price, candle.low_price
                )));
            }
            if candle.volume < 0.0 {
                return Err(ConfluenceError::InvalidInput(format!(
                    "bar {} has negative volume {}",
                    idx, candle.volume
                )));
            }
        }
        Ok(())
    }

    /// `Computation` for `origin` if any price (and volume, when `with_volume`)
    /// is NaN or infinite.
    pub fn require_finite(&self, origin: SourceKind, with_volume: bool) -> Result<()> {
        let bad = self.candles().position(|c| {
            if with_volume {
                !c.is_finite()
            } else {
                !c.prices_finite()
            }
        });
        match bad {
            Some(idx) => Err(ConfluenceError::Computation {
                origin,
                detail: format!("non-finite value in bar {}", idx),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::TimeUtils;

    fn series_of(n: usize, step_ms: i64) -> OhlcvTimeSeries {
        let candles: Vec<Candle> = (0..n)
            .map(|i| {
                let p = 100.0 + i as f64;
                Candle::new(i as i64 * step_ms, p, p + 1.0, p - 1.0, p + 0.5, 10.0)
            })
            .collect();
        OhlcvTimeSeries::from_candles(&candles)
    }

    #[test]
    fn test_indices_since_with_gaps() {
        let mut series = series_of(3, TimeUtils::MS_IN_15_MIN);
        // A gap of a whole day before the fourth bar.
        series.push(Candle::new(TimeUtils::MS_IN_D, 1.0, 2.0, 0.5, 1.5, 3.0));
        assert!(series.validate().is_ok());
        assert_eq!(series.indices_since(TimeUtils::MS_IN_15_MIN), (1, 4));
        assert_eq!(series.indices_since(TimeUtils::MS_IN_H), (3, 4));
        assert_eq!(series.indices_since(TimeUtils::MS_IN_W), (4, 4));
    }

    #[test]
    fn test_indices_between_is_half_open() {
        let series = series_of(5, 10);
        assert_eq!(series.indices_between(10, 30), (1, 3));
        assert_eq!(series.indices_between(30, 10), (3, 3));
    }

    #[test]
    fn test_validate_rejects_unordered_timestamps() {
        let mut series = series_of(3, 10);
        series.timestamps_ms[2] = 10;
        assert!(matches!(
            series.validate(),
            Err(ConfluenceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_bar() {
        let mut series = series_of(3, 10);
        series.high_prices[1] = 50.0;
        assert!(series.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_ragged_columns() {
        let mut series = series_of(3, 10);
        series.volumes.pop();
        assert!(series.validate().is_err());
    }

    #[test]
    fn test_non_finite_bar_is_a_source_failure() {
        let mut series = series_of(4, 10);
        series.volumes[2] = f64::NAN;
        assert!(series.validate().is_ok());
        assert!(series.require_finite(SourceKind::Swings, false).is_ok());
        let err = series
            .require_finite(SourceKind::VolumeProfile, true)
            .unwrap_err();
        assert!(err.is_per_source());
        assert!(err.to_string().contains("bar 2"));

        series.close_prices[3] = f64::INFINITY;
        assert!(series.require_finite(SourceKind::Swings, false).is_err());
    }

    #[test]
    fn test_last_close() {
        assert_eq!(series_of(3, 10).last_close(), Some(102.5));
        assert_eq!(OhlcvTimeSeries::default().last_close(), None);
    }
}
