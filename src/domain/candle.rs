use serde::{Deserialize, Serialize};

/// One OHLCV bar. `timestamp_ms` is the bar open time (UTC epoch millis).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp_ms: i64,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        timestamp_ms: i64,
        open_price: f64,
        high_price: f64,
        low_price: f64,
        close_price: f64,
        volume: f64,
    ) -> Self {
        Candle {
            timestamp_ms,
            open_price,
            high_price,
            low_price,
            close_price,
            volume,
        }
    }

    pub fn range(&self) -> f64 {
        self.high_price - self.low_price
    }

    /// True range against the previous bar's close (plain range for the first bar).
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => self
                .range()
                .max((self.high_price - pc).abs())
                .max((self.low_price - pc).abs()),
            None => self.range(),
        }
    }

    pub fn prices_finite(&self) -> bool {
        self.open_price.is_finite()
            && self.high_price.is_finite()
            && self.low_price.is_finite()
            && self.close_price.is_finite()
    }

    pub fn is_finite(&self) -> bool {
        self.prices_finite() && self.volume.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_true_range_uses_gap_from_previous_close() {
        let candle = Candle::new(0, 101.0, 102.0, 100.5, 101.5, 10.0);
        assert_eq!(candle.true_range(None), 1.5);
        // Gap up: previous close well below today's low.
        assert_eq!(candle.true_range(Some(98.0)), 4.0);
        // Gap down: previous close above today's high.
        assert_eq!(candle.true_range(Some(103.0)), 2.5);
    }
}
