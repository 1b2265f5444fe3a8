use serde::{Deserialize, Serialize};

use crate::error::{ConfluenceError, Result};

/// Price and volatility snapshot for one analysis run. Every width and
/// range calculation downstream is expressed in multiples of these ATRs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketMetrics {
    pub current_price: f64,
    pub daily_atr: f64,
    pub m15_atr: f64,
}

impl MarketMetrics {
    pub fn new(current_price: f64, daily_atr: f64, m15_atr: f64) -> Result<Self> {
        let metrics = Self {
            current_price,
            daily_atr,
            m15_atr,
        };
        metrics.validate()?;
        Ok(metrics)
    }

    /// The active range must be computable: all three values finite and positive.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("current_price", self.current_price),
            ("daily_atr", self.daily_atr),
            ("m15_atr", self.m15_atr),
        ];
        for (label, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfluenceError::MissingMarketMetrics(format!(
                    "{} must be positive and finite, got {}",
                    label, value
                )));
            }
        }
        Ok(())
    }

    /// `[current − k·daily_atr, current + k·daily_atr]`
    pub fn scan_range(&self, k: f64) -> (f64, f64) {
        (
            self.current_price - k * self.daily_atr,
            self.current_price + k * self.daily_atr,
        )
    }
}
