use serde::{Deserialize, Serialize};

use crate::domain::signal::{Signal, SourceType, Timeframe};
use crate::utils::maths_utils::ranges_intersect;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum FractalKind {
    High,
    Low,
}

/// A validated swing point. `zone_low..zone_high` is the full range of the
/// bar that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fractal {
    pub kind: FractalKind,
    pub timestamp_ms: i64,
    pub price: f64,
    pub zone_low: f64,
    pub zone_high: f64,
    pub atr_at_detection: f64,
}

impl Fractal {
    pub fn overlaps(&self, other: &Fractal) -> bool {
        ranges_intersect(self.zone_low, self.zone_high, other.zone_low, other.zone_high)
    }

    pub fn name(&self) -> String {
        format!("swing-{}@{}", self.kind, self.timestamp_ms)
    }

    /// Standardize into a signal spanning the producing bar.
    pub fn to_bar_signal(&self, weight: f64) -> Signal {
        Signal::with_bounds(
            SourceType::Fractal,
            self.name(),
            self.price,
            self.zone_low,
            self.zone_high,
            weight,
            Timeframe::M15,
        )
    }

    /// Standardize into a signal of fixed `width` centred on the swing price.
    pub fn to_centered_signal(&self, width: f64, weight: f64) -> Signal {
        Signal::centered(
            SourceType::Fractal,
            self.name(),
            self.price,
            width,
            weight,
            Timeframe::M15,
        )
    }
}
