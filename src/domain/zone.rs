use serde::{Deserialize, Serialize};

use crate::domain::candle::Candle;
use crate::domain::signal::Signal;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ZoneType {
    Support,
    Resistance,
}

impl ZoneType {
    pub fn for_center(center_price: f64, current_price: f64) -> Self {
        if center_price > current_price {
            ZoneType::Resistance
        } else {
            ZoneType::Support
        }
    }
}

/// Ordinal confidence tier, L1 lowest.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumIter,
)]
pub enum ConfluenceLevel {
    L1,
    L2,
    L3,
    L4,
    L5,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredZone {
    pub zone_id: u32,
    pub zone_low: f64,
    pub zone_high: f64,
    pub center_price: f64,
    pub zone_width: f64,
    pub zone_type: ZoneType,
    pub confluence_score: f64,
    pub confluence_level: ConfluenceLevel,
    pub contributing_signals: Vec<Signal>,
    pub distance_from_price: f64,
    pub distance_percentage: f64,
    /// Overlap fraction with the inherited fractal, when one was matched.
    pub fractal_overlap: Option<f64>,
    #[serde(default)]
    pub best_candle: Option<BestCandle>,
    /// Recency multiplier applied from `best_candle`, when that pass ran.
    #[serde(default)]
    pub recency_score: Option<f64>,
}

/// The M15 bar that overlaps a zone most, relative to its own range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestCandle {
    pub candle: Candle,
    /// Overlap with the zone as a fraction of the bar's high-low range.
    pub overlap_pct: f64,
    pub days_old: i64,
}

impl DiscoveredZone {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.zone_low && price <= self.zone_high
    }

    /// Refresh `distance_from_price` and `distance_percentage` for `current_price`.
    pub fn update_distance(&mut self, current_price: f64) {
        self.distance_from_price = (self.center_price - current_price).abs();
        self.distance_percentage = if current_price != 0.0 {
            self.distance_from_price / current_price * 100.0
        } else {
            0.0
        };
    }

    pub fn set_bounds(&mut self, zone_low: f64, zone_high: f64) {
        self.zone_low = zone_low;
        self.zone_high = zone_high;
        self.zone_width = zone_high - zone_low;
    }
}
