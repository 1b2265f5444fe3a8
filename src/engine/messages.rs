use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{ManualLevels, PivotInputs, ReferenceLevels};
use crate::domain::fractal::Fractal;
use crate::domain::market_metrics::MarketMetrics;
use crate::domain::zone::DiscoveredZone;
use crate::models::timeseries::OhlcvTimeSeries;

use super::stats::RunStatistics;

/// Everything one analysis run needs for a single symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisInput {
    pub symbol: String,
    pub analysis_time: DateTime<Utc>,
    /// Intraday bars (15-minute) for volume profile, swings and session levels.
    #[serde(default)]
    pub m15: OhlcvTimeSeries,
    /// Daily bars for ATR and derived pivot periods.
    #[serde(default)]
    pub daily: OhlcvTimeSeries,
    /// Explicit metrics. Derived from the bars when absent.
    #[serde(default)]
    pub metrics: Option<MarketMetrics>,
    #[serde(default)]
    pub pivots: PivotInputs,
    #[serde(default)]
    pub manual_levels: ManualLevels,
}

impl AnalysisInput {
    pub fn new(symbol: impl Into<String>, analysis_time: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            analysis_time,
            m15: OhlcvTimeSeries::default(),
            daily: OhlcvTimeSeries::default(),
            metrics: None,
            pivots: PivotInputs::default(),
            manual_levels: ManualLevels::default(),
        }
    }
}

/// The ranked zones and everything needed to explain them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDiscoveryResult {
    pub symbol: String,
    pub analysis_time: DateTime<Utc>,
    pub metrics: MarketMetrics,
    pub zones: Vec<DiscoveredZone>,
    pub fractals: Vec<Fractal>,
    pub reference_levels: ReferenceLevels,
    pub statistics: RunStatistics,
    pub duration_ms: u64,
}
