use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::domain::signal::{Signal, SourceKind, SourceType};
use crate::domain::zone::{ConfluenceLevel, DiscoveredZone};
use crate::error::ConfluenceError;

/// A source whose contribution was skipped or discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceWarning {
    pub source: SourceKind,
    pub message: String,
}

impl SourceWarning {
    pub fn from_error(source: SourceKind, err: &ConfluenceError) -> Self {
        Self {
            source,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Every standardized signal produced, before the active range filter.
    pub total_signals_considered: usize,
    pub signals_in_range: usize,
    pub zones_discovered: usize,
    pub zones_at_or_above_l3: usize,
    /// Mean confluence score over discovered zones, 0 when there are none.
    pub average_score: f64,
    /// Distinct source types among the in-range signals.
    pub distinct_source_types: usize,
    /// Fewer than two distinct source types fed the clustering.
    pub low_confidence: bool,
    pub zones_inherited: usize,
    pub zones_recency_boosted: usize,
    pub signals_per_source: BTreeMap<SourceType, usize>,
    pub warnings: Vec<SourceWarning>,
}

impl RunStatistics {
    pub fn record_signals(&mut self, signals: &[Signal]) {
        self.total_signals_considered = signals.len();
        self.signals_per_source = signals
            .iter()
            .map(|s| s.source_type())
            .counts()
            .into_iter()
            .collect();
    }

    /// Diversity is judged on what actually reaches clustering.
    pub fn record_in_range(&mut self, in_range: &[Signal]) {
        self.signals_in_range = in_range.len();
        self.distinct_source_types = in_range
            .iter()
            .map(|s| s.source_type())
            .unique()
            .count();
        self.low_confidence = self.distinct_source_types < 2;
    }

    pub fn record_zones(&mut self, zones: &[DiscoveredZone]) {
        self.zones_discovered = zones.len();
        self.zones_at_or_above_l3 = zones
            .iter()
            .filter(|z| z.confluence_level >= ConfluenceLevel::L3)
            .count();
        self.average_score = if zones.is_empty() {
            0.0
        } else {
            zones.iter().map(|z| z.confluence_score).mean()
        };
    }

    pub fn warn(&mut self, source: SourceKind, err: &ConfluenceError) {
        log::warn!("{} skipped: {}", source, err);
        self.warnings.push(SourceWarning::from_error(source, err));
    }
}
