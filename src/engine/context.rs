use chrono::{DateTime, Utc};

use crate::analysis::pivots::pivot_signals;
use crate::analysis::reference_levels::reference_levels_for;
use crate::analysis::swings::detect_swings;
use crate::analysis::volume_nodes::volume_node_signals;
use crate::analysis::ReferenceLevels;
use crate::config::ConfluenceConfig;
use crate::domain::fractal::Fractal;
use crate::domain::market_metrics::MarketMetrics;
use crate::domain::signal::{Signal, SourceType};
use crate::error::Result;

use super::messages::AnalysisInput;

/// Immutable state for one run: its own copy of the configuration, the
/// resolved market metrics and, once the sources have joined, the
/// standardized signal list. Never shared between runs.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: ConfluenceConfig,
    pub metrics: MarketMetrics,
    pub analysis_time: DateTime<Utc>,
    pub signals: Vec<Signal>,
}

impl RunContext {
    pub fn new(config: ConfluenceConfig, metrics: MarketMetrics, analysis_time: DateTime<Utc>) -> Self {
        Self {
            config,
            metrics,
            analysis_time,
            signals: Vec::new(),
        }
    }

    pub fn is_enabled(&self, source_type: SourceType) -> bool {
        self.config.sources.is_enabled(source_type)
    }

    // --- LEAF SOURCES (pure over the input) ---

    pub fn volume_nodes(&self, input: &AnalysisInput) -> Result<Vec<Signal>> {
        if !self.is_enabled(SourceType::VolumeNode) {
            return Ok(Vec::new());
        }
        volume_node_signals(&input.m15, &self.metrics, &self.config)
    }

    pub fn pivots(&self, input: &AnalysisInput) -> Result<Vec<Signal>> {
        pivot_signals(
            &input.daily,
            &input.pivots,
            self.analysis_time.date_naive(),
            &self.metrics,
            &self.config,
        )
    }

    /// Swings are detected whenever they feed signals or inheritance.
    pub fn swings(&self, input: &AnalysisInput) -> Result<Vec<Fractal>> {
        if !self.is_enabled(SourceType::Fractal) && !self.config.inheritance.enabled {
            return Ok(Vec::new());
        }
        detect_swings(&input.m15, &self.config.swings)
    }

    pub fn reference_levels(&self, input: &AnalysisInput) -> Result<ReferenceLevels> {
        if !self.is_enabled(SourceType::ReferenceLevel) {
            return Ok(ReferenceLevels::default());
        }
        reference_levels_for(&input.m15, self.analysis_time, &self.config.sessions)
    }
}
