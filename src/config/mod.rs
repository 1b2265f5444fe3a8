//! Configuration module for the confluence engine.

pub mod analysis;

mod debug; // Private: callers go through the re-exported flags.
pub use debug::{
    PRINT_CLUSTER_DETAILS, PRINT_INHERITANCE_MATCHES, PRINT_SNAPSHOT_IO, PRINT_SOURCE_SUMMARY,
};

// Re-export commonly used items
pub use analysis::{
    CandleConfig, ClusterConfig, ConfluenceConfig, DEFAULT_ATR_PERIOD, DEFAULT_CLUSTER_DISTANCE_ATR,
    DEFAULT_MAX_ZONE_WIDTH_ATR, DEFAULT_SCAN_RANGE_ATR, FractalZoneMode, InheritanceConfig,
    MAX_DAILY_LEVELS, MAX_WEEKLY_LEVELS, OverlapMetric, PivotConfig, RefinementConfig,
    ScoringConfig, SessionConfig, SourceSettings, SourceTable, SwingConfig, TierThresholds,
    VolumeProfileConfig, VolumeTimeframe,
};
