//! Analysis and computation configuration

use std::collections::BTreeMap;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::domain::{ConfluenceLevel, SourceType};
use crate::error::{ConfluenceError, Result};

// Scalar defaults. Everything here can be overridden through `ConfluenceConfig`.
pub const DEFAULT_ATR_PERIOD: usize = 14;
pub const DEFAULT_SCAN_RANGE_ATR: f64 = 2.0;
pub const DEFAULT_CLUSTER_DISTANCE_ATR: f64 = 1.5;
pub const DEFAULT_MAX_ZONE_WIDTH_ATR: f64 = 3.0;
pub const DEFAULT_MIN_ZONE_WIDTH_ATR: f64 = 0.1;
pub const DEFAULT_BONUS_RATE: f64 = 0.10;
pub const DEFAULT_WIDTH_PENALTY_THRESHOLD: f64 = 2.0;
pub const DEFAULT_PENALTY_FACTOR: f64 = 0.5;
pub const DEFAULT_SCORE_CEILING: f64 = 50.0;
pub const DEFAULT_COMPRESSION_FACTOR: f64 = 0.10;
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.25;
pub const DEFAULT_INHERITANCE_BOOST: f64 = 1.2;
pub const DEFAULT_CANDLE_LOOKBACK_DAYS: i64 = 30;
pub const DEFAULT_PROFILE_LEVELS: usize = 100;
pub const DEFAULT_PERCENTILE_THRESHOLD: f64 = 80.0;
pub const DEFAULT_FRACTAL_LENGTH: usize = 11;
pub const DEFAULT_MIN_FRACTAL_DISTANCE_ATR: f64 = 1.0;
pub const MAX_WEEKLY_LEVELS: usize = 4;
pub const MAX_DAILY_LEVELS: usize = 6;

/// One row of the source strategy table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    pub enabled: bool,
    /// Base weight contributed by each signal of this type.
    pub weight: f64,
    /// Full zone width as a multiple of the M15 ATR.
    pub width_atr: f64,
}

impl SourceSettings {
    const fn new(weight: f64, width_atr: f64) -> Self {
        Self {
            enabled: true,
            weight,
            width_atr,
        }
    }

    pub fn default_for(source_type: SourceType) -> Self {
        match source_type {
            SourceType::VolumeNode => Self::new(1.0, 0.3),
            SourceType::PivotDaily => Self::new(0.8, 0.15),
            SourceType::PivotWeekly => Self::new(2.0, 0.4),
            SourceType::PivotMonthly => Self::new(4.0, 0.5),
            SourceType::Fractal => Self::new(2.5, 0.3),
            SourceType::ReferenceLevel => Self::new(0.8, 0.15),
            SourceType::AtrLevel => Self::new(0.8, 1.0),
            SourceType::WeeklyLevel => Self::new(2.0, 1.0),
            SourceType::DailyLevel => Self::new(1.0, 0.3),
        }
    }
}

/// Per-type enable/weight/width table. Missing rows fall back to the built-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceTable(BTreeMap<SourceType, SourceSettings>);

impl Default for SourceTable {
    fn default() -> Self {
        Self(
            SourceType::iter()
                .map(|st| (st, SourceSettings::default_for(st)))
                .collect(),
        )
    }
}

impl SourceTable {
    pub fn get(&self, source_type: SourceType) -> SourceSettings {
        self.0
            .get(&source_type)
            .copied()
            .unwrap_or_else(|| SourceSettings::default_for(source_type))
    }

    pub fn set(&mut self, source_type: SourceType, settings: SourceSettings) {
        self.0.insert(source_type, settings);
    }

    pub fn is_enabled(&self, source_type: SourceType) -> bool {
        self.get(source_type).enabled
    }

    pub fn set_enabled(&mut self, source_type: SourceType, enabled: bool) {
        let mut row = self.get(source_type);
        row.enabled = enabled;
        self.set(source_type, row);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeTimeframe {
    pub days: u32,
    /// Multiplier on the volume-node base weight. Longer lookbacks carry more.
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeProfileConfig {
    pub levels: usize,
    pub percentile_threshold: f64,
    pub include_extended_hours: bool,
    pub max_nodes_per_timeframe: usize,
    pub timeframes: Vec<VolumeTimeframe>,
}

impl Default for VolumeProfileConfig {
    fn default() -> Self {
        Self {
            levels: DEFAULT_PROFILE_LEVELS,
            percentile_threshold: DEFAULT_PERCENTILE_THRESHOLD,
            include_extended_hours: true,
            max_nodes_per_timeframe: 5,
            timeframes: vec![
                VolumeTimeframe { days: 7, weight: 1.0 },
                VolumeTimeframe { days: 14, weight: 2.5 },
                VolumeTimeframe { days: 30, weight: 5.0 },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotConfig {
    /// Weight multipliers for levels 1..4 (inner to outer).
    pub level_strengths: [f64; 4],
}

impl Default for PivotConfig {
    fn default() -> Self {
        Self {
            level_strengths: [0.55, 0.7, 0.85, 1.0],
        }
    }
}

/// How a fractal's signal bounds are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FractalZoneMode {
    /// High/low of the bar that produced the swing.
    BarRange,
    /// `width_atr × m15_atr` centred on the swing price.
    AtrMultiple,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingConfig {
    /// Odd window length; `window_length / 2` bars are compared on each side.
    pub window_length: usize,
    pub min_atr_distance: f64,
    pub atr_period: usize,
    pub lookback_days: u32,
    pub zone_mode: FractalZoneMode,
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            window_length: DEFAULT_FRACTAL_LENGTH,
            min_atr_distance: DEFAULT_MIN_FRACTAL_DISTANCE_ATR,
            atr_period: DEFAULT_ATR_PERIOD,
            lookback_days: 90,
            zone_mode: FractalZoneMode::BarRange,
        }
    }
}

/// Session boundaries in UTC wall-clock time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub regular_open: NaiveTime,
    pub regular_close: NaiveTime,
    pub premarket_start: NaiveTime,
    /// End of the post-market window. Midnight wraps to the end of the day.
    pub postmarket_end: NaiveTime,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            regular_open: NaiveTime::from_hms_opt(13, 30, 0).unwrap_or_default(),
            regular_close: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or_default(),
            premarket_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            postmarket_end: NaiveTime::MIN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Active range half-width as a multiple of the daily ATR (`k`).
    pub scan_range_atr: f64,
    pub cluster_distance_atr: f64,
    pub max_zone_width_atr: f64,
    pub min_zone_width_atr: f64,
    /// Split chained clusters at their widest gap until each fits the width cap.
    pub resplit_oversized: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            scan_range_atr: DEFAULT_SCAN_RANGE_ATR,
            cluster_distance_atr: DEFAULT_CLUSTER_DISTANCE_ATR,
            max_zone_width_atr: DEFAULT_MAX_ZONE_WIDTH_ATR,
            min_zone_width_atr: DEFAULT_MIN_ZONE_WIDTH_ATR,
            resplit_oversized: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub bonus_rate: f64,
    pub width_penalty_threshold: f64,
    pub penalty_factor: f64,
    pub score_ceiling: f64,
    pub compression_factor: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            bonus_rate: DEFAULT_BONUS_RATE,
            width_penalty_threshold: DEFAULT_WIDTH_PENALTY_THRESHOLD,
            penalty_factor: DEFAULT_PENALTY_FACTOR,
            score_ceiling: DEFAULT_SCORE_CEILING,
            compression_factor: DEFAULT_COMPRESSION_FACTOR,
        }
    }
}

/// Minimum score for each tier. Anything below `l2` is L1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub l5: f64,
    pub l4: f64,
    pub l3: f64,
    pub l2: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            l5: 12.0,
            l4: 8.0,
            l3: 5.0,
            l2: 2.5,
        }
    }
}

impl TierThresholds {
    pub fn level_for(&self, score: f64) -> ConfluenceLevel {
        if score >= self.l5 {
            ConfluenceLevel::L5
        } else if score >= self.l4 {
            ConfluenceLevel::L4
        } else if score >= self.l3 {
            ConfluenceLevel::L3
        } else if score >= self.l2 {
            ConfluenceLevel::L2
        } else {
            ConfluenceLevel::L1
        }
    }

    fn validate(&self) -> Result<()> {
        let ordered = [self.l5, self.l4, self.l3, self.l2];
        if ordered.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(ConfluenceError::InvalidConfiguration(format!(
                "tier thresholds must be finite and non-negative: {:?}",
                self
            )));
        }
        if !ordered.windows(2).all(|w| w[0] > w[1]) {
            return Err(ConfluenceError::InvalidConfiguration(format!(
                "tier thresholds must strictly decrease from L5 to L2: {:?}",
                self
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlapMetric {
    IntersectionOverUnion,
    IntersectionOverSmaller,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InheritanceConfig {
    pub enabled: bool,
    pub overlap_threshold: f64,
    pub inheritance_boost: f64,
    pub metric: OverlapMetric,
}

impl Default for InheritanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            inheritance_boost: DEFAULT_INHERITANCE_BOOST,
            metric: OverlapMetric::IntersectionOverUnion,
        }
    }
}

/// Best-candle lookup and recency boost. Off unless enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandleConfig {
    pub enabled: bool,
    pub lookback_days: i64,
    /// Boost zones whose best candle is at most this many days old.
    pub recent_days: i64,
    pub recent_boost: f64,
    pub fresh_days: i64,
    pub fresh_boost: f64,
}

impl Default for CandleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            lookback_days: DEFAULT_CANDLE_LOOKBACK_DAYS,
            recent_days: 5,
            recent_boost: 1.2,
            fresh_days: 10,
            fresh_boost: 1.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RefinementConfig {
    /// Snap every zone to exactly this multiple of the M15 ATR.
    pub snap_width_atr: Option<f64>,
    /// Keep at most this many zones above and this many below the current price.
    pub max_per_side: Option<usize>,
    pub min_level: Option<ConfluenceLevel>,
}

/// The master configuration for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfluenceConfig {
    /// ATR period used when market metrics are derived from bars.
    pub atr_period: usize,
    pub sources: SourceTable,
    pub volume_profile: VolumeProfileConfig,
    pub pivots: PivotConfig,
    pub swings: SwingConfig,
    pub sessions: SessionConfig,
    pub cluster: ClusterConfig,
    pub scoring: ScoringConfig,
    pub tiers: TierThresholds,
    pub inheritance: InheritanceConfig,
    pub candles: CandleConfig,
    pub refinement: RefinementConfig,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            atr_period: DEFAULT_ATR_PERIOD,
            sources: SourceTable::default(),
            volume_profile: VolumeProfileConfig::default(),
            pivots: PivotConfig::default(),
            swings: SwingConfig::default(),
            sessions: SessionConfig::default(),
            cluster: ClusterConfig::default(),
            scoring: ScoringConfig::default(),
            tiers: TierThresholds::default(),
            inheritance: InheritanceConfig::default(),
            candles: CandleConfig::default(),
            refinement: RefinementConfig::default(),
        }
    }
}

fn require_positive(label: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfluenceError::InvalidConfiguration(format!(
            "{} must be positive and finite, got {}",
            label, value
        )))
    }
}

fn require_non_negative(label: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfluenceError::InvalidConfiguration(format!(
            "{} must be non-negative and finite, got {}",
            label, value
        )))
    }
}

impl ConfluenceConfig {
    /// Reject any configuration the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.atr_period == 0 {
            return Err(ConfluenceError::InvalidConfiguration(
                "atr_period must be at least 1".into(),
            ));
        }

        for st in SourceType::iter() {
            let row = self.sources.get(st);
            require_positive(&format!("sources.{}.weight", st), row.weight)?;
            require_non_negative(&format!("sources.{}.width_atr", st), row.width_atr)?;
        }

        let vp = &self.volume_profile;
        if vp.levels == 0 {
            return Err(ConfluenceError::InvalidConfiguration(
                "volume_profile.levels must be at least 1".into(),
            ));
        }
        if !(0.0..=100.0).contains(&vp.percentile_threshold) {
            return Err(ConfluenceError::InvalidConfiguration(format!(
                "volume_profile.percentile_threshold must be within [0, 100], got {}",
                vp.percentile_threshold
            )));
        }
        for tf in &vp.timeframes {
            if tf.days == 0 {
                return Err(ConfluenceError::InvalidConfiguration(
                    "volume_profile timeframe days must be at least 1".into(),
                ));
            }
            require_positive("volume_profile timeframe weight", tf.weight)?;
        }

        for strength in self.pivots.level_strengths {
            require_positive("pivots.level_strengths", strength)?;
        }

        let sw = &self.swings;
        if sw.window_length < 3 || sw.window_length % 2 == 0 {
            return Err(ConfluenceError::InvalidConfiguration(format!(
                "swings.window_length must be odd and at least 3, got {}",
                sw.window_length
            )));
        }
        if sw.atr_period == 0 {
            return Err(ConfluenceError::InvalidConfiguration(
                "swings.atr_period must be at least 1".into(),
            ));
        }
        require_non_negative("swings.min_atr_distance", sw.min_atr_distance)?;

        let ss = &self.sessions;
        if ss.regular_open >= ss.regular_close {
            return Err(ConfluenceError::InvalidConfiguration(format!(
                "sessions.regular_open ({}) must precede regular_close ({})",
                ss.regular_open, ss.regular_close
            )));
        }
        if ss.premarket_start >= ss.regular_open {
            return Err(ConfluenceError::InvalidConfiguration(format!(
                "sessions.premarket_start ({}) must precede regular_open ({})",
                ss.premarket_start, ss.regular_open
            )));
        }
        // Midnight closes the post-market window at the end of the day.
        if ss.postmarket_end <= ss.regular_close && ss.postmarket_end != NaiveTime::MIN {
            return Err(ConfluenceError::InvalidConfiguration(format!(
                "sessions.postmarket_end ({}) must follow regular_close ({}) or be 00:00",
                ss.postmarket_end, ss.regular_close
            )));
        }

        let cl = &self.cluster;
        require_positive("cluster.scan_range_atr", cl.scan_range_atr)?;
        require_positive("cluster.cluster_distance_atr", cl.cluster_distance_atr)?;
        require_positive("cluster.max_zone_width_atr", cl.max_zone_width_atr)?;
        require_positive("cluster.min_zone_width_atr", cl.min_zone_width_atr)?;
        if cl.min_zone_width_atr > cl.max_zone_width_atr {
            return Err(ConfluenceError::InvalidConfiguration(
                "cluster.min_zone_width_atr exceeds max_zone_width_atr".into(),
            ));
        }

        let sc = &self.scoring;
        require_non_negative("scoring.bonus_rate", sc.bonus_rate)?;
        require_positive("scoring.width_penalty_threshold", sc.width_penalty_threshold)?;
        require_non_negative("scoring.penalty_factor", sc.penalty_factor)?;
        require_positive("scoring.score_ceiling", sc.score_ceiling)?;
        require_non_negative("scoring.compression_factor", sc.compression_factor)?;

        self.tiers.validate()?;

        let inh = &self.inheritance;
        if !(0.0..=1.0).contains(&inh.overlap_threshold) {
            return Err(ConfluenceError::InvalidConfiguration(format!(
                "inheritance.overlap_threshold must be within [0, 1], got {}",
                inh.overlap_threshold
            )));
        }
        require_positive("inheritance.inheritance_boost", inh.inheritance_boost)?;

        let cd = &self.candles;
        if cd.lookback_days <= 0 {
            return Err(ConfluenceError::InvalidConfiguration(format!(
                "candles.lookback_days must be positive, got {}",
                cd.lookback_days
            )));
        }
        if cd.recent_days < 0 || cd.recent_days > cd.fresh_days {
            return Err(ConfluenceError::InvalidConfiguration(format!(
                "candles.recent_days ({}) must be within [0, fresh_days ({})]",
                cd.recent_days, cd.fresh_days
            )));
        }
        require_positive("candles.recent_boost", cd.recent_boost)?;
        require_positive("candles.fresh_boost", cd.fresh_boost)?;

        if let Some(snap) = self.refinement.snap_width_atr {
            require_positive("refinement.snap_width_atr", snap)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfluenceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_tiers() {
        let tiers = TierThresholds::default();
        assert_eq!(tiers.level_for(12.0), ConfluenceLevel::L5);
        assert_eq!(tiers.level_for(9.0), ConfluenceLevel::L4);
        assert_eq!(tiers.level_for(5.0), ConfluenceLevel::L3);
        assert_eq!(tiers.level_for(3.0), ConfluenceLevel::L2);
        assert_eq!(tiers.level_for(2.49), ConfluenceLevel::L1);
        assert_eq!(tiers.level_for(0.0), ConfluenceLevel::L1);
    }

    #[test]
    fn test_rejects_non_monotonic_tiers() {
        let mut config = ConfluenceConfig::default();
        config.tiers = TierThresholds {
            l5: 10.0,
            l4: 10.0,
            l3: 5.0,
            l2: 3.0,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfluenceError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_alternate_tier_set_is_accepted() {
        // The other threshold set found in older design notes.
        let mut config = ConfluenceConfig::default();
        config.tiers = TierThresholds {
            l5: 10.0,
            l4: 8.0,
            l3: 5.0,
            l2: 3.0,
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.tiers.level_for(10.5), ConfluenceLevel::L5);
    }

    #[test]
    fn test_rejects_zero_multiplier() {
        let mut config = ConfluenceConfig::default();
        config.cluster.cluster_distance_atr = 0.0;
        assert!(config.validate().is_err());

        let mut config = ConfluenceConfig::default();
        config.sources.set(
            SourceType::PivotDaily,
            SourceSettings {
                enabled: true,
                weight: -1.0,
                width_atr: 0.15,
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_even_fractal_window() {
        let mut config = ConfluenceConfig::default();
        config.swings.window_length = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_extended_sessions() {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();

        let mut config = ConfluenceConfig::default();
        config.sessions.premarket_start = t(14, 0);
        assert!(matches!(
            config.validate(),
            Err(ConfluenceError::InvalidConfiguration(_))
        ));

        let mut config = ConfluenceConfig::default();
        config.sessions.postmarket_end = t(19, 0);
        assert!(config.validate().is_err());
        config.sessions.postmarket_end = t(20, 0);
        assert!(config.validate().is_err());
        config.sessions.postmarket_end = t(23, 0);
        assert!(config.validate().is_ok());
        config.sessions.postmarket_end = NaiveTime::MIN;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_candle_recency_windows() {
        let mut config = ConfluenceConfig::default();
        config.candles.recent_days = 12;
        assert!(config.validate().is_err());

        let mut config = ConfluenceConfig::default();
        config.candles.lookback_days = 0;
        assert!(config.validate().is_err());

        let mut config = ConfluenceConfig::default();
        config.candles.fresh_boost = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{ "tiers": { "l5": 10.0 }, "cluster": { "cluster_distance_atr": 2.0 } }"#;
        let config: ConfluenceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.tiers.l5, 10.0);
        assert_eq!(config.tiers.l2, 2.5);
        assert_eq!(config.cluster.cluster_distance_atr, 2.0);
        assert_eq!(config.cluster.max_zone_width_atr, DEFAULT_MAX_ZONE_WIDTH_ATR);
        assert_eq!(config.sources.get(SourceType::Fractal).weight, 2.5);
    }

    #[test]
    fn test_source_table_round_trips_through_json() {
        let mut table = SourceTable::default();
        table.set_enabled(SourceType::AtrLevel, false);
        let json = serde_json::to_string(&table).unwrap();
        let back: SourceTable = serde_json::from_str(&json).unwrap();
        assert!(!back.is_enabled(SourceType::AtrLevel));
        assert!(back.is_enabled(SourceType::VolumeNode));
    }
}
