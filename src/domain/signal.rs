use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of price-level sources. Each variant has its own row in the
/// configured source table (enable flag, weight, zone width).
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
    strum_macros::EnumIter,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SourceType {
    VolumeNode,
    PivotDaily,
    PivotWeekly,
    PivotMonthly,
    Fractal,
    ReferenceLevel,
    AtrLevel,
    WeeklyLevel,
    DailyLevel,
}

impl SourceType {
    /// The component that produces signals of this type.
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceType::VolumeNode => SourceKind::VolumeProfile,
            SourceType::PivotDaily | SourceType::PivotWeekly | SourceType::PivotMonthly => {
                SourceKind::Pivots
            }
            SourceType::Fractal => SourceKind::Swings,
            SourceType::ReferenceLevel => SourceKind::ReferenceLevels,
            SourceType::AtrLevel => SourceKind::AtrBands,
            SourceType::WeeklyLevel | SourceType::DailyLevel => SourceKind::ManualLevels,
        }
    }
}

/// Producer of a signal list. Failures are reported per kind.
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
    strum_macros::EnumIter,
    strum_macros::Display,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SourceKind {
    VolumeProfile,
    Pivots,
    Swings,
    ReferenceLevels,
    AtrBands,
    ManualLevels,
}

/// Horizon a signal was derived from.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Timeframe {
    /// Rolling lookback of N calendar days.
    Lookback { days: u32 },
    M15,
    Session,
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Timeframe::Lookback { days } => write!(f, "{}d", days),
            Timeframe::M15 => write!(f, "m15"),
            Timeframe::Session => write!(f, "session"),
            Timeframe::Daily => write!(f, "daily"),
            Timeframe::Weekly => write!(f, "weekly"),
            Timeframe::Monthly => write!(f, "monthly"),
        }
    }
}

/// A standardized price level. Construction guarantees
/// `zone_low <= center_price <= zone_high`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    source_type: SourceType,
    name: String,
    center_price: f64,
    zone_low: f64,
    zone_high: f64,
    weight: f64,
    timeframe: Timeframe,
}

impl Signal {
    /// A zone of total `width` centred on `center_price`.
    pub fn centered(
        source_type: SourceType,
        name: impl Into<String>,
        center_price: f64,
        width: f64,
        weight: f64,
        timeframe: Timeframe,
    ) -> Self {
        let half = width.abs() / 2.0;
        Self {
            source_type,
            name: name.into(),
            center_price,
            zone_low: center_price - half,
            zone_high: center_price + half,
            weight,
            timeframe,
        }
    }

    /// A zone with explicit bounds. Bounds are reordered and widened to contain the centre.
    pub fn with_bounds(
        source_type: SourceType,
        name: impl Into<String>,
        center_price: f64,
        bound_a: f64,
        bound_b: f64,
        weight: f64,
        timeframe: Timeframe,
    ) -> Self {
        let zone_low = bound_a.min(bound_b).min(center_price);
        let zone_high = bound_a.max(bound_b).max(center_price);
        Self {
            source_type,
            name: name.into(),
            center_price,
            zone_low,
            zone_high,
            weight,
            timeframe,
        }
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn center_price(&self) -> f64 {
        self.center_price
    }

    pub fn zone_low(&self) -> f64 {
        self.zone_low
    }

    pub fn zone_high(&self) -> f64 {
        self.zone_high
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn is_finite(&self) -> bool {
        self.center_price.is_finite()
            && self.zone_low.is_finite()
            && self.zone_high.is_finite()
            && self.weight.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_centered_signal_contains_center() {
        let s = Signal::centered(SourceType::PivotDaily, "R3", 100.0, 0.5, 1.0, Timeframe::Daily);
        assert_eq!(s.zone_low(), 99.75);
        assert_eq!(s.zone_high(), 100.25);
        assert!(s.zone_low() <= s.center_price() && s.center_price() <= s.zone_high());
    }

    #[test]
    fn test_with_bounds_reorders_and_contains_center() {
        let s = Signal::with_bounds(
            SourceType::Fractal,
            "swing-high",
            105.0,
            104.0,
            103.0,
            2.5,
            Timeframe::M15,
        );
        assert_eq!(s.zone_low(), 103.0);
        assert_eq!(s.zone_high(), 105.0);
    }

    #[test]
    fn test_source_type_names_round_trip() {
        for st in SourceType::iter() {
            let label = st.to_string();
            assert_eq!(SourceType::from_str(&label).unwrap(), st);
        }
        assert_eq!(SourceType::VolumeNode.to_string(), "volume-node");
    }

    #[test]
    fn test_every_source_type_maps_to_a_kind() {
        assert_eq!(SourceType::PivotMonthly.kind(), SourceKind::Pivots);
        assert_eq!(SourceType::DailyLevel.kind(), SourceKind::ManualLevels);
        assert_eq!(SourceKind::ReferenceLevels.to_string(), "reference-levels");
    }
}
