// Data models the analysis components work over.
// Pure containers and accumulators, independent of scoring policy.

pub mod timeseries;
pub mod volume_profile;

// Re-export key types for convenience
pub use timeseries::OhlcvTimeSeries;
pub use volume_profile::{PriceLevel, VolumeProfile};
