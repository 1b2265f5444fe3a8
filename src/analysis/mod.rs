// Signal sources, clustering and zone scoring
pub mod atr;
pub mod best_candle;
pub mod inheritance;
pub mod levels;
pub mod pivots;
pub mod reference_levels;
pub mod refinement;
pub mod swings;
pub mod volume_nodes;
pub mod zone_scoring;

// Re-export commonly used types
pub use levels::ManualLevels;
pub use pivots::{PeriodHlc, PivotInputs};
pub use reference_levels::ReferenceLevels;
pub use volume_nodes::VolumeNode;
pub use zone_scoring::ScoreBreakdown;
