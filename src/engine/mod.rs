pub mod context;
pub mod core;
pub mod messages;
pub mod stats;

// Re-export key components
pub use core::ConfluenceEngine;
pub use messages::{AnalysisInput, ZoneDiscoveryResult};
pub use stats::{RunStatistics, SourceWarning};
