// Domain types and value objects
pub mod candle;
pub mod fractal;
pub mod market_metrics;
pub mod signal;
pub mod zone;

// Re-export commonly used types
pub use candle::Candle;
pub use fractal::{Fractal, FractalKind};
pub use market_metrics::MarketMetrics;
pub use signal::{Signal, SourceKind, SourceType, Timeframe};
pub use zone::{BestCandle, ConfluenceLevel, DiscoveredZone, ZoneType};
