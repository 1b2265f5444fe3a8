// Snapshot loading and saving
pub mod snapshot;

pub use snapshot::SnapshotFile;
