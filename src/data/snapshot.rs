use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::PRINT_SNAPSHOT_IO;
use crate::engine::AnalysisInput;

pub const SNAPSHOT_VERSION: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Bincode,
}

impl SnapshotFormat {
    /// `.bin` is bincode, anything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("bin") => SnapshotFormat::Bincode,
            _ => SnapshotFormat::Json,
        }
    }
}

/// One or more analysis inputs on disk, with a format version and the
/// time the file was written.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SnapshotFile {
    #[serde(default = "default_version")]
    pub version: f64,
    #[serde(default)]
    pub timestamp_ms: i64,
    pub inputs: Vec<AnalysisInput>,
}

fn default_version() -> f64 {
    SNAPSHOT_VERSION
}

impl SnapshotFile {
    pub fn new(inputs: Vec<AnalysisInput>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            timestamp_ms: Utc::now().timestamp_millis(),
            inputs,
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).context(format!("Failed to open snapshot: {:?}", path))?;
        let reader = BufReader::new(file);
        let snapshot: SnapshotFile = match SnapshotFormat::from_path(path) {
            SnapshotFormat::Bincode => bincode::deserialize_from(reader)
                .context(format!("Failed to deserialize snapshot: {:?}", path))?,
            SnapshotFormat::Json => serde_json::from_reader(reader)
                .context(format!("Failed to parse snapshot: {:?}", path))?,
        };

        if snapshot.version > SNAPSHOT_VERSION {
            bail!(
                "Snapshot {:?} has version {}, newest supported is {}",
                path,
                snapshot.version,
                SNAPSHOT_VERSION
            );
        }
        if PRINT_SNAPSHOT_IO {
            log::info!(
                "Loaded {} input(s) from {}",
                snapshot.inputs.len(),
                path.display()
            );
        }
        Ok(snapshot)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create directory: {}", parent.display()))?;
        }
        let file =
            File::create(path).context(format!("Failed to create file: {}", path.display()))?;
        let writer = BufWriter::new(file);
        match SnapshotFormat::from_path(path) {
            SnapshotFormat::Bincode => bincode::serialize_into(writer, self)
                .context(format!("Failed to serialize snapshot to: {}", path.display()))?,
            SnapshotFormat::Json => serde_json::to_writer_pretty(writer, self)
                .context(format!("Failed to write snapshot to: {}", path.display()))?,
        }
        if PRINT_SNAPSHOT_IO {
            log::info!("Saved {} input(s) to {}", self.inputs.len(), path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ManualLevels, PeriodHlc};
    use crate::domain::candle::Candle;
    use crate::domain::market_metrics::MarketMetrics;
    use crate::models::timeseries::OhlcvTimeSeries;
    use crate::utils::time_utils::ms_to_utc;

    fn sample_input() -> AnalysisInput {
        let mut input = AnalysisInput::new("SPY", ms_to_utc(1_750_000_000_000));
        input.m15 = OhlcvTimeSeries::from_candles(&[
            Candle::new(1_749_999_000_000, 100.0, 101.0, 99.5, 100.5, 1200.0),
            Candle::new(1_749_999_900_000, 100.5, 101.5, 100.0, 101.0, 900.0),
        ]);
        input.metrics = Some(MarketMetrics::new(101.0, 2.0, 0.4).unwrap());
        input.pivots.weekly = Some(PeriodHlc {
            high: 104.0,
            low: 97.0,
            close: 100.0,
        });
        input.manual_levels = ManualLevels::new(vec![105.0], vec![99.0, 102.0]).unwrap();
        input
    }

    #[test]
    fn test_round_trip_json_and_bincode() {
        let dir = std::env::temp_dir().join(format!("confluence-snapshot-{}", std::process::id()));
        let snapshot = SnapshotFile::new(vec![sample_input()]);

        for name in ["snapshot.json", "snapshot.bin"] {
            let path = dir.join(name);
            snapshot.save_to_path(&path).unwrap();
            let loaded = SnapshotFile::load_from_path(&path).unwrap();
            assert_eq!(loaded, snapshot);
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{ "inputs": [ { "symbol": "QQQ", "analysis_time": "2025-06-11T15:00:00Z" } ] }"#;
        let snapshot: SnapshotFile = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.inputs[0].symbol, "QQQ");
        assert!(snapshot.inputs[0].m15.is_empty());
        assert!(snapshot.inputs[0].manual_levels.is_empty());
    }

    #[test]
    fn test_format_follows_extension() {
        assert_eq!(SnapshotFormat::from_path(Path::new("a/b.BIN")), SnapshotFormat::Bincode);
        assert_eq!(SnapshotFormat::from_path(Path::new("a/b.json")), SnapshotFormat::Json);
        assert_eq!(SnapshotFormat::from_path(Path::new("noext")), SnapshotFormat::Json);
    }
}
