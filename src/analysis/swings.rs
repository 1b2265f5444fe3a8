use crate::analysis::atr::{rolling_atr, true_ranges};
use crate::config::{ConfluenceConfig, FractalZoneMode, SwingConfig};
use crate::domain::fractal::{Fractal, FractalKind};
use crate::domain::market_metrics::MarketMetrics;
use crate::domain::signal::{Signal, SourceKind, SourceType};
use crate::error::{ConfluenceError, Result};
use crate::models::timeseries::OhlcvTimeSeries;
use crate::utils::TimeUtils;

/// Bar index and kind of a raw windowed extremum, before spacing rules.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    idx: usize,
    kind: FractalKind,
}

fn is_swing_high(highs: &[f64], idx: usize, half: usize) -> bool {
    let h = highs[idx];
    (idx - half..=idx + half).all(|j| j == idx || h > highs[j])
}

fn is_swing_low(lows: &[f64], idx: usize, half: usize) -> bool {
    let l = lows[idx];
    (idx - half..=idx + half).all(|j| j == idx || l < lows[j])
}

/// Every bar whose high (low) strictly beats all others in its `±half` window.
/// Ordered by bar index, highs before lows on the same bar.
fn find_candidates(series: &OhlcvTimeSeries, half: usize) -> Vec<Candidate> {
    let n = series.len();
    if half == 0 || n < 2 * half + 1 {
        return Vec::new();
    }
    let mut candidates = Vec::new();
    for idx in half..n - half {
        if is_swing_high(&series.high_prices, idx, half) {
            candidates.push(Candidate {
                idx,
                kind: FractalKind::High,
            });
        }
        if is_swing_low(&series.low_prices, idx, half) {
            candidates.push(Candidate {
                idx,
                kind: FractalKind::Low,
            });
        }
    }
    candidates
}

/// Validated, mutually non-overlapping swing points over the configured lookback.
///
/// Candidates closer than `min_atr_distance × ATR` (ATR at the candidate bar)
/// to the last accepted swing are dropped. Survivors whose bar range touches
/// an earlier survivor's range are then dropped too.
pub fn detect_swings(m15: &OhlcvTimeSeries, config: &SwingConfig) -> Result<Vec<Fractal>> {
    let required = (config.atr_period + 1).max(config.window_length);
    if m15.len() < required {
        return Err(ConfluenceError::DataInsufficient {
            origin: SourceKind::Swings,
            required,
            available: m15.len(),
        });
    }
    m15.require_finite(SourceKind::Swings, false)?;

    let atr = rolling_atr(&true_ranges(m15), config.atr_period);
    let half = config.window_length / 2;

    let earliest_ms = m15
        .last_timestamp_ms()
        .map(|end| end - config.lookback_days as i64 * TimeUtils::MS_IN_D)
        .unwrap_or(i64::MIN);

    // Spacing pass
    let mut spaced: Vec<Fractal> = Vec::new();
    for candidate in find_candidates(m15, half) {
        let candle = m15.get_candle(candidate.idx);
        if candle.timestamp_ms < earliest_ms {
            continue;
        }
        let price = match candidate.kind {
            FractalKind::High => candle.high_price,
            FractalKind::Low => candle.low_price,
        };
        let atr_here = atr[candidate.idx];
        if !price.is_finite() || !atr_here.is_finite() {
            return Err(ConfluenceError::Computation {
                origin: SourceKind::Swings,
                detail: format!("non-finite price or ATR at bar {}", candidate.idx),
            });
        }

        if let Some(last) = spaced.last() {
            if (price - last.price).abs() < config.min_atr_distance * atr_here {
                continue;
            }
        }
        spaced.push(Fractal {
            kind: candidate.kind,
            timestamp_ms: candle.timestamp_ms,
            price,
            zone_low: candle.low_price,
            zone_high: candle.high_price,
            atr_at_detection: atr_here,
        });
    }

    // Overlap pass, oldest first
    let mut accepted: Vec<Fractal> = Vec::with_capacity(spaced.len());
    for fractal in spaced {
        if accepted.iter().all(|kept| !kept.overlaps(&fractal)) {
            accepted.push(fractal);
        }
    }

    log::debug!(
        "swing detector: {} bars, {} fractals accepted",
        m15.len(),
        accepted.len()
    );
    Ok(accepted)
}

/// Standardize fractals into signals per the configured zone mode.
pub fn fractal_signals(
    fractals: &[Fractal],
    metrics: &MarketMetrics,
    config: &ConfluenceConfig,
) -> Vec<Signal> {
    let settings = config.sources.get(SourceType::Fractal);
    fractals
        .iter()
        .map(|f| match config.swings.zone_mode {
            FractalZoneMode::BarRange => f.to_bar_signal(settings.weight),
            FractalZoneMode::AtrMultiple => {
                f.to_centered_signal(settings.width_atr * metrics.m15_atr, settings.weight)
            }
        })
        .collect()
}
