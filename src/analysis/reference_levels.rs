//! Prior-session and overnight reference levels (PDH, PDL, PDC, ONH, ONL).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ConfluenceConfig, SessionConfig};
use crate::domain::market_metrics::MarketMetrics;
use crate::domain::signal::{Signal, SourceKind, SourceType, Timeframe};
use crate::error::{ConfluenceError, Result};
use crate::models::timeseries::OhlcvTimeSeries;
use crate::utils::maths_utils::{get_max, get_min};
use crate::utils::time_utils::{date_time_to_ms, ms_to_utc, time_in_window};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferenceLevels {
    pub previous_day: Option<NaiveDate>,
    pub pdh: Option<f64>,
    pub pdl: Option<f64>,
    pub pdc: Option<f64>,
    pub onh: Option<f64>,
    pub onl: Option<f64>,
}

impl ReferenceLevels {
    pub fn named(&self) -> Vec<(&'static str, f64)> {
        [
            ("PDH", self.pdh),
            ("PDL", self.pdl),
            ("PDC", self.pdc),
            ("ONH", self.onh),
            ("ONL", self.onl),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }

    /// One low-width signal per available level.
    pub fn to_signals(&self, metrics: &MarketMetrics, config: &ConfluenceConfig) -> Vec<Signal> {
        let settings = config.sources.get(SourceType::ReferenceLevel);
        let width = settings.width_atr * metrics.m15_atr;
        self.named()
            .into_iter()
            .map(|(name, price)| {
                Signal::centered(
                    SourceType::ReferenceLevel,
                    name,
                    price,
                    width,
                    settings.weight,
                    Timeframe::Session,
                )
            })
            .collect()
    }
}

/// The most recent date before `target` that has at least one regular-session bar.
fn previous_trading_day(
    intraday: &OhlcvTimeSeries,
    target: NaiveDate,
    sessions: &SessionConfig,
) -> Option<NaiveDate> {
    let (_, end) = intraday.indices_before_date(target);
    (0..end).rev().find_map(|idx| {
        let dt = ms_to_utc(intraday.timestamps_ms[idx]);
        time_in_window(dt.time(), sessions.regular_open, sessions.regular_close)
            .then(|| dt.date_naive())
    })
}

/// Compute reference levels for the session of `analysis_time`.
///
/// Previous-day values come from the prior trading day's regular-session
/// bars. The overnight window runs from that day's regular close to the
/// target day's regular open, or to `analysis_time` if that is earlier.
pub fn collect_reference_levels(
    intraday: &OhlcvTimeSeries,
    analysis_time: DateTime<Utc>,
    sessions: &SessionConfig,
) -> ReferenceLevels {
    let target = analysis_time.date_naive();
    let mut levels = ReferenceLevels::default();

    let Some(prev_day) = previous_trading_day(intraday, target, sessions) else {
        log::warn!("No previous trading day found before {}", target);
        return levels;
    };
    levels.previous_day = Some(prev_day);

    let session_start = date_time_to_ms(prev_day, sessions.regular_open);
    let session_end = date_time_to_ms(prev_day, sessions.regular_close);
    let (start, end) = intraday.indices_between(session_start, session_end);
    if start < end {
        let highs = &intraday.high_prices[start..end];
        let lows = &intraday.low_prices[start..end];
        levels.pdh = Some(get_max(highs));
        levels.pdl = Some(get_min(lows));
        levels.pdc = Some(intraday.close_prices[end - 1]);
    }

    let overnight_start = session_end;
    let overnight_end =
        date_time_to_ms(target, sessions.regular_open).min(analysis_time.timestamp_millis());
    let (start, end) = intraday.indices_between(overnight_start, overnight_end);
    if start < end {
        let highs = &intraday.high_prices[start..end];
        let lows = &intraday.low_prices[start..end];
        levels.onh = Some(get_max(highs));
        levels.onl = Some(get_min(lows));
    } else {
        log::debug!("No overnight bars between {} and {}", prev_day, target);
    }

    levels
}

/// Reference levels for the run, or `DataInsufficient` without intraday bars.
pub fn reference_levels_for(
    intraday: &OhlcvTimeSeries,
    analysis_time: DateTime<Utc>,
    sessions: &SessionConfig,
) -> Result<ReferenceLevels> {
    if intraday.is_empty() {
        return Err(ConfluenceError::DataInsufficient {
            origin: SourceKind::ReferenceLevels,
            required: 1,
            available: 0,
        });
    }
    intraday.require_finite(SourceKind::ReferenceLevels, false)?;
    Ok(collect_reference_levels(intraday, analysis_time, sessions))
}
