//! Camarilla pivot levels for the previous day, week and month.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::ConfluenceConfig;
use crate::domain::market_metrics::MarketMetrics;
use crate::domain::signal::{Signal, SourceKind, SourceType, Timeframe};
use crate::error::{ConfluenceError, Result};
use crate::models::timeseries::OhlcvTimeSeries;
use crate::utils::time_utils::ms_to_utc;

/// Camarilla multipliers for levels 1..4.
const CAMARILLA_MULTIPLIERS: [f64; 4] = [1.1 / 12.0, 1.1 / 6.0, 1.1 / 4.0, 1.1 / 2.0];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodHlc {
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PeriodHlc {
    pub fn is_finite(&self) -> bool {
        self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }
}

/// Explicit previous-period values. Missing periods are derived from daily bars.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotInputs {
    pub daily: Option<PeriodHlc>,
    pub weekly: Option<PeriodHlc>,
    pub monthly: Option<PeriodHlc>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize, strum_macros::EnumIter)]
pub enum PivotPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl PivotPeriod {
    pub fn source_type(&self) -> SourceType {
        match self {
            PivotPeriod::Daily => SourceType::PivotDaily,
            PivotPeriod::Weekly => SourceType::PivotWeekly,
            PivotPeriod::Monthly => SourceType::PivotMonthly,
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        match self {
            PivotPeriod::Daily => Timeframe::Daily,
            PivotPeriod::Weekly => Timeframe::Weekly,
            PivotPeriod::Monthly => Timeframe::Monthly,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            PivotPeriod::Daily => "D",
            PivotPeriod::Weekly => "W",
            PivotPeriod::Monthly => "M",
        }
    }

    fn explicit(&self, inputs: &PivotInputs) -> Option<PeriodHlc> {
        match self {
            PivotPeriod::Daily => inputs.daily,
            PivotPeriod::Weekly => inputs.weekly,
            PivotPeriod::Monthly => inputs.monthly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotLevel {
    /// `R1`..`R4` or `S1`..`S4`.
    pub name: String,
    pub price: f64,
    /// 1 (inner) to 4 (outer).
    pub strength: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CamarillaPivots {
    pub period: PivotPeriod,
    pub central_pivot: f64,
    pub range: f64,
    pub levels: Vec<PivotLevel>,
}

/// Eight Camarilla levels around `hlc.close`. `None` for a zero or negative range.
pub fn camarilla(period: PivotPeriod, hlc: PeriodHlc) -> Option<CamarillaPivots> {
    let range = hlc.high - hlc.low;
    if !(range > 0.0) {
        return None;
    }

    let mut levels = Vec::with_capacity(8);
    for (i, mult) in CAMARILLA_MULTIPLIERS.iter().enumerate() {
        levels.push(PivotLevel {
            name: format!("R{}", i + 1),
            price: hlc.close + range * mult,
            strength: i + 1,
        });
    }
    for (i, mult) in CAMARILLA_MULTIPLIERS.iter().enumerate() {
        levels.push(PivotLevel {
            name: format!("S{}", i + 1),
            price: hlc.close - range * mult,
            strength: i + 1,
        });
    }

    Some(CamarillaPivots {
        period,
        central_pivot: (hlc.high + hlc.low + hlc.close) / 3.0,
        range,
        levels,
    })
}

fn aggregate(daily: &OhlcvTimeSeries, from: NaiveDate, to: NaiveDate) -> Option<PeriodHlc> {
    let mut hlc: Option<PeriodHlc> = None;
    for candle in daily.candles() {
        let date = ms_to_utc(candle.timestamp_ms).date_naive();
        if date < from || date >= to {
            continue;
        }
        hlc = Some(match hlc {
            None => PeriodHlc {
                high: candle.high_price,
                low: candle.low_price,
                close: candle.close_price,
            },
            Some(acc) => PeriodHlc {
                high: acc.high.max(candle.high_price),
                low: acc.low.min(candle.low_price),
                close: candle.close_price,
            },
        });
    }
    hlc
}

/// Previous completed period strictly before `analysis_date`, from daily bars.
///
/// Daily uses the last bar before the analysis date (weekends and holidays
/// simply have no bar). Weekly uses the prior ISO week, monthly the prior
/// calendar month.
pub fn derive_period_hlc(
    daily: &OhlcvTimeSeries,
    period: PivotPeriod,
    analysis_date: NaiveDate,
) -> Option<PeriodHlc> {
    match period {
        PivotPeriod::Daily => {
            let (_, end) = daily.indices_before_date(analysis_date);
            let candle = daily.get_candle(end.checked_sub(1)?);
            Some(PeriodHlc {
                high: candle.high_price,
                low: candle.low_price,
                close: candle.close_price,
            })
        }
        PivotPeriod::Weekly => {
            let days_from_monday = analysis_date.weekday().num_days_from_monday() as u64;
            let this_monday = analysis_date.checked_sub_days(Days::new(days_from_monday))?;
            let prev_monday = this_monday.checked_sub_days(Days::new(7))?;
            aggregate(daily, prev_monday, this_monday)
        }
        PivotPeriod::Monthly => {
            let first_of_month = analysis_date.with_day(1)?;
            let first_of_prev = first_of_month.checked_sub_months(Months::new(1))?;
            aggregate(daily, first_of_prev, first_of_month)
        }
    }
}

/// Pivot signals for every period that has (explicit or derivable) inputs.
pub fn pivot_signals(
    daily: &OhlcvTimeSeries,
    inputs: &PivotInputs,
    analysis_date: NaiveDate,
    metrics: &MarketMetrics,
    config: &ConfluenceConfig,
) -> Result<Vec<Signal>> {
    use strum::IntoEnumIterator;

    let mut signals = Vec::new();
    let mut periods_with_data = 0;
    let daily_finite = daily.require_finite(SourceKind::Pivots, false);

    for period in PivotPeriod::iter() {
        let source_type = period.source_type();
        if !config.sources.is_enabled(source_type) {
            continue;
        }
        let hlc = match period.explicit(inputs) {
            Some(hlc) => Some(hlc),
            None => {
                daily_finite.clone()?;
                derive_period_hlc(daily, period, analysis_date)
            }
        };
        let Some(hlc) = hlc else {
            log::debug!("no previous-period bars for {:?} pivots", period);
            continue;
        };
        if !hlc.is_finite() {
            return Err(ConfluenceError::Computation {
                origin: SourceKind::Pivots,
                detail: format!("{:?} high/low/close is not finite", period),
            });
        }
        periods_with_data += 1;

        let Some(pivots) = camarilla(period, hlc) else {
            log::debug!("{:?} pivot range is zero, skipping", period);
            continue;
        };

        let settings = config.sources.get(source_type);
        let width = settings.width_atr * metrics.m15_atr;
        for level in &pivots.levels {
            let strength = config.pivots.level_strengths[level.strength - 1];
            signals.push(Signal::centered(
                source_type,
                format!("{}_{}", period.prefix(), level.name),
                level.price,
                width,
                settings.weight * strength,
                period.timeframe(),
            ));
        }
    }

    if periods_with_data == 0 && daily.is_empty() {
        return Err(ConfluenceError::DataInsufficient {
            origin: SourceKind::Pivots,
            required: 1,
            available: 0,
        });
    }
    Ok(signals)
}
