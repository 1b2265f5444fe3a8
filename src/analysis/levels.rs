//! Manually supplied weekly/daily levels and ATR band levels.

use serde::{Deserialize, Serialize};

use crate::config::{ConfluenceConfig, MAX_DAILY_LEVELS, MAX_WEEKLY_LEVELS};
use crate::domain::market_metrics::MarketMetrics;
use crate::domain::signal::{Signal, SourceType, Timeframe};
use crate::error::{ConfluenceError, Result};

/// Up to four weekly and six daily hand-picked price levels.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawManualLevels")]
pub struct ManualLevels {
    weekly: Vec<f64>,
    daily: Vec<f64>,
}

#[derive(Deserialize)]
struct RawManualLevels {
    #[serde(default)]
    weekly: Vec<f64>,
    #[serde(default)]
    daily: Vec<f64>,
}

impl TryFrom<RawManualLevels> for ManualLevels {
    type Error = ConfluenceError;

    fn try_from(raw: RawManualLevels) -> Result<Self> {
        ManualLevels::new(raw.weekly, raw.daily)
    }
}

fn check_prices(label: &str, prices: &[f64], max: usize) -> Result<()> {
    if prices.len() > max {
        return Err(ConfluenceError::InvalidInput(format!(
            "at most {} {} levels allowed, got {}",
            max,
            label,
            prices.len()
        )));
    }
    if let Some(bad) = prices.iter().find(|p| !p.is_finite() || **p <= 0.0) {
        return Err(ConfluenceError::InvalidInput(format!(
            "{} level must be a positive price, got {}",
            label, bad
        )));
    }
    Ok(())
}

impl ManualLevels {
    pub fn new(weekly: Vec<f64>, daily: Vec<f64>) -> Result<Self> {
        check_prices("weekly", &weekly, MAX_WEEKLY_LEVELS)?;
        check_prices("daily", &daily, MAX_DAILY_LEVELS)?;
        Ok(Self { weekly, daily })
    }

    pub fn weekly(&self) -> &[f64] {
        &self.weekly
    }

    pub fn daily(&self) -> &[f64] {
        &self.daily
    }

    pub fn is_empty(&self) -> bool {
        self.weekly.is_empty() && self.daily.is_empty()
    }

    /// `WL1..` and `DL1..` signals, each centred on its level.
    pub fn to_signals(&self, metrics: &MarketMetrics, config: &ConfluenceConfig) -> Vec<Signal> {
        let mut signals = Vec::with_capacity(self.weekly.len() + self.daily.len());
        let groups = [
            (SourceType::WeeklyLevel, "WL", Timeframe::Weekly, &self.weekly),
            (SourceType::DailyLevel, "DL", Timeframe::Daily, &self.daily),
        ];
        for (source_type, prefix, timeframe, prices) in groups {
            let settings = config.sources.get(source_type);
            let width = settings.width_atr * metrics.m15_atr;
            for (i, price) in prices.iter().enumerate() {
                signals.push(Signal::centered(
                    source_type,
                    format!("{}{}", prefix, i + 1),
                    *price,
                    width,
                    settings.weight,
                    timeframe,
                ));
            }
        }
        signals
    }
}

/// `current_price ± daily_atr`, the expected daily excursion bounds.
pub fn atr_band_signals(metrics: &MarketMetrics, config: &ConfluenceConfig) -> Vec<Signal> {
    let settings = config.sources.get(SourceType::AtrLevel);
    let width = settings.width_atr * metrics.m15_atr;
    [
        ("ATR_HIGH", metrics.current_price + metrics.daily_atr),
        ("ATR_LOW", metrics.current_price - metrics.daily_atr),
    ]
    .into_iter()
    .map(|(name, price)| {
        Signal::centered(
            SourceType::AtrLevel,
            name,
            price,
            width,
            settings.weight,
            Timeframe::Daily,
        )
    })
    .collect()
}
