use serde::{Deserialize, Serialize};

use crate::domain::candle::Candle;
use crate::utils::maths_utils::RangeF64;

/// Volume-by-price histogram over a fixed price range.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub volumes: Vec<f64>,
    pub price_range: RangeF64,
    pub total_candles: usize,

    pub start_timestamp_ms: i64,
    pub end_timestamp_ms: i64,
}

/// One histogram bucket with its share of total volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub index: usize,
    pub low: f64,
    pub high: f64,
    pub center: f64,
    pub volume: f64,
    pub percent_of_total: f64,
}

impl VolumeProfile {
    /// Empty histogram over `[min_price, max_price]`. Caller guarantees
    /// `max_price > min_price` and `levels > 0`.
    pub fn new(min_price: f64, max_price: f64, levels: usize) -> Self {
        let price_range = RangeF64::new(min_price, max_price, levels);
        let n_slices = price_range.n_chunks();

        VolumeProfile {
            volumes: vec![0.0; n_slices],
            price_range,
            total_candles: 0,
            start_timestamp_ms: 0,
            end_timestamp_ms: 0,
        }
    }

    /// Build a profile from `candles`, spanning their lowest low to highest high.
    /// Returns `None` for an empty or flat window.
    pub fn from_candles(candles: &[Candle], levels: usize) -> Option<Self> {
        let first = candles.first()?;
        let last = candles.last()?;
        let (min_price, max_price) = candles.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), c| (lo.min(c.low_price), hi.max(c.high_price)),
        );
        if levels == 0 || !(max_price > min_price) {
            return None;
        }

        let mut profile = VolumeProfile::new(min_price, max_price, levels);
        profile.start_timestamp_ms = first.timestamp_ms;
        profile.end_timestamp_ms = last.timestamp_ms;
        for candle in candles {
            profile.add_candle(candle);
        }
        Some(profile)
    }

    pub fn add_candle(&mut self, candle: &Candle) {
        let (price_min, price_max) = self.price_range.min_max();
        let clamp = |price: f64| price.max(price_min).min(price_max);

        self.total_candles += 1;
        self.increase_volume_multi_levels_spread(
            clamp(candle.low_price),
            clamp(candle.high_price),
            candle.volume,
        );
    }

    /// Spread `volume` evenly over every bucket `[start_range, end_range]` touches.
    /// A zero-width bar drops its whole volume into one bucket.
    pub fn increase_volume_multi_levels_spread(
        &mut self,
        start_range: f64,
        end_range: f64,
        volume: f64,
    ) {
        let range_copy = self.price_range.clone();
        if start_range == end_range {
            let index = range_copy.chunk_index(start_range);
            if let Some(slot) = self.volumes.get_mut(index) {
                *slot += volume;
            }
            return;
        }

        let num_chunks = range_copy.count_intersecting_chunks(start_range, end_range);
        if num_chunks == 0 {
            log::warn!(
                "Warning: num_chunks is 0 for range [{}, {}]. Skipping.",
                start_range,
                end_range
            );
            return;
        }

        // Density: each bucket gets an equal share of the bar's volume.
        let quantity_per_level = volume / (num_chunks as f64);
        let start_chunk = range_copy.chunk_index(start_range.min(end_range));

        self.volumes
            .iter_mut()
            .skip(start_chunk)
            .take(num_chunks)
            .for_each(|v| *v += quantity_per_level);
    }

    pub fn total_volume(&self) -> f64 {
        self.volumes.iter().sum()
    }

    /// Every bucket with its percentage share. Empty when total volume is zero.
    pub fn price_levels(&self) -> Vec<PriceLevel> {
        let total = self.total_volume();
        if !(total > 0.0) {
            return Vec::new();
        }
        self.volumes
            .iter()
            .enumerate()
            .map(|(index, &volume)| {
                let (low, high) = self.price_range.chunk_bounds(index);
                PriceLevel {
                    index,
                    low,
                    high,
                    center: (low + high) / 2.0,
                    volume,
                    percent_of_total: volume / total * 100.0,
                }
            })
            .collect()
    }
}
