use crate::config::RefinementConfig;
use crate::domain::market_metrics::MarketMetrics;
use crate::domain::zone::{DiscoveredZone, ZoneType};

/// Resize every zone to exactly `width`, centred on its centre price.
pub fn snap_widths(zones: &mut [DiscoveredZone], width: f64) {
    for zone in zones.iter_mut() {
        let half = width / 2.0;
        zone.set_bounds(zone.center_price - half, zone.center_price + half);
    }
}

/// Score descending, then distance ascending, then centre ascending.
pub fn sort_by_rank(zones: &mut [DiscoveredZone]) {
    zones.sort_by(|a, b| {
        b.confluence_score
            .total_cmp(&a.confluence_score)
            .then_with(|| a.distance_from_price.total_cmp(&b.distance_from_price))
            .then_with(|| a.center_price.total_cmp(&b.center_price))
    });
}

/// Keep the first `n` zones on each side of price. Input must already be ranked.
pub fn cap_per_side(zones: Vec<DiscoveredZone>, n: usize) -> Vec<DiscoveredZone> {
    let mut above = 0;
    let mut below = 0;
    zones
        .into_iter()
        .filter(|zone| {
            let count = match zone.zone_type {
                ZoneType::Resistance => &mut above,
                ZoneType::Support => &mut below,
            };
            *count += 1;
            *count <= n
        })
        .collect()
}

/// Optional width snapping, quality filtering and final ranking.
/// Zone ids are assigned 1..n in ranked order.
pub fn refine_and_rank(
    mut zones: Vec<DiscoveredZone>,
    metrics: &MarketMetrics,
    config: &RefinementConfig,
) -> Vec<DiscoveredZone> {
    if let Some(snap) = config.snap_width_atr {
        snap_widths(&mut zones, snap * metrics.m15_atr);
    }
    for zone in zones.iter_mut() {
        zone.update_distance(metrics.current_price);
    }

    if let Some(min_level) = config.min_level {
        zones.retain(|z| z.confluence_level >= min_level);
    }

    sort_by_rank(&mut zones);

    if let Some(n) = config.max_per_side {
        zones = cap_per_side(zones, n);
    }

    for (i, zone) in zones.iter_mut().enumerate() {
        zone.zone_id = (i + 1) as u32;
    }
    zones
}
