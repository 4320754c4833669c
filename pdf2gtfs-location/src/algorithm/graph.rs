//! §4.9's implicit stop×candidate graph: distance bounds between
//! consecutive stops and the travel-cost formula used to weight edges.
//! Grounded on `original_source/.../locate/finder/stops.py`'s
//! `_get_distance_bounds`/`get_travel_distance` and
//! `.../loc_nodes.py::calculate_travel_cost_between`.

use itertools::Itertools;
use kdam::{Bar, BarExt};
use pdf2gtfs_core::config::EngineConfig;
use pdf2gtfs_gtfs::model::GtfsFeed;

/// `(lower, mid, upper)` great-circle distance bounds in meters between
/// two consecutive stops (§4.9).
#[derive(Debug, Clone, Copy)]
pub struct DistanceBounds {
    pub lower: f64,
    pub mid: f64,
    pub upper: f64,
}

fn meters_per_minute(config: &EngineConfig) -> f64 {
    config.average_speed_kmh * 1000.0 / 60.0
}

/// §4.9: bounds derived from one average inter-stop travel time.
pub fn distance_bounds(avg_minutes: f64, config: &EngineConfig) -> DistanceBounds {
    let m_per_min = meters_per_minute(config);
    let offset = config.average_travel_distance_offset_min;
    let lower = (avg_minutes - offset).max(0.0) * m_per_min;
    let mid = avg_minutes * m_per_min;
    let upper = (avg_minutes + offset) * m_per_min;
    DistanceBounds {
        lower: lower.max(config.min_travel_distance_m),
        mid: mid.max(config.min_travel_distance_m),
        upper: upper.max(config.min_travel_distance_m),
    }
}

/// one average inter-stop time (minutes) per consecutive stop pair
/// along a trip's stop sequence, averaged over every trip in
/// `trip_ids` — every trip on a route shares the same stop ordering,
/// so the pair at position `i` always means "stop `i` to stop `i+1`".
pub fn average_inter_stop_minutes(feed: &GtfsFeed, trip_ids: &[String]) -> Vec<f64> {
    let mut sums: Vec<f64> = Vec::new();
    let mut counts: Vec<u32> = Vec::new();

    let mut bar = Bar::builder().total(trip_ids.len()).desc("averaging inter-stop travel times").build().ok();
    for trip_id in trip_ids {
        let mut times: Vec<_> = feed.stop_times.iter().filter(|st| &st.trip_id == trip_id).collect();
        times.sort_by_key(|st| st.stop_sequence);
        for (idx, (from, to)) in times.iter().tuple_windows().enumerate() {
            let delta_min = ((to.departure_time.0 - from.arrival_time.0) as f64 / 60.0).max(0.0);
            if sums.len() <= idx {
                sums.resize(idx + 1, 0.0);
                counts.resize(idx + 1, 0);
            }
            sums[idx] += delta_min;
            counts[idx] += 1;
        }
        if let Some(b) = bar.as_mut() {
            let _ = b.update(1);
        }
    }
    if bar.is_some() {
        eprintln!();
    }
    log::debug!("averaged inter-stop travel times over {} trips", trip_ids.len());

    sums.iter()
        .zip(&counts)
        .map(|(&sum, &count)| if count > 0 { sum / f64::from(count) } else { 0.0 })
        .collect()
}

/// §4.9 edge cost: great-circle `distance` (m) between a vertex and its
/// chosen predecessor, weighted by the pair's `bounds`.
pub fn travel_cost(distance: f64, bounds: DistanceBounds, config: &EngineConfig) -> f64 {
    if distance < config.min_travel_distance_m {
        return f64::INFINITY;
    }
    if config.simple_travel_cost_calculation {
        return distance.max(1.0).log(8.0).floor();
    }

    let dist_to_mid = (distance - bounds.mid).abs().max(1.0);
    let mut log_base = 8.0;
    if distance < bounds.lower {
        log_base /= (bounds.lower / distance).floor().max(1.0);
    }
    if distance > bounds.upper {
        log_base /= (distance / bounds.upper).floor().max(1.0);
    }
    log_base = log_base.max(1.001);

    let inner = dist_to_mid.log(log_base).powi(4).max(1.0);
    inner.log(2.0).max(1.0).floor()
}

/// great-circle distance in meters, by the standard haversine formula
/// (hand-written rather than a `geo` crate distance trait, since the
/// retrieved pack has no precedent for which `geo` distance API
/// version applies — `geo::Point`'s `x`/`y` accessors are still the
/// coordinate representation).
pub fn haversine_meters(a: geo::Point<f64>, b: geo::Point<f64>) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let (lat1, lon1) = (a.y().to_radians(), a.x().to_radians());
    let (lat2, lon2) = (b.y().to_radians(), b.x().to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf2gtfs_core::config::test_config;

    #[test]
    fn distance_bounds_clamp_to_minimum() {
        let config = test_config();
        let bounds = distance_bounds(0.1, &config);
        assert_eq!(bounds.lower, config.min_travel_distance_m);
    }

    #[test]
    fn travel_cost_is_infinite_below_minimum_distance() {
        let config = test_config();
        let bounds = distance_bounds(5.0, &config);
        assert!(travel_cost(1.0, bounds, &config).is_infinite());
    }

    #[test]
    fn travel_cost_within_band_is_small() {
        let mut config = test_config();
        config.simple_travel_cost_calculation = false;
        let bounds = distance_bounds(5.0, &config);
        let cost = travel_cost(bounds.mid, bounds, &config);
        assert!(cost.is_finite() && cost >= 0.0);
    }

    #[test]
    fn haversine_near_antipodal_points_is_small_for_same_point() {
        let p = geo::Point::new(7.85, 48.0);
        assert!(haversine_meters(p, p) < 1e-6);
    }

    #[test]
    fn haversine_matches_known_distance_ballpark() {
        // Freiburg Hbf to Freiburg Rathaus, roughly 1.5km apart.
        let a = geo::Point::new(7.8413, 47.9978);
        let b = geo::Point::new(7.8526, 47.9947);
        let dist = haversine_meters(a, b);
        assert!((500.0..3000.0).contains(&dist));
    }
}
