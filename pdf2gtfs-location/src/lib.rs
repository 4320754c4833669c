//! §4.8/§4.9: turns an OSM snapshot and a timetable's stop sequence
//! into per-stop coordinates, via candidate preparation, a weighted
//! shortest-path resolver, and missing-coordinate interpolation.
//!
//! Multiple trip patterns ("routes" in §4.9's sense) sharing the same
//! stop sequence are resolved independently and combined by majority
//! vote (`algorithm::select_by_majority`) — `locate_stops` resolves a
//! single pattern; callers with several patterns call it once per
//! pattern and vote across the results themselves.

pub mod algorithm;
pub mod error;
pub mod model;

use std::collections::HashMap;

use gtfs_structures::RouteType;
use pdf2gtfs_core::config::EngineConfig;
use pdf2gtfs_gtfs::model::GtfsFeed;

pub use algorithm::VertexId;
pub use error::LocationError;
pub use model::OsmCandidate;

/// §4.8 + §4.9 + §4.9-step-4, run end to end for one stop sequence:
/// load candidates from the snapshot, resolve the cheapest path
/// through them, then interpolate any stops that landed on the
/// missing vertex. Returns one `(lat, lon)` per stop in
/// `stop_sequence`, or `None` where no location could be recovered at
/// all (route too short to interpolate, or entirely missing).
pub fn locate_stops(
    stop_sequence: &[(String, String)],
    feed: &GtfsFeed,
    trip_ids: &[String],
    snapshot: &str,
    route_type: RouteType,
    config: &EngineConfig,
) -> Result<Vec<Option<(f64, f64)>>, LocationError> {
    let candidates_by_stop = model::load_candidates(snapshot, stop_sequence, route_type, config)?;

    let avg_minutes = algorithm::average_inter_stop_minutes(feed, trip_ids);
    let bounds: Vec<algorithm::DistanceBounds> =
        avg_minutes.iter().map(|&m| algorithm::distance_bounds(m, config)).collect();

    let stop_ids: Vec<String> = stop_sequence.iter().map(|(id, _)| id.clone()).collect();
    let route = algorithm::resolve_route(&stop_ids, &candidates_by_stop, &bounds, config)?;

    let mut locations: Vec<Option<(f64, f64)>> = route
        .iter()
        .map(|vertex| match *vertex {
            VertexId::Candidate { stop_idx, candidate_idx } => {
                let c = &candidates_by_stop[&stop_ids[stop_idx]][candidate_idx];
                Some((c.lat, c.lon))
            }
            VertexId::Missing { .. } => None,
        })
        .collect();

    if config.interpolate_missing_locations {
        algorithm::interpolate_missing_locations(&mut locations);
    }
    Ok(locations)
}

/// copies resolved `(lat, lon)` pairs into the matching `GtfsStop`
/// entries — the location graph itself is discarded afterward, per
/// the data model's stated ownership: the graph only exists to
/// compute these coordinates.
pub fn apply_locations(feed: &mut GtfsFeed, stop_sequence: &[(String, String)], locations: &[Option<(f64, f64)>]) {
    for ((stop_id, _), location) in stop_sequence.iter().zip(locations) {
        let Some((lat, lon)) = location else { continue };
        if let Some(stop) = feed.stops.get_mut(stop_id) {
            stop.lat = Some(*lat);
            stop.lon = Some(*lon);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf2gtfs_core::config::test_config;

    const SNAPSHOT: &str = "lat\tlon\tpublic_transport\tbus\tref_ifopt\twheelchair\tnames\n48.0\t7.85\tstop_position\tyes\tDE:1\tyes\tHauptbahnhof\n48.01\t7.86\tstop_position\tyes\tDE:2\tyes\tRathaus\n";

    #[test]
    fn locate_stops_assigns_coordinates_to_a_matched_stop() {
        let config = test_config();
        let feed = GtfsFeed::empty();
        let stops = vec![("stop_0".to_string(), "Hauptbahnhof".to_string())];
        let result = locate_stops(&stops, &feed, &[], SNAPSHOT, RouteType::Bus, &config).unwrap();
        assert_eq!(result, vec![Some((48.0, 7.85))]);
    }

    #[test]
    fn apply_locations_writes_into_matching_gtfs_stops() {
        let mut feed = GtfsFeed::empty();
        feed.find_or_insert_stop("stop_0", "Hauptbahnhof");
        let stops = vec![("stop_0".to_string(), "Hauptbahnhof".to_string())];
        apply_locations(&mut feed, &stops, &[Some((48.0, 7.85))]);
        assert_eq!(feed.stops["stop_0"].lat, Some(48.0));
    }
}
