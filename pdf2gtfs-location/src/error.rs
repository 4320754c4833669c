//! Errors raised while preparing OSM candidates and resolving locations
//! (§4.8/§4.9), grounded on `bambam-gtfs/src/schedule/schedule_error.rs`'s
//! one-enum-per-crate shape.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("malformed OSM snapshot row {0}: {1}")]
    MalformedSnapshotRow(usize, String),
    #[error("route has no stops to resolve")]
    EmptyRoute,
    #[error("stop '{0}' has no reachable neighbor and no missing-vertex fallback")]
    Unreachable(String),
    #[error("the resolved route never reaches the last stop")]
    RouteDoesNotTerminate,
}
