//! §4.8 data model: OSM candidate rows and their route-type scoring.

pub mod candidate;
pub mod scoring;

pub use candidate::{load_candidates, normalize_name, OsmCandidate};
pub use scoring::node_cost;
