//! §4.9: distance-bound computation, the Dijkstra resolver, and
//! missing-coordinate interpolation.

pub mod graph;
pub mod interpolate;
pub mod resolver;

pub use graph::{average_inter_stop_minutes, distance_bounds, haversine_meters, travel_cost, DistanceBounds};
pub use interpolate::interpolate_missing_locations;
pub use resolver::{resolve_route, select_by_majority, VertexId};
