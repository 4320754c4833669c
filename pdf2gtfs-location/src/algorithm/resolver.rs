//! §4.9's min-heap Dijkstra over the implicit stop×candidate graph.
//! Grounded on `original_source/.../locate/finder/loc_nodes.py`'s
//! `Node`/`MNode`, `update_parent_if_better`, `NodeHeap`/`HeapNode`
//! (sorted doubly-linked list); the heap itself is built on
//! `skiplist::OrderedSkipList`, the same crate
//! `bambam-gtfs/src/model/traversal/transit/schedule.rs` uses as a
//! sorted container (`Schedule = OrderedSkipList<Departure>`).

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use ordered_float::OrderedFloat;
use pdf2gtfs_core::config::EngineConfig;
use skiplist::OrderedSkipList;

use crate::algorithm::graph::{haversine_meters, travel_cost, DistanceBounds};
use crate::error::LocationError;
use crate::model::OsmCandidate;

/// a vertex of the implicit graph: either one of a stop's OSM
/// candidates, or the stop's missing-location sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexId {
    Candidate { stop_idx: usize, candidate_idx: usize },
    Missing { stop_idx: usize },
}

impl VertexId {
    pub fn stop_idx(self) -> usize {
        match self {
            VertexId::Candidate { stop_idx, .. } | VertexId::Missing { stop_idx } => stop_idx,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, VertexId::Missing { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    cost: OrderedFloat<f64>,
    seq: u64,
    vertex: VertexId,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.seq == other.seq
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost.cmp(&other.cost).then(self.seq.cmp(&other.seq))
    }
}

/// §9 "heap re-cost": rather than physically removing a stale entry
/// (which would need a `remove`-by-value operation this crate's
/// `skiplist` usage elsewhere never exercises), an improved cost is
/// just inserted again; the lower-cost copy sorts first and is popped
/// first, so the higher-cost copy is always still in the list the
/// first time a vertex is finalized — later pops of it are caught by
/// the `visited` check and treated as the stale entries they are.
struct Heap {
    list: OrderedSkipList<HeapEntry>,
    next_seq: u64,
}

impl Heap {
    fn new() -> Self {
        Heap { list: OrderedSkipList::new(), next_seq: 0 }
    }

    fn push(&mut self, vertex: VertexId, cost: f64) {
        let entry = HeapEntry { cost: OrderedFloat(cost), seq: self.next_seq, vertex };
        self.next_seq += 1;
        self.list.insert(entry);
    }

    fn pop_min(&mut self) -> Option<VertexId> {
        self.list.pop_front().map(|entry| entry.vertex)
    }
}

fn vertices_for_stop(stop_idx: usize, candidates: &[Vec<OsmCandidate>]) -> Vec<VertexId> {
    let mut vertices: Vec<VertexId> = candidates[stop_idx]
        .iter()
        .enumerate()
        .map(|(candidate_idx, _)| VertexId::Candidate { stop_idx, candidate_idx })
        .collect();
    vertices.push(VertexId::Missing { stop_idx });
    vertices
}

fn location_of(vertex: VertexId, candidates: &[Vec<OsmCandidate>]) -> Option<geo::Point<f64>> {
    match vertex {
        VertexId::Candidate { stop_idx, candidate_idx } => {
            let c = &candidates[stop_idx][candidate_idx];
            Some(geo::Point::new(c.lon, c.lat))
        }
        VertexId::Missing { .. } => None,
    }
}

/// §4.9 "Vertex cost": `name_cost + node_cost` for a candidate, or the
/// configured `missing_node_cost` for the missing sentinel.
/// `stop_penalty` has no counterpart in the retrieved source and no
/// dedicated config field, so it is folded in as 0.
fn intrinsic_cost(vertex: VertexId, candidates: &[Vec<OsmCandidate>], config: &EngineConfig) -> f64 {
    match vertex {
        VertexId::Candidate { stop_idx, candidate_idx } => {
            let c = &candidates[stop_idx][candidate_idx];
            c.name_cost + c.node_cost
        }
        VertexId::Missing { .. } => f64::from(config.missing_node_cost),
    }
}

/// §9: "missing vertices ... close to everything" — an edge touching a
/// missing vertex always exists and costs nothing to traverse; only
/// two real candidates are filtered by the distance band.
fn edge_travel_cost(
    from: VertexId,
    to: VertexId,
    candidates: &[Vec<OsmCandidate>],
    bounds: Option<DistanceBounds>,
    config: &EngineConfig,
) -> f64 {
    match (location_of(from, candidates), location_of(to, candidates)) {
        (Some(a), Some(b)) => {
            let Some(bounds) = bounds else {
                return f64::INFINITY;
            };
            let distance = haversine_meters(a, b);
            if distance < bounds.lower || distance > bounds.upper {
                return f64::INFINITY;
            }
            travel_cost(distance, bounds, config)
        }
        _ => 0.0,
    }
}

fn reconstruct(mut vertex: VertexId, parent: &HashMap<VertexId, VertexId>) -> Vec<VertexId> {
    let mut route = vec![vertex];
    while let Some(&p) = parent.get(&vertex) {
        route.push(p);
        vertex = p;
    }
    route.reverse();
    route
}

/// §4.9's full algorithm: builds the implicit graph over
/// `stop_ids.len()` stops and returns the winning vertex for each stop
/// in order, lowest-cost-first Dijkstra with a missing-location
/// sentinel guaranteeing every stop stays reachable.
pub fn resolve_route(
    stop_ids: &[String],
    candidates_by_stop: &HashMap<String, Vec<OsmCandidate>>,
    bounds: &[DistanceBounds],
    config: &EngineConfig,
) -> Result<Vec<VertexId>, LocationError> {
    if stop_ids.is_empty() {
        return Err(LocationError::EmptyRoute);
    }
    let candidates: Vec<Vec<OsmCandidate>> =
        stop_ids.iter().map(|id| candidates_by_stop.get(id).cloned().unwrap_or_default()).collect();

    if stop_ids.len() == 1 {
        let best = vertices_for_stop(0, &candidates)
            .into_iter()
            .min_by(|a, b| {
                intrinsic_cost(*a, &candidates, config)
                    .partial_cmp(&intrinsic_cost(*b, &candidates, config))
                    .unwrap_or(Ordering::Equal)
            })
            .expect("every stop has at least its missing vertex");
        return Ok(vec![best]);
    }

    let mut best_cost: HashMap<VertexId, f64> = HashMap::new();
    let mut parent: HashMap<VertexId, VertexId> = HashMap::new();
    let mut visited: HashSet<VertexId> = HashSet::new();
    let mut heap = Heap::new();

    for stop_idx in 0..stop_ids.len() {
        for vertex in vertices_for_stop(stop_idx, &candidates) {
            let cost = if stop_idx == 0 { 0.0 } else { f64::INFINITY };
            best_cost.insert(vertex, cost);
            if stop_idx == 0 {
                heap.push(vertex, cost);
            }
        }
    }

    let last_stop = stop_ids.len() - 1;
    let mut finished: Option<VertexId> = None;

    while let Some(vertex) = heap.pop_min() {
        if visited.contains(&vertex) {
            continue;
        }
        visited.insert(vertex);

        let stop_idx = vertex.stop_idx();
        if stop_idx == last_stop {
            finished = Some(vertex);
            break;
        }

        let next_idx = stop_idx + 1;
        let pair_bounds = bounds.get(stop_idx).copied();
        for next in vertices_for_stop(next_idx, &candidates) {
            let travel = edge_travel_cost(vertex, next, &candidates, pair_bounds, config);
            if !travel.is_finite() {
                continue;
            }
            let tentative = best_cost[&vertex] + travel + intrinsic_cost(next, &candidates, config);
            if tentative < *best_cost.get(&next).unwrap_or(&f64::INFINITY) {
                best_cost.insert(next, tentative);
                parent.insert(next, vertex);
                heap.push(next, tentative);
            }
        }
    }

    let finished = finished.ok_or(LocationError::RouteDoesNotTerminate)?;
    let route = reconstruct(finished, &parent);
    let missing_count = route.iter().filter(|v| v.is_missing()).count();
    if missing_count > 0 {
        log::debug!("resolved route uses the missing vertex for {missing_count} of {} stops", route.len());
    }
    Ok(route)
}

/// §9 "Selection across routes": for each stop, the vertex chosen most
/// often across `routes` wins; ties favor any non-missing vertex over
/// a missing one, and further ties keep whichever was seen first.
pub fn select_by_majority(routes: &[Vec<VertexId>]) -> Vec<VertexId> {
    let num_stops = routes.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut result = Vec::with_capacity(num_stops);
    for stop_idx in 0..num_stops {
        let mut counts: Vec<(VertexId, usize)> = Vec::new();
        for route in routes {
            if let Some(&v) = route.get(stop_idx) {
                match counts.iter_mut().find(|(id, _)| *id == v) {
                    Some(entry) => entry.1 += 1,
                    None => counts.push((v, 1)),
                }
            }
        }
        let best = counts.into_iter().fold(None::<(VertexId, usize)>, |acc, (v, n)| match acc {
            None => Some((v, n)),
            Some((bv, bn)) if n > bn || (n == bn && bv.is_missing() && !v.is_missing()) => Some((v, n)),
            acc => acc,
        });
        if let Some((v, _)) = best {
            result.push(v);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf2gtfs_core::config::test_config;

    fn candidate(stop_id: &str, lat: f64, lon: f64, name_cost: f64, node_cost: f64) -> OsmCandidate {
        OsmCandidate { stop_id: stop_id.to_string(), lat, lon, names: vec![], name_cost, node_cost }
    }

    #[test]
    fn resolves_a_two_stop_route_along_the_cheaper_candidate() {
        let config = test_config();
        let stops = vec!["a".to_string(), "b".to_string()];
        let mut by_stop = HashMap::new();
        by_stop.insert("a".to_string(), vec![candidate("a", 48.0, 7.85, 0.0, 0.0)]);
        by_stop.insert(
            "b".to_string(),
            vec![candidate("b", 48.01, 7.86, 0.0, 3.0), candidate("b", 48.005, 7.855, 0.0, 0.0)],
        );
        let bounds = vec![DistanceBounds { lower: 50.0, mid: 800.0, upper: 2000.0 }];
        let route = resolve_route(&stops, &by_stop, &bounds, &config).unwrap();
        assert_eq!(route.len(), 2);
        assert_eq!(route[1], VertexId::Candidate { stop_idx: 1, candidate_idx: 1 });
    }

    #[test]
    fn falls_back_to_missing_vertex_when_no_candidate_is_close_enough() {
        let config = test_config();
        let stops = vec!["a".to_string(), "b".to_string()];
        let mut by_stop = HashMap::new();
        by_stop.insert("a".to_string(), vec![candidate("a", 48.0, 7.85, 0.0, 0.0)]);
        by_stop.insert("b".to_string(), vec![candidate("b", 49.5, 9.5, 0.0, 0.0)]);
        let bounds = vec![DistanceBounds { lower: 50.0, mid: 800.0, upper: 2000.0 }];
        let route = resolve_route(&stops, &by_stop, &bounds, &config).unwrap();
        assert_eq!(route[1], VertexId::Missing { stop_idx: 1 });
    }

    #[test]
    fn empty_stop_list_is_an_error() {
        let config = test_config();
        let result = resolve_route(&[], &HashMap::new(), &[], &config);
        assert!(matches!(result, Err(LocationError::EmptyRoute)));
    }

    #[test]
    fn majority_vote_prefers_non_missing_on_ties() {
        let missing = VertexId::Missing { stop_idx: 0 };
        let real = VertexId::Candidate { stop_idx: 0, candidate_idx: 0 };
        let routes = vec![vec![missing], vec![real]];
        assert_eq!(select_by_majority(&routes), vec![real]);
    }
}
