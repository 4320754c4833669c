//! §4.8 OSM candidate preparation: reads the OSM snapshot body (see
//! §6, "OSM snapshot") and, per stop, keeps the rows whose name list
//! contains a whole-word occurrence of the stop's normalized name,
//! scored by `name_cost`/`node_cost`. Grounded on
//! `original_source/src/finder/osm_values.py`'s `score` method and
//! `original_source/.../locate/finder/loc_nodes.py::Nodes.filter_df_by_stop`
//! (a per-stop row filter feeding node construction).

use std::collections::HashMap;

use gtfs_structures::RouteType;
use pdf2gtfs_core::config::EngineConfig;
use rayon::prelude::*;
use regex::Regex;

use crate::error::LocationError;
use crate::model::scoring::node_cost;

/// one OSM row matched against a stop, with its §4.8 costs already
/// computed — the row frame keyed by `stop_id` the spec describes.
#[derive(Debug, Clone)]
pub struct OsmCandidate {
    pub stop_id: String,
    pub lat: f64,
    pub lon: f64,
    pub names: Vec<String>,
    pub name_cost: f64,
    pub node_cost: f64,
}

impl OsmCandidate {
    pub fn is_usable(&self) -> bool {
        self.node_cost.is_finite()
    }
}

#[derive(Debug, serde::Deserialize)]
struct SnapshotRow {
    lat: f64,
    lon: f64,
    #[serde(default)]
    public_transport: Option<String>,
    #[serde(default)]
    railway: Option<String>,
    #[serde(default)]
    bus: Option<String>,
    #[serde(default)]
    tram: Option<String>,
    #[serde(default)]
    train: Option<String>,
    #[serde(default)]
    subway: Option<String>,
    #[serde(default)]
    monorail: Option<String>,
    #[serde(default)]
    light_rail: Option<String>,
    #[serde(default)]
    ref_ifopt: Option<String>,
    #[serde(default)]
    wheelchair: Option<String>,
    names: String,
}

impl SnapshotRow {
    fn tags(&self) -> HashMap<&str, &str> {
        let mut tags = HashMap::new();
        for (key, value) in [
            ("public_transport", &self.public_transport),
            ("railway", &self.railway),
            ("bus", &self.bus),
            ("tram", &self.tram),
            ("train", &self.train),
            ("subway", &self.subway),
            ("monorail", &self.monorail),
            ("light_rail", &self.light_rail),
        ] {
            if let Some(v) = value {
                tags.insert(key, v.as_str());
            }
        }
        tags
    }
}

/// normalizes a stop or OSM name for §4.8 step 1 matching: apostrophe
/// folding, abbreviation expansion, punctuation stripping (beyond
/// `config.allowed_stop_chars`), whitespace collapsing, lowercasing.
pub fn normalize_name(text: &str, config: &EngineConfig) -> String {
    let folded = text.replace(['\u{2019}', '`'], "'").to_lowercase();
    let mut expanded = folded;
    for (abbrev, full) in &config.name_abbreviations {
        expanded = expanded.replace(&abbrev.to_lowercase(), &full.to_lowercase());
    }
    let kept: String = expanded
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || config.allowed_stop_chars.contains(c))
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn whole_word_match(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let pattern = format!(r"(?i)\b{}\b", regex::escape(needle));
    Regex::new(&pattern).map(|re| re.is_match(haystack)).unwrap_or(false)
}

/// §4.8 step 2: the minimum absolute length gap between the normalized
/// stop name and every pipe-list entry of `names` that matches it, or
/// `None` if no entry matches at all (row is dropped for this stop).
fn compute_name_cost(stop_normalized: &str, names: &str, config: &EngineConfig) -> Option<(f64, Vec<String>)> {
    let mut best: Option<f64> = None;
    let mut matched_names = Vec::new();
    for raw in names.split('|') {
        let normalized = normalize_name(raw, config);
        if !whole_word_match(&normalized, stop_normalized) {
            continue;
        }
        matched_names.push(raw.trim().to_string());
        let gap = (stop_normalized.chars().count() as i64 - normalized.chars().count() as i64).unsigned_abs() as f64;
        best = Some(best.map_or(gap, |b: f64| b.min(gap)));
    }
    best.map(|cost| (cost, matched_names))
}

fn strip_snapshot_comments(text: &str) -> String {
    text.lines().filter(|l| !l.trim_start().starts_with('#')).collect::<Vec<_>>().join("\n")
}

/// §4.8: reads the OSM snapshot body and returns, per stop id, every
/// usable candidate row (§4.8 step 3's "bad" rows are dropped here so
/// the resolver never has to special-case them). Rows are scored in
/// parallel, mirroring `bambam-osm`'s use of `rayon` for batched
/// per-node work.
pub fn load_candidates(
    snapshot: &str,
    stops: &[(String, String)],
    route_type: RouteType,
    config: &EngineConfig,
) -> Result<HashMap<String, Vec<OsmCandidate>>, LocationError> {
    let body = strip_snapshot_comments(snapshot);
    let mut reader = csv::ReaderBuilder::new().delimiter(b'\t').from_reader(body.as_bytes());

    let mut rows = Vec::new();
    for (i, record) in reader.deserialize::<SnapshotRow>().enumerate() {
        let row = record.map_err(|e| LocationError::MalformedSnapshotRow(i, e.to_string()))?;
        rows.push(row);
    }

    let normalized_stops: Vec<(&str, String)> =
        stops.iter().map(|(id, name)| (id.as_str(), normalize_name(name, config))).collect();

    let mut candidates: HashMap<String, Vec<OsmCandidate>> = HashMap::new();
    let scored: Vec<OsmCandidate> = rows
        .par_iter()
        .flat_map_iter(|row| {
            let tags = row.tags();
            normalized_stops.iter().filter_map(move |(stop_id, stop_normalized)| {
                let (name_cost, matched_names) = compute_name_cost(stop_normalized, &row.names, config)?;
                let cost = node_cost(route_type, &tags, row.ref_ifopt.as_deref(), row.wheelchair.as_deref());
                let candidate = OsmCandidate {
                    stop_id: stop_id.to_string(),
                    lat: row.lat,
                    lon: row.lon,
                    names: matched_names,
                    name_cost,
                    node_cost: cost,
                };
                candidate.is_usable().then_some(candidate)
            })
        })
        .collect();

    for candidate in scored {
        candidates.entry(candidate.stop_id.clone()).or_default().push(candidate);
    }
    log::debug!(
        "matched {} usable OSM candidates across {} stops from {} snapshot rows",
        candidates.values().map(Vec::len).sum::<usize>(),
        stops.len(),
        rows.len()
    );
    Ok(candidates)
}
