//! Timetable projection (§4.6): turns a typed [`Table`] into a
//! sequence of [`Entry`]s over an ordered list of [`Stop`]s.
//!
//! Design note (ledger entry, see `DESIGN.md`): the spec describes the
//! projection in terms of cell types without fixing a table layout.
//! We assume the layout that `§4.5`'s discovery pipeline actually
//! produces: column 0 holds the [`typing::CellType::Stop`] series, an
//! optional column 1 holds its `StopAnnot` suffixes, row 0 is the
//! entry header (carrying `Days`/`RouteAnnotValue`/`EntryAnnotValue`
//! cells), and every remaining column is either a plain `Time` data
//! column or a single repeat column: `discovery::build_repeat_column`
//! stacks a `RepeatIdentifier`/`RepeatValue`/`RepeatIdentifier` triple
//! vertically into one column, each cell landing on whichever row its
//! bbox overlaps, so the value cell isn't guaranteed to share a row
//! with either identifier.

use std::collections::HashMap;

use crate::config::{DayBitmask, EngineConfig, HOLIDAY_BIT};
use crate::table::{CellId, Table};
use crate::typing::CellType;

/// A stop in projection order (§3 "Stop (timetable-level)").
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub normalized_name: String,
    pub original_text: String,
    pub is_connection: bool,
}

/// An ordinary timetable entry: one data column's worth of
/// stop -> time-of-day mappings plus its header metadata.
#[derive(Debug, Clone, Default)]
pub struct TimeEntry {
    pub weekdays: DayBitmask,
    pub annotations: Vec<String>,
    pub route_short_name: Option<String>,
    pub times: HashMap<usize, String>,
}

/// A repeat entry: substitutes for a column, carrying the parsed
/// interval list and the indices (into [`Timetable::entries`]) of its
/// left/right flanking entries (§3, §4.6).
#[derive(Debug, Clone)]
pub struct RepeatEntry {
    pub intervals: Vec<u32>,
    pub left: usize,
    pub right: usize,
}

#[derive(Debug, Clone)]
pub enum Entry {
    Regular(TimeEntry),
    Repeat(RepeatEntry),
}

#[derive(Debug, Clone, Default)]
pub struct Timetable {
    pub entries: Vec<Entry>,
    pub stops: Vec<Stop>,
}

const STOP_COLUMN: usize = 0;

/// parses a repeat column's value text into its interval list (§4.6):
/// `"N"` -> `[N]`, `"N-M"` -> `[N, M]` (alternating period).
pub fn parse_repeat_intervals(text: &str) -> Vec<u32> {
    if let Some((a, b)) = text.split_once('-') {
        match (a.trim().parse(), b.trim().parse()) {
            (Ok(a), Ok(b)) => return vec![a, b],
            _ => return Vec::new(),
        }
    }
    text.trim().parse().map(|n| vec![n]).unwrap_or_default()
}

/// normalizes a stop name the way GTFS/OSM matching expects: trimmed,
/// whitespace-collapsed. Fuller normalization (abbreviation expansion,
/// punctuation stripping) is §4.8's concern at match time; this keeps
/// only the normalization that must survive into the timetable itself.
fn normalize_stop_name(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// inferred type of `id`, or [`CellType::Empty`] if untyped.
fn inferred(table: &Table, id: CellId) -> CellType {
    table
        .slot(id)
        .type_info()
        .map(|t| t.inferred())
        .unwrap_or(CellType::Empty)
}

fn stop_row_indices(table: &Table) -> Vec<usize> {
    (0..table.rows())
        .filter(|&r| {
            let id = table.row_ids(r)[STOP_COLUMN];
            inferred(table, id) == CellType::Stop
        })
        .collect()
}

/// §4.5 step 5 "stop-name repair": a later stop whose text starts with
/// punctuation or is indented by >= 3pt inherits the base locality of
/// the previous stop.
fn repair_stop_name(previous: &str, text: &str, indent_pt: f64) -> String {
    let starts_with_punct = text.starts_with('-') || text.starts_with(',');
    if !starts_with_punct && indent_pt < 3.0 {
        return text.to_string();
    }
    let base = previous.split(" - ").next().unwrap_or(previous);
    let suffix = text.trim_start_matches(['-', ',']).trim();
    format!("{base} - {suffix}")
}

fn collect_stops(table: &Table) -> Vec<Stop> {
    let rows = stop_row_indices(table);
    let mut stops = Vec::with_capacity(rows.len());
    let mut previous_text = String::new();
    let mut previous_x0 = None;
    for r in rows {
        let id = table.row_ids(r)[STOP_COLUMN];
        let raw = table.cell(id).text().to_string();
        let x0 = table.cell(id).intrinsic_bbox().map(|b| b.x0);
        let indent = match (previous_x0, x0) {
            (Some(p), Some(c)) => c - p,
            _ => 0.0,
        };
        let repaired = if stops.is_empty() {
            raw.clone()
        } else {
            repair_stop_name(&previous_text, &raw, indent)
        };
        previous_text = repaired.clone();
        previous_x0 = x0;
        stops.push(Stop {
            normalized_name: normalize_stop_name(&repaired),
            original_text: raw,
            is_connection: false,
        });
    }
    stops
}

/// attaches `StopAnnot` suffixes (arrival `"[a]"` / departure `"[d]"`)
/// found in columns adjacent to the stop column, onto the matching
/// stop's `original_text`.
fn attach_stop_annotations(table: &Table, stops: &mut [Stop], config: &EngineConfig) {
    let rows = stop_row_indices(table);
    for (stop_idx, &r) in rows.iter().enumerate() {
        for col in 0..table.cols() {
            if col == STOP_COLUMN {
                continue;
            }
            let id = table.row_ids(r)[col];
            if inferred(table, id) != CellType::StopAnnot {
                continue;
            }
            let text = table.cell(id).text();
            let marker = if config.arrival_identifier.iter().any(|t| t == text) {
                "[a]"
            } else if config.departure_identifier.iter().any(|t| t == text) {
                "[d]"
            } else {
                continue;
            };
            if let Some(stop) = stops.get_mut(stop_idx) {
                stop.original_text.push_str(marker);
            }
        }
    }
}

/// classifies a data column at `col` as a plain time column, a repeat
/// column (the vertically stacked ident/value/ident triple), or
/// irrelevant header noise. Votes are taken over every row, not just
/// stop rows, since a repeat triple's cells land wherever their bbox
/// overlaps best and aren't guaranteed to fall on a `Stop` row.
enum ColumnKind {
    Time,
    Repeat,
    Other,
}

fn column_kind(table: &Table, col: usize) -> ColumnKind {
    let mut time_votes = 0;
    let mut repeat_votes = 0;
    for r in 0..table.rows() {
        let id = table.row_ids(r)[col];
        match inferred(table, id) {
            CellType::Time => time_votes += 1,
            CellType::RepeatValue | CellType::RepeatIdentifier => repeat_votes += 1,
            _ => {}
        }
    }
    if time_votes > 0 && time_votes >= repeat_votes {
        ColumnKind::Time
    } else if repeat_votes > 0 {
        ColumnKind::Repeat
    } else {
        ColumnKind::Other
    }
}

fn header_weekdays(table: &Table, col: usize, config: &EngineConfig) -> DayBitmask {
    let mut mask = 0;
    for r in 0..table.rows() {
        let id = table.row_ids(r)[col];
        if inferred(table, id) != CellType::Days {
            continue;
        }
        let text = table.cell(id).text();
        if let Some(bits) = config.header_values.get(text) {
            mask |= bits;
        } else if config.is_negative_header(text) {
            mask |= HOLIDAY_BIT;
        }
    }
    mask
}

fn header_route_short_name(table: &Table, col: usize) -> Option<String> {
    (0..table.rows()).find_map(|r| {
        let id = table.row_ids(r)[col];
        (inferred(table, id) == CellType::RouteAnnotValue).then(|| table.cell(id).text().to_string())
    })
}

fn header_annotations(table: &Table, col: usize) -> Vec<String> {
    (0..table.rows())
        .filter(|&r| inferred(table, table.row_ids(r)[col]) == CellType::EntryAnnotValue)
        .map(|r| table.cell(table.row_ids(r)[col]).text().to_string())
        .collect()
}

fn build_time_entry(table: &Table, col: usize, config: &EngineConfig, rows: &[usize]) -> TimeEntry {
    let mut times = HashMap::new();
    for (stop_idx, &r) in rows.iter().enumerate() {
        let id = table.row_ids(r)[col];
        if inferred(table, id) == CellType::Time {
            times.insert(stop_idx, table.cell(id).text().to_string());
        }
    }
    TimeEntry {
        weekdays: header_weekdays(table, col, config),
        annotations: header_annotations(table, col),
        route_short_name: header_route_short_name(table, col),
        times,
    }
}

/// projects a fully typed table into a [`Timetable`] (§4.6).
pub fn project_timetable(table: &Table, config: &EngineConfig) -> Timetable {
    let mut stops = collect_stops(table);
    attach_stop_annotations(table, &mut stops, config);
    let rows = stop_row_indices(table);

    let mut entries = Vec::new();
    let mut col = STOP_COLUMN + 1;
    while col < table.cols() {
        match column_kind(table, col) {
            ColumnKind::Time => {
                entries.push(Entry::Regular(build_time_entry(table, col, config, &rows)));
                col += 1;
            }
            ColumnKind::Repeat => {
                let left = entries.len().saturating_sub(1);
                let intervals = (0..table.rows())
                    .find_map(|r| {
                        let id = table.row_ids(r)[col];
                        (inferred(table, id) == CellType::RepeatValue)
                            .then(|| parse_repeat_intervals(table.cell(id).text()))
                    })
                    .unwrap_or_default();
                col += 1;
                let right = entries.len();
                entries.push(Entry::Repeat(RepeatEntry {
                    intervals,
                    left,
                    right,
                }));
            }
            _ => col += 1,
        }
    }

    detect_connections(&mut stops);
    Timetable { entries, stops }
}

/// Connection detection (§4.6): for every stop name occurring more
/// than once, every stop strictly between its first and last
/// occurrence is marked `is_connection`, unless the span covers the
/// whole route (a round trip).
pub fn detect_connections(stops: &mut [Stop]) {
    let mut first_last: HashMap<String, (usize, usize)> = HashMap::new();
    for (i, stop) in stops.iter().enumerate() {
        first_last
            .entry(stop.normalized_name.clone())
            .and_modify(|(_, last)| *last = i)
            .or_insert((i, i));
    }
    let n = stops.len();
    for (i0, i1) in first_last.into_values() {
        if i1 <= i0 {
            continue;
        }
        if i0 == 0 && i1 == n.saturating_sub(1) {
            continue;
        }
        for stop in stops.iter_mut().take(i1).skip(i0 + 1) {
            stop.is_connection = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(name: &str) -> Stop {
        Stop {
            normalized_name: name.to_string(),
            original_text: name.to_string(),
            is_connection: false,
        }
    }

    #[test]
    fn parses_single_repeat_interval() {
        assert_eq!(parse_repeat_intervals("10"), vec![10]);
    }

    #[test]
    fn parses_alternating_repeat_interval() {
        assert_eq!(parse_repeat_intervals("10-15"), vec![10, 15]);
    }

    #[test]
    fn marks_intermediate_recurrence_as_connection() {
        let mut stops = vec![stop("A"), stop("B"), stop("A"), stop("C")];
        detect_connections(&mut stops);
        assert!(!stops[0].is_connection);
        assert!(stops[1].is_connection);
        assert!(!stops[2].is_connection);
        assert!(!stops[3].is_connection);
    }

    #[test]
    fn full_round_trip_is_not_a_connection() {
        let mut stops = vec![stop("A"), stop("B"), stop("C"), stop("A")];
        detect_connections(&mut stops);
        assert!(stops.iter().all(|s| !s.is_connection));
    }

    #[test]
    fn stop_name_repair_inherits_base_locality() {
        let repaired = repair_stop_name("Frankfurt - Hauptbahnhof", "- Friedhof", 0.0);
        assert_eq!(repaired, "Frankfurt - Friedhof");
    }

    #[test]
    fn stop_name_without_repair_trigger_is_unchanged() {
        let repaired = repair_stop_name("Frankfurt - Hauptbahnhof", "Offenbach", 0.0);
        assert_eq!(repaired, "Offenbach");
    }

    #[test]
    fn discovered_repeat_column_produces_a_repeat_entry() {
        use crate::config::test_config;
        use crate::discovery::discover_tables;
        use crate::geometry::BBox;
        use crate::table::Cell;

        fn cell(x0: f64, y0: f64, x1: f64, y1: f64, text: &str) -> Cell {
            Cell::new_text(text.to_string(), BBox::new(x0, y0, x1, y1), None, Some(10.0))
        }

        let config = test_config();
        // three stops, two time columns (07:xx / 09:xx), and a repeat
        // triple ("alle" / "30" / "Min.") sitting between them,
        // one cell per stop row, the layout discovery actually builds.
        let data_cells = vec![
            cell(0.0, 0.0, 10.0, 10.0, "Stop A"),
            cell(20.0, 0.0, 40.0, 10.0, "07:00"),
            cell(100.0, 0.0, 120.0, 10.0, "09:30"),
            cell(0.0, 30.0, 10.0, 40.0, "Stop B"),
            cell(20.0, 30.0, 40.0, 40.0, "07:10"),
            cell(100.0, 30.0, 120.0, 40.0, "09:40"),
            cell(0.0, 60.0, 10.0, 70.0, "Stop C"),
            cell(20.0, 60.0, 40.0, 70.0, "07:20"),
            cell(100.0, 60.0, 120.0, 70.0, "09:50"),
        ];
        let other_cells = vec![
            cell(60.0, 0.0, 80.0, 10.0, "alle"),
            cell(60.0, 30.0, 80.0, 40.0, "30"),
            cell(60.0, 60.0, 80.0, 70.0, "Min."),
        ];

        let tables = discover_tables(&data_cells, &other_cells, &config).unwrap();
        assert_eq!(tables.len(), 1);
        let timetable = project_timetable(&tables[0], &config);

        let repeats: Vec<&RepeatEntry> = timetable
            .entries
            .iter()
            .filter_map(|e| match e {
                Entry::Repeat(re) => Some(re),
                Entry::Regular(_) => None,
            })
            .collect();
        assert_eq!(repeats.len(), 1);
        assert_eq!(repeats[0].intervals, vec![30]);

        let Entry::Regular(left) = &timetable.entries[repeats[0].left] else {
            panic!("left anchor should be a regular entry");
        };
        let Entry::Regular(right) = &timetable.entries[repeats[0].right] else {
            panic!("right anchor should be a regular entry");
        };
        assert_eq!(left.times[&0], "07:00");
        assert_eq!(right.times[&0], "09:30");
    }
}
