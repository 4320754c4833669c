//! Two-phase probabilistic cell typing (§4.4).
//!
//! Phase 1 assigns a text-only probability distribution to every cell.
//! Phase 2 re-weights it using neighbor/row/column structure and picks
//! the argmax as the cell's inferred type. A final pass retypes
//! leftover `Other` cells caught between two typed cells.
//!
//! Design note (ledger entry, see `DESIGN.md`): the spec's phase-2
//! rules reference neighbors' *types* (e.g. "sandwiched between two
//! Data cells", "adjacent RepeatValue"), which would make a literal
//! reading circular — a cell's type can depend on a neighbor whose
//! type depends on it. We break the cycle by recomputing the relevant
//! structural predicate (is this text a time? a repeat identifier
//! token? a repeat-value-shaped numeral?) directly from the neighbor's
//! text/config rather than from its not-yet-final inferred type. This
//! matches the glossary's own definition of "Data cell" as a textual
//! property ("a cell whose text parses as a time of day"), so the
//! spec already licenses the text-based reading for that rule; we
//! extend the same approach to the other structural rules for
//! consistency. Only the post-inference `Other` retyping pass reads
//! already-inferred neighbor types, which is safe because it runs
//! strictly after every cell's phase-2 pass has completed.

use std::collections::HashMap;

use regex::Regex;
use std::sync::OnceLock;

use crate::config::EngineConfig;
use crate::geometry::{Direction, Orientation};
use crate::table::{Cell, CellId, Table};

/// the closed set of cell types of §3 ("CellType"). `Empty` is assigned
/// directly to [`Cell::Empty`] slots without running phase 1/2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellType {
    Time,
    Stop,
    StopAnnot,
    DataAnnot,
    Days,
    RepeatIdentifier,
    RepeatValue,
    RouteAnnotIdent,
    RouteAnnotValue,
    EntryAnnotIdent,
    EntryAnnotValue,
    LegendIdent,
    LegendValue,
    Other,
    Empty,
}

/// fallback types considered when no phase-1 absolute indicator fires
/// (§4.4), in the order the spec lists them.
const FALLBACK_TYPES: [CellType; 7] = [
    CellType::Stop,
    CellType::RouteAnnotValue,
    CellType::RepeatValue,
    CellType::EntryAnnotValue,
    CellType::DataAnnot,
    CellType::LegendValue,
    CellType::Other,
];

/// a cell's full typing result: the normalized probability distribution
/// plus the argmax winner.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    probabilities: HashMap<CellType, f64>,
    inferred: CellType,
}

impl TypeInfo {
    fn from_probabilities(probabilities: HashMap<CellType, f64>) -> TypeInfo {
        let inferred = argmax(&probabilities);
        TypeInfo {
            probabilities,
            inferred,
        }
    }

    fn definite(t: CellType) -> TypeInfo {
        let mut probabilities = HashMap::new();
        probabilities.insert(t, 1.0);
        TypeInfo {
            probabilities,
            inferred: t,
        }
    }

    pub fn probability(&self, t: CellType) -> f64 {
        self.probabilities.get(&t).copied().unwrap_or(0.0)
    }

    pub fn inferred(&self) -> CellType {
        self.inferred
    }
}

fn argmax(probabilities: &HashMap<CellType, f64>) -> CellType {
    probabilities
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(t, _)| *t)
        .unwrap_or(CellType::Other)
}

/// does `text` parse as a time of day under `time_format` (a
/// `chrono`-style strftime format, e.g. `"%H:%M"`)? This is the
/// definition of a "Data cell" throughout §4.5-§4.7 (§ glossary).
pub fn parses_as_time(text: &str, time_format: &str) -> bool {
    chrono::NaiveTime::parse_from_str(text.trim(), time_format).is_ok()
}

fn legend_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\S+\s?[:=]\s?\S+$").unwrap())
}

fn repeat_value_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(-\d+)?$").unwrap())
}

fn is_days_text(text: &str, config: &EngineConfig) -> bool {
    config.header_values.contains_key(text) || config.is_negative_header(text)
}

pub(crate) fn is_repeat_identifier_text(text: &str, config: &EngineConfig) -> bool {
    config
        .repeat_identifier
        .iter()
        .any(|(prefix, suffix)| text == prefix || text == suffix)
}

/// text-only test for a repeat-value-shaped numeral (e.g. `"10"` or
/// `"10-15"`), used by discovery's repeat-column detection (§4.5 step
/// 2) before formal typing has run.
pub(crate) fn looks_like_repeat_value(text: &str) -> bool {
    repeat_value_regex().is_match(text)
}

fn is_stop_annot_text(text: &str, config: &EngineConfig) -> bool {
    config.arrival_identifier.iter().any(|t| t == text)
        || config.departure_identifier.iter().any(|t| t == text)
}

fn is_route_annot_ident_text(text: &str, config: &EngineConfig) -> bool {
    config.route_identifier.iter().any(|t| t == text)
}

fn is_entry_annot_ident_text(text: &str, config: &EngineConfig) -> bool {
    config.annot_identifier.iter().any(|t| t == text)
}

fn is_legend_ident_text(text: &str) -> bool {
    legend_regex().is_match(text)
}

/// text-only test for a "Data cell" (§ glossary) — reused everywhere
/// phase 2 needs to know whether a *neighboring* cell is data, without
/// depending on that neighbor's (not yet settled) inferred type.
fn is_data_text(text: &str, config: &EngineConfig) -> bool {
    parses_as_time(text, &config.time_format)
}

/// Phase 1 (§4.4 "absolute"): a text-only probability distribution.
fn phase1(text: &str, config: &EngineConfig) -> HashMap<CellType, f64> {
    let mut fired = Vec::new();
    if is_data_text(text, config) {
        fired.push(CellType::Time);
    }
    if is_days_text(text, config) {
        fired.push(CellType::Days);
    }
    if is_repeat_identifier_text(text, config) {
        fired.push(CellType::RepeatIdentifier);
    }
    if is_stop_annot_text(text, config) {
        fired.push(CellType::StopAnnot);
    }
    if is_route_annot_ident_text(text, config) {
        fired.push(CellType::RouteAnnotIdent);
    }
    if is_entry_annot_ident_text(text, config) {
        fired.push(CellType::EntryAnnotIdent);
    }
    if is_legend_ident_text(text) {
        fired.push(CellType::LegendIdent);
    }

    let mut probabilities = HashMap::new();
    if fired.is_empty() {
        for t in FALLBACK_TYPES {
            let weight = if t == CellType::Other { 2.0 } else { 1.0 };
            probabilities.insert(t, weight);
        }
    } else {
        for t in &fired {
            probabilities.insert(*t, 1.0);
        }
        probabilities.insert(CellType::Other, 0.5);
    }
    normalize(&mut probabilities);
    probabilities
}

fn normalize(probabilities: &mut HashMap<CellType, f64>) {
    let sum: f64 = probabilities.values().sum();
    if sum > 0.0 {
        for v in probabilities.values_mut() {
            *v /= sum;
        }
    }
}

/// `true` iff `id` is directly sandwiched between two cells satisfying
/// `predicate` in `o`'s direction pair (N/S for vertical, W/E for
/// horizontal).
fn sandwiched(table: &Table, id: CellId, o: Orientation, predicate: impl Fn(&str) -> bool) -> bool {
    let (back, fwd) = match o {
        Orientation::Vertical => (Direction::North, Direction::South),
        Orientation::Horizontal => (Direction::West, Direction::East),
    };
    let before = table.neighbor(id, back).map(|n| table.cell(n).text());
    let after = table.neighbor(id, fwd).map(|n| table.cell(n).text());
    matches!((before, after), (Some(b), Some(a)) if predicate(b) && predicate(a))
}

fn neighbor_text(table: &Table, id: CellId, d: Direction) -> Option<String> {
    table
        .neighbor(id, d)
        .map(|n| table.cell(n).text().to_string())
}

/// Phase 2 (§4.4 "relative"): a multiplicative re-weighting of `probs`
/// using `id`'s row/column context, returning the argmax inferred type.
fn phase2(
    table: &Table,
    id: CellId,
    probs: &HashMap<CellType, f64>,
    config: &EngineConfig,
) -> HashMap<CellType, f64> {
    let mut weighted = probs.clone();

    for (t, weight) in weighted.iter_mut() {
        let rel = match t {
            CellType::Stop => rel_stop(table, id, config),
            CellType::StopAnnot => rel_stop_annot(table, id, config),
            CellType::DataAnnot => rel_data_annot(table, id, config),
            CellType::RepeatIdentifier => rel_repeat_identifier(table, id, config),
            CellType::RepeatValue => rel_repeat_value(table, id, config),
            CellType::EntryAnnotValue => rel_entry_annot_value(table, id, config),
            _ => 1.0,
        };
        *weight *= rel;
    }
    weighted
}

fn is_between_data_cells(table: &Table, id: CellId, config: &EngineConfig) -> bool {
    sandwiched(table, id, Orientation::Horizontal, |t| is_data_text(t, config))
        || sandwiched(table, id, Orientation::Vertical, |t| is_data_text(t, config))
}

fn column_has_data(table: &Table, id: CellId, config: &EngineConfig) -> bool {
    table
        .get_series(Orientation::Vertical, id)
        .iter()
        .any(|c| is_data_text(table.cell(*c).text(), config))
}

fn row_has_data(table: &Table, id: CellId, config: &EngineConfig) -> bool {
    table
        .get_series(Orientation::Horizontal, id)
        .iter()
        .any(|c| is_data_text(table.cell(*c).text(), config))
}

/// Stop: eliminated if sandwiched between two Data cells, or if its
/// aligned series (row when its column is a data column, column when
/// its row is a data row) has gaps at data-aligned positions — a
/// header row/column outside the data region doesn't count as a gap.
/// Bonus for a left-aligned series and for an adjacent
/// `StopAnnot`-shaped neighbor.
fn rel_stop(table: &Table, id: CellId, config: &EngineConfig) -> f64 {
    if is_between_data_cells(table, id, config) {
        return 0.0;
    }

    let (series, has_gap) = if column_has_data(table, id, config) {
        let series = table.get_series(Orientation::Horizontal, id);
        let gap = series
            .iter()
            .any(|c| *c != id && column_has_data(table, *c, config) && table.cell(*c).is_empty());
        (series, gap)
    } else if row_has_data(table, id, config) {
        let series = table.get_series(Orientation::Vertical, id);
        let gap = series
            .iter()
            .any(|c| *c != id && row_has_data(table, *c, config) && table.cell(*c).is_empty());
        (series, gap)
    } else {
        return 0.8;
    };
    if has_gap {
        return 0.3;
    }

    // a comfortable margin over Other's double fallback weight, so a
    // structurally valid Stop wins the argmax outright (§4.4 leaves the
    // exact magnitude of Rel[T] unspecified; see DESIGN.md).
    let mut bonus = STRUCTURAL_BASE;
    let min_x0 = series
        .iter()
        .filter_map(|c| table.cell(*c).intrinsic_bbox())
        .map(|b| b.x0)
        .fold(f64::INFINITY, f64::min);
    if let Some(bbox) = table.cell(id).intrinsic_bbox() {
        if (bbox.x0 - min_x0).abs() < 1e-6 {
            bonus *= 1.2;
        }
    }
    for d in [Direction::North, Direction::South, Direction::East, Direction::West] {
        if let Some(text) = neighbor_text(table, id, d) {
            if is_stop_annot_text(&text, config) {
                bonus *= 1.1;
                break;
            }
        }
    }
    bonus
}

/// margin used by the fallback-set relative weightings (Stop,
/// DataAnnot, RepeatValue, EntryAnnotValue) to overcome Other's double
/// weight in the phase-1 fallback distribution once a cell's
/// structural test is satisfied.
const STRUCTURAL_BASE: f64 = 3.0;

/// StopAnnot: bonus when adjacent to a `Stop`-eligible neighbor whose
/// perpendicular neighbor is itself annotation-shaped text; eliminated
/// if no neighbor satisfies the Stop structural test at all.
fn rel_stop_annot(table: &Table, id: CellId, config: &EngineConfig) -> f64 {
    for d in [Direction::North, Direction::South, Direction::East, Direction::West] {
        if let Some(neighbor) = table.neighbor(id, d) {
            if rel_stop(table, neighbor, config) > 0.0 {
                let mut rel = STRUCTURAL_BASE;
                let perpendicular = match d.orientation() {
                    Orientation::Horizontal => [Direction::North, Direction::South],
                    Orientation::Vertical => [Direction::East, Direction::West],
                };
                for p in perpendicular {
                    if let Some(text) = neighbor_text(table, neighbor, p) {
                        if is_stop_annot_text(&text, config) {
                            rel *= 1.3;
                        }
                    }
                }
                return rel;
            }
        }
    }
    0.0
}

/// DataAnnot: must sit directly next to a Data cell and be strictly
/// smaller font than the mean of its Data neighbors, else eliminated.
fn rel_data_annot(table: &Table, id: CellId, config: &EngineConfig) -> f64 {
    let data_neighbor_sizes: Vec<f64> = [Direction::North, Direction::South, Direction::East, Direction::West]
        .into_iter()
        .filter_map(|d| table.neighbor(id, d))
        .filter(|n| is_data_text(table.cell(*n).text(), config))
        .filter_map(|n| table.cell(n).fontsize())
        .collect();
    if data_neighbor_sizes.is_empty() {
        return 0.0;
    }
    let mean = data_neighbor_sizes.iter().sum::<f64>() / data_neighbor_sizes.len() as f64;
    match table.cell(id).fontsize() {
        Some(size) if size < mean => STRUCTURAL_BASE,
        _ => 0.0,
    }
}

/// RepeatIdentifier: must be sandwiched between two Data cells in some
/// orientation; bonus if a direct neighbor looks like a repeat-value
/// numeral (e.g. `"10"` or `"10-15"`). Not part of the fallback set, so
/// it only competes once its own abs indicator has already fired.
fn rel_repeat_identifier(table: &Table, id: CellId, config: &EngineConfig) -> f64 {
    if !is_between_data_cells(table, id, config) {
        return 0.0;
    }
    let mut rel = 1.0;
    for d in [Direction::North, Direction::South, Direction::East, Direction::West] {
        if let Some(text) = neighbor_text(table, id, d) {
            if repeat_value_regex().is_match(&text) {
                rel *= 1.3;
                break;
            }
        }
    }
    rel
}

/// RepeatValue: must be sandwiched between two Data cells *and* between
/// two `RepeatIdentifier`-shaped cells, else eliminated.
fn rel_repeat_value(table: &Table, id: CellId, config: &EngineConfig) -> f64 {
    let data_sandwich = is_between_data_cells(table, id, config);
    let ident_sandwich = sandwiched(table, id, Orientation::Horizontal, |t| {
        is_repeat_identifier_text(t, config)
    }) || sandwiched(table, id, Orientation::Vertical, |t| {
        is_repeat_identifier_text(t, config)
    });
    if data_sandwich && ident_sandwich {
        STRUCTURAL_BASE
    } else {
        0.0
    }
}

/// EntryAnnotValue: requires its column to be headed (walking north to
/// the column's top) by an `EntryAnnotIdent`-shaped cell, then
/// penalized if the column also contains a stop-name-shaped cell (the
/// identifier column has drifted into the stop column).
fn rel_entry_annot_value(table: &Table, id: CellId, config: &EngineConfig) -> f64 {
    let mut top = id;
    while let Some(n) = table.neighbor(top, Direction::North) {
        top = n;
    }
    if !is_entry_annot_ident_text(table.cell(top).text(), config) {
        return 0.2;
    }

    let col = table.get_series(Orientation::Vertical, id);
    let has_stop_like = col.iter().any(|c| {
        let text = table.cell(*c).text();
        !text.is_empty()
            && !is_data_text(text, config)
            && !is_entry_annot_ident_text(text, config)
            && text.chars().any(|ch| ch.is_alphabetic())
            && text.chars().filter(|ch| ch.is_alphabetic()).count() >= 3
    });
    if has_stop_like {
        1.0
    } else {
        STRUCTURAL_BASE
    }
}

/// computes phase 1 + phase 2 typing for every cell in `table` and
/// stores the result, then applies the post-inference `Other` retyping
/// pass (§4.4 final paragraph).
pub fn infer_types(table: &mut Table, config: &EngineConfig) {
    let ids: Vec<CellId> = (0..table.rows())
        .flat_map(|r| table.row_ids(r).to_vec())
        .collect();

    for id in &ids {
        let info = if table.cell(*id).is_empty() {
            TypeInfo::definite(CellType::Empty)
        } else {
            let text = table.cell(*id).text().to_string();
            let p1 = phase1(&text, config);
            let p2 = phase2(table, *id, &p1, config);
            TypeInfo::from_probabilities(p2)
        };
        table.set_type(*id, info);
    }

    retype_other_cells(table);
}

/// Other cells flanked (same row) by two non-`Other` typed cells are
/// retyped to `DataAnnot` (below-mean fontsize) or `StopAnnot`/`Other`.
fn retype_other_cells(table: &mut Table) {
    let mut retypes = Vec::new();
    for r in 0..table.rows() {
        let row = table.row_ids(r).to_vec();
        for (i, id) in row.iter().enumerate() {
            let Some(info) = table.slot(*id).type_info() else {
                continue;
            };
            if info.inferred() != CellType::Other {
                continue;
            }
            if i == 0 || i + 1 >= row.len() {
                continue;
            }
            let left = table.slot(row[i - 1]).type_info().map(|t| t.inferred());
            let right = table.slot(row[i + 1]).type_info().map(|t| t.inferred());
            let flanked = !matches!(left, None | Some(CellType::Other))
                && !matches!(right, None | Some(CellType::Other));
            if !flanked {
                continue;
            }

            let neighbor_sizes: Vec<f64> = [row.get(i.wrapping_sub(1)), row.get(i + 1)]
                .into_iter()
                .flatten()
                .filter_map(|c| table.cell(*c).fontsize())
                .collect();
            let mean = if neighbor_sizes.is_empty() {
                None
            } else {
                Some(neighbor_sizes.iter().sum::<f64>() / neighbor_sizes.len() as f64)
            };
            let new_type = match (table.cell(*id).fontsize(), mean) {
                (Some(size), Some(mean)) if size < mean => CellType::DataAnnot,
                _ => CellType::StopAnnot,
            };
            retypes.push((*id, new_type));
        }
    }
    for (id, t) in retypes {
        table.set_type(id, TypeInfo::definite(t));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::geometry::BBox;
    use crate::table::Cell;

    fn data(col: usize, text: &str) -> Cell {
        let x0 = col as f64 * 10.0;
        Cell::new_text(text.to_string(), BBox::new(x0, 0.0, x0 + 10.0, 10.0), None, Some(10.0))
    }

    #[test]
    fn time_text_gets_high_time_probability() {
        let config = test_config();
        let probs = phase1("07:30", &config);
        assert!(probs[&CellType::Time] > 0.5);
    }

    #[test]
    fn days_header_text_gets_days_probability() {
        let config = test_config();
        let probs = phase1("Montag-Freitag", &config);
        assert!(probs[&CellType::Days] > 0.5);
    }

    #[test]
    fn non_indicator_text_spreads_over_fallback_with_other_favored() {
        let config = test_config();
        let probs = phase1("Hauptbahnhof", &config);
        assert!(probs[&CellType::Other] > probs[&CellType::Stop]);
    }

    #[test]
    fn stop_column_infers_as_stop() {
        let config = test_config();
        let rows = vec![
            vec![data(0, "Hauptbahnhof"), data(1, "07:00")],
            vec![data(0, "Nebenbahnhof"), data(1, "07:10")],
        ];
        let mut table = Table::from_rows(rows).unwrap();
        infer_types(&mut table, &config);
        let stop_cell = table.row_ids(0)[0];
        assert_eq!(table.slot(stop_cell).type_info().unwrap().inferred(), CellType::Stop);
    }

    #[test]
    fn stop_column_survives_an_empty_header_cell() {
        // the header row's column-0 cell is empty and outside the
        // data-aligned region (row 0 has no Time cells) — it must not
        // count as a gap in the Stop column's series.
        let config = test_config();
        let rows = vec![
            vec![Cell::empty(), data(1, "Montag-Freitag")],
            vec![data(0, "Hauptbahnhof"), data(1, "07:00")],
            vec![data(0, "Nebenbahnhof"), data(1, "07:10")],
        ];
        let mut table = Table::from_rows(rows).unwrap();
        infer_types(&mut table, &config);
        let stop_cell_a = table.row_ids(1)[0];
        let stop_cell_b = table.row_ids(2)[0];
        assert_eq!(table.slot(stop_cell_a).type_info().unwrap().inferred(), CellType::Stop);
        assert_eq!(table.slot(stop_cell_b).type_info().unwrap().inferred(), CellType::Stop);
    }

    #[test]
    fn time_cell_infers_as_time() {
        let config = test_config();
        let rows = vec![
            vec![data(0, "Hauptbahnhof"), data(1, "07:00")],
            vec![data(0, "Nebenbahnhof"), data(1, "07:10")],
        ];
        let mut table = Table::from_rows(rows).unwrap();
        infer_types(&mut table, &config);
        let time_cell = table.row_ids(0)[1];
        assert_eq!(table.slot(time_cell).type_info().unwrap().inferred(), CellType::Time);
    }

    #[test]
    fn repeat_value_requires_both_data_and_identifier_sandwich() {
        // a repeat column spliced between two data columns (§4.5 step 2):
        // "alle" / "10" / "Min." vertically sandwich the value, while the
        // data columns on either side horizontally sandwich the whole
        // column.
        let config = test_config();
        let rows = vec![
            vec![data(0, "07:00"), data(1, "alle"), data(2, "07:40")],
            vec![data(0, "07:00"), data(1, "10"), data(2, "07:40")],
            vec![data(0, "07:00"), data(1, "Min."), data(2, "07:40")],
        ];
        let mut table = Table::from_rows(rows).unwrap();
        infer_types(&mut table, &config);
        let value_cell = table.row_ids(1)[1];
        assert_eq!(
            table.slot(value_cell).type_info().unwrap().inferred(),
            CellType::RepeatValue
        );
    }
}
