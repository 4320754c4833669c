//! Table discovery and growth (§4.5): seeds a provisional table from
//! data cells, splices in repeat columns, expands to the page's other
//! cells, types the result, and splits it into independent sub-tables
//! at splitter rows/columns.

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::geometry::{BBox, Direction, Orientation};
use crate::table::{Cell, Table};
use crate::typing::{self, CellType};

/// builds the provisional table of §4.5 step 1: clusters `data_cells`
/// into overlap-based row/column bands and cross-references them into
/// a fully rectangular grid, filling unoccupied bands with
/// [`Cell::Empty`].
pub fn seed_table(data_cells: &[Cell], config: &EngineConfig) -> Result<Table, CoreError> {
    if data_cells.is_empty() {
        return Err(CoreError::EmptyTable);
    }
    let row_bands = cluster(data_cells, Orientation::Horizontal, config.min_cell_overlap);
    let col_bands = cluster(data_cells, Orientation::Vertical, config.min_cell_overlap);

    let mut row_of = vec![0usize; data_cells.len()];
    for (r, band) in row_bands.iter().enumerate() {
        for &i in band {
            row_of[i] = r;
        }
    }
    let mut col_of = vec![0usize; data_cells.len()];
    for (c, band) in col_bands.iter().enumerate() {
        for &i in band {
            col_of[i] = c;
        }
    }

    let mut grid = vec![vec![Cell::Empty; col_bands.len()]; row_bands.len()];
    for i in 0..data_cells.len() {
        grid[row_of[i]][col_of[i]] = data_cells[i].clone();
    }
    Table::from_rows(grid)
}

/// clusters cells into bands along `o`: row bands (`Horizontal`) group
/// cells that h-overlap, column bands (`Vertical`) group cells that
/// v-overlap, each merging into a running band bbox. Bands are
/// returned sorted in reading order (top-to-bottom / left-to-right).
fn cluster(cells: &[Cell], o: Orientation, frac: f64) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..cells.len())
        .filter(|&i| cells[i].intrinsic_bbox().is_some())
        .collect();
    indices.sort_by(|&a, &b| {
        let (ba, bb) = (cells[a].intrinsic_bbox().unwrap(), cells[b].intrinsic_bbox().unwrap());
        let (ka, kb) = match o {
            Orientation::Horizontal => (ba.y0, bb.y0),
            Orientation::Vertical => (ba.x0, bb.x0),
        };
        ka.partial_cmp(&kb).unwrap()
    });

    let mut bands: Vec<Vec<usize>> = Vec::new();
    let mut band_bbox: Vec<BBox> = Vec::new();
    for idx in indices {
        let bbox = cells[idx].intrinsic_bbox().unwrap();
        let joined = band_bbox.last().is_some_and(|&last| match o {
            Orientation::Horizontal => BBox::is_h_overlap(last, bbox, frac),
            Orientation::Vertical => BBox::is_v_overlap(last, bbox, frac),
        });
        if joined {
            bands.last_mut().unwrap().push(idx);
            let last = band_bbox.last_mut().unwrap();
            *last = BBox::merge(*last, bbox);
        } else {
            bands.push(vec![idx]);
            band_bbox.push(bbox);
        }
    }
    bands
}

/// §4.5 step 2: finds `RepeatIdentifier`/value/`RepeatIdentifier`
/// triples among `other_cells` (vertical or horizontal) that fall
/// inside the table's bbox, and splices each as a new column between
/// the two data columns it falls between.
pub fn insert_repeat_columns(
    table: &mut Table,
    other_cells: &[Cell],
    config: &EngineConfig,
) -> Result<(), CoreError> {
    let table_bbox = full_table_bbox(table);
    let within: Vec<&Cell> = other_cells
        .iter()
        .filter(|c| c.intrinsic_bbox().is_some_and(|b| table_bbox.contains_point(b.x0, b.y0)))
        .collect();

    let triples = find_repeat_triples(&within, config);
    for triple in triples {
        let Some(insert_at) = column_to_insert_after(table, triple.identifier_bbox()) else {
            continue;
        };
        let column = build_repeat_column(table, &triple);
        table.insert_col_at(insert_at, column)?;
    }
    Ok(())
}

/// places a repeat triple's three cells into a full-height column,
/// aligning each to the table row its bbox h-overlaps the most
/// (§4.5 step 2); every other row receives [`Cell::Empty`].
fn build_repeat_column(table: &Table, triple: &RepeatTriple) -> Vec<Cell> {
    let mut column = vec![Cell::Empty; table.rows()];
    for cell in [triple.top, triple.middle, triple.bottom] {
        let Some(bbox) = cell.intrinsic_bbox() else {
            continue;
        };
        let best_row = (0..table.rows()).max_by(|&a, &b| {
            let overlap_a = BBox::h_overlap(table.bbox(table.row_ids(a)), bbox);
            let overlap_b = BBox::h_overlap(table.bbox(table.row_ids(b)), bbox);
            overlap_a.partial_cmp(&overlap_b).unwrap()
        });
        if let Some(r) = best_row {
            column[r] = cell.clone();
        }
    }
    column
}

struct RepeatTriple<'a> {
    top: &'a Cell,
    middle: &'a Cell,
    bottom: &'a Cell,
}

impl<'a> RepeatTriple<'a> {
    fn identifier_bbox(&self) -> BBox {
        BBox::merge_all(&[
            self.top.intrinsic_bbox().unwrap(),
            self.middle.intrinsic_bbox().unwrap(),
            self.bottom.intrinsic_bbox().unwrap(),
        ])
    }
}

fn find_repeat_triples<'a>(cells: &[&'a Cell], config: &EngineConfig) -> Vec<RepeatTriple<'a>> {
    let mut idents: Vec<&&Cell> = cells
        .iter()
        .filter(|c| typing::is_repeat_identifier_text(c.text(), config))
        .collect();
    idents.sort_by(|a, b| {
        a.intrinsic_bbox()
            .unwrap()
            .y0
            .partial_cmp(&b.intrinsic_bbox().unwrap().y0)
            .unwrap()
    });

    let mut triples = Vec::new();
    for pair in idents.windows(2) {
        let (top, bottom) = (pair[0], pair[1]);
        let top_bbox = top.intrinsic_bbox().unwrap();
        let bottom_bbox = bottom.intrinsic_bbox().unwrap();
        let middle = cells.iter().find(|c| {
            c.intrinsic_bbox().is_some_and(|b| {
                typing::looks_like_repeat_value(c.text())
                    && b.y0 > top_bbox.y0
                    && b.y1 < bottom_bbox.y1
                    && BBox::is_v_overlap(top_bbox, b, 0.3)
            })
        });
        if let Some(middle) = middle {
            triples.push(RepeatTriple {
                top: *top,
                middle,
                bottom: *bottom,
            });
        }
    }
    triples
}

fn column_to_insert_after(table: &Table, triple_bbox: BBox) -> Option<usize> {
    (0..table.cols()).find(|&c| {
        table.col_ids(c).iter().any(|id| {
            table
                .cell(*id)
                .intrinsic_bbox()
                .is_some_and(|b| b.x0 > triple_bbox.x1)
        })
    })
}

fn full_table_bbox(table: &Table) -> BBox {
    let ids: Vec<_> = (0..table.rows()).flat_map(|r| table.row_ids(r).to_vec()).collect();
    table.bbox(&ids)
}

/// §4.5 step 3: grows the table outward in each configured direction
/// using the remaining other-cells until no further candidate aligns.
pub fn expand_table(
    table: &mut Table,
    other_cells: &[Cell],
    config: &EngineConfig,
) -> Result<(), CoreError> {
    let mut pool: Vec<Cell> = other_cells.to_vec();
    for &direction in &config.table_expansion_directions {
        loop {
            let Some((line, consumed)) = next_expansion_line(table, &pool, direction, config) else {
                break;
            };
            match direction {
                Direction::North | Direction::South => table.append_row(direction, line)?,
                Direction::East | Direction::West => table.append_col(direction, line)?,
            }
            let mut remaining = Vec::with_capacity(pool.len());
            for (i, cell) in pool.into_iter().enumerate() {
                if !consumed.contains(&i) {
                    remaining.push(cell);
                }
            }
            pool = remaining;
        }
    }
    Ok(())
}

fn next_expansion_line(
    table: &Table,
    pool: &[Cell],
    direction: Direction,
    config: &EngineConfig,
) -> Option<(Vec<Cell>, Vec<usize>)> {
    let edge: Vec<_> = match direction {
        Direction::North => table.row_ids(0).to_vec(),
        Direction::South => table.row_ids(table.rows() - 1).to_vec(),
        Direction::West => table.col_ids(0),
        Direction::East => table.col_ids(table.cols() - 1),
    };
    let bound = edge_bound(table, &edge, direction)?;

    let on_correct_side = |bbox: &BBox| match direction {
        Direction::North => bbox.y1 <= bound,
        Direction::South => bbox.y0 >= bound,
        Direction::West => bbox.x1 <= bound,
        Direction::East => bbox.x0 >= bound,
    };

    let mut line = vec![Cell::Empty; edge.len()];
    let mut consumed = Vec::new();
    let mut any_match = false;
    for (slot, &edge_id) in line.iter_mut().zip(edge.iter()) {
        let Some(edge_bbox) = table.cell(edge_id).intrinsic_bbox() else {
            continue;
        };
        let mut best: Option<(usize, f64)> = None;
        for (i, cell) in pool.iter().enumerate() {
            if consumed.contains(&i) {
                continue;
            }
            let Some(bbox) = cell.intrinsic_bbox() else {
                continue;
            };
            if !on_correct_side(&bbox) {
                continue;
            }
            let aligned = match direction.orientation() {
                Orientation::Vertical => BBox::is_v_overlap(edge_bbox, bbox, config.min_cell_overlap),
                Orientation::Horizontal => BBox::is_h_overlap(edge_bbox, bbox, config.min_cell_overlap),
            };
            if !aligned {
                continue;
            }
            let overlap = match direction.orientation() {
                Orientation::Vertical => BBox::v_overlap(edge_bbox, bbox),
                Orientation::Horizontal => BBox::h_overlap(edge_bbox, bbox),
            };
            if best.map_or(true, |(_, b)| overlap > b) {
                best = Some((i, overlap));
            }
        }
        if let Some((i, _)) = best {
            *slot = pool[i].clone();
            consumed.push(i);
            any_match = true;
        }
    }

    any_match.then_some((line, consumed))
}

fn edge_bound(table: &Table, edge: &[crate::table::CellId], direction: Direction) -> Option<f64> {
    let bboxes: Vec<BBox> = edge.iter().filter_map(|id| table.cell(*id).intrinsic_bbox()).collect();
    if bboxes.is_empty() {
        return None;
    }
    Some(match direction {
        Direction::North => bboxes.iter().map(|b| b.y0).fold(f64::INFINITY, f64::min),
        Direction::South => bboxes.iter().map(|b| b.y1).fold(f64::NEG_INFINITY, f64::max),
        Direction::West => bboxes.iter().map(|b| b.x0).fold(f64::INFINITY, f64::min),
        Direction::East => bboxes.iter().map(|b| b.x1).fold(f64::NEG_INFINITY, f64::max),
    })
}

/// §4.5 step 4: types the table, then splits it at every row/column
/// that fully spans the table with a `Days` (horizontal split) or
/// `EntryAnnotIdent`-originated (vertical split) type. Sub-tables
/// with fewer than `min_row_count` data rows are discarded (logged).
pub fn split_table(table: Table, config: &EngineConfig) -> Vec<Table> {
    let mut typed = table;
    typing::infer_types(&mut typed, config);

    if let Some(r) = find_full_span_row(&typed, CellType::Days) {
        if r > 0 && r < typed.rows() - 1 {
            return match typed.split_rows(r) {
                Ok((top, bottom)) => {
                    let mut results = split_table(top, config);
                    results.extend(split_table(bottom, config));
                    return results;
                }
                Err(_) => vec![typed],
            };
        }
    }
    if let Some(c) = find_full_span_col(&typed, CellType::EntryAnnotIdent) {
        if c > 0 && c < typed.cols() - 1 {
            if let Ok((left, right)) = typed.split_cols(c) {
                let mut results = split_table(left, config);
                results.extend(split_table(right, config));
                return results;
            }
        }
    }

    if count_data_rows(&typed) < config.min_row_count {
        log::warn!(
            "discarding table with {} data rows (below min_row_count {})",
            count_data_rows(&typed),
            config.min_row_count
        );
        return Vec::new();
    }
    vec![typed]
}

fn find_full_span_row(table: &Table, t: CellType) -> Option<usize> {
    (0..table.rows()).find(|&r| {
        table.row_ids(r).iter().all(|id| {
            table.cell(*id).is_empty()
                || table.slot(*id).type_info().map(|i| i.inferred()) == Some(t)
        }) && table
            .row_ids(r)
            .iter()
            .any(|id| table.slot(*id).type_info().map(|i| i.inferred()) == Some(t))
    })
}

fn find_full_span_col(table: &Table, t: CellType) -> Option<usize> {
    (0..table.cols()).find(|&c| {
        let col = table.col_ids(c);
        col.iter().all(|id| {
            table.cell(*id).is_empty()
                || table.slot(*id).type_info().map(|i| i.inferred()) == Some(t)
        }) && col
            .iter()
            .any(|id| table.slot(*id).type_info().map(|i| i.inferred()) == Some(t))
    })
}

fn count_data_rows(table: &Table) -> usize {
    (0..table.rows())
        .filter(|&r| {
            table
                .row_ids(r)
                .iter()
                .any(|id| table.slot(*id).type_info().map(|i| i.inferred()) == Some(CellType::Time))
        })
        .count()
}

/// runs the full §4.5 pipeline end to end, returning the independent
/// sub-tables left after splitting.
pub fn discover_tables(
    data_cells: &[Cell],
    other_cells: &[Cell],
    config: &EngineConfig,
) -> Result<Vec<Table>, CoreError> {
    let mut table = seed_table(data_cells, config)?;
    insert_repeat_columns(&mut table, other_cells, config)?;
    expand_table(&mut table, other_cells, config)?;
    Ok(split_table(table, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::geometry::BBox;

    fn cell(x0: f64, y0: f64, x1: f64, y1: f64, text: &str) -> Cell {
        Cell::new_text(text.to_string(), BBox::new(x0, y0, x1, y1), None, Some(10.0))
    }

    #[test]
    fn seeds_a_two_by_two_grid_from_aligned_cells() {
        let config = test_config();
        let cells = vec![
            cell(0.0, 0.0, 10.0, 10.0, "Stop A"),
            cell(20.0, 0.0, 30.0, 10.0, "07:00"),
            cell(0.0, 20.0, 10.0, 30.0, "Stop B"),
            cell(20.0, 20.0, 30.0, 30.0, "07:10"),
        ];
        let table = seed_table(&cells, &config).unwrap();
        assert_eq!(table.rows(), 2);
        assert_eq!(table.cols(), 2);
    }

    #[test]
    fn seed_fills_missing_grid_position_with_empty() {
        let config = test_config();
        let cells = vec![
            cell(0.0, 0.0, 10.0, 10.0, "Stop A"),
            cell(20.0, 0.0, 30.0, 10.0, "07:00"),
            cell(0.0, 20.0, 10.0, 30.0, "Stop B"),
            // no time cell for row 1 — missing grid position.
        ];
        let table = seed_table(&cells, &config).unwrap();
        assert_eq!(table.rows(), 2);
        assert_eq!(table.cols(), 2);
        let missing = table.row_ids(1)[1];
        assert!(table.cell(missing).is_empty());
    }

    #[test]
    fn seeding_empty_cells_is_an_error() {
        let config = test_config();
        assert!(seed_table(&[], &config).is_err());
    }

    #[test]
    fn discards_table_below_min_row_count() {
        let config = test_config();
        let cells = vec![cell(0.0, 0.0, 10.0, 10.0, "Stop A"), cell(20.0, 0.0, 30.0, 10.0, "07:00")];
        let tables = discover_tables(&cells, &[], &config).unwrap();
        assert!(tables.is_empty());
    }
}
