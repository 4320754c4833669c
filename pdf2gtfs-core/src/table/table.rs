use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::error::CoreError;
use crate::geometry::{BBox, Direction, Orientation};

use super::cell::{Cell, CellSlot};

/// A non-owning handle into a [`Table`]'s cell arena. Meaningless
/// outside the table that produced it (§9: "arena + index").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(pub(super) usize);

/// A rectangular quad-linked mesh of cells (§3 "Table", §4.3).
///
/// Internally backed by a dense `rows x cols` grid of [`CellId`]s
/// rather than raw pointer splicing — the Rust-idiomatic translation of
/// the original's doubly-linked-in-both-directions list (§9: "the table
/// is the arena; cells are owned by it and hold non-owning neighbor
/// links"). [`Table::neighbor`] derives N/S/E/W links from grid
/// adjacency, which by construction satisfies the symmetric-linking
/// invariant and the equal-row/column-length invariant.
pub struct Table {
    cells: Vec<CellSlot>,
    grid: Vec<Vec<CellId>>,
    bbox_cache: RefCell<HashMap<u64, BBox>>,
}

impl Table {
    /// builds a table from a fully-populated rectangular grid of cells
    /// (row-major). All rows must have equal length; this is the
    /// primitive every higher-level discovery operation (seed, expand,
    /// split, repeat-insert) eventually calls into.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Table, CoreError> {
        if rows.is_empty() || rows[0].is_empty() {
            return Err(CoreError::EmptyTable);
        }
        let ncols = rows[0].len();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != ncols {
                return Err(CoreError::LineLengthMismatch {
                    existing: ncols,
                    new: row.len(),
                });
            }
            validate_row_order(row).map_err(|e| {
                CoreError::InvalidLine(format!("row {i} invalid: {e}"))
            })?;
        }

        let mut cells = Vec::new();
        let mut grid = Vec::with_capacity(rows.len());
        for (r, row) in rows.into_iter().enumerate() {
            let mut grid_row = Vec::with_capacity(ncols);
            for (c, cell) in row.into_iter().enumerate() {
                let id = CellId(cells.len());
                cells.push(CellSlot {
                    cell,
                    row: r,
                    col: c,
                    type_info: None,
                });
                grid_row.push(id);
            }
            grid.push(grid_row);
        }

        Ok(Table {
            cells,
            grid,
            bbox_cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn rows(&self) -> usize {
        self.grid.len()
    }

    pub fn cols(&self) -> usize {
        self.grid.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.0].cell
    }

    pub fn slot(&self, id: CellId) -> &CellSlot {
        &self.cells[id.0]
    }

    pub fn set_type(&mut self, id: CellId, info: crate::typing::TypeInfo) {
        self.cells[id.0].type_info = Some(info);
    }

    pub fn row_ids(&self, row: usize) -> &[CellId] {
        &self.grid[row]
    }

    pub fn col_ids(&self, col: usize) -> Vec<CellId> {
        self.grid.iter().map(|row| row[col]).collect()
    }

    pub fn row_of(&self, id: CellId) -> usize {
        self.cells[id.0].row
    }

    pub fn col_of(&self, id: CellId) -> usize {
        self.cells[id.0].col
    }

    /// the neighbor of `id` in direction `d`, or `None` at a table edge.
    /// By construction, `neighbor(neighbor(id, d), opposite(d)) == id`
    /// whenever the first neighbor exists — the symmetric-linking
    /// invariant of §3/§8 holds for free from the grid representation.
    pub fn neighbor(&self, id: CellId, d: Direction) -> Option<CellId> {
        let slot = &self.cells[id.0];
        let (r, c) = (slot.row, slot.col);
        match d {
            Direction::North => r.checked_sub(1).map(|r| self.grid[r][c]),
            Direction::South => self.grid.get(r + 1).map(|row| row[c]),
            Direction::West => c.checked_sub(1).map(|c| self.grid[r][c]),
            Direction::East => {
                let row = &self.grid[r];
                row.get(c + 1).copied()
            }
        }
    }

    /// all cells in the row (`o = Horizontal`) or column (`o =
    /// Vertical`) containing `id`, in index order (§4.3 `get_series`).
    /// The returned sequence is a snapshot — mutating the table while
    /// holding it does not invalidate it, but it also won't reflect
    /// subsequent structural changes.
    pub fn get_series(&self, o: Orientation, id: CellId) -> Vec<CellId> {
        let slot = &self.cells[id.0];
        match o {
            Orientation::Horizontal => self.grid[slot.row].clone(),
            Orientation::Vertical => self.col_ids(slot.col),
        }
    }

    /// the merged bbox of the non-empty cells among `ids`, memoized by
    /// a hash of the contributing bbox coordinates (§4.3).
    pub fn bbox(&self, ids: &[CellId]) -> BBox {
        let bboxes: Vec<BBox> = ids
            .iter()
            .filter_map(|id| self.cell(*id).intrinsic_bbox())
            .collect();
        if bboxes.len() == 1 {
            return bboxes[0];
        }
        if bboxes.is_empty() {
            // every cell in the series is empty; fall back to the
            // on-demand derivation used for individual empty cells.
            return self.cell_bbox(ids[0]);
        }
        let key = hash_bboxes(&bboxes);
        if let Some(cached) = self.bbox_cache.borrow().get(&key) {
            return *cached;
        }
        let merged = BBox::merge_all(&bboxes);
        self.bbox_cache.borrow_mut().insert(key, merged);
        merged
    }

    /// the bbox of `id`, deriving it from row/column extents if `id`
    /// is an empty cell (§3: "its bbox is derived on demand from its
    /// row's y-extent and its column's x-extent").
    pub fn cell_bbox(&self, id: CellId) -> BBox {
        if let Some(bbox) = self.cell(id).intrinsic_bbox() {
            return bbox;
        }
        let slot = &self.cells[id.0];
        let row_bboxes: Vec<BBox> = self.grid[slot.row]
            .iter()
            .filter_map(|c| self.cell(*c).intrinsic_bbox())
            .collect();
        let col_bboxes: Vec<BBox> = self
            .col_ids(slot.col)
            .iter()
            .filter_map(|c| self.cell(*c).intrinsic_bbox())
            .collect();
        let y0 = row_bboxes.iter().map(|b| b.y0).fold(f64::INFINITY, f64::min);
        let y1 = row_bboxes
            .iter()
            .map(|b| b.y1)
            .fold(f64::NEG_INFINITY, f64::max);
        let x0 = col_bboxes.iter().map(|b| b.x0).fold(f64::INFINITY, f64::min);
        let x1 = col_bboxes
            .iter()
            .map(|b| b.x1)
            .fold(f64::NEG_INFINITY, f64::max);
        BBox::new(
            if x0.is_finite() { x0 } else { 0.0 },
            if y0.is_finite() { y0 } else { 0.0 },
            if x1.is_finite() { x1 } else { 0.0 },
            if y1.is_finite() { y1 } else { 0.0 },
        )
    }

    /// appends a new row at the table's north or south edge (§4.5 step
    /// 3 expansion).
    pub fn append_row(&mut self, d: Direction, cells: Vec<Cell>) -> Result<(), CoreError> {
        if !matches!(d, Direction::North | Direction::South) {
            return Err(CoreError::InvalidLine(
                "append_row requires North or South".to_string(),
            ));
        }
        if cells.len() != self.cols() {
            return Err(CoreError::LineLengthMismatch {
                existing: self.cols(),
                new: cells.len(),
            });
        }
        let insert_at = match d {
            Direction::North => 0,
            _ => self.grid.len(),
        };
        self.insert_row_at(insert_at, cells)
    }

    /// appends a new column at the table's west or east edge.
    pub fn append_col(&mut self, d: Direction, cells: Vec<Cell>) -> Result<(), CoreError> {
        if !matches!(d, Direction::West | Direction::East) {
            return Err(CoreError::InvalidLine(
                "append_col requires West or East".to_string(),
            ));
        }
        let insert_at = match d {
            Direction::West => 0,
            _ => self.cols(),
        };
        self.insert_col_at(insert_at, cells)
    }

    fn insert_row_at(&mut self, index: usize, cells: Vec<Cell>) -> Result<(), CoreError> {
        if cells.len() != self.cols() {
            return Err(CoreError::LineLengthMismatch {
                existing: self.cols(),
                new: cells.len(),
            });
        }
        let mut new_row = Vec::with_capacity(cells.len());
        for cell in cells {
            let id = CellId(self.cells.len());
            self.cells.push(CellSlot {
                cell,
                row: index,
                col: 0,
                type_info: None,
            });
            new_row.push(id);
        }
        self.grid.insert(index, new_row);
        self.reindex();
        self.bbox_cache.borrow_mut().clear();
        Ok(())
    }

    /// inserts a new column before `index` (0..=cols), splicing it
    /// between the existing columns `index - 1` and `index` (§4.5 step
    /// 2, repeat-column insertion between two adjacent data columns).
    pub fn insert_col_at(&mut self, index: usize, cells: Vec<Cell>) -> Result<(), CoreError> {
        if index > self.cols() {
            return Err(CoreError::IndexOutOfBounds {
                index,
                len: self.cols(),
            });
        }
        if cells.len() != self.rows() {
            return Err(CoreError::LineLengthMismatch {
                existing: self.rows(),
                new: cells.len(),
            });
        }
        for (r, cell) in cells.into_iter().enumerate() {
            let id = CellId(self.cells.len());
            self.cells.push(CellSlot {
                cell,
                row: r,
                col: index,
                type_info: None,
            });
            self.grid[r].insert(index, id);
        }
        self.reindex();
        self.bbox_cache.borrow_mut().clear();
        Ok(())
    }

    /// re-derives every cell slot's (row, col) from the grid after a
    /// structural edit.
    fn reindex(&mut self) {
        for (r, row) in self.grid.iter().enumerate() {
            for (c, id) in row.iter().enumerate() {
                self.cells[id.0].row = r;
                self.cells[id.0].col = c;
            }
        }
    }

    /// splits the table into two independent tables at row boundary
    /// `at`: rows `[0, at)` and `[at, rows())` (§4.5 step 4, horizontal
    /// split at a `Days` splitter row). Both halves are fresh tables
    /// that own copies of the affected cells.
    pub fn split_rows(&self, at: usize) -> Result<(Table, Table), CoreError> {
        if at == 0 || at >= self.rows() {
            return Err(CoreError::IndexOutOfBounds {
                index: at,
                len: self.rows(),
            });
        }
        let top = self.subgrid(0, at, 0, self.cols())?;
        let bottom = self.subgrid(at, self.rows(), 0, self.cols())?;
        Ok((top, bottom))
    }

    /// splits the table into two independent tables at column boundary
    /// `at` (§4.5 step 4, vertical split at a route-variant separator).
    pub fn split_cols(&self, at: usize) -> Result<(Table, Table), CoreError> {
        if at == 0 || at >= self.cols() {
            return Err(CoreError::IndexOutOfBounds {
                index: at,
                len: self.cols(),
            });
        }
        let left = self.subgrid(0, self.rows(), 0, at)?;
        let right = self.subgrid(0, self.rows(), at, self.cols())?;
        Ok((left, right))
    }

    fn subgrid(
        &self,
        row_start: usize,
        row_end: usize,
        col_start: usize,
        col_end: usize,
    ) -> Result<Table, CoreError> {
        let mut rows = Vec::with_capacity(row_end - row_start);
        for r in row_start..row_end {
            let mut row = Vec::with_capacity(col_end - col_start);
            for c in col_start..col_end {
                row.push(self.cell(self.grid[r][c]).clone());
            }
            rows.push(row);
        }
        Table::from_rows(rows)
    }
}

fn validate_row_order(row: &[Cell]) -> Result<(), String> {
    let mut last_x1: Option<f64> = None;
    for cell in row {
        if let Some(bbox) = cell.intrinsic_bbox() {
            if let Some(prev) = last_x1 {
                if bbox.x0 + 1e-6 < prev {
                    return Err("cells are not left-to-right sorted".to_string());
                }
            }
            last_x1 = Some(bbox.x1);
        }
    }
    Ok(())
}

fn hash_bboxes(bboxes: &[BBox]) -> u64 {
    let mut bits: Vec<u64> = bboxes
        .iter()
        .map(|b| {
            b.x0.to_bits() ^ b.y0.to_bits().rotate_left(16) ^ b.x1.to_bits().rotate_left(32)
                ^ b.y1.to_bits().rotate_left(48)
        })
        .collect();
    bits.sort_unstable();
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bits.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BBox;

    fn text(x0: f64, x1: f64) -> Cell {
        Cell::new_text(format!("{x0}"), BBox::new(x0, 0.0, x1, 10.0), None, None)
    }

    fn grid_2x3() -> Table {
        let rows = vec![
            vec![text(0.0, 10.0), text(10.0, 20.0), text(20.0, 30.0)],
            vec![text(0.0, 10.0), text(10.0, 20.0), text(20.0, 30.0)],
        ];
        Table::from_rows(rows).unwrap()
    }

    #[test]
    fn rows_and_cols_equal_across_table() {
        let t = grid_2x3();
        for r in 0..t.rows() {
            assert_eq!(t.row_ids(r).len(), t.cols());
        }
    }

    #[test]
    fn neighbor_links_are_symmetric() {
        let t = grid_2x3();
        let id = t.row_ids(0)[1];
        let east = t.neighbor(id, Direction::East).unwrap();
        assert_eq!(t.neighbor(east, Direction::West), Some(id));
        let south = t.neighbor(id, Direction::South).unwrap();
        assert_eq!(t.neighbor(south, Direction::North), Some(id));
    }

    #[test]
    fn edge_cells_have_no_outward_neighbor() {
        let t = grid_2x3();
        let top_left = t.row_ids(0)[0];
        assert_eq!(t.neighbor(top_left, Direction::North), None);
        assert_eq!(t.neighbor(top_left, Direction::West), None);
    }

    #[test]
    fn append_row_grows_every_column() {
        let mut t = grid_2x3();
        t.append_row(
            Direction::South,
            vec![text(0.0, 10.0), text(10.0, 20.0), text(20.0, 30.0)],
        )
        .unwrap();
        assert_eq!(t.rows(), 3);
        for c in 0..t.cols() {
            assert_eq!(t.col_ids(c).len(), 3);
        }
    }

    #[test]
    fn insert_col_between_existing_columns() {
        let mut t = grid_2x3();
        t.insert_col_at(1, vec![Cell::empty(), Cell::empty()]).unwrap();
        assert_eq!(t.cols(), 4);
        // original column 1 is now column 2
        assert_eq!(t.cell(t.row_ids(0)[2]).text(), "10");
    }

    #[test]
    fn split_rows_produces_two_independent_tables() {
        let mut t = grid_2x3();
        t.append_row(
            Direction::South,
            vec![text(0.0, 10.0), text(10.0, 20.0), text(20.0, 30.0)],
        )
        .unwrap();
        let (top, bottom) = t.split_rows(1).unwrap();
        assert_eq!(top.rows(), 1);
        assert_eq!(bottom.rows(), 2);
    }

    #[test]
    fn empty_cell_bbox_derives_from_row_and_column_extent() {
        let rows = vec![
            vec![text(0.0, 10.0), Cell::empty()],
            vec![text(0.0, 10.0), text(10.0, 20.0)],
        ];
        let t = Table::from_rows(rows).unwrap();
        let empty_id = t.row_ids(0)[1];
        let bbox = t.cell_bbox(empty_id);
        // y-extent from row 0 (the text cell at (0,10)), x-extent from
        // column 1 (the text cell at (10,20)).
        assert_eq!(bbox.x0, 10.0);
        assert_eq!(bbox.x1, 20.0);
        assert_eq!(bbox.y0, 0.0);
        assert_eq!(bbox.y1, 10.0);
    }

    #[test]
    fn building_from_empty_rows_is_an_error() {
        assert!(Table::from_rows(vec![]).is_err());
    }

    #[test]
    fn mismatched_row_lengths_are_rejected() {
        let rows = vec![vec![text(0.0, 10.0)], vec![text(0.0, 10.0), text(10.0, 20.0)]];
        assert!(matches!(
            Table::from_rows(rows),
            Err(CoreError::LineLengthMismatch { .. })
        ));
    }
}
