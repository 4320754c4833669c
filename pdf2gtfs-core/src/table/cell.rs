use crate::geometry::BBox;
use crate::typing::TypeInfo;

/// A freestanding table cell, before (or independent of) its placement
/// in a [`super::Table`]. An [`Cell::Empty`] cell carries no text and no
/// intrinsic bbox — its geometry is derived on demand from the owning
/// table's row/column extents (§3 "Cell").
#[derive(Debug, Clone)]
pub enum Cell {
    Text(TextCell),
    Empty,
}

#[derive(Debug, Clone)]
pub struct TextCell {
    pub text: String,
    pub bbox: BBox,
    pub font: Option<String>,
    pub fontsize: Option<f64>,
}

impl Cell {
    pub fn new_text(text: String, bbox: BBox, font: Option<String>, fontsize: Option<f64>) -> Cell {
        Cell::Text(TextCell {
            text,
            bbox,
            font,
            fontsize,
        })
    }

    pub fn empty() -> Cell {
        Cell::Empty
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn text(&self) -> &str {
        match self {
            Cell::Text(t) => &t.text,
            Cell::Empty => "",
        }
    }

    /// the cell's intrinsic bbox, or `None` for an empty cell — callers
    /// needing a definite bbox for an empty cell should go through
    /// [`super::Table::cell_bbox`] instead.
    pub fn intrinsic_bbox(&self) -> Option<BBox> {
        match self {
            Cell::Text(t) => Some(t.bbox),
            Cell::Empty => None,
        }
    }

    pub fn fontsize(&self) -> Option<f64> {
        match self {
            Cell::Text(t) => t.fontsize,
            Cell::Empty => None,
        }
    }
}

/// a cell's slot inside a [`super::Table`]: its content, grid position,
/// and (once computed) inferred type.
#[derive(Debug, Clone)]
pub struct CellSlot {
    pub(super) cell: Cell,
    pub(super) row: usize,
    pub(super) col: usize,
    pub(super) type_info: Option<TypeInfo>,
}

impl CellSlot {
    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn col(&self) -> usize {
        self.col
    }

    pub fn type_info(&self) -> Option<&TypeInfo> {
        self.type_info.as_ref()
    }
}
