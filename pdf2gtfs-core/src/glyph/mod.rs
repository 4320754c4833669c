//! Glyph -> cell grouping (§4.2).
//!
//! Consumes a page's raw positioned glyphs (as yielded by the
//! out-of-scope PDF-extraction collaborator, §6) and groups them into
//! lines, then cells, producing the two cell streams ("data" and
//! "other") the discovery stage (§4.5) seeds from.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::geometry::BBox;
use crate::table::Cell;
use itertools::Itertools;

/// A single upright glyph as handed to the engine by the PDF-extraction
/// collaborator. Non-upright glyphs are expected to already be filtered
/// out upstream (§4.2 step 1); [`group_glyphs_into_cells`] drops any
/// that slip through defensively.
///
/// `Serialize`/`Deserialize` support the pre-extracted glyph dump the
/// `pdf2gtfs` binary reads through its `GlyphSource` seam (§1: real PDF
/// parsing is an external collaborator, but this crate still needs a
/// concrete, testable input shape for that seam).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Glyph {
    pub bbox: BBox,
    pub text: String,
    pub font: String,
    pub fontsize: f64,
    pub upright: bool,
}

/// the classification of a freshly grouped cell, before it ever enters
/// a [`crate::table::Table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Data,
    Other,
}

/// result of grouping one page's glyphs: the cells, split into the two
/// streams §4.2 describes, plus a count of glyphs dropped as
/// opaque/font-encoded (logged, not fatal, per §7).
#[derive(Debug, Default)]
pub struct GroupedGlyphs {
    pub data_cells: Vec<Cell>,
    pub other_cells: Vec<Cell>,
    pub discarded: usize,
}

const SPACE_GLYPH_WIDTH: f64 = 0.2;
const SPACE_WIDTH_FACTOR: f64 = 1.35;

/// groups a page's glyphs into cells per §4.2.
///
/// 1. drops non-upright glyphs.
/// 2. buckets by `y0` into lines using half the mean glyph height as the
///    bucketing threshold.
/// 3. within a line, sorted by `x0`, starts a new cell whenever the gap
///    to the previous glyph exceeds `space_glyph_width * fontsize * 1.35`.
/// 4. classifies each cell as [`CellKind::Data`] if its text parses
///    under `time_format`, else [`CellKind::Other`].
pub fn group_glyphs_into_cells(glyphs: &[Glyph], config: &EngineConfig) -> GroupedGlyphs {
    let mut result = GroupedGlyphs::default();

    let upright: Vec<&Glyph> = glyphs
        .iter()
        .filter(|g| {
            if !g.upright {
                return false;
            }
            if is_font_encoded_garbage(&g.text) {
                result.discarded += 1;
                log::warn!("discarding glyph with font-encoded text: {:?}", g.text);
                return false;
            }
            true
        })
        .collect();

    if upright.is_empty() {
        return result;
    }

    let mean_height = upright.iter().map(|g| g.bbox.height()).sum::<f64>() / upright.len() as f64;
    let line_threshold = mean_height / 2.0;

    let mut sorted_by_y: Vec<&Glyph> = upright.clone();
    sorted_by_y.sort_by(|a, b| a.bbox.y0.partial_cmp(&b.bbox.y0).unwrap());

    let mut lines: Vec<Vec<&Glyph>> = Vec::new();
    for glyph in sorted_by_y {
        match lines.last_mut() {
            Some(line) if (glyph.bbox.y0 - line_anchor(line)).abs() <= line_threshold => {
                line.push(glyph);
            }
            _ => lines.push(vec![glyph]),
        }
    }

    for line in lines {
        let mut sorted = line;
        sorted.sort_by(|a, b| a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap());
        for run in split_into_runs(&sorted) {
            let cell = cell_from_run(&run);
            match classify(&cell.text(), config) {
                CellKind::Data => result.data_cells.push(cell),
                CellKind::Other => result.other_cells.push(cell),
            }
        }
    }

    result
}

fn line_anchor(line: &[&Glyph]) -> f64 {
    line.iter().map(|g| g.bbox.y0).sum::<f64>() / line.len() as f64
}

/// splits a line's x-sorted glyphs into contiguous cell runs: a new
/// run starts whenever the gap to the previous glyph's `x1` exceeds
/// the running font's space width, or the font/size changes.
fn split_into_runs<'a>(sorted: &[&'a Glyph]) -> Vec<Vec<&'a Glyph>> {
    let mut runs: Vec<Vec<&Glyph>> = Vec::new();
    for &glyph in sorted {
        let space_width = SPACE_GLYPH_WIDTH * glyph.fontsize * SPACE_WIDTH_FACTOR;
        let starts_new_run = match runs.last() {
            Some(run) => {
                let prev = run.last().unwrap();
                let gap = glyph.bbox.x0 - prev.bbox.x1;
                gap > space_width || prev.font != glyph.font || prev.fontsize != glyph.fontsize
            }
            None => true,
        };
        if starts_new_run {
            runs.push(vec![glyph]);
        } else {
            runs.last_mut().unwrap().push(glyph);
        }
    }
    runs
}

fn cell_from_run(run: &[&Glyph]) -> Cell {
    let text: String = run.iter().map(|g| g.text.as_str()).join("");
    let bbox = BBox::merge_all(&run.iter().map(|g| g.bbox).collect::<Vec<_>>());
    let font = run[0].font.clone();
    let fontsize = run[0].fontsize;
    Cell::new_text(text.trim().to_string(), bbox, Some(font), Some(fontsize))
}

fn classify(text: &str, config: &EngineConfig) -> CellKind {
    if crate::typing::parses_as_time(text, &config.time_format) {
        CellKind::Data
    } else {
        CellKind::Other
    }
}

/// a heuristic for detecting glyphs whose text is an opaque
/// font-encoded placeholder rather than real text (e.g. a private-use
/// area codepoint emitted by a broken font subset).
fn is_font_encoded_garbage(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| ('\u{E000}'..='\u{F8FF}').contains(&c))
}
