//! The §1 out-of-scope external collaborators, represented as trait
//! seams so the engine crates stay free of I/O: real PDF glyph
//! extraction and the HTTP-fetched/cached OSM snapshot. Each seam gets
//! one concrete, file-backed implementation here, since the binary
//! (unlike the core crates) is exactly where wiring real I/O in is this
//! repo's job.

use std::fs;
use std::path::{Path, PathBuf};

use gtfs_structures::RouteType;
use pdf2gtfs_core::glyph::Glyph;

use crate::error::AppError;

/// one page's worth of positioned glyphs, as the upstream PDF-extraction
/// collaborator would hand them to the engine (§1, §4.2 step 1).
pub trait GlyphSource {
    /// returns the glyphs for `page` (1-based), or `None` if the source
    /// has fewer pages than requested.
    fn page(&self, page: u32) -> Result<Option<Vec<Glyph>>, AppError>;

    fn page_count(&self) -> usize;
}

/// reads a JSON array-of-pages-of-[`Glyph`] file — the shape this
/// binary expects from whatever upstream glyph extractor produced it,
/// since real PDF parsing is explicitly out of scope (§1).
pub struct JsonGlyphSource {
    pages: Vec<Vec<Glyph>>,
}

impl JsonGlyphSource {
    pub fn read(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path)
            .map_err(|e| AppError::UnreadableGlyphSource(path.display().to_string(), e.to_string()))?;
        let pages: Vec<Vec<Glyph>> = serde_json::from_str(&text)
            .map_err(|e| AppError::UnreadableGlyphSource(path.display().to_string(), e.to_string()))?;
        Ok(JsonGlyphSource { pages })
    }
}

impl GlyphSource for JsonGlyphSource {
    fn page(&self, page: u32) -> Result<Option<Vec<Glyph>>, AppError> {
        if page == 0 {
            return Ok(None);
        }
        Ok(self.pages.get(page as usize - 1).cloned())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// the raw OSM snapshot text §4.8 candidate preparation parses — a
/// tab-separated dump of `stop_position`/similar nodes, fetched and
/// cached by an out-of-scope HTTP collaborator (§1).
pub trait OsmSnapshotSource {
    fn read(&self) -> Result<String, AppError>;
}

pub struct FileOsmSnapshotSource {
    pub path: PathBuf,
}

impl OsmSnapshotSource for FileOsmSnapshotSource {
    fn read(&self) -> Result<String, AppError> {
        Ok(fs::read_to_string(&self.path)?)
    }
}

/// the route types §4.9's candidate scoring (`model::scoring::table_for`)
/// actually distinguishes; anything else is rejected rather than
/// silently mapped to a guess.
pub fn parse_route_type(raw: &str) -> Result<RouteType, AppError> {
    match raw {
        "Tramway" | "tram" | "Tram" => Ok(RouteType::Tramway),
        "Subway" | "subway" => Ok(RouteType::Subway),
        "Rail" | "rail" => Ok(RouteType::Rail),
        "Bus" | "bus" => Ok(RouteType::Bus),
        "Ferry" | "ferry" => Ok(RouteType::Ferry),
        "Trolleybus" | "trolleybus" => Ok(RouteType::Trolleybus),
        "Monorail" | "monorail" => Ok(RouteType::Monorail),
        other => Err(AppError::UnknownRouteType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_route_types_case_insensitively() {
        assert_eq!(parse_route_type("bus").unwrap(), RouteType::Bus);
        assert_eq!(parse_route_type("Tramway").unwrap(), RouteType::Tramway);
    }

    #[test]
    fn rejects_unknown_route_types() {
        assert!(matches!(
            parse_route_type("CableCar"),
            Err(AppError::UnknownRouteType(_))
        ));
    }

    #[test]
    fn json_glyph_source_reports_missing_pages_as_none() {
        let dir = std::env::temp_dir().join(format!("pdf2gtfs_glyphs_test_{}.json", std::process::id()));
        std::fs::write(&dir, "[[]]").unwrap();
        let source = JsonGlyphSource::read(&dir).unwrap();
        assert_eq!(source.page_count(), 1);
        assert!(source.page(2).unwrap().is_none());
        assert!(source.page(1).unwrap().is_some());
        let _ = std::fs::remove_file(&dir);
    }
}
