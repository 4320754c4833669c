//! Top-level error type for the `pdf2gtfs` binary, in the style of the
//! library crates' own error enums (`pdf2gtfs_core::CoreError`,
//! `pdf2gtfs_gtfs::GtfsError`, `pdf2gtfs_location::LocationError`):
//! `#[from]` conversions at every crate boundary, plus the binary's own
//! variants for the §6 exit-code conditions.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load settings from '{0}': {1}")]
    Settings(String, String),
    #[error("invalid configuration value: {0}")]
    InvalidConfig(#[from] pdf2gtfs_core::config::ConfigError),
    #[error("glyph source '{0}' could not be read: {1}")]
    UnreadableGlyphSource(String, String),
    #[error("requested page {0} does not exist in the glyph source")]
    InvalidPagesRequested(u32),
    #[error("output path '{0}' already exists and non_interactive is set")]
    OutputAlreadyExists(PathBuf),
    #[error("route_type '{0}' is not a recognized GTFS route type")]
    UnknownRouteType(String),
    #[error("table reconstruction failed: {0}")]
    Core(#[from] pdf2gtfs_core::CoreError),
    #[error("GTFS projection failed: {0}")]
    Gtfs(#[from] pdf2gtfs_gtfs::GtfsError),
    #[error("location resolution failed: {0}")]
    Location(#[from] pdf2gtfs_location::LocationError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// §6 exit codes: `0` success (not represented here), `2` unreadable
    /// PDF/glyph source, `3` invalid pages requested, `12` output
    /// already exists in non-interactive mode. Every other failure uses
    /// a generic non-zero code, since §6 only names those three.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::UnreadableGlyphSource(..) => 2,
            AppError::InvalidPagesRequested(..) => 3,
            AppError::OutputAlreadyExists(..) => 12,
            _ => 1,
        }
    }
}
