//! Tabular reconstruction and semantic classification engine.
//!
//! Turns a PDF page's positioned glyphs into a typed, GTFS-agnostic
//! [`timetable::Timetable`]: glyph -> [`table::Cell`] grouping
//! ([`glyph`]), a quad-linked [`table::Table`] mesh ([`table`]),
//! probabilistic [`typing::CellType`] classification ([`typing`]),
//! table discovery/growth/splitting ([`discovery`]), and projection
//! onto a [`timetable::Timetable`] ([`timetable`]).
//!
//! PDF glyph extraction, GTFS emission, and OSM lookups are external
//! collaborators and live in sibling crates or upstream of this one.

pub mod config;
pub mod discovery;
pub mod error;
pub mod geometry;
pub mod glyph;
pub mod table;
pub mod timetable;
pub mod typing;

pub use config::EngineConfig;
pub use error::CoreError;
