//! Command-line surface, in the style of `bambam`'s own `clap::Parser`
//! derive (`examples/NatLabRockies-bambam/rust/bambam/src/main.rs`).

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "pdf2gtfs",
    about = "Reconstructs a GTFS feed from a transit agency's timetable PDF glyphs"
)]
pub struct CliArgs {
    /// path to the TOML settings file (engine configuration + agency metadata).
    #[arg(long)]
    pub config: PathBuf,

    /// path to a JSON array-of-pages-of-glyphs file, standing in for the
    /// out-of-scope PDF-extraction collaborator.
    #[arg(long)]
    pub glyphs: PathBuf,

    /// path to the raw OSM snapshot text file, standing in for the
    /// out-of-scope HTTP-fetched/cached snapshot collaborator.
    #[arg(long)]
    pub osm_snapshot: PathBuf,

    /// where to write the resulting GTFS feed (as JSON; see
    /// `pipeline::write_feed`'s doc comment for why).
    #[arg(long, default_value = "gtfs_feed.json")]
    pub output: PathBuf,
}
