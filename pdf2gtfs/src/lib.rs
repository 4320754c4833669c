//! The `pdf2gtfs` binary's library surface: wires
//! [`pdf2gtfs_core`], [`pdf2gtfs_gtfs`] and [`pdf2gtfs_location`]
//! together behind a CLI, owning the bits the engine crates
//! deliberately leave out of scope (§1) — configuration loading, the
//! external-collaborator seams, and orchestration.

pub mod cli;
pub mod collaborators;
pub mod error;
pub mod pipeline;
pub mod settings;

pub use cli::CliArgs;
pub use error::AppError;
