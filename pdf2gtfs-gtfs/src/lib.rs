//! GTFS aggregation and projection (§4.7): builds the in-memory
//! Agency/Stops/Routes/Trips/Calendar/CalendarDates/StopTimes
//! containers from one or more `pdf2gtfs_core::timetable::Timetable`s.
//!
//! CSV serialization and ZIP packaging are out of scope (§1) and left
//! to a downstream writer.

pub mod error;
pub mod holiday;
pub mod model;
pub mod projection;
pub mod schedule;

pub use error::GtfsError;
pub use model::GtfsFeed;
pub use projection::GtfsProjector;
