use thiserror::Error;

/// top-level error type for `pdf2gtfs-gtfs`, in the style of
/// `bambam-gtfs/src/schedule/schedule_error.rs`: a flat enum of
/// contextual, `String`-payload variants plus a couple of `#[from]`
/// conversions at crate boundaries.
#[derive(Debug, Error)]
pub enum GtfsError {
    #[error("timetable projection failed: {0}")]
    Core(#[from] pdf2gtfs_core::CoreError),
    #[error("entry at column {0} has no parseable start time; dropping its trip")]
    UnparseableStartTime(usize),
    #[error("repeat entry references out-of-range flanking entry index {0}")]
    InvalidRepeatFlank(usize),
    #[error("holiday_code '{0}' is not a recognized ISO country code")]
    UnknownHolidayCountry(String),
    #[error("gtfs_date_bounds did not parse as YYYYMMDD: {0}")]
    InvalidDateBounds(String),
}
