//! The seven GTFS containers of §3 ("GTFS aggregator"), plus the
//! [`GtfsTime`] value type used to encode service-day wraparound.
//!
//! `route_type` reuses [`gtfs_structures::RouteType`] rather than
//! reinventing the GTFS route-type enum (the same crate
//! `bambam-gtfs/src/schedule/date/date_ops.rs` pulls `Calendar`,
//! `CalendarDate` and `Exception` from); the other six containers are
//! kept as separate, independently owned maps per §3's "seven logical
//! containers keyed by type-specific IDs" rather than nesting stop
//! times inside a trip the way `gtfs_structures::Trip` does, since the
//! spec is explicit about each container owning its own entries.

use chrono::NaiveDate;
use gtfs_structures::RouteType;
use indexmap::IndexMap;
use serde::Serialize;

/// seconds since midnight of the *service day* — unlike
/// [`chrono::NaiveTime`] this is allowed to exceed 86400, which is how
/// GTFS (and §4.7's service-day offset) represents a trip that started
/// the previous calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GtfsTime(pub i64);

impl GtfsTime {
    pub fn from_seconds(seconds: i64) -> Self {
        GtfsTime(seconds)
    }

    /// parses a raw cell time string (e.g. `"07:00"`) under the
    /// configured time format, returning `None` on parse failure —
    /// callers keep the cell as `Other` per §7 rather than failing the
    /// whole projection.
    pub fn parse(text: &str, format: &str) -> Option<GtfsTime> {
        use chrono::Timelike;
        chrono::NaiveTime::parse_from_str(text.trim(), format)
            .ok()
            .map(|t| GtfsTime(t.num_seconds_from_midnight() as i64))
    }

    pub fn plus_days(self, days: i64) -> GtfsTime {
        GtfsTime(self.0 + days * 86_400)
    }

    pub fn plus_seconds(self, seconds: i64) -> GtfsTime {
        GtfsTime(self.0 + seconds)
    }
}

impl std::fmt::Display for GtfsTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total = self.0.max(0);
        write!(f, "{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Agency {
    pub agency_id: String,
    pub name: String,
    pub url: String,
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GtfsStop {
    pub stop_id: String,
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub route_id: String,
    pub agency_id: String,
    pub short_name: Option<String>,
    pub long_name: String,
    pub route_type: RouteType,
}

#[derive(Debug, Clone, Serialize)]
pub struct Trip {
    pub trip_id: String,
    pub route_id: String,
    pub service_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Calendar {
    pub service_id: String,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExceptionType {
    Added,
    Removed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDate {
    pub service_id: String,
    pub date: NaiveDate,
    pub exception_type: ExceptionType,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopTime {
    pub trip_id: String,
    pub stop_id: String,
    pub stop_sequence: u32,
    pub arrival_time: GtfsTime,
    pub departure_time: GtfsTime,
}

/// the in-memory GTFS model of §3: built once from one or more
/// `Timetable`s, then handed to a (not-in-scope) CSV/ZIP writer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GtfsFeed {
    pub agencies: IndexMap<String, Agency>,
    pub stops: IndexMap<String, GtfsStop>,
    pub routes: IndexMap<String, Route>,
    pub trips: IndexMap<String, Trip>,
    pub calendars: IndexMap<String, Calendar>,
    pub calendar_dates: Vec<CalendarDate>,
    pub stop_times: Vec<StopTime>,
}

impl GtfsFeed {
    pub fn empty() -> Self {
        Self::default()
    }

    /// §4.7 route aggregation: dedups by `(agency_id, short_name,
    /// long_name)`, returning the (possibly newly inserted) route's id.
    pub fn find_or_insert_route(
        &mut self,
        agency_id: &str,
        short_name: Option<&str>,
        long_name: &str,
        route_type: RouteType,
    ) -> String {
        if let Some(existing) = self.routes.values().find(|r| {
            r.agency_id == agency_id && r.short_name.as_deref() == short_name && r.long_name == long_name
        }) {
            return existing.route_id.clone();
        }
        let route_id = format!("route_{}", self.routes.len());
        self.routes.insert(
            route_id.clone(),
            Route {
                route_id: route_id.clone(),
                agency_id: agency_id.to_string(),
                short_name: short_name.map(str::to_string),
                long_name: long_name.to_string(),
                route_type,
            },
        );
        route_id
    }

    pub fn find_or_insert_stop(&mut self, stop_id: &str, name: &str) -> String {
        self.stops.entry(stop_id.to_string()).or_insert_with(|| GtfsStop {
            stop_id: stop_id.to_string(),
            name: name.to_string(),
            lat: None,
            lon: None,
        });
        stop_id.to_string()
    }

    /// §4.7: dedups calendars by weekday bitmask so every distinct
    /// service pattern gets exactly one `service_id`.
    pub fn find_or_insert_calendar(
        &mut self,
        weekdays: pdf2gtfs_core::config::DayBitmask,
        bounds: (NaiveDate, NaiveDate),
    ) -> String {
        let plain = weekdays & !pdf2gtfs_core::config::HOLIDAY_BIT;
        let service_id = format!("svc_{plain:07b}");
        self.calendars.entry(service_id.clone()).or_insert_with(|| Calendar {
            service_id: service_id.clone(),
            monday: plain & pdf2gtfs_core::config::MONDAY != 0,
            tuesday: plain & pdf2gtfs_core::config::TUESDAY != 0,
            wednesday: plain & pdf2gtfs_core::config::WEDNESDAY != 0,
            thursday: plain & pdf2gtfs_core::config::THURSDAY != 0,
            friday: plain & pdf2gtfs_core::config::FRIDAY != 0,
            saturday: plain & pdf2gtfs_core::config::SATURDAY != 0,
            sunday: plain & pdf2gtfs_core::config::SUNDAY != 0,
            start_date: bounds.0,
            end_date: bounds.1,
        });
        service_id
    }

    /// true if no trips were ever recorded — mirrors
    /// `bambam-gtfs::GtfsBundle::is_empty`'s "nothing to write" check.
    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_aggregation_dedups_by_key() {
        let mut feed = GtfsFeed::empty();
        let a = feed.find_or_insert_route("agency_1", Some("12"), "A-B", RouteType::Bus);
        let b = feed.find_or_insert_route("agency_1", Some("12"), "A-B", RouteType::Bus);
        assert_eq!(a, b);
        assert_eq!(feed.routes.len(), 1);
    }

    #[test]
    fn route_aggregation_distinguishes_by_long_name() {
        let mut feed = GtfsFeed::empty();
        let a = feed.find_or_insert_route("agency_1", Some("12"), "A-B", RouteType::Bus);
        let b = feed.find_or_insert_route("agency_1", Some("12"), "A-C", RouteType::Bus);
        assert_ne!(a, b);
        assert_eq!(feed.routes.len(), 2);
    }

    #[test]
    fn gtfs_time_formats_past_midnight() {
        let t = GtfsTime(24 * 3600 + 45 * 60);
        assert_eq!(t.to_string(), "24:45:00");
    }

    #[test]
    fn calendar_bitmask_dedups_and_decodes_days() {
        let mut feed = GtfsFeed::empty();
        let bounds = (
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
        );
        let id1 = feed.find_or_insert_calendar(pdf2gtfs_core::config::WEEKDAYS, bounds);
        let id2 = feed.find_or_insert_calendar(pdf2gtfs_core::config::WEEKDAYS, bounds);
        assert_eq!(id1, id2);
        let cal = &feed.calendars[&id1];
        assert!(cal.monday && cal.friday && !cal.saturday && !cal.sunday);
    }
}
