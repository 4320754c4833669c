//! Top-level §4.7 GTFS projection: wires route aggregation
//! ([`GtfsFeed::find_or_insert_route`]), repeat expansion and
//! service-day wraparound ([`crate::schedule`]), and holiday
//! projection into one in-memory [`GtfsFeed`] per timetable.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};
use gtfs_structures::RouteType;
use itertools::Itertools;
use pdf2gtfs_core::config::{EngineConfig, HOLIDAY_BIT};
use pdf2gtfs_core::timetable::Timetable;

use crate::holiday::{AnnotationExceptionResolver, HolidayCalendar, UserPrompt};
use crate::model::{Agency, Calendar, CalendarDate, ExceptionType, GtfsFeed, StopTime, Trip};
use crate::schedule::{apply_service_day_wraparound, flatten_entries};
use crate::GtfsError;

/// lowercases, replaces runs of non-alphanumerics with `_`, and trims
/// leading/trailing `_` — good enough for a stable GTFS `stop_id` from
/// a normalized stop name (no PII-sensitive collation requirements).
fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_sep = true;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    out.trim_end_matches('_').to_string()
}

fn runs_on_weekday(cal: &Calendar, date: NaiveDate) -> bool {
    match date.weekday() {
        Weekday::Mon => cal.monday,
        Weekday::Tue => cal.tuesday,
        Weekday::Wed => cal.wednesday,
        Weekday::Thu => cal.thursday,
        Weekday::Fri => cal.friday,
        Weekday::Sat => cal.saturday,
        Weekday::Sun => cal.sunday,
    }
}

pub struct GtfsProjector<'a> {
    config: &'a EngineConfig,
}

impl<'a> GtfsProjector<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        GtfsProjector { config }
    }

    /// projects one timetable into `feed`, under `agency`/`route_type`,
    /// with calendars bounded by `date_bounds`. `prompt` resolves
    /// annotation-exception dates (§6); `holidays`, if given, drives
    /// holiday calendar-date projection.
    pub fn project(
        &self,
        feed: &mut GtfsFeed,
        timetable: &Timetable,
        agency: &Agency,
        route_type: RouteType,
        date_bounds: (NaiveDate, NaiveDate),
        prompt: &dyn UserPrompt,
        holidays: Option<&dyn HolidayCalendar>,
    ) -> Result<(), GtfsError> {
        feed.agencies.entry(agency.agency_id.clone()).or_insert_with(|| agency.clone());

        let stop_ids: Vec<String> = timetable
            .stops
            .iter()
            .map(|s| {
                let id = slugify(&s.normalized_name);
                feed.find_or_insert_stop(&id, &s.original_text)
            })
            .collect();

        let first = timetable.stops.first().map(|s| s.normalized_name.as_str()).unwrap_or("");
        let last = timetable.stops.last().map(|s| s.normalized_name.as_str()).unwrap_or(first);
        let long_name = format!("{first}-{last}");

        let mut flattened = flatten_entries(timetable, self.config);
        apply_service_day_wraparound(&mut flattened);

        let mut service_includes_holiday: HashMap<String, bool> = HashMap::new();
        let mut service_annotations: HashMap<String, Vec<String>> = HashMap::new();

        for (i, entry) in flattened.iter().enumerate() {
            if entry.times.is_empty() {
                log::warn!("entry {i} has no parseable times; dropping its trip");
                continue;
            }
            let route_id = feed.find_or_insert_route(
                &agency.agency_id,
                entry.route_short_name.as_deref(),
                &long_name,
                route_type,
            );
            let service_id = feed.find_or_insert_calendar(entry.weekdays, date_bounds);
            service_includes_holiday
                .entry(service_id.clone())
                .and_modify(|b| *b |= entry.weekdays & HOLIDAY_BIT != 0)
                .or_insert(entry.weekdays & HOLIDAY_BIT != 0);
            service_annotations
                .entry(service_id.clone())
                .or_default()
                .extend(entry.annotations.iter().cloned());

            let trip_id = format!("trip_{route_id}_{i}");
            feed.trips.insert(
                trip_id.clone(),
                Trip {
                    trip_id: trip_id.clone(),
                    route_id,
                    service_id,
                },
            );

            let mut stop_indices: Vec<usize> = entry.times.keys().copied().collect();
            stop_indices.sort_unstable();
            for stop_idx in stop_indices {
                let Some(stop_id) = stop_ids.get(stop_idx) else {
                    continue;
                };
                let time = entry.times[&stop_idx];
                feed.stop_times.push(StopTime {
                    trip_id: trip_id.clone(),
                    stop_id: stop_id.clone(),
                    stop_sequence: stop_idx as u32 + 1,
                    arrival_time: time,
                    departure_time: time,
                });
            }
        }

        if let Some(holidays) = holidays {
            self.apply_holiday_projection(feed, &service_includes_holiday, holidays);
        }

        for (service_id, annotations) in service_annotations {
            let unique: Vec<String> = annotations.into_iter().sorted().dedup().collect();
            for (_annotation, kind, dates) in AnnotationExceptionResolver::resolve(&unique, prompt) {
                for date in dates {
                    feed.calendar_dates.push(CalendarDate {
                        service_id: service_id.clone(),
                        date,
                        exception_type: kind,
                    });
                }
            }
        }

        Ok(())
    }

    /// §4.7 holiday projection: a service that included the `"h"` day
    /// gets positive `CalendarDates` entries for every holiday in its
    /// range; a service that didn't, but whose weekday pattern would
    /// otherwise run that day, gets a negative (suspended) entry.
    fn apply_holiday_projection(
        &self,
        feed: &mut GtfsFeed,
        includes_holiday: &HashMap<String, bool>,
        holidays: &dyn HolidayCalendar,
    ) {
        let mut additions = Vec::new();
        for (service_id, cal) in &feed.calendars {
            let include = includes_holiday.get(service_id).copied().unwrap_or(false);
            let mut date = cal.start_date;
            loop {
                if date > cal.end_date {
                    break;
                }
                if holidays.is_holiday(date) {
                    if include {
                        additions.push(CalendarDate {
                            service_id: service_id.clone(),
                            date,
                            exception_type: ExceptionType::Added,
                        });
                    } else if runs_on_weekday(cal, date) {
                        additions.push(CalendarDate {
                            service_id: service_id.clone(),
                            date,
                            exception_type: ExceptionType::Removed,
                        });
                    }
                }
                date = match date.succ_opt() {
                    Some(d) => d,
                    None => break,
                };
            }
        }
        feed.calendar_dates.extend(additions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf2gtfs_core::config::{test_config, WEEKDAYS};
    use pdf2gtfs_core::timetable::{Entry, RepeatEntry, Stop, TimeEntry};

    fn agency() -> Agency {
        Agency {
            agency_id: "agency_1".to_string(),
            name: "Stadtwerke".to_string(),
            url: "https://example.test".to_string(),
            timezone: "Europe/Berlin".to_string(),
        }
    }

    fn stop(name: &str) -> Stop {
        Stop {
            normalized_name: name.to_string(),
            original_text: name.to_string(),
            is_connection: false,
        }
    }

    #[test]
    fn plain_table_projects_one_route_and_one_calendar() {
        let config = test_config();
        let projector = GtfsProjector::new(&config);
        let mut feed = GtfsFeed::empty();
        let timetable = Timetable {
            stops: vec![stop("Hauptbahnhof"), stop("Rathaus")],
            entries: vec![Entry::Regular(TimeEntry {
                weekdays: WEEKDAYS,
                annotations: vec![],
                route_short_name: None,
                times: HashMap::from([(0, "07:00".to_string()), (1, "07:20".to_string())]),
            })],
        };
        let bounds = (
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
        );
        projector
            .project(&mut feed, &timetable, &agency(), RouteType::Bus, bounds, &crate::holiday::NonInteractivePrompt, None)
            .unwrap();

        assert_eq!(feed.routes.len(), 1);
        assert_eq!(feed.calendars.len(), 1);
        assert_eq!(feed.trips.len(), 1);
        assert_eq!(feed.stop_times.len(), 2);
    }

    #[test]
    fn repeat_column_synthesizes_five_additional_trips() {
        let config = test_config();
        let projector = GtfsProjector::new(&config);
        let mut feed = GtfsFeed::empty();
        let anchor_a = TimeEntry {
            weekdays: WEEKDAYS,
            annotations: vec![],
            route_short_name: None,
            times: HashMap::from([(0, "07:00".to_string())]),
        };
        let anchor_b = TimeEntry {
            weekdays: WEEKDAYS,
            annotations: vec![],
            route_short_name: None,
            times: HashMap::from([(0, "09:30".to_string())]),
        };
        let timetable = Timetable {
            stops: vec![stop("Hauptbahnhof")],
            entries: vec![
                Entry::Regular(anchor_a),
                Entry::Repeat(RepeatEntry { intervals: vec![30], left: 0, right: 1 }),
                Entry::Regular(anchor_b),
            ],
        };
        let bounds = (
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
        );
        projector
            .project(&mut feed, &timetable, &agency(), RouteType::Bus, bounds, &crate::holiday::NonInteractivePrompt, None)
            .unwrap();
        assert_eq!(feed.trips.len(), 7);
    }

    #[test]
    fn slugify_collapses_punctuation_and_whitespace() {
        assert_eq!(slugify("Frankfurt - Hauptbahnhof"), "frankfurt_hauptbahnhof");
    }
}
