//! End-to-end scenario 1 of §8: a plain table with no repeats, driven
//! through the full pipeline (typed `Table` -> `Timetable` -> GTFS),
//! the way `bambam/src/main.rs`'s `#[cfg(test)] mod test` end-to-end
//! test drives a whole query through `CompassApp`.

use chrono::NaiveDate;
use gtfs_structures::RouteType;
use pdf2gtfs_core::config::test_config;
use pdf2gtfs_core::geometry::BBox;
use pdf2gtfs_core::table::{Cell, Table};
use pdf2gtfs_core::timetable::project_timetable;
use pdf2gtfs_core::typing;
use pdf2gtfs_gtfs::holiday::NonInteractivePrompt;
use pdf2gtfs_gtfs::model::{Agency, GtfsFeed};
use pdf2gtfs_gtfs::GtfsProjector;

const ROW_HEIGHT: f64 = 12.0;
const STOP_COLUMN_WIDTH: f64 = 80.0;
const DATA_COLUMN_WIDTH: f64 = 30.0;

fn cell(col: usize, row: usize, text: &str) -> Cell {
    let x0 = if col == 0 { 0.0 } else { STOP_COLUMN_WIDTH + (col - 1) as f64 * DATA_COLUMN_WIDTH };
    let width = if col == 0 { STOP_COLUMN_WIDTH } else { DATA_COLUMN_WIDTH };
    let y0 = row as f64 * ROW_HEIGHT;
    Cell::new_text(text.to_string(), BBox::new(x0, y0, x0 + width, y0 + ROW_HEIGHT), None, Some(8.0))
}

/// builds a 22-stop x 20-column timetable page with a single
/// "Montag-Freitag" header repeated over every data column.
fn plain_table(stops: usize, columns: usize) -> Table {
    let mut rows = Vec::with_capacity(stops + 1);

    let mut header = vec![Cell::empty()];
    for c in 0..columns {
        header.push(cell(c + 1, 0, "Montag-Freitag"));
    }
    rows.push(header);

    for r in 0..stops {
        let mut row = vec![cell(0, r + 1, &format!("Stop {}", r + 1))];
        for c in 0..columns {
            let start_minute = 360 + c * 10;
            let minute = start_minute + r;
            row.push(cell(c + 1, r + 1, &format!("{:02}:{:02}", minute / 60, minute % 60)));
        }
        rows.push(row);
    }

    Table::from_rows(rows).expect("hand-built grid is a valid table")
}

#[test]
fn plain_table_no_repeats_projects_to_one_route_and_one_calendar() {
    let config = test_config();
    let stops = 22;
    let columns = 20;

    let mut table = plain_table(stops, columns);
    typing::infer_types(&mut table, &config);
    let timetable = project_timetable(&table, &config);

    assert_eq!(timetable.stops.len(), stops);
    assert_eq!(timetable.entries.len(), columns);

    let agency = Agency {
        agency_id: "agency_1".to_string(),
        name: "Stadtwerke".to_string(),
        url: "https://example.test".to_string(),
        timezone: "Europe/Berlin".to_string(),
    };
    let bounds = (
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
    );
    let mut feed = GtfsFeed::empty();
    GtfsProjector::new(&config)
        .project(&mut feed, &timetable, &agency, RouteType::Bus, bounds, &NonInteractivePrompt, None)
        .expect("projection succeeds on a well-formed timetable");

    assert_eq!(feed.stops.len(), stops);
    assert_eq!(feed.trips.len(), columns);
    assert_eq!(feed.routes.len(), 1);
    assert_eq!(feed.calendars.len(), 1);

    let calendar = feed.calendars.values().next().unwrap();
    assert!(calendar.monday && calendar.tuesday && calendar.wednesday && calendar.thursday && calendar.friday);
    assert!(!calendar.saturday && !calendar.sunday);
}
