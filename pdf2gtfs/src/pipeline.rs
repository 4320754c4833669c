//! Wires the three engine crates into one run: glyphs -> cells ->
//! tables -> timetables -> GTFS projection -> stop-location resolution
//! -> output. Mirrors the way `bambam/src/main.rs` keeps `main` itself
//! thin and pushes the actual run into a `run`-style function that
//! returns a `Result` for the caller to match on.

use std::collections::HashMap;
use std::fs;

use chrono::NaiveDate;
use gtfs_structures::RouteType;
use pdf2gtfs_core::config::EngineConfig;
use pdf2gtfs_core::discovery::discover_tables;
use pdf2gtfs_core::glyph::group_glyphs_into_cells;
use pdf2gtfs_core::timetable::project_timetable;
use pdf2gtfs_gtfs::holiday::{FixedHolidayCalendar, HolidayCalendar, NonInteractivePrompt};
use pdf2gtfs_gtfs::model::{Agency, GtfsFeed};
use pdf2gtfs_gtfs::GtfsProjector;
use pdf2gtfs_location::locate_stops;

use crate::cli::CliArgs;
use crate::collaborators::{parse_route_type, FileOsmSnapshotSource, GlyphSource, JsonGlyphSource, OsmSnapshotSource};
use crate::error::AppError;
use crate::settings::{self, AppSettings};

/// mirrors `pdf2gtfs_gtfs::projection`'s private `slugify` — not
/// exported across the crate boundary, so the binary needs its own copy
/// to recover the `stop_id` a given stop name was projected under.
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

/// parses `gtfs_date_bounds` as `YYYYMMDD`, or falls back to a wide
/// default window when the agency didn't supply one.
fn parse_date_bounds(config: &EngineConfig) -> Result<(NaiveDate, NaiveDate), AppError> {
    let Some((start, end)) = &config.gtfs_date_bounds else {
        let lo = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let hi = NaiveDate::from_ymd_opt(2099, 12, 31).unwrap();
        return Ok((lo, hi));
    };
    let parse = |s: &str| {
        NaiveDate::parse_from_str(s, "%Y%m%d")
            .map_err(|_| pdf2gtfs_gtfs::GtfsError::InvalidDateBounds(s.to_string()))
    };
    Ok((parse(start)?, parse(end)?))
}

/// one GTFS projection's worth of stop identity, carried alongside the
/// trip ids it contributed to `feed` so location resolution can be run
/// per distinct stop sequence (§4.9's "route" in the location sense)
/// rather than assuming every trip shares one pattern.
struct Pattern {
    stop_sequence: Vec<(String, String)>,
    trip_ids: Vec<String>,
}

/// rounds to five decimal places (~1.1m at the equator) so that
/// near-identical resolutions from different patterns land in the same
/// majority-vote bucket without requiring bit-for-bit agreement.
fn quantize(coord: (f64, f64)) -> (i64, i64) {
    ((coord.0 * 1e5).round() as i64, (coord.1 * 1e5).round() as i64)
}

/// combines every pattern's opinion about a stop's location into one
/// coordinate: the most common quantized bucket, averaged within that
/// bucket. A simplified sibling of `pdf2gtfs_location::algorithm::select_by_majority`,
/// which only works across same-length, same-indexed routes — this
/// instead pools observations keyed by `stop_id`, which tolerates
/// patterns of different lengths sharing a handful of stops.
fn combine_by_majority(observations: &[(f64, f64)]) -> (f64, f64) {
    let mut buckets: HashMap<(i64, i64), Vec<(f64, f64)>> = HashMap::new();
    for &coord in observations {
        buckets.entry(quantize(coord)).or_default().push(coord);
    }
    let winner = buckets
        .values()
        .max_by_key(|v| v.len())
        .expect("observations is non-empty");
    let n = winner.len() as f64;
    let (sum_lat, sum_lon) = winner.iter().fold((0.0, 0.0), |(a, b), &(lat, lon)| (a + lat, b + lon));
    (sum_lat / n, sum_lon / n)
}

/// runs the full pipeline described at module level and writes the
/// resulting feed to `args.output`, returning the assembled
/// [`GtfsFeed`] for callers (e.g. tests, or `main`'s log line) that
/// want to inspect what was written.
pub fn run(args: &CliArgs) -> Result<GtfsFeed, AppError> {
    let settings: AppSettings = settings::load(&args.config)?;
    let glyph_source = JsonGlyphSource::read(&args.glyphs)?;
    let osm_source = FileOsmSnapshotSource { path: args.osm_snapshot.clone() };

    let route_type = parse_route_type(&settings.route_type)?;
    let agency = Agency {
        agency_id: settings.agency_id.clone(),
        name: settings.agency_name.clone(),
        url: settings.agency_url.clone(),
        timezone: settings.agency_timezone.clone(),
    };
    let date_bounds = parse_date_bounds(&settings.engine)?;
    let holidays: Option<FixedHolidayCalendar> = settings
        .engine
        .holiday_code
        .as_ref()
        .and_then(|(country, _)| FixedHolidayCalendar::for_country_code(country));
    let prompt = NonInteractivePrompt;
    let projector = GtfsProjector::new(&settings.engine);

    let mut feed = GtfsFeed::empty();
    let mut patterns: Vec<Pattern> = Vec::new();

    for page in 1..=glyph_source.page_count() as u32 {
        if !settings.engine.pages.includes(page) {
            continue;
        }
        let Some(glyphs) = glyph_source.page(page)? else {
            return Err(AppError::InvalidPagesRequested(page));
        };

        let grouped = group_glyphs_into_cells(&glyphs, &settings.engine);
        let tables = discover_tables(&grouped.data_cells, &grouped.other_cells, &settings.engine)?;

        for table in &tables {
            let timetable = project_timetable(table, &settings.engine);
            if timetable.stops.is_empty() {
                continue;
            }

            let trips_before: Vec<String> = feed.trips.keys().cloned().collect();
            projector.project(
                &mut feed,
                &timetable,
                &agency,
                route_type,
                date_bounds,
                &prompt,
                holidays.as_ref().map(|h| h as &dyn HolidayCalendar),
            )?;
            let trip_ids: Vec<String> =
                feed.trips.keys().filter(|id| !trips_before.contains(id)).cloned().collect();
            if trip_ids.is_empty() {
                continue;
            }

            let stop_sequence: Vec<(String, String)> = timetable
                .stops
                .iter()
                .map(|s| (slugify(&s.normalized_name), s.original_text.clone()))
                .collect();
            patterns.push(Pattern { stop_sequence, trip_ids });
        }
    }

    resolve_locations(&mut feed, &patterns, &osm_source, route_type, &settings.engine)?;
    write_feed(&feed, &args.output, settings.engine.non_interactive)?;
    Ok(feed)
}

/// §4.8/§4.9 over every distinct pattern found during projection,
/// combining results for stops shared between patterns by majority
/// vote (see [`combine_by_majority`]).
fn resolve_locations(
    feed: &mut GtfsFeed,
    patterns: &[Pattern],
    osm_source: &dyn OsmSnapshotSource,
    route_type: RouteType,
    config: &EngineConfig,
) -> Result<(), AppError> {
    if patterns.is_empty() {
        return Ok(());
    }
    let snapshot = osm_source.read()?;

    let mut observations: HashMap<String, Vec<(f64, f64)>> = HashMap::new();
    for pattern in patterns {
        let locations = locate_stops(
            &pattern.stop_sequence,
            feed,
            &pattern.trip_ids,
            &snapshot,
            route_type,
            config,
        )?;
        for ((stop_id, _), location) in pattern.stop_sequence.iter().zip(&locations) {
            if let Some(coord) = location {
                observations.entry(stop_id.clone()).or_default().push(*coord);
            }
        }
    }

    for (stop_id, coords) in observations {
        let (lat, lon) = combine_by_majority(&coords);
        if let Some(stop) = feed.stops.get_mut(&stop_id) {
            stop.lat = Some(lat);
            stop.lon = Some(lon);
        }
    }
    Ok(())
}

/// writes `feed` to `output_path` as pretty JSON, standing in for the
/// out-of-scope CSV+ZIP GTFS writer (§1) — there is no `zip` crate in
/// this workspace's dependency set, and fabricating one is not an
/// option, so the binary's downstream artifact is this single JSON
/// document rather than a `.zip` feed. Enforces §6's exit-code-12 rule:
/// refuses to overwrite an existing file when `non_interactive` is set.
pub fn write_feed(feed: &GtfsFeed, output_path: &std::path::Path, non_interactive: bool) -> Result<(), AppError> {
    if non_interactive && output_path.exists() {
        return Err(AppError::OutputAlreadyExists(output_path.to_path_buf()));
    }
    let json = serde_json::to_string_pretty(feed)?;
    fs::write(output_path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_buckets_near_identical_coordinates_together() {
        assert_eq!(quantize((48.000001, 7.850001)), quantize((48.0, 7.85)));
    }

    #[test]
    fn combine_by_majority_prefers_the_larger_cluster() {
        let observations = vec![(48.0, 7.85), (48.0, 7.85), (52.5, 13.4)];
        let (lat, lon) = combine_by_majority(&observations);
        assert!((lat - 48.0).abs() < 1e-6);
        assert!((lon - 7.85).abs() < 1e-6);
    }

    #[test]
    fn default_date_bounds_are_wide_when_unset() {
        let config = pdf2gtfs_core::config::test_config();
        let (lo, hi) = parse_date_bounds(&config).unwrap();
        assert!(lo.to_string().starts_with("2000"));
        assert!(hi.to_string().starts_with("2099"));
    }

    #[test]
    fn parses_well_formed_date_bounds() {
        let mut config = pdf2gtfs_core::config::test_config();
        config.gtfs_date_bounds = Some(("20260101".to_string(), "20261231".to_string()));
        let (lo, hi) = parse_date_bounds(&config).unwrap();
        assert_eq!(lo, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(hi, NaiveDate::from_ymd_opt(2026, 12, 31).unwrap());
    }

    #[test]
    fn rejects_malformed_date_bounds() {
        let mut config = pdf2gtfs_core::config::test_config();
        config.gtfs_date_bounds = Some(("2026-01-01".to_string(), "20261231".to_string()));
        assert!(parse_date_bounds(&config).is_err());
    }

    #[test]
    fn slugify_matches_the_gtfs_crate_algorithm() {
        assert_eq!(slugify("Hauptbahnhof Nord"), "hauptbahnhof_nord");
        assert_eq!(slugify("  Rathaus!! "), "rathaus");
    }

    #[test]
    fn write_feed_refuses_to_overwrite_when_non_interactive() {
        let path = std::env::temp_dir().join(format!("pdf2gtfs_feed_test_{}.json", std::process::id()));
        std::fs::write(&path, "{}").unwrap();
        let feed = GtfsFeed::empty();
        let result = write_feed(&feed, &path, true);
        assert!(matches!(result, Err(AppError::OutputAlreadyExists(_))));
        let _ = std::fs::remove_file(&path);
    }
}
