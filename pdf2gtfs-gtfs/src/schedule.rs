//! Repeat-column expansion and service-day wraparound (§4.7), grounded
//! on `bambam-gtfs/src/model/traversal/transit/schedule.rs`'s
//! `Departure`/`TimeDelta` clamp-and-shift idiom, adapted from a single
//! `Departure` value to a whole entry's per-stop time map.

use std::collections::HashMap;

use pdf2gtfs_core::config::{DayBitmask, EngineConfig};
use pdf2gtfs_core::timetable::{Entry, Timetable};

use crate::model::GtfsTime;

/// a [`pdf2gtfs_core::timetable::TimeEntry`] with its per-stop times
/// already parsed into [`GtfsTime`]s — the unit repeat expansion and
/// service-day wraparound both operate on.
#[derive(Debug, Clone)]
pub struct ExpandedEntry {
    pub weekdays: DayBitmask,
    pub annotations: Vec<String>,
    pub route_short_name: Option<String>,
    pub times: HashMap<usize, GtfsTime>,
}

fn parse_entry(
    weekdays: DayBitmask,
    annotations: &[String],
    route_short_name: &Option<String>,
    raw_times: &HashMap<usize, String>,
    config: &EngineConfig,
) -> ExpandedEntry {
    let times = raw_times
        .iter()
        .filter_map(|(&stop_idx, text)| GtfsTime::parse(text, &config.time_format).map(|t| (stop_idx, t)))
        .collect();
    ExpandedEntry {
        weekdays,
        annotations: annotations.to_vec(),
        route_short_name: route_short_name.clone(),
        times,
    }
}

/// §4.7 repeat expansion: generates `L + kΔ`, cycling through
/// `intervals`, until the synthesized start time reaches `right`'s.
/// Each synthesized entry clones `left`'s stop set, shifted uniformly.
fn expand_repeat(left: &ExpandedEntry, right: &ExpandedEntry, intervals: &[u32]) -> Vec<ExpandedEntry> {
    if intervals.is_empty() {
        return Vec::new();
    }
    let Some(anchor) = left.times.keys().filter(|k| right.times.contains_key(k)).min().copied() else {
        return Vec::new();
    };
    let left_start = left.times[&anchor];
    let right_start = right.times[&anchor];

    let mut generated = Vec::new();
    let mut cumulative_seconds = 0i64;
    let mut cycle = 0usize;
    loop {
        let delta_min = intervals[cycle % intervals.len()];
        cumulative_seconds += i64::from(delta_min) * 60;
        cycle += 1;
        let candidate_start = left_start.plus_seconds(cumulative_seconds);
        if candidate_start > right_start {
            break;
        }
        let times = left
            .times
            .iter()
            .map(|(&stop_idx, &t)| (stop_idx, t.plus_seconds(cumulative_seconds)))
            .collect();
        generated.push(ExpandedEntry {
            weekdays: left.weekdays,
            annotations: left.annotations.clone(),
            route_short_name: left.route_short_name.clone(),
            times,
        });
    }
    generated
}

/// flattens a timetable's entries into concrete, time-parsed entries,
/// substituting each repeat entry with its generated trips in place
/// (the two flanking anchors remain as their own `Regular` entries
/// elsewhere in the sequence).
pub fn flatten_entries(timetable: &Timetable, config: &EngineConfig) -> Vec<ExpandedEntry> {
    let parsed: Vec<Option<ExpandedEntry>> = timetable
        .entries
        .iter()
        .map(|e| match e {
            Entry::Regular(te) => Some(parse_entry(te.weekdays, &te.annotations, &te.route_short_name, &te.times, config)),
            Entry::Repeat(_) => None,
        })
        .collect();

    let mut flattened = Vec::new();
    for (i, entry) in timetable.entries.iter().enumerate() {
        match entry {
            Entry::Regular(_) => {
                if let Some(e) = &parsed[i] {
                    flattened.push(e.clone());
                }
            }
            Entry::Repeat(re) => {
                let left = parsed.get(re.left).and_then(|o| o.as_ref());
                let right = parsed.get(re.right).and_then(|o| o.as_ref());
                if let (Some(left), Some(right)) = (left, right) {
                    flattened.extend(expand_repeat(left, right, &re.intervals));
                }
            }
        }
    }
    flattened
}

/// §4.7 service-day handling: within each weekday-bitmask service
/// group, whenever an entry's (unshifted) start time is earlier than
/// the previous entry's, the service-day offset for that group
/// increments and every subsequent entry's times get 24h added per
/// increment, until the next wrap.
pub fn apply_service_day_wraparound(entries: &mut [ExpandedEntry]) {
    let mut previous_raw_start: HashMap<DayBitmask, GtfsTime> = HashMap::new();
    let mut offset_days: HashMap<DayBitmask, i64> = HashMap::new();

    for entry in entries.iter_mut() {
        let Some(&anchor) = entry.times.keys().min() else {
            continue;
        };
        let raw_start = entry.times[&anchor];
        let offset = offset_days.entry(entry.weekdays).or_insert(0);
        if let Some(&prev) = previous_raw_start.get(&entry.weekdays) {
            if raw_start < prev {
                *offset += 1;
            }
        }
        let offset = *offset;
        previous_raw_start.insert(entry.weekdays, raw_start);
        if offset > 0 {
            for t in entry.times.values_mut() {
                *t = t.plus_days(offset);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf2gtfs_core::config::test_config;

    fn entry(stop_times: &[(usize, &str)], weekdays: DayBitmask) -> ExpandedEntry {
        let config = test_config();
        let raw: HashMap<usize, String> = stop_times.iter().map(|&(i, t)| (i, t.to_string())).collect();
        parse_entry(weekdays, &[], &None, &raw, &config)
    }

    #[test]
    fn repeat_expansion_generates_anchors_plus_five() {
        let left = entry(&[(0, "07:00")], 1);
        let right = entry(&[(0, "09:30")], 1);
        let generated = expand_repeat(&left, &right, &[30]);
        assert_eq!(generated.len(), 5);
        let starts: Vec<i64> = generated.iter().map(|e| e.times[&0].0).collect();
        assert_eq!(starts, vec![7 * 3600 + 1800, 8 * 3600, 8 * 3600 + 1800, 9 * 3600, 9 * 3600 + 1800]);
    }

    #[test]
    fn overnight_entry_gets_24h_added_once() {
        let mut entries = vec![entry(&[(0, "23:15")], 1), entry(&[(0, "00:45")], 1)];
        apply_service_day_wraparound(&mut entries);
        assert_eq!(entries[0].times[&0].0, 23 * 3600 + 900);
        assert_eq!(entries[1].times[&0].0, 24 * 3600 + 2700);
    }

    #[test]
    fn distinct_services_wrap_independently() {
        let mut entries = vec![
            entry(&[(0, "23:00")], 1),
            entry(&[(0, "06:00")], 2),
            entry(&[(0, "00:30")], 1),
        ];
        apply_service_day_wraparound(&mut entries);
        assert_eq!(entries[1].times[&0].0, 6 * 3600);
        assert_eq!(entries[2].times[&0].0, 24 * 3600 + 1800);
    }
}
