//! The read-only configuration record of spec §6.
//!
//! `EngineConfig` is passed explicitly to every function that needs it
//! (per §9's "global configuration becomes an immutable context value");
//! there are no hidden globals. Validation happens once, in
//! [`EngineConfig::try_new`], the way `original_source`'s
//! `custom_conf` property descriptors validate on assignment.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a repeat column's interval list is turned into concrete
/// departures at GTFS-projection time (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatStrategy {
    Mean,
    Cycle,
}

/// Which page(s) of the source PDF to process (§6 `pages`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelector {
    All,
    Pages(Vec<u32>),
}

impl PageSelector {
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelector::All => true,
            PageSelector::Pages(pages) => pages.contains(&page),
        }
    }
}

/// A weekday bitmask: bit `i` (0 = Monday ... 6 = Sunday) set means
/// service runs that day. A distinguished high bit (`HOLIDAY_BIT`)
/// tracks whether the source service pattern included the holiday
/// pseudo-day `"h"` (§4.7 holiday projection).
pub type DayBitmask = u8;
pub const HOLIDAY_BIT: u8 = 1 << 7;

const fn weekday_bit(idx: u8) -> u8 {
    1 << idx
}

pub const MONDAY: u8 = weekday_bit(0);
pub const TUESDAY: u8 = weekday_bit(1);
pub const WEDNESDAY: u8 = weekday_bit(2);
pub const THURSDAY: u8 = weekday_bit(3);
pub const FRIDAY: u8 = weekday_bit(4);
pub const SATURDAY: u8 = weekday_bit(5);
pub const SUNDAY: u8 = weekday_bit(6);
pub const WEEKDAYS: u8 = MONDAY | TUESDAY | WEDNESDAY | THURSDAY | FRIDAY;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("header_values entry '{0}' maps to an unknown day token '{1}' (expected 0-6 or 'h')")]
    InvalidHeaderDay(String, String),
    #[error("repeat_identifier entry must be exactly [prefix, suffix], got {0:?}")]
    InvalidRepeatIdentifier(Vec<String>),
    #[error("min_cell_overlap must be within [0, 1], got {0}")]
    InvalidOverlapFraction(f64),
    #[error("gtfs_date_bounds start {0} is after end {1}")]
    InvalidDateBounds(String, String),
    #[error("holiday_code country '{0}' is not a recognized ISO country code")]
    InvalidHolidayCountry(String),
}

/// The configuration record of spec §6, plus the `SPEC_FULL.md`
/// supplements (`negative_header_values`, `min_connection_count`,
/// `max_char_distance`, `min_cell_overlap`, `table_expansion_directions`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub time_format: String,
    pub header_values: HashMap<String, DayBitmask>,
    pub negative_header_values: Vec<String>,
    pub repeat_identifier: Vec<(String, String)>,
    pub repeat_strategy: RepeatStrategy,
    pub pages: PageSelector,
    pub max_row_distance: f64,
    pub min_row_count: usize,
    pub arrival_identifier: Vec<String>,
    pub departure_identifier: Vec<String>,
    pub route_identifier: Vec<String>,
    pub annot_identifier: Vec<String>,
    pub average_speed_kmh: f64,
    pub min_travel_distance_m: f64,
    pub average_travel_distance_offset_min: f64,
    pub missing_node_cost: u32,
    pub simple_travel_cost_calculation: bool,
    pub disable_close_node_check: bool,
    pub interpolate_missing_locations: bool,
    pub holiday_code: Option<(String, Option<String>)>,
    pub gtfs_date_bounds: Option<(String, String)>,
    pub name_abbreviations: HashMap<String, String>,
    pub allowed_stop_chars: Vec<char>,
    pub non_interactive: bool,
    pub min_connection_count: usize,
    pub max_char_distance: f64,
    pub min_cell_overlap: f64,
    pub table_expansion_directions: Vec<crate::geometry::Direction>,
}

impl EngineConfig {
    /// validates header/repeat/overlap/date-bounds invariants the way
    /// `original_source`'s property validators do on assignment,
    /// collapsed into one constructor-time check (§7 "invalid
    /// configuration value: fatal at startup").
    pub fn try_new(raw: EngineConfig) -> Result<EngineConfig, ConfigError> {
        if !(0.0..=1.0).contains(&raw.min_cell_overlap) {
            return Err(ConfigError::InvalidOverlapFraction(raw.min_cell_overlap));
        }
        for (prefix, suffix) in &raw.repeat_identifier {
            if prefix.is_empty() && suffix.is_empty() {
                return Err(ConfigError::InvalidRepeatIdentifier(vec![
                    prefix.clone(),
                    suffix.clone(),
                ]));
            }
        }
        if let Some((start, end)) = &raw.gtfs_date_bounds {
            if start > end {
                return Err(ConfigError::InvalidDateBounds(start.clone(), end.clone()));
            }
        }
        Ok(raw)
    }

    pub fn is_negative_header(&self, text: &str) -> bool {
        self.negative_header_values
            .iter()
            .any(|v| v.eq_ignore_ascii_case(text))
    }
}

/// a reasonable fixture config for unit/integration tests, in this
/// crate and downstream ones alike (a `#[cfg(test)]` gate here would
/// not survive being imported across the crate boundary).
pub fn test_config() -> EngineConfig {
    let mut header_values = HashMap::new();
    header_values.insert("Montag-Freitag".to_string(), WEEKDAYS);
    header_values.insert("Samstag".to_string(), SATURDAY);
    header_values.insert("Sonntag".to_string(), SUNDAY);
    EngineConfig {
        time_format: "%H:%M".to_string(),
        header_values,
        negative_header_values: vec![],
        repeat_identifier: vec![("alle".to_string(), "Min.".to_string())],
        repeat_strategy: RepeatStrategy::Mean,
        pages: PageSelector::All,
        max_row_distance: 20.0,
        min_row_count: 2,
        arrival_identifier: vec!["an".to_string()],
        departure_identifier: vec!["ab".to_string()],
        route_identifier: vec!["Linie".to_string()],
        annot_identifier: vec![],
        average_speed_kmh: 20.0,
        min_travel_distance_m: 50.0,
        average_travel_distance_offset_min: 2.0,
        missing_node_cost: 1000,
        simple_travel_cost_calculation: false,
        disable_close_node_check: false,
        interpolate_missing_locations: true,
        holiday_code: None,
        gtfs_date_bounds: None,
        name_abbreviations: HashMap::new(),
        allowed_stop_chars: vec!['-', '.', '\''],
        non_interactive: true,
        min_connection_count: 2,
        max_char_distance: 2.0,
        min_cell_overlap: 0.66,
        table_expansion_directions: crate::geometry::ALL_DIRECTIONS.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_overlap_fraction_out_of_range() {
        let mut cfg = test_config();
        cfg.min_cell_overlap = 1.5;
        assert!(matches!(
            EngineConfig::try_new(cfg),
            Err(ConfigError::InvalidOverlapFraction(_))
        ));
    }

    #[test]
    fn rejects_inverted_date_bounds() {
        let mut cfg = test_config();
        cfg.gtfs_date_bounds = Some(("20240601".to_string(), "20240101".to_string()));
        assert!(matches!(
            EngineConfig::try_new(cfg),
            Err(ConfigError::InvalidDateBounds(_, _))
        ));
    }

    #[test]
    fn accepts_well_formed_config() {
        assert!(EngineConfig::try_new(test_config()).is_ok());
    }
}
