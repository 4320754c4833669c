//! Configuration loading: layers a TOML file with `PDF2GTFS__`-prefixed
//! environment overrides via the `config` crate, the way
//! `bambam-omf/src/app/omf_app.rs` builds its `Config` from a single
//! `File` source before pulling typed values back out of it.
//!
//! Named `settings` rather than `config` to avoid shadowing the
//! `config` crate inside its own loading module.

use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use pdf2gtfs_core::config::EngineConfig;

use crate::error::AppError;

/// the binary-only settings layered on top of the library's
/// [`EngineConfig`]: agency identity and the GTFS route type, neither
/// of which the tabular-reconstruction engine itself needs.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(flatten)]
    pub engine: EngineConfig,
    pub agency_id: String,
    pub agency_name: String,
    pub agency_url: String,
    pub agency_timezone: String,
    pub route_type: String,
}

/// loads and validates settings from `config_file`, with environment
/// variables of the form `PDF2GTFS__ENGINE__MIN_ROW_COUNT=3` overriding
/// individual keys (`__` is the `config` crate's default nested-key
/// separator).
pub fn load(config_file: &Path) -> Result<AppSettings, AppError> {
    let source = Config::builder()
        .add_source(File::from(config_file))
        .add_source(Environment::with_prefix("PDF2GTFS").separator("__"))
        .build()
        .map_err(|e| AppError::Settings(config_file.display().to_string(), e.to_string()))?;

    let raw: AppSettings = source
        .try_deserialize()
        .map_err(|e| AppError::Settings(config_file.display().to_string(), e.to_string()))?;

    let engine = EngineConfig::try_new(raw.engine)?;
    Ok(AppSettings { engine, ..raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_settings_from_a_toml_file() {
        let mut file = tempfile_with_toml();
        writeln!(
            file,
            r#"
            time_format = "%H:%M"
            header_values = {{ "Montag-Freitag" = 31 }}
            negative_header_values = []
            repeat_identifier = [["alle", "Min."]]
            repeat_strategy = "Mean"
            pages = "All"
            max_row_distance = 20.0
            min_row_count = 2
            arrival_identifier = ["an"]
            departure_identifier = ["ab"]
            route_identifier = ["Linie"]
            annot_identifier = []
            average_speed_kmh = 20.0
            min_travel_distance_m = 50.0
            average_travel_distance_offset_min = 2.0
            missing_node_cost = 1000
            simple_travel_cost_calculation = false
            disable_close_node_check = false
            interpolate_missing_locations = true
            name_abbreviations = {{}}
            allowed_stop_chars = ["-", ".", "'"]
            non_interactive = true
            min_connection_count = 2
            max_char_distance = 2.0
            min_cell_overlap = 0.66
            table_expansion_directions = ["North", "South", "East", "West"]
            agency_id = "agency_1"
            agency_name = "Stadtwerke"
            agency_url = "https://example.test"
            agency_timezone = "Europe/Berlin"
            route_type = "Bus"
            "#
        )
        .unwrap();
        let settings = load(file.path()).unwrap();
        assert_eq!(settings.agency_id, "agency_1");
        assert_eq!(settings.engine.min_row_count, 2);
    }

    fn tempfile_with_toml() -> named_temp_file::NamedTempFile {
        named_temp_file::NamedTempFile::new()
    }

    /// a tiny hand-rolled stand-in for the `tempfile` crate (not part of
    /// this workspace's dependency set): writes to a fixed path under
    /// `std::env::temp_dir()` and removes it on drop.
    mod named_temp_file {
        use std::fs::File;
        use std::io::{self, Write};
        use std::path::{Path, PathBuf};

        pub struct NamedTempFile {
            path: PathBuf,
            file: File,
        }

        impl NamedTempFile {
            pub fn new() -> Self {
                let path = std::env::temp_dir().join(format!(
                    "pdf2gtfs_settings_test_{}.toml",
                    std::process::id()
                ));
                let file = File::create(&path).expect("create temp settings file");
                NamedTempFile { path, file }
            }

            pub fn path(&self) -> &Path {
                &self.path
            }
        }

        impl Write for NamedTempFile {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.file.write(buf)
            }
            fn flush(&mut self) -> io::Result<()> {
                self.file.flush()
            }
        }

        impl Drop for NamedTempFile {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.path);
            }
        }
    }
}
