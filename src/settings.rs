//! Code for loading program settings.
//!
//! Settings live in an optional `settings.toml` next to the analysis inputs; they
//! control the program (logging, output handling), not the analysis itself — engine
//! policy lives in `analysis.toml` (see [`crate::config`]).
use crate::input::read_toml;
use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Program settings from the settings file
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct Settings {
    /// The program log level; `GEOLENS_LOG_LEVEL` takes precedence
    #[serde(default)]
    pub log_level: Option<String>,
    /// Whether to overwrite existing output files
    #[serde(default)]
    pub overwrite: bool,
}

impl Settings {
    /// Read the settings file from the analysis directory.
    ///
    /// If the file is not present, default values for settings will be used
    pub fn from_path(analysis_dir: &Path) -> Result<Settings> {
        let file_path = analysis_dir.join(SETTINGS_FILE_NAME);
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        read_toml(&file_path)
    }
}
