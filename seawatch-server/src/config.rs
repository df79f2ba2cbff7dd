//! Configuration file handling.
//!
//! The configuration is a JSON file, by default `config.json` in the
//! platform config directory (`~/.config/seawatch/` on Linux). Every field
//! is optional; missing fields take their defaults. Command line options
//! override the file.
//!
//! ```json
//! {
//!   "selfContext": "vessels.urn:mrn:imo:mmsi:244123456",
//!   "tracker": { "pruneAgeMs": 600000, "cpaThreshold": 926.0 }
//! }
//! ```

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use seawatch_core::TrackerSettings;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::Cli;

const CONFIG_FILE: &str = "config.json";

/// Errors loading the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Platform directories for this application
pub fn get_project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "seawatch", "seawatch")
}

/// Default location of the configuration file
pub fn default_config_path() -> Option<PathBuf> {
    get_project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Complete host configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// SignalK context of own ship, e.g. `vessels.urn:mrn:imo:mmsi:244123456`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_context: Option<String>,
    pub tracker: TrackerSettings,
}

impl Config {
    /// Read a configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Load the configuration
    ///
    /// An explicitly given file must exist. Without one, the default location
    /// is tried and defaults are used when nothing is there.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            info!("Loading configuration from {}", path.display());
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)
            }
            Some(path) => {
                debug!("No configuration at {}, using defaults", path.display());
                Ok(Config::default())
            }
            None => {
                debug!("No home directory, using default configuration");
                Ok(Config::default())
            }
        }
    }

    /// Apply command line overrides
    pub fn apply_cli(&mut self, args: &Cli) {
        if let Some(interval) = args.interval_ms {
            self.tracker.update_interval_ms = interval;
        }
        if let Some(minutes) = args.prune_minutes {
            self.tracker.prune_age_ms = (minutes.max(0.0) * 60_000.0).round() as u64;
        }
        if let Some(context) = &args.self_context {
            self.self_context = Some(context.clone());
        }
    }
}
