//! Settings for the `gpib-conf` tool itself, loaded with Figment.
//!
//! Settings are layered:
//! 1. built-in defaults
//! 2. a TOML file (`config/gpib_conf.toml` unless another path is given)
//! 3. environment variables prefixed with `GPIBCONF_`
//!
//! A missing settings file is not an error; the defaults apply. Unknown keys
//! in the file, or unknown `GPIBCONF_` variables, are rejected.
//!
//! # Example
//! ```no_run
//! use gpib_conf::settings::Settings;
//!
//! // GPIBCONF_LOG_LEVEL=debug overrides the file
//! let settings = Settings::load()?;
//! println!("bus config at {}", settings.gpib_conf.display());
//! # Ok::<(), gpib_conf::error::GpibConfError>(())
//! ```

use crate::error::{ConfResult, GpibConfError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the settings file.
pub const DEFAULT_SETTINGS_PATH: &str = "config/gpib_conf.toml";

/// Prefix of environment variables overriding settings.
pub const ENV_PREFIX: &str = "GPIBCONF_";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty-printed format with colors (for development)
    Pretty,
    /// Compact format without colors (for production)
    Compact,
    /// JSON format for structured logging (for log aggregation)
    Json,
}

/// Tool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Path of the GPIB bus configuration file
    #[serde(default = "default_gpib_conf")]
    pub gpib_conf: PathBuf,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

// Default value functions
fn default_gpib_conf() -> PathBuf {
    PathBuf::from("/etc/gpib.conf")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gpib_conf: default_gpib_conf(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Settings {
    /// Load settings from the default file and environment variables.
    pub fn load() -> ConfResult<Self> {
        Self::load_from(DEFAULT_SETTINGS_PATH)
    }

    /// Load settings from a specific file path and environment variables.
    pub fn load_from<P: AsRef<Path>>(path: P) -> ConfResult<Self> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings after loading.
    pub fn validate(&self) -> ConfResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(GpibConfError::Settings(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }
}
