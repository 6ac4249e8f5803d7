//! # gpib_conf
//!
//! Loader, validator and writer for GPIB (IEEE-488) bus configuration files in
//! the `gpib.conf` block syntax, plus the measurement routine that drives the
//! configured sourcemeter.
//!
//! ## Crate Structure
//!
//! - **`config`**: The `GpibConfig` model (`InterfaceConfig`, `DeviceConfig`,
//!   `Timeout`), its lexer, parser and writer, and semantic validation.
//! - **`error`**: The `GpibConfError` enum shared by the whole crate.
//! - **`validation`**: Small value checks (address ranges, non-empty strings).
//! - **`settings`**: Layered settings for the `gpib-conf` tool (TOML + environment).
//! - **`logging`**: `tracing` subscriber initialization.
//! - **`hardware`**: The `SourceMeter` capability trait and a simulated solar cell.
//! - **`mppt`**: Maximum power point tracking on top of `SourceMeter`.

pub mod config;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod mppt;
pub mod settings;
pub mod validation;

pub use config::{DeviceConfig, GpibConfig, InterfaceConfig, Timeout};
pub use error::{ConfResult, GpibConfError};
