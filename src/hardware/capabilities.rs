//! Instrument Capabilities
//!
//! Capability traits describe what a routine needs from an instrument rather
//! than which instrument it is. A maximum power point tracker only needs to
//! source a voltage and read back voltage and current, so it is written
//! against `SourceMeter` and runs the same against a bus-attached sourcemeter
//! or a simulated cell.
//!
//! Each capability trait:
//! - Is async (uses #[async_trait])
//! - Is thread-safe (requires Send + Sync)
//! - Uses anyhow::Result for errors

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};

/// One reading from a sourcemeter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Measured voltage in volts
    pub voltage: f64,
    /// Measured current in amps; negative while the device under test generates power
    pub current: f64,
    /// Instrument timestamp in seconds
    pub time: f64,
    /// Instrument status word
    pub status: u32,
}

impl Measurement {
    /// Power delivered by the device under test, in watts.
    pub fn power(&self) -> f64 {
        -self.voltage * self.current
    }
}

/// Capability: DC Voltage Source with Current Measurement
///
/// # Contract
/// - `setup_dc` switches to voltage sourcing at `setpoint` volts with a
///   current compliance of `compliance` amps and enables the output
/// - `set_output` changes the sourced voltage without reconfiguring
/// - `measure` triggers one reading of voltage and current
#[async_trait]
pub trait SourceMeter: Send + Sync {
    /// Configure DC voltage sourcing and enable the output
    async fn setup_dc(&self, setpoint: f64, compliance: f64) -> Result<()>;

    /// Change the sourced voltage
    async fn set_output(&self, voltage: f64) -> Result<()>;

    /// Take one reading
    async fn measure(&self) -> Result<Measurement>;

    /// Set the integration time in power line cycles
    ///
    /// # Default Implementation
    /// Returns an error indicating NPLC control is not supported.
    async fn set_nplc(&self, _nplc: f64) -> Result<()> {
        anyhow::bail!("NPLC control not supported by this device")
    }

    /// Take readings back to back until `dwell` has elapsed
    ///
    /// Always returns at least one reading.
    async fn measure_until(&self, dwell: Duration) -> Result<Vec<Measurement>> {
        let start = Instant::now();
        let mut readings = Vec::new();
        loop {
            readings.push(self.measure().await?);
            if start.elapsed() >= dwell {
                return Ok(readings);
            }
        }
    }
}
