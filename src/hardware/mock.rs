//! Mock Hardware Implementations
//!
//! Simulated instruments for running measurement routines without a GPIB bus.
//! All mocks use async-safe operations (tokio::time::sleep, not std::thread::sleep),
//! so tests can run them under a paused tokio clock.

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::{sleep, Duration, Instant};
use tracing::debug;

use crate::hardware::capabilities::{Measurement, SourceMeter};

/// Status bit set when the reading was clamped by the current compliance.
pub const STATUS_COMPLIANCE: u32 = 0x1;

#[derive(Debug)]
struct SourceState {
    setpoint: f64,
    compliance: f64,
    output_on: bool,
    nplc: f64,
}

/// Sourcemeter wired to a simulated solar cell
///
/// The cell follows the single-diode model
/// `I(V) = -(Isc - I0 * (exp(V / a) - 1))` with `I0` chosen so that
/// `I(Voc) = 0`. Currents are negative while the cell generates power.
/// Each reading takes `sample_interval` (20ms by default).
pub struct MockSolarCell {
    voc: f64,
    isc: f64,
    /// Ideality factor times thermal voltage, in volts
    diode_voltage: f64,
    sample_interval: Duration,
    state: RwLock<SourceState>,
    started: Instant,
}

impl MockSolarCell {
    /// Create a cell with the given open-circuit voltage and short-circuit current
    pub fn new(voc: f64, isc: f64) -> Self {
        Self {
            voc,
            isc,
            diode_voltage: 0.05,
            sample_interval: Duration::from_millis(20),
            state: RwLock::new(SourceState {
                setpoint: 0.0,
                compliance: 0.1,
                output_on: false,
                nplc: 1.0,
            }),
            started: Instant::now(),
        }
    }

    /// Set the time one reading takes
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Open-circuit voltage of the simulated cell
    pub fn voc(&self) -> f64 {
        self.voc
    }

    /// Cell current at `voltage`, unclamped
    pub fn current_at(&self, voltage: f64) -> f64 {
        let i0 = self.isc / ((self.voc / self.diode_voltage).exp() - 1.0);
        -(self.isc - i0 * ((voltage / self.diode_voltage).exp() - 1.0))
    }

    /// Current NPLC setting
    pub async fn nplc(&self) -> f64 {
        self.state.read().await.nplc
    }
}

impl Default for MockSolarCell {
    fn default() -> Self {
        Self::new(1.1, 0.02)
    }
}

#[async_trait]
impl SourceMeter for MockSolarCell {
    async fn setup_dc(&self, setpoint: f64, compliance: f64) -> Result<()> {
        if !(compliance.is_finite() && compliance > 0.0) {
            bail!("Compliance must be positive, got {compliance}");
        }
        let mut state = self.state.write().await;
        state.setpoint = setpoint;
        state.compliance = compliance;
        state.output_on = true;
        debug!(setpoint, compliance, "MockSolarCell: DC sourcing enabled");
        Ok(())
    }

    async fn set_output(&self, voltage: f64) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.output_on {
            bail!("Output not enabled; call setup_dc first");
        }
        state.setpoint = voltage;
        Ok(())
    }

    async fn measure(&self) -> Result<Measurement> {
        sleep(self.sample_interval).await;
        let state = self.state.read().await;
        if !state.output_on {
            bail!("Output not enabled; call setup_dc first");
        }

        let raw = self.current_at(state.setpoint);
        let (current, status) = if raw.abs() > state.compliance {
            (state.compliance.copysign(raw), STATUS_COMPLIANCE)
        } else {
            (raw, 0)
        };

        Ok(Measurement {
            voltage: state.setpoint,
            current,
            time: self.started.elapsed().as_secs_f64(),
            status,
        })
    }

    async fn set_nplc(&self, nplc: f64) -> Result<()> {
        if !(0.01..=10.0).contains(&nplc) {
            bail!("NPLC {nplc} outside 0.01-10");
        }
        self.state.write().await.nplc = nplc;
        Ok(())
    }
}
