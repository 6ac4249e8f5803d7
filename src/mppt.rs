//! Maximum power point tracking.
//!
//! Holds a solar cell near its maximum power point (MPP) by alternating two
//! phases until the requested duration has elapsed:
//!
//! - **Explore**: walk the sourced voltage up and down around the current MPP
//!   in steps of `Voc / 301`, until the operating point has moved more than
//!   7 degrees away from the MPP on both sides. The "angle" of an operating
//!   point is `atan(I / V * Voc / Isc)`, which makes the window scale with the
//!   shape of the cell's I-V curve. The voltage never leaves the span between
//!   0 and Voc.
//! - **Dwell**: jump to the explored point of highest power and measure there
//!   for `dwell_time` (or whatever time is left).
//!
//! Before the first exploration the tracker soaks at its starting voltage,
//! which also provides estimates for Impp, Isc and the current compliance when
//! those are not known.

use crate::hardware::{Measurement, SourceMeter};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Time spent at the MPP between explorations.
pub const DEFAULT_DWELL: Duration = Duration::from_secs(10);

/// Longest soak before the first exploration.
pub const INITIAL_SOAK: Duration = Duration::from_secs(10);

/// Current compliance used when none is known, in amps.
pub const DEFAULT_COMPLIANCE: f64 = 0.04;

/// Exploration window, in degrees either side of the MPP.
pub const MAX_ANGLE_DEG: f64 = 7.0;

/// Number of voltage steps between 0 and Voc.
pub const VOLTAGE_STEPS: f64 = 301.0;

// A well-behaved cell needs two passes over the 0..Voc span at most
const MAX_EXPLORE_STEPS: usize = 4 * VOLTAGE_STEPS as usize;

/// The highest-power point in a set of readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxPower {
    /// Power in watts
    pub power: f64,
    /// Voltage at the maximum power point
    pub voltage: f64,
    /// Current at the maximum power point
    pub current: f64,
    /// Index of the reading
    pub index: usize,
}

/// Finds the reading with the highest generated power (`-V * I`).
///
/// Readings whose power is NaN are skipped. Returns `None` if none remain.
pub fn which_max_power(readings: &[Measurement]) -> Option<MaxPower> {
    max_power_point(readings.iter().map(|m| (m.voltage, m.current)))
}

fn max_power_point(points: impl Iterator<Item = (f64, f64)>) -> Option<MaxPower> {
    points
        .enumerate()
        .map(|(index, (voltage, current))| MaxPower {
            power: -voltage * current,
            voltage,
            current,
            index,
        })
        .filter(|p| !p.power.is_nan())
        .max_by(|a, b| a.power.total_cmp(&b.power))
}

fn mpp_angle(current: f64, voltage: f64, voc: f64, isc: f64) -> f64 {
    (current / voltage * voc / isc).atan().to_degrees()
}

/// Maximum power point tracker driving one sourcemeter.
pub struct MpptTracker {
    sm: Arc<dyn SourceMeter>,
    /// Open-circuit voltage; tracking is skipped while unknown
    pub voc: Option<f64>,
    /// Short-circuit current; estimated from the soak if unknown
    pub isc: Option<f64>,
    /// Voltage at the MPP; starts at 70% of Voc if unknown
    pub vmpp: Option<f64>,
    /// Current at the MPP
    pub impp: Option<f64>,
    /// Current compliance in amps
    pub current_compliance: Option<f64>,
    /// Time spent at the MPP between explorations
    pub dwell_time: Duration,
    observer: Option<UnboundedSender<Measurement>>,
}

impl MpptTracker {
    /// Creates a tracker with nothing known about the device under test.
    pub fn new(sm: Arc<dyn SourceMeter>) -> Self {
        Self {
            sm,
            voc: None,
            isc: None,
            vmpp: None,
            impp: None,
            current_compliance: None,
            dwell_time: DEFAULT_DWELL,
            observer: None,
        }
    }

    /// Forward every reading to `tx` as it is taken.
    pub fn with_observer(mut self, tx: UnboundedSender<Measurement>) -> Self {
        self.observer = Some(tx);
        self
    }

    /// Forget everything learned about the cell.
    pub fn reset(&mut self) {
        self.voc = None;
        self.isc = None;
        self.vmpp = None;
        self.impp = None;
        self.current_compliance = None;
    }

    fn notify(&self, readings: &[Measurement]) {
        if let Some(tx) = &self.observer {
            for m in readings {
                // A dropped receiver only means nobody is watching
                let _ = tx.send(*m);
            }
        }
    }

    /// Track the MPP for `duration`, returning every reading taken.
    ///
    /// `nplc` sets the sourcemeter integration time first, if given.
    pub async fn launch(
        &mut self,
        duration: Duration,
        nplc: Option<f64>,
    ) -> Result<Vec<Measurement>> {
        let Some(voc) = self.voc else {
            warn!("Not doing power point tracking: Voc not known");
            return Ok(Vec::new());
        };
        let t0 = Instant::now();

        let vmpp = *self.vmpp.get_or_insert(0.7 * voc);
        let compliance = self.current_compliance.unwrap_or(DEFAULT_COMPLIANCE);

        if let Some(nplc) = nplc {
            self.sm.set_nplc(nplc).await?;
        }

        info!(vmpp_mv = vmpp * 1000.0, "Moving to initial MPP estimate");
        self.sm.setup_dc(vmpp, compliance).await?;

        let soak = if duration <= INITIAL_SOAK {
            duration.mul_f64(0.2)
        } else {
            INITIAL_SOAK
        };
        info!(vmpp_mv = vmpp * 1000.0, soak_s = soak.as_secs_f64(), "Soaking at MPP");
        let mut readings = self.sm.measure_until(soak).await?;
        self.notify(&readings);

        let impp = readings
            .last()
            .map(|m| m.current)
            .ok_or_else(|| anyhow!("Sourcemeter returned no readings during soak"))?;
        self.impp = Some(impp);
        self.current_compliance.get_or_insert((impp * 2.0).abs());
        let isc = *self.isc.get_or_insert(impp * 1.1);

        let tracked = self.explore_and_dwell(t0, duration, voc, isc).await?;
        readings.extend(tracked);

        if let (Some(vmpp), Some(impp)) = (self.vmpp, self.impp) {
            info!(
                run_time_s = t0.elapsed().as_secs_f64(),
                power_mw = -vmpp * impp * 1000.0,
                vmpp_mv = vmpp * 1000.0,
                impp_ma = impp * 1000.0,
                "Final maximum power point"
            );
        }
        Ok(readings)
    }

    async fn explore_and_dwell(
        &mut self,
        t0: Instant,
        duration: Duration,
        voc: f64,
        isc: f64,
    ) -> Result<Vec<Measurement>> {
        let mut dv = voc / VOLTAGE_STEPS;
        let (low_limit, high_limit) = if voc >= 0.0 { (0.0, voc) } else { (voc, 0.0) };

        let mut vmpp = self.vmpp.unwrap_or(0.7 * voc);
        let mut impp = self.impp.unwrap_or(0.0);
        let mut readings = Vec::new();

        while t0.elapsed() < duration {
            debug!("Exploring for new MPP");
            let angle_mpp = mpp_angle(impp, vmpp, voc, isc);
            let mut explored = vec![(vmpp, impp)];
            let mut v_set = vmpp;
            let mut high_edge = false;
            let mut low_edge = false;

            while !(high_edge && low_edge) {
                if explored.len() > MAX_EXPLORE_STEPS {
                    warn!(
                        steps = explored.len(),
                        "Exploration did not find both edges, giving up"
                    );
                    break;
                }
                self.sm.set_output(v_set).await?;
                let m = self.sm.measure().await?;
                self.notify(&[m]);
                readings.push(m);
                explored.push((m.voltage, m.current));

                let d_angle = angle_mpp - mpp_angle(m.current, m.voltage, voc, isc);
                if d_angle > MAX_ANGLE_DEG {
                    high_edge = true;
                    dv = -dv;
                    debug!(voltage = m.voltage, "High voltage edge: angle exceeded");
                }
                if d_angle < -MAX_ANGLE_DEG {
                    low_edge = true;
                    dv = -dv;
                    debug!(voltage = m.voltage, "Low voltage edge: angle exceeded");
                }

                v_set += dv;
                if dv > 0.0 && v_set >= high_limit {
                    high_edge = true;
                    dv = -dv;
                    v_set += dv;
                    warn!(voltage = v_set, "Reached high voltage edge at the Voc bound");
                } else if dv < 0.0 && v_set <= low_limit {
                    low_edge = true;
                    dv = -dv;
                    v_set += dv;
                    warn!(voltage = v_set, "Reached low voltage edge at the 0V bound");
                }
            }

            if let Some(best) = max_power_point(explored.into_iter()) {
                vmpp = best.voltage;
                impp = best.current;
                info!(
                    power_mw = best.power * 1000.0,
                    vmpp_v = vmpp,
                    angle_shift_deg = angle_mpp - mpp_angle(impp, vmpp, voc, isc),
                    "New MPP found"
                );
            }

            let elapsed = t0.elapsed();
            if elapsed >= duration {
                break;
            }
            let dwell = (duration - elapsed).min(self.dwell_time);

            self.sm.set_output(vmpp).await?;
            debug!(vmpp_mv = vmpp * 1000.0, dwell_s = dwell.as_secs_f64(), "Dwelling at MPP");
            let dwelled = self.sm.measure_until(dwell).await?;
            self.notify(&dwelled);
            if let Some(last) = dwelled.last() {
                impp = last.current;
            }
            readings.extend(dwelled);
        }

        self.vmpp = Some(vmpp);
        self.impp = Some(impp);
        Ok(readings)
    }
}
