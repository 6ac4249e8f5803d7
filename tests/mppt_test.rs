//! Integration tests for maximum power point tracking against the simulated cell.
//!
//! All tests run on a paused tokio clock, so simulated minutes take milliseconds.

use gpib_conf::hardware::{MockSolarCell, SourceMeter};
use gpib_conf::mppt::{which_max_power, MpptTracker};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// True maximum power point of the cell, found by brute force.
fn true_mpp(cell: &MockSolarCell) -> (f64, f64) {
    (0..=11_000)
        .map(|k| f64::from(k) * cell.voc() / 11_000.0)
        .map(|v| (-v * cell.current_at(v), v))
        .fold((f64::MIN, 0.0), |best, p| if p.0 > best.0 { p } else { best })
}

#[tokio::test(start_paused = true)]
async fn test_tracker_converges_to_true_mpp() {
    let cell = Arc::new(MockSolarCell::new(1.1, 0.02));
    let (p_max, v_max) = true_mpp(&cell);

    let mut tracker = MpptTracker::new(cell.clone());
    tracker.voc = Some(1.1);
    let readings = tracker.launch(Duration::from_secs(60), None).await.unwrap();

    let vmpp = tracker.vmpp.unwrap();
    let impp = tracker.impp.unwrap();
    assert!((vmpp - v_max).abs() < 0.02, "vmpp {vmpp} vs true {v_max}");
    assert!(-vmpp * impp > 0.99 * p_max, "power {} vs true {p_max}", -vmpp * impp);

    let best = which_max_power(&readings).unwrap();
    assert!(best.power <= p_max * 1.0001);
    assert!(best.power > 0.99 * p_max);
}

#[tokio::test(start_paused = true)]
async fn test_tracker_runs_for_requested_duration() {
    let cell = Arc::new(MockSolarCell::new(1.1, 0.02));
    let mut tracker = MpptTracker::new(cell);
    tracker.voc = Some(1.1);

    let readings = tracker.launch(Duration::from_secs(30), None).await.unwrap();
    let first = readings.first().unwrap().time;
    let last = readings.last().unwrap().time;
    assert!(last - first >= 29.0, "covered {}s", last - first);
    assert!(last - first < 32.0, "covered {}s", last - first);
    assert!(readings.windows(2).all(|w| w[1].time >= w[0].time));
}

#[tokio::test(start_paused = true)]
async fn test_tracker_learns_unknowns_from_soak() {
    let cell = Arc::new(MockSolarCell::new(1.1, 0.02));
    let mut tracker = MpptTracker::new(cell.clone());
    tracker.voc = Some(1.1);

    tracker.launch(Duration::from_secs(5), None).await.unwrap();

    // Soak happens at 70% of Voc, where the cell delivers almost all of Isc
    let soak_current = cell.current_at(0.77);
    let isc = tracker.isc.unwrap();
    assert!((isc - soak_current * 1.1).abs() < 1e-9);
    let compliance = tracker.current_compliance.unwrap();
    assert!((compliance - (soak_current * 2.0).abs()).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_voltage_stays_between_zero_and_voc() {
    let cell = Arc::new(MockSolarCell::new(1.1, 0.02));
    let mut tracker = MpptTracker::new(cell);
    tracker.voc = Some(1.1);
    tracker.vmpp = Some(1.05);

    let readings = tracker.launch(Duration::from_secs(20), None).await.unwrap();
    assert!(readings
        .iter()
        .all(|m| m.voltage > 0.0 && m.voltage < 1.1));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_voc_skips_tracking() {
    let cell = Arc::new(MockSolarCell::default());
    let mut tracker = MpptTracker::new(cell.clone());

    let readings = tracker.launch(Duration::from_secs(10), None).await.unwrap();
    assert!(readings.is_empty());
    // Output was never enabled
    assert!(cell.measure().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_observer_sees_every_reading() {
    let cell = Arc::new(MockSolarCell::default());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut tracker = MpptTracker::new(cell).with_observer(tx);
    tracker.voc = Some(1.1);

    let readings = tracker.launch(Duration::from_secs(15), None).await.unwrap();
    drop(tracker);

    let mut seen = Vec::new();
    while let Some(m) = rx.recv().await {
        seen.push(m);
    }
    assert_eq!(seen, readings);
}

#[tokio::test(start_paused = true)]
async fn test_nplc_is_forwarded() {
    let cell = Arc::new(MockSolarCell::default());
    let mut tracker = MpptTracker::new(cell.clone());
    tracker.voc = Some(1.1);

    tracker
        .launch(Duration::from_secs(2), Some(0.5))
        .await
        .unwrap();
    assert_eq!(cell.nplc().await, 0.5);

    tracker.reset();
    assert!(tracker.voc.is_none() && tracker.vmpp.is_none());
}
