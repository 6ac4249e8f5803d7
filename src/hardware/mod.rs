//! Instrument abstractions used by the measurement routines.
//!
//! - `capabilities` - the `SourceMeter` capability trait and `Measurement`
//! - `mock` - simulated instruments for running without a GPIB bus

pub mod capabilities;
pub mod mock;

pub use capabilities::{Measurement, SourceMeter};
pub use mock::MockSolarCell;
