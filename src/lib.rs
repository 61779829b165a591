//! PID feedback controller timed by measured elapsed intervals.
//!
//! The controller applies derivative action to the measurement, clamps both
//! its output and its integral accumulator to the actuator range, and reads
//! time from an injectable [`Clock`] so tests and simulations can replay
//! exact intervals.

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod io;
pub mod sim;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PidConfig;
pub use controller::{PidController, Terms};
pub use error::ConfigError;
