use std::time::Duration;

use tracing::{debug, info};

use crate::clock::ManualClock;
use crate::config::PidConfig;
use crate::controller::PidController;
use crate::error::{ConfigError, Result};
use super::plant::Plant;

// ---------------------------------------------------------------------------
// Simulation config and samples
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub dt: f64,       // s between controller updates
    pub max_time: f64, // s
    pub setpoint: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 0.05,        // 20 Hz
            max_time: 60.0,
            setpoint: 60.0,
        }
    }
}

impl SimConfig {
    /// Check that the update interval is a positive duration and the run
    /// length is finite.
    pub fn validate(&self) -> Result<()> {
        let dt_ok = self.dt.is_finite() && self.dt > 0.0;
        let max_time_ok = self.max_time.is_finite() && self.max_time >= 0.0;
        if dt_ok && max_time_ok {
            Ok(())
        } else {
            Err(ConfigError::InvalidSimTiming { dt: self.dt, max_time: self.max_time })
        }
    }
}

/// One controller update in a closed-loop run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub setpoint: f64,
    pub measurement: f64,
    pub output: f64,
    pub integral: f64,
}

// ---------------------------------------------------------------------------
// Closed-loop step response
// ---------------------------------------------------------------------------

/// Drive `plant` with an existing controller whose clock is advanced by
/// `config.dt` before each update.
///
/// The first sample is the state before any update.
pub fn simulate_with(
    controller: &mut PidController<ManualClock>,
    plant: &mut dyn Plant,
    config: &SimConfig,
) -> Result<Vec<Sample>> {
    config.validate()?;
    controller.set_target_value(config.setpoint);
    // Seed the measurement history so the first update has no derivative kick.
    controller.set_current_value(plant.output());

    let steps = (config.max_time / config.dt).round() as usize;
    let mut samples = Vec::with_capacity(steps.min(200_000) + 1);
    samples.push(Sample {
        time: 0.0,
        setpoint: config.setpoint,
        measurement: plant.output(),
        output: 0.0,
        integral: controller.integral_term(),
    });

    let tick = Duration::from_secs_f64(config.dt);
    for i in 1..=steps {
        controller.clock().advance(tick);
        let output = controller.update(plant.output());
        plant.step(output, config.dt);

        samples.push(Sample {
            time: i as f64 * config.dt,
            setpoint: config.setpoint,
            measurement: plant.output(),
            output,
            integral: controller.integral_term(),
        });
    }

    debug!(plant = plant.name(), steps, "simulation finished");
    Ok(samples)
}

/// Step response of `plant` from its current value to `config.setpoint`.
pub fn simulate_step(
    pid_config: &PidConfig,
    plant: &mut dyn Plant,
    config: &SimConfig,
) -> Result<Vec<Sample>> {
    config.validate()?;
    let mut controller = PidController::with_clock(*pid_config, ManualClock::new())?;
    info!(
        kp = pid_config.kp,
        ki = pid_config.ki,
        kd = pid_config.kd,
        setpoint = config.setpoint,
        "simulating step response"
    );
    simulate_with(&mut controller, plant, config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
