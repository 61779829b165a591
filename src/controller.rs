use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{check_gain, PidConfig};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Per-computation breakdown
// ---------------------------------------------------------------------------

/// Contribution of each term to the most recent output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Terms {
    pub proportional: f64,
    /// Clamped integral accumulator after this computation.
    pub integral: f64,
    /// Subtracted from the sum; zero when the interval was too short.
    pub derivative: f64,
    pub dt: f64,
    pub output: f64,
}

// ---------------------------------------------------------------------------
// PID controller
// ---------------------------------------------------------------------------

/// Proportional-integral-derivative controller driven by measured elapsed
/// time between output requests.
///
/// The derivative acts on the measurement rather than the error, so a step
/// in the target produces no derivative kick. The integral accumulator is
/// clamped to the output bounds on every update, which bounds windup while
/// the actuator is saturated.
///
/// All mutation goes through `&mut self`; share across threads behind a
/// `Mutex`.
#[derive(Debug, Clone)]
pub struct PidController<C: Clock = SystemClock> {
    kp: f64,
    ki: f64,
    kd: f64,
    output_min: f64,
    output_max: f64,
    min_dt: f64,

    target_value: f64,
    process_variable: f64,
    process_variable_last: f64,
    integral: f64,

    clock: C,
    /// Seeds the first elapsed-time measurement (construction or reset).
    seeded_at: Duration,
    /// `None` until the first output computation.
    last_call: Option<Duration>,
    last_terms: Option<Terms>,
}

impl PidController<SystemClock> {
    /// Controller timed by the monotonic wall clock.
    pub fn new(config: PidConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> PidController<C> {
    pub fn with_clock(config: PidConfig, clock: C) -> Result<Self> {
        config.validate()?;
        let seeded_at = clock.now();
        Ok(Self {
            kp: config.kp,
            ki: config.ki,
            kd: config.kd,
            output_min: config.output_min,
            output_max: config.output_max,
            min_dt: config.min_dt,
            target_value: 0.0,
            process_variable: 0.0,
            process_variable_last: 0.0,
            integral: 0.0,
            clock,
            seeded_at,
            last_call: None,
            last_terms: None,
        })
    }

    /// Compute the next output.
    ///
    /// Not idempotent: each call measures the time since the previous call
    /// (or since construction), folds it into the integral, and restarts the
    /// interval. When the interval is shorter than `min_dt` the derivative
    /// contribution is skipped.
    pub fn control_output(&mut self) -> f64 {
        let now = self.clock.now();
        let since = self.last_call.unwrap_or(self.seeded_at);
        // A clock running backwards yields a zero interval.
        let dt = now.saturating_sub(since).as_secs_f64();
        self.last_call = Some(now);

        let error = self.target_value - self.process_variable;

        self.integral = clamp(
            self.integral + self.ki * error * dt,
            self.output_min,
            self.output_max,
        );

        let derivative = if dt > 0.0 && dt >= self.min_dt {
            self.kd * (self.process_variable - self.process_variable_last) / dt
        } else {
            if self.kd != 0.0 {
                debug!(dt, min_dt = self.min_dt, "interval too short, derivative skipped");
            }
            0.0
        };

        let proportional = self.kp * error;

        let output = clamp(
            proportional + self.integral - derivative,
            self.output_min,
            self.output_max,
        );

        trace!(dt, error, proportional, integral = self.integral, derivative, output, "pid output");

        self.last_terms = Some(Terms {
            proportional,
            integral: self.integral,
            derivative,
            dt,
            output,
        });
        output
    }

    /// Record a fresh measurement and compute the output for it.
    pub fn update(&mut self, measurement: f64) -> f64 {
        self.set_current_value(measurement);
        self.control_output()
    }

    /// Clear the integral and restart interval timing from now.
    ///
    /// Gains, bounds, target and the measurement history are kept.
    pub fn reset(&mut self) {
        debug!(integral = self.integral, "pid reset");
        self.integral = 0.0;
        self.seeded_at = self.clock.now();
        self.last_call = None;
        self.last_terms = None;
    }

    // -- measurement and setpoint -------------------------------------------

    /// Store a new measurement, shifting the previous one into
    /// [`process_variable_last`](Self::process_variable_last).
    pub fn set_current_value(&mut self, value: f64) {
        self.process_variable_last = self.process_variable;
        self.process_variable = value;
    }

    pub fn current_value(&self) -> f64 {
        self.process_variable
    }

    pub fn process_variable_last(&self) -> f64 {
        self.process_variable_last
    }

    pub fn set_target_value(&mut self, value: f64) {
        self.target_value = value;
    }

    pub fn target_value(&self) -> f64 {
        self.target_value
    }

    // -- gains ---------------------------------------------------------------

    pub fn kp(&self) -> f64 {
        self.kp
    }

    pub fn ki(&self) -> f64 {
        self.ki
    }

    pub fn kd(&self) -> f64 {
        self.kd
    }

    pub fn set_kp(&mut self, kp: f64) -> Result<()> {
        check_gain("kp", kp)?;
        self.kp = kp;
        Ok(())
    }

    pub fn set_ki(&mut self, ki: f64) -> Result<()> {
        check_gain("ki", ki)?;
        self.ki = ki;
        Ok(())
    }

    pub fn set_kd(&mut self, kd: f64) -> Result<()> {
        check_gain("kd", kd)?;
        self.kd = kd;
        Ok(())
    }

    /// Retune all three gains at once. Nothing changes if any is rejected.
    pub fn set_gains(&mut self, kp: f64, ki: f64, kd: f64) -> Result<()> {
        check_gain("kp", kp)?;
        check_gain("ki", ki)?;
        check_gain("kd", kd)?;
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
        Ok(())
    }

    // -- diagnostics ---------------------------------------------------------

    pub fn output_max(&self) -> f64 {
        self.output_max
    }

    pub fn output_min(&self) -> f64 {
        self.output_min
    }

    pub fn min_dt(&self) -> f64 {
        self.min_dt
    }

    pub fn integral_term(&self) -> f64 {
        self.integral
    }

    pub fn last_terms(&self) -> Option<Terms> {
        self.last_terms
    }

    pub fn has_run(&self) -> bool {
        self.last_call.is_some()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

/// Limit `value` to `[min, max]`. The lower bound is checked first; NaN maps
/// to `min`.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        warn!(min, "non-finite value clamped to lower bound");
        return min;
    }
    if value <= min {
        min
    } else if value >= max {
        max
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn pid(kp: f64, ki: f64, kd: f64, max: f64, min: f64) -> (PidController<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let pid = PidController::with_clock(PidConfig::new(kp, ki, kd, max, min), clock.clone()).unwrap();
        (pid, clock)
    }

    #[test]
    fn construction_zeroes_state() {
        let (pid, _) = pid(1.0, 2.0, 3.0, 10.0, -10.0);
        assert_eq!(pid.current_value(), 0.0);
        assert_eq!(pid.process_variable_last(), 0.0);
        assert_eq!(pid.target_value(), 0.0);
        assert_eq!(pid.integral_term(), 0.0);
        assert!(!pid.has_run());
        assert!(pid.last_terms().is_none());
        assert_eq!((pid.output_max(), pid.output_min()), (10.0, -10.0));
        assert_eq!(pid.min_dt(), crate::config::DEFAULT_MIN_DT);
    }

    #[test]
    fn flipped_bounds_fail_construction() {
        let result = PidController::with_clock(PidConfig::new(1.0, 0.0, 0.0, -1.0, 1.0), ManualClock::new());
        assert!(result.is_err());
    }

    #[test]
    fn proportional_only_response() {
        let (mut pid, clock) = pid(1.0, 0.0, 0.0, 10.0, -10.0);
        pid.set_target_value(5.0);
        pid.set_current_value(0.0);
        clock.advance_secs(0.1);
        assert!((pid.control_output() - 5.0).abs() < 1e-10);
        assert!(pid.has_run());
    }

    #[test]
    fn proportional_output_clamped_to_max() {
        let (mut pid, clock) = pid(1.0, 0.0, 0.0, 10.0, -10.0);
        pid.set_target_value(20.0);
        pid.set_current_value(0.0);
        clock.advance_secs(0.1);
        assert_eq!(pid.control_output(), 10.0);
    }

    #[test]
    fn proportional_output_independent_of_elapsed_time() {
        let (mut pid, clock) = pid(2.5, 0.0, 0.0, 100.0, -100.0);
        pid.set_target_value(3.0);
        pid.set_current_value(1.0);
        pid.set_current_value(1.0);
        clock.advance_secs(0.01);
        let first = pid.control_output();
        clock.advance_secs(7.3);
        let second = pid.control_output();
        assert!((first - 5.0).abs() < 1e-10);
        assert!((second - 5.0).abs() < 1e-10);
    }

    #[test]
    fn zero_gains_output_clamped_zero() {
        for (max, min, expected) in [(5.0, 1.0, 1.0), (-1.0, -5.0, -1.0), (1.0, -1.0, 0.0)] {
            let (mut pid, clock) = pid(0.0, 0.0, 0.0, max, min);
            pid.set_target_value(42.0);
            pid.set_current_value(-3.0);
            for _ in 0..3 {
                clock.advance_secs(0.5);
                assert_eq!(pid.control_output(), expected);
            }
        }
    }

    #[test]
    fn integral_accumulates_with_elapsed_time() {
        let (mut pid, clock) = pid(0.0, 1.0, 0.0, 100.0, -100.0);
        pid.set_target_value(10.0);
        pid.set_current_value(0.0);

        clock.advance_secs(1.0);
        let out = pid.control_output();
        assert!((pid.integral_term() - 10.0).abs() < 1e-10);
        assert!((out - 10.0).abs() < 1e-10);

        clock.advance_secs(1.0);
        let out = pid.control_output();
        assert!((pid.integral_term() - 20.0).abs() < 1e-10);
        assert!((out - 20.0).abs() < 1e-10);
    }

    #[test]
    fn first_interval_measured_from_construction() {
        let (mut pid, clock) = pid(0.0, 1.0, 0.0, 100.0, -100.0);
        pid.set_target_value(1.0);
        clock.advance_secs(3.0);
        pid.control_output();
        assert!((pid.integral_term() - 3.0).abs() < 1e-10);
        assert!((pid.last_terms().unwrap().dt - 3.0).abs() < 1e-10);
    }

    #[test]
    fn integral_saturates_at_output_max() {
        let (mut pid, clock) = pid(0.0, 1.0, 0.0, 25.0, -25.0);
        pid.set_target_value(10.0);

        let expected = [10.0, 20.0, 25.0, 25.0, 25.0];
        for want in expected {
            clock.advance_secs(1.0);
            let out = pid.control_output();
            assert!((pid.integral_term() - want).abs() < 1e-10);
            assert!(pid.integral_term() <= 25.0);
            assert!((out - want).abs() < 1e-10);
        }

        // No windup debt: reversing the error unwinds immediately.
        pid.set_target_value(-10.0);
        clock.advance_secs(1.0);
        pid.control_output();
        assert!((pid.integral_term() - 15.0).abs() < 1e-10);
    }

    #[test]
    fn integral_saturates_at_output_min() {
        let (mut pid, clock) = pid(0.0, 5.0, 0.0, 3.0, -3.0);
        pid.set_target_value(-100.0);
        for _ in 0..4 {
            clock.advance_secs(2.0);
            assert_eq!(pid.control_output(), -3.0);
            assert_eq!(pid.integral_term(), -3.0);
        }
    }

    #[test]
    fn current_value_shifts_into_last() {
        let (mut pid, _) = pid(1.0, 0.0, 0.0, 1.0, -1.0);
        pid.set_current_value(3.0);
        pid.set_current_value(7.0);
        assert_eq!(pid.process_variable_last(), 3.0);
        assert_eq!(pid.current_value(), 7.0);
    }

    #[test]
    fn derivative_on_measurement() {
        let (mut pid, clock) = pid(0.0, 0.0, 1.0, 100.0, -100.0);
        pid.set_current_value(0.0);
        pid.set_current_value(2.0);
        clock.advance_secs(0.5);
        let out = pid.control_output();
        assert!((out + 4.0).abs() < 1e-10);
        assert!((pid.last_terms().unwrap().derivative - 4.0).abs() < 1e-10);
    }

    #[test]
    fn target_step_produces_no_derivative_kick() {
        let (mut pid, clock) = pid(0.0, 0.0, 10.0, 100.0, -100.0);
        pid.set_current_value(2.0);
        pid.set_current_value(2.0);
        pid.set_target_value(0.0);
        clock.advance_secs(0.1);
        pid.control_output();
        pid.set_target_value(50.0);
        clock.advance_secs(0.1);
        assert_eq!(pid.control_output(), 0.0);
        assert_eq!(pid.last_terms().unwrap().derivative, 0.0);
    }

    #[test]
    fn zero_interval_skips_derivative() {
        let (mut pid, clock) = pid(0.0, 0.0, 1.0, 100.0, -100.0);
        clock.advance_secs(1.0);
        pid.control_output();
        pid.set_current_value(5.0);
        // Same instant as the previous call.
        let out = pid.control_output();
        assert!(out.is_finite());
        assert_eq!(out, 0.0);
        assert_eq!(pid.last_terms().unwrap().dt, 0.0);
    }

    #[test]
    fn sub_threshold_interval_skips_derivative() {
        let (mut pid, clock) = pid(0.0, 0.0, 1.0, 100.0, -100.0);
        pid.set_current_value(5.0);
        clock.advance(Duration::from_micros(500));
        assert_eq!(pid.control_output(), 0.0);

        // At the threshold the derivative applies again.
        pid.set_current_value(5.001);
        clock.advance(Duration::from_millis(1));
        let out = pid.control_output();
        assert!((out + 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_min_dt_still_guards_zero_interval() {
        let cfg = PidConfig::new(0.0, 0.0, 1.0, 10.0, -10.0).with_min_dt(0.0);
        let mut pid = PidController::with_clock(cfg, ManualClock::new()).unwrap();
        assert_eq!(pid.min_dt(), 0.0);
        pid.set_current_value(1.0);
        assert_eq!(pid.control_output(), 0.0);
    }

    #[test]
    fn backwards_clock_gives_zero_interval() {
        let (mut pid, clock) = pid(0.0, 1.0, 1.0, 100.0, -100.0);
        pid.set_target_value(10.0);
        clock.advance_secs(5.0);
        pid.control_output();
        let integral = pid.integral_term();
        clock.set(Duration::from_secs(1));
        pid.set_current_value(3.0);
        let out = pid.control_output();
        assert!(out.is_finite());
        assert_eq!(pid.last_terms().unwrap().dt, 0.0);
        assert_eq!(pid.integral_term(), integral);
    }

    #[test]
    fn nan_measurement_clamps_to_min() {
        let (mut pid, clock) = pid(1.0, 0.0, 0.0, 10.0, -10.0);
        pid.set_current_value(f64::NAN);
        clock.advance_secs(0.1);
        assert_eq!(pid.control_output(), -10.0);
        assert_eq!(pid.integral_term(), -10.0);
    }

    #[test]
    fn overflowing_output_clamps_to_bound() {
        let (mut pid, clock) = pid(10.0, 0.0, 0.0, 10.0, -10.0);
        pid.set_current_value(-1e308);
        clock.advance_secs(0.1);
        assert_eq!(pid.control_output(), 10.0);
    }

    #[test]
    fn outputs_and_integral_stay_in_bounds() {
        let (mut pid, clock) = pid(3.0, 2.0, 0.7, 4.0, -2.5);
        for i in 0..500 {
            let t = i as f64;
            pid.set_target_value((t * 0.37).sin() * 20.0);
            pid.set_current_value((t * 0.11).cos() * 15.0);
            clock.advance_secs(0.001 + (t * 0.53).sin().abs() * 0.3);
            let out = pid.control_output();
            assert!((-2.5..=4.0).contains(&out), "output {out} out of bounds");
            let integral = pid.integral_term();
            assert!((-2.5..=4.0).contains(&integral), "integral {integral} out of bounds");
        }
    }

    #[test]
    fn gain_changes_apply_to_next_output() {
        let (mut pid, clock) = pid(1.0, 0.0, 0.0, 100.0, -100.0);
        pid.set_target_value(4.0);
        clock.advance_secs(0.1);
        assert!((pid.control_output() - 4.0).abs() < 1e-10);
        pid.set_kp(2.0).unwrap();
        clock.advance_secs(0.1);
        assert!((pid.control_output() - 8.0).abs() < 1e-10);
        assert_eq!(pid.kp(), 2.0);
    }

    #[test]
    fn non_finite_gain_rejected_and_unchanged() {
        let (mut pid, _) = pid(1.0, 2.0, 3.0, 1.0, -1.0);
        assert!(pid.set_ki(f64::NAN).is_err());
        assert!(pid.set_gains(4.0, 5.0, f64::INFINITY).is_err());
        assert_eq!((pid.kp(), pid.ki(), pid.kd()), (1.0, 2.0, 3.0));
        pid.set_gains(4.0, 5.0, 6.0).unwrap();
        assert_eq!((pid.kp(), pid.ki(), pid.kd()), (4.0, 5.0, 6.0));
    }

    #[test]
    fn update_records_measurement() {
        let (mut pid, clock) = pid(1.0, 0.0, 0.0, 100.0, -100.0);
        pid.set_target_value(10.0);
        clock.advance_secs(0.1);
        pid.update(4.0);
        clock.advance_secs(0.1);
        let out = pid.update(6.0);
        assert_eq!(pid.process_variable_last(), 4.0);
        assert!((out - 4.0).abs() < 1e-10);
    }

    #[test]
    fn reset_clears_integral_and_reseeds_timing() {
        let (mut pid, clock) = pid(0.0, 1.0, 0.0, 100.0, -100.0);
        pid.set_target_value(10.0);
        clock.advance_secs(2.0);
        pid.control_output();
        assert!(pid.integral_term() > 0.0);

        clock.advance_secs(50.0);
        pid.reset();
        assert_eq!(pid.integral_term(), 0.0);
        assert!(!pid.has_run());
        assert_eq!(pid.target_value(), 10.0);

        clock.advance_secs(1.0);
        pid.control_output();
        assert!((pid.integral_term() - 10.0).abs() < 1e-10);
    }

    #[test]
    fn clamp_policy() {
        assert_eq!(clamp(-5.0, -1.0, 1.0), -1.0);
        assert_eq!(clamp(5.0, -1.0, 1.0), 1.0);
        assert_eq!(clamp(0.3, -1.0, 1.0), 0.3);
        assert_eq!(clamp(f64::INFINITY, -1.0, 1.0), 1.0);
        assert_eq!(clamp(f64::NEG_INFINITY, -1.0, 1.0), -1.0);
        assert_eq!(clamp(f64::NAN, -1.0, 1.0), -1.0);
        // Flipped bounds: the lower bound wins.
        assert_eq!(clamp(0.0, 1.0, -1.0), 1.0);
    }

    #[test]
    fn system_clock_controller_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PidController>();
    }
}
