// ---------------------------------------------------------------------------
// Simulated processes for exercising a controller in closed loop
// ---------------------------------------------------------------------------

/// A process that responds to a control input over time.
///
/// Implement this to drive a controller against a custom model in
/// [`simulate_with`](super::simulate_with).
pub trait Plant {
    /// Current measured value of the process.
    fn output(&self) -> f64;

    /// Advance the process by `dt` seconds with `input` held constant.
    fn step(&mut self, input: f64, dt: f64);

    /// Human-readable name for logging/display.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// First-order lag settling toward `ambient + gain * input` with time
/// constant `tau`, integrated with explicit Euler.
#[derive(Debug, Clone)]
pub struct FirstOrderPlant {
    pub gain: f64,
    pub tau: f64,     // s
    pub ambient: f64, // value with zero input
    value: f64,
}

impl FirstOrderPlant {
    pub fn new(gain: f64, tau: f64, ambient: f64) -> Self {
        Self { gain, tau, ambient, value: ambient }
    }

    /// Heater warming a small chamber: 0.8 °C per % of heater drive above
    /// a 20 °C ambient, 10 s time constant.
    pub fn thermal() -> Self {
        Self::new(0.8, 10.0, 20.0)
    }

    /// Steady-state value for a constant input.
    pub fn equilibrium(&self, input: f64) -> f64 {
        self.ambient + self.gain * input
    }
}

impl Plant for FirstOrderPlant {
    fn output(&self) -> f64 {
        self.value
    }

    fn step(&mut self, input: f64, dt: f64) {
        let rate = (self.equilibrium(input) - self.value) / self.tau;
        self.value += rate * dt;
    }

    fn name(&self) -> &str {
        "first-order lag"
    }
}
