use std::thread;
use std::time::Duration;

use pid_controller::sim::{FirstOrderPlant, Plant};
use pid_controller::{PidConfig, PidController};

/// Runs the controller against a simulated heater in real time, letting the
/// system clock supply the intervals. The loop sleeps a jittery period so
/// every update sees a different elapsed time.
fn main() -> Result<(), pid_controller::ConfigError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pid_controller=debug".into()),
        )
        .init();

    let mut pid = PidController::new(PidConfig::new(4.0, 0.5, 1.0, 100.0, 0.0))?;
    pid.set_target_value(40.0);

    let mut plant = FirstOrderPlant::new(0.8, 2.0, 20.0);
    pid.set_current_value(plant.output());

    println!("Driving {} toward {:.1} with the wall clock...", plant.name(), pid.target_value());
    for i in 0..100 {
        let period = Duration::from_millis(20 + (i * 7 % 15) as u64);
        thread::sleep(period);

        let output = pid.update(plant.output());
        plant.step(output, period.as_secs_f64());

        if let Some(terms) = pid.last_terms().filter(|_| i % 10 == 0) {
            println!(
                "dt={:>6.3}s  measured={:>6.2}  output={:>6.2}  P={:>7.2}  I={:>6.2}  D={:>6.2}",
                terms.dt, plant.output(), output, terms.proportional, terms.integral, terms.derivative
            );
        }
    }

    // Retune live; takes effect from the next update.
    pid.set_gains(2.0, 0.2, 0.5)?;
    let output = pid.update(plant.output());
    println!("After retune: output={:.2}, measured={:.2}", output, plant.output());
    Ok(())
}
