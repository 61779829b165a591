use std::process::ExitCode;

use pid_controller::io::{csv, json};
use pid_controller::sim::{self, FirstOrderPlant, Plant, SimConfig};
use pid_controller::PidConfig;

/// Usage: pid-controller [CONFIG.toml] [RESPONSE.csv] [SUMMARY.json]
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let app_name = env!("CARGO_PKG_NAME").replace('-', "_");
            format!("{app_name}=info").into()
        }))
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next();
    let csv_path = args.next();
    let json_path = args.next();

    // -----------------------------------------------------------------------
    // Controller: heater drive 0..100 %
    // -----------------------------------------------------------------------
    let pid_config = match config_path {
        Some(path) => match PidConfig::load(&path) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::error!(%path, %err, "could not load controller configuration");
                return ExitCode::FAILURE;
            }
        },
        None => PidConfig::new(4.0, 0.5, 1.0, 100.0, 0.0),
    };

    let sim_config = SimConfig { dt: 0.05, max_time: 90.0, setpoint: 60.0 };
    let mut plant = FirstOrderPlant::thermal();
    let initial = plant.output();

    // -----------------------------------------------------------------------
    // Run closed loop
    // -----------------------------------------------------------------------
    let samples = match sim::simulate_step(&pid_config, &mut plant, &sim_config) {
        Ok(samples) => samples,
        Err(err) => {
            tracing::error!(%err, "could not run simulation");
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = csv_path {
        if let Err(err) = csv::write_response_file(&path, &samples) {
            tracing::error!(%path, %err, "could not write response");
            return ExitCode::FAILURE;
        }
        tracing::info!(%path, rows = samples.len(), "response written");
    }

    // -----------------------------------------------------------------------
    // Print results
    // -----------------------------------------------------------------------
    println!();
    println!("====================================================================");
    println!("  PID STEP RESPONSE — {}", plant.name());
    println!("====================================================================");
    println!();
    println!("  Controller");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Kp: {:>8.3}    Ki: {:>8.3}    Kd: {:>8.3}",
        pid_config.kp, pid_config.ki, pid_config.kd
    );
    println!(
        "  Output range:  [{:.1}, {:.1}]    Min derivative interval: {} s",
        pid_config.output_min, pid_config.output_max, pid_config.min_dt
    );
    println!(
        "  Step:          {:.1} -> {:.1}    dt={} s",
        initial, sim_config.setpoint, sim_config.dt
    );
    println!();

    println!("  Response");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>7}  {:>10}  {:>10}  {:>10}  {:>10}",
        "t (s)", "setpoint", "measured", "output", "integral"
    );
    println!("  {}", "─".repeat(55));

    let sample_interval = (samples.len() / 30).max(1);
    for (i, s) in samples.iter().enumerate() {
        if i % sample_interval != 0 && i != samples.len() - 1 {
            continue;
        }
        println!(
            "  {:>7.2}  {:>10.2}  {:>10.2}  {:>10.2}  {:>10.2}",
            s.time, s.setpoint, s.measurement, s.output, s.integral
        );
    }
    println!();

    if let Some(summary) =
        json::StepSummary::from_samples(&samples, pid_config.output_min, pid_config.output_max)
    {
        println!("  Summary");
        println!("  ──────────────────────────────────────────────────────────────────");
        let stdout = std::io::stdout();
        if let Err(err) = json::write_summary(&mut stdout.lock(), &pid_config, &summary) {
            tracing::error!(%err, "could not write summary");
            return ExitCode::FAILURE;
        }
        if let Some(path) = json_path {
            if let Err(err) = json::write_summary_file(&path, &pid_config, &summary) {
                tracing::error!(%path, %err, "could not write summary");
                return ExitCode::FAILURE;
            }
            tracing::info!(%path, "summary written");
        }
    }
    println!("====================================================================");
    println!();

    ExitCode::SUCCESS
}
