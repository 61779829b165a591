use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::config::PidConfig;
use crate::sim::Sample;

/// Band around the setpoint counted as settled, as a fraction of the step.
const SETTLING_BAND: f64 = 0.02;

/// Step-response figures computed from a closed-loop run.
#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub initial: f64,
    pub setpoint: f64,
    /// 10 % to 90 % of the step, if both were reached.
    pub rise_time_s: Option<f64>,
    pub overshoot_pct: f64,
    /// Time after which the measurement stayed within 2 % of the step.
    pub settling_time_s: Option<f64>,
    pub steady_state_error: f64,
    pub saturated_fraction: f64,
}

impl StepSummary {
    /// Compute the summary from samples produced by
    /// [`simulate_step`](crate::sim::simulate_step).
    pub fn from_samples(samples: &[Sample], output_min: f64, output_max: f64) -> Option<Self> {
        let first = samples.first()?;
        let last = samples.last()?;
        let initial = first.measurement;
        let setpoint = last.setpoint;
        let step = setpoint - initial;

        let progress = |s: &Sample| if step != 0.0 { (s.measurement - initial) / step } else { 1.0 };

        let t10 = samples.iter().find(|s| progress(*s) >= 0.1).map(|s| s.time);
        let t90 = samples.iter().find(|s| progress(*s) >= 0.9).map(|s| s.time);
        let rise_time_s = match (t10, t90) {
            (Some(a), Some(b)) if step != 0.0 => Some(b - a),
            _ => None,
        };

        let peak = samples.iter().map(progress).fold(f64::NEG_INFINITY, f64::max);
        let overshoot_pct = ((peak - 1.0) * 100.0).max(0.0);

        let band = SETTLING_BAND * step.abs();
        let mut settled_since = None;
        for s in samples {
            if (s.measurement - setpoint).abs() <= band {
                settled_since.get_or_insert(s.time);
            } else {
                settled_since = None;
            }
        }

        let saturated = samples[1..]
            .iter()
            .filter(|s| s.output <= output_min || s.output >= output_max)
            .count();
        let updates = samples.len().saturating_sub(1).max(1);

        Some(StepSummary {
            initial,
            setpoint,
            rise_time_s,
            overshoot_pct,
            settling_time_s: settled_since,
            steady_state_error: setpoint - last.measurement,
            saturated_fraction: saturated as f64 / updates as f64,
        })
    }
}

#[derive(Serialize)]
struct Report<'a> {
    controller: &'a PidConfig,
    response: &'a StepSummary,
}

/// Write the controller configuration and step summary as JSON.
pub fn write_summary<W: Write>(
    writer: &mut W,
    config: &PidConfig,
    summary: &StepSummary,
) -> io::Result<()> {
    let report = Report { controller: config, response: summary };
    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writeln!(writer)
}

/// Write the summary JSON to a file.
pub fn write_summary_file<P: AsRef<Path>>(
    path: P,
    config: &PidConfig,
    summary: &StepSummary,
) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_summary(&mut file, config, summary)
}
