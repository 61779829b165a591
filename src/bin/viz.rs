use eframe::egui;
use egui_plot::{Legend, Line, Plot, PlotPoints};

use pid_controller::sim::{self, FirstOrderPlant, Sample, SimConfig};
use pid_controller::PidConfig;

fn main() -> eframe::Result {
    let pid_config = PidConfig::new(4.0, 0.5, 1.0, 100.0, 0.0);
    let config = SimConfig { dt: 0.02, max_time: 90.0, setpoint: 60.0 };
    let mut plant = FirstOrderPlant::thermal();
    let samples = match sim::simulate_step(&pid_config, &mut plant, &config) {
        Ok(samples) => samples,
        Err(err) => {
            eprintln!("invalid controller configuration: {err}");
            std::process::exit(1);
        }
    };

    let app = PidViz { samples, pid_config };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native("PID Step Response", options, Box::new(|_| Ok(Box::new(app))))
}

struct PidViz {
    samples: Vec<Sample>,
    pid_config: PidConfig,
}

impl eframe::App for PidViz {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let step = (self.samples.len() / 2000).max(1);
        let sampled: Vec<&Sample> = self.samples.iter().step_by(step).collect();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            let cfg = &self.pid_config;
            ui.heading(format!("Kp {:.3}  Ki {:.3}  Kd {:.3}", cfg.kp, cfg.ki, cfg.kd));
            ui.label(format!(
                "Output range: [{:.1}, {:.1}]  |  Final: {:.2}  |  Duration: {:.0} s",
                cfg.output_min,
                cfg.output_max,
                self.samples.last().map_or(0.0, |s| s.measurement),
                self.samples.last().map_or(0.0, |s| s.time),
            ));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let half_h = available.y / 2.0 - 8.0;

            // Measurement vs setpoint
            ui.label("Process variable");
            let measured: PlotPoints = sampled.iter().map(|s| [s.time, s.measurement]).collect();
            let target: PlotPoints = sampled.iter().map(|s| [s.time, s.setpoint]).collect();
            Plot::new("response")
                .height(half_h)
                .x_axis_label("Time (s)")
                .legend(Legend::default())
                .show(ui, |plot_ui| {
                    plot_ui.line(Line::new("Measured", measured));
                    plot_ui.line(Line::new("Setpoint", target));
                });

            // Actuator drive and integral accumulator
            ui.label("Controller output");
            let output: PlotPoints = sampled.iter().map(|s| [s.time, s.output]).collect();
            let integral: PlotPoints = sampled.iter().map(|s| [s.time, s.integral]).collect();
            Plot::new("output")
                .height(half_h)
                .x_axis_label("Time (s)")
                .legend(Legend::default())
                .show(ui, |plot_ui| {
                    plot_ui.line(Line::new("Output", output));
                    plot_ui.line(Line::new("Integral", integral));
                });
        });
    }
}
