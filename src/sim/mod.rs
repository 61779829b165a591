pub mod plant;
pub mod runner;

pub use plant::{FirstOrderPlant, Plant};
pub use runner::{simulate_step, simulate_with, Sample, SimConfig};
