//! Simulation orchestration: workload loading and the driver.

pub mod loader;
pub mod simulator;

pub use simulator::Simulation;
