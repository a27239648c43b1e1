//! Discrete-time multicore operating system simulator.
//!
//! This crate models an OS kernel executing a workload of processes on
//! several virtual CPU cores:
//! 1. **Clock:** A generation-counted tick barrier keeps every worker
//!    thread and the loader in lock-step simulated time.
//! 2. **Scheduler:** A shared ready queue with a runtime-selected
//!    discipline (single FIFO or 140-level multi-level priority queues).
//! 3. **Memory:** An optional paging subsystem — one RAM region, up to four
//!    swap devices, per-process page tables, FIFO victim selection.
//! 4. **Loader:** A thread that injects processes at their configured start
//!    ticks.
//! 5. **Driver:** Orchestration of one run and the aggregated report.

/// Shared identifiers, constants, and error taxonomies.
pub mod common;
/// Configuration parsing and validation.
pub mod config;
/// CPU worker: one virtual core's execute loop.
pub mod cpu;
/// Paging memory manager: physical regions and per-process contexts.
pub mod mem;
/// PCB, program representation, and single-step execution.
pub mod process;
/// Ready queue and scheduling disciplines.
pub mod sched;
/// Workload loading and run orchestration.
pub mod sim;
/// Run reporting.
pub mod stats;
/// Simulated clock and tick barrier.
pub mod timer;

/// Fatal pre-run configuration errors.
pub use crate::common::error::ConfigError;
/// Contained per-process memory failures.
pub use crate::common::error::MemError;
/// Parsed run configuration; build with [`SimConfig::from_path`].
pub use crate::config::SimConfig;
/// The driver; [`Simulation::run`] executes one configured workload.
pub use crate::sim::Simulation;
/// Aggregated outcome of a run.
pub use crate::stats::RunReport;
/// The shared simulated clock.
pub use crate::timer::Timer;
