//! Unit tests, one module per subsystem.

/// Configuration parsing and validation.
pub mod config;
/// Workload loader: program parsing and start-tick injection.
pub mod loader;
/// End-to-end simulation runs.
pub mod simulation;
