//! Error taxonomies for the simulator.
//!
//! Two families exist with very different blast radii:
//! 1. [`ConfigError`] — fatal. Reported before any simulation thread starts;
//!    the run never begins.
//! 2. [`MemError`] — contained. Surfaced as the failure of the one process
//!    that hit it; the rest of the workload continues.
//!
//! Invariant violations (barrier misuse, double ownership of a PCB) are not
//! represented here: they are programming errors and panic immediately.

use std::path::PathBuf;

use thiserror::Error;

use super::Pid;

/// Fatal configuration problems detected before the simulation starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration or a process program file could not be read.
    #[error("cannot read {path}: {source}")]
    Unreadable {
        /// Path that failed to open or read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A line in a configuration or program file did not parse.
    #[error("{path}:{line}: {reason}")]
    Malformed {
        /// File containing the bad line.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Human-readable description of the problem.
        reason: String,
    },

    /// The file parsed but the resulting configuration is unusable
    /// (zero CPUs, paging without swap, priority out of range, ...).
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Per-process memory failures. Retires the faulting process abnormally;
/// never aborts the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemError {
    /// RAM and every swap region are exhausted.
    #[error("pid {pid}: out of memory, RAM and all swap regions exhausted")]
    OutOfMemory {
        /// Process whose allocation or fault could not be served.
        pid: Pid,
    },

    /// Access to a virtual address with no mapped page.
    #[error("pid {pid}: segmentation fault at address {addr:#x}")]
    Segfault {
        /// Faulting process.
        pid: Pid,
        /// Unmapped virtual address.
        addr: usize,
    },

    /// A memory instruction named a register that holds no region.
    #[error("pid {pid}: register {reg} holds no allocated region")]
    BadRegister {
        /// Faulting process.
        pid: Pid,
        /// Register slot named by the instruction.
        reg: usize,
    },

    /// A register slot already holds a region and cannot be re-allocated
    /// without an intervening `free`.
    #[error("pid {pid}: register {reg} already holds a region")]
    RegionInUse {
        /// Faulting process.
        pid: Pid,
        /// Register slot named by the instruction.
        reg: usize,
    },

    /// An access offset escapes the region held by the named register.
    #[error("pid {pid}: offset {offset:#x} escapes the region in register {reg}")]
    OutOfRegion {
        /// Faulting process.
        pid: Pid,
        /// Register slot naming the region.
        reg: usize,
        /// Offending byte offset.
        offset: usize,
    },

    /// A memory instruction executed in a run with paging disabled.
    /// Configuration validation rejects such workloads up front; this
    /// variant exists so the executor never has to panic.
    #[error("pid {pid}: memory instruction in a non-paging run")]
    PagingDisabled {
        /// Faulting process.
        pid: Pid,
    },
}
