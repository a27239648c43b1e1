//! Common types and constants shared across the simulator.
//!
//! This module provides:
//! 1. **Identifiers:** The process identifier type.
//! 2. **Constants:** Paging geometry, register file size, priority range.
//! 3. **Errors:** Configuration and memory error taxonomies.

pub mod constants;
pub mod error;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Identifier of a simulated process. Assigned sequentially by the loader,
/// starting at 1.
pub type Pid = u32;

/// Locks a mutex, recovering the guard if a peer thread panicked while
/// holding it. Shared queue and frame-table state stays structurally valid
/// across a panic, and invariant violations abort the run loudly elsewhere.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
