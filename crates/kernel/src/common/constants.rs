//! Baseline simulator constants.
//!
//! These mirror the fixed geometry of the simulated machine: page size,
//! swap device count, per-process register file, and the priority range of
//! the multi-level queue discipline.

/// Size of one virtual/physical page in bytes.
pub const PAGE_SIZE: usize = 256;

/// Number of swap device slots in a configuration line. A declared size of
/// zero marks the slot unused.
pub const MAX_SWAP_REGIONS: usize = 4;

/// Registers in a process's register file. Memory instructions name regions
/// and byte destinations through these slots.
pub const NUM_REGS: usize = 10;

/// Highest (numerically largest, least urgent) priority level. Levels run
/// from 0 (most urgent) to `MAX_PRIO` inclusive.
pub const MAX_PRIO: u32 = 139;

/// Number of distinct priority levels in multi-level queue mode.
pub const PRIO_LEVELS: usize = MAX_PRIO as usize + 1;
