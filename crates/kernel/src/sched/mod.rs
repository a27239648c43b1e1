//! Scheduler: the shared ready queue and its discipline.
//!
//! The queue discipline is a runtime strategy selected from configuration —
//! a single build supports both modes:
//! - [`fifo::FifoQueue`] — one FIFO queue, the default discipline.
//! - [`mlq::MlqQueue`] — 140 priority levels, FIFO within a level, strict
//!   priority across levels.
//!
//! One mutex serializes every enqueue/dequeue from the CPU workers and the
//! loader. Contention is not a concern at simulation scale; mutual
//! exclusion is the point, not throughput.

pub mod fifo;
pub mod mlq;

use std::sync::Mutex;

use crate::common::lock_unpoisoned;
use crate::config::SimConfig;
use crate::process::Pcb;

/// Per-level time-slice assignment for a discipline.
///
/// The base configuration only ever supplies a uniform slice, but the
/// contract accepts per-level variation so a discipline may shorten or
/// lengthen quanta by priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceTable {
    /// Every level runs the same quantum.
    Uniform(u64),
    /// Quantum per priority level; levels beyond the table use the last
    /// entry.
    PerLevel(Vec<u64>),
}

impl SliceTable {
    /// The quantum for a priority level.
    pub fn get(&self, level: usize) -> u64 {
        match self {
            Self::Uniform(slice) => *slice,
            Self::PerLevel(slices) => slices
                .get(level)
                .or_else(|| slices.last())
                .copied()
                .unwrap_or(1),
        }
    }
}

/// A ready-queue discipline: the `{enqueue, dequeue}` capability set.
///
/// Implementations hold PCBs by value; ownership moves in on `enqueue` and
/// out on `dequeue`, so a process can never sit in two queues at once.
pub trait SchedPolicy: Send {
    /// Inserts a ready process at the tail of its queue.
    fn enqueue(&mut self, pcb: Pcb);

    /// Removes and returns the next process to run, or `None` when every
    /// queue is empty. Non-blocking; the caller decides how to wait.
    fn dequeue(&mut self) -> Option<Pcb>;

    /// The time slice a process of the given priority receives on dispatch.
    fn slice_for(&self, prio: u32) -> u64;
}

/// The shared scheduler handed to every worker and the loader.
pub struct Scheduler {
    policy: Mutex<Box<dyn SchedPolicy>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler").finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Builds the discipline the configuration selects: multi-level queues
    /// when every process line carries a priority, single FIFO otherwise.
    pub fn from_config(config: &SimConfig) -> Self {
        let slices = SliceTable::Uniform(config.time_slice);
        if config.mlq() {
            Self::new(Box::new(mlq::MlqQueue::new(slices)))
        } else {
            Self::new(Box::new(fifo::FifoQueue::new(slices)))
        }
    }

    /// Wraps an explicit discipline.
    pub fn new(policy: Box<dyn SchedPolicy>) -> Self {
        Self {
            policy: Mutex::new(policy),
        }
    }

    /// Inserts a ready process.
    pub fn enqueue(&self, pcb: Pcb) {
        lock_unpoisoned(&self.policy).enqueue(pcb);
    }

    /// Takes the next process to run, if any.
    pub fn dequeue(&self) -> Option<Pcb> {
        lock_unpoisoned(&self.policy).dequeue()
    }

    /// The time slice to grant a process on dispatch.
    pub fn slice_for(&self, pcb: &Pcb) -> u64 {
        lock_unpoisoned(&self.policy).slice_for(pcb.prio)
    }
}
