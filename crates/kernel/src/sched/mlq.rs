//! Multi-level queue discipline.
//!
//! 140 priority levels (0 is the most urgent), FIFO within a level.
//! `dequeue` scans levels from most to least urgent and pops the head of
//! the first non-empty one: strict priority with FIFO tie-break.
//!
//! There is deliberately no aging or starvation compensation: a steady
//! supply of urgent processes starves lower levels. That is the documented
//! behavior of the discipline, not an oversight.

use std::collections::VecDeque;

use super::{SchedPolicy, SliceTable};
use crate::common::constants::PRIO_LEVELS;
use crate::process::Pcb;

/// Priority-ordered set of FIFO ready queues.
#[derive(Debug)]
pub struct MlqQueue {
    levels: Vec<VecDeque<Pcb>>,
    slices: SliceTable,
}

impl MlqQueue {
    /// Creates empty queues for every priority level.
    pub fn new(slices: SliceTable) -> Self {
        Self {
            levels: (0..PRIO_LEVELS).map(|_| VecDeque::new()).collect(),
            slices,
        }
    }
}

impl SchedPolicy for MlqQueue {
    /// Appends to the tail of the queue matching the process's priority.
    ///
    /// # Panics
    ///
    /// Panics on a priority outside the level range; configuration
    /// validation bounds priorities before any PCB exists.
    fn enqueue(&mut self, pcb: Pcb) {
        let level = pcb.prio as usize;
        assert!(
            level < PRIO_LEVELS,
            "scheduler invariant violated: priority {level} out of range"
        );
        self.levels[level].push_back(pcb);
    }

    fn dequeue(&mut self) -> Option<Pcb> {
        self.levels.iter_mut().find_map(VecDeque::pop_front)
    }

    fn slice_for(&self, prio: u32) -> u64 {
        self.slices.get(prio as usize)
    }
}
