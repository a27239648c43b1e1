//! Single-queue FIFO discipline.
//!
//! The default: one queue, processes run in arrival order, every dispatch
//! gets the same configured time slice.

use std::collections::VecDeque;

use super::{SchedPolicy, SliceTable};
use crate::process::Pcb;

/// One FIFO ready queue.
#[derive(Debug)]
pub struct FifoQueue {
    queue: VecDeque<Pcb>,
    slices: SliceTable,
}

impl FifoQueue {
    /// Creates an empty queue with the given slice assignment.
    pub fn new(slices: SliceTable) -> Self {
        Self {
            queue: VecDeque::new(),
            slices,
        }
    }
}

impl SchedPolicy for FifoQueue {
    fn enqueue(&mut self, pcb: Pcb) {
        self.queue.push_back(pcb);
    }

    fn dequeue(&mut self) -> Option<Pcb> {
        self.queue.pop_front()
    }

    fn slice_for(&self, _prio: u32) -> u64 {
        self.slices.get(0)
    }
}
