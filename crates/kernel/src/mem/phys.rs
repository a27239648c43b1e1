//! Physical memory regions: RAM and swap devices.
//!
//! A [`MemPhy`] is a fixed-size byte store carved into page-sized frames,
//! with a frame table mapping frame index to its owning (pid, virtual page)
//! pair. The same shape serves both the single shared RAM region and each
//! swap device; swap "slots" are just frames of an overflow region.
//!
//! All frame-table mutation happens under the region's own mutex, taken for
//! the duration of one operation only. Victim selection during a page fault
//! therefore never holds more than one region lock at a time.

use std::sync::Mutex;

use crate::common::constants::PAGE_SIZE;
use crate::common::{lock_unpoisoned, Pid};

/// The process page that currently occupies a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOwner {
    /// Owning process.
    pub pid: Pid,
    /// Virtual page number within the owner's address space.
    pub vpage: usize,
}

struct PhysState {
    data: Vec<u8>,
    owner: Vec<Option<PageOwner>>,
    /// Free frame indices; kept so that `pop` yields the lowest index.
    free: Vec<usize>,
}

/// One physical region: byte store plus frame-allocation table.
pub struct MemPhy {
    state: Mutex<PhysState>,
    frames: usize,
}

impl std::fmt::Debug for MemPhy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemPhy")
            .field("frames", &self.frames)
            .field("free", &self.free_frames())
            .finish()
    }
}

impl MemPhy {
    /// Creates a region of `bytes` rounded down to whole frames.
    pub fn new(bytes: usize) -> Self {
        let frames = bytes / PAGE_SIZE;
        Self {
            state: Mutex::new(PhysState {
                data: vec![0; frames * PAGE_SIZE],
                owner: vec![None; frames],
                free: (0..frames).rev().collect(),
            }),
            frames,
        }
    }

    /// Total frame capacity of the region.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Number of unoccupied frames.
    pub fn free_frames(&self) -> usize {
        lock_unpoisoned(&self.state).free.len()
    }

    /// Claims a free frame for `owner`, zero-filling its contents.
    /// Returns `None` when the region is full.
    pub fn claim(&self, owner: PageOwner) -> Option<usize> {
        let mut state = lock_unpoisoned(&self.state);
        let frame = state.free.pop()?;
        state.data[frame * PAGE_SIZE..(frame + 1) * PAGE_SIZE].fill(0);
        state.owner[frame] = Some(owner);
        Some(frame)
    }

    /// Transfers an occupied frame to a new owner, zero-filling it.
    ///
    /// Used on the fault path to hand a just-evicted frame to the faulting
    /// page without bouncing it through the free list.
    ///
    /// # Panics
    ///
    /// Panics if the frame is unowned: reassigning a free frame means the
    /// caller's residency bookkeeping is corrupt.
    pub fn reassign(&self, frame: usize, owner: PageOwner) {
        let mut state = lock_unpoisoned(&self.state);
        assert!(
            state.owner[frame].is_some(),
            "frame table invariant violated: reassign of free frame {frame}"
        );
        state.data[frame * PAGE_SIZE..(frame + 1) * PAGE_SIZE].fill(0);
        state.owner[frame] = Some(owner);
    }

    /// Releases a frame back to the free list.
    ///
    /// # Panics
    ///
    /// Panics on a double release; that is a page-table/frame-table
    /// consistency violation, never a recoverable condition.
    pub fn release(&self, frame: usize) {
        let mut state = lock_unpoisoned(&self.state);
        assert!(
            state.owner[frame].take().is_some(),
            "frame table invariant violated: double release of frame {frame}"
        );
        state.free.push(frame);
    }

    /// The (pid, vpage) pair occupying a frame, if any.
    pub fn owner_of(&self, frame: usize) -> Option<PageOwner> {
        lock_unpoisoned(&self.state).owner[frame]
    }

    /// Reads one byte from an occupied frame.
    pub fn read_byte(&self, frame: usize, offset: usize) -> u8 {
        debug_assert!(offset < PAGE_SIZE);
        lock_unpoisoned(&self.state).data[frame * PAGE_SIZE + offset]
    }

    /// Writes one byte into an occupied frame.
    pub fn write_byte(&self, frame: usize, offset: usize, value: u8) {
        debug_assert!(offset < PAGE_SIZE);
        lock_unpoisoned(&self.state).data[frame * PAGE_SIZE + offset] = value;
    }

    /// Copies a whole frame out into an owned buffer.
    pub fn copy_out(&self, frame: usize) -> Vec<u8> {
        let state = lock_unpoisoned(&self.state);
        state.data[frame * PAGE_SIZE..(frame + 1) * PAGE_SIZE].to_vec()
    }

    /// Copies a page-sized buffer into a frame.
    pub fn copy_in(&self, frame: usize, page: &[u8]) {
        debug_assert_eq!(page.len(), PAGE_SIZE);
        let mut state = lock_unpoisoned(&self.state);
        state.data[frame * PAGE_SIZE..(frame + 1) * PAGE_SIZE].copy_from_slice(page);
    }
}
