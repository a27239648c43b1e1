//! Simulated clock and tick barrier.
//!
//! Every thread of the simulation — each CPU worker and the loader — owns a
//! [`TimerHandle`] and calls [`TimerHandle::next_slot`] exactly once per
//! tick. The call blocks until all currently attached participants have
//! arrived, then the shared slot counter increments exactly once and every
//! waiter is released. This lock-step barrier is the sole happens-before
//! edge between simulation threads: everything attributed to tick T is
//! visible to all participants before tick T+1 begins.
//!
//! The barrier is generation-counted over a *dynamic* participant set:
//! threads attach and detach over the lifetime of a run, and a detaching
//! participant effectively votes for all future ticks, so the remaining set
//! can never deadlock on an absent peer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::common::lock_unpoisoned;

/// Barrier bookkeeping, guarded by one mutex.
struct BarrierState {
    /// Participants currently required to arrive each round.
    registered: usize,
    /// Participants that have arrived in the current round.
    arrived: usize,
    /// Completed-round counter. Waiters block until it moves.
    generation: u64,
}

/// The shared simulated clock.
///
/// Construct once per run with [`Timer::new`], wrap in an [`Arc`], and hand
/// a [`TimerHandle`] from [`Timer::attach`] to every simulation thread.
pub struct Timer {
    state: Mutex<BarrierState>,
    round_done: Condvar,
    /// Current simulated time, readable without blocking.
    slot: AtomicU64,
    running: AtomicBool,
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("slot", &self.current_slot())
            .finish_non_exhaustive()
    }
}

impl Timer {
    /// Creates a stopped timer at slot 0 with no participants.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(BarrierState {
                registered: 0,
                arrived: 0,
                generation: 0,
            }),
            round_done: Condvar::new(),
            slot: AtomicU64::new(0),
            running: AtomicBool::new(false),
        })
    }

    /// Opens the run. Participants may attach before or after.
    pub fn start(&self) {
        self.running.store(true, Ordering::Release);
    }

    /// Closes the run and returns the final slot count.
    ///
    /// # Panics
    ///
    /// Panics if any participant is still attached: stopping a clock that
    /// threads are waiting on is an orchestration bug.
    pub fn stop(&self) -> u64 {
        let state = lock_unpoisoned(&self.state);
        assert!(
            state.registered == 0,
            "timer invariant violated: stop with {} participant(s) attached",
            state.registered
        );
        drop(state);
        self.running.store(false, Ordering::Release);
        self.current_slot()
    }

    /// Whether the run is between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Registers one participant and returns its handle.
    ///
    /// A participant attached mid-round is required for that round: the
    /// barrier is always defined by "however many are attached right now".
    pub fn attach(self: &Arc<Self>) -> TimerHandle {
        let mut state = lock_unpoisoned(&self.state);
        state.registered += 1;
        drop(state);
        TimerHandle {
            timer: Arc::clone(self),
            attached: true,
        }
    }

    /// Current simulated time. Non-blocking; safe from any thread.
    pub fn current_slot(&self) -> u64 {
        self.slot.load(Ordering::Acquire)
    }

    /// Completes the round and wakes all waiters. Caller holds the lock.
    fn release_round(&self, state: &mut BarrierState) {
        state.arrived = 0;
        state.generation += 1;
        // The tick advances exactly once per completed round.
        let _ = self.slot.fetch_add(1, Ordering::Release);
        self.round_done.notify_all();
    }
}

/// One participant's registration with the [`Timer`].
///
/// Dropping an attached handle detaches it, so a worker that simply returns
/// (or panics) never wedges the barrier for its peers.
#[derive(Debug)]
pub struct TimerHandle {
    timer: Arc<Timer>,
    attached: bool,
}

impl TimerHandle {
    /// Waits for the current tick to complete.
    ///
    /// Blocks until every attached participant has called `next_slot` for
    /// this round, after which the slot counter has advanced by exactly one.
    ///
    /// # Panics
    ///
    /// Panics if called after [`TimerHandle::detach`]: advancing a detached
    /// handle is an invariant violation, not a recoverable error.
    pub fn next_slot(&mut self) {
        assert!(
            self.attached,
            "timer invariant violated: next_slot on a detached handle"
        );
        let mut state = lock_unpoisoned(&self.timer.state);
        state.arrived += 1;
        if state.arrived == state.registered {
            self.timer.release_round(&mut state);
            return;
        }
        let generation = state.generation;
        while state.generation == generation {
            state = self
                .timer
                .round_done
                .wait(state)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }

    /// Removes this participant from the barrier's required set.
    ///
    /// Safe to call while peers are mid-wait: if this participant was the
    /// last arrival the round is missing, the round completes on its behalf.
    /// Idempotent only through [`Drop`]; calling `next_slot` afterwards
    /// panics.
    pub fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        let mut state = lock_unpoisoned(&self.timer.state);
        state.registered -= 1;
        if state.registered > 0 && state.arrived == state.registered {
            self.timer.release_round(&mut state);
        }
    }

    /// The clock this handle is attached to.
    pub fn timer(&self) -> &Arc<Timer> {
        &self.timer
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.detach();
    }
}
