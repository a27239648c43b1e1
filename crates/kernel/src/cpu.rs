//! CPU worker: one virtual core's execute loop.
//!
//! Each worker is a small state machine — `{idle, running with remaining
//! slice N}` — that makes at most one scheduling transition and executes at
//! most one instruction-unit per barrier-gated tick:
//!
//! 1. Idle: dequeue. Nothing ready and the workload is complete → stop.
//!    Nothing ready but the loader may still produce → skip to the barrier.
//! 2. Held process finished → retire it (drop), dequeue a replacement.
//! 3. Slice exhausted → requeue it, dequeue a replacement.
//! 4. Execute one instruction-unit; a memory failure retires the process
//!    abnormally without touching the rest of the workload.
//! 5. Decrement the slice, wait on the barrier, loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::common::Pid;
use crate::process::Pcb;
use crate::sched::Scheduler;
use crate::timer::TimerHandle;

/// What one core did over the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CpuReport {
    /// Core index.
    pub cpu: usize,
    /// Dispatch events (a process granted a fresh slice).
    pub dispatched: u64,
    /// Requeue events (slice expiry).
    pub requeued: u64,
    /// Pids retired normally on this core, in retirement order.
    pub finished: Vec<Pid>,
    /// Pids retired abnormally on this core, in retirement order.
    pub failed: Vec<Pid>,
}

/// One virtual core. Consumes itself on [`CpuWorker::run`]; the returned
/// report is the only thing that survives the thread.
#[derive(Debug)]
pub struct CpuWorker {
    id: usize,
    sched: Arc<Scheduler>,
    handle: TimerHandle,
    workload_done: Arc<AtomicBool>,
}

impl CpuWorker {
    /// Creates a worker for core `id`, already attached to the barrier.
    pub fn new(
        id: usize,
        sched: Arc<Scheduler>,
        handle: TimerHandle,
        workload_done: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            sched,
            handle,
            workload_done,
        }
    }

    /// Runs the core until the workload is exhausted.
    pub fn run(mut self) -> CpuReport {
        let mut report = CpuReport {
            cpu: self.id,
            ..CpuReport::default()
        };
        let mut proc: Option<Pcb> = None;
        let mut time_left: u64 = 0;

        loop {
            if proc.is_none() {
                proc = self.sched.dequeue();
                if proc.is_none() {
                    if self.workload_done.load(Ordering::Acquire) {
                        break;
                    }
                    // The loader may still produce; idle through this tick.
                    self.handle.next_slot();
                    continue;
                }
            } else if let Some(pcb) = proc.take_if(|p| p.finished()) {
                info!(
                    cpu = self.id,
                    pid = pcb.pid,
                    tick = self.tick(),
                    "process finished"
                );
                report.finished.push(pcb.pid);
                // Retirement is dropping the uniquely-owned PCB.
                drop(pcb);
                proc = self.sched.dequeue();
                time_left = 0;
            } else if time_left == 0 {
                if let Some(pcb) = proc.take() {
                    info!(
                        cpu = self.id,
                        pid = pcb.pid,
                        tick = self.tick(),
                        "process requeued"
                    );
                    report.requeued += 1;
                    self.sched.enqueue(pcb);
                }
                proc = self.sched.dequeue();
            }

            // Re-examine after the dequeue attempts above.
            match &proc {
                None if self.workload_done.load(Ordering::Acquire) => break,
                None => {
                    self.handle.next_slot();
                    continue;
                }
                Some(pcb) if time_left == 0 => {
                    time_left = self.sched.slice_for(pcb);
                    info!(
                        cpu = self.id,
                        pid = pcb.pid,
                        tick = self.tick(),
                        slice = time_left,
                        "process dispatched"
                    );
                    report.dispatched += 1;
                }
                Some(_) => {}
            }

            if let Some(pcb) = proc.as_mut() {
                match pcb.step() {
                    Ok(()) => time_left = time_left.saturating_sub(1),
                    Err(err) => {
                        warn!(
                            cpu = self.id,
                            pid = pcb.pid,
                            tick = self.tick(),
                            %err,
                            "process failed"
                        );
                        report.failed.push(pcb.pid);
                        proc = None;
                        time_left = 0;
                    }
                }
            }
            self.handle.next_slot();
        }

        info!(cpu = self.id, tick = self.tick(), "cpu stopped");
        self.handle.detach();
        report
    }

    fn tick(&self) -> u64 {
        self.handle.timer().current_slot()
    }
}
