//! Run reporting: what happened, aggregated across cores.

use serde::Serialize;

use crate::common::Pid;
use crate::cpu::CpuReport;

/// The outcome of one simulation run.
///
/// Conservation invariant: every planned process appears in exactly one
/// core's `finished` or `failed` list — none lost, none duplicated.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Final value of the simulated clock.
    pub ticks: u64,
    /// Number of processes the configuration planned.
    pub num_processes: usize,
    /// Per-core activity, indexed by core id.
    pub cpus: Vec<CpuReport>,
}

impl RunReport {
    /// Processes that ran their full program.
    pub fn finished(&self) -> usize {
        self.cpus.iter().map(|c| c.finished.len()).sum()
    }

    /// Processes retired abnormally (memory exhaustion or access fault).
    pub fn failed(&self) -> usize {
        self.cpus.iter().map(|c| c.failed.len()).sum()
    }

    /// All normally-retired pids, sorted.
    pub fn finished_pids(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self
            .cpus
            .iter()
            .flat_map(|c| c.finished.iter().copied())
            .collect();
        pids.sort_unstable();
        pids
    }

    /// All abnormally-retired pids, sorted.
    pub fn failed_pids(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self
            .cpus
            .iter()
            .flat_map(|c| c.failed.iter().copied())
            .collect();
        pids.sort_unstable();
        pids
    }

    /// Prints a human-readable summary to stdout.
    pub fn print(&self) {
        println!("simulation complete: {} tick(s)", self.ticks);
        println!(
            "  processes: {} planned, {} finished, {} failed",
            self.num_processes,
            self.finished(),
            self.failed()
        );
        for cpu in &self.cpus {
            println!(
                "  cpu {}: {} dispatched, {} requeued, {} finished, {} failed",
                cpu.cpu,
                cpu.dispatched,
                cpu.requeued,
                cpu.finished.len(),
                cpu.failed.len()
            );
        }
    }
}
