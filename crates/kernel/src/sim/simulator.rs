//! The driver: wires clock, scheduler, memory, loader, and CPU workers
//! together for one run.
//!
//! All shared state — the timer, the scheduler, the done flag, the physical
//! memory regions — is built here, scoped to the run, and passed to each
//! thread by `Arc`. Nothing is a process-wide singleton; two simulations
//! can run side by side in one process (the tests do exactly that).

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use crate::common::constants::MAX_PRIO;
use crate::common::error::ConfigError;
use crate::config::SimConfig;
use crate::cpu::CpuWorker;
use crate::mem::SystemMemory;
use crate::process::Program;
use crate::sched::Scheduler;
use crate::sim::loader::{self, LoaderTask, PlannedPcb};
use crate::stats::RunReport;
use crate::timer::Timer;

/// A complete simulation run. Stateless; [`Simulation::run`] does all the
/// work and returns the aggregated report.
#[derive(Debug)]
pub struct Simulation;

impl Simulation {
    /// Runs the configured workload to completion.
    ///
    /// Every program file is read and validated before any thread starts:
    /// configuration errors abort here, with the run never begun. Once the
    /// threads are up, the only errors that remain are per-process memory
    /// failures, which are contained and reported in the [`RunReport`].
    pub fn run(config: &SimConfig, proc_dir: &Path) -> Result<RunReport, ConfigError> {
        config.validate()?;
        let plan = Self::resolve_plan(config, proc_dir)?;

        let timer = Timer::new();
        let sched = Arc::new(Scheduler::from_config(config));
        let workload_done = Arc::new(AtomicBool::new(false));
        let memory = config.memory.as_ref().map(SystemMemory::new);

        // Attach every participant before any thread runs, so the first
        // barrier round already requires the full set.
        let loader_handle = timer.attach();
        let worker_handles: Vec<_> = (0..config.num_cpus).map(|_| timer.attach()).collect();
        timer.start();

        let loader_task = LoaderTask {
            plan,
            sched: Arc::clone(&sched),
            handle: loader_handle,
            workload_done: Arc::clone(&workload_done),
            memory,
        };
        let loader_thread = spawn_named("loader", move || loader_task.run());

        let mut cpu_threads = Vec::with_capacity(config.num_cpus);
        for (id, handle) in worker_handles.into_iter().enumerate() {
            let worker = CpuWorker::new(
                id,
                Arc::clone(&sched),
                handle,
                Arc::clone(&workload_done),
            );
            cpu_threads.push(spawn_named(&format!("cpu-{id}"), move || worker.run()));
        }

        let mut cpus = Vec::with_capacity(cpu_threads.len());
        for thread in cpu_threads {
            cpus.push(join_or_propagate(thread));
        }
        join_or_propagate(loader_thread);
        let ticks = timer.stop();

        Ok(RunReport {
            ticks,
            num_processes: config.processes.len(),
            cpus,
        })
    }

    /// Loads every program file and resolves effective priorities.
    /// Processes sharing a file share one loaded [`Program`].
    fn resolve_plan(config: &SimConfig, proc_dir: &Path) -> Result<Vec<PlannedPcb>, ConfigError> {
        let mut cache: HashMap<String, Arc<Program>> = HashMap::new();
        let mut plan = Vec::with_capacity(config.processes.len());
        for entry in &config.processes {
            let program = match cache.get(&entry.file) {
                Some(program) => Arc::clone(program),
                None => {
                    let loaded = Arc::new(loader::load_program(&proc_dir.join(&entry.file))?);
                    cache.insert(entry.file.clone(), Arc::clone(&loaded));
                    loaded
                }
            };
            if !config.paging() && program.uses_memory() {
                return Err(ConfigError::Invalid(format!(
                    "process `{}` uses memory instructions but paging is disabled",
                    entry.file
                )));
            }
            let prio = entry.prio.unwrap_or(program.default_prio);
            if prio > MAX_PRIO {
                return Err(ConfigError::Invalid(format!(
                    "priority {prio} in `{}` exceeds the maximum {MAX_PRIO}",
                    entry.file
                )));
            }
            plan.push(PlannedPcb {
                start_time: entry.start_time,
                prio,
                program,
            });
        }
        Ok(plan)
    }
}

fn spawn_named<T: Send + 'static>(
    name: &str,
    task: impl FnOnce() -> T + Send + 'static,
) -> thread::JoinHandle<T> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(task)
        .unwrap_or_else(|e| panic!("failed to spawn {name} thread: {e}"))
}

/// Joins a simulation thread, re-raising its panic on the driver thread so
/// invariant violations stay loud instead of vanishing with a worker.
fn join_or_propagate<T>(handle: thread::JoinHandle<T>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}
