//! End-to-end runs over real workload directories.
//!
//! Intra-tick interleavings between CPUs are unordered, so these tests
//! assert aggregate counts and conservation properties, never exact tick
//! numbers for individual dispatches.

use std::path::Path;

use ossim_core::{RunReport, SimConfig, Simulation};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use crate::common::{calc_program_text, init_tracing, write_program};

/// Parses the config text and runs it against a workload directory.
fn run(config: &str, proc_dir: &Path) -> RunReport {
    init_tracing();
    let config = SimConfig::parse(config, Path::new("test.cfg")).expect("config");
    Simulation::run(&config, proc_dir).expect("simulation run")
}

fn dispatched(report: &RunReport) -> u64 {
    report.cpus.iter().map(|c| c.dispatched).sum()
}

fn requeued(report: &RunReport) -> u64 {
    report.cpus.iter().map(|c| c.requeued).sum()
}

#[test]
fn single_cpu_slice_accounting() {
    let dir = TempDir::new().expect("workload dir");
    write_program(dir.path(), "a", &calc_program_text(0, 3));
    write_program(dir.path(), "b", &calc_program_text(0, 2));

    // Slice 1: every instruction costs one dispatch, and every dispatch
    // except a process's last ends in a requeue.
    let report = run("1 1 2\n0 a\n0 b\n", dir.path());
    assert_eq!(report.finished(), 2);
    assert_eq!(report.failed(), 0);
    assert_eq!(dispatched(&report), 5);
    assert_eq!(requeued(&report), 3);
    assert_eq!(report.finished_pids(), vec![1, 2]);
}

#[test]
fn every_process_finishes_across_four_cpus() {
    let dir = TempDir::new().expect("workload dir");
    write_program(dir.path(), "work", &calc_program_text(0, 9));

    let mut config = String::from("2 4 8\n");
    for _ in 0..8 {
        config.push_str("0 work\n");
    }
    let report = run(&config, dir.path());
    assert_eq!(report.finished(), 8);
    assert_eq!(report.failed(), 0);
    assert_eq!(report.finished_pids(), (1..=8).collect::<Vec<_>>());
    // 9 instructions at slice 2 is at least 5 dispatches per process.
    assert!(dispatched(&report) >= 40, "dispatched {}", dispatched(&report));
}

#[test]
fn mlq_workload_runs_to_completion() {
    let dir = TempDir::new().expect("workload dir");
    write_program(dir.path(), "bg", &calc_program_text(130, 4));
    write_program(dir.path(), "fg", &calc_program_text(1, 4));

    let report = run("2 2 3\n0 bg 130\n0 fg 1\n1 fg 1\n", dir.path());
    assert_eq!(report.finished(), 3);
    assert_eq!(report.failed(), 0);
}

#[test]
fn paging_workload_runs_to_completion() {
    let dir = TempDir::new().expect("workload dir");
    // More pages than RAM holds: the run only completes if eviction and
    // fault-back preserve the written bytes.
    write_program(
        dir.path(),
        "mem",
        "0 7\n\
         alloc 512 0\n\
         write 77 0 10\n\
         alloc 1024 1\n\
         write 9 1 700\n\
         read 0 10 2\n\
         free 1\n\
         free 0\n",
    );
    let report = run("2 1 2\n1024 4096 0 0 0\n0 mem\n0 mem\n", dir.path());
    assert_eq!(report.finished(), 2);
    assert_eq!(report.failed(), 0);
}

#[test]
fn memory_exhaustion_fails_only_the_hog() {
    let dir = TempDir::new().expect("workload dir");
    // One RAM page plus one swap page in total; the hog asks for eight.
    write_program(dir.path(), "hog", "0 2\nalloc 2048 0\ncalc\n");
    write_program(dir.path(), "calc", &calc_program_text(0, 4));

    let report = run("1 1 2\n256 256 0 0 0\n0 hog\n0 calc\n", dir.path());
    assert_eq!(report.failed(), 1);
    assert_eq!(report.finished(), 1);
    assert_eq!(report.failed_pids(), vec![1]);
    assert_eq!(report.finished_pids(), vec![2]);
}

#[test]
fn a_zero_instruction_program_aborts_before_the_run_starts() {
    init_tracing();
    let dir = TempDir::new().expect("workload dir");
    write_program(dir.path(), "empty", "0 0\n");

    let config = SimConfig::parse("1 1 1\n0 empty\n", Path::new("test.cfg")).expect("config");
    let err = Simulation::run(&config, dir.path()).expect_err("must be rejected up front");
    assert!(
        matches!(err, ossim_core::ConfigError::Malformed { .. }),
        "{err}"
    );
}

#[test]
fn a_workload_with_no_processes_terminates() {
    let dir = TempDir::new().expect("workload dir");
    let report = run("3 2 0\n", dir.path());
    assert_eq!(report.finished(), 0);
    assert_eq!(report.failed(), 0);
    assert_eq!(report.num_processes, 0);
}

#[test]
fn the_clock_covers_the_latest_start_time() {
    let dir = TempDir::new().expect("workload dir");
    write_program(dir.path(), "late", &calc_program_text(0, 1));

    let report = run("2 1 1\n6 late\n", dir.path());
    assert_eq!(report.finished(), 1);
    assert!(report.ticks >= 6, "run ended at tick {}", report.ticks);
}
