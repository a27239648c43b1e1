//! Loader tests: program parsing and barrier-gated process injection.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use ossim_core::config::SimConfig;
use ossim_core::process::Instruction;
use ossim_core::sched::Scheduler;
use ossim_core::sim::loader::{parse_program, LoaderTask, PlannedPcb};
use ossim_core::{ConfigError, Timer};
use pretty_assertions::assert_eq;

use crate::common::calc_program;

fn parse(text: &str) -> Result<ossim_core::process::Program, ConfigError> {
    parse_program(text, Path::new("test.proc"))
}

#[test]
fn parses_a_full_program() {
    let program = parse(
        "15 6\n\
         calc\n\
         alloc 300 0\n\
         write 102 0 20\n\
         read 0 20 1\n\
         free 0\n\
         calc\n",
    )
    .expect("valid program");
    assert_eq!(program.default_prio, 15);
    assert_eq!(
        program.instructions,
        vec![
            Instruction::Calc,
            Instruction::Alloc { size: 300, reg: 0 },
            Instruction::Write {
                value: 102,
                reg: 0,
                offset: 20
            },
            Instruction::Read {
                reg: 0,
                offset: 20,
                dst: 1
            },
            Instruction::Free { reg: 0 },
            Instruction::Calc,
        ]
    );
    assert!(program.uses_memory());
}

#[test]
fn opcodes_are_case_insensitive() {
    let program = parse("0 2\nCALC\nAlloc 256 1\n").expect("mixed case");
    assert_eq!(program.instructions[0], Instruction::Calc);
    assert_eq!(
        program.instructions[1],
        Instruction::Alloc { size: 256, reg: 1 }
    );
}

#[test]
fn calc_only_programs_do_not_need_paging() {
    let program = parse("0 2\ncalc\ncalc\n").expect("calc program");
    assert!(!program.uses_memory());
}

#[test]
fn register_indices_are_bounded() {
    let err = parse("0 1\nfree 10\n").expect_err("register 10");
    assert!(matches!(err, ConfigError::Malformed { line: 2, .. }), "{err}");
}

#[test]
fn write_values_must_fit_a_byte() {
    let err = parse("0 1\nwrite 256 0 0\n").expect_err("value 256");
    assert!(matches!(err, ConfigError::Malformed { .. }), "{err}");
}

#[test]
fn instruction_count_must_match() {
    let missing = parse("0 3\ncalc\ncalc\n").expect_err("fewer than declared");
    assert!(matches!(missing, ConfigError::Malformed { .. }), "{missing}");
    let extra = parse("0 1\ncalc\ncalc\n").expect_err("more than declared");
    assert!(matches!(extra, ConfigError::Malformed { line: 3, .. }), "{extra}");
}

#[test]
fn zero_instruction_programs_are_rejected() {
    // A PCB born finished would reach a core without ever being runnable.
    let err = parse("0 0\n").expect_err("empty instruction sequence");
    assert!(matches!(err, ConfigError::Malformed { line: 1, .. }), "{err}");
}

#[test]
fn unknown_opcodes_are_rejected() {
    let err = parse("0 1\nhalt\n").expect_err("unknown opcode");
    assert!(matches!(err, ConfigError::Malformed { .. }), "{err}");
}

/// Drives a loader thread from a test-owned barrier participant and
/// returns `(pid, enqueue-observed tick)` in dequeue order.
fn run_loader(plan: Vec<PlannedPcb>) -> Vec<(u32, u64)> {
    let timer = Timer::new();
    timer.start();
    let config = SimConfig::parse("1 1 0\n", Path::new("test.cfg")).expect("pump config");
    let sched = Arc::new(Scheduler::from_config(&config));
    let workload_done = Arc::new(AtomicBool::new(false));

    let task = LoaderTask {
        plan,
        sched: Arc::clone(&sched),
        handle: timer.attach(),
        workload_done: Arc::clone(&workload_done),
        memory: None,
    };
    let mut pump = timer.attach();
    let loader = thread::spawn(move || task.run());

    let mut observed = Vec::new();
    loop {
        while let Some(pcb) = sched.dequeue() {
            observed.push((pcb.pid, pump.timer().current_slot()));
        }
        if workload_done.load(Ordering::Acquire) {
            break;
        }
        pump.next_slot();
    }
    loader.join().expect("loader thread");
    pump.detach();
    let _ = timer.stop();
    observed
}

#[test]
fn processes_are_injected_at_their_start_ticks() {
    let program = Arc::new(calc_program(0, 1));
    let observed = run_loader(vec![
        PlannedPcb {
            start_time: 0,
            prio: 0,
            program: Arc::clone(&program),
        },
        PlannedPcb {
            start_time: 3,
            prio: 0,
            program: Arc::clone(&program),
        },
    ]);
    assert_eq!(observed.len(), 2);
    assert_eq!(observed[0].0, 1);
    assert_eq!(observed[1].0, 2);
    // A process is never visible before its configured start tick.
    assert!(observed[1].1 >= 3, "dequeued at tick {}", observed[1].1);
}

#[test]
fn plan_order_breaks_start_time_ties() {
    let program = Arc::new(calc_program(0, 1));
    let plan: Vec<PlannedPcb> = (0..4)
        .map(|_| PlannedPcb {
            start_time: 2,
            prio: 0,
            program: Arc::clone(&program),
        })
        .collect();
    let pids: Vec<u32> = run_loader(plan).into_iter().map(|(pid, _)| pid).collect();
    assert_eq!(pids, vec![1, 2, 3, 4]);
}
