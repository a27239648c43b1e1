//! Shared test helpers.

use std::path::Path;
use std::sync::Arc;

use ossim_core::process::{Instruction, Pcb, Program};

/// Installs a test-writer tracing subscriber once per process, so failing
/// runs can be debugged with `--nocapture`. Safe to call from every test.
pub fn init_tracing() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("warn")
            .try_init();
    });
}

/// A PCB running `n` pure-compute instructions.
pub fn calc_pcb(pid: u32, prio: u32, n: usize) -> Pcb {
    Pcb::new(pid, prio, Arc::new(calc_program(prio, n)))
}

/// A program of `n` pure-compute instructions.
pub fn calc_program(prio: u32, n: usize) -> Program {
    Program {
        default_prio: prio,
        instructions: vec![Instruction::Calc; n],
    }
}

/// Renders a calc-only program file body.
pub fn calc_program_text(prio: u32, n: usize) -> String {
    let mut text = format!("{prio} {n}\n");
    for _ in 0..n {
        text.push_str("calc\n");
    }
    text
}

/// Writes a program file into a workload directory.
pub fn write_program(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).expect("write program file");
}
