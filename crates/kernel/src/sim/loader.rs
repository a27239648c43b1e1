//! Program loading and the loader thread.
//!
//! Program files are the per-process instruction source:
//!
//! ```text
//! default_priority num_instructions
//! calc
//! alloc 300 0
//! write 102 0 20
//! read 0 20 1
//! free 0
//! ```
//!
//! The loader thread walks the workload plan in file order: materialize the
//! PCB, wait (through barrier ticks, never executing anything) until the
//! clock reaches the process's start tick, attach a fresh memory context
//! when paging is enabled, and hand the PCB to the scheduler. Plan order
//! therefore decides load order for processes sharing a start tick; the
//! queue's FIFO tie-break then decides run order.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::common::constants::NUM_REGS;
use crate::common::error::ConfigError;
use crate::common::Pid;
use crate::mem::{ProcessMem, SystemMemory};
use crate::process::{Instruction, Pcb, Program};
use crate::sched::Scheduler;
use crate::timer::TimerHandle;

/// Reads and parses one program file.
pub fn load_program(path: &Path) -> Result<Program, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_program(&text, path)
}

/// Parses program text; `origin` is used in diagnostics only.
pub fn parse_program(text: &str, origin: &Path) -> Result<Program, ConfigError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    let (no, header) = lines
        .next()
        .ok_or_else(|| malformed(origin, 1, "empty program file".into()))?;
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() != 2 {
        return Err(malformed(
            origin,
            no,
            "expected `default_priority num_instructions`".into(),
        ));
    }
    let default_prio: u32 = fields[0]
        .parse()
        .map_err(|_| malformed(origin, no, format!("bad priority `{}`", fields[0])))?;
    let count: usize = fields[1]
        .parse()
        .map_err(|_| malformed(origin, no, format!("bad instruction count `{}`", fields[1])))?;
    // A process must execute at least one instruction-unit; a PCB that is
    // born finished would reach a core without ever being runnable.
    if count == 0 {
        return Err(malformed(
            origin,
            no,
            "program declares no instructions".into(),
        ));
    }

    let mut instructions = Vec::with_capacity(count);
    for _ in 0..count {
        let (no, line) = lines.next().ok_or_else(|| {
            malformed(
                origin,
                no,
                format!("declared {count} instructions, file has fewer"),
            )
        })?;
        instructions.push(parse_instruction(origin, no, line)?);
    }
    if let Some((no, _)) = lines.next() {
        return Err(malformed(origin, no, "unexpected trailing line".into()));
    }

    Ok(Program {
        default_prio,
        instructions,
    })
}

fn parse_instruction(origin: &Path, no: usize, line: &str) -> Result<Instruction, ConfigError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let opcode = fields[0].to_ascii_lowercase();
    let arg = |idx: usize, what: &str| -> Result<usize, ConfigError> {
        let field = fields
            .get(idx)
            .ok_or_else(|| malformed(origin, no, format!("`{opcode}` is missing its {what}")))?;
        field
            .parse()
            .map_err(|_| malformed(origin, no, format!("bad {what} `{field}`")))
    };
    let reg = |idx: usize, what: &str| -> Result<usize, ConfigError> {
        let r = arg(idx, what)?;
        if r >= NUM_REGS {
            return Err(malformed(
                origin,
                no,
                format!("register {r} out of range (0..{NUM_REGS})"),
            ));
        }
        Ok(r)
    };

    let instr = match (opcode.as_str(), fields.len()) {
        ("calc", 1) => Instruction::Calc,
        ("alloc", 3) => Instruction::Alloc {
            size: arg(1, "size")?,
            reg: reg(2, "register")?,
        },
        ("free", 2) => Instruction::Free {
            reg: reg(1, "register")?,
        },
        ("read", 4) => Instruction::Read {
            reg: reg(1, "source register")?,
            offset: arg(2, "offset")?,
            dst: reg(3, "destination register")?,
        },
        ("write", 4) => {
            let value = arg(1, "value")?;
            if value > usize::from(u8::MAX) {
                return Err(malformed(origin, no, format!("value {value} exceeds 255")));
            }
            Instruction::Write {
                value: value as u8,
                reg: reg(2, "register")?,
                offset: arg(3, "offset")?,
            }
        }
        _ => {
            return Err(malformed(
                origin,
                no,
                format!("unrecognized instruction `{line}`"),
            ))
        }
    };
    Ok(instr)
}

fn malformed(origin: &Path, line: usize, reason: String) -> ConfigError {
    ConfigError::Malformed {
        path: origin.to_path_buf(),
        line,
        reason,
    }
}

/// One plan entry with its program already loaded and priority resolved.
#[derive(Debug, Clone)]
pub struct PlannedPcb {
    /// Tick at which the process is handed to the scheduler.
    pub start_time: u64,
    /// Effective priority (plan priority, else the program's default).
    pub prio: u32,
    /// The loaded program, shared across processes running the same file.
    pub program: Arc<Program>,
}

/// The loader thread's task: injects processes at their start ticks.
pub struct LoaderTask {
    /// Plan entries in file order; pids are assigned in this order from 1.
    pub plan: Vec<PlannedPcb>,
    /// Destination ready queue.
    pub sched: Arc<Scheduler>,
    /// This thread's barrier registration.
    pub handle: TimerHandle,
    /// Raised after the last process is enqueued.
    pub workload_done: Arc<AtomicBool>,
    /// Shared physical regions; `Some` iff paging is enabled.
    pub memory: Option<SystemMemory>,
}

impl std::fmt::Debug for LoaderTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderTask")
            .field("plan", &self.plan.len())
            .finish_non_exhaustive()
    }
}

impl LoaderTask {
    /// Runs the plan to completion, then raises the done flag and detaches.
    pub fn run(mut self) {
        let plan = std::mem::take(&mut self.plan);
        for (index, entry) in plan.into_iter().enumerate() {
            let pid = index as Pid + 1;
            let mut pcb = Pcb::new(pid, entry.prio, entry.program);
            // Wait out the clock without ever claiming a CPU.
            while self.handle.timer().current_slot() < entry.start_time {
                self.handle.next_slot();
            }
            if let Some(memory) = &self.memory {
                pcb.mm = Some(ProcessMem::new(pid, memory));
            }
            info!(
                pid,
                prio = pcb.prio,
                tick = self.handle.timer().current_slot(),
                "process loaded"
            );
            self.sched.enqueue(pcb);
            self.handle.next_slot();
        }
        self.workload_done.store(true, Ordering::Release);
        info!(
            tick = self.handle.timer().current_slot(),
            "workload fully loaded"
        );
        self.handle.detach();
    }
}
