//! Process control block, program representation, and single-step execution.
//!
//! A [`Pcb`] is uniquely owned for its whole life: the loader creates it,
//! moves it into the scheduler, exactly one CPU worker holds it while it
//! runs, and retirement is simply dropping the value. There is no shared
//! free routine and no way to hold one process on two cores.

use std::sync::Arc;

use crate::common::constants::NUM_REGS;
use crate::common::error::MemError;
use crate::common::Pid;
use crate::mem::ProcessMem;

/// One instruction-unit of a simulated program.
///
/// `Calc` is pure computation; the other four drive the paging subsystem.
/// Register indices are validated against [`NUM_REGS`] at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// One unit of computation with no memory effect.
    Calc,
    /// Allocate `size` bytes and bind the region to register `reg`.
    Alloc {
        /// Requested region size in bytes.
        size: usize,
        /// Register slot that will name the region.
        reg: usize,
    },
    /// Release the region bound to register `reg`.
    Free {
        /// Register slot naming the region.
        reg: usize,
    },
    /// Read the byte at `region(reg) + offset` into register `dst`.
    Read {
        /// Register slot naming the region.
        reg: usize,
        /// Byte offset within the region.
        offset: usize,
        /// Destination register for the byte read.
        dst: usize,
    },
    /// Write byte `value` at `region(reg) + offset`.
    Write {
        /// Byte value to store.
        value: u8,
        /// Register slot naming the region.
        reg: usize,
        /// Byte offset within the region.
        offset: usize,
    },
}

/// An immutable, loaded program: the instruction sequence of one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// Priority recorded in the program file, used when the workload plan
    /// does not assign one.
    pub default_prio: u32,
    /// The instruction sequence. Its length is the process's lifetime in
    /// executed instruction-units.
    pub instructions: Vec<Instruction>,
}

impl Program {
    /// Whether any instruction needs the paging subsystem. A program that
    /// does is rejected up front in a run with paging disabled.
    pub fn uses_memory(&self) -> bool {
        self.instructions
            .iter()
            .any(|i| !matches!(i, Instruction::Calc))
    }
}

/// Process control block: the runtime record of one simulated process.
#[derive(Debug)]
pub struct Pcb {
    /// Process identifier, unique within a run.
    pub pid: Pid,
    /// Program counter: index of the next instruction to execute.
    pub pc: usize,
    /// Scheduling priority (only consulted in multi-level queue mode).
    pub prio: u32,
    /// The loaded instruction sequence. Shared immutably; several processes
    /// may run the same program file.
    pub program: Arc<Program>,
    /// Register file. Holds region bindings (by slot index) and bytes
    /// produced by `Read`.
    pub regs: [u32; NUM_REGS],
    /// Per-process memory context; present only when paging is enabled.
    pub mm: Option<ProcessMem>,
}

impl Pcb {
    /// Creates a fresh PCB at the start of its program, without a memory
    /// context. The loader attaches one for paging-enabled runs.
    pub fn new(pid: Pid, prio: u32, program: Arc<Program>) -> Self {
        Self {
            pid,
            pc: 0,
            prio,
            program,
            regs: [0; NUM_REGS],
            mm: None,
        }
    }

    /// Whether the program counter has reached the end of the program.
    pub fn finished(&self) -> bool {
        self.pc >= self.program.instructions.len()
    }

    /// Executes exactly one instruction-unit and advances the program
    /// counter by one.
    ///
    /// A returned [`MemError`] means this process has failed; the caller
    /// retires it abnormally. The program counter still advances, so a
    /// failed process is never re-executed at the same instruction.
    pub fn step(&mut self) -> Result<(), MemError> {
        debug_assert!(!self.finished(), "step past end of program");
        let instr = self.program.instructions[self.pc];
        self.pc += 1;
        match instr {
            Instruction::Calc => Ok(()),
            Instruction::Alloc { size, reg } => self.mm_mut()?.alloc(size, reg),
            Instruction::Free { reg } => self.mm_mut()?.free(reg),
            Instruction::Read { reg, offset, dst } => {
                let byte = self.mm_mut()?.read_reg(reg, offset)?;
                self.regs[dst] = u32::from(byte);
                Ok(())
            }
            Instruction::Write { value, reg, offset } => {
                self.mm_mut()?.write_reg(reg, offset, value)
            }
        }
    }

    fn mm_mut(&mut self) -> Result<&mut ProcessMem, MemError> {
        let pid = self.pid;
        self.mm
            .as_mut()
            .ok_or(MemError::PagingDisabled { pid })
    }
}
