//! Run configuration: parsing and validation of the workload description.
//!
//! The configuration is a small whitespace-separated text format:
//!
//! ```text
//! time_slice num_cpus num_processes
//! [ram_size swp0 swp1 swp2 swp3]          <- optional; enables paging
//! start_time process_file [priority]      <- one line per process
//! ```
//!
//! The memory line is detected by shape — five integer fields and no
//! filename — so legacy configurations without it keep working. A third
//! field on the process lines selects multi-level queue scheduling for the
//! whole run; the lines must uniformly include or omit it.
//!
//! Validation is deliberately front-loaded: a workload that could stall the
//! tick barrier or fault the memory manager at startup is rejected here,
//! before a single thread is spawned.

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::common::constants::{MAX_PRIO, MAX_SWAP_REGIONS, PAGE_SIZE};
use crate::common::error::ConfigError;

/// Sizes of the simulated physical regions, in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryConfig {
    /// RAM region size. Rounded down to whole pages.
    pub ram_bytes: usize,
    /// Swap device sizes in configuration order; zero marks a slot unused.
    pub swap_bytes: [usize; MAX_SWAP_REGIONS],
}

/// One planned process: when it starts and what it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessPlan {
    /// Tick at which the loader hands the process to the scheduler.
    pub start_time: u64,
    /// Program file name, resolved against the process-source directory.
    pub file: String,
    /// Priority assigned by the plan. `Some` on every line selects
    /// multi-level queue mode; `None` on every line selects single FIFO.
    pub prio: Option<u32>,
}

/// A parsed, not-yet-validated simulation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimConfig {
    /// Ticks a dispatched process may run before forced requeue.
    pub time_slice: u64,
    /// Number of virtual CPU cores (one worker thread each).
    pub num_cpus: usize,
    /// Physical memory sizes; present iff paging is enabled.
    pub memory: Option<MemoryConfig>,
    /// The workload plan, in file order.
    pub processes: Vec<ProcessPlan>,
}

impl SimConfig {
    /// Reads and parses a configuration file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parses configuration text; `origin` is used in diagnostics only.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        let (line_no, header) = lines
            .next()
            .ok_or_else(|| malformed(origin, 1, "empty configuration file"))?;
        let fields: Vec<&str> = header.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(malformed(
                origin,
                line_no,
                "expected `time_slice num_cpus num_processes`",
            ));
        }
        let time_slice: u64 = parse_field(origin, line_no, fields[0], "time slice")?;
        let num_cpus: usize = parse_field(origin, line_no, fields[1], "cpu count")?;
        let num_processes: usize = parse_field(origin, line_no, fields[2], "process count")?;

        let mut pending = lines.peekable();
        let memory = match pending.peek().copied() {
            Some((no, line)) if looks_like_memory_line(line) => {
                let _ = pending.next();
                Some(parse_memory_line(origin, no, line)?)
            }
            _ => None,
        };

        let mut processes = Vec::with_capacity(num_processes);
        for _ in 0..num_processes {
            let (no, line) = pending.next().ok_or_else(|| {
                malformed(
                    origin,
                    line_no,
                    format!("declared {num_processes} processes, file has fewer lines"),
                )
            })?;
            processes.push(parse_process_line(origin, no, line)?);
        }
        if let Some((no, _)) = pending.next() {
            return Err(malformed(origin, no, "unexpected trailing line"));
        }

        let with_prio = processes.iter().filter(|p| p.prio.is_some()).count();
        if with_prio != 0 && with_prio != processes.len() {
            return Err(ConfigError::Invalid(
                "process lines must uniformly include or omit a priority".into(),
            ));
        }

        let config = Self {
            time_slice,
            num_cpus,
            memory,
            processes,
        };
        config.validate()?;
        Ok(config)
    }

    /// Whether the paging subsystem is enabled for this run.
    pub fn paging(&self) -> bool {
        self.memory.is_some()
    }

    /// Whether the run uses multi-level queue scheduling.
    pub fn mlq(&self) -> bool {
        !self.processes.is_empty() && self.processes.iter().all(|p| p.prio.is_some())
    }

    /// Rejects configurations that would stall the barrier or violate a
    /// subsystem precondition at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_slice == 0 {
            return Err(ConfigError::Invalid("time slice must be at least 1".into()));
        }
        if self.num_cpus == 0 {
            return Err(ConfigError::Invalid("at least one CPU is required".into()));
        }
        if let Some(mem) = &self.memory {
            if mem.ram_bytes < PAGE_SIZE {
                return Err(ConfigError::Invalid(format!(
                    "RAM must hold at least one {PAGE_SIZE}-byte page"
                )));
            }
            if !mem.swap_bytes.iter().any(|&s| s >= PAGE_SIZE) {
                return Err(ConfigError::Invalid(
                    "paging requires at least one usable swap region".into(),
                ));
            }
        }
        for plan in &self.processes {
            if let Some(prio) = plan.prio {
                if prio > MAX_PRIO {
                    return Err(ConfigError::Invalid(format!(
                        "priority {prio} for `{}` exceeds the maximum {MAX_PRIO}",
                        plan.file
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A memory line is five integer fields; process lines always carry a
/// filename, so this shape test cannot misfire.
fn looks_like_memory_line(line: &str) -> bool {
    let fields: Vec<&str> = line.split_whitespace().collect();
    fields.len() == MAX_SWAP_REGIONS + 1 && fields.iter().all(|f| f.parse::<usize>().is_ok())
}

fn parse_memory_line(origin: &Path, no: usize, line: &str) -> Result<MemoryConfig, ConfigError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let ram_bytes: usize = parse_field(origin, no, fields[0], "RAM size")?;
    let mut swap_bytes = [0usize; MAX_SWAP_REGIONS];
    for (slot, field) in swap_bytes.iter_mut().zip(&fields[1..]) {
        *slot = parse_field(origin, no, field, "swap size")?;
    }
    Ok(MemoryConfig {
        ram_bytes,
        swap_bytes,
    })
}

fn parse_process_line(origin: &Path, no: usize, line: &str) -> Result<ProcessPlan, ConfigError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 2 && fields.len() != 3 {
        return Err(malformed(
            origin,
            no,
            "expected `start_time process_file [priority]`",
        ));
    }
    let start_time: u64 = parse_field(origin, no, fields[0], "start time")?;
    let prio = fields
        .get(2)
        .map(|f| parse_field(origin, no, f, "priority"))
        .transpose()?;
    Ok(ProcessPlan {
        start_time,
        file: fields[1].to_string(),
        prio,
    })
}

fn parse_field<T: FromStr>(
    origin: &Path,
    no: usize,
    field: &str,
    what: &str,
) -> Result<T, ConfigError> {
    field
        .parse()
        .map_err(|_| malformed(origin, no, format!("{what}: `{field}` is not a valid number")))
}

fn malformed(origin: &Path, line: usize, reason: impl Display) -> ConfigError {
    ConfigError::Malformed {
        path: origin.to_path_buf(),
        line,
        reason: reason.to_string(),
    }
}
