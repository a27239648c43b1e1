//! OS simulator CLI.
//!
//! Runs one configured workload to completion and prints the run report.
//! The positional argument names a configuration file under the input
//! directory; process programs resolve under its `proc/` subdirectory.
//!
//! Per-tick events (loaded / dispatched / requeued / finished / failed /
//! stopped) are emitted as `tracing` events; control verbosity with
//! `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ossim_core::{SimConfig, Simulation};

#[derive(Parser, Debug)]
#[command(
    name = "ossim",
    version,
    about = "Discrete-time multicore OS scheduling and paging simulator",
    long_about = "Run a workload of simulated processes on virtual CPU cores.\n\n\
        The configuration file is resolved under the input directory:\n\
        line 1 is `time_slice num_cpus num_processes`, an optional\n\
        `ram swp0 swp1 swp2 swp3` line enables paging, then one\n\
        `start_time process_file [priority]` line per process.\n\n\
        Examples:\n  ossim sched_0\n  ossim paging_0 --json"
)]
struct Cli {
    /// Configuration file name, resolved under the input directory.
    config: String,

    /// Directory holding configuration files.
    #[arg(long, default_value = "input")]
    input_dir: PathBuf,

    /// Directory holding process program files (default: `<input-dir>/proc`).
    #[arg(long)]
    proc_dir: Option<PathBuf>,

    /// Emit the run report as JSON instead of the human summary.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let config_path = cli.input_dir.join(&cli.config);
    let proc_dir = cli
        .proc_dir
        .unwrap_or_else(|| cli.input_dir.join("proc"));

    let config = match SimConfig::from_path(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("ossim: {err}");
            return ExitCode::FAILURE;
        }
    };

    let report = match Simulation::run(&config, &proc_dir) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("ossim: {err}");
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("ossim: report serialization failed: {err}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        report.print();
    }
    ExitCode::SUCCESS
}
