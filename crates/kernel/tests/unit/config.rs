//! Configuration parsing and validation tests.

use std::path::Path;

use ossim_core::{ConfigError, SimConfig};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn parse(text: &str) -> Result<SimConfig, ConfigError> {
    SimConfig::parse(text, Path::new("test.cfg"))
}

#[test]
fn parses_a_fifo_configuration() {
    let config = parse("2 4 3\n0 p0\n0 p1\n5 p2\n").expect("valid config");
    assert_eq!(config.time_slice, 2);
    assert_eq!(config.num_cpus, 4);
    assert_eq!(config.processes.len(), 3);
    assert_eq!(config.processes[2].start_time, 5);
    assert_eq!(config.processes[2].file, "p2");
    assert!(!config.mlq());
    assert!(!config.paging());
}

#[test]
fn parses_the_memory_line_by_shape() {
    let config = parse("2 1 1\n1024 1024 0 0 0\n0 p0\n").expect("paging config");
    assert!(config.paging());
    let memory = config.memory.expect("memory config");
    assert_eq!(memory.ram_bytes, 1024);
    assert_eq!(memory.swap_bytes, [1024, 0, 0, 0]);
}

#[test]
fn a_legacy_file_without_memory_line_disables_paging() {
    let config = parse("1 1 2\n0 p0\n1 p1\n").expect("legacy config");
    assert!(config.memory.is_none());
}

#[test]
fn priorities_on_every_line_select_mlq() {
    let config = parse("2 2 2\n0 p0 10\n0 p1 0\n").expect("mlq config");
    assert!(config.mlq());
    assert_eq!(config.processes[0].prio, Some(10));
}

#[test]
fn mixed_priority_lines_are_rejected() {
    let err = parse("2 2 2\n0 p0 10\n0 p1\n").expect_err("mixed lines");
    assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
}

#[test]
fn too_few_process_lines_is_malformed() {
    let err = parse("2 2 3\n0 p0\n0 p1\n").expect_err("missing line");
    assert!(matches!(err, ConfigError::Malformed { .. }), "{err}");
}

#[test]
fn trailing_lines_are_malformed() {
    let err = parse("2 2 1\n0 p0\n0 p1\n").expect_err("trailing line");
    assert!(
        matches!(err, ConfigError::Malformed { line: 3, .. }),
        "{err}"
    );
}

#[test]
fn bad_numbers_carry_the_line_number() {
    let err = parse("2 2 1\nzero p0\n").expect_err("bad start time");
    assert!(
        matches!(err, ConfigError::Malformed { line: 2, .. }),
        "{err}"
    );
}

#[rstest]
#[case::zero_slice("0 2 1\n0 p0\n")]
#[case::zero_cpus("2 0 1\n0 p0\n")]
#[case::ram_below_one_page("2 1 1\n128 1024 0 0 0\n0 p0\n")]
#[case::no_usable_swap("2 1 1\n1024 0 0 0 0\n0 p0\n")]
#[case::priority_out_of_range("2 1 1\n0 p0 140\n")]
fn invalid_configurations_are_rejected(#[case] text: &str) {
    let err = parse(text).expect_err("must be rejected");
    assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
}

#[test]
fn unreadable_file_reports_the_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent.cfg");
    let err = SimConfig::from_path(&missing).expect_err("missing file");
    assert!(matches!(err, ConfigError::Unreadable { .. }), "{err}");
    assert!(err.to_string().contains("absent.cfg"));
}

#[test]
fn numeric_file_names_are_not_mistaken_for_a_memory_line() {
    // Two fields, not five: always a process line, whatever the name.
    let config = parse("2 1 1\n0 123\n").expect("numeric process name");
    assert!(config.memory.is_none());
    assert_eq!(config.processes[0].file, "123");
}
