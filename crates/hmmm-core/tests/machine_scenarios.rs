//! End-to-end machine scenarios over binary image text.

use hmmm_core::{
    read_image, run_file, run_image, DebugMode, FaultCode, Machine, MachineConfig, RunError,
    ScriptedConsole, StepOutcome,
};
use proptest as _;
use rstest as _;
use thiserror as _;
use tracing as _;

const ADD_AND_WRITE: &str = "\
0001 0001 0000 0101
0001 0010 0000 0011
0110 0011 0001 0010
0000 0011 0000 0010
0000 0000 0000 0000
";

fn quiet() -> MachineConfig {
    MachineConfig::with_debug(false)
}

#[test]
fn add_program_prints_eight() {
    let image = read_image(ADD_AND_WRITE).unwrap();
    let mut console = ScriptedConsole::default();
    let outcome = run_image(&image, quiet(), &mut console).unwrap();
    assert_eq!(console.output_lines(), vec!["8"]);
    assert_eq!(outcome.steps, 5);
}

#[test]
fn mod_by_register_zero_is_division_by_zero() {
    // loadn r2 5; mod r1 r2 r0; halt
    let image = read_image("0001 0010 0000 0101\n1010 0001 0010 0000\n0000 0000 0000 0000\n")
        .unwrap();
    let mut console = ScriptedConsole::default();
    let fault = run_image(&image, quiet(), &mut console).unwrap_err();
    assert_eq!(fault.code, FaultCode::DivisionByZero);
    let output = console.output();
    assert!(output.contains("  Program Counter: 1"));
    assert!(output.contains("  Translation: mod r1, r2, r0"));
    assert!(output.contains("Division by Zero Error at pc 1."));
}

#[test]
fn jump_past_code_is_invalid_target() {
    // jump 5; halt
    let image = read_image("1011 0000 0000 0101\n0000 0000 0000 0000\n").unwrap();
    let mut console = ScriptedConsole::default();
    let fault = run_image(&image, quiet(), &mut console).unwrap_err();
    assert_eq!(fault.code, FaultCode::InvalidJumpTarget);
}

#[test]
fn countdown_loop_uses_branches() {
    // loadn r1 3; write r1; addn r1 -1; jnez r1 1; halt
    let image = read_image(
        "0001 0001 0000 0011\n\
         0000 0001 0000 0010\n\
         0101 0001 1111 1111\n\
         1101 0001 0000 0001\n\
         0000 0000 0000 0000\n",
    )
    .unwrap();
    let mut console = ScriptedConsole::default();
    run_image(&image, quiet(), &mut console).unwrap();
    assert_eq!(console.output_lines(), vec!["3", "2", "1"]);
}

#[test]
fn read_echo_with_retries() {
    // read r1; write r1; halt
    let image = read_image("0000 0001 0000 0001\n0000 0001 0000 0010\n0000 0000 0000 0000\n")
        .unwrap();
    let mut console = ScriptedConsole::new(["seven", "-7"]);
    run_image(&image, quiet(), &mut console).unwrap();
    let lines = console.output_lines();
    assert_eq!(lines.first(), Some(&"Illegal input: number must be in [-32768,32767]"));
    assert_eq!(lines.last(), Some(&"Enter number (q to quit): -7"));
}

#[test]
fn scripted_debug_session() {
    let image = read_image(ADD_AND_WRITE).unwrap();
    let mut console = ScriptedConsole::new(["s", "s", "h", "r"]);
    let config = MachineConfig {
        debug: DebugMode::Enabled,
        show_next: false,
    };
    let outcome = run_image(&image, config, &mut console).unwrap();
    assert_eq!(outcome.state.register(3), 8);
    let output = console.output();
    assert_eq!(output.matches("  Program Counter:").count(), 2);
    assert!(!output.contains("Next Target"));
    assert!(output.contains("Debugging Mode Commands:"));
    assert!(output.ends_with("8\n"));
}

#[test]
fn manual_stepping_reports_halt() {
    let image = read_image(ADD_AND_WRITE).unwrap();
    let mut machine = Machine::new(&image, quiet());
    let mut console = ScriptedConsole::default();
    for _ in 0..4 {
        assert_eq!(machine.step(&mut console).unwrap(), StepOutcome::Retired);
    }
    assert_eq!(machine.step(&mut console).unwrap(), StepOutcome::Halted);
    assert_eq!(machine.step(&mut console).unwrap(), StepOutcome::Halted);
    assert_eq!(machine.state().pc(), 5);
}

#[test]
fn missing_image_file_is_an_image_error() {
    let mut console = ScriptedConsole::default();
    let result = run_file(
        std::path::Path::new("/nonexistent/hmmm/program.b"),
        quiet(),
        &mut console,
    );
    assert!(matches!(result, Err(RunError::Image(_))));
}
