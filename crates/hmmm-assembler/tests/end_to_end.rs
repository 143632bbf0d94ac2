//! Assemble source, load the image text back and run it.

use ctrlc as _;
use hmmm_assembler::{assemble_source, AssembleOptions};
use hmmm_core::{read_image, run_image, FaultCode, MachineConfig, ScriptedConsole};
use proptest as _;
use rstest::rstest;
use tempfile as _;
use thiserror as _;
use tracing as _;
use tracing_subscriber as _;

fn run_source(source: &str, input: &[&str]) -> (Result<u64, FaultCode>, Vec<String>) {
    let assembled = assemble_source(source, AssembleOptions::default());
    let text = assembled
        .to_image_text()
        .unwrap_or_else(|| panic!("assembly failed:\n{}", assembled.listing()));
    let image = read_image(&text).unwrap();

    let mut console = ScriptedConsole::new(input.iter().copied());
    let result = run_image(&image, MachineConfig::with_debug(false), &mut console)
        .map(|outcome| outcome.steps)
        .map_err(|fault| fault.code);
    let output = console
        .output_lines()
        .into_iter()
        .map(str::to_string)
        .collect();
    (result, output)
}

#[test]
fn add_program_prints_sum() {
    let (result, output) = run_source(
        "0 setn r1 5\n1 setn r2 3\n2 add r3 r1 r2\n3 write r3\n4 halt\n",
        &[],
    );
    assert_eq!(result, Ok(5));
    assert_eq!(output, ["8"]);
}

#[test]
fn factorial_with_call_and_return() {
    let source = "\
# factorial of the number read
0 read r1
1 setn r2 1
2 calln r14 5
3 write r2
4 halt
5 jeqzn r1 9     # done
6 mul r2 r2 r1
7 addn r1 -1
8 jumpn 5
9 jumpr r14
";
    let (result, output) = run_source(source, &["5"]);
    assert!(result.is_ok());
    assert_eq!(output, ["120"]);
}

#[test]
fn store_and_load_through_the_data_region() {
    let source = "\
0 setn r1 -7
1 storen r1 100
2 setn r2 100
3 loadr r3 r2
4 write r3
5 halt
";
    let (result, output) = run_source(source, &[]);
    assert!(result.is_ok());
    assert_eq!(output, ["-7"]);
}

#[rstest]
#[case("0 setn r1 5\n1 div r2 r1 r0\n2 halt\n", FaultCode::DivisionByZero)]
#[case("0 jumpn 5\n1 halt\n", FaultCode::InvalidJumpTarget)]
#[case("0 setn r1 1\n", FaultCode::MemoryOutOfBounds)]
#[case("0 load r1 0\n1 halt\n", FaultCode::InvalidMemoryTarget)]
#[case("0 data 4\n", FaultCode::InvalidOpcode)]
fn faults_surface_with_their_code(#[case] source: &str, #[case] code: FaultCode) {
    let (result, _) = run_source(source, &[]);
    assert_eq!(result, Err(code));
}

#[test]
fn overflow_is_reported() {
    let source = "\
0 setn r1 127
1 mul r1 r1 r1
2 mul r1 r1 r1
3 halt
";
    let (result, output) = run_source(source, &[]);
    assert_eq!(result, Err(FaultCode::IntegerOverflow));
    assert!(output.iter().any(|line| line.contains("Integer Overflow Error")));
}

#[test]
fn quitting_at_the_read_prompt_aborts() {
    let (result, output) = run_source("0 read r1\n1 halt\n", &["abc", "q"]);
    assert_eq!(result, Err(FaultCode::Aborted));
    assert!(output
        .iter()
        .any(|line| line.contains("Illegal input: number must be in [-32768,32767]")));
}
