//! CLI entry point for the `hmmm` binary.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use hmmm_assembler::{assemble_file, AssembleError, AssembleOptions, AssembledImage, Dialect};
use hmmm_core::{load_image, DebugMode, InterruptHandle, Machine, MachineConfig, StdConsole};
#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tempfile as _;
use thiserror as _;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const USAGE_TEXT: &str = "\
Usage: hmmm <command> [options]

Commands:
  build <source> [-o <output>] [--legacy-names] [--quiet]  Assemble source to a binary image
  run   <binary> [-d | -n]                                 Run a binary image

Options:
  -o, --output <file>  Output file path (default: source stem + .b)
      --legacy-names   Resolve mnemonics with the 2012 naming (build only)
  -q, --quiet          Do not print the assembly listing (build only)
  -d, --debug          Start in the debugger (run only)
  -n, --no-debug       Never ask to enter the debugger (run only)
  -h, --help           Show this help message

Examples:
  hmmm build countdown.hmmm
  hmmm build countdown.hmmm -o countdown.b
  hmmm run countdown.b -n
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Build(BuildArgs),
    Run(RunArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct BuildArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    dialect: Dialect,
    quiet: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    input: PathBuf,
    debug: DebugMode,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();

    match command_str.as_str() {
        "build" => parse_build_args(args)
            .map(Command::Build)
            .map(ParseResult::Command),
        "run" => parse_run_args(args)
            .map(Command::Run)
            .map(ParseResult::Command),
        other => Err(format!("unknown command: {other}")),
    }
}

#[allow(clippy::while_let_on_iterator)]
fn parse_build_args(mut args: impl Iterator<Item = OsString>) -> Result<BuildArgs, String> {
    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut dialect = Dialect::Canonical;
    let mut quiet = false;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg == "--quiet" || arg == "-q" {
            quiet = true;
            continue;
        }

        if arg == "--legacy-names" {
            dialect = Dialect::Legacy2012;
            continue;
        }

        if arg == "-o" || arg == "--output" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for -o".to_string())?;
            output = Some(PathBuf::from(value));
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if input.is_some() {
            return Err("multiple input paths provided".to_string());
        }
        input = Some(PathBuf::from(arg));
    }

    let input = input.ok_or_else(|| "missing input path".to_string())?;
    Ok(BuildArgs {
        input,
        output,
        dialect,
        quiet,
    })
}

fn parse_run_args(args: impl Iterator<Item = OsString>) -> Result<RunArgs, String> {
    let mut input: Option<PathBuf> = None;
    let mut debug = DebugMode::Ask;

    for arg in args {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        // The last of -d / -n wins.
        if arg == "--debug" || arg == "-d" {
            debug = DebugMode::Enabled;
            continue;
        }
        if arg == "--no-debug" || arg == "-n" {
            debug = DebugMode::Disabled;
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if input.is_some() {
            return Err("multiple input paths provided".to_string());
        }
        input = Some(PathBuf::from(arg));
    }

    let input = input.ok_or_else(|| "missing input path".to_string())?;
    Ok(RunArgs { input, debug })
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("out");

    let parent = input.parent().unwrap_or_else(|| Path::new(""));

    parent.join(format!("{stem}.b"))
}

fn run_build(args: BuildArgs) -> Result<(), i32> {
    let output_path = args
        .output
        .unwrap_or_else(|| default_output_path(&args.input));
    let options = AssembleOptions {
        dialect: args.dialect,
    };

    let image = match assemble_file(&args.input, &output_path, options) {
        Ok(image) => image,
        Err(AssembleError::Lines {
            diagnostics,
            listing,
        }) => {
            for diagnostic in &diagnostics {
                eprintln!("{diagnostic}\n");
            }
            if !args.quiet {
                print!("{listing}");
            }
            return Err(1);
        }
        Err(AssembleError::Empty) => {
            eprintln!("error: {}: empty file", args.input.display());
            if !args.quiet {
                print!("{}", AssembledImage::default().listing());
            }
            return Err(1);
        }
        Err(e) => {
            eprintln!("error: {e}");
            return Err(1);
        }
    };

    if !args.quiet {
        print!("{}", image.listing());
    }

    println!(
        "Assembled {} ({} words) -> {}",
        args.input.display(),
        image.lines.len(),
        output_path.display()
    );

    Ok(())
}

fn run_program(args: &RunArgs) -> Result<(), i32> {
    let image = match load_image(&args.input) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("error: {}: {e}", args.input.display());
            return Err(1);
        }
    };
    let config = MachineConfig {
        debug: args.debug,
        ..MachineConfig::default()
    };

    let interrupt = InterruptHandle::new();
    let on_signal = interrupt.clone();
    if let Err(e) = ctrlc::set_handler(move || on_signal.interrupt()) {
        warn!(error = %e, "Ctrl-C will not interrupt the program");
    }
    let mut console = StdConsole::with_interrupt(interrupt.clone());

    // The machine writes the fault report to the console itself.
    Machine::new(&image, config)
        .with_interrupt(interrupt)
        .run(&mut console)
        .map(|_| ())
        .map_err(|_| 1)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(Command::Build(args))) => match run_build(args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Ok(ParseResult::Command(Command::Run(args))) => match run_program(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}
