//! Interactive debugger state machine.
//!
//! The machine consults the debugger before every instruction. While
//! [`DebuggerState::Paused`] it keeps reading commands; inspection commands
//! leave it paused, anything unrecognised executes a single instruction.

use crate::decoder::{Decoder, UNTRANSLATABLE};
use crate::encoding::format_word;
use crate::machine::state::{Cell, MachineState, MEMORY_WORDS};

/// Prompt shown while paused.
pub const DEBUG_PROMPT: &str = "\nDebugging Mode Command (h for help): ";

/// Columns used for the data region in a memory dump.
const DUMP_COLUMNS: usize = 6;

/// Debugger states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebuggerState {
    /// Waiting for a command before the next instruction.
    Paused,
    /// Executing exactly one instruction, then pausing again.
    SingleStepping,
    /// Executing without further prompts.
    RunningToCompletion,
    /// Operator quit; the run is abandoned.
    Terminated,
}

/// Commands accepted at the debugger prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugCommand {
    /// `c` / `continue`: run to completion, keep tracing.
    Continue,
    /// `r` / `run`: run to completion, stop tracing.
    Run,
    /// `d` / `dump`: print memory.
    Dump,
    /// `p` / `print`: print registers.
    Print,
    /// `h` / `help`: print the command list.
    Help,
    /// `q` / `quit`: abandon the run.
    Quit,
    /// Anything else: execute the next instruction.
    Step,
}

impl DebugCommand {
    /// Parses one line of operator input.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        match input.trim() {
            "c" | "continue" => Self::Continue,
            "r" | "run" => Self::Run,
            "d" | "dump" => Self::Dump,
            "p" | "print" => Self::Print,
            "h" | "help" => Self::Help,
            "q" | "quit" => Self::Quit,
            _ => Self::Step,
        }
    }

    /// Whether the command only inspects state.
    #[must_use]
    pub const fn is_inspection(self) -> bool {
        matches!(self, Self::Dump | Self::Print | Self::Help)
    }
}

/// Debugger session attached to one machine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debugger {
    state: DebuggerState,
    tracing: bool,
}

impl Debugger {
    /// A session that prompts before the first instruction.
    #[must_use]
    pub const fn enabled() -> Self {
        Self {
            state: DebuggerState::Paused,
            tracing: true,
        }
    }

    /// No prompts, no tracing.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            state: DebuggerState::RunningToCompletion,
            tracing: false,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> DebuggerState {
        self.state
    }

    /// Whether each instruction is echoed before it executes.
    #[must_use]
    pub const fn is_tracing(&self) -> bool {
        self.tracing
    }

    /// Whether the machine must read a command before executing.
    #[must_use]
    pub const fn wants_command(&self) -> bool {
        matches!(self.state, DebuggerState::Paused)
    }

    /// Applies a command and returns the new state.
    pub const fn apply(&mut self, command: DebugCommand) -> DebuggerState {
        self.state = match command {
            DebugCommand::Continue => DebuggerState::RunningToCompletion,
            DebugCommand::Run => {
                self.tracing = false;
                DebuggerState::RunningToCompletion
            }
            DebugCommand::Quit => DebuggerState::Terminated,
            DebugCommand::Dump | DebugCommand::Print | DebugCommand::Help => self.state,
            DebugCommand::Step => DebuggerState::SingleStepping,
        };
        self.state
    }

    /// Called after an instruction retires.
    pub const fn finish_step(&mut self) {
        if matches!(self.state, DebuggerState::SingleStepping) {
            self.state = DebuggerState::Paused;
        }
    }
}

/// Command reference printed by `help`.
#[must_use]
pub fn help_text() -> &'static str {
    "\nDebugging Mode Commands:\n\
     \x20 'c' or 'continue' : run through the rest of the program (in debugging mode)\n\
     \x20 'd' or 'dump' : print the non-empty portions of memory\n\
     \x20 'h' or 'help' : display this message\n\
     \x20 'p' or 'print' : print the contents of the registers\n\
     \x20 'q' or 'quit' : halt the program and exit\n\
     \x20 'r' or 'run' : run through the rest of the program (exit debugging mode)\n\
     \x20 default : execute the next instruction"
}

/// Register listing printed by `print`.
#[must_use]
pub fn render_registers(state: &MachineState) -> String {
    let mut out = String::from("Registers:\n");
    for (index, value) in state.registers().iter().enumerate() {
        out.push_str(&format!("{index:<2} : {value}\n"));
    }
    out
}

/// Memory listing printed by `dump`: code cells as bit patterns, then the
/// data region in six columns.
#[must_use]
pub fn render_memory(state: &MachineState) -> String {
    let mut out = String::from("Memory Contents:\n");
    let code_size = state.code_size();

    for address in 0..code_size {
        let text = match state.cell(address) {
            Some(Cell::Code(Some(word))) => format_word(word),
            _ => String::from("<malformed>"),
        };
        out.push_str(&format!("{address:<3}:{text:<23}\n"));
    }

    let data_cells = MEMORY_WORDS - code_size;
    let rows = data_cells.div_ceil(DUMP_COLUMNS);
    for row in 0..rows {
        let entries: Vec<String> = (0..DUMP_COLUMNS)
            .map(|column| code_size + row + column * rows)
            .take_while(|&address| address < MEMORY_WORDS)
            .map(|address| format!("{address:<3}: {:<7}", state.data(address)))
            .collect();
        out.push_str(entries.join(" ").trim_end());
        out.push('\n');
    }
    out
}

/// Disassembly of the cell at `address`, as shown in traces.
#[must_use]
pub fn disassemble_cell(state: &MachineState, address: usize) -> String {
    match state.cell(address) {
        Some(Cell::Code(Some(word))) => Decoder::disassemble(word),
        _ => UNTRANSLATABLE.to_string(),
    }
}
