//! Fetch-decode-execute loop.
//!
//! A [`Machine`] owns one [`MachineState`] for the duration of a run. The
//! loop checks the interrupt flag and the program counter, fetches and
//! decodes the next word, lets the debugger intervene, then executes.

mod console;
mod debugger;
mod execute;
mod state;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace};

pub use console::{Console, ConsoleInput, ScriptedConsole, StdConsole};
pub use debugger::{
    disassemble_cell, help_text, render_memory, render_registers, DebugCommand, Debugger,
    DebuggerState, DEBUG_PROMPT,
};
pub use execute::{alu, execute_instruction, parse_console_number};
pub use state::{Cell, MachineState, MEMORY_WORDS, REGISTER_COUNT};

use crate::decoder::Decoder;
use crate::fault::{FaultContext, RunFault};
use crate::image::{load_image, Image, ImageError};

/// Question asked before the first instruction in [`DebugMode::Ask`].
pub const ASK_DEBUG_PROMPT: &str = "Enter debugging mode? ";

/// How the debugger is selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DebugMode {
    /// Pause before the first instruction.
    Enabled,
    /// Never prompt.
    Disabled,
    /// Ask the operator before the first instruction.
    #[default]
    Ask,
}

/// Per-run machine options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MachineConfig {
    /// Debugger selection.
    pub debug: DebugMode,
    /// Include the next target and next instruction in debugger traces.
    pub show_next: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            debug: DebugMode::Ask,
            show_next: true,
        }
    }
}

impl MachineConfig {
    /// Config with the debugger explicitly on or off.
    #[must_use]
    pub const fn with_debug(debug: bool) -> Self {
        Self {
            debug: if debug {
                DebugMode::Enabled
            } else {
                DebugMode::Disabled
            },
            show_next: true,
        }
    }
}

/// Cloneable handle that requests cancellation of a running machine.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    /// Creates a handle in the not-interrupted state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; observed before the next fetch.
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a single [`Machine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// Instruction retired; the machine is ready for the next one.
    Retired,
    /// `halt` executed.
    Halted,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Instructions retired, including the final `halt`.
    pub steps: u64,
    /// Machine state at the time of the halt.
    pub state: MachineState,
}

/// Failures of the file-level run entry point.
#[derive(Debug, Error)]
pub enum RunError {
    /// The image could not be loaded.
    #[error(transparent)]
    Image(#[from] ImageError),
    /// The program faulted.
    #[error(transparent)]
    Fault(#[from] RunFault),
}

/// A single HMMM machine.
#[derive(Debug)]
pub struct Machine {
    state: MachineState,
    config: MachineConfig,
    debugger: Debugger,
    interrupt: InterruptHandle,
    debug_resolved: bool,
    steps: u64,
}

impl Machine {
    /// Loads `image` into a fresh machine.
    #[must_use]
    pub fn new(image: &Image, config: MachineConfig) -> Self {
        let debugger = match config.debug {
            DebugMode::Enabled => Debugger::enabled(),
            DebugMode::Disabled | DebugMode::Ask => Debugger::disabled(),
        };
        Self {
            state: MachineState::from_image(image),
            config,
            debugger,
            interrupt: InterruptHandle::new(),
            debug_resolved: config.debug != DebugMode::Ask,
            steps: 0,
        }
    }

    /// Replaces the interrupt handle, e.g. with one wired to a signal.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: InterruptHandle) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Handle that cancels this machine.
    #[must_use]
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Current machine state.
    #[must_use]
    pub const fn state(&self) -> &MachineState {
        &self.state
    }

    /// Current debugger session.
    #[must_use]
    pub const fn debugger(&self) -> &Debugger {
        &self.debugger
    }

    /// Instructions retired so far.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Fetches, decodes and executes one instruction.
    ///
    /// # Errors
    ///
    /// Returns the fault that ends the run. The machine must not be stepped
    /// again afterwards.
    pub fn step(&mut self, console: &mut dyn Console) -> Result<StepOutcome, RunFault> {
        if self.state.is_halted() {
            return Ok(StepOutcome::Halted);
        }
        if !self.debug_resolved {
            self.resolve_debug_mode(console)?;
        }
        if self.interrupt.is_interrupted() {
            return Err(RunFault::interrupted());
        }

        let fetched_at = self.state.pc();
        if fetched_at >= self.state.code_size() {
            return Err(RunFault::memory_out_of_bounds(fetched_at));
        }
        let word = match self.state.cell(fetched_at) {
            Some(Cell::Code(Some(word))) => word,
            _ => return Err(RunFault::bad_instruction(fetched_at)),
        };
        self.state.advance_pc();

        let instruction =
            Decoder::decode(word).ok_or_else(|| RunFault::invalid_opcode(fetched_at))?;

        if self.debugger.wants_command() {
            self.read_debug_commands(console)?;
        }
        if self.debugger.is_tracing() {
            self.write_trace(console, &FaultContext::new(fetched_at, &instruction))?;
        }
        trace!(pc = fetched_at, instruction = %instruction, "execute");

        execute_instruction(&instruction, fetched_at, &mut self.state, console)
            .map_err(|fault| fault.with_context(FaultContext::new(fetched_at, &instruction)))?;
        self.state.clear_register_zero();
        self.steps += 1;
        self.debugger.finish_step();

        if self.state.is_halted() {
            if self.debugger.is_tracing() {
                console.write_line("halt\n").map_err(|e| RunFault::console(&e))?;
            }
            return Ok(StepOutcome::Halted);
        }
        Ok(StepOutcome::Retired)
    }

    /// Runs until `halt` or a fault.
    ///
    /// On a fault the diagnostic report is written to `console` before the
    /// fault is returned.
    ///
    /// # Errors
    ///
    /// Returns the fault that ended the run.
    pub fn run(mut self, console: &mut dyn Console) -> Result<RunOutcome, RunFault> {
        loop {
            match self.step(console) {
                Ok(StepOutcome::Retired) => {}
                Ok(StepOutcome::Halted) => {
                    debug!(steps = self.steps, "program halted");
                    return Ok(RunOutcome {
                        steps: self.steps,
                        state: self.state,
                    });
                }
                Err(fault) => {
                    debug!(
                        code = ?fault.code,
                        pc = self.state.pc(),
                        "run aborted: {}",
                        fault.message
                    );
                    if let Err(e) = console.write_line(&fault.report()) {
                        debug!(error = %e, "fault report not written");
                    }
                    return Err(fault);
                }
            }
        }
    }

    fn resolve_debug_mode(&mut self, console: &mut dyn Console) -> Result<(), RunFault> {
        let answer = match console
            .prompt(ASK_DEBUG_PROMPT)
            .map_err(|e| RunFault::console(&e))?
        {
            ConsoleInput::Line(line) => line,
            ConsoleInput::EndOfInput => return Err(RunFault::end_of_input()),
            ConsoleInput::Interrupted => return Err(RunFault::interrupted()),
        };
        if is_affirmative(&answer) {
            self.debugger = Debugger::enabled();
        }
        self.debug_resolved = true;
        Ok(())
    }

    fn read_debug_commands(&mut self, console: &mut dyn Console) -> Result<(), RunFault> {
        let io = |e: std::io::Error| RunFault::console(&e);
        while self.debugger.wants_command() {
            let line = match console.prompt(DEBUG_PROMPT).map_err(io)? {
                ConsoleInput::Line(line) => line,
                ConsoleInput::EndOfInput => return Err(RunFault::end_of_input()),
                ConsoleInput::Interrupted => return Err(RunFault::interrupted()),
            };
            let command = DebugCommand::parse(&line);
            match command {
                DebugCommand::Dump => console.write(&render_memory(&self.state)).map_err(io)?,
                DebugCommand::Print => console
                    .write_line(&render_registers(&self.state))
                    .map_err(io)?,
                DebugCommand::Help => console.write_line(help_text()).map_err(io)?,
                DebugCommand::Run => console.write_line("Continuing program...").map_err(io)?,
                DebugCommand::Quit => {
                    self.debugger.apply(command);
                    return Err(RunFault::aborted());
                }
                DebugCommand::Continue | DebugCommand::Step => {}
            }
            self.debugger.apply(command);
        }
        Ok(())
    }

    fn write_trace(
        &self,
        console: &mut dyn Console,
        context: &FaultContext,
    ) -> Result<(), RunFault> {
        let mut block = format!("\n{context}\n");
        if self.config.show_next {
            let next = self.state.pc();
            block.push_str(&format!(
                "  Next Target: {next}\n  Next Instruction: {} \n",
                disassemble_cell(&self.state, next)
            ));
        }
        console.write_line(&block).map_err(|e| RunFault::console(&e))
    }
}

/// Whether an answer to [`ASK_DEBUG_PROMPT`] turns the debugger on.
#[must_use]
pub fn is_affirmative(answer: &str) -> bool {
    answer.starts_with('y')
        || answer == "t"
        || ["indeed", "true", "affirmative"]
            .iter()
            .any(|word| answer.starts_with(word))
}

/// Runs an in-memory image to completion.
///
/// # Errors
///
/// Returns the fault that ended the run.
pub fn run_image(
    image: &Image,
    config: MachineConfig,
    console: &mut dyn Console,
) -> Result<RunOutcome, RunFault> {
    Machine::new(image, config).run(console)
}

/// Loads an image file and runs it to completion.
///
/// # Errors
///
/// Returns [`RunError::Image`] if the image cannot be loaded and
/// [`RunError::Fault`] if the program faults.
pub fn run_file(
    path: &Path,
    config: MachineConfig,
    console: &mut dyn Console,
) -> Result<RunOutcome, RunError> {
    let image = load_image(path)?;
    Ok(run_image(&image, config, console)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultCode;
    use crate::image::read_image;
    use rstest::rstest;

    // loadn r1 5; loadn r2 3; add r3 r1 r2; write r3; halt
    const ADD_PROGRAM: [u16; 5] = [0x1105, 0x1203, 0x6312, 0x0302, 0x0000];

    fn machine(words: &[u16], debug: DebugMode) -> Machine {
        let config = MachineConfig {
            debug,
            show_next: true,
        };
        Machine::new(&Image::from_words(words.iter().copied()), config)
    }

    #[test]
    fn runs_add_program() {
        let mut console = ScriptedConsole::default();
        let outcome = machine(&ADD_PROGRAM, DebugMode::Disabled)
            .run(&mut console)
            .unwrap();
        assert_eq!(console.output(), "8\n");
        assert_eq!(outcome.steps, 5);
        assert!(outcome.state.is_halted());
        assert_eq!(outcome.state.register(3), 8);
    }

    #[test]
    fn falling_off_the_end_is_out_of_bounds() {
        let mut console = ScriptedConsole::default();
        let fault = machine(&[0x1105], DebugMode::Disabled)
            .run(&mut console)
            .unwrap_err();
        assert_eq!(fault.code, FaultCode::MemoryOutOfBounds);
        assert!(console
            .output()
            .contains("Program attempted to execute memory location 1"));
    }

    #[test]
    fn malformed_cell_is_bad_instruction_only_when_fetched() {
        let config = MachineConfig::with_debug(false);
        let mut console = ScriptedConsole::default();

        let image = read_image("0000 0000 0000 0000\n0000\n").unwrap();
        assert_eq!(image.words(), &[Some(0x0000), None]);
        assert!(run_image(&image, config, &mut console).is_ok());

        let image = read_image("0000\n").unwrap();
        let fault = run_image(&image, config, &mut console).unwrap_err();
        assert_eq!(fault.code, FaultCode::BadInstruction);
    }

    #[test]
    fn overflow_report_carries_context() {
        // loadn r1 127; mul r1 r1 r1; mul r1 r1 r1
        let words = [0x117F, 0x8111, 0x8111, 0x0000];
        let mut console = ScriptedConsole::default();
        let fault = machine(&words, DebugMode::Disabled)
            .run(&mut console)
            .unwrap_err();
        assert_eq!(fault.code, FaultCode::IntegerOverflow);
        let context = fault.context.unwrap();
        assert_eq!(context.pc, 2);
        assert_eq!(context.translation, "mul r1, r1, r1");
        assert!(console.output().contains("Halting program execution."));
    }

    #[test]
    fn interrupt_is_observed_before_fetch() {
        let machine = machine(&ADD_PROGRAM, DebugMode::Disabled);
        let handle = machine.interrupt_handle();
        handle.interrupt();
        let mut console = ScriptedConsole::default();
        let fault = machine.run(&mut console).unwrap_err();
        assert_eq!(fault.code, FaultCode::Interrupted);
        assert_eq!(console.output_lines(), vec![
            "Interrupted by user, halting program execution..."
        ]);
    }

    #[test]
    fn shared_handle_interrupts_machine() {
        let handle = InterruptHandle::new();
        let mut machine = machine(&ADD_PROGRAM, DebugMode::Disabled).with_interrupt(handle.clone());
        let mut console = ScriptedConsole::default();
        assert_eq!(machine.step(&mut console).unwrap(), StepOutcome::Retired);
        handle.interrupt();
        let fault = machine.step(&mut console).unwrap_err();
        assert_eq!(fault.code, FaultCode::Interrupted);
        assert_eq!(machine.steps(), 1);
    }

    #[test]
    fn debugger_steps_then_continues_with_trace() {
        let mut console = ScriptedConsole::new(["", "p", "c"]);
        let outcome = machine(&ADD_PROGRAM, DebugMode::Enabled)
            .run(&mut console)
            .unwrap();
        assert_eq!(outcome.state.register(3), 8);
        let output = console.output();
        assert_eq!(output.matches(DEBUG_PROMPT).count(), 3);
        assert!(output.contains("Registers:"));
        assert!(output.contains("1  : 5"));
        assert_eq!(output.matches("  Program Counter:").count(), 5);
        assert!(output.contains("  Instruction: loadn   Arguments: 0001, 0000, 0101"));
        assert!(output.contains("  Next Target: 1\n  Next Instruction: loadn r2, 3"));
        assert!(output.contains("\n8\n"));
    }

    #[test]
    fn debugger_run_stops_tracing() {
        let mut console = ScriptedConsole::new(["r"]);
        machine(&ADD_PROGRAM, DebugMode::Enabled)
            .run(&mut console)
            .unwrap();
        let output = console.output();
        assert!(output.contains("Continuing program..."));
        assert!(!output.contains("Program Counter"));
    }

    #[test]
    fn debugger_quit_aborts() {
        let mut console = ScriptedConsole::new(["d", "q"]);
        let fault = machine(&ADD_PROGRAM, DebugMode::Enabled)
            .run(&mut console)
            .unwrap_err();
        assert_eq!(fault.code, FaultCode::Aborted);
        assert!(console.output().contains("Memory Contents:"));
        assert!(console.output().ends_with("Aborting Program...\n"));
    }

    #[test]
    fn debugger_quit_terminates_session() {
        let mut machine = machine(&ADD_PROGRAM, DebugMode::Enabled);
        let mut console = ScriptedConsole::new(["q"]);
        let fault = machine.step(&mut console).unwrap_err();
        assert_eq!(fault.code, FaultCode::Aborted);
        assert_eq!(machine.debugger().state(), DebuggerState::Terminated);
        assert_eq!(machine.steps(), 0);
    }

    #[test]
    fn interrupt_at_debugger_prompt() {
        let mut console = ScriptedConsole::new(["s"]);
        console.push_interrupt();
        let fault = machine(&ADD_PROGRAM, DebugMode::Enabled)
            .run(&mut console)
            .unwrap_err();
        assert_eq!(fault.code, FaultCode::Interrupted);
        assert_eq!(console.output().matches(DEBUG_PROMPT).count(), 2);
        assert!(console
            .output()
            .ends_with("Interrupted by user, halting program execution...\n"));
    }

    #[test]
    fn end_of_input_at_debugger_prompt() {
        let mut console = ScriptedConsole::new(["s", "s"]);
        let fault = machine(&ADD_PROGRAM, DebugMode::Enabled)
            .run(&mut console)
            .unwrap_err();
        assert_eq!(fault.code, FaultCode::EndOfInput);
        assert_eq!(console.output().matches(DEBUG_PROMPT).count(), 3);
    }

    #[test]
    fn interrupt_at_ask_prompt() {
        let mut console = ScriptedConsole::default();
        console.push_interrupt();
        let fault = machine(&ADD_PROGRAM, DebugMode::Ask)
            .run(&mut console)
            .unwrap_err();
        assert_eq!(fault.code, FaultCode::Interrupted);
        assert!(console.output().starts_with(ASK_DEBUG_PROMPT));
        assert!(!console.output().contains("\n8\n"));
    }

    #[test]
    fn end_of_input_at_ask_prompt() {
        let mut console = ScriptedConsole::default();
        let fault = machine(&ADD_PROGRAM, DebugMode::Ask)
            .run(&mut console)
            .unwrap_err();
        assert_eq!(fault.code, FaultCode::EndOfInput);
    }

    #[test]
    fn ask_mode_prompts_once() {
        let mut console = ScriptedConsole::new(["no"]);
        machine(&ADD_PROGRAM, DebugMode::Ask)
            .run(&mut console)
            .unwrap();
        assert_eq!(console.output(), format!("{ASK_DEBUG_PROMPT}8\n"));

        let mut console = ScriptedConsole::new(["yes", "r"]);
        machine(&ADD_PROGRAM, DebugMode::Ask)
            .run(&mut console)
            .unwrap();
        assert!(console.output().contains(DEBUG_PROMPT));
    }

    #[rstest]
    #[case("y", true)]
    #[case("yes", true)]
    #[case("yeah", true)]
    #[case("indeed", true)]
    #[case("t", true)]
    #[case("true", true)]
    #[case("affirmative", true)]
    #[case("tea", false)]
    #[case("n", false)]
    #[case("", false)]
    #[case("Yes", false)]
    fn affirmative_answers(#[case] answer: &str, #[case] expected: bool) {
        assert_eq!(is_affirmative(answer), expected);
    }
}
