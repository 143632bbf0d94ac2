//! Instruction semantics.
//!
//! Every register write goes through [`write_checked`], which rejects
//! results outside the signed 16-bit range instead of wrapping them.

use crate::decoder::DecodedInstruction;
use crate::encoding::Mnemonic;
use crate::fault::RunFault;
use crate::machine::console::{Console, ConsoleInput};
use crate::machine::state::MachineState;

const READ_RETRY_NOTICE: &str = "\n\nIllegal input: number must be in [-32768,32767]";
const READ_RETRY_PROMPT: &str = "Enter number (q to quit): ";

/// Executes one decoded instruction fetched from `fetched_at`.
///
/// The program counter has already been advanced past the instruction.
///
/// # Errors
///
/// Returns the run-time fault raised by the instruction, if any.
pub fn execute_instruction(
    instruction: &DecodedInstruction,
    fetched_at: usize,
    state: &mut MachineState,
    console: &mut dyn Console,
) -> Result<(), RunFault> {
    let reg = |i: usize| instruction.register(i).unwrap_or(0);
    let num = |i: usize| instruction.number(i).unwrap_or(0);

    match instruction.mnemonic {
        Mnemonic::Halt => state.halt(),
        Mnemonic::Nop => {}
        Mnemonic::Read => execute_read(reg(0), state, console)?,
        Mnemonic::Write => console
            .write_line(&state.register(reg(0)).to_string())
            .map_err(|e| RunFault::console(&e))?,
        Mnemonic::Jumpi => {
            let target = i32::from(state.register(reg(0)));
            jump_to(state, fetched_at, target)?;
        }
        Mnemonic::Loadn => write_checked(state, reg(0), num(1))?,
        Mnemonic::Addn => {
            let sum = i32::from(state.register(reg(0))) + num(1);
            write_checked(state, reg(0), sum)?;
        }
        Mnemonic::Load => execute_load(state, fetched_at, reg(0), num(1))?,
        Mnemonic::Store => execute_store(state, fetched_at, reg(0), num(1))?,
        Mnemonic::Loadi => {
            let address = i32::from(state.register(reg(1)));
            execute_load(state, fetched_at, reg(0), address)?;
        }
        Mnemonic::Storei => {
            let address = i32::from(state.register(reg(1)));
            execute_store(state, fetched_at, reg(0), address)?;
        }
        Mnemonic::Mov => {
            let value = i32::from(state.register(reg(1)));
            write_checked(state, reg(0), value)?;
        }
        Mnemonic::Neg => {
            let value = -i32::from(state.register(reg(1)));
            write_checked(state, reg(0), value)?;
        }
        Mnemonic::Add | Mnemonic::Sub | Mnemonic::Mul | Mnemonic::Div | Mnemonic::Mod => {
            let lhs = i32::from(state.register(reg(1)));
            let rhs = i32::from(state.register(reg(2)));
            let value = alu(instruction.mnemonic, lhs, rhs)
                .ok_or_else(|| RunFault::division_by_zero(fetched_at))?;
            write_checked(state, reg(0), value)?;
        }
        Mnemonic::Jump | Mnemonic::Call => {
            let link = i32::try_from(state.pc()).unwrap_or(i32::MAX);
            if instruction.mnemonic == Mnemonic::Call {
                write_checked(state, reg(0), link)?;
            }
            let target = num(instruction.args.len().saturating_sub(1));
            jump_to(state, fetched_at, target)?;
        }
        Mnemonic::Jeqz | Mnemonic::Jnez | Mnemonic::Jgtz | Mnemonic::Jltz => {
            let value = state.register(reg(0));
            if branch_taken(instruction.mnemonic, value) {
                jump_to(state, fetched_at, num(1))?;
            }
        }
        Mnemonic::Data => return Err(RunFault::invalid_opcode(fetched_at)),
    }
    Ok(())
}

/// Arithmetic for the three-register operations; `None` on a zero divisor.
///
/// `div` and `mod` round toward negative infinity, so the remainder takes
/// the sign of the divisor.
#[must_use]
pub const fn alu(mnemonic: Mnemonic, lhs: i32, rhs: i32) -> Option<i32> {
    match mnemonic {
        Mnemonic::Add => Some(lhs + rhs),
        Mnemonic::Sub => Some(lhs - rhs),
        Mnemonic::Mul => Some(lhs * rhs),
        Mnemonic::Div => floor_div(lhs, rhs),
        Mnemonic::Mod => floor_mod(lhs, rhs),
        _ => Some(0),
    }
}

const fn floor_div(lhs: i32, rhs: i32) -> Option<i32> {
    if rhs == 0 {
        return None;
    }
    let quotient = lhs / rhs;
    if lhs % rhs != 0 && ((lhs < 0) != (rhs < 0)) {
        Some(quotient - 1)
    } else {
        Some(quotient)
    }
}

const fn floor_mod(lhs: i32, rhs: i32) -> Option<i32> {
    if rhs == 0 {
        return None;
    }
    let remainder = lhs % rhs;
    if remainder != 0 && ((remainder < 0) != (rhs < 0)) {
        Some(remainder + rhs)
    } else {
        Some(remainder)
    }
}

const fn branch_taken(mnemonic: Mnemonic, value: i16) -> bool {
    match mnemonic {
        Mnemonic::Jeqz => value == 0,
        Mnemonic::Jnez => value != 0,
        Mnemonic::Jgtz => value > 0,
        Mnemonic::Jltz => value < 0,
        _ => false,
    }
}

fn write_checked(state: &mut MachineState, register: usize, value: i32) -> Result<(), RunFault> {
    let narrowed = i16::try_from(value).map_err(|_| RunFault::integer_overflow(value))?;
    state.set_register(register, narrowed);
    Ok(())
}

fn jump_to(state: &mut MachineState, fetched_at: usize, target: i32) -> Result<(), RunFault> {
    if !state.is_code_address(target) {
        return Err(RunFault::invalid_jump_target(fetched_at, target));
    }
    state.set_pc(usize::try_from(target).unwrap_or_default());
    Ok(())
}

fn execute_load(
    state: &mut MachineState,
    fetched_at: usize,
    register: usize,
    address: i32,
) -> Result<(), RunFault> {
    if !state.is_data_address(address) {
        return Err(RunFault::invalid_memory_target(fetched_at, "load", address));
    }
    let value = state.data(usize::try_from(address).unwrap_or_default());
    state.set_register(register, value);
    Ok(())
}

fn execute_store(
    state: &mut MachineState,
    fetched_at: usize,
    register: usize,
    address: i32,
) -> Result<(), RunFault> {
    if !state.is_data_address(address) {
        return Err(RunFault::invalid_memory_target(fetched_at, "store", address));
    }
    let value = state.register(register);
    state.set_data(usize::try_from(address).unwrap_or_default(), value);
    Ok(())
}

fn execute_read(
    register: usize,
    state: &mut MachineState,
    console: &mut dyn Console,
) -> Result<(), RunFault> {
    let mut input = console.read_line().map_err(|e| RunFault::console(&e))?;
    loop {
        match input {
            ConsoleInput::Line(line) => {
                if let Some(value) = parse_console_number(&line) {
                    state.set_register(register, value);
                    return Ok(());
                }
            }
            ConsoleInput::EndOfInput => return Err(RunFault::end_of_input()),
            ConsoleInput::Interrupted => return Err(RunFault::interrupted()),
        }
        console
            .write_line(READ_RETRY_NOTICE)
            .map_err(|e| RunFault::console(&e))?;
        input = console
            .prompt(READ_RETRY_PROMPT)
            .map_err(|e| RunFault::console(&e))?;
        if matches!(&input, ConsoleInput::Line(line) if line == "q") {
            return Err(RunFault::aborted());
        }
    }
}

/// Accepts an optional leading `-` followed by ASCII digits, within the
/// signed 16-bit range.
#[must_use]
pub fn parse_console_number(text: &str) -> Option<i16> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<i16>().ok()
}
