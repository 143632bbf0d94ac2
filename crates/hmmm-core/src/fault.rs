use std::fmt;

use thiserror::Error;

use crate::decoder::DecodedInstruction;
use crate::encoding::format_word;

/// Stable run-time fault taxonomy. Every fault ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultCode {
    /// Program counter left the code region.
    #[error("memory out of bounds")]
    MemoryOutOfBounds,
    /// Fetched cell does not hold a well-formed instruction word.
    #[error("bad instruction")]
    BadInstruction,
    /// Jump, call or branch target outside the code region.
    #[error("invalid jump target")]
    InvalidJumpTarget,
    /// Load or store address outside the data region.
    #[error("invalid memory target")]
    InvalidMemoryTarget,
    /// `div` or `mod` with a zero divisor.
    #[error("division by zero")]
    DivisionByZero,
    /// Register result outside the signed 16-bit range.
    #[error("integer overflow")]
    IntegerOverflow,
    /// Word decoded to something that cannot execute.
    #[error("invalid opcode")]
    InvalidOpcode,
    /// Operator interrupt observed.
    #[error("interrupted")]
    Interrupted,
    /// Console input ended while the machine was waiting for it.
    #[error("end of input")]
    EndOfInput,
    /// Operator quit from the debugger or the read prompt.
    #[error("aborted")]
    Aborted,
    /// Host console failed.
    #[error("console failure")]
    Console,
}

impl FaultCode {
    /// Faults raised by the operator rather than by the program.
    #[must_use]
    pub const fn is_operator_initiated(self) -> bool {
        matches!(self, Self::Interrupted | Self::EndOfInput | Self::Aborted)
    }
}

/// Instruction context printed alongside a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FaultContext {
    /// Address of the faulting instruction.
    pub pc: usize,
    /// Mnemonic of the faulting instruction.
    pub instruction: String,
    /// Bit groups following the opcode nibble, comma separated.
    pub arguments: String,
    /// Disassembled instruction.
    pub translation: String,
}

impl FaultContext {
    /// Builds context for an instruction fetched from `pc`.
    #[must_use]
    pub fn new(pc: usize, instruction: &DecodedInstruction) -> Self {
        let grouped = format_word(instruction.word);
        let arguments = grouped.split(' ').skip(1).collect::<Vec<_>>().join(", ");
        Self {
            pc,
            instruction: instruction.mnemonic.name().to_string(),
            arguments,
            translation: instruction.translation(),
        }
    }
}

impl fmt::Display for FaultContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Program Counter: {}", self.pc)?;
        writeln!(
            f,
            "  Instruction: {}   Arguments: {}",
            self.instruction, self.arguments
        )?;
        write!(f, "  Translation: {}", self.translation)
    }
}

/// A fatal run-time condition with its diagnostic context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[error("{message}")]
pub struct RunFault {
    /// Taxonomy entry.
    pub code: FaultCode,
    /// Human-readable message.
    pub message: String,
    /// Decoded instruction context, when the fault happened mid-instruction.
    pub context: Option<FaultContext>,
}

impl RunFault {
    /// Creates a fault without instruction context.
    #[must_use]
    pub fn new(code: FaultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Attaches instruction context unless some is already present.
    #[must_use]
    pub fn with_context(mut self, context: FaultContext) -> Self {
        if self.context.is_none() {
            self.context = Some(context);
        }
        self
    }

    pub(crate) fn memory_out_of_bounds(pc: usize) -> Self {
        Self::new(
            FaultCode::MemoryOutOfBounds,
            format!(
                "Memory Out of Bounds Error.\nProgram attempted to execute memory location {pc}"
            ),
        )
    }

    pub(crate) fn bad_instruction(pc: usize) -> Self {
        Self::new(
            FaultCode::BadInstruction,
            format!("Bad instruction at memory location {pc}"),
        )
    }

    pub(crate) fn invalid_jump_target(pc: usize, target: i32) -> Self {
        Self::new(
            FaultCode::InvalidJumpTarget,
            format!("Invalid jump target at pc {pc}: {target}"),
        )
    }

    pub(crate) fn invalid_memory_target(pc: usize, access: &str, target: i32) -> Self {
        Self::new(
            FaultCode::InvalidMemoryTarget,
            format!("Invalid {access} target at pc {pc}: {target}"),
        )
    }

    pub(crate) fn division_by_zero(pc: usize) -> Self {
        Self::new(
            FaultCode::DivisionByZero,
            format!("Division by Zero Error at pc {pc}."),
        )
    }

    pub(crate) fn integer_overflow(value: i32) -> Self {
        Self::new(
            FaultCode::IntegerOverflow,
            format!("Integer Overflow Error: Result was larger than 16 bits ({value})."),
        )
    }

    pub(crate) fn invalid_opcode(pc: usize) -> Self {
        Self::new(
            FaultCode::InvalidOpcode,
            format!("Invalid operation code at pc {pc}"),
        )
    }

    pub(crate) fn interrupted() -> Self {
        Self::new(
            FaultCode::Interrupted,
            "Interrupted by user, halting program execution...",
        )
    }

    pub(crate) fn end_of_input() -> Self {
        Self::new(
            FaultCode::EndOfInput,
            "End of input, halting program execution...",
        )
    }

    pub(crate) fn aborted() -> Self {
        Self::new(FaultCode::Aborted, "Aborting Program...")
    }

    pub(crate) fn console(err: &std::io::Error) -> Self {
        Self::new(FaultCode::Console, format!("Console error: {err}"))
    }

    /// Full report: context (if any), message, and the halting notice.
    #[must_use]
    pub fn report(&self) -> String {
        let mut out = String::new();
        if let Some(context) = &self.context {
            out.push('\n');
            out.push_str(&context.to_string());
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.message);
        if !self.code.is_operator_initiated() {
            out.push_str("\nHalting program execution.");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Decoder;

    #[test]
    fn context_lists_bit_groups_after_opcode() {
        let decoded = Decoder::decode(0x6312).unwrap();
        let context = FaultContext::new(4, &decoded);
        assert_eq!(context.arguments, "0011, 0001, 0010");
        assert_eq!(context.translation, "add r3, r1, r2");
        assert_eq!(context.instruction, "add");
    }

    #[test]
    fn with_context_keeps_first_context() {
        let first = FaultContext::new(1, &Decoder::decode(0x0000).unwrap());
        let second = FaultContext::new(2, &Decoder::decode(0x6000).unwrap());
        let fault = RunFault::division_by_zero(1)
            .with_context(first.clone())
            .with_context(second);
        assert_eq!(fault.context, Some(first));
    }

    #[test]
    fn report_includes_context_and_halting_notice() {
        let decoded = Decoder::decode(0xA120).unwrap();
        let fault = RunFault::division_by_zero(3).with_context(FaultContext::new(3, &decoded));
        let report = fault.report();
        assert!(report.contains("Program Counter: 3"));
        assert!(report.contains("Translation: mod r1, r2, r0"));
        assert!(report.contains("Division by Zero Error at pc 3."));
        assert!(report.ends_with("Halting program execution."));
    }

    #[test]
    fn operator_faults_skip_halting_notice() {
        let report = RunFault::interrupted().report();
        assert!(!report.contains("Halting program execution."));
        assert!(FaultCode::EndOfInput.is_operator_initiated());
        assert!(!FaultCode::DivisionByZero.is_operator_initiated());
    }
}
