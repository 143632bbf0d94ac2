//! Core crate for the HMMM toy computer: bit arithmetic, instruction set,
//! binary images and the virtual machine.

/// Fixed-width two's-complement helpers over bit strings.
pub mod bits;
pub use bits::{
    add_bits, complement, from_twos_complement, from_unsigned, negate, signed_range,
    to_twos_complement, to_unsigned, BitError, MAX_BIT_STRING_LEN, MAX_FIELD_WIDTH,
};

/// Ordered opcode table and per-mnemonic argument shapes.
pub mod encoding;
pub use encoding::{
    classify_word, format_word, template, ArgKind, Mnemonic, OpcodeEntry, UnknownMnemonic,
    OPCODE_TABLE,
};

/// Word decoding and disassembly.
pub mod decoder;
pub use decoder::{Argument, DecodedInstruction, Decoder, UNTRANSLATABLE};

/// Binary image text format.
pub mod image;
pub use image::{load_image, read_image, write_image, Image, ImageError};

/// Run-time fault taxonomy.
pub mod fault;
pub use fault::{FaultCode, FaultContext, RunFault};

/// Machine state, execution loop, debugger and console.
pub mod machine;
pub use machine::{
    is_affirmative, run_file, run_image, Cell, Console, ConsoleInput, DebugCommand, DebugMode,
    Debugger, DebuggerState, InterruptHandle, Machine, MachineConfig, MachineState, RunError,
    RunOutcome, ScriptedConsole, StdConsole, StepOutcome, MEMORY_WORDS, REGISTER_COUNT,
};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
