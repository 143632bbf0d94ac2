//! Instruction decoder.
//!
//! Decoding finds the first matching opcode row, then walks the argument
//! shape left to right, peeling each slot off the top of the remaining bits.

use std::fmt;

use crate::encoding::{classify_word, ArgKind, Mnemonic};

/// Text shown when a cell cannot be disassembled.
pub const UNTRANSLATABLE: &str = "***UNTRANSLATABLE INSTRUCTION!***";

/// A decoded argument value, typed by its slot kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Argument {
    /// Register number `0..=15`.
    Register(u8),
    /// Signed 8-bit immediate.
    Signed(i8),
    /// Unsigned 8-bit immediate.
    Unsigned(u8),
    /// Raw 16-bit word (shown unsigned).
    Word(u16),
}

impl Argument {
    /// Numeric value of the argument.
    #[must_use]
    pub fn value(self) -> i32 {
        match self {
            Self::Register(r) | Self::Unsigned(r) => i32::from(r),
            Self::Signed(v) => i32::from(v),
            Self::Word(w) => i32::from(w),
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register(r) => write!(f, "r{r}"),
            other => write!(f, "{}", other.value()),
        }
    }
}

/// A fully decoded instruction word.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DecodedInstruction {
    /// Raw word the instruction was decoded from.
    pub word: u16,
    /// Selected operation.
    pub mnemonic: Mnemonic,
    /// Arguments in source order, filler slots omitted.
    pub args: Vec<Argument>,
}

impl DecodedInstruction {
    /// Register number held in argument `index`, if that slot is a register.
    #[must_use]
    pub fn register(&self, index: usize) -> Option<usize> {
        match self.args.get(index) {
            Some(Argument::Register(r)) => Some(usize::from(*r)),
            _ => None,
        }
    }

    /// Numeric value held in argument `index`, if that slot is a number.
    #[must_use]
    pub fn number(&self, index: usize) -> Option<i32> {
        match self.args.get(index) {
            Some(Argument::Register(_)) | None => None,
            Some(other) => Some(other.value()),
        }
    }

    /// Assembly-style rendering, e.g. `add r3, r1, r2`.
    #[must_use]
    pub fn translation(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic.name())?;
        for (i, arg) in self.args.iter().enumerate() {
            let separator = if i == 0 { " " } else { ", " };
            write!(f, "{separator}{arg}")?;
        }
        Ok(())
    }
}

/// Stateless decoder over the shared opcode table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder;

impl Decoder {
    /// Decodes `word`; `None` only if no table row matches.
    #[must_use]
    pub fn decode(word: u16) -> Option<DecodedInstruction> {
        let entry = classify_word(word)?;
        let mnemonic = entry.mnemonic;
        let mut top = mnemonic.argument_origin();
        let mut args = Vec::with_capacity(mnemonic.shape().len());

        for &kind in mnemonic.shape() {
            top -= kind.width();
            let field = (u32::from(word) >> top) & ((1_u32 << kind.width()) - 1);
            if let Some(arg) = field_to_argument(kind, field) {
                args.push(arg);
            }
        }

        Some(DecodedInstruction {
            word,
            mnemonic,
            args,
        })
    }

    /// Disassembles `word`, falling back to the untranslatable marker.
    #[must_use]
    pub fn disassemble(word: u16) -> String {
        Self::decode(word).map_or_else(|| UNTRANSLATABLE.to_string(), |d| d.to_string())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn field_to_argument(kind: ArgKind, field: u32) -> Option<Argument> {
    match kind {
        ArgKind::Register => Some(Argument::Register(field as u8)),
        ArgKind::Signed8 => Some(Argument::Signed(field as u8 as i8)),
        ArgKind::Unsigned8 => Some(Argument::Unsigned(field as u8)),
        ArgKind::Immediate16 => Some(Argument::Word(field as u16)),
        ArgKind::Filler => None,
    }
}
