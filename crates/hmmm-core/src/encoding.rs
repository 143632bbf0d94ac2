//! Instruction set descriptor: the ordered opcode table and argument shapes.
//!
//! The table is first-match-wins. Specialised patterns (`nop`, `mov`,
//! `neg`, `jump`) sit before the general encodings they overlap with, and
//! the all-zero-mask `data` entry must stay last.

use std::fmt;
use std::str::FromStr;

/// Every operation the machine knows, in descriptor order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Mnemonic {
    Halt,
    Read,
    Write,
    Jumpi,
    Loadn,
    Load,
    Store,
    Loadi,
    Storei,
    Addn,
    Nop,
    Mov,
    Add,
    Neg,
    Sub,
    Mul,
    Div,
    Mod,
    Jump,
    Call,
    Jeqz,
    Jnez,
    Jgtz,
    Jltz,
    Data,
}

/// Kind of a single argument slot within an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ArgKind {
    /// Register number, 4 bits.
    Register,
    /// Signed 8-bit immediate.
    Signed8,
    /// Unsigned 8-bit immediate.
    Unsigned8,
    /// Full 16-bit word, signed or unsigned.
    Immediate16,
    /// Four zero bits that consume no source argument.
    Filler,
}

impl ArgKind {
    /// Number of instruction bits this slot occupies.
    #[must_use]
    pub const fn width(self) -> u32 {
        match self {
            Self::Register | Self::Filler => 4,
            Self::Signed8 | Self::Unsigned8 => 8,
            Self::Immediate16 => 16,
        }
    }

    /// Whether the slot is filled from a source argument.
    #[must_use]
    pub const fn takes_argument(self) -> bool {
        !matches!(self, Self::Filler)
    }

    /// Inclusive range of values accepted for numeric slots.
    #[must_use]
    pub const fn value_range(self) -> Option<(i64, i64)> {
        match self {
            Self::Signed8 => Some((-128, 127)),
            Self::Unsigned8 => Some((0, 255)),
            Self::Immediate16 => Some((-32768, 65535)),
            Self::Register | Self::Filler => None,
        }
    }

    /// Single-letter shape code (`r`, `s`, `u`, `n`, `z`).
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Register => 'r',
            Self::Signed8 => 's',
            Self::Unsigned8 => 'u',
            Self::Immediate16 => 'n',
            Self::Filler => 'z',
        }
    }
}

use ArgKind::{Filler as Z, Immediate16 as N, Register as R, Signed8 as S, Unsigned8 as U};

impl Mnemonic {
    /// All mnemonics in descriptor order.
    pub const ALL: [Self; 25] = [
        Self::Halt,
        Self::Read,
        Self::Write,
        Self::Jumpi,
        Self::Loadn,
        Self::Load,
        Self::Store,
        Self::Loadi,
        Self::Storei,
        Self::Addn,
        Self::Nop,
        Self::Mov,
        Self::Add,
        Self::Neg,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Mod,
        Self::Jump,
        Self::Call,
        Self::Jeqz,
        Self::Jnez,
        Self::Jgtz,
        Self::Jltz,
        Self::Data,
    ];

    /// Lowercase assembly name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Halt => "halt",
            Self::Read => "read",
            Self::Write => "write",
            Self::Jumpi => "jumpi",
            Self::Loadn => "loadn",
            Self::Load => "load",
            Self::Store => "store",
            Self::Loadi => "loadi",
            Self::Storei => "storei",
            Self::Addn => "addn",
            Self::Nop => "nop",
            Self::Mov => "mov",
            Self::Add => "add",
            Self::Neg => "neg",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Jump => "jump",
            Self::Call => "call",
            Self::Jeqz => "jeqz",
            Self::Jnez => "jnez",
            Self::Jgtz => "jgtz",
            Self::Jltz => "jltz",
            Self::Data => "data",
        }
    }

    /// Ordered argument slots for this operation.
    #[must_use]
    pub const fn shape(self) -> &'static [ArgKind] {
        match self {
            Self::Halt | Self::Nop => &[],
            Self::Read | Self::Write | Self::Jumpi => &[R],
            Self::Loadn | Self::Addn => &[R, S],
            Self::Load
            | Self::Store
            | Self::Call
            | Self::Jeqz
            | Self::Jnez
            | Self::Jgtz
            | Self::Jltz => &[R, U],
            Self::Loadi | Self::Storei | Self::Mov => &[R, R],
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod => &[R, R, R],
            Self::Neg => &[R, Z, R],
            Self::Jump => &[Z, U],
            Self::Data => &[N],
        }
    }

    /// Number of source arguments the assembler expects.
    #[must_use]
    pub fn argument_count(self) -> usize {
        self.shape().iter().filter(|kind| kind.takes_argument()).count()
    }

    /// Descriptor entry for this mnemonic.
    #[must_use]
    pub fn entry(self) -> &'static OpcodeEntry {
        OPCODE_TABLE
            .iter()
            .find(|entry| entry.mnemonic == self)
            .unwrap_or(&OPCODE_TABLE[OPCODE_TABLE.len() - 1])
    }

    /// Bit position just above the first argument slot.
    ///
    /// Everything but `data` keeps its top nibble for the opcode.
    #[must_use]
    pub const fn argument_origin(self) -> u32 {
        match self {
            Self::Data => 16,
            _ => 12,
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a name is not part of the descriptor vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mnemonic: {0}")]
pub struct UnknownMnemonic(pub String);

impl FromStr for Mnemonic {
    type Err = UnknownMnemonic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| UnknownMnemonic(s.to_string()))
    }
}

/// One row of the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct OpcodeEntry {
    /// Bits that must be present under `mask_bits`.
    pub match_bits: u16,
    /// Bits that participate in matching.
    pub mask_bits: u16,
    /// Operation selected by this row.
    pub mnemonic: Mnemonic,
}

impl OpcodeEntry {
    /// Returns true if `word` selects this row.
    #[must_use]
    pub const fn matches(&self, word: u16) -> bool {
        word & self.mask_bits == self.match_bits
    }
}

const fn entry(match_bits: u16, mask_bits: u16, mnemonic: Mnemonic) -> OpcodeEntry {
    OpcodeEntry {
        match_bits,
        mask_bits,
        mnemonic,
    }
}

/// The ordered opcode table shared by the assembler and the machine.
pub const OPCODE_TABLE: [OpcodeEntry; 25] = [
    entry(0b0000_0000_0000_0000, 0b1111_1111_1111_1111, Mnemonic::Halt),
    entry(0b0000_0000_0000_0001, 0b1111_0000_1111_1111, Mnemonic::Read),
    entry(0b0000_0000_0000_0010, 0b1111_0000_1111_1111, Mnemonic::Write),
    entry(0b0000_0000_0000_0011, 0b1111_0000_1111_1111, Mnemonic::Jumpi),
    entry(0b0001_0000_0000_0000, 0b1111_0000_0000_0000, Mnemonic::Loadn),
    entry(0b0010_0000_0000_0000, 0b1111_0000_0000_0000, Mnemonic::Load),
    entry(0b0011_0000_0000_0000, 0b1111_0000_0000_0000, Mnemonic::Store),
    entry(0b0100_0000_0000_0000, 0b1111_0000_0000_1111, Mnemonic::Loadi),
    entry(0b0100_0000_0000_0001, 0b1111_0000_0000_1111, Mnemonic::Storei),
    entry(0b0101_0000_0000_0000, 0b1111_0000_0000_0000, Mnemonic::Addn),
    entry(0b0110_0000_0000_0000, 0b1111_1111_1111_1111, Mnemonic::Nop),
    entry(0b0110_0000_0000_0000, 0b1111_0000_0000_1111, Mnemonic::Mov),
    entry(0b0110_0000_0000_0000, 0b1111_0000_0000_0000, Mnemonic::Add),
    entry(0b0111_0000_0000_0000, 0b1111_0000_1111_0000, Mnemonic::Neg),
    entry(0b0111_0000_0000_0000, 0b1111_0000_0000_0000, Mnemonic::Sub),
    entry(0b1000_0000_0000_0000, 0b1111_0000_0000_0000, Mnemonic::Mul),
    entry(0b1001_0000_0000_0000, 0b1111_0000_0000_0000, Mnemonic::Div),
    entry(0b1010_0000_0000_0000, 0b1111_0000_0000_0000, Mnemonic::Mod),
    entry(0b1011_0000_0000_0000, 0b1111_1111_0000_0000, Mnemonic::Jump),
    entry(0b1011_0000_0000_0000, 0b1111_0000_0000_0000, Mnemonic::Call),
    entry(0b1100_0000_0000_0000, 0b1111_0000_0000_0000, Mnemonic::Jeqz),
    entry(0b1101_0000_0000_0000, 0b1111_0000_0000_0000, Mnemonic::Jnez),
    entry(0b1110_0000_0000_0000, 0b1111_0000_0000_0000, Mnemonic::Jgtz),
    entry(0b1111_0000_0000_0000, 0b1111_0000_0000_0000, Mnemonic::Jltz),
    entry(0b0000_0000_0000_0000, 0b0000_0000_0000_0000, Mnemonic::Data),
];

/// Returns the first table row matching `word`.
#[must_use]
pub fn classify_word(word: u16) -> Option<&'static OpcodeEntry> {
    OPCODE_TABLE.iter().find(|entry| entry.matches(word))
}

/// Renders a word as four space-separated nibbles, the layout every opcode
/// template uses.
#[must_use]
pub fn format_word(word: u16) -> String {
    let bits = format!("{word:016b}");
    let nibbles: Vec<&str> = (0..4).map(|i| &bits[i * 4..i * 4 + 4]).collect();
    nibbles.join(" ")
}

/// The opcode template for `mnemonic` in image-line form.
#[must_use]
pub fn template(mnemonic: Mnemonic) -> String {
    format_word(mnemonic.entry().match_bits)
}
