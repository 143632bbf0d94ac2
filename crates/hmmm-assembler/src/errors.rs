//! Per-line diagnostics and file-level assembly failures.
//!
//! Every line that fails to translate produces a [`LineErrorKind`]. The kind
//! decides the `***...***` marker stored in the listing in place of the
//! encoding, and renders the longer explanation shown to the user.

use std::fmt;
use std::io;

use thiserror::Error;

/// Why a single argument was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentProblem {
    /// Source supplied the wrong number of arguments.
    WrongCount {
        /// Arguments found on the line.
        found: usize,
        /// Arguments the operation takes.
        expected: usize,
    },
    /// An argument slot was empty, e.g. a doubled separator.
    Empty,
    /// Token is not shaped like a register or a number.
    NeitherRegisterNorNumber(String),
    /// A register was written where a number belongs.
    NotANumber(String),
    /// Number outside the range of its slot.
    OutOfRange(String),
}

impl fmt::Display for ArgumentProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongCount { found, expected } => write!(
                f,
                "WRONG NUMBER OF ARGUMENTS.\nDETECTED {found} ARGUMENTS, EXPECTED {expected} ARGUMENTS."
            ),
            Self::Empty => f.write_str("EMPTY ARGUMENT."),
            Self::NeitherRegisterNorNumber(token) => {
                write!(f, "'{token}' IS NEITHER A REGISTER NOR A NUMBER.")
            }
            Self::NotANumber(token) => write!(f, "'{token}' IS NOT A VALID NUMBER."),
            Self::OutOfRange(token) => write!(f, "'{token}' IS OUT OF RANGE FOR THE ARGUMENT."),
        }
    }
}

/// Assembly-time error taxonomy. None of these stop assembly early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineErrorKind {
    /// Line does not match `<number> <mnemonic> <args> [# comment]`.
    Syntax,
    /// Line looks like an instruction but has no leading line number.
    MissingLineNumber,
    /// Declared line number differs from the line's position.
    BadLineNumber {
        /// Number written in the source.
        found: String,
        /// Position of the line among program lines.
        expected: usize,
    },
    /// Mnemonic is not in the active alias table.
    Operation(String),
    /// Argument count, shape or range problem.
    Argument(ArgumentProblem),
    /// Token in a register slot is not `r0`..`r15`.
    Register(String),
}

impl LineErrorKind {
    /// Placeholder stored in the listing instead of an encoding.
    #[must_use]
    pub const fn marker(&self) -> &'static str {
        match self {
            Self::Syntax => "***SYNTAX ERROR HERE***",
            Self::MissingLineNumber => "***MISSING LINE NUMBER HERE***",
            Self::BadLineNumber { .. } => "***BAD LINE NUMBER HERE***",
            Self::Operation(_) => "***OPERATION ERROR HERE***",
            Self::Argument(_) => "***ARGUMENT ERROR HERE***",
            Self::Register(_) => "***REGISTER ERROR HERE***",
        }
    }
}

impl fmt::Display for LineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => f.write_str("SYNTAX ERROR"),
            Self::MissingLineNumber => f.write_str("MISSING LINE NUMBER"),
            Self::BadLineNumber { found, expected } => {
                write!(f, "BAD LINE NUMBER\nLINE NUMBER: {found} EXPECTED: {expected}")
            }
            Self::Operation(name) => {
                write!(f, "OPERATION ERROR:\n'{name}' IS NOT A VALID OPERATION.")
            }
            Self::Argument(problem) => write!(f, "ARGUMENT ERROR:\n{problem}"),
            Self::Register(token) => {
                write!(f, "REGISTER ERROR:\n'{token}' IS NOT A VALID REGISTER.")
            }
        }
    }
}

/// A rejected line with its position and source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiagnostic {
    /// Position among program lines (0-indexed).
    pub index: usize,
    /// 1-indexed line in the source file.
    pub source_line: usize,
    /// What went wrong.
    pub kind: LineErrorKind,
    /// Offending source text.
    pub text: String,
}

impl fmt::Display for LineDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LineErrorKind::Syntax | LineErrorKind::MissingLineNumber => {
                write!(f, "{} ON LINE {}:\n{}", self.kind, self.index, self.text)
            }
            LineErrorKind::BadLineNumber { found, expected } => write!(
                f,
                "BAD LINE NUMBER AT LINE {}:\nLINE NUMBER: {found} EXPECTED: {expected}",
                self.index
            ),
            other => write!(f, "{other}\n{}", self.text),
        }
    }
}

/// File-level assembly failures.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// Source could not be read or the image could not be written.
    #[error("cannot access {path}: {source}")]
    Io {
        /// File involved.
        path: String,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// Source contained no program lines.
    #[error("empty file")]
    Empty,
    /// One or more lines failed to translate.
    #[error("assembly failed with {} error(s)", .diagnostics.len())]
    Lines {
        /// Every failing line, in program order.
        diagnostics: Vec<LineDiagnostic>,
        /// Failure listing for display.
        listing: String,
    },
}
