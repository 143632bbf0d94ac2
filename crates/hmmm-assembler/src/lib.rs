//! HMMM assembler library.

use ctrlc as _;
use tracing_subscriber as _;

/// Top-level assembly pipeline and listings.
pub mod assembler;
pub use assembler::{
    assemble_file, assemble_lines, assemble_source, AssembleOptions, AssembledImage,
    AssembledLine,
};

/// Argument validation and instruction encoding.
pub mod encoder;
/// Per-line diagnostics and file-level error types.
pub mod errors;
pub use errors::{ArgumentProblem, AssembleError, LineDiagnostic, LineErrorKind};

/// Mnemonic resolution against the core instruction set.
pub mod mnemonic;
pub use mnemonic::Dialect;

/// Line grammar for numbered instructions.
pub mod parser;
/// Source loading and program line extraction.
pub mod source;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use tempfile as _;
