//! Top-level assembler pipeline.
//!
//! Each program line goes through parsing, mnemonic resolution, argument
//! encoding and the line-number check. A failing line is recorded with its
//! error and assembly carries on, so every diagnostic surfaces in one pass.
//! The image is only written when no line failed.

use std::fs;
use std::path::Path;

use hmmm_core::write_image;
use tracing::debug;

use crate::encoder::encode_instruction;
use crate::errors::{AssembleError, LineDiagnostic, LineErrorKind};
use crate::mnemonic::Dialect;
use crate::parser::parse_line;
use crate::source::{extract_program, SourceLine};

const LISTING_WIDTH: usize = 76;
const SUCCESS_PAD: usize = 27;
const FAILURE_PAD: usize = 31;

/// Assembly options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssembleOptions {
    /// Alias table used to resolve mnemonics.
    pub dialect: Dialect,
}

/// One program line after translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledLine {
    /// Position among program lines; also the instruction address.
    pub index: usize,
    /// 1-indexed line in the source file.
    pub source_line: usize,
    /// Encoded word text, or why the line failed.
    pub encoding: Result<String, LineErrorKind>,
    /// Source text of the line.
    pub source: String,
}

impl AssembledLine {
    /// The encoding, or the error marker when the line failed.
    #[must_use]
    pub fn text(&self) -> &str {
        match &self.encoding {
            Ok(bits) => bits,
            Err(kind) => kind.marker(),
        }
    }
}

/// Result of assembling a whole program.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssembledImage {
    /// Lines in program order.
    pub lines: Vec<AssembledLine>,
}

impl AssembledImage {
    /// Non-empty and free of error markers.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.lines.is_empty() && self.lines.iter().all(|line| line.encoding.is_ok())
    }

    /// Diagnostics for every failing line, in program order.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<LineDiagnostic> {
        self.lines
            .iter()
            .filter_map(|line| {
                line.encoding.as_ref().err().map(|kind| LineDiagnostic {
                    index: line.index,
                    source_line: line.source_line,
                    kind: kind.clone(),
                    text: line.source.clone(),
                })
            })
            .collect()
    }

    /// Binary image text; `None` unless the image is valid.
    #[must_use]
    pub fn to_image_text(&self) -> Option<String> {
        self.is_valid()
            .then(|| write_image(self.lines.iter().map(AssembledLine::text)))
    }

    /// Human-readable assembly listing with a success or failure banner.
    #[must_use]
    pub fn listing(&self) -> String {
        let mut out = String::new();
        let valid = self.is_valid();
        if valid {
            let rule = "-".repeat(22);
            out.push_str(&format!("\n{rule}\n| ASSEMBLY SUCCESSFUL |\n{rule}\n\n"));
        } else {
            out.push_str("\n***** ASSEMBLY TERMINATED UNSUCCESSFULLY *****\n");
            out.push_str("              ASSEMBLY RESULTS:\n\n");
            if self.lines.is_empty() {
                out.push_str("                <EMPTY FILE>\n\n");
                return out;
            }
        }

        let width = self
            .lines
            .iter()
            .map(|line| line.index.to_string().len())
            .max()
            .unwrap_or(1);
        let pad = if valid { SUCCESS_PAD } else { FAILURE_PAD };
        for line in &self.lines {
            let row = format!(
                "{:<width$} : {:<pad$}{}",
                line.index,
                line.text(),
                line.source
            );
            out.push_str(first_wrapped_line(&row, LISTING_WIDTH));
            out.push('\n');
        }
        out.push('\n');
        out
    }
}

/// Assembles already-extracted program lines.
#[must_use]
pub fn assemble_lines(lines: &[SourceLine], options: AssembleOptions) -> AssembledImage {
    let lines: Vec<AssembledLine> = lines
        .iter()
        .enumerate()
        .map(|(index, line)| AssembledLine {
            index,
            source_line: line.original_line,
            encoding: translate_line(index, &line.text, options.dialect),
            source: line.text.clone(),
        })
        .collect();

    let image = AssembledImage { lines };
    for diagnostic in image.diagnostics() {
        debug!(line = diagnostic.source_line, "{diagnostic}");
    }
    debug!(
        lines = image.lines.len(),
        valid = image.is_valid(),
        "assembled program"
    );
    image
}

/// Assembles source text.
#[must_use]
pub fn assemble_source(content: &str, options: AssembleOptions) -> AssembledImage {
    assemble_lines(&extract_program(content), options)
}

/// Assembles `source` and writes the binary image to `output`.
///
/// Nothing is written unless every line translated.
///
/// # Errors
///
/// Returns [`AssembleError::Io`] if the source cannot be read or the image
/// cannot be written, [`AssembleError::Empty`] for a program without lines,
/// and [`AssembleError::Lines`] when any line failed.
pub fn assemble_file(
    source: &Path,
    output: &Path,
    options: AssembleOptions,
) -> Result<AssembledImage, AssembleError> {
    let content = fs::read_to_string(source).map_err(|e| AssembleError::Io {
        path: source.display().to_string(),
        source: e,
    })?;
    let image = assemble_source(&content, options);

    if image.lines.is_empty() {
        return Err(AssembleError::Empty);
    }
    let Some(text) = image.to_image_text() else {
        return Err(AssembleError::Lines {
            diagnostics: image.diagnostics(),
            listing: image.listing(),
        });
    };

    fs::write(output, text).map_err(|e| AssembleError::Io {
        path: output.display().to_string(),
        source: e,
    })?;
    debug!(output = %output.display(), words = image.lines.len(), "wrote binary image");
    Ok(image)
}

fn translate_line(index: usize, text: &str, dialect: Dialect) -> Result<String, LineErrorKind> {
    let parsed = parse_line(text)?;
    let mnemonic = dialect
        .resolve(parsed.mnemonic)
        .ok_or_else(|| LineErrorKind::Operation(parsed.mnemonic.to_string()))?;
    let encoded = encode_instruction(mnemonic, parsed.args)?;

    if parsed.number.parse::<usize>().ok() != Some(index) {
        return Err(LineErrorKind::BadLineNumber {
            found: parsed.number.to_string(),
            expected: index,
        });
    }
    Ok(encoded)
}

/// First line of `text` greedily wrapped at `width` columns.
fn first_wrapped_line(text: &str, width: usize) -> &str {
    let Some((limit, _)) = text.char_indices().nth(width) else {
        return text.trim_end();
    };
    let head = &text[..limit];
    // Break at the last blank that still fits, unless the next char is one.
    let next_is_blank = text[limit..].starts_with(char::is_whitespace);
    if next_is_blank {
        return head.trim_end();
    }
    match head.rfind(char::is_whitespace) {
        Some(blank) if !head[..blank].trim_end().is_empty() => head[..blank].trim_end(),
        _ => head,
    }
}
