//! Source ingestion.
//!
//! Lines are trimmed, and blank lines and whole-line `#` comments are
//! dropped before numbering. Each kept line remembers where it came from so
//! diagnostics can point back into the file.

/// A program line with its original location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Trimmed source text.
    pub text: String,
    /// 1-indexed line number in the original file.
    pub original_line: usize,
}

/// Extracts the program lines from raw source text.
#[must_use]
pub fn extract_program(content: &str) -> Vec<SourceLine> {
    content
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let text = line.trim();
            if text.is_empty() || text.starts_with('#') {
                None
            } else {
                Some(SourceLine {
                    text: text.to_string(),
                    original_line: idx + 1,
                })
            }
        })
        .collect()
}
