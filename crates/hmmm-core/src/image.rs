//! Binary image codec.
//!
//! An image is plain text with one instruction word per line. Each line
//! holds sixteen `'0'`/`'1'` characters, optionally broken up by the
//! separators of its opcode template. Only bit characters count towards the
//! width.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::machine::MEMORY_WORDS;

/// Failures while reading a binary image.
#[derive(Debug, Error)]
pub enum ImageError {
    /// A character outside `'0'`, `'1'`, `' '` and newline was found.
    #[error("not a valid binary file: unexpected {found:?} at line {line}, column {column}")]
    InvalidCharacter {
        /// 1-indexed line.
        line: usize,
        /// 1-indexed column.
        column: usize,
        /// Offending character.
        found: char,
    },
    /// The image has no instruction lines.
    #[error("empty file")]
    Empty,
    /// More instruction lines than the memory can hold.
    #[error("image has {lines} instructions but memory holds 256 words")]
    TooLarge {
        /// Number of instruction lines found.
        lines: usize,
    },
    /// The image file could not be read.
    #[error("cannot open file: {0}")]
    Io(#[from] io::Error),
}

/// A loaded image: one entry per non-empty line.
///
/// Lines that do not carry exactly sixteen bits are kept as `None` so the
/// machine can report them when (and only when) they are executed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Image {
    words: Vec<Option<u16>>,
}

impl Image {
    /// Builds an image from already-decoded words.
    #[must_use]
    pub fn from_words(words: impl IntoIterator<Item = u16>) -> Self {
        Self {
            words: words.into_iter().map(Some).collect(),
        }
    }

    /// Number of instruction cells; the first data address.
    #[must_use]
    pub fn code_size(&self) -> usize {
        self.words.len()
    }

    /// Instruction cells in address order.
    #[must_use]
    pub fn words(&self) -> &[Option<u16>] {
        &self.words
    }
}

/// Serialises already-encoded lines into image text, one per line.
#[must_use]
pub fn write_image<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut text = String::new();
    for line in lines {
        text.push_str(line.as_ref());
        text.push('\n');
    }
    text
}

/// Parses image text.
///
/// # Errors
///
/// Returns [`ImageError::InvalidCharacter`] for any character outside the
/// image alphabet, [`ImageError::Empty`] when no line carries content, and
/// [`ImageError::TooLarge`] when the code would not fit in memory.
pub fn read_image(text: &str) -> Result<Image, ImageError> {
    for (line_idx, line) in text.split('\n').enumerate() {
        for (col_idx, ch) in line.chars().enumerate() {
            if !matches!(ch, '0' | '1' | ' ') {
                return Err(ImageError::InvalidCharacter {
                    line: line_idx + 1,
                    column: col_idx + 1,
                    found: ch,
                });
            }
        }
    }

    let words: Vec<Option<u16>> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_word)
        .collect();

    if words.is_empty() {
        return Err(ImageError::Empty);
    }
    if words.len() > MEMORY_WORDS {
        return Err(ImageError::TooLarge { lines: words.len() });
    }

    Ok(Image { words })
}

/// Reads and parses an image file.
///
/// # Errors
///
/// Returns [`ImageError::Io`] if the file cannot be read, otherwise as
/// [`read_image`].
pub fn load_image(path: &Path) -> Result<Image, ImageError> {
    let text = fs::read_to_string(path)?;
    let image = read_image(&text)?;
    debug!(path = %path.display(), code_size = image.code_size(), "loaded binary image");
    Ok(image)
}

fn parse_word(line: &str) -> Option<u16> {
    let bits: Vec<bool> = line
        .chars()
        .filter(|c| *c != ' ')
        .map(|c| c == '1')
        .collect();
    if bits.len() != 16 {
        return None;
    }
    Some(bits.iter().fold(0_u16, |acc, &bit| (acc << 1) | u16::from(bit)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_grouped_and_ungrouped_words() {
        let image = read_image("0001 0001 0000 0101\n0000000000000010\n").unwrap();
        assert_eq!(image.code_size(), 2);
        assert_eq!(image.words(), &[Some(0x1105), Some(0x0002)]);
    }

    #[test]
    fn blank_lines_do_not_count_towards_code_size() {
        let image = read_image("0000 0000 0000 0000\n\n   \n0110 0000 0000 0000\n").unwrap();
        assert_eq!(image.code_size(), 2);
    }

    #[test]
    fn malformed_width_is_kept_for_run_time() {
        let image = read_image("0000 0000 0000\n").unwrap();
        assert_eq!(image.words(), &[None]);
    }

    #[test]
    fn foreign_characters_are_rejected() {
        let err = read_image("0000 0000 0000 0000\n0000 0000 0000 000x\n").unwrap_err();
        assert!(matches!(
            err,
            ImageError::InvalidCharacter {
                line: 2,
                column: 19,
                found: 'x'
            }
        ));
    }

    #[test]
    fn carriage_returns_are_foreign() {
        assert!(matches!(
            read_image("0000 0000 0000 0000\r\n"),
            Err(ImageError::InvalidCharacter { found: '\r', .. })
        ));
    }

    #[test]
    fn empty_image_is_rejected() {
        assert!(matches!(read_image(""), Err(ImageError::Empty)));
        assert!(matches!(read_image("\n\n"), Err(ImageError::Empty)));
    }

    #[test]
    fn oversized_image_is_rejected() {
        let text = "0000 0000 0000 0000\n".repeat(MEMORY_WORDS + 1);
        assert!(matches!(
            read_image(&text),
            Err(ImageError::TooLarge { lines }) if lines == MEMORY_WORDS + 1
        ));
    }

    #[test]
    fn write_emits_one_line_per_word() {
        let text = write_image(["0001 0001 0000 0101", "0000 0000 0000 0000"]);
        assert_eq!(text, "0001 0001 0000 0101\n0000 0000 0000 0000\n");
        assert_eq!(read_image(&text).unwrap().code_size(), 2);
    }
}
