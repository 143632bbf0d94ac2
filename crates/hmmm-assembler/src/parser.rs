//! Line grammar: `<number> <mnemonic> <args> [# comment]`.
//!
//! The grammar is checked character class by character class rather than
//! with a regex engine. Argument text is only checked for its alphabet
//! here; the encoder classifies the individual tokens.

use crate::errors::LineErrorKind;

/// A line that matched the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedLine<'a> {
    /// Declared line number, as written.
    pub number: &'a str,
    /// Lowercase mnemonic, before alias resolution.
    pub mnemonic: &'a str,
    /// Argument text with the comment and surrounding blanks removed.
    pub args: &'a str,
}

/// Parses one trimmed program line.
///
/// # Errors
///
/// Returns [`LineErrorKind::MissingLineNumber`] when the line would be a
/// valid instruction apart from the missing number, otherwise
/// [`LineErrorKind::Syntax`].
pub fn parse_line(line: &str) -> Result<ParsedLine<'_>, LineErrorKind> {
    let digits_end = line
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(line.len());
    let (number, rest) = line.split_at(digits_end);

    if number.is_empty() {
        return Err(if parse_instruction(line).is_some() {
            LineErrorKind::MissingLineNumber
        } else {
            LineErrorKind::Syntax
        });
    }
    if !rest.starts_with(char::is_whitespace) {
        return Err(LineErrorKind::Syntax);
    }

    let (mnemonic, args) = parse_instruction(rest.trim_start()).ok_or(LineErrorKind::Syntax)?;
    Ok(ParsedLine {
        number,
        mnemonic,
        args,
    })
}

/// Splits argument text on runs of commas and blanks.
///
/// A trailing comma leaves an empty final token so the count check and the
/// empty-argument check can see it.
#[must_use]
pub fn split_arguments(args: &str) -> Vec<&str> {
    if args.is_empty() {
        return Vec::new();
    }
    let mut tokens: Vec<&str> = args
        .split(is_separator)
        .filter(|token| !token.is_empty())
        .collect();
    if args.ends_with(is_separator) {
        tokens.push("");
    }
    tokens
}

fn parse_instruction(text: &str) -> Option<(&str, &str)> {
    let mnemonic_end = text
        .find(|c: char| !c.is_ascii_lowercase())
        .unwrap_or(text.len());
    if mnemonic_end == 0 {
        return None;
    }
    let (mnemonic, rest) = text.split_at(mnemonic_end);

    let body = match rest.find('#') {
        Some(hash) => {
            let body = &rest[..hash];
            // A comment must be separated from what precedes it.
            if !body.ends_with(char::is_whitespace) {
                return None;
            }
            body
        }
        None => rest,
    };

    let args = body.trim();
    if args.starts_with(',') {
        return None;
    }
    if !args.chars().all(|c| is_argument_char(c) || is_separator(c)) {
        return None;
    }
    Some((mnemonic, args))
}

const fn is_argument_char(c: char) -> bool {
    matches!(c, '-' | 'r' | 'R' | 'x' | 'X' | '0'..='9' | 'a'..='f' | 'A'..='F')
}

fn is_separator(c: char) -> bool {
    c == ',' || c.is_whitespace()
}
