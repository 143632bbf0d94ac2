//! Argument validation and instruction encoding.
//!
//! Arguments are rendered to bits slot by slot, then merged into the
//! opcode template. The template keeps its nibble separators, which is why
//! encoded lines carry the same spacing as the descriptor table.

use hmmm_core::{template, to_twos_complement, to_unsigned, ArgKind, Mnemonic, REGISTER_COUNT};

use crate::errors::{ArgumentProblem, LineErrorKind};
use crate::parser::split_arguments;

/// Encodes `mnemonic` with the raw argument text of a source line.
///
/// # Errors
///
/// Returns [`LineErrorKind::Argument`] for count, shape or range problems
/// and [`LineErrorKind::Register`] for a bad register name.
pub fn encode_instruction(mnemonic: Mnemonic, args: &str) -> Result<String, LineErrorKind> {
    let tokens = split_arguments(args);
    let expected = mnemonic.argument_count();
    if tokens.len() != expected {
        return Err(LineErrorKind::Argument(ArgumentProblem::WrongCount {
            found: tokens.len(),
            expected,
        }));
    }

    // Everything but the raw `data` word leaves the opcode nibble alone.
    let mut bits = if mnemonic.argument_origin() == 16 {
        String::new()
    } else {
        String::from("0000")
    };

    let mut tokens = tokens.into_iter();
    for &kind in mnemonic.shape() {
        if !kind.takes_argument() {
            bits.push_str("0000");
            continue;
        }
        let Some(token) = tokens.next() else {
            break;
        };
        bits.push_str(&encode_argument(kind, token)?);
    }

    Ok(insert_bits(&template(mnemonic), &bits))
}

/// Validates one token against its slot and renders its bits.
///
/// # Errors
///
/// See [`encode_instruction`].
pub fn encode_argument(kind: ArgKind, token: &str) -> Result<String, LineErrorKind> {
    if token.is_empty() {
        return Err(LineErrorKind::Argument(ArgumentProblem::Empty));
    }
    if !is_register_or_number(token) {
        return Err(LineErrorKind::Argument(
            ArgumentProblem::NeitherRegisterNorNumber(token.to_string()),
        ));
    }

    if kind == ArgKind::Register {
        let register =
            parse_register(token).ok_or_else(|| LineErrorKind::Register(token.to_string()))?;
        return Ok(format!("{register:04b}"));
    }
    if token.starts_with(['r', 'R']) {
        return Err(LineErrorKind::Argument(ArgumentProblem::NotANumber(
            token.to_string(),
        )));
    }

    let out_of_range = || LineErrorKind::Argument(ArgumentProblem::OutOfRange(token.to_string()));
    let value = parse_number(token).ok_or_else(|| {
        LineErrorKind::Argument(ArgumentProblem::NeitherRegisterNorNumber(token.to_string()))
    })?;
    let Some((min, max)) = kind.value_range() else {
        return Err(out_of_range());
    };
    let value = value.ok_or_else(out_of_range)?;
    if value < min || value > max {
        return Err(out_of_range());
    }

    let rendered = match kind {
        ArgKind::Signed8 => to_twos_complement(value, 8),
        ArgKind::Immediate16 if value < 0 => to_twos_complement(value, 16),
        ArgKind::Immediate16 => to_unsigned(value, 16),
        _ => to_unsigned(value, kind.width()),
    };
    rendered.map_err(|_| out_of_range())
}

/// ORs `bits` into `template`, keeping the template's blanks in place.
///
/// Blanks in `bits` are skipped. Once `bits` runs out the rest of the
/// template is copied unchanged.
#[must_use]
pub fn insert_bits(template: &str, bits: &str) -> String {
    let mut pending = bits.chars().filter(|c| *c != ' ');
    template
        .chars()
        .map(|t| {
            if t == ' ' {
                return ' ';
            }
            match pending.next() {
                Some('1') => '1',
                Some(_) | None => t,
            }
        })
        .collect()
}

/// `r0`..`r15`, either case, without leading zeros.
#[must_use]
pub fn parse_register(token: &str) -> Option<u8> {
    let digits = token.strip_prefix(['r', 'R'])?;
    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || (digits.len() > 1 && digits.starts_with('0'))
    {
        return None;
    }
    let index = digits.parse::<u8>().ok()?;
    (usize::from(index) < REGISTER_COUNT).then_some(index)
}

/// Token alphabet: a register, a decimal, a lone `-`, or `0x` hex.
fn is_register_or_number(token: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    if let Some(rest) = token.strip_prefix(['r', 'R']) {
        return all_digits(rest);
    }
    if token == "-" {
        return true;
    }
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        return !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit());
    }
    all_digits(token.strip_prefix('-').unwrap_or(token))
}

/// Parses a shape-checked numeric token.
///
/// The outer `None` means the token is not a number at all (a lone `-`);
/// the inner `None` means it is too large to represent.
fn parse_number(token: &str) -> Option<Option<i64>> {
    if token == "-" {
        return None;
    }
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        return Some(i64::from_str_radix(hex, 16).ok());
    }
    Some(token.parse::<i64>().ok())
}
