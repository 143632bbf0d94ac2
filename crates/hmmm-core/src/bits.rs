//! Two's-complement helpers over textual bit patterns.
//!
//! The assembler and the binary image format both speak in `'0'`/`'1'`
//! text, so every helper here accepts and produces bit strings. Underneath,
//! the arithmetic runs on masked native integers so widths and carries stay
//! explicit no matter how wide the host integer is.

use thiserror::Error;

/// Widest bit string accepted by the parsing helpers.
pub const MAX_BIT_STRING_LEN: usize = 63;

/// Widest field that can be rendered by [`to_twos_complement`] and [`to_unsigned`].
pub const MAX_FIELD_WIDTH: u32 = 32;

/// Failure modes of the bit-string helpers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitError {
    /// Value cannot be represented in the requested width.
    #[error("{value} does not fit in {width} bits")]
    OutOfRange {
        /// Value that was rejected.
        value: i64,
        /// Requested field width.
        width: u32,
    },
    /// Input contained something other than `'0'` or `'1'`.
    #[error("invalid bit character {0:?}")]
    InvalidDigit(char),
    /// Input was empty where a value was required.
    #[error("empty bit string")]
    Empty,
    /// Input was longer than [`MAX_BIT_STRING_LEN`].
    #[error("bit string of {0} bits is too wide")]
    TooWide(usize),
    /// Requested field width was zero or above [`MAX_FIELD_WIDTH`].
    #[error("unsupported field width {0}")]
    UnsupportedWidth(u32),
}

/// Inclusive signed range representable in `width` bits.
#[must_use]
pub const fn signed_range(width: u32) -> (i64, i64) {
    let half = 1_i64 << (width - 1);
    (-half, half - 1)
}

/// Renders `value` as a `width`-bit two's-complement string.
///
/// # Errors
///
/// Returns [`BitError::OutOfRange`] when `value` lies outside
/// `[-2^(width-1), 2^(width-1) - 1]`, or [`BitError::UnsupportedWidth`] for
/// widths outside `1..=32`.
pub fn to_twos_complement(value: i64, width: u32) -> Result<String, BitError> {
    check_field_width(width)?;
    let (min, max) = signed_range(width);
    if value < min || value > max {
        return Err(BitError::OutOfRange { value, width });
    }
    #[allow(clippy::cast_sign_loss)]
    let raw = (value as u64) & field_mask(width);
    Ok(render(raw, width as usize))
}

/// Renders a non-negative `value` as a zero-padded `width`-bit string.
///
/// # Errors
///
/// Returns [`BitError::OutOfRange`] when `value` is negative or needs more
/// than `width` bits.
pub fn to_unsigned(value: i64, width: u32) -> Result<String, BitError> {
    check_field_width(width)?;
    let raw = u64::try_from(value).map_err(|_| BitError::OutOfRange { value, width })?;
    if raw > field_mask(width) {
        return Err(BitError::OutOfRange { value, width });
    }
    Ok(render(raw, width as usize))
}

/// Interprets a bit string as two's complement; the leading bit is the sign.
///
/// # Errors
///
/// Returns [`BitError::Empty`], [`BitError::InvalidDigit`] or
/// [`BitError::TooWide`] for malformed input.
pub fn from_twos_complement(bits: &str) -> Result<i64, BitError> {
    let (raw, len) = parse_bits(bits)?;
    if len == 0 {
        return Err(BitError::Empty);
    }
    let unsigned = i128::from(raw);
    let value = if bits.starts_with('1') {
        unsigned - (1_i128 << len)
    } else {
        unsigned
    };
    i64::try_from(value).map_err(|_| BitError::TooWide(len))
}

/// Interprets a bit string as an unsigned binary number.
///
/// # Errors
///
/// Returns [`BitError::InvalidDigit`] or [`BitError::TooWide`] for malformed input.
pub fn from_unsigned(bits: &str) -> Result<u64, BitError> {
    parse_bits(bits).map(|(raw, _)| raw)
}

/// Right-aligned ripple-carry addition of two bit strings.
///
/// The result is as wide as the wider operand, plus one bit only when the
/// final carry is set. Nothing is truncated.
///
/// # Errors
///
/// Returns [`BitError::InvalidDigit`] or [`BitError::TooWide`] for malformed input.
pub fn add_bits(a: &str, b: &str) -> Result<String, BitError> {
    let (lhs, lhs_len) = parse_bits(a)?;
    let (rhs, rhs_len) = parse_bits(b)?;
    let width = lhs_len.max(rhs_len);
    let sum = lhs + rhs;
    if width == 0 {
        return Ok(String::new());
    }
    if sum >> width == 0 {
        Ok(render(sum, width))
    } else {
        Ok(render(sum, width + 1))
    }
}

/// Flips every bit (one's complement).
///
/// # Errors
///
/// Returns [`BitError::InvalidDigit`] or [`BitError::TooWide`] for malformed input.
pub fn complement(bits: &str) -> Result<String, BitError> {
    let (raw, len) = parse_bits(bits)?;
    if len == 0 {
        return Ok(String::new());
    }
    Ok(render(!raw & len_mask(len), len))
}

/// Two's-complement negation: flip, then add one.
///
/// Negating an all-zero string carries out and grows the result by a bit,
/// exactly as [`add_bits`] does.
///
/// # Errors
///
/// Returns [`BitError::InvalidDigit`] or [`BitError::TooWide`] for malformed input.
pub fn negate(bits: &str) -> Result<String, BitError> {
    add_bits(&complement(bits)?, "1")
}

const fn check_field_width(width: u32) -> Result<(), BitError> {
    if width == 0 || width > MAX_FIELD_WIDTH {
        return Err(BitError::UnsupportedWidth(width));
    }
    Ok(())
}

const fn field_mask(width: u32) -> u64 {
    (1_u64 << width) - 1
}

const fn len_mask(len: usize) -> u64 {
    if len >= 64 {
        u64::MAX
    } else {
        (1_u64 << len) - 1
    }
}

fn parse_bits(bits: &str) -> Result<(u64, usize), BitError> {
    let len = bits.len();
    if len > MAX_BIT_STRING_LEN {
        return Err(BitError::TooWide(len));
    }
    bits.chars().try_fold((0_u64, len), |(acc, len), ch| match ch {
        '0' => Ok((acc << 1, len)),
        '1' => Ok(((acc << 1) | 1, len)),
        other => Err(BitError::InvalidDigit(other)),
    })
}

fn render(raw: u64, width: usize) -> String {
    format!("{raw:0width$b}")
}
