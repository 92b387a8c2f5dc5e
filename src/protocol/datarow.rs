//! Replication-lag `DataRow` decoder.
//!
//! Layout after the one-byte tag (big-endian):
//!
//! ```text
//! u32 total_size | u16 field_count (= 1) | u32 field_len | field_len bytes of text
//! ```

use bytes::Buf;
use thiserror::Error;

/// Replication lag as reported by the monitoring query.
pub type Lag = i64;

/// Length of a SQL NULL column in a `DataRow`.
const NULL_FIELD_LEN: u32 = u32::MAX;

/// Decoder errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("truncated buffer: needed {needed} bytes, {remaining} remaining")]
    TruncatedBuffer { needed: usize, remaining: usize },
    #[error("unexpected row shape: {field_count} fields, expected 1")]
    UnexpectedShape { field_count: u16 },
    #[error("lag column is NULL")]
    NullField,
}

/// Decode a single-column, single-row `DataRow` into a lag value.
///
/// `msg` is the complete backend message; its first byte (the tag) is
/// skipped without inspection.
pub fn decode_lag_row(msg: &[u8]) -> Result<Lag, DecodeError> {
    let mut buf = match msg.get(1..) {
        Some(rest) => rest,
        None => {
            return Err(DecodeError::TruncatedBuffer {
                needed: 1,
                remaining: 0,
            })
        }
    };

    // size (validated for presence only)
    ensure(buf, 4)?;
    let _total_size = buf.get_u32();

    ensure(buf, 2)?;
    let field_count = buf.get_u16();
    if field_count != 1 {
        return Err(DecodeError::UnexpectedShape { field_count });
    }

    ensure(buf, 4)?;
    let field_len = buf.get_u32();
    if field_len == NULL_FIELD_LEN {
        return Err(DecodeError::NullField);
    }

    let field_len = field_len as usize;
    ensure(buf, field_len)?;
    Ok(parse_integer_literal(&buf[..field_len]))
}

fn ensure(buf: &[u8], needed: usize) -> Result<(), DecodeError> {
    if buf.len() < needed {
        return Err(DecodeError::TruncatedBuffer {
            needed,
            remaining: buf.len(),
        });
    }
    Ok(())
}

/// Parse a C-style integer literal (`strtol` with base 0).
///
/// Accepts leading whitespace, an optional sign, and a `0x` (hex), `0`
/// (octal) or decimal body. Parsing stops at the first byte that is not a
/// digit of the detected radix. No digits yields 0; overflow saturates.
fn parse_integer_literal(text: &[u8]) -> Lag {
    let mut pos = 0;
    while pos < text.len() && text[pos].is_ascii_whitespace() {
        pos += 1;
    }

    let mut negative = false;
    if let Some(&sign) = text.get(pos) {
        if sign == b'-' || sign == b'+' {
            negative = sign == b'-';
            pos += 1;
        }
    }

    let radix = match (text.get(pos), text.get(pos + 1)) {
        (Some(b'0'), Some(b'x' | b'X'))
            if text.get(pos + 2).is_some_and(u8::is_ascii_hexdigit) =>
        {
            pos += 2;
            16
        }
        (Some(b'0'), _) => 8,
        _ => 10,
    };

    let mut value: Lag = 0;
    for &byte in &text[pos..] {
        let digit = match (byte as char).to_digit(radix) {
            Some(d) => Lag::from(d),
            None => break,
        };
        value = value.saturating_mul(Lag::from(radix));
        value = if negative {
            value.saturating_sub(digit)
        } else {
            value.saturating_add(digit)
        };
    }
    value
}
