//! Decimal conversion helpers for AT command arguments.
//!
//! The only formatting this crate ever does is decimal integers, so the
//! heavier `core::fmt` machinery is avoided on purpose.

/// Formats `value` as a decimal string into `buf`, returning the used slice.
///
/// The digits are assembled from the right-hand end of `buf`, like the
/// classic itoa. `buf` must be large enough for the value plus sign; twelve
/// bytes cover the full `i32` range.
pub fn format_decimal(value: i32, buf: &mut [u8]) -> &str {
    let negative = value < 0;
    // i32::MIN has no positive counterpart, widen before negating
    let mut rest = (value as i64).unsigned_abs();

    let mut pos = buf.len();
    loop {
        pos -= 1;
        buf[pos] = b'0' + (rest % 10) as u8;
        rest /= 10;
        if rest == 0 || pos == 0 {
            break;
        }
    }

    if negative && pos > 0 {
        pos -= 1;
        buf[pos] = b'-';
    }

    // Only ASCII digits and '-' were written
    core::str::from_utf8(&buf[pos..]).unwrap_or("")
}

/// Parses a leading decimal integer, tolerating a sign and ignoring any
/// trailing junk. Empty or non-numeric input parses as 0, matching what the
/// modem's sloppier query responses require.
pub fn parse_decimal(text: &str) -> i32 {
    let bytes = text.as_bytes();
    let negative = bytes.first() == Some(&b'-');
    let digits = if negative { &bytes[1..] } else { bytes };

    let mut value: i32 = 0;
    for byte in digits {
        if !byte.is_ascii_digit() {
            break;
        }
        value = value.wrapping_mul(10).wrapping_add(i32::from(byte - b'0'));
    }

    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}
