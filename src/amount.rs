//! Satoshi denominations and decimal conversion.
//!
//! The node speaks in decimal BTC; everything in this crate is u64 satoshi.
//! Conversion is pure integer arithmetic on the decimal string so no value
//! ever passes through a binary float.

/// Satoshi per bitcoin.
pub const COIN: u64 = 100_000_000;

/// Outputs below this many satoshi are considered dust and will not relay.
pub const DUST_LIMIT: u64 = 546;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("malformed decimal bitcoin amount")]
pub struct ParseAmountError;

/// Parse a plain decimal BTC amount ("1", "0.015", "1.00000000") into
/// satoshi, truncating anything beyond 8 fractional digits.
pub fn parse_btc(s: &str) -> Result<u64, ParseAmountError> {
    let (int_part, frac_part) = match s.find('.') {
        Some(pos) => (&s[..pos], &s[pos + 1..]),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(ParseAmountError);
    }
    if !int_part.bytes().all(|c| c.is_ascii_digit()) || !frac_part.bytes().all(|c| c.is_ascii_digit()) {
        return Err(ParseAmountError);
    }
    let int: u64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| ParseAmountError)?
    };
    let mut frac: u64 = 0;
    for c in frac_part.bytes().chain(std::iter::repeat(b'0')).take(8) {
        frac = frac * 10 + u64::from(c - b'0');
    }
    int.checked_mul(COIN)
        .and_then(|v| v.checked_add(frac))
        .ok_or(ParseAmountError)
}
