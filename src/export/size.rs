//! Chunk size parsing.
//!
//! Sizes use `split -b` notation: an integer with an optional unit.
//! `K`, `M`, `G`, `T` and `KiB`..`TiB` are powers of 1024; `KB`..`TB` are
//! powers of 1000. The unit letter is case-insensitive.

use crate::error::{Error, Result};

/// Parse a chunk size such as "500M" into bytes.
pub fn parse_chunk_size(value: &str) -> Result<u64> {
    let invalid = |reason: &str| Error::InvalidChunkSize {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = value.trim();
    let split_at = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split_at);

    if digits.is_empty() {
        return Err(invalid("expected a number"));
    }
    let number: u64 = digits.parse().map_err(|_| invalid("number too large"))?;

    let multiplier = unit_multiplier(unit.trim()).ok_or_else(|| invalid("unknown unit"))?;
    let bytes = number
        .checked_mul(multiplier)
        .ok_or_else(|| invalid("size too large"))?;

    if bytes == 0 {
        return Err(invalid("must be greater than zero"));
    }
    Ok(bytes)
}

fn unit_multiplier(unit: &str) -> Option<u64> {
    if unit.is_empty() {
        return Some(1);
    }

    let mut chars = unit.chars();
    let exponent = match chars.next()?.to_ascii_uppercase() {
        'K' => 1,
        'M' => 2,
        'G' => 3,
        'T' => 4,
        _ => return None,
    };

    let base: u64 = match chars.as_str() {
        "" | "iB" | "IB" | "ib" => 1024,
        "B" | "b" => 1000,
        _ => return None,
    };
    Some(base.pow(exponent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_units() {
        assert_eq!(parse_chunk_size("500M").unwrap(), 524_288_000);
        assert_eq!(parse_chunk_size("1K").unwrap(), 1024);
        assert_eq!(parse_chunk_size("2k").unwrap(), 2048);
        assert_eq!(parse_chunk_size("1GiB").unwrap(), 1 << 30);
        assert_eq!(parse_chunk_size("1T").unwrap(), 1 << 40);
    }

    #[test]
    fn test_decimal_units_and_plain_bytes() {
        assert_eq!(parse_chunk_size("500MB").unwrap(), 500_000_000);
        assert_eq!(parse_chunk_size("2GB").unwrap(), 2_000_000_000);
        assert_eq!(parse_chunk_size("4096").unwrap(), 4096);
        assert_eq!(parse_chunk_size(" 10M ").unwrap(), 10 << 20);
    }

    #[test]
    fn test_rejects_bad_sizes() {
        for value in ["", "M", "0", "0M", "1.5G", "10X", "10MiBs", "-1M", "99999999999999999999"] {
            let err = parse_chunk_size(value).unwrap_err();
            assert!(
                matches!(err, Error::InvalidChunkSize { .. }),
                "expected '{}' to be rejected",
                value
            );
        }
        assert!(parse_chunk_size("100000000T").is_err());
    }
}
