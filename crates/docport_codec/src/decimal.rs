//! 128-bit decimal values.
//!
//! Stored in the IEEE 754-2008 binary integer decimal layout MongoDB uses:
//! sign bit, 14-bit biased exponent, 113-bit coefficient. The codec never
//! does arithmetic on these; it only has to carry the bytes and render the
//! `$numberDecimal` text form.

use crate::error::{CodecError, CodecResult};
use std::fmt;
use std::str::FromStr;

const EXPONENT_BIAS: i64 = 6176;
const EXPONENT_MIN: i64 = -6176;
const EXPONENT_MAX: i64 = 6111;
const MAX_DIGITS: usize = 34;
const MAX_COEFFICIENT: u128 = 10u128.pow(MAX_DIGITS as u32) - 1;
const COEFFICIENT_MASK: u128 = (1 << 113) - 1;

const SIGN_BIT: u128 = 1 << 127;
const NAN_BITS: u128 = 0x7c << 120;
const INFINITY_BITS: u128 = 0x78 << 120;

/// A decimal128 value, kept as its 16 little-endian bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal128([u8; 16]);

impl Decimal128 {
    /// Wraps raw little-endian bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the raw little-endian bytes.
    #[must_use]
    pub const fn bytes(&self) -> [u8; 16] {
        self.0
    }

    fn bits(&self) -> u128 {
        u128::from_le_bytes(self.0)
    }

    fn from_bits(bits: u128) -> Self {
        Self(bits.to_le_bytes())
    }
}

impl fmt::Display for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits = self.bits();
        let combination = (bits >> 122) & 0x1f;
        if combination == 0x1f {
            return f.write_str("NaN");
        }
        if bits & SIGN_BIT != 0 {
            f.write_str("-")?;
        }
        if combination == 0x1e {
            return f.write_str("Infinity");
        }

        let (biased, coefficient) = if (bits >> 125) & 0b11 == 0b11 {
            // Implicit 100 prefix: the coefficient always exceeds 34 digits.
            (((bits >> 111) & 0x3fff) as i64, 0)
        } else {
            (((bits >> 113) & 0x3fff) as i64, bits & COEFFICIENT_MASK)
        };
        let coefficient = if coefficient > MAX_COEFFICIENT { 0 } else { coefficient };
        let exponent = biased - EXPONENT_BIAS;
        let digits = coefficient.to_string();
        let adjusted = exponent + digits.len() as i64 - 1;

        if exponent <= 0 && adjusted >= -6 {
            if exponent == 0 {
                return f.write_str(&digits);
            }
            let point = digits.len() as i64 + exponent;
            if point > 0 {
                let (whole, fraction) = digits.split_at(point as usize);
                write!(f, "{whole}.{fraction}")
            } else {
                write!(f, "0.{}{digits}", "0".repeat((-point) as usize))
            }
        } else {
            let (first, rest) = digits.split_at(1);
            f.write_str(first)?;
            if !rest.is_empty() {
                write!(f, ".{rest}")?;
            }
            let sign = if adjusted >= 0 { "+" } else { "" };
            write!(f, "E{sign}{adjusted}")
        }
    }
}

impl FromStr for Decimal128 {
    type Err = CodecError;

    /// Parses the `$numberDecimal` text form.
    ///
    /// Values that need more than 34 significant digits, or an exponent
    /// outside the representable range, are rejected rather than rounded.
    fn from_str(s: &str) -> CodecResult<Self> {
        let invalid = || CodecError::malformed(format!("invalid decimal128 {s:?}"));

        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let sign = if negative { SIGN_BIT } else { 0 };
        match body.to_ascii_lowercase().as_str() {
            "nan" => return Ok(Self::from_bits(NAN_BITS)),
            "inf" | "infinity" => return Ok(Self::from_bits(INFINITY_BITS | sign)),
            _ => {}
        }

        let (mantissa, mut exponent) = match body.find(['e', 'E']) {
            Some(idx) => (
                &body[..idx],
                body[idx + 1..].parse::<i64>().map_err(|_| invalid())?,
            ),
            None => (body, 0),
        };
        let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction)
        {
            return Err(invalid());
        }
        exponent = exponent
            .checked_sub(fraction.len() as i64)
            .ok_or_else(invalid)?;

        let joined = format!("{whole}{fraction}");
        let mut digits = joined.trim_start_matches('0');
        while digits.len() > MAX_DIGITS && digits.ends_with('0') {
            digits = &digits[..digits.len() - 1];
            exponent += 1;
        }
        if digits.len() > MAX_DIGITS {
            return Err(CodecError::malformed(format!(
                "decimal128 {s:?} has more than {MAX_DIGITS} significant digits"
            )));
        }
        let mut coefficient: u128 = if digits.is_empty() {
            0
        } else {
            digits.parse().map_err(|_| invalid())?
        };

        while exponent > EXPONENT_MAX {
            if coefficient == 0 {
                exponent = EXPONENT_MAX;
                break;
            }
            if coefficient > MAX_COEFFICIENT / 10 {
                return Err(CodecError::malformed(format!("decimal128 {s:?} overflows")));
            }
            coefficient *= 10;
            exponent -= 1;
        }
        while exponent < EXPONENT_MIN {
            if coefficient == 0 {
                exponent = EXPONENT_MIN;
                break;
            }
            if coefficient % 10 != 0 {
                return Err(CodecError::malformed(format!(
                    "decimal128 {s:?} underflows"
                )));
            }
            coefficient /= 10;
            exponent += 1;
        }

        let biased = (exponent + EXPONENT_BIAS) as u128;
        Ok(Self::from_bits(sign | (biased << 113) | coefficient))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Decimal128 {
        s.parse().unwrap()
    }

    #[test]
    fn one_has_known_layout() {
        let mut expected = [0u8; 16];
        expected[0] = 1;
        expected[14] = 0x40;
        expected[15] = 0x30;
        assert_eq!(parse("1").bytes(), expected);
        assert_eq!(Decimal128::from_bytes(expected).to_string(), "1");
    }

    #[test]
    fn plain_notation() {
        for text in ["0", "-0", "1.23", "-12.5", "1000", "0.001", "0.000001", "100.00"] {
            assert_eq!(parse(text).to_string(), text, "{text}");
        }
    }

    #[test]
    fn scientific_notation() {
        assert_eq!(parse("1E+3").to_string(), "1E+3");
        assert_eq!(parse("0.0000001").to_string(), "1E-7");
        assert_eq!(parse("1.5e10").to_string(), "1.5E+10");
        assert_eq!(parse("-2.50E-9").to_string(), "-2.50E-9");
    }

    #[test]
    fn special_values() {
        assert_eq!(parse("NaN").to_string(), "NaN");
        assert_eq!(parse("Infinity").to_string(), "Infinity");
        assert_eq!(parse("-Infinity").to_string(), "-Infinity");
        assert_eq!(parse("-inf").to_string(), "-Infinity");
    }

    #[test]
    fn thirty_four_digits_fit() {
        let text = "1234567890123456789012345678901234";
        assert_eq!(parse(text).to_string(), text);
        assert!(format!("{text}5").parse::<Decimal128>().is_err());
        // Trailing zeros move into the exponent.
        assert_eq!(parse(&format!("{text}0")).to_string(), "1.234567890123456789012345678901234E+34");
    }

    #[test]
    fn exponent_limits() {
        assert_eq!(parse("1E+6111").to_string(), "1E+6111");
        assert_eq!(parse("1E-6176").to_string(), "1E-6176");
        assert!("1E-6177".parse::<Decimal128>().is_err());
        assert!("9999999999999999999999999999999999E+6112".parse::<Decimal128>().is_err());
    }

    #[test]
    fn reject_garbage() {
        for text in ["", "-", ".", "1.2.3", "abc", "1e", "1x5", "--1"] {
            assert!(text.parse::<Decimal128>().is_err(), "{text}");
        }
    }
}
