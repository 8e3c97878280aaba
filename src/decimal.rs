//! `FixedDecimal` (C1): an arbitrary-precision signed
//! integer carrying a fixed decimal scale.
//!
//! Backed by [`num_bigint::BigInt`] rather than a fixed-width integer: the
//! AMM formulas multiply two reserve values directly before taking a
//! square root, which can exceed `i128` range even when each reserve
//! individually fits `u64::MAX * 10^18`.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::error::DecimalError;

/// An arbitrary-precision signed integer at a fixed decimal `scale`
/// (number of fractional digits, always `<= 18`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FixedDecimal {
    value: BigInt,
    scale: u8,
}

impl FixedDecimal {
    pub fn zero(scale: u8) -> Self {
        Self {
            value: BigInt::zero(),
            scale,
        }
    }

    pub fn from_raw(value: BigInt, scale: u8) -> Self {
        Self { value, scale }
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn raw(&self) -> &BigInt {
        &self.value
    }

    /// Parse a decimal string. The result is always stored at `max_scale`
    /// (never at whatever precision the input happened to use).
    ///
    /// Rejects: empty input, leading `+`, leading/trailing whitespace, a
    /// lone `.`, an empty fractional part after a dot (so a trailing dot
    /// like `"123."` is an error — see `DESIGN.md` for why), multiple
    /// dots, and a fractional part longer than `max_scale` digits. Accepts a leading
    /// `-`. The integer part must be non-empty.
    pub fn parse(s: &str, max_scale: u8) -> Result<Self, DecimalError> {
        if s.is_empty() {
            return Err(DecimalError::Empty);
        }
        if s.trim() != s {
            return Err(DecimalError::Whitespace);
        }
        if s.starts_with('+') {
            return Err(DecimalError::LeadingPlus);
        }

        let negative = s.starts_with('-');
        let unsigned = if negative { &s[1..] } else { s };

        let mut parts = unsigned.splitn(3, '.');
        let int_part = parts.next().unwrap_or("");
        let frac_part = parts.next();
        if parts.next().is_some() {
            return Err(DecimalError::MultipleDots);
        }

        if int_part.is_empty() {
            return Err(DecimalError::EmptyIntegerPart);
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DecimalError::InvalidDigit);
        }

        let frac_digits = match frac_part {
            None => "",
            Some("") => return Err(DecimalError::EmptyFractionalPart),
            Some(f) => {
                if !f.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(DecimalError::InvalidDigit);
                }
                if f.len() > max_scale as usize {
                    return Err(DecimalError::PrecisionExceeded {
                        actual: f.len(),
                        max: max_scale,
                    });
                }
                f
            }
        };

        let mut digits = String::with_capacity(int_part.len() + max_scale as usize);
        digits.push_str(int_part);
        digits.push_str(frac_digits);
        for _ in 0..(max_scale as usize - frac_digits.len()) {
            digits.push('0');
        }

        let mut value: BigInt = digits.parse().map_err(|_| DecimalError::InvalidDigit)?;
        if negative {
            value = -value;
        }

        Ok(Self {
            value,
            scale: max_scale,
        })
    }

    pub fn add(&self, other: &Self) -> Result<Self, DecimalError> {
        self.require_same_scale(other)?;
        Ok(Self {
            value: &self.value + &other.value,
            scale: self.scale,
        })
    }

    pub fn sub(&self, other: &Self) -> Result<Self, DecimalError> {
        self.require_same_scale(other)?;
        Ok(Self {
            value: &self.value - &other.value,
            scale: self.scale,
        })
    }

    fn require_same_scale(&self, other: &Self) -> Result<(), DecimalError> {
        if self.scale != other.scale {
            return Err(DecimalError::ScaleMismatch {
                a: self.scale,
                b: other.scale,
            });
        }
        Ok(())
    }

    /// Raw integer product at `self`'s scale. The caller is responsible
    /// for rescaling when the product is semantically at a different
    /// scale (this matches how the AMM formulas combine ratios).
    pub fn mul(&self, other: &Self) -> Self {
        Self {
            value: &self.value * &other.value,
            scale: self.scale,
        }
    }

    /// Truncated integer quotient at `self`'s scale. `other == 0` is a
    /// caller bug; callers in this crate only ever divide by values
    /// already checked nonzero.
    pub fn div(&self, other: &Self) -> Result<Self, DecimalError> {
        if other.value.is_zero() {
            return Err(DecimalError::DivisionByZero);
        }
        Ok(Self {
            value: &self.value / &other.value,
            scale: self.scale,
        })
    }

    /// Integer square root of the raw value. Result scale is always 18.
    pub fn sqrt(&self) -> Self {
        Self {
            value: isqrt(&self.value),
            scale: 18,
        }
    }

    pub fn sign(&self) -> i8 {
        if self.value.is_positive() {
            1
        } else if self.value.is_negative() {
            -1
        } else {
            0
        }
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn cmp_value(&self, other: &Self) -> Ordering {
        debug_assert_eq!(self.scale, other.scale, "compared FixedDecimal at different scales");
        self.value.cmp(&other.value)
    }

    pub fn is_overflow_u64(&self) -> bool {
        let max = BigInt::from(u64::MAX) * ten_pow(self.scale);
        self.value > max
    }

    pub fn to_u128(&self) -> Option<u128> {
        self.value.to_u128()
    }

    pub fn rescale(&self, new_scale: u8) -> Self {
        use std::cmp::Ordering as O;
        let value = match new_scale.cmp(&self.scale) {
            O::Equal => self.value.clone(),
            O::Greater => &self.value * ten_pow(new_scale - self.scale),
            O::Less => &self.value / ten_pow(self.scale - new_scale),
        };
        Self {
            value,
            scale: new_scale,
        }
    }
}

impl PartialEq for FixedDecimal {
    fn eq(&self, other: &Self) -> bool {
        self.scale == other.scale && self.value == other.value
    }
}
impl Eq for FixedDecimal {}

impl PartialOrd for FixedDecimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.scale != other.scale {
            return None;
        }
        Some(self.value.cmp(&other.value))
    }
}

fn ten_pow(exp: u8) -> BigInt {
    BigInt::from(10u8).pow(exp as u32)
}

/// Newton's-method integer square root, floor-rounded, for `n >= 0`.
fn isqrt(n: &BigInt) -> BigInt {
    if n.is_zero() || n.is_negative() {
        return BigInt::zero();
    }
    let mut x = n.clone();
    let mut y = (&x + BigInt::from(1)) / BigInt::from(2);
    while y < x {
        x = y.clone();
        y = (&x + n / &x) / BigInt::from(2);
    }
    x
}

impl fmt::Display for FixedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.value.is_negative();
        let abs = self.value.abs();
        let digits = abs.to_string();
        let scale = self.scale as usize;

        let (int_part, frac_part) = if scale == 0 {
            (digits, String::new())
        } else if digits.len() > scale {
            let split = digits.len() - scale;
            (digits[..split].to_string(), digits[split..].to_string())
        } else {
            (
                "0".to_string(),
                format!("{:0>width$}", digits, width = scale),
            )
        };

        let trimmed_frac = frac_part.trim_end_matches('0');

        if negative && !(int_part == "0" && trimmed_frac.is_empty()) {
            write!(f, "-")?;
        }
        write!(f, "{}", int_part)?;
        if !trimmed_frac.is_empty() {
            write!(f, ".{}", trimmed_frac)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_bad_forms() {
        assert!(FixedDecimal::parse("", 18).is_err());
        assert!(FixedDecimal::parse("+1", 18).is_err());
        assert!(FixedDecimal::parse(" 1", 18).is_err());
        assert!(FixedDecimal::parse("1 ", 18).is_err());
        assert!(FixedDecimal::parse(".", 18).is_err());
        assert!(FixedDecimal::parse("1.", 18).is_err());
        assert!(FixedDecimal::parse("1.2.3", 18).is_err());
        assert!(FixedDecimal::parse(".5", 18).is_err());
        assert!(FixedDecimal::parse("1.2345", 2).is_err());
    }

    #[test]
    fn parse_accepts_negative_and_normalizes_scale() {
        let v = FixedDecimal::parse("-1.5", 4).unwrap();
        assert_eq!(v.scale(), 4);
        assert_eq!(v.to_string(), "-1.5");
    }

    #[test]
    fn round_trip_is_normal_form() {
        let v = FixedDecimal::parse("1000.000", 3).unwrap();
        let s = v.to_string();
        assert_eq!(s, "1000");
        let v2 = FixedDecimal::parse(&s, 3).unwrap();
        assert_eq!(v, v2);
    }

    #[test]
    fn add_requires_equal_scale() {
        let a = FixedDecimal::parse("1", 2).unwrap();
        let b = FixedDecimal::parse("1", 3).unwrap();
        assert!(a.add(&b).is_err());
    }

    #[test]
    fn sqrt_has_scale_18() {
        let v = FixedDecimal::from_raw(BigInt::from(1_000_000), 0);
        let r = v.sqrt();
        assert_eq!(r.scale(), 18);
        assert_eq!(r.raw(), &BigInt::from(1000));
    }

    #[test]
    fn div_truncates_toward_zero() {
        let a = FixedDecimal::from_raw(BigInt::from(7), 0);
        let b = FixedDecimal::from_raw(BigInt::from(2), 0);
        assert_eq!(a.div(&b).unwrap().raw(), &BigInt::from(3));
        let a = FixedDecimal::from_raw(BigInt::from(-7), 0);
        assert_eq!(a.div(&b).unwrap().raw(), &BigInt::from(-3));
    }

    #[test]
    fn is_overflow_u64_detects_excess() {
        let scale = 2;
        let max_ok = FixedDecimal::from_raw(BigInt::from(u64::MAX) * ten_pow(scale), scale);
        assert!(!max_ok.is_overflow_u64());
        let over = FixedDecimal::from_raw(BigInt::from(u64::MAX) * ten_pow(scale) + 1, scale);
        assert!(over.is_overflow_u64());
    }
}

