//! Fixed-Point Codec
//!
//! Converts loosely-typed upstream decimals (JSON floats, numeric strings,
//! derived ratios) into the scaled `uint256` integers stored by the relayer
//! contract: `floor(value × 10^decimals)`.
//!
//! Arithmetic is exact. Mantissas are `BigUint`s and floats only enter through
//! their shortest round-trip decimal text, so `0.1` scales to exactly
//! `100000000000000000` at 18 decimals. Values that cannot be represented
//! (missing, NaN/±Inf, negative, division by zero, ≥ 2^256 − 1) become the
//! `MAX_UINT256` sentinel instead of an error.

use alloy::primitives::U256;
use num_bigint::BigUint;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Sentinel stored on-chain for "could not be computed".
pub const MAX_UINT256: U256 = U256::MAX;

/// Scale used for amounts, prices and ratios.
pub const DEFAULT_DECIMALS: u32 = 18;

/// Scale used for plain counts (vaults, auctions, masternodes).
pub const COUNT_DECIMALS: u32 = 0;

/// Exponents beyond this are not expanded. Larger positive exponents are an
/// overflow for any non-zero mantissa; smaller negative ones floor to zero.
const MAX_EXPONENT: i64 = 4096;

/// Why a value was replaced by the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unrepresentable {
    Missing,
    NotFinite,
    Unparseable,
    Negative,
    Overflow,
    DivisionByZero,
}

impl Unrepresentable {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::NotFinite => "not_finite",
            Self::Unparseable => "unparseable",
            Self::Negative => "negative",
            Self::Overflow => "overflow",
            Self::DivisionByZero => "division_by_zero",
        }
    }
}

impl fmt::Display for Unrepresentable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// EXACT DECIMAL
// =============================================================================

/// Exact signed decimal: `(-1)^negative × mantissa / 10^scale`.
///
/// Always kept normalized (no trailing zeros in the mantissa, zero is
/// non-negative with scale 0) so derived equality is numeric equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    negative: bool,
    mantissa: BigUint,
    scale: u32,
}

impl Decimal {
    pub fn zero() -> Self {
        Self {
            negative: false,
            mantissa: BigUint::from(0u32),
            scale: 0,
        }
    }

    pub fn from_u64(value: u64) -> Self {
        Self::new(false, BigUint::from(value), 0)
    }

    fn new(negative: bool, mantissa: BigUint, scale: u32) -> Self {
        let mut d = Self {
            negative,
            mantissa,
            scale,
        };
        d.normalize();
        d
    }

    fn normalize(&mut self) {
        if is_zero(&self.mantissa) {
            self.negative = false;
            self.scale = 0;
            return;
        }
        let ten = BigUint::from(10u32);
        while self.scale > 0 && is_zero(&(&self.mantissa % &ten)) {
            self.mantissa /= &ten;
            self.scale -= 1;
        }
    }

    pub fn is_zero(&self) -> bool {
        is_zero(&self.mantissa)
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Parse decimal text: optional sign, digits with an optional fraction, and
    /// an optional `e`/`E` exponent. `NaN` and `Infinity` spellings are
    /// recognised and reported as [`Unrepresentable::NotFinite`].
    pub fn parse(raw: &str) -> Result<Self, Unrepresentable> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(Unrepresentable::Missing);
        }

        let (negative, body) = match s.as_bytes()[0] {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };

        let lowered = body.to_ascii_lowercase();
        if lowered == "nan" || lowered == "inf" || lowered == "infinity" {
            return Err(Unrepresentable::NotFinite);
        }

        let (number, exponent) = match body.find(['e', 'E']) {
            Some(idx) => (&body[..idx], parse_exponent(&body[idx + 1..])?),
            None => (body, 0),
        };

        let (int_part, frac_part) = match number.split_once('.') {
            Some((i, f)) => (i, f),
            None => (number, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(Unrepresentable::Unparseable);
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(Unrepresentable::Unparseable);
        }

        let digits = format!("{}{}", int_part, frac_part);
        let mantissa =
            BigUint::parse_bytes(digits.as_bytes(), 10).ok_or(Unrepresentable::Unparseable)?;
        if is_zero(&mantissa) {
            return Ok(Self::zero());
        }

        // value = mantissa × 10^(exponent − frac_len)
        let shift = exponent.saturating_sub(frac_part.len() as i64);
        if shift > MAX_EXPONENT {
            return Err(Unrepresentable::Overflow);
        }
        if shift < -MAX_EXPONENT {
            return Ok(Self::zero());
        }

        if shift >= 0 {
            Ok(Self::new(negative, mantissa * pow10(shift as u32), 0))
        } else {
            Ok(Self::new(negative, mantissa, (-shift) as u32))
        }
    }

    /// Convert a float through its shortest round-trip decimal text.
    pub fn from_f64(value: f64) -> Result<Self, Unrepresentable> {
        if !value.is_finite() {
            return Err(Unrepresentable::NotFinite);
        }
        // `Display` for f64 never uses exponent notation.
        Self::parse(&value.to_string())
    }

    pub fn add(&self, other: &Decimal) -> Decimal {
        let scale = self.scale.max(other.scale);
        let a = &self.mantissa * pow10(scale - self.scale);
        let b = &other.mantissa * pow10(scale - other.scale);

        if self.negative == other.negative {
            return Self::new(self.negative, a + b, scale);
        }
        match a.cmp(&b) {
            Ordering::Equal => Self::zero(),
            Ordering::Greater => Self::new(self.negative, a - b, scale),
            Ordering::Less => Self::new(other.negative, b - a, scale),
        }
    }

    pub fn mul(&self, other: &Decimal) -> Decimal {
        Self::new(
            self.negative != other.negative,
            &self.mantissa * &other.mantissa,
            self.scale + other.scale,
        )
    }

    /// Quotient truncated toward zero at `precision` fractional digits.
    pub fn checked_div(&self, other: &Decimal, precision: u32) -> Result<Decimal, Unrepresentable> {
        if other.is_zero() {
            return Err(Unrepresentable::DivisionByZero);
        }
        // (ma / 10^sa) / (mb / 10^sb) × 10^p = ma × 10^(sb + p) / (mb × 10^sa)
        let numerator = &self.mantissa * pow10(other.scale + precision);
        let denominator = &other.mantissa * pow10(self.scale);
        Ok(Self::new(
            self.negative != other.negative,
            numerator / denominator,
            precision,
        ))
    }

    /// `floor(self × 10^decimals)` for a non-negative value.
    fn scaled_floor(&self, decimals: u32) -> BigUint {
        if decimals >= self.scale {
            &self.mantissa * pow10(decimals - self.scale)
        } else {
            &self.mantissa / pow10(self.scale - decimals)
        }
    }
}

impl FromStr for Decimal {
    type Err = Unrepresentable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.to_str_radix(10);
        let sign = if self.negative { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }
        if digits.len() > scale {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            write!(f, "{}{}.{}", sign, int_part, frac_part)
        } else {
            write!(f, "{}0.{:0>width$}", sign, digits, width = scale)
        }
    }
}

/// Exponent digits with an optional sign. Exponents outside `i64` saturate,
/// which the range checks in `parse` turn into overflow or zero.
fn parse_exponent(raw: &str) -> Result<i64, Unrepresentable> {
    let (negative, digits) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Unrepresentable::Unparseable);
    }
    Ok(match raw.parse::<i64>() {
        Ok(exp) => exp,
        Err(_) if negative => i64::MIN,
        Err(_) => i64::MAX,
    })
}

fn pow10(exp: u32) -> BigUint {
    BigUint::from(10u32).pow(exp)
}

fn is_zero(value: &BigUint) -> bool {
    value.bits() == 0
}

// =============================================================================
// DECIMAL SOURCES
// =============================================================================

/// Anything the codec accepts as input.
pub trait DecimalSource {
    fn to_decimal(&self) -> Result<Decimal, Unrepresentable>;
}

impl DecimalSource for Decimal {
    fn to_decimal(&self) -> Result<Decimal, Unrepresentable> {
        Ok(self.clone())
    }
}

impl DecimalSource for f64 {
    fn to_decimal(&self) -> Result<Decimal, Unrepresentable> {
        Decimal::from_f64(*self)
    }
}

impl DecimalSource for u64 {
    fn to_decimal(&self) -> Result<Decimal, Unrepresentable> {
        Ok(Decimal::from_u64(*self))
    }
}

impl DecimalSource for str {
    fn to_decimal(&self) -> Result<Decimal, Unrepresentable> {
        Decimal::parse(self)
    }
}

impl DecimalSource for String {
    fn to_decimal(&self) -> Result<Decimal, Unrepresentable> {
        Decimal::parse(self)
    }
}

impl<T: DecimalSource> DecimalSource for Option<T> {
    fn to_decimal(&self) -> Result<Decimal, Unrepresentable> {
        match self {
            Some(v) => v.to_decimal(),
            None => Err(Unrepresentable::Missing),
        }
    }
}

impl DecimalSource for Result<Decimal, Unrepresentable> {
    fn to_decimal(&self) -> Result<Decimal, Unrepresentable> {
        self.clone()
    }
}

impl<T: DecimalSource + ?Sized> DecimalSource for &T {
    fn to_decimal(&self) -> Result<Decimal, Unrepresentable> {
        (**self).to_decimal()
    }
}

// =============================================================================
// SCALED INTEGER
// =============================================================================

/// Result of scaling: a storable integer or the reason it is the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaledInteger {
    Value(U256),
    Unrepresentable(Unrepresentable),
}

impl ScaledInteger {
    /// On-chain value; every unrepresentable input maps to [`MAX_UINT256`].
    pub fn to_u256(self) -> U256 {
        match self {
            Self::Value(v) => v,
            Self::Unrepresentable(_) => MAX_UINT256,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Unrepresentable(_))
    }

    pub fn reason(&self) -> Option<Unrepresentable> {
        match self {
            Self::Value(_) => None,
            Self::Unrepresentable(r) => Some(*r),
        }
    }
}

/// `floor(value × 10^decimals)`, or the sentinel with a reason.
pub fn to_scaled_integer<V: DecimalSource>(value: V, decimals: u32) -> ScaledInteger {
    let decimal = match value.to_decimal() {
        Ok(d) => d,
        Err(reason) => return ScaledInteger::Unrepresentable(reason),
    };
    if decimal.is_negative() {
        return ScaledInteger::Unrepresentable(Unrepresentable::Negative);
    }

    let scaled = decimal.scaled_floor(decimals);
    if scaled.bits() > 256 {
        return ScaledInteger::Unrepresentable(Unrepresentable::Overflow);
    }
    match U256::try_from_be_slice(&scaled.to_bytes_be()) {
        Some(v) if v < MAX_UINT256 => ScaledInteger::Value(v),
        _ => ScaledInteger::Unrepresentable(Unrepresentable::Overflow),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaled(v: impl DecimalSource, decimals: u32) -> U256 {
        to_scaled_integer(v, decimals).to_u256()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::parse(s).unwrap()
    }

    #[test]
    fn floors_exactly_without_float_drift() {
        assert_eq!(scaled(0.1f64, 18), U256::from(100_000_000_000_000_000u64));
        assert_eq!(scaled("1.23456789", 2), U256::from(123u64));
        assert_eq!(scaled("0.999999999999999999999", 18), U256::from(999_999_999_999_999_999u64));
        assert_eq!(scaled(0.30000000000000004f64, 17), U256::from(30_000_000_000_000_004u64));
        assert_eq!(scaled("42", 0), U256::from(42u64));
    }

    #[test]
    fn price_conversion_example() {
        let ratio = dec("2.5");
        let price = Decimal::from_f64(0.4).unwrap();
        let product = ratio.mul(&price);
        assert_eq!(product.to_string(), "1");
        assert_eq!(scaled(product, 18), U256::from(1_000_000_000_000_000_000u64));
    }

    #[test]
    fn non_finite_and_missing_become_sentinel() {
        assert_eq!(
            to_scaled_integer(f64::NAN, 18),
            ScaledInteger::Unrepresentable(Unrepresentable::NotFinite)
        );
        assert_eq!(scaled(f64::INFINITY, 18), MAX_UINT256);
        assert_eq!(scaled(f64::NEG_INFINITY, 0), MAX_UINT256);
        assert_eq!(scaled("NaN", 18), MAX_UINT256);
        assert_eq!(
            to_scaled_integer(None::<f64>, 18),
            ScaledInteger::Unrepresentable(Unrepresentable::Missing)
        );
        assert_eq!(
            to_scaled_integer("12abc", 18),
            ScaledInteger::Unrepresentable(Unrepresentable::Unparseable)
        );
    }

    #[test]
    fn negative_inputs_are_clamped_to_sentinel() {
        assert_eq!(
            to_scaled_integer(-0.5f64, 18),
            ScaledInteger::Unrepresentable(Unrepresentable::Negative)
        );
        // negative zero is zero
        assert_eq!(scaled(-0.0f64, 18), U256::ZERO);
    }

    #[test]
    fn overflow_becomes_sentinel() {
        // 1e60 × 1e18 = 1e78 > 2^256 − 1 ≈ 1.16e77
        assert_eq!(
            to_scaled_integer("1e60", 18),
            ScaledInteger::Unrepresentable(Unrepresentable::Overflow)
        );
        // largest storable value is MAX − 1
        let below_max = (MAX_UINT256 - U256::from(1u64)).to_string();
        assert_eq!(scaled(below_max.as_str(), 0), MAX_UINT256 - U256::from(1u64));
        assert!(to_scaled_integer(MAX_UINT256.to_string().as_str(), 0).is_sentinel());
        assert!(to_scaled_integer("1e9999", 0).is_sentinel());
    }

    #[test]
    fn parses_exponents_and_signs() {
        assert_eq!(dec("1.5e3"), Decimal::from_u64(1500));
        assert_eq!(dec("+2E-2").to_string(), "0.02");
        assert_eq!(dec(".5").to_string(), "0.5");
        assert_eq!(dec("7.").to_string(), "7");
        assert_eq!(dec("1e-99999"), Decimal::zero());
        assert_eq!(Decimal::parse("."), Err(Unrepresentable::Unparseable));
        assert_eq!(Decimal::parse(""), Err(Unrepresentable::Missing));
        assert_eq!(Decimal::parse("-Infinity"), Err(Unrepresentable::NotFinite));
    }

    #[test]
    fn extreme_exponents_saturate_instead_of_wrapping() {
        assert_eq!(dec("0.1e-9223372036854775808"), Decimal::zero());
        assert_eq!(dec("1.5e-99999999999999999999999"), Decimal::zero());
        assert_eq!(
            Decimal::parse("1e99999999999999999999999"),
            Err(Unrepresentable::Overflow)
        );
        assert_eq!(
            Decimal::parse("2.5e9223372036854775807"),
            Err(Unrepresentable::Overflow)
        );
        assert_eq!(Decimal::parse("1e"), Err(Unrepresentable::Unparseable));
        assert_eq!(Decimal::parse("1e+-3"), Err(Unrepresentable::Unparseable));
        assert_eq!(scaled("0.1e-9223372036854775808", 18), U256::ZERO);
    }

    #[test]
    fn addition_handles_mixed_signs() {
        assert_eq!(dec("1.25").add(&dec("0.75")), Decimal::from_u64(2));
        assert_eq!(dec("1").add(&dec("-3.5")).to_string(), "-2.5");
        assert_eq!(dec("-1").add(&dec("1")), Decimal::zero());
    }

    #[test]
    fn division_truncates_and_reports_zero_divisor() {
        let third = dec("1").checked_div(&dec("3"), 5).unwrap();
        assert_eq!(third.to_string(), "0.33333");
        assert_eq!(
            dec("500").checked_div(&Decimal::zero(), 18),
            Err(Unrepresentable::DivisionByZero)
        );
        let ratio = dec("23432").checked_div(&dec("1000"), 36).unwrap();
        assert_eq!(ratio.to_string(), "23.432");
    }

    #[test]
    fn scaling_is_deterministic() {
        let a = to_scaled_integer("3.14159265358979323846264338327950288", 18);
        let b = to_scaled_integer("3.14159265358979323846264338327950288", 18);
        assert_eq!(a, b);
        assert_eq!(a.to_u256(), U256::from(3_141_592_653_589_793_238u64));
    }
}
