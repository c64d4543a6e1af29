//! Numeric values, promotion and rounding.
//!
//! `Numeric` is the arithmetic view of the four numeric atomic types. Binary operations
//! promote both operands to the wider type (integer < decimal < float < double) first.

use crate::engine::runtime::{Error, ErrorCode};
use core::cmp::Ordering;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Integer(i64),
    Decimal(Decimal),
    Float(f32),
    Double(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Integer,
    Decimal,
    Float,
    Double,
}

fn overflow() -> Error {
    Error::from_code(ErrorCode::FOAR0002, "numeric overflow")
}

impl Numeric {
    fn rank(&self) -> Rank {
        match self {
            Numeric::Integer(_) => Rank::Integer,
            Numeric::Decimal(_) => Rank::Decimal,
            Numeric::Float(_) => Rank::Float,
            Numeric::Double(_) => Rank::Double,
        }
    }

    pub fn is_nan(&self) -> bool {
        match self {
            Numeric::Float(f) => f.is_nan(),
            Numeric::Double(d) => d.is_nan(),
            _ => false,
        }
    }

    pub fn to_f64(&self) -> f64 {
        match *self {
            Numeric::Integer(i) => i as f64,
            Numeric::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
            Numeric::Float(f) => f64::from(f),
            Numeric::Double(d) => d,
        }
    }

    pub fn to_decimal(&self) -> Result<Decimal, Error> {
        match *self {
            Numeric::Integer(i) => Ok(Decimal::from(i)),
            Numeric::Decimal(d) => Ok(d),
            Numeric::Float(f) => float_to_decimal(f64::from(f), Decimal::from_f32(f)),
            Numeric::Double(d) => float_to_decimal(d, Decimal::from_f64(d)),
        }
    }

    fn promote_to(self, rank: Rank) -> Result<Numeric, Error> {
        Ok(match (rank, self) {
            (r, v) if r == v.rank() => v,
            (Rank::Decimal, v) => Numeric::Decimal(v.to_decimal()?),
            (Rank::Float, v) => Numeric::Float(v.to_f64() as f32),
            (Rank::Double, v) => Numeric::Double(v.to_f64()),
            (Rank::Integer, v) => v,
        })
    }

    fn promote_pair(a: Numeric, b: Numeric) -> Result<(Numeric, Numeric), Error> {
        let r = a.rank().max(b.rank());
        Ok((a.promote_to(r)?, b.promote_to(r)?))
    }

    /// Numeric comparison after promotion. `None` when either side is NaN.
    pub fn compare(a: Numeric, b: Numeric) -> Option<Ordering> {
        let (a, b) = Self::promote_pair(a, b).ok()?;
        match (a, b) {
            (Numeric::Integer(x), Numeric::Integer(y)) => Some(x.cmp(&y)),
            (Numeric::Decimal(x), Numeric::Decimal(y)) => Some(x.cmp(&y)),
            (Numeric::Float(x), Numeric::Float(y)) => x.partial_cmp(&y),
            (x, y) => x.to_f64().partial_cmp(&y.to_f64()),
        }
    }

    pub fn add(a: Numeric, b: Numeric) -> Result<Numeric, Error> {
        let (a, b) = Self::promote_pair(a, b)?;
        Ok(match (a, b) {
            (Numeric::Integer(x), Numeric::Integer(y)) => Numeric::Integer(x.checked_add(y).ok_or_else(overflow)?),
            (Numeric::Decimal(x), Numeric::Decimal(y)) => Numeric::Decimal(x.checked_add(y).ok_or_else(overflow)?),
            (Numeric::Float(x), Numeric::Float(y)) => Numeric::Float(x + y),
            (x, y) => Numeric::Double(x.to_f64() + y.to_f64()),
        })
    }

    pub fn multiply(a: Numeric, b: Numeric) -> Result<Numeric, Error> {
        let (a, b) = Self::promote_pair(a, b)?;
        Ok(match (a, b) {
            (Numeric::Integer(x), Numeric::Integer(y)) => Numeric::Integer(x.checked_mul(y).ok_or_else(overflow)?),
            (Numeric::Decimal(x), Numeric::Decimal(y)) => Numeric::Decimal(x.checked_mul(y).ok_or_else(overflow)?),
            (Numeric::Float(x), Numeric::Float(y)) => Numeric::Float(x * y),
            (x, y) => Numeric::Double(x.to_f64() * y.to_f64()),
        })
    }

    /// `div` semantics: integer division yields a decimal, division by zero is an error for
    /// integer and decimal operands.
    pub fn divide(a: Numeric, b: Numeric) -> Result<Numeric, Error> {
        let (a, b) = Self::promote_pair(a, b)?;
        Ok(match (a, b) {
            (Numeric::Integer(_) | Numeric::Decimal(_), Numeric::Integer(_) | Numeric::Decimal(_)) => {
                let (x, y) = (a.to_decimal()?, b.to_decimal()?);
                if y.is_zero() {
                    return Err(Error::from_code(ErrorCode::FOAR0001, "division by zero"));
                }
                Numeric::Decimal(x.checked_div(y).ok_or_else(overflow)?)
            }
            (Numeric::Float(x), Numeric::Float(y)) => Numeric::Float(x / y),
            (x, y) => Numeric::Double(x.to_f64() / y.to_f64()),
        })
    }

    pub fn abs(self) -> Result<Numeric, Error> {
        Ok(match self {
            Numeric::Integer(i) => Numeric::Integer(i.checked_abs().ok_or_else(overflow)?),
            Numeric::Decimal(d) => Numeric::Decimal(d.abs()),
            Numeric::Float(f) => Numeric::Float(f.abs()),
            Numeric::Double(d) => Numeric::Double(d.abs()),
        })
    }

    pub fn floor(self) -> Numeric {
        match self {
            Numeric::Integer(_) => self,
            Numeric::Decimal(d) => Numeric::Decimal(d.floor()),
            Numeric::Float(f) => Numeric::Float(f.floor()),
            Numeric::Double(d) => Numeric::Double(d.floor()),
        }
    }

    pub fn ceiling(self) -> Numeric {
        match self {
            Numeric::Integer(_) => self,
            Numeric::Decimal(d) => Numeric::Decimal(d.ceil()),
            Numeric::Float(f) => Numeric::Float(f.ceil()),
            Numeric::Double(d) => Numeric::Double(d.ceil()),
        }
    }

    /// `fn:round`: halves round towards positive infinity. Negative values that round to
    /// zero keep their sign for float and double.
    pub fn round(self) -> Numeric {
        match self {
            Numeric::Integer(_) => self,
            Numeric::Decimal(d) => Numeric::Decimal(d.checked_add(Decimal::new(5, 1)).map_or(d, |x| x.floor())),
            Numeric::Float(f) => Numeric::Float(round_f64(f64::from(f)) as f32),
            Numeric::Double(d) => Numeric::Double(round_f64(d)),
        }
    }

    /// `fn:round-half-to-even` at `precision` fractional digits (may be negative).
    pub fn round_half_to_even(self, precision: i64) -> Result<Numeric, Error> {
        Ok(match self {
            Numeric::Integer(i) => {
                if precision >= 0 {
                    self
                } else {
                    let d = round_decimal_half_even(Decimal::from(i), precision)?;
                    Numeric::Integer(d.to_i64().ok_or_else(overflow)?)
                }
            }
            Numeric::Decimal(d) => Numeric::Decimal(round_decimal_half_even(d, precision)?),
            Numeric::Float(f) => Numeric::Float(round_float_half_even(f64::from(f), precision) as f32),
            Numeric::Double(d) => Numeric::Double(round_float_half_even(d, precision)),
        })
    }
}

fn float_to_decimal(v: f64, converted: Option<Decimal>) -> Result<Decimal, Error> {
    if v.is_nan() || v.is_infinite() {
        return Err(Error::from_code(ErrorCode::FOCA0002, format!("cannot convert {} to xs:decimal", format_double(v))));
    }
    converted.ok_or_else(|| Error::from_code(ErrorCode::FOAR0002, "value out of range for xs:decimal"))
}

fn round_f64(d: f64) -> f64 {
    if d.is_nan() || d.is_infinite() || d == 0.0 {
        return d;
    }
    if (-0.5..0.0).contains(&d) {
        return -0.0;
    }
    // Beyond 2^52 every double is already integral.
    if d.abs() >= 4_503_599_627_370_496.0 {
        return d;
    }
    (d + 0.5).floor()
}

fn round_decimal_half_even(d: Decimal, precision: i64) -> Result<Decimal, Error> {
    if precision >= 0 {
        let dp = u32::try_from(precision.min(28)).unwrap_or(28);
        return Ok(d.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven));
    }
    let shift = u32::try_from(-precision).unwrap_or(u32::MAX);
    if shift > 28 {
        return Ok(Decimal::ZERO);
    }
    let factor = Decimal::from_i128_with_scale(10i128.pow(shift), 0);
    let scaled = d.checked_div(factor).ok_or_else(overflow)?;
    let rounded = scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    rounded.checked_mul(factor).ok_or_else(overflow)
}

fn round_float_half_even(d: f64, precision: i64) -> f64 {
    if d.is_nan() || d.is_infinite() || d == 0.0 {
        return d;
    }
    match Decimal::from_f64(d).map(|x| round_decimal_half_even(x, precision)) {
        Some(Ok(r)) => {
            let v = r.to_f64().unwrap_or(d);
            if v == 0.0 && d.is_sign_negative() { -0.0 } else { v }
        }
        _ => {
            // Outside decimal range; only coarse negative precisions can change the value.
            if precision >= 0 {
                return d;
            }
            let factor = 10f64.powi(i32::try_from(-precision).unwrap_or(i32::MAX));
            let scaled = d / factor;
            let r = scaled.round();
            let r = if (scaled - scaled.trunc()).abs() == 0.5 && r % 2.0 != 0.0 { r - scaled.signum() } else { r };
            r * factor
        }
    }
}

/// Canonical lexical form of an `xs:double`.
pub fn format_double(d: f64) -> String {
    if d.is_nan() {
        return "NaN".to_string();
    }
    if d.is_infinite() {
        return if d > 0.0 { "INF".to_string() } else { "-INF".to_string() };
    }
    let a = d.abs();
    if a == 0.0 || (1e-6..1e6).contains(&a) {
        return format!("{d}");
    }
    exponent_form(&format!("{d:e}"))
}

/// Canonical lexical form of an `xs:float`. Uses the shortest `f32` representation.
pub fn format_float(f: f32) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "INF".to_string() } else { "-INF".to_string() };
    }
    let a = f.abs();
    if a == 0.0 || (1e-6..1e6).contains(&a) {
        return format!("{f}");
    }
    exponent_form(&format!("{f:e}"))
}

fn exponent_form(rust_exp: &str) -> String {
    let (mantissa, exp) = rust_exp.split_once('e').unwrap_or((rust_exp, "0"));
    if mantissa.contains('.') { format!("{mantissa}E{exp}") } else { format!("{mantissa}.0E{exp}") }
}

/// Canonical lexical form of an `xs:decimal`: no exponent, no trailing fractional zeros.
pub fn format_decimal(d: Decimal) -> String {
    let n = d.normalize();
    if n.is_zero() { "0".to_string() } else { n.to_string() }
}

fn invalid(kind: &str, s: &str) -> Error {
    Error::from_code(ErrorCode::FORG0001, format!("invalid lexical form for xs:{kind}: '{s}'"))
}

fn is_decimal_lexical(s: &str) -> bool {
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (int, frac) = body.split_once('.').unwrap_or((body, ""));
    let digits = |p: &str| p.bytes().all(|c| c.is_ascii_digit());
    !(int.is_empty() && frac.is_empty()) && digits(int) && digits(frac) && (body.contains('.') || !int.is_empty())
}

fn is_float_lexical(s: &str) -> bool {
    if matches!(s, "INF" | "-INF" | "NaN") {
        return true;
    }
    match s.split_once(['e', 'E']) {
        Some((m, e)) => {
            let eb = e.strip_prefix(['+', '-']).unwrap_or(e);
            is_decimal_lexical(m) && !eb.is_empty() && eb.bytes().all(|c| c.is_ascii_digit())
        }
        None => is_decimal_lexical(s),
    }
}

pub fn parse_integer(s: &str) -> Result<i64, Error> {
    let t = s.trim();
    let body = t.strip_prefix(['+', '-']).unwrap_or(t);
    if body.is_empty() || !body.bytes().all(|c| c.is_ascii_digit()) {
        return Err(invalid("integer", s));
    }
    t.strip_prefix('+').unwrap_or(t).parse::<i64>().map_err(|_| overflow())
}

pub fn parse_decimal(s: &str) -> Result<Decimal, Error> {
    let t = s.trim();
    if !is_decimal_lexical(t) {
        return Err(invalid("decimal", s));
    }
    let (negative, body) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t.strip_prefix('+').unwrap_or(t)),
    };
    let (int, frac) = body.split_once('.').unwrap_or((body, ""));
    let int = int.trim_start_matches('0');
    let frac = frac.trim_end_matches('0');
    let mut text = String::with_capacity(body.len() + 2);
    if negative {
        text.push('-');
    }
    text.push_str(if int.is_empty() { "0" } else { int });
    if !frac.is_empty() {
        text.push('.');
        text.push_str(frac);
    }
    text.parse::<Decimal>().map_err(|_| overflow())
}

pub fn parse_double(s: &str) -> Result<f64, Error> {
    let t = s.trim();
    if !is_float_lexical(t) {
        return Err(invalid("double", s));
    }
    Ok(match t {
        "INF" => f64::INFINITY,
        "-INF" => f64::NEG_INFINITY,
        "NaN" => f64::NAN,
        _ => t.parse::<f64>().map_err(|_| invalid("double", s))?,
    })
}

pub fn parse_float(s: &str) -> Result<f32, Error> {
    let t = s.trim();
    if !is_float_lexical(t) {
        return Err(invalid("float", s));
    }
    Ok(match t {
        "INF" => f32::INFINITY,
        "-INF" => f32::NEG_INFINITY,
        "NaN" => f32::NAN,
        _ => t.parse::<f32>().map_err(|_| invalid("float", s))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_canonical_forms() {
        assert_eq!(format_double(1.0), "1");
        assert_eq!(format_double(1.5), "1.5");
        assert_eq!(format_double(1e7), "1.0E7");
        assert_eq!(format_double(1.25e-7), "1.25E-7");
        assert_eq!(format_double(f64::NEG_INFINITY), "-INF");
        assert_eq!(format_float(0.1), "0.1");
    }

    #[test]
    fn lexical_rules_reject_rust_spellings() {
        assert!(parse_double("inf").is_err());
        assert!(parse_double("1e").is_err());
        assert_eq!(parse_double(" -1.5E2 ").unwrap(), -150.0);
        assert!(parse_decimal("1e2").is_err());
        assert_eq!(parse_decimal(".5").unwrap(), Decimal::new(5, 1));
        assert_eq!(parse_integer("+42").unwrap(), 42);
        assert_eq!(parse_integer("99999999999999999999").unwrap_err().code_enum(), ErrorCode::FOAR0002);
    }

    #[test]
    fn rounding_keeps_type() {
        assert_eq!(Numeric::Double(2.5).round(), Numeric::Double(3.0));
        assert_eq!(Numeric::Double(-2.5).round(), Numeric::Double(-2.0));
        assert_eq!(Numeric::Decimal(Decimal::new(-25, 1)).round(), Numeric::Decimal(Decimal::new(-2, 0)));
        assert_eq!(Numeric::Decimal(Decimal::new(25, 1)).round(), Numeric::Decimal(Decimal::new(3, 0)));
        assert_eq!(
            Numeric::Decimal(Decimal::new(2345, 3)).round_half_to_even(2).unwrap(),
            Numeric::Decimal(Decimal::new(234, 2))
        );
        assert_eq!(Numeric::Integer(35).round_half_to_even(-1).unwrap(), Numeric::Integer(40));
        assert_eq!(Numeric::Integer(25).round_half_to_even(-1).unwrap(), Numeric::Integer(20));
        assert_eq!(Numeric::Double(0.5).round_half_to_even(0).unwrap(), Numeric::Double(0.0));
    }

    #[test]
    fn integer_division_yields_decimal() {
        let r = Numeric::divide(Numeric::Integer(7), Numeric::Integer(2)).unwrap();
        assert_eq!(r, Numeric::Decimal(Decimal::new(35, 1)));
        assert!(Numeric::divide(Numeric::Integer(1), Numeric::Integer(0)).is_err());
    }
}
