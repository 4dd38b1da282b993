// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Numeric facets of types: integer bounds, moduli and fixed-point smalls.
//!
//! Front ends write large values either as plain integers or as strings,
//! where a string may use the `2**N`, `2**N-K` and `-2**N+K` shorthands.

use alloc::{format, string::String};
use core::fmt;
use core::ops::{Div, Mul};

use num_bigint::BigInt;
use num_traits::{One, Pow, Signed, Zero};
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Literal {
    Int(i64),
    Text(String),
}

fn parse_power(text: &str) -> Option<BigInt> {
    let (base, exponent) = text.split_once("**")?;
    let base: BigInt = base.trim().parse().ok()?;
    let exponent: u32 = exponent.trim().parse().ok()?;
    Some(Pow::pow(base, exponent))
}

/// Parse `-? term ([+-] term)?` where each term is a decimal integer or a
/// power.
pub(crate) fn parse_big_int(text: &str) -> Option<BigInt> {
    let text = text.trim();
    let (negated, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, text),
    };

    // Split on the last binary +/- that is not part of the leading term.
    let split = body
        .char_indices()
        .skip(1)
        .filter(|(_, c)| *c == '+' || *c == '-')
        .last();

    let (head, tail) = match split {
        Some((idx, _)) => (&body[..idx], Some(&body[idx..])),
        None => (body, None),
    };

    let term = |t: &str| -> Option<BigInt> {
        let t = t.trim();
        if t.contains("**") {
            parse_power(t)
        } else {
            t.parse().ok()
        }
    };

    let mut value = term(head)?;
    if negated {
        value = -value;
    }
    if let Some(tail) = tail {
        let (sign, rest) = tail.split_at(1);
        let offset = term(rest)?;
        if sign == "+" {
            value += offset;
        } else {
            value -= offset;
        }
    }
    Some(value)
}

fn literal_to_big_int<E: serde::de::Error>(literal: Literal) -> Result<BigInt, E> {
    match literal {
        Literal::Int(v) => Ok(BigInt::from(v)),
        Literal::Text(text) => parse_big_int(&text)
            .ok_or_else(|| E::custom(format!("invalid integer literal `{text}`"))),
    }
}

pub(crate) fn deserialize_big_int<'de, D>(deserializer: D) -> Result<BigInt, D::Error>
where
    D: Deserializer<'de>,
{
    literal_to_big_int(Literal::deserialize(deserializer)?)
}

/// Exact positive or negative fraction, always kept in lowest terms with a
/// positive denominator.
#[derive(Clone, PartialEq, Eq)]
pub struct Rational {
    numerator: BigInt,
    denominator: BigInt,
}

fn gcd(mut a: BigInt, mut b: BigInt) -> BigInt {
    a = a.abs();
    b = b.abs();
    while !b.is_zero() {
        let r = &a % &b;
        a = b;
        b = r;
    }
    a
}

impl Rational {
    /// Returns `None` for a zero denominator.
    pub fn new(numerator: BigInt, denominator: BigInt) -> Option<Self> {
        if denominator.is_zero() {
            return None;
        }
        let (mut numerator, mut denominator) = (numerator, denominator);
        if denominator.is_negative() {
            numerator = -numerator;
            denominator = -denominator;
        }
        let divisor = gcd(numerator.clone(), denominator.clone());
        if !divisor.is_zero() && !divisor.is_one() {
            numerator /= &divisor;
            denominator /= &divisor;
        }
        Some(Rational {
            numerator,
            denominator,
        })
    }

    pub fn integer(value: i64) -> Self {
        Rational {
            numerator: BigInt::from(value),
            denominator: BigInt::one(),
        }
    }

    pub fn numerator(&self) -> &BigInt {
        &self.numerator
    }

    pub fn denominator(&self) -> &BigInt {
        &self.denominator
    }

    pub fn is_integer(&self) -> bool {
        self.denominator.is_one()
    }

    pub fn is_reciprocal_of_integer(&self) -> bool {
        self.numerator.is_one()
    }

    /// The scaling shape accepted for fixed-point smalls and for the
    /// factors of fixed-point multiplication and division.
    pub fn is_integer_or_reciprocal(&self) -> bool {
        self.is_integer() || self.is_reciprocal_of_integer()
    }

    /// Parse `p/q`, a decimal such as `0.125`, or an integer.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some((p, q)) = text.split_once('/') {
            return Rational::new(parse_big_int(p)?, parse_big_int(q)?);
        }
        if let Some((whole, fraction)) = text.split_once('.') {
            if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let digits: BigInt = format!("{whole}{fraction}").parse().ok()?;
            let scale = Pow::pow(BigInt::from(10), fraction.len() as u32);
            return Rational::new(digits, scale);
        }
        Rational::new(parse_big_int(text)?, BigInt::one())
    }
}

impl Mul for &Rational {
    type Output = Rational;

    fn mul(self, rhs: &Rational) -> Rational {
        let numerator = &self.numerator * &rhs.numerator;
        let denominator = &self.denominator * &rhs.denominator;
        // Both denominators are positive, so the product is never zero.
        Rational::new(numerator, denominator).unwrap_or_else(|| Rational::integer(0))
    }
}

impl Div for &Rational {
    type Output = Option<Rational>;

    fn div(self, rhs: &Rational) -> Option<Rational> {
        Rational::new(
            &self.numerator * &rhs.denominator,
            &self.denominator * &rhs.numerator,
        )
    }
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl<'de> Deserialize<'de> for Rational {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        match Literal::deserialize(deserializer)? {
            Literal::Int(v) => Ok(Rational::integer(v)),
            Literal::Text(text) => Rational::parse(&text)
                .ok_or_else(|| D::Error::custom(format!("invalid rational literal `{text}`"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn power_shorthands() {
        assert_eq!(parse_big_int("2**8"), Some(BigInt::from(256)));
        assert_eq!(parse_big_int("2**63-1"), Some(BigInt::from(i64::MAX)));
        assert_eq!(parse_big_int("-2**63"), Some(BigInt::from(i64::MIN)));
        assert_eq!(parse_big_int("-2**7+1"), Some(BigInt::from(-127)));
        assert_eq!(parse_big_int("-5"), Some(BigInt::from(-5)));
        assert_eq!(parse_big_int("two"), None);
    }

    #[test]
    fn rationals_are_normalized() {
        let r = Rational::parse("2/16").unwrap();
        assert_eq!(r.numerator(), &BigInt::from(1));
        assert_eq!(r.denominator(), &BigInt::from(8));
        assert!(r.is_reciprocal_of_integer());

        let d = Rational::parse("0.125").unwrap();
        assert_eq!(d, r);

        let odd = Rational::parse("3/8").unwrap();
        assert!(!odd.is_integer_or_reciprocal());
        assert!(Rational::parse("1/0").is_none());
    }

    #[test]
    fn scaling_products() {
        let eighth = Rational::parse("1/8").unwrap();
        let quarter = Rational::parse("1/4").unwrap();
        let ratio = (&(&eighth * &eighth) / &quarter).unwrap();
        assert_eq!(ratio.to_string(), "1/16");
        let ratio = (&quarter / &(&eighth * &Rational::parse("1/3").unwrap())).unwrap();
        assert_eq!(ratio.to_string(), "6");
    }
}
