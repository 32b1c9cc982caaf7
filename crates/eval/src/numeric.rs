//! Numeric conversions using `rust_decimal`.
//!
//! Text is parsed by a strict decimal grammar: an optional sign followed by
//! digits with an optional fractional part, or a bare fractional part
//! (`.5`). Exponents, separators and surrounding whitespace are rejected.

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::types::{Value, ValueError};

/// Parses `text` by the strict decimal grammar.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let (negative, body) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !frac_part.map_or(true, all_digits) {
        return None;
    }
    // "digits" or "digits." or "digits.digits" or ".digits"
    let frac = frac_part.unwrap_or("");
    if int_part.is_empty() && frac.is_empty() {
        return None;
    }

    let mut canonical = String::with_capacity(body.len() + 2);
    if negative {
        canonical.push('-');
    }
    canonical.push_str(if int_part.is_empty() { "0" } else { int_part });
    if !frac.is_empty() {
        canonical.push('.');
        canonical.push_str(frac);
    }
    Decimal::from_str(&canonical).ok()
}

/// Converts a value to a number.
///
/// Numbers pass through, text is parsed, errors propagate and every other
/// kind fails. The zero sentinel for callers that ignore the error is
/// `Decimal::default()`.
pub fn to_number(value: &Value) -> Result<Decimal, ValueError> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::Text(s) => parse_decimal(s).ok_or_else(|| conversion(value, "number")),
        Value::Error(e) => Err(e.clone()),
        other => Err(conversion(other, "number")),
    }
}

/// Converts a value to a 32-bit integer, truncating any fractional part.
pub fn to_integer(value: &Value) -> Result<i32, ValueError> {
    let number = to_number(value)?;
    number
        .trunc()
        .to_i64()
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| ValueError::Range {
            value: number.normalize().to_string(),
        })
}

/// Compares two values as numbers.
pub fn compare_numbers(left: &Value, right: &Value) -> Result<Ordering, ValueError> {
    Ok(to_number(left)?.cmp(&to_number(right)?))
}

fn conversion(value: &Value, target: &'static str) -> ValueError {
    ValueError::Conversion {
        value: value.describe(),
        target,
    }
}

/// Decimals in typed payloads, written as bare JSON numbers.
///
/// `#[serde(with = "crate::numeric::json_number")]`
pub mod json_number {
    pub use rust_decimal::serde::arbitrary_precision::{deserialize, serialize};
}

/// Maps of currency (or other key) to decimal, values as bare JSON numbers.
///
/// `#[serde(with = "crate::numeric::json_number_map")]`
pub mod json_number_map {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(transparent)]
    struct Number(#[serde(with = "super::json_number")] Decimal);

    pub fn serialize<S: Serializer>(map: &BTreeMap<String, Decimal>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_map(map.iter().map(|(k, v)| (k, Number(*v))))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, Decimal>, D::Error> {
        let raw = BTreeMap::<String, Number>::deserialize(d)?;
        Ok(raw.into_iter().map(|(k, n)| (k, n.0)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn parse_accepts_the_decimal_grammar() {
        assert_eq!(parse_decimal("12"), Some(dec("12")));
        assert_eq!(parse_decimal("-12.50"), Some(dec("-12.5")));
        assert_eq!(parse_decimal("+3"), Some(dec("3")));
        assert_eq!(parse_decimal("7."), Some(dec("7")));
        assert_eq!(parse_decimal(".5"), Some(dec("0.5")));
        assert_eq!(parse_decimal("-.5"), Some(dec("-0.5")));
    }

    #[test]
    fn parse_rejects_everything_else() {
        for text in ["", "-", ".", "abc", "1,000", "1e5", " 1", "1 ", "1.2.3", "--1", "0x10"] {
            assert_eq!(parse_decimal(text), None, "{:?} should not parse", text);
        }
    }

    #[test]
    fn to_number_conversions() {
        assert_eq!(to_number(&Value::text("42.0")).unwrap(), dec("42"));
        assert_eq!(to_number(&Value::Number(dec("1.5"))).unwrap(), dec("1.5"));

        let err = to_number(&Value::text("abc")).unwrap_err();
        assert_eq!(
            err,
            ValueError::Conversion {
                value: "\"abc\"".to_string(),
                target: "number"
            }
        );
        assert_eq!(to_number(&Value::text("abc")).unwrap_or_default(), Decimal::ZERO);
        assert!(to_number(&Value::Boolean(true)).is_err());
        assert!(to_number(&Value::Array(vec![])).is_err());
    }

    #[test]
    fn to_number_propagates_error_values() {
        let err = ValueError::message("upstream");
        assert_eq!(to_number(&Value::Error(err.clone())).unwrap_err(), err);
    }

    #[test]
    fn to_integer_truncates() {
        assert_eq!(to_integer(&Value::text("12.9")).unwrap(), 12);
        assert_eq!(to_integer(&Value::text("-12.9")).unwrap(), -12);
        assert_eq!(to_integer(&Value::text("2147483647")).unwrap(), i32::MAX);
    }

    #[test]
    fn to_integer_range_errors() {
        let err = to_integer(&Value::text("2147483648")).unwrap_err();
        assert_eq!(
            err,
            ValueError::Range {
                value: "2147483648".to_string()
            }
        );
        assert!(to_integer(&Value::text("-99999999999999999999")).is_err());
    }

    #[test]
    fn compare_numbers_across_text_and_number() {
        assert_eq!(
            compare_numbers(&Value::text("10"), &Value::from(9i64)).unwrap(),
            Ordering::Greater
        );
        assert!(compare_numbers(&Value::text("x"), &Value::from(9i64)).is_err());
    }

    #[test]
    fn serde_fields_write_bare_numbers() {
        use std::collections::BTreeMap;

        #[derive(serde::Serialize, serde::Deserialize)]
        struct Amounts {
            #[serde(with = "json_number")]
            total: Decimal,
            #[serde(with = "json_number_map")]
            by_currency: BTreeMap<String, Decimal>,
        }

        let data: serde_json::Value =
            serde_json::from_str(r#"{"total": 12.50, "by_currency": {"RWF": 500, "USD": "0.5"}}"#).unwrap();
        let amounts: Amounts = serde_json::from_value(data).unwrap();
        assert_eq!(amounts.total, dec("12.50"));
        assert_eq!(amounts.by_currency["USD"], dec("0.5"));

        let json = serde_json::to_string(&amounts).unwrap();
        assert_eq!(json, r#"{"total":12.50,"by_currency":{"RWF":500,"USD":0.5}}"#);
    }
}
