//! Lenient numeric conversion for vendor payloads.
//!
//! Vendors send amounts as JSON strings, numbers, comma-grouped text or
//! zero-padded fixed-width fields. A field that cannot be read becomes zero;
//! one bad field never aborts the record or the batch.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

/// Parses a textual amount, defaulting to zero.
///
/// Accepts surrounding whitespace, thousands separators, a leading `+`,
/// and scientific notation.
pub fn parse_decimal_or_zero(raw: &str) -> Decimal {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }

    Decimal::from_str(cleaned)
        .or_else(|_| Decimal::from_scientific(cleaned))
        .unwrap_or(Decimal::ZERO)
        .normalize()
}

/// Parses a textual quantity, defaulting to zero. Fractions are truncated.
pub fn parse_i64_or_zero(raw: &str) -> i64 {
    parse_decimal_or_zero(raw).trunc().to_i64().unwrap_or(0)
}

/// Reads an amount from an optional JSON value, defaulting to zero.
pub fn decimal_or_zero(value: Option<&Value>) -> Decimal {
    match value {
        Some(Value::String(s)) => parse_decimal_or_zero(s),
        Some(Value::Number(n)) => parse_decimal_or_zero(&n.to_string()),
        _ => Decimal::ZERO,
    }
}

/// Reads a quantity from an optional JSON value, defaulting to zero.
pub fn i64_or_zero(value: Option<&Value>) -> i64 {
    decimal_or_zero(value).trunc().to_i64().unwrap_or(0)
}

/// Reads a string field, trimming whitespace. Missing or non-string is empty.
pub fn string_or_empty(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_decimal_variants() {
        assert_eq!(parse_decimal_or_zero("1,234,567"), dec!(1234567));
        assert_eq!(parse_decimal_or_zero("  -000012.50 "), dec!(-12.5));
        assert_eq!(parse_decimal_or_zero("+3.14"), dec!(3.14));
        assert_eq!(parse_decimal_or_zero("1.5e3"), dec!(1500));
        assert_eq!(parse_decimal_or_zero(""), Decimal::ZERO);
        assert_eq!(parse_decimal_or_zero("N/A"), Decimal::ZERO);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_i64_or_zero("000000000012"), 12);
        assert_eq!(parse_i64_or_zero("7.9"), 7);
        assert_eq!(parse_i64_or_zero("-"), 0);
    }

    #[test]
    fn test_json_values() {
        let payload = json!({
            "text": "52,300",
            "number": 1.25,
            "integer": 42,
            "null": null,
            "object": {"a": 1}
        });

        assert_eq!(decimal_or_zero(payload.get("text")), dec!(52300));
        assert_eq!(decimal_or_zero(payload.get("number")), dec!(1.25));
        assert_eq!(i64_or_zero(payload.get("integer")), 42);
        assert_eq!(decimal_or_zero(payload.get("null")), Decimal::ZERO);
        assert_eq!(decimal_or_zero(payload.get("object")), Decimal::ZERO);
        assert_eq!(decimal_or_zero(payload.get("missing")), Decimal::ZERO);
        assert_eq!(string_or_empty(payload.get("integer")), "42");
        assert_eq!(string_or_empty(payload.get("missing")), "");
    }
}
