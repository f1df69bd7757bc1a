//! Column conversion helpers shared by the repositories.
//!
//! Monetary values are stored as decimal text and calendar days as
//! `YYYY-MM-DD` text so that lexical order matches date order.

use std::str::FromStr;

use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Rows per multi-row INSERT. Each row binds about a dozen parameters, which
/// keeps a statement well under SQLite's default variable limit.
pub const INSERT_CHUNK_ROWS: usize = 50;

pub fn decimal_to_text(value: Decimal) -> String {
    value.normalize().to_string()
}

pub fn text_to_decimal(column: &str, raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap_or_else(|e| {
        warn!("Stored {} value '{}' is not a decimal: {}", column, raw, e);
        Decimal::ZERO
    })
}

pub fn date_to_text(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn text_to_date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).unwrap_or_else(|e| {
        warn!("Stored date '{}' could not be parsed: {}", raw, e);
        NaiveDate::default()
    })
}
