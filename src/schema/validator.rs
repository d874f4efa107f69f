//! # Column Value Validation and Coercion
//!
//! Two steps guard every statement parameter:
//! - `validate` decides whether an application value may be written to a column
//! - `coerce` renders an accepted value as the exact text bound to the statement
//!
//! Writes run both. Read lookups only coerce: a search value does not have to
//! satisfy NOT NULL, but it still needs the column's encoding.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime};

use super::{ColumnDescriptor, ColumnFormat};
use crate::error::{RecordError, Result};
use crate::value::{Value, DATETIME_FORMAT};

/// Bound in place of an empty date marker
pub const ZERO_DATE: &str = "0000-00-00 00:00:00";

/// Values that stand for "no date" in date/datetime columns
const EMPTY_DATE_MARKERS: [&str; 2] = ["", "none"];

/// MySQL's largest DECIMAL scale
const MAX_PRECISION: u32 = 30;

const DATETIME_PATTERNS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_PATTERNS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Check that `value` may be written to `column`
pub fn validate(column: &ColumnDescriptor, value: &Value) -> Result<()> {
    if value.is_null() {
        if column.nullable {
            return Ok(());
        }
        return Err(RecordError::invalid_value(
            &column.name,
            "column does not allow a value of null",
        ));
    }

    let valid = match column.format {
        ColumnFormat::Number => value.is_numeric(),
        ColumnFormat::Date | ColumnFormat::DateTime => is_date_like(value),
        ColumnFormat::Enum => {
            if !value.is_stringable() {
                false
            } else {
                let text = value.to_string();
                if column.options.iter().any(|o| *o == text) {
                    true
                } else {
                    return Err(RecordError::invalid_value(
                        &column.name,
                        format!("'{text}' is not a valid value for enum column"),
                    ));
                }
            }
        }
        ColumnFormat::String => value.is_stringable(),
    };

    if valid {
        Ok(())
    } else {
        Err(RecordError::invalid_value(
            &column.name,
            format!(
                "{} value is invalid for the {} column type",
                value.type_name(),
                column.type_name
            ),
        ))
    }
}

/// Render `value` as the parameter bound for `column`.
///
/// Returns `Value::String`, or `Value::Null` for a null input.
pub fn coerce(column: &ColumnDescriptor, value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    match column.format {
        ColumnFormat::Number => {
            let text = value.decimal_text().ok_or_else(|| {
                RecordError::invalid_value(
                    &column.name,
                    format!("{} value is not numeric", value.type_name()),
                )
            })?;
            Ok(Value::String(format_fixed(&text, column.precision)))
        }
        ColumnFormat::Date | ColumnFormat::DateTime => {
            coerce_date(column, value).map(Value::String)
        }
        ColumnFormat::Enum | ColumnFormat::String => coerce_text(&column.name, value),
    }
}

/// Coerce a value for a column the schema does not declare: plain text
pub fn coerce_text(column: &str, value: &Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        v if v.is_stringable() => Ok(Value::String(v.to_string())),
        v => Err(RecordError::invalid_value(
            column,
            format!("{} value cannot be converted to a string", v.type_name()),
        )),
    }
}

fn coerce_date(column: &ColumnDescriptor, value: &Value) -> Result<String> {
    let failed = || RecordError::DateCoercion {
        column: column.name.clone(),
        value: value.to_string(),
    };

    match value {
        Value::String(s) if is_empty_date_marker(s) || is_zero_date(s) => Ok(ZERO_DATE.to_string()),
        Value::String(s) => parse_datetime(s)
            .map(|dt| dt.format(DATETIME_FORMAT).to_string())
            .ok_or_else(failed),
        Value::Int(ts) => DateTime::from_timestamp(*ts, 0)
            .map(|dt| dt.naive_utc().format(DATETIME_FORMAT).to_string())
            .ok_or_else(failed),
        Value::DateTime(dt) => Ok(dt.format(DATETIME_FORMAT).to_string()),
        _ => Err(failed()),
    }
}

fn is_date_like(value: &Value) -> bool {
    match value {
        Value::String(s) => {
            is_empty_date_marker(s) || is_zero_date(s) || parse_datetime(s).is_some()
        }
        Value::Int(ts) => DateTime::from_timestamp(*ts, 0).is_some(),
        Value::DateTime(_) => true,
        _ => false,
    }
}

fn is_empty_date_marker(text: &str) -> bool {
    EMPTY_DATE_MARKERS.contains(&text)
}

fn is_zero_date(text: &str) -> bool {
    text == ZERO_DATE || text == "0000-00-00"
}

/// Parse common calendar date/time spellings.
///
/// Accepts ISO-like date-times (space or `T` separator, optional seconds and
/// fraction), RFC 3339 / RFC 2822 with offsets (kept at their local time),
/// bare dates (midnight), and the relative words `now`, `today`,
/// `yesterday`, `tomorrow`.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    match text.to_ascii_lowercase().as_str() {
        "now" => return Some(Local::now().naive_local()),
        "today" => return Local::now().date_naive().and_hms_opt(0, 0, 0),
        "yesterday" => {
            return (Local::now().date_naive() - Duration::days(1)).and_hms_opt(0, 0, 0)
        }
        "tomorrow" => {
            return (Local::now().date_naive() + Duration::days(1)).and_hms_opt(0, 0, 0)
        }
        _ => {}
    }

    if let Some(dt) = DATETIME_PATTERNS
        .iter()
        .find_map(|p| NaiveDateTime::parse_from_str(text, p).ok())
    {
        return Some(dt);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.naive_local());
    }

    DATE_PATTERNS
        .iter()
        .find_map(|p| NaiveDate::parse_from_str(text, p).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Round plain decimal text to `precision` places, half away from zero.
///
/// `text` is an optional `-`, digits, and an optional fraction (the shape
/// `Value::decimal_text` produces). No grouping separators are emitted.
pub fn format_fixed(text: &str, precision: u32) -> String {
    let precision = precision.min(MAX_PRECISION) as usize;
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let to_digits = |s: &str| -> Vec<u8> {
        s.bytes()
            .filter(u8::is_ascii_digit)
            .map(|b| b - b'0')
            .collect()
    };
    let frac = to_digits(frac_part);
    let mut kept = to_digits(int_part);
    if kept.is_empty() {
        kept.push(0);
    }
    kept.extend((0..precision).map(|i| frac.get(i).copied().unwrap_or(0)));

    if frac.get(precision).is_some_and(|d| *d >= 5) {
        let mut carry = true;
        for digit in kept.iter_mut().rev() {
            if *digit == 9 {
                *digit = 0;
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            kept.insert(0, 1);
        }
    }

    let split = kept.len() - precision;
    let int_digits: String = {
        let first_nonzero = kept[..split]
            .iter()
            .position(|d| *d != 0)
            .unwrap_or(split - 1);
        kept[first_nonzero..split]
            .iter()
            .map(|d| char::from(b'0' + d))
            .collect()
    };

    let mut out = String::with_capacity(kept.len() + 2);
    if negative && kept.iter().any(|d| *d != 0) {
        out.push('-');
    }
    out.push_str(&int_digits);
    if precision > 0 {
        out.push('.');
        out.extend(kept[split..].iter().map(|d| char::from(b'0' + d)));
    }
    out
}
