//! # Column Type Classifier
//!
//! Maps a raw type string as reported by `DESCRIBE` (`decimal(10,2)`,
//! `int(11) unsigned`, `enum('Free','None')`...) onto a semantic format.
//! Rules are tried in order; the first match wins:
//!
//! | Raw type | Format | Extracted |
//! |---|---|---|
//! | `date` | date | |
//! | `datetime`, `timestamp` | datetime | |
//! | `decimal(m,d)` | number | precision = d |
//! | `float(m,d)` | number | precision = d |
//! | `[big\|medium\|small\|tiny]int(n)` | number | precision 0 |
//! | `enum(...)` | enum | options |
//! | `[var]char(n)` | string | length = n |
//! | anything else | string | type = text before `(` |
//!
//! Enum options are split on every comma and lose exactly one leading and
//! trailing character each. Options whose literal contains a comma or an
//! escaped quote are therefore not supported.

use std::sync::LazyLock;

use regex::Regex;

use super::ColumnFormat;

static DATETIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(datetime|timestamp)$").expect("datetime regex"));
static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^decimal\((\d+),(\d+)\)").expect("decimal regex"));
static FLOAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^float\((\d+),(\d+)\)").expect("float regex"));
static INTEGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:big|medium|small|tiny)?int)\((\d+)\)").expect("integer regex")
});
static ENUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^enum\((.*)\)").expect("enum regex"));
static CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^((?:var)?char)\((\d+)\)").expect("char regex"));

/// Result of classifying one raw type string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeClass {
    pub type_name: String,
    pub format: ColumnFormat,
    pub unsigned: bool,
    pub precision: u32,
    pub options: Vec<String>,
    pub length: Option<u32>,
}

impl TypeClass {
    fn new(type_name: impl Into<String>, format: ColumnFormat) -> Self {
        TypeClass {
            type_name: type_name.into(),
            format,
            unsigned: false,
            precision: 0,
            options: Vec::new(),
            length: None,
        }
    }
}

/// Classify a raw column type. Pure: equal inputs give equal outputs.
pub fn classify(raw: &str) -> TypeClass {
    let mut class = classify_shape(raw);
    class.unsigned = raw.to_ascii_lowercase().contains("unsigned");
    class
}

fn classify_shape(raw: &str) -> TypeClass {
    if raw == "date" {
        return TypeClass::new("date", ColumnFormat::Date);
    }

    if DATETIME.is_match(raw) {
        return TypeClass::new(raw, ColumnFormat::DateTime);
    }

    if let Some(caps) = DECIMAL.captures(raw) {
        let mut class = TypeClass::new("decimal", ColumnFormat::Number);
        class.precision = parse_digits(&caps[2]);
        return class;
    }

    if let Some(caps) = FLOAT.captures(raw) {
        let mut class = TypeClass::new("float", ColumnFormat::Number);
        class.precision = parse_digits(&caps[2]);
        return class;
    }

    if let Some(caps) = INTEGER.captures(raw) {
        return TypeClass::new(&caps[1], ColumnFormat::Number);
    }

    if let Some(caps) = ENUM.captures(raw) {
        let mut class = TypeClass::new("enum", ColumnFormat::Enum);
        class.options = caps[1].split(',').map(strip_quotes).collect();
        return class;
    }

    if let Some(caps) = CHAR.captures(raw) {
        let mut class = TypeClass::new(&caps[1], ColumnFormat::String);
        class.length = Some(parse_digits(&caps[2]));
        return class;
    }

    let base = raw.split('(').next().unwrap_or(raw);
    TypeClass::new(base, ColumnFormat::String)
}

// Digit captures are bounded by the regex; saturate on absurd widths
fn parse_digits(digits: &str) -> u32 {
    digits.parse().unwrap_or(u32::MAX)
}

/// Drop one leading and one trailing character
fn strip_quotes(option: &str) -> String {
    let mut chars = option.chars();
    chars.next();
    chars.next_back();
    chars.as_str().to_string()
}
