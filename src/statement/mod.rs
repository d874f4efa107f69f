//! Statement Builder
//!
//! Renders lookup and write sets into SQL text plus named parameter bindings:
//! - `Statement`: the SQL text, its bindings in placeholder order, and its kind
//! - `StatementBuilder`: one implementation per SQL dialect
//! - `MySqlBuilder`: the MySQL dialect (`` `col` = :Wcol `` / `` `col` = :Scol ``)
//!
//! WHERE placeholders are prefixed `W` and SET placeholders `S`, so a column
//! that appears in both clauses binds twice without collision.

pub mod mysql;

use std::fmt;

use serde::Serialize;

pub use mysql::MySqlBuilder;

use crate::lookup::LookupSet;
use crate::value::Value;

/// Column → coerced value pairs to persist, in field order
pub type WriteSet = LookupSet;

/// Placeholder prefix for WHERE bindings
pub const WHERE_PREFIX: char = 'W';
/// Placeholder prefix for SET bindings
pub const SET_PREFIX: char = 'S';

// ============================================================================
// Statement
// ============================================================================

/// What a statement does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Select,
    Insert,
    Replace,
    Update,
    Delete,
    /// Caller-supplied text, passed through untouched
    Raw,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Replace => "replace",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
            StatementKind::Raw => "raw",
        };
        f.write_str(name)
    }
}

/// SQL text plus named bindings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub sql: String,
    /// `(":Wcolumn", value)` pairs in placeholder order
    pub params: Vec<(String, Value)>,
}

impl Statement {
    pub fn new(kind: StatementKind, sql: impl Into<String>) -> Self {
        Statement {
            kind,
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// A caller-written statement
    pub fn raw(sql: impl Into<String>, params: Vec<(String, Value)>) -> Self {
        Statement {
            kind: StatementKind::Raw,
            sql: sql.into(),
            params,
        }
    }

    pub fn bind(&mut self, placeholder: impl Into<String>, value: Value) {
        self.params.push((placeholder.into(), value));
    }

    /// Value bound to `placeholder`, e.g. `":Wmember_id"`
    pub fn param(&self, placeholder: &str) -> Option<&Value> {
        self.params
            .iter()
            .find(|(name, _)| name == placeholder)
            .map(|(_, value)| value)
    }

    /// Bindings as a JSON object, in placeholder order
    pub fn params_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .params
            .iter()
            .map(|(name, value)| {
                let json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
                (name.clone(), json)
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Dialect-specific statement generation. Implementations are pure: equal
/// inputs give byte-identical statements.
pub trait StatementBuilder: fmt::Debug + Send + Sync {
    /// `SELECT *` scoped by `lookup`; an empty lookup selects the whole table
    fn select(&self, table: &str, lookup: &LookupSet, limit: Option<u64>) -> Statement;

    /// `INSERT` (or `REPLACE` when `replace`) of every column in `write`
    fn insert(&self, table: &str, write: &WriteSet, replace: bool) -> Statement;

    /// `UPDATE` of the columns in `write` that are not part of `lookup`
    fn update(&self, table: &str, write: &WriteSet, lookup: &LookupSet) -> Statement;

    fn delete(&self, table: &str, lookup: &LookupSet) -> Statement;

    /// Prefix a bare `WHERE`/`GROUP`/`ORDER`/`LIMIT` fragment into a full select
    fn select_with_fragment(&self, table: &str, fragment: &str) -> Statement;
}
