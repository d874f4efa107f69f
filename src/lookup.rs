//! # Lookup Resolver
//!
//! Turns the shapes a caller may hand to `load` into one canonical, ordered
//! column → coerced value set:
//! - `Search::Existing`: every primary key, taken from the record's fields
//! - `Search::Value`: the single primary key
//! - `Search::Field`: one explicitly named column, not checked against the schema
//! - `Search::Columns`: column/value pairs in caller order
//!
//! Lookup values are coerced but never validated: a search value does not
//! have to satisfy the column's NOT NULL constraint.

use indexmap::IndexMap;

use crate::error::{RecordError, Result};
use crate::schema::validator;
use crate::schema::TableSchema;
use crate::value::{Row, Value};

/// Ordered column → coerced value pairs scoping a statement
pub type LookupSet = IndexMap<String, Value>;

/// A load request
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Search {
    /// Use the primary-key values already held by the record
    #[default]
    Existing,
    /// A value for the table's only primary key
    Value(Value),
    /// A value for a named column
    Field { value: Value, column: String },
    /// Column/value pairs, all of which must match
    Columns(Vec<(String, Value)>),
}

impl Search {
    /// Search a named column
    pub fn field(value: impl Into<Value>, column: impl Into<String>) -> Self {
        Search::Field {
            value: value.into(),
            column: column.into(),
        }
    }
}

impl From<Value> for Search {
    fn from(value: Value) -> Self {
        Search::Value(value)
    }
}

impl From<i64> for Search {
    fn from(value: i64) -> Self {
        Search::Value(Value::Int(value))
    }
}

impl From<i32> for Search {
    fn from(value: i32) -> Self {
        Search::Value(Value::from(value))
    }
}

impl From<&str> for Search {
    fn from(value: &str) -> Self {
        Search::Value(Value::from(value))
    }
}

impl From<String> for Search {
    fn from(value: String) -> Self {
        Search::Value(Value::String(value))
    }
}

impl<V: Into<Value>> From<(V, &str)> for Search {
    fn from((value, column): (V, &str)) -> Self {
        Search::field(value, column)
    }
}

impl<K: Into<String>, V: Into<Value>> From<Vec<(K, V)>> for Search {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Search::Columns(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Search {
    fn from(pairs: [(K, V); N]) -> Self {
        Search::from(Vec::from(pairs))
    }
}

impl From<IndexMap<String, Value>> for Search {
    fn from(map: IndexMap<String, Value>) -> Self {
        Search::Columns(map.into_iter().collect())
    }
}

/// Resolve a load request against the schema and the record's current fields
pub fn resolve(search: &Search, schema: &TableSchema, fields: &Row) -> Result<LookupSet> {
    match search {
        Search::Existing => existing_lookup(schema, fields),
        Search::Value(Value::Null) => existing_lookup(schema, fields),
        Search::Value(Value::List(_)) | Search::Field { value: Value::List(_), .. } => Err(
            RecordError::missing_key("Could not load record using passed arguments."),
        ),
        Search::Value(value) => {
            let pkey = match schema.primary_keys.as_slice() {
                [only] => only,
                [] => {
                    return Err(RecordError::missing_key(
                        "Could not load record using single primary key value; table has no primary keys.",
                    ))
                }
                _ => {
                    return Err(RecordError::missing_key(
                        "Could not load record using single primary key value; table has more than one primary key.",
                    ))
                }
            };
            let mut lookup = LookupSet::with_capacity(1);
            lookup.insert(pkey.clone(), coerce_for_lookup(schema, pkey, value)?);
            Ok(lookup)
        }
        Search::Field { value, column } => {
            let mut lookup = LookupSet::with_capacity(1);
            lookup.insert(column.clone(), coerce_for_lookup(schema, column, value)?);
            Ok(lookup)
        }
        Search::Columns(pairs) => column_lookup(schema, pairs),
    }
}

/// Resolve column/value pairs in caller order. Empty input is a `MissingKey` error.
pub fn column_lookup(schema: &TableSchema, pairs: &[(String, Value)]) -> Result<LookupSet> {
    if pairs.is_empty() {
        return Err(RecordError::missing_key(
            "Could not load record using empty column set.",
        ));
    }

    let mut lookup = LookupSet::with_capacity(pairs.len());
    for (column, value) in pairs {
        lookup.insert(column.clone(), coerce_for_lookup(schema, column, value)?);
    }
    Ok(lookup)
}

/// Primary-key lookup for operations that cannot proceed without one
/// (`update`, `delete`, the found branch of `set`)
pub fn primary_key_lookup(
    schema: &TableSchema,
    fields: &Row,
    operation: &str,
) -> Result<LookupSet> {
    if schema.primary_keys.is_empty() {
        return Err(RecordError::missing_key(format!(
            "Could not {operation} record; table has no primary keys."
        )));
    }
    if let Some(pkey) = missing_primary_key(schema, fields) {
        return Err(RecordError::missing_key(format!(
            "Could not {operation} record, required primary key value was absent: {pkey}"
        )));
    }
    build_primary_key_lookup(schema, fields)
}

/// Primary-key lookup for `check_if_exists`: `None` when any key is missing
pub fn try_primary_key_lookup(schema: &TableSchema, fields: &Row) -> Result<Option<LookupSet>> {
    if schema.primary_keys.is_empty() || missing_primary_key(schema, fields).is_some() {
        return Ok(None);
    }
    build_primary_key_lookup(schema, fields).map(Some)
}

fn existing_lookup(schema: &TableSchema, fields: &Row) -> Result<LookupSet> {
    if schema.primary_keys.is_empty() {
        return Err(RecordError::missing_key(
            "Could not load record using existing data; table has no primary keys.",
        ));
    }
    if let Some(pkey) = missing_primary_key(schema, fields) {
        return Err(RecordError::missing_key(format!(
            "Could not load record, required primary key value was absent: {pkey}"
        )));
    }
    build_primary_key_lookup(schema, fields)
}

fn missing_primary_key<'a>(schema: &'a TableSchema, fields: &Row) -> Option<&'a str> {
    schema
        .primary_keys
        .iter()
        .find(|pkey| fields.get(pkey.as_str()).is_none_or(Value::is_null))
        .map(String::as_str)
}

fn build_primary_key_lookup(schema: &TableSchema, fields: &Row) -> Result<LookupSet> {
    let mut lookup = LookupSet::with_capacity(schema.primary_keys.len());
    for pkey in &schema.primary_keys {
        let value = fields.get(pkey.as_str()).unwrap_or(&Value::Null);
        lookup.insert(pkey.clone(), coerce_for_lookup(schema, pkey, value)?);
    }
    Ok(lookup)
}

/// Coerce with the column's rules when the schema declares it, as plain text otherwise
pub(crate) fn coerce_for_lookup(
    schema: &TableSchema,
    column: &str,
    value: &Value,
) -> Result<Value> {
    match schema.column(column) {
        Some(descriptor) => validator::coerce(descriptor, value),
        None => validator::coerce_text(column, value),
    }
}
