//! # Record Lifecycle
//!
//! A `Record<T>` holds one row of `T`'s table as an ordered field map and
//! tracks whether that row is known to exist:
//!
//! ```text
//!            load / checkIfExists
//!  Unknown ───────────────────────▶ Found | NotFound
//!     │  insert / save(insert)            ▲
//!     └───────────────────────────▶ Found │
//!                       delete ───────────┘ NotFound
//! ```
//!
//! Every operation resolves the schema first (introspecting once per record
//! type), validates before it builds a statement, and issues at most one
//! statement per step through the record's `Executor`.
//!
//! ## Example
//!
//! ```rust,ignore
//! struct Member;
//!
//! impl RecordType for Member {
//!     fn table_name() -> &'static str {
//!         "members"
//!     }
//! }
//!
//! let mut member = Record::<Member>::find(executor, 18)?;
//! member.set_field("email", "jarvis@example.com");
//! member.save(false)?;
//! ```

pub mod bulk;

use std::fmt;
use std::marker::PhantomData;
use std::ops::Index;
use std::sync::Arc;

use tracing::{debug, info, warn};

pub use bulk::BulkQuery;

use crate::config::RecordConfig;
use crate::error::{RecordError, Result};
use crate::executor::{Executor, QueryResult};
use crate::lookup::{self, Search};
use crate::schema::validator;
use crate::schema::{SchemaCatalog, TableSchema};
use crate::statement::{MySqlBuilder, Statement, StatementBuilder, WriteSet};
use crate::value::{Row, Value};

static NULL: Value = Value::Null;

/// Static description of a table-backed record type
pub trait RecordType: Send + Sync + 'static {
    /// Table the record maps to. Must not be empty.
    fn table_name() -> &'static str;

    /// Hand-declared schema. A seed with both columns and primary keys is
    /// used as-is; anything less is completed by introspection.
    fn seed_schema() -> Option<TableSchema> {
        None
    }

    /// Cache holding the introspected schema
    fn schema_catalog() -> &'static SchemaCatalog {
        SchemaCatalog::global()
    }
}

/// Whether the row a record represents is known to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Existence {
    #[default]
    Unknown,
    Found,
    NotFound,
}

impl Existence {
    pub fn is_found(self) -> bool {
        self == Existence::Found
    }
}

impl fmt::Display for Existence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Existence::Unknown => write!(f, "unknown"),
            Existence::Found => write!(f, "found"),
            Existence::NotFound => write!(f, "not found"),
        }
    }
}

/// One schema-aware row of `T`'s table
pub struct Record<T: RecordType> {
    fields: Row,
    existence: Existence,
    schema: Option<Arc<TableSchema>>,
    executor: Arc<dyn Executor>,
    builder: Arc<dyn StatementBuilder>,
    options: RecordConfig,
    last_match_count: u64,
    _record: PhantomData<fn() -> T>,
}

impl<T: RecordType> Record<T> {
    /// Create an empty record with default options
    pub fn new(executor: Arc<dyn Executor>) -> Result<Self> {
        Self::with_options(executor, RecordConfig::default())
    }

    /// Create an empty record. Without a seed schema the table is
    /// introspected immediately.
    pub fn with_options(executor: Arc<dyn Executor>, options: RecordConfig) -> Result<Self> {
        if T::table_name().is_empty() {
            return Err(RecordError::SchemaDefinition(
                "record implementation is missing the table name definition".to_string(),
            ));
        }

        let mut record = Record {
            fields: Row::new(),
            existence: Existence::Unknown,
            schema: T::seed_schema().map(Arc::new),
            executor,
            builder: Arc::new(MySqlBuilder),
            options,
            last_match_count: 0,
            _record: PhantomData,
        };
        if record.schema.is_none() {
            record.ensure_schema()?;
        }
        Ok(record)
    }

    /// Create a record and load it
    pub fn find(executor: Arc<dyn Executor>, search: impl Into<Search>) -> Result<Self> {
        let mut record = Self::new(executor)?;
        record.load(search)?;
        Ok(record)
    }

    /// Generate statements with a different dialect
    pub fn with_builder(mut self, builder: Arc<dyn StatementBuilder>) -> Self {
        self.builder = builder;
        self
    }

    pub fn table_name(&self) -> &'static str {
        T::table_name()
    }

    /// The schema currently attached, resolved or seeded
    pub fn schema(&self) -> Option<&TableSchema> {
        self.schema.as_deref()
    }

    pub fn exists(&self) -> Existence {
        self.existence
    }

    /// Override the existence state, e.g. when the caller already knows
    /// whether the row is stored
    pub fn set_existence(&mut self, existence: Existence) -> &mut Self {
        self.existence = existence;
        self
    }

    /// Rows matched by the most recent load
    pub fn last_match_count(&self) -> u64 {
        self.last_match_count
    }

    // ========================================================================
    // Field access
    // ========================================================================

    pub fn fields(&self) -> &Row {
        &self.fields
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Assign a field without touching the database
    pub fn set_field(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    pub fn remove_field(&mut self, column: &str) -> Option<Value> {
        self.fields.shift_remove(column)
    }

    /// Present and not null
    pub fn has_field(&self, column: &str) -> bool {
        self.fields.get(column).is_some_and(|v| !v.is_null())
    }

    /// Copy of the field map
    pub fn export(&self) -> Row {
        self.fields.clone()
    }

    /// Merge pairs over the current fields. Existing columns keep their
    /// position; new ones are appended.
    pub fn import<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (column, value) in pairs {
            self.fields.insert(column.into(), value.into());
        }
        self
    }

    pub fn import_record<U: RecordType>(&mut self, other: &Record<U>) -> &mut Self {
        self.import(other.fields.iter().map(|(k, v)| (k.clone(), v.clone())))
    }

    /// Merge a JSON object's members over the current fields
    pub fn import_json(&mut self, json: serde_json::Value) -> Result<&mut Self> {
        match json {
            serde_json::Value::Object(map) => Ok(self.import(map)),
            other => Err(RecordError::invalid_value(
                "import",
                format!("expected a JSON object, found {}", json_type(&other)),
            )),
        }
    }

    /// Drop the named columns
    pub fn filter(&mut self, columns: &[&str]) -> &mut Self {
        for column in columns {
            self.fields.shift_remove(*column);
        }
        self
    }

    /// Keep only the named columns
    pub fn allow(&mut self, columns: &[&str]) -> &mut Self {
        self.fields.retain(|column, _| columns.contains(&column.as_str()));
        self
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load the row matching `search` and merge it into the fields.
    ///
    /// Returns whether a row was found. When several rows match, the first
    /// one is applied and a warning is logged.
    pub fn load(&mut self, search: impl Into<Search>) -> Result<bool> {
        let schema = self.ensure_schema()?;
        let lookup = lookup::resolve(&search.into(), &schema, &self.fields)?;
        let statement = self.builder.select(T::table_name(), &lookup, self.load_limit());
        self.load_record(&statement)
    }

    /// Load using a caller-written statement
    pub fn load_using_query(
        &mut self,
        sql: impl Into<String>,
        params: Vec<(String, Value)>,
    ) -> Result<bool> {
        let statement = Statement::raw(sql, params);
        self.load_record(&statement)
    }

    fn load_record(&mut self, statement: &Statement) -> Result<bool> {
        let result = self.run(statement)?;
        if !result.is_success() {
            self.last_match_count = 0;
            self.existence = Existence::NotFound;
            return Ok(false);
        }

        let count = result.row_count();
        self.last_match_count = count;
        if count > 1 && self.options.notify_multiple_rows {
            warn!(
                table = T::table_name(),
                rows = count,
                "Encountered multiple matching rows while loading; only using the first row"
            );
        }
        if let Some(row) = result.rows.into_iter().next() {
            self.import(row);
        }
        self.existence = Existence::Found;
        Ok(true)
    }

    /// Look the row up by primary key without merging anything.
    ///
    /// An incomplete primary key means the row cannot exist yet: the record
    /// becomes `NotFound` without a statement being issued.
    pub fn check_if_exists(&mut self) -> Result<bool> {
        let schema = self.ensure_schema()?;
        self.validate_fields(&schema)?;

        let Some(lookup) = lookup::try_primary_key_lookup(&schema, &self.fields)? else {
            debug!(table = T::table_name(), "Primary key incomplete; record cannot exist");
            self.existence = Existence::NotFound;
            return Ok(false);
        };

        let statement = self.builder.select(T::table_name(), &lookup, self.load_limit());
        let found = self.run(&statement)?.is_success();
        self.existence = if found {
            Existence::Found
        } else {
            Existence::NotFound
        };
        Ok(found)
    }

    // ========================================================================
    // Writing
    // ========================================================================

    /// Write the fields as a new row (`REPLACE` when `replace`).
    ///
    /// The auto-increment column is only written by a replace; otherwise the
    /// generated id is read back into the fields.
    pub fn insert(&mut self, replace: bool) -> Result<bool> {
        let schema = self.ensure_schema()?;
        self.validate_fields(&schema)?;

        let write = self.write_set(&schema, |column| replace || !schema.is_auto_increment(column))?;
        if write.is_empty() {
            debug!(table = T::table_name(), "No schema columns to insert");
            return Ok(false);
        }

        let statement = self.builder.insert(T::table_name(), &write, replace);
        if !self.run(&statement)?.is_success() {
            return Ok(false);
        }

        if let Some(column) = schema.auto_increment.as_deref() {
            if !write.contains_key(column) {
                let id = self
                    .executor
                    .last_insert_id()
                    .map_err(RecordError::Executor)?;
                if let Some(id) = id {
                    self.fields.insert(column.to_string(), id);
                }
            }
        }
        self.existence = Existence::Found;
        Ok(true)
    }

    /// Write every schema column to the row identified by the primary key.
    /// Key columns are never rewritten.
    pub fn update(&mut self) -> Result<bool> {
        let schema = self.ensure_schema()?;
        self.validate_fields(&schema)?;

        let lookup = lookup::primary_key_lookup(&schema, &self.fields, "update")?;
        let write = self.write_set(&schema, |_| true)?;
        if write.keys().all(|column| lookup.contains_key(column)) {
            debug!(table = T::table_name(), "Only key columns set; nothing to update");
            return Ok(false);
        }

        let statement = self.builder.update(T::table_name(), &write, &lookup);
        Ok(self.run(&statement)?.is_success())
    }

    /// Insert or update, whichever the row's existence calls for.
    ///
    /// `replace` always issues a `REPLACE`. Otherwise an unknown record is
    /// checked first. The check and the write are separate statements.
    pub fn save(&mut self, replace: bool) -> Result<bool> {
        if replace {
            return self.insert(true);
        }
        if self.existence == Existence::Unknown {
            self.check_if_exists()?;
        }
        if self.existence.is_found() {
            self.update()
        } else {
            self.insert(false)
        }
    }

    /// Assign one column and persist it immediately: a single-column update
    /// when the row exists, a full insert when it does not.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<bool> {
        let schema = self.ensure_schema()?;
        self.require_column(&schema, column)?;

        let value = value.into();
        self.fields.insert(column.to_string(), value.clone());
        self.persist_column(&schema, column, &value)
    }

    /// Persist the value the column already holds (absent means null)
    pub fn set_current(&mut self, column: &str) -> Result<bool> {
        let schema = self.ensure_schema()?;
        self.require_column(&schema, column)?;

        let value = self.fields.get(column).cloned().unwrap_or_default();
        self.persist_column(&schema, column, &value)
    }

    fn persist_column(
        &mut self,
        schema: &TableSchema,
        column: &str,
        value: &Value,
    ) -> Result<bool> {
        if self.existence == Existence::Unknown {
            self.check_if_exists()?;
        }
        if !self.existence.is_found() {
            return self.insert(false);
        }

        let Some(descriptor) = schema.column(column) else {
            return Err(self.not_in_schema(column));
        };
        validator::validate(descriptor, value)?;

        let lookup = lookup::primary_key_lookup(schema, &self.fields, "update")?;
        if lookup.contains_key(column) {
            debug!(table = T::table_name(), column, "Key column set; nothing to update");
            return Ok(false);
        }

        let mut write = WriteSet::with_capacity(1);
        write.insert(column.to_string(), validator::coerce(descriptor, value)?);
        let statement = self.builder.update(T::table_name(), &write, &lookup);
        Ok(self.run(&statement)?.is_success())
    }

    /// Delete the row identified by the primary key
    pub fn delete(&mut self) -> Result<bool> {
        let schema = self.ensure_schema()?;
        self.validate_fields(&schema)?;

        let lookup = lookup::primary_key_lookup(&schema, &self.fields, "delete")?;
        let statement = self.builder.delete(T::table_name(), &lookup);
        if !self.run(&statement)?.is_success() {
            return Ok(false);
        }
        self.existence = Existence::NotFound;
        Ok(true)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Resolve the schema, introspecting through the catalog when the
    /// attached one is neither loaded nor complete
    fn ensure_schema(&mut self) -> Result<Arc<TableSchema>> {
        if let Some(schema) = &self.schema {
            if schema.loaded || schema.is_complete() {
                return Ok(Arc::clone(schema));
            }
        }

        let executor = Arc::clone(&self.executor);
        let table = T::table_name();
        let schema = T::schema_catalog().get_or_try_init::<T, _>(|| {
            let rows = executor.describe(table).map_err(RecordError::Executor)?;
            if rows.is_empty() {
                return Err(RecordError::SchemaDefinition(format!(
                    "table {table} reported no columns"
                )));
            }
            let schema = TableSchema::from_describe(rows);
            schema.check_invariants().map_err(RecordError::SchemaDefinition)?;
            info!(
                table,
                columns = schema.columns.len(),
                primary_keys = ?schema.primary_keys,
                auto_increment = ?schema.auto_increment,
                "Introspected table schema"
            );
            Ok(schema)
        })?;

        self.schema = Some(Arc::clone(&schema));
        Ok(schema)
    }

    fn validate_fields(&self, schema: &TableSchema) -> Result<()> {
        for (column, value) in &self.fields {
            if let Some(descriptor) = schema.column(column) {
                validator::validate(descriptor, value)?;
            }
        }
        Ok(())
    }

    /// Coerced schema columns in field order
    fn write_set(&self, schema: &TableSchema, include: impl Fn(&str) -> bool) -> Result<WriteSet> {
        let mut write = WriteSet::with_capacity(self.fields.len());
        for (column, value) in &self.fields {
            let Some(descriptor) = schema.column(column) else {
                continue;
            };
            if include(column) {
                write.insert(column.clone(), validator::coerce(descriptor, value)?);
            }
        }
        Ok(write)
    }

    fn require_column(&self, schema: &TableSchema, column: &str) -> Result<()> {
        if schema.has_column(column) {
            Ok(())
        } else {
            Err(self.not_in_schema(column))
        }
    }

    fn not_in_schema(&self, column: &str) -> RecordError {
        RecordError::ColumnNotInSchema {
            table: T::table_name().to_string(),
            column: column.to_string(),
        }
    }

    fn load_limit(&self) -> Option<u64> {
        (self.options.load_limit > 0).then_some(self.options.load_limit)
    }

    fn run(&self, statement: &Statement) -> Result<QueryResult> {
        debug!(
            table = T::table_name(),
            kind = %statement.kind,
            sql = %statement.sql,
            "Executing statement"
        );
        self.executor
            .execute(statement)
            .map_err(RecordError::Executor)
    }

    /// A found record of the same type sharing this one's collaborators
    fn sibling(&self, fields: Row) -> Self {
        Record {
            fields,
            existence: Existence::Found,
            schema: self.schema.clone(),
            executor: Arc::clone(&self.executor),
            builder: Arc::clone(&self.builder),
            options: self.options.clone(),
            last_match_count: 1,
            _record: PhantomData,
        }
    }
}

impl<T: RecordType> Index<&str> for Record<T> {
    type Output = Value;

    /// Missing columns read as null
    fn index(&self, column: &str) -> &Value {
        self.fields.get(column).unwrap_or(&NULL)
    }
}

impl<T: RecordType> fmt::Debug for Record<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &T::table_name())
            .field("existence", &self.existence)
            .field("fields", &self.fields)
            .finish()
    }
}

fn json_type(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
