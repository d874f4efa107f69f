//! # Table Schema Module
//!
//! Normalized description of a table, derived from the rows a `DESCRIBE`
//! call reports:
//! - `ColumnDescriptor`: one column's semantic format, nullability, precision and enum options
//! - `TableSchema`: the column map, primary keys (in declaration order) and auto-increment column
//! - `SchemaCatalog`: process-wide cache of resolved schemas, one per record type
//!
//! ## Example
//!
//! ```rust
//! use rowrecord::schema::{ColumnFormat, DescribeRow, TableSchema};
//!
//! let schema = TableSchema::from_describe(vec![
//!     DescribeRow::new("member_id", "int(11) unsigned").primary().auto_increment(),
//!     DescribeRow::new("balance", "decimal(10,2)"),
//! ]);
//!
//! assert_eq!(schema.primary_keys, vec!["member_id".to_string()]);
//! assert_eq!(schema.column("balance").map(|c| c.precision), Some(2));
//! assert_eq!(schema.column("balance").map(|c| c.format), Some(ColumnFormat::Number));
//! ```

pub mod catalog;
pub mod classifier;
pub mod validator;

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use catalog::SchemaCatalog;
pub use classifier::{classify, TypeClass};

/// Validation/coercion family of a column, derived from its raw type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnFormat {
    Number,
    Date,
    DateTime,
    Enum,
    String,
}

impl fmt::Display for ColumnFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnFormat::Number => write!(f, "number"),
            ColumnFormat::Date => write!(f, "date"),
            ColumnFormat::DateTime => write!(f, "datetime"),
            ColumnFormat::Enum => write!(f, "enum"),
            ColumnFormat::String => write!(f, "string"),
        }
    }
}

/// One column of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Raw type name (`decimal`, `varchar`, `tinyint`...), kept for diagnostics
    pub type_name: String,
    pub format: ColumnFormat,
    pub nullable: bool,
    /// Diagnostics only; not enforced
    pub unsigned: bool,
    /// Decimal places; meaningful for `Number` columns
    pub precision: u32,
    /// Allowed values; meaningful for `Enum` columns
    pub options: Vec<String>,
    /// Declared length; informational
    pub length: Option<u32>,
}

impl ColumnDescriptor {
    /// Build a descriptor by classifying a raw type string
    pub fn new(name: impl Into<String>, raw_type: &str, nullable: bool) -> Self {
        let class = classify(raw_type);
        ColumnDescriptor {
            name: name.into(),
            type_name: class.type_name,
            format: class.format,
            nullable,
            unsigned: class.unsigned,
            precision: class.precision,
            options: class.options,
            length: class.length,
        }
    }
}

impl fmt::Display for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.name, self.type_name, self.format)?;
        if !self.nullable {
            write!(f, " NOT NULL")?;
        }
        Ok(())
    }
}

/// One row of `DESCRIBE <table>` output, using MySQL's column names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeRow {
    #[serde(rename = "Field")]
    pub field: String,
    #[serde(rename = "Type")]
    pub type_name: String,
    /// `"YES"` when the column accepts NULL
    #[serde(rename = "Null")]
    pub null: String,
    /// `"PRI"` for primary-key columns
    #[serde(rename = "Key", default)]
    pub key: String,
    #[serde(rename = "Default", default)]
    pub default: Option<String>,
    /// `"auto_increment"` for the generated-id column
    #[serde(rename = "Extra", default)]
    pub extra: String,
}

impl DescribeRow {
    /// A non-null, non-key column
    pub fn new(field: impl Into<String>, type_name: impl Into<String>) -> Self {
        DescribeRow {
            field: field.into(),
            type_name: type_name.into(),
            null: "NO".to_string(),
            key: String::new(),
            default: None,
            extra: String::new(),
        }
    }

    pub fn nullable(mut self) -> Self {
        self.null = "YES".to_string();
        self
    }

    pub fn primary(mut self) -> Self {
        self.key = "PRI".to_string();
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.extra = "auto_increment".to_string();
        self
    }

    pub fn is_nullable(&self) -> bool {
        self.null == "YES"
    }

    pub fn is_primary(&self) -> bool {
        self.key == "PRI"
    }

    pub fn is_auto_increment(&self) -> bool {
        self.extra == "auto_increment"
    }
}

/// Normalized description of a table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Column map in introspection order
    pub columns: IndexMap<String, ColumnDescriptor>,
    /// Primary-key columns in introspection order
    pub primary_keys: Vec<String>,
    pub auto_increment: Option<String>,
    /// Set once the schema came from a full introspection
    pub loaded: bool,
}

impl TableSchema {
    /// An empty, unresolved schema
    pub fn new() -> Self {
        TableSchema::default()
    }

    /// Build a fully resolved schema from `DESCRIBE` rows
    pub fn from_describe(rows: impl IntoIterator<Item = DescribeRow>) -> Self {
        let mut schema = TableSchema::new();
        for row in rows {
            let descriptor = ColumnDescriptor::new(&row.field, &row.type_name, row.is_nullable());
            if row.is_primary() {
                schema.primary_keys.push(row.field.clone());
            }
            if row.is_auto_increment() {
                schema.auto_increment = Some(row.field.clone());
            }
            schema.columns.insert(row.field, descriptor);
        }
        schema.loaded = true;
        schema
    }

    /// Add a column. Hand-declared schemas are built this way.
    pub fn with_column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.insert(column.name.clone(), column);
        self
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_keys.push(column.into());
        self
    }

    pub fn with_auto_increment(mut self, column: impl Into<String>) -> Self {
        self.auto_increment = Some(column.into());
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.get(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn is_auto_increment(&self, name: &str) -> bool {
        self.auto_increment.as_deref() == Some(name)
    }

    /// Both a primary key and at least one column are declared.
    /// A complete schema can be used without introspection.
    pub fn is_complete(&self) -> bool {
        !self.primary_keys.is_empty() && !self.columns.is_empty()
    }

    /// Every primary key and the auto-increment column exist in `columns`
    pub fn check_invariants(&self) -> Result<(), String> {
        if let Some(missing) = self.primary_keys.iter().find(|k| !self.columns.contains_key(*k)) {
            return Err(format!("primary key '{missing}' is not a declared column"));
        }
        if let Some(ai) = &self.auto_increment {
            if !self.columns.contains_key(ai) {
                return Err(format!("auto-increment column '{ai}' is not a declared column"));
            }
        }
        Ok(())
    }
}
