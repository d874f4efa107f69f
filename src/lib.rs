//! # rowrecord
//!
//! Schema-aware row records with deterministic statement generation.
//!
//! A record type names its table; the first record of that type introspects
//! the table once and shares the resulting schema process-wide. Each record
//! holds one row as an ordered field map and turns `load`, `insert`,
//! `update`, `save`, `set` and `delete` into parameterized statements handed
//! to an external `Executor`.
//!
//! ## Pipeline
//!
//! ```text
//! DESCRIBE rows
//!     ↓
//! [Type Classifier]      → ColumnDescriptor per column
//!     ↓
//! [Schema Catalog]       → Arc<TableSchema>, once per record type
//!     ↓
//! [Validator / Coercer]  → accepted fields, bound text
//!     ↓
//! [Lookup Resolver]      → ordered WHERE set
//!     ↓
//! [Statement Builder]    → SQL + :W / :S bindings
//!     ↓
//! Executor               → rows / affected count → existence state
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rowrecord::{Record, RecordType, Search};
//!
//! struct Member;
//!
//! impl RecordType for Member {
//!     fn table_name() -> &'static str {
//!         "members"
//!     }
//! }
//!
//! let executor: Arc<dyn rowrecord::Executor> = Arc::new(MyPdoLikeExecutor::connect()?);
//!
//! // SELECT * FROM members WHERE `member_id` = :Wmember_id
//! let mut member = Record::<Member>::find(Arc::clone(&executor), 18)?;
//!
//! // SELECT * FROM members WHERE `username` = :Wusername
//! member.load(Search::field("chipersoft", "username"))?;
//!
//! member.set_field("firstname", "Jarvis");
//! member.save(false)?;
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod lookup;
pub mod record;
pub mod schema;
pub mod statement;
pub mod value;

pub use config::{Config, LoggingConfig, RecordConfig};
pub use error::{ExecutorError, RecordError, Result};
pub use executor::{Executor, QueryResult};
pub use logging::init_tracing;
pub use lookup::{LookupSet, Search};
pub use record::{BulkQuery, Existence, Record, RecordType};
pub use schema::validator::{coerce, validate, ZERO_DATE};
pub use schema::{
    classify, ColumnDescriptor, ColumnFormat, DescribeRow, SchemaCatalog, TableSchema, TypeClass,
};
pub use statement::{MySqlBuilder, Statement, StatementBuilder, StatementKind, WriteSet};
pub use value::{Row, Value};
