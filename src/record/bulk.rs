//! Bulk loading: one read statement, one found record per returned row.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::{Record, RecordType};
use crate::error::{RecordError, Result};
use crate::executor::Executor;
use crate::lookup::{self, LookupSet};
use crate::statement::Statement;
use crate::value::Value;

/// Leading keywords that get `SELECT * FROM <table>` prepended
const FRAGMENT_KEYWORDS: [&str; 4] = ["WHERE", "GROUP", "ORDER", "LIMIT"];

/// Leading keywords the read-only loader refuses
const WRITE_KEYWORDS: [&str; 3] = ["INSERT", "REPLACE", "DELETE"];

/// What `load_multiple` should read
#[derive(Debug, Clone, PartialEq)]
pub enum BulkQuery {
    /// Rows matching every column/value pair
    Columns(Vec<(String, Value)>),
    /// Statement text: empty for the whole table, a clause fragment
    /// (`WHERE ...`, `ORDER BY ...`), or a complete read statement
    Sql {
        sql: String,
        params: Vec<(String, Value)>,
    },
}

impl BulkQuery {
    pub fn sql(sql: impl Into<String>) -> Self {
        BulkQuery::Sql {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params<K, V>(
        sql: impl Into<String>,
        params: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        BulkQuery::Sql {
            sql: sql.into(),
            params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<&str> for BulkQuery {
    fn from(sql: &str) -> Self {
        BulkQuery::sql(sql)
    }
}

impl From<String> for BulkQuery {
    fn from(sql: String) -> Self {
        BulkQuery::sql(sql)
    }
}

impl<K: Into<String>, V: Into<Value>> From<Vec<(K, V)>> for BulkQuery {
    fn from(pairs: Vec<(K, V)>) -> Self {
        BulkQuery::Columns(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<IndexMap<String, Value>> for BulkQuery {
    fn from(map: IndexMap<String, Value>) -> Self {
        BulkQuery::Columns(map.into_iter().collect())
    }
}

impl<T: RecordType> Record<T> {
    /// Run one read and return every matching row as a found record
    pub fn load_multiple(
        executor: Arc<dyn Executor>,
        query: impl Into<BulkQuery>,
    ) -> Result<Vec<Record<T>>> {
        Self::new(executor)?.fetch_all(query)
    }

    /// Like `load_multiple`, reusing this record's executor, dialect and options
    pub fn fetch_all(&mut self, query: impl Into<BulkQuery>) -> Result<Vec<Record<T>>> {
        let statement = self.bulk_statement(query.into())?;
        let result = self.run(&statement)?;
        debug!(table = T::table_name(), rows = result.rows.len(), "Bulk load finished");

        Ok(result
            .rows
            .into_iter()
            .map(|row| self.sibling(row))
            .collect())
    }

    fn bulk_statement(&mut self, query: BulkQuery) -> Result<Statement> {
        let table = T::table_name();
        match query {
            BulkQuery::Columns(pairs) => {
                let schema = self.ensure_schema()?;
                let lookup = lookup::column_lookup(&schema, &pairs)?;
                Ok(self.builder.select(table, &lookup, None))
            }
            BulkQuery::Sql { sql, params } => {
                let sql = sql.trim();
                if sql.is_empty() {
                    return Ok(self.builder.select(table, &LookupSet::new(), None));
                }

                let command = leading_keyword(sql);
                if WRITE_KEYWORDS.contains(&command.as_str()) {
                    return Err(RecordError::InvalidBulkQuery { command });
                }
                if FRAGMENT_KEYWORDS.contains(&command.as_str()) {
                    let mut statement = self.builder.select_with_fragment(table, sql);
                    statement.params = params;
                    return Ok(statement);
                }
                Ok(Statement::raw(sql, params))
            }
        }
    }
}

fn leading_keyword(sql: &str) -> String {
    sql.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}
