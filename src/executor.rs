//! Statement Execution Boundary
//!
//! Records never talk to a server themselves. They hand finished statements
//! to an `Executor`, which owns connections, transactions, retries and
//! timeouts.

use crate::error::ExecutorError;
use crate::schema::DescribeRow;
use crate::statement::Statement;
use crate::value::{Row, Value};

/// Outcome of one executed statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Rows changed by a write (or reported by the driver for a read)
    pub rows_affected: u64,
    /// Rows returned by a read, in server order
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// A read result
    pub fn with_rows(rows: Vec<Row>) -> Self {
        QueryResult {
            rows_affected: rows.len() as u64,
            rows,
        }
    }

    /// A write result
    pub fn affected(rows_affected: u64) -> Self {
        QueryResult {
            rows_affected,
            rows: Vec::new(),
        }
    }

    /// Matched rows for a read, changed rows for a write
    pub fn row_count(&self) -> u64 {
        if self.rows.is_empty() {
            self.rows_affected
        } else {
            self.rows.len() as u64
        }
    }

    /// A statement succeeded when it touched or returned at least one row
    pub fn is_success(&self) -> bool {
        self.row_count() > 0
    }
}

/// The external facility that runs statements.
///
/// Implementations must be shareable across threads; a record holds one
/// behind an `Arc` and issues at most one statement at a time.
pub trait Executor: Send + Sync {
    /// Prepare and run `statement` with its named bindings
    fn execute(&self, statement: &Statement) -> Result<QueryResult, ExecutorError>;

    /// Id generated by the most recent insert on this connection
    fn last_insert_id(&self) -> Result<Option<Value>, ExecutorError>;

    /// Column description of `table`, one row per column in declaration order
    fn describe(&self, table: &str) -> Result<Vec<DescribeRow>, ExecutorError>;
}
