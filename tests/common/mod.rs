//! Shared fixtures for integration tests: a scripted executor that records
//! every statement and replays queued results, plus record types seeded
//! from captured `DESCRIBE` output.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rowrecord::{
    DescribeRow, Executor, ExecutorError, QueryResult, RecordType, Row, Statement, TableSchema,
    Value,
};

pub const SINGLE_KEY_DESCRIBE: &str = include_str!("../fixtures/describe-singlekey.json");
pub const MULTI_KEY_DESCRIBE: &str = include_str!("../fixtures/describe-multikey.json");

pub fn describe_rows(json: &str) -> Vec<DescribeRow> {
    serde_json::from_str(json).expect("fixture is valid DESCRIBE json")
}

// Record types

/// `members`: single auto-increment primary key
pub struct Member;

impl RecordType for Member {
    fn table_name() -> &'static str {
        "members"
    }

    fn seed_schema() -> Option<TableSchema> {
        Some(TableSchema::from_describe(describe_rows(SINGLE_KEY_DESCRIBE)))
    }
}

/// `member_addresses`: composite primary key, no auto-increment
pub struct MemberAddress;

impl RecordType for MemberAddress {
    fn table_name() -> &'static str {
        "member_addresses"
    }

    fn seed_schema() -> Option<TableSchema> {
        Some(TableSchema::from_describe(describe_rows(MULTI_KEY_DESCRIBE)))
    }
}

/// Address fields, including one column the table does not declare
pub fn address_fields() -> Vec<(&'static str, Value)> {
    vec![
        ("member_id", Value::from(36)),
        ("type", Value::from("Billing")),
        ("address_1", Value::from("1600 Pennsylvania Ave")),
        ("city", Value::from("Washington DC")),
        ("fluke", Value::from("bad data")),
    ]
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

// Scripted executor

#[derive(Default)]
pub struct ScriptedExecutor {
    log: Mutex<Vec<Statement>>,
    results: Mutex<VecDeque<Result<QueryResult, String>>>,
    describes: Mutex<HashMap<String, Vec<DescribeRow>>>,
    describe_calls: AtomicUsize,
    insert_id: Mutex<Option<Value>>,
}

impl ScriptedExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(ScriptedExecutor::default())
    }

    /// Executor that answers `DESCRIBE table` with `rows`
    pub fn describing(table: &str, rows: Vec<DescribeRow>) -> Arc<Self> {
        let executor = ScriptedExecutor::default();
        executor.describes.lock().insert(table.to_string(), rows);
        Arc::new(executor)
    }

    /// Queue rows for the next read
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.results.lock().push_back(Ok(QueryResult::with_rows(rows)));
    }

    /// Queue an affected-row count for the next write
    pub fn push_affected(&self, count: u64) {
        self.results.lock().push_back(Ok(QueryResult::affected(count)));
    }

    /// Queue a failure for the next statement
    pub fn push_error(&self, message: &str) {
        self.results.lock().push_back(Err(message.to_string()));
    }

    pub fn set_insert_id(&self, id: impl Into<Value>) {
        *self.insert_id.lock() = Some(id.into());
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.log.lock().clone()
    }

    pub fn statement_count(&self) -> usize {
        self.log.lock().len()
    }

    pub fn last(&self) -> Statement {
        self.log
            .lock()
            .last()
            .cloned()
            .expect("at least one statement executed")
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }
}

impl Executor for ScriptedExecutor {
    fn execute(&self, statement: &Statement) -> Result<QueryResult, ExecutorError> {
        self.log.lock().push(statement.clone());
        match self.results.lock().pop_front() {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(message.into()),
            None => Ok(QueryResult::default()),
        }
    }

    fn last_insert_id(&self) -> Result<Option<Value>, ExecutorError> {
        Ok(self.insert_id.lock().clone())
    }

    fn describe(&self, table: &str) -> Result<Vec<DescribeRow>, ExecutorError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        self.describes
            .lock()
            .get(table)
            .cloned()
            .ok_or_else(|| format!("Table '{table}' doesn't exist").into())
    }
}

/// Bindings of a statement as `(placeholder, text)` pairs, in order
pub fn bindings(statement: &Statement) -> Vec<(String, String)> {
    statement
        .params
        .iter()
        .map(|(name, value)| (name.clone(), value.to_string()))
        .collect()
}

pub fn expected(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
