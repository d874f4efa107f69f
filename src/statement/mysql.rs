//! MySQL dialect
//!
//! ```text
//! SELECT * FROM members WHERE `member_id` = :Wmember_id
//! INSERT INTO members SET `email` = :Semail, `balance` = :Sbalance
//! UPDATE members SET `email` = :Semail WHERE `member_id` = :Wmember_id
//! DELETE FROM members WHERE `member_id` = :Wmember_id
//! ```

use super::{Statement, StatementBuilder, StatementKind, WriteSet, SET_PREFIX, WHERE_PREFIX};
use crate::lookup::LookupSet;
use crate::value::Value;

/// Builds MySQL statements with backtick-quoted columns and named placeholders
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlBuilder;

impl MySqlBuilder {
    pub fn new() -> Self {
        MySqlBuilder
    }

    /// Render `` `col` = :<prefix>col `` for each pair, binding as it goes
    fn equalities<'a>(
        statement: &mut Statement,
        prefix: char,
        pairs: impl Iterator<Item = (&'a String, &'a Value)>,
    ) -> Vec<String> {
        pairs
            .map(|(column, value)| {
                let placeholder = format!(":{prefix}{column}");
                let clause = format!("`{column}` = {placeholder}");
                statement.bind(placeholder, value.clone());
                clause
            })
            .collect()
    }

    fn push_where(statement: &mut Statement, lookup: &LookupSet) {
        if lookup.is_empty() {
            return;
        }
        let clauses = Self::equalities(statement, WHERE_PREFIX, lookup.iter());
        statement.sql.push_str(" WHERE ");
        statement.sql.push_str(&clauses.join(" AND "));
    }
}

impl StatementBuilder for MySqlBuilder {
    fn select(&self, table: &str, lookup: &LookupSet, limit: Option<u64>) -> Statement {
        let mut statement = Statement::new(StatementKind::Select, format!("SELECT * FROM {table}"));
        Self::push_where(&mut statement, lookup);
        if let Some(limit) = limit.filter(|l| *l > 0) {
            statement.sql.push_str(&format!(" LIMIT {limit}"));
        }
        statement
    }

    fn insert(&self, table: &str, write: &WriteSet, replace: bool) -> Statement {
        let (kind, verb) = if replace {
            (StatementKind::Replace, "REPLACE")
        } else {
            (StatementKind::Insert, "INSERT")
        };
        let mut statement = Statement::new(kind, format!("{verb} INTO {table} SET "));
        let set = Self::equalities(&mut statement, SET_PREFIX, write.iter());
        statement.sql.push_str(&set.join(", "));
        statement
    }

    fn update(&self, table: &str, write: &WriteSet, lookup: &LookupSet) -> Statement {
        let mut statement = Statement::new(StatementKind::Update, format!("UPDATE {table} SET "));
        // key columns stay as they are
        let set = Self::equalities(
            &mut statement,
            SET_PREFIX,
            write.iter().filter(|(column, _)| !lookup.contains_key(*column)),
        );
        statement.sql.push_str(&set.join(", "));
        Self::push_where(&mut statement, lookup);
        statement
    }

    fn delete(&self, table: &str, lookup: &LookupSet) -> Statement {
        let mut statement = Statement::new(StatementKind::Delete, format!("DELETE FROM {table}"));
        Self::push_where(&mut statement, lookup);
        statement
    }

    fn select_with_fragment(&self, table: &str, fragment: &str) -> Statement {
        Statement::new(StatementKind::Select, format!("SELECT * FROM {table} {fragment}"))
    }
}
