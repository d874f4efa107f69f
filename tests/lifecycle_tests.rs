//! Record lifecycle: existence transitions, field merging, write-back of
//! generated ids, and the short-circuits that issue no statement.

mod common;

use std::io;
use std::sync::Arc;

use common::{address_fields, row, Member, MemberAddress, ScriptedExecutor};
use parking_lot::Mutex;
use rowrecord::{
    ColumnDescriptor, Existence, Record, RecordConfig, RecordError, RecordType, Search,
    StatementKind, TableSchema, Value,
};
use serde_json::json;

// Helpers

fn member_row(id: i64, email: &str) -> rowrecord::Row {
    row(&[
        ("member_id", Value::from(id)),
        ("email", Value::from(email)),
        ("industry", Value::from(24)),
    ])
}

/// Shared buffer the capturing subscriber writes formatted events into
#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber recording WARN and above
fn capture_warnings<R>(f: impl FnOnce() -> R) -> (R, String) {
    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, log.contents())
}

/// Table without a primary key
struct AuditEntry;

impl RecordType for AuditEntry {
    fn table_name() -> &'static str {
        "audit_log"
    }

    fn seed_schema() -> Option<TableSchema> {
        let mut schema = TableSchema::new()
            .with_column(ColumnDescriptor::new("message", "text", false))
            .with_column(ColumnDescriptor::new("created", "datetime", false));
        schema.loaded = true;
        Some(schema)
    }
}

struct Nameless;

impl RecordType for Nameless {
    fn table_name() -> &'static str {
        ""
    }
}

// Loading

#[test]
fn test_load_found_merges_first_row() {
    let executor = ScriptedExecutor::new();
    executor.push_rows(vec![member_row(18, "chiper@chipersoft.com")]);

    let mut record = Record::<Member>::new(executor.clone()).unwrap();
    record.set_field("firstname", "Jarvis");
    assert_eq!(record.exists(), Existence::Unknown);

    assert!(record.load(18).unwrap());
    assert_eq!(record.exists(), Existence::Found);
    assert_eq!(record["email"], "chiper@chipersoft.com");
    assert_eq!(record["member_id"], Value::Int(18));
    assert_eq!(record["firstname"], "Jarvis");
    assert_eq!(record.last_match_count(), 1);
}

#[test]
fn test_load_not_found() {
    let executor = ScriptedExecutor::new();
    let mut record = Record::<Member>::new(executor.clone()).unwrap();

    assert!(!record.load(404).unwrap());
    assert_eq!(record.exists(), Existence::NotFound);
    assert!(record.fields().is_empty());
}

#[test]
fn test_load_multiple_rows_uses_first() {
    let executor = ScriptedExecutor::new();
    executor.push_rows(vec![
        member_row(1, "first@example.com"),
        member_row(2, "second@example.com"),
    ]);

    let mut record = Record::<Member>::new(executor.clone()).unwrap();
    let (found, log) = capture_warnings(|| record.load(("24", "industry")).unwrap());
    assert!(found);
    assert_eq!(record["email"], "first@example.com");
    assert_eq!(record.last_match_count(), 2);

    assert!(log.contains("WARN"), "{log}");
    assert!(log.contains("multiple matching rows"), "{log}");
    assert!(log.contains("rows=2"), "{log}");
}

#[test]
fn test_multiple_rows_notice_can_be_silenced() {
    let executor = ScriptedExecutor::new();
    executor.push_rows(vec![
        member_row(1, "first@example.com"),
        member_row(2, "second@example.com"),
    ]);

    let options = RecordConfig {
        notify_multiple_rows: false,
        ..RecordConfig::default()
    };
    let mut record = Record::<Member>::with_options(executor.clone(), options).unwrap();
    let (found, log) = capture_warnings(|| record.load(("24", "industry")).unwrap());

    assert!(found);
    assert_eq!(record.last_match_count(), 2);
    assert!(log.is_empty(), "{log}");
}

#[test]
fn test_single_row_load_is_silent() {
    let executor = ScriptedExecutor::new();
    executor.push_rows(vec![member_row(18, "chiper@chipersoft.com")]);

    let mut record = Record::<Member>::new(executor.clone()).unwrap();
    let (found, log) = capture_warnings(|| record.load(18).unwrap());
    assert!(found);
    assert!(log.is_empty(), "{log}");
}

#[test]
fn test_find_constructs_and_loads() {
    let executor = ScriptedExecutor::new();
    executor.push_rows(vec![member_row(18, "chiper@chipersoft.com")]);

    let record = Record::<Member>::find(executor.clone(), 18).unwrap();
    assert!(record.exists().is_found());
    assert_eq!(record["member_id"], Value::Int(18));
}

#[test]
fn test_load_using_query() {
    let executor = ScriptedExecutor::new();
    executor.push_rows(vec![member_row(7, "q@example.com")]);

    let mut record = Record::<Member>::new(executor.clone()).unwrap();
    let found = record
        .load_using_query(
            "SELECT * FROM members WHERE email = :email",
            vec![(":email".to_string(), Value::from("q@example.com"))],
        )
        .unwrap();

    assert!(found);
    assert_eq!(record["member_id"], Value::Int(7));
    assert_eq!(executor.last().kind, StatementKind::Raw);
}

#[test]
fn test_load_limit_option() {
    let executor = ScriptedExecutor::new();
    let options = RecordConfig {
        load_limit: 1,
        ..RecordConfig::default()
    };
    let mut record = Record::<Member>::with_options(executor.clone(), options).unwrap();
    record.load(18).unwrap();
    assert_eq!(
        executor.last().sql,
        "SELECT * FROM members WHERE `member_id` = :Wmember_id LIMIT 1"
    );
}

#[test]
fn test_load_without_keys_fails_before_statement() {
    let executor = ScriptedExecutor::new();
    let mut record = Record::<MemberAddress>::new(executor.clone()).unwrap();
    record.set_field("member_id", 36);

    let err = record.load(Search::Existing).unwrap_err();
    assert_eq!(err.code(), "MISSING_KEY");

    let err = record.load(36).unwrap_err();
    assert_eq!(err.code(), "MISSING_KEY");
    assert_eq!(executor.statement_count(), 0);
}

// Existence checks

#[test]
fn test_check_if_exists_with_incomplete_key_is_not_found() {
    let executor = ScriptedExecutor::new();
    let mut record = Record::<MemberAddress>::new(executor.clone()).unwrap();
    record.set_field("member_id", 36);

    assert!(!record.check_if_exists().unwrap());
    assert_eq!(record.exists(), Existence::NotFound);
    assert_eq!(executor.statement_count(), 0);
}

#[test]
fn test_check_if_exists_does_not_merge() {
    let executor = ScriptedExecutor::new();
    executor.push_rows(vec![row(&[("city", Value::from("Somewhere"))])]);

    let mut record = Record::<MemberAddress>::new(executor.clone()).unwrap();
    record.import(address_fields());
    assert!(record.check_if_exists().unwrap());
    assert_eq!(record.exists(), Existence::Found);
    assert_eq!(record["city"], "Washington DC");
}

// Writing

#[test]
fn test_insert_writes_back_generated_id() {
    let executor = ScriptedExecutor::new();
    executor.push_affected(1);
    executor.set_insert_id(41);

    let mut record = Record::<Member>::new(executor.clone()).unwrap();
    record.import([("email", "new@example.com"), ("username", "newbie")]);

    assert!(record.insert(false).unwrap());
    assert_eq!(record.exists(), Existence::Found);
    assert_eq!(record["member_id"], Value::Int(41));
}

#[test]
fn test_insert_without_auto_increment_leaves_keys() {
    let executor = ScriptedExecutor::new();
    executor.push_affected(1);
    executor.set_insert_id(99);

    let mut record = Record::<MemberAddress>::new(executor.clone()).unwrap();
    record.import(address_fields());
    assert!(record.insert(false).unwrap());
    assert_eq!(record["member_id"], Value::Int(36));
}

#[test]
fn test_failed_insert_keeps_state() {
    let executor = ScriptedExecutor::new();
    executor.push_affected(0);

    let mut record = Record::<MemberAddress>::new(executor.clone()).unwrap();
    record.import(address_fields());
    assert!(!record.insert(false).unwrap());
    assert_eq!(record.exists(), Existence::Unknown);
}

#[test]
fn test_invalid_field_blocks_write() {
    let executor = ScriptedExecutor::new();
    let mut record = Record::<MemberAddress>::new(executor.clone()).unwrap();
    record.import(address_fields());
    record.set_field("type", "Home");

    for result in [record.insert(false), record.update(), record.delete()] {
        assert_eq!(result.unwrap_err().code(), "INVALID_COLUMN_VALUE");
    }
    assert_eq!(executor.statement_count(), 0);
}

#[test]
fn test_null_in_required_column_rejected() {
    let executor = ScriptedExecutor::new();
    let mut record = Record::<Member>::new(executor.clone()).unwrap();
    record.import([("email", Value::Null), ("username", Value::from("x"))]);

    let err = record.insert(false).unwrap_err();
    assert!(err.to_string().contains("null"));
    assert_eq!(executor.statement_count(), 0);
}

#[test]
fn test_unparseable_date_rejected() {
    let executor = ScriptedExecutor::new();
    let mut record = Record::<Member>::new(executor.clone()).unwrap();
    record.import([("email", "a@b.c"), ("last_login", "next tuesday-ish")]);
    assert_eq!(record.insert(false).unwrap_err().code(), "INVALID_COLUMN_VALUE");
}

#[test]
fn test_empty_date_binds_zero_date() {
    let executor = ScriptedExecutor::new();
    let mut record = Record::<Member>::new(executor.clone()).unwrap();
    record.import([("email", "a@b.c"), ("last_login", "none")]);
    record.insert(false).unwrap();
    assert_eq!(
        executor.last().param(":Slast_login"),
        Some(&Value::from("0000-00-00 00:00:00"))
    );
}

#[test]
fn test_update_requires_complete_key() {
    let executor = ScriptedExecutor::new();
    let mut record = Record::<MemberAddress>::new(executor.clone()).unwrap();
    record.import([("member_id", Value::from(36)), ("city", Value::from("X"))]);

    let err = record.update().unwrap_err();
    assert!(matches!(err, RecordError::MissingKey { .. }));
    assert!(err.to_string().contains("absent: type"));
}

#[test]
fn test_update_with_only_keys_is_a_no_op() {
    let executor = ScriptedExecutor::new();
    let mut record = Record::<MemberAddress>::new(executor.clone()).unwrap();
    record.import([("member_id", Value::from(36)), ("type", Value::from("Billing"))]);

    assert!(!record.update().unwrap());
    assert_eq!(executor.statement_count(), 0);
}

#[test]
fn test_update_does_not_change_existence() {
    let executor = ScriptedExecutor::new();
    executor.push_affected(1);

    let mut record = Record::<MemberAddress>::new(executor.clone()).unwrap();
    record.import(address_fields());
    assert!(record.update().unwrap());
    assert_eq!(record.exists(), Existence::Unknown);
}

// Save

#[test]
fn test_save_branches_from_same_fields() {
    // row exists: SELECT then UPDATE
    let found = ScriptedExecutor::new();
    found.push_rows(vec![row(&[("member_id", Value::from(36))])]);
    found.push_affected(1);
    let mut record = Record::<MemberAddress>::new(found.clone()).unwrap();
    record.import(address_fields());
    assert!(record.save(false).unwrap());

    let kinds: Vec<StatementKind> = found.statements().iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![StatementKind::Select, StatementKind::Update]);
    assert_eq!(record.exists(), Existence::Found);

    // row missing: SELECT then INSERT
    let missing = ScriptedExecutor::new();
    missing.push_rows(Vec::new());
    missing.push_affected(1);
    let mut record = Record::<MemberAddress>::new(missing.clone()).unwrap();
    record.import(address_fields());
    assert!(record.save(false).unwrap());

    let kinds: Vec<StatementKind> = missing.statements().iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![StatementKind::Select, StatementKind::Insert]);
    assert_eq!(record.exists(), Existence::Found);
}

#[test]
fn test_save_new_member_without_key_skips_select() {
    let executor = ScriptedExecutor::new();
    executor.push_affected(1);
    executor.set_insert_id(5);

    let mut record = Record::<Member>::new(executor.clone()).unwrap();
    record.set_field("email", "fresh@example.com");
    assert!(record.save(false).unwrap());

    assert_eq!(executor.statement_count(), 1);
    assert_eq!(executor.last().kind, StatementKind::Insert);
    assert_eq!(record["member_id"], Value::Int(5));
}

// Set

#[test]
fn test_set_unknown_checks_then_updates() {
    let executor = ScriptedExecutor::new();
    executor.push_rows(vec![row(&[("member_id", Value::from(36))])]);
    executor.push_affected(1);

    let mut record = Record::<MemberAddress>::new(executor.clone()).unwrap();
    record.import(address_fields());
    assert!(record.set("zip", "92101").unwrap());

    let statements = executor.statements();
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[1].sql,
        "UPDATE member_addresses SET `zip` = :Szip WHERE `member_id` = :Wmember_id AND `type` = :Wtype"
    );
    assert_eq!(record["zip"], "92101");
}

#[test]
fn test_set_current_persists_existing_value() {
    let executor = ScriptedExecutor::new();
    let mut record = Record::<MemberAddress>::new(executor.clone()).unwrap();
    record.import(address_fields()).set_existence(Existence::Found);

    record.set_current("city").unwrap();
    assert_eq!(
        executor.last().params_json(),
        json!({":Scity": "Washington DC", ":Wmember_id": "36", ":Wtype": "Billing"})
    );

    record.set_current("state").unwrap();
    assert_eq!(executor.last().param(":Sstate"), Some(&Value::Null));
}

#[test]
fn test_set_rejects_invalid_value_when_found() {
    let executor = ScriptedExecutor::new();
    let mut record = Record::<MemberAddress>::new(executor.clone()).unwrap();
    record.import(address_fields()).set_existence(Existence::Found);

    let err = record.set("type", "Home").unwrap_err();
    assert_eq!(err.code(), "INVALID_COLUMN_VALUE");
    assert_eq!(executor.statement_count(), 0);
}

// Delete

#[test]
fn test_delete_marks_not_found() {
    let executor = ScriptedExecutor::new();
    executor.push_affected(1);

    let mut record = Record::<MemberAddress>::new(executor.clone()).unwrap();
    record.import(address_fields()).set_existence(Existence::Found);
    assert!(record.delete().unwrap());
    assert_eq!(record.exists(), Existence::NotFound);
}

#[test]
fn test_delete_nothing_keeps_state() {
    let executor = ScriptedExecutor::new();
    let mut record = Record::<MemberAddress>::new(executor.clone()).unwrap();
    record.import(address_fields()).set_existence(Existence::Found);
    assert!(!record.delete().unwrap());
    assert_eq!(record.exists(), Existence::Found);
}

// Tables without primary keys

#[test]
fn test_keyless_table() {
    let executor = ScriptedExecutor::new();
    let mut record = Record::<AuditEntry>::new(executor.clone()).unwrap();
    record.import([("message", "hello"), ("created", "2013-04-01 08:30:00")]);

    assert_eq!(record.load(Search::Existing).unwrap_err().code(), "MISSING_KEY");
    assert_eq!(record.load("hello").unwrap_err().code(), "MISSING_KEY");
    assert_eq!(record.update().unwrap_err().code(), "MISSING_KEY");
    assert_eq!(record.delete().unwrap_err().code(), "MISSING_KEY");
    assert!(!record.check_if_exists().unwrap());
    assert_eq!(executor.statement_count(), 0);

    // save falls through to a plain insert
    record.save(false).unwrap();
    assert_eq!(
        executor.last().sql,
        "INSERT INTO audit_log SET `message` = :Smessage, `created` = :Screated"
    );
}

// Errors

#[test]
fn test_missing_table_name() {
    let executor = ScriptedExecutor::new();
    let err = Record::<Nameless>::new(executor).unwrap_err();
    assert!(matches!(err, RecordError::SchemaDefinition(_)));
}

#[test]
fn test_executor_error_propagates() {
    let executor = ScriptedExecutor::new();
    executor.push_error("server has gone away");

    let mut record = Record::<Member>::new(executor.clone()).unwrap();
    let err = record.load(18).unwrap_err();
    assert_eq!(err.code(), "EXECUTOR");
    assert!(err.to_string().contains("server has gone away"));
    assert_eq!(record.exists(), Existence::Unknown);
}

// Field container

#[test]
fn test_import_export_filter_allow() {
    let executor = ScriptedExecutor::new();
    let mut record = Record::<MemberAddress>::new(executor).unwrap();
    record.import(address_fields());
    record.import([("city", "Boston"), ("zip", "02108")]);

    let keys: Vec<String> = record.export().keys().cloned().collect();
    assert_eq!(
        keys,
        vec!["member_id", "type", "address_1", "city", "fluke", "zip"]
    );
    assert_eq!(record["city"], "Boston");

    record.filter(&["fluke"]);
    assert!(record.get("fluke").is_none());

    record.allow(&["member_id", "type"]);
    assert_eq!(record.fields().len(), 2);

    assert!(record.has_field("member_id"));
    record.set_field("zip4", Value::Null);
    assert!(!record.has_field("zip4"));
    assert!(record["missing"].is_null());
    assert_eq!(record.remove_field("zip4"), Some(Value::Null));
}

#[test]
fn test_import_record_and_json() {
    let executor = ScriptedExecutor::new();
    let mut source = Record::<MemberAddress>::new(executor.clone()).unwrap();
    source.import(address_fields());

    let mut copy = Record::<MemberAddress>::new(executor.clone()).unwrap();
    copy.import_record(&source);
    assert_eq!(copy.export(), source.export());

    copy.import_json(json!({"city": "Austin", "zip": 78701})).unwrap();
    assert_eq!(copy["city"], "Austin");
    assert_eq!(copy["zip"], Value::Int(78701));

    let err = copy.import_json(json!([1, 2])).unwrap_err();
    assert_eq!(err.code(), "INVALID_COLUMN_VALUE");
}

// Bulk loading

#[test]
fn test_load_multiple_returns_found_records() {
    let executor = ScriptedExecutor::new();
    executor.push_rows(vec![
        member_row(1, "one@example.com"),
        member_row(2, "two@example.com"),
    ]);

    let members =
        Record::<Member>::load_multiple(executor.clone(), vec![("industry", 24)]).unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|m| m.exists().is_found()));
    assert_eq!(members[1]["email"], "two@example.com");
}

#[test]
fn test_load_multiple_with_no_rows() {
    let executor = ScriptedExecutor::new();
    let members = Record::<Member>::load_multiple(executor, "WHERE industry = 0").unwrap();
    assert!(members.is_empty());
}

#[test]
fn test_load_multiple_empty_columns_rejected() {
    let executor = ScriptedExecutor::new();
    let pairs: Vec<(String, Value)> = Vec::new();
    let err = Record::<Member>::load_multiple(executor, pairs).unwrap_err();
    assert_eq!(err.code(), "MISSING_KEY");
}
