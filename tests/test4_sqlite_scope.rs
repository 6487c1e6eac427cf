#![cfg(feature = "sqlite")]

use chrono::NaiveDate;
use sql_tx_scope::prelude::*;
use sql_tx_scope::sqlite::SqliteOptions;
use sql_tx_scope::{NumericalPrecisionPolicy, TxBehavior};
use tempfile::TempDir;

fn temp_db_path(dir: &TempDir) -> String {
    dir.path().join("scope.db").to_string_lossy().into_owned()
}

fn open_with_table(path: &str) -> Result<SqliteDatabase, SqlTxError> {
    let db = SqliteDatabase::open(SqliteOptions::new(path.to_owned()))?;
    db.with_connection(|conn| {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS t (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL DEFAULT 'x',
                score REAL
            );",
        )?;
        Ok(())
    })?;
    Ok(db)
}

fn count_rows(db: &SqliteDatabase) -> Result<i64, SqlTxError> {
    db.with_connection(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))?))
}

#[test]
fn syntax_error_reports_statement_and_engine_text() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_with_table(&temp_db_path(&dir))?;
    let scope = TransactionScope::new(&db)?;
    let mut query = scope.query();
    let err = query.exec("SELEKT * FROM t").expect_err("statement should fail");
    match &err {
        SqlTxError::QueryError(failure) => {
            assert_eq!(failure.statement_text(), "SELEKT * FROM t");
            assert!(failure.message().contains("syntax error"), "{failure}");
            assert!(failure.message().contains("SELEKT"), "{failure}");
            assert!(!failure.code().is_empty());
        }
        other => panic!("expected QueryError, got {other:?}"),
    }
    Ok(())
}

#[test]
fn committed_rows_persist() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = temp_db_path(&dir);
    {
        let db = open_with_table(&path)?;
        let mut scope = TransactionScope::new(&db)?;
        {
            let mut query = scope.query();
            query.exec("INSERT INTO t (id, name) VALUES (1, 'one')")?;
            assert_eq!(query.num_rows_affected(), 1);
        }
        scope.commit()?;
    }
    let reopened = open_with_table(&path)?;
    assert_eq!(count_rows(&reopened)?, 1);
    Ok(())
}

#[test]
fn abandoned_rows_are_rolled_back() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = temp_db_path(&dir);
    let db = open_with_table(&path)?;
    {
        let scope = TransactionScope::new(&db)?;
        let mut query = scope.query();
        query.exec("INSERT INTO t (id, name) VALUES (1, 'one')")?;
    }
    assert_eq!(count_rows(&db)?, 0);
    drop(db);

    let reopened = open_with_table(&path)?;
    assert_eq!(count_rows(&reopened)?, 0);
    Ok(())
}

#[test]
fn failed_statement_leaves_scope_to_roll_back() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_with_table(&temp_db_path(&dir))?;
    let result = with_transaction(&db, |scope| -> Result<(), SqlTxError> {
        let mut query = scope.query();
        query.exec("INSERT INTO t (id, name) VALUES (1, 'one')")?;
        query.exec("INSERT INTO t (id, name) VALUES (1, 'duplicate')")?;
        Ok(())
    });
    let err = result.expect_err("duplicate key should fail");
    let failure = err.statement_failure().expect("statement payload");
    assert!(failure.message().contains("UNIQUE"), "{failure}");
    assert_eq!(count_rows(&db)?, 0);
    Ok(())
}

#[test]
fn with_transaction_commits_on_ok() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_with_table(&temp_db_path(&dir))?;
    let inserted = with_transaction(&db, |scope| -> Result<i64, SqlTxError> {
        let mut query = scope.query();
        query.exec("INSERT INTO t (id, name) VALUES (1, 'one')")?;
        query.exec("INSERT INTO t (id, name) VALUES (2, 'two')")?;
        Ok(2)
    })?;
    assert_eq!(inserted, 2);
    assert_eq!(count_rows(&db)?, 2);
    Ok(())
}

#[test]
fn navigation_over_select_results() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_with_table(&temp_db_path(&dir))?;
    let scope = TransactionScope::new(&db)?;
    let mut query = scope.query();
    query.exec(
        "INSERT INTO t (id, name, score) VALUES (1, 'a', 1.5), (2, 'b', NULL), (3, 'c', 3.0)",
    )?;
    query.exec("SELECT id, name, score FROM t ORDER BY id")?;
    assert!(query.is_select());
    assert_eq!(query.size(), 3);

    let mut ids = Vec::new();
    while query.next()? {
        ids.push(*query.value(0).as_int().expect("integer id"));
    }
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(!query.is_valid());

    assert!(query.previous()?);
    assert_eq!(query.value_by_name("name"), RowValues::Text("c".into()));
    assert!(query.seek(1, false)?);
    assert!(query.is_null(2));
    assert!(query.seek(-1, true)?);
    assert_eq!(query.value(2), RowValues::Float(1.5));
    assert!(!query.seek(10, false)?);
    assert!(query.first()?);
    assert_eq!(query.record().get("name"), Some(&RowValues::Text("a".into())));
    assert!(query.last()?);
    assert_eq!(query.at(), 2);
    Ok(())
}

#[test]
fn forward_only_refuses_to_move_back() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_with_table(&temp_db_path(&dir))?;
    let scope = TransactionScope::new(&db)?;
    let mut query = scope.query();
    query.set_forward_only(true);
    query.exec("INSERT INTO t (id, name) VALUES (1, 'a'), (2, 'b')")?;
    query.exec("SELECT id FROM t ORDER BY id")?;
    assert!(query.next()?);
    assert!(query.next()?);
    assert!(!query.previous()?);
    assert!(!query.seek(0, false)?);
    assert_eq!(query.at(), 1);
    Ok(())
}

#[test]
fn prepared_statements_bind_positional_and_named() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_with_table(&temp_db_path(&dir))?;
    let mut scope = TransactionScope::new(&db)?;
    {
        let mut query = scope.query();
        query.prepare("INSERT INTO t (id, name, score) VALUES (?, ?, ?)")?;
        query.add_bind_value(10);
        query.add_bind_value("ten");
        query.add_bind_value(Option::<f64>::None);
        query.exec_prepared()?;
        assert_eq!(query.last_insert_id(), RowValues::Int(10));
        assert_eq!(query.num_rows_affected(), 1);

        query.prepare("INSERT INTO t (id, name) VALUES (:id, :name)")?;
        query.bind_value_named("id", 11);
        query.bind_value_named(":name", "eleven");
        assert_eq!(query.bound_value_named("id"), Some(&RowValues::Int(11)));
        query.exec_prepared()?;

        query.prepare("SELECT name FROM t WHERE id = ?")?;
        query.bind_value(0, 11);
        query.exec_prepared()?;
        assert!(query.next()?);
        assert_eq!(query.value(0), RowValues::Text("eleven".into()));
    }
    scope.commit()?;
    assert_eq!(count_rows(&db)?, 2);
    Ok(())
}

#[test]
fn named_and_positional_bindings_mix() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_with_table(&temp_db_path(&dir))?;
    let scope = TransactionScope::new(&db)?;
    let mut query = scope.query();
    query.prepare("SELECT :a, ?")?;
    query.bind_value_named(":a", 10);
    query.bind_value(0, 20);
    assert_eq!(query.bound_value_named(":a"), Some(&RowValues::Int(10)));
    assert_eq!(query.bound_value(0), Some(&RowValues::Int(20)));

    query.exec_prepared()?;
    assert!(query.next()?);
    assert_eq!(query.value(0), RowValues::Int(10));
    assert_eq!(query.value(1), RowValues::Int(20));
    Ok(())
}

#[test]
fn fetch_after_connection_closed_raises() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_with_table(&temp_db_path(&dir))?;
    db.with_connection(|conn| {
        conn.execute_batch("INSERT INTO t (id, name) VALUES (1, 'one'), (2, 'two');")?;
        Ok(())
    })?;

    let scope = TransactionScope::new(&db)?;
    let mut query = scope.query();
    query.exec("SELECT id, name FROM t ORDER BY id")?;
    assert_eq!(query.size(), 2);
    db.close()?;

    let err = query.next().expect_err("connection is gone");
    let failure = err.statement_failure().expect("statement payload");
    assert_eq!(failure.statement_text(), "SELECT id, name FROM t ORDER BY id");
    assert_eq!(failure.error().kind(), ErrorKind::ConnectionError);

    let native = db.native_driver();
    let mut cursor = native.create_result();
    cursor.set_active(true);
    cursor.set_select(true);
    assert!(!cursor.fetch(0)?);
    assert_eq!(cursor.last_error().kind(), ErrorKind::ConnectionError);
    Ok(())
}

#[test]
fn prepare_failure_raises() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_with_table(&temp_db_path(&dir))?;
    let scope = TransactionScope::new(&db)?;
    let mut query = scope.query();
    let err = query
        .prepare("INSERT INTO missing VALUES (?)")
        .expect_err("unknown table");
    let failure = err.statement_failure().expect("statement payload");
    assert_eq!(failure.statement_text(), "INSERT INTO missing VALUES (?)");
    assert!(failure.message().contains("no such table"), "{failure}");
    Ok(())
}

#[test]
fn empty_statement_is_a_query_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_with_table(&temp_db_path(&dir))?;
    let scope = TransactionScope::new(&db)?;
    let mut query = scope.query();
    assert!(matches!(query.exec("   "), Err(SqlTxError::QueryError(_))));
    Ok(())
}

#[test]
fn batch_execution_unpacks_lists() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_with_table(&temp_db_path(&dir))?;
    let mut scope = TransactionScope::new(&db)?;
    {
        let mut query = scope.query();
        query.prepare("INSERT INTO t (id, name, score) VALUES (?, ?, ?)")?;
        query.add_bind_value(RowValues::List(vec![
            RowValues::Int(1),
            RowValues::Int(2),
            RowValues::Int(3),
        ]));
        query.add_bind_value(RowValues::List(vec!["a".into(), "b".into(), "c".into()]));
        query.add_bind_value(0.5);
        assert!(query.exec_batch(BatchExecutionMode::ValuesAsRows)?);
        assert_eq!(query.num_rows_affected(), 3);

        query.prepare("INSERT INTO t (id, name) VALUES (?, ?)")?;
        query.add_bind_value(RowValues::List(vec![RowValues::Int(4), RowValues::Int(5)]));
        query.add_bind_value(RowValues::List(vec!["d".into()]));
        let err = query
            .exec_batch(BatchExecutionMode::ValuesAsRows)
            .expect_err("list lengths differ");
        assert!(matches!(err, SqlTxError::QueryError(_)));
    }
    scope.commit()?;
    assert_eq!(count_rows(&db)?, 3);
    Ok(())
}

#[test]
fn values_round_trip_through_sqlite() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_with_table(&temp_db_path(&dir))?;
    db.with_connection(|conn| {
        conn.execute_batch("CREATE TABLE v (ts TEXT, data BLOB, flag INTEGER, ratio REAL)")?;
        Ok(())
    })?;
    let ts = NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_opt(12, 30, 0))
        .expect("valid timestamp");

    let scope = TransactionScope::new(&db)?;
    let mut query = scope.query();
    query.prepare("INSERT INTO v VALUES (?, ?, ?, ?)")?;
    query.add_bind_value(ts);
    query.add_bind_value(vec![0xde_u8, 0xad]);
    query.add_bind_value(true);
    query.add_bind_value(2.75);
    query.exec_prepared()?;

    query.exec("SELECT ts, data, flag, ratio FROM v")?;
    assert!(query.next()?);
    assert_eq!(query.value(0).as_timestamp(), Some(ts));
    assert_eq!(query.value(1).as_blob(), Some(&[0xde_u8, 0xad][..]));
    assert_eq!(query.value(2), RowValues::Int(1));
    assert_eq!(query.value(3), RowValues::Float(2.75));

    query.set_numerical_precision_policy(NumericalPrecisionPolicy::LowPrecisionInt64);
    query.exec("SELECT ratio FROM v")?;
    assert!(query.next()?);
    assert_eq!(query.value(0), RowValues::Int(2));
    Ok(())
}

#[test]
fn schema_introspection_through_scope() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_with_table(&temp_db_path(&dir))?;
    let scope = TransactionScope::new(&db)?;
    let driver = scope.driver();

    assert_eq!(driver.tables(TableType::Tables), vec!["t".to_owned()]);
    assert!(driver.tables(TableType::SystemTables).contains(&"sqlite_master".to_owned()));

    let record = driver.record("t");
    assert_eq!(record.field_names(), vec!["id", "name", "score"]);
    let id = record.field(0).expect("id field");
    assert!(id.is_auto_value());
    let name = record.field(1).expect("name field");
    assert_eq!(name.required(), Some(true));
    assert_eq!(name.type_name(), "TEXT");

    let index = driver.primary_index("\"t\"");
    assert_eq!(index.record().field_names(), vec!["id"]);
    assert_eq!(
        driver.escape_identifier("we\"ird", sql_tx_scope::IdentifierType::FieldName),
        "\"we\"\"ird\""
    );
    Ok(())
}

#[test]
fn native_cursor_reports_failure_as_false() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_with_table(&temp_db_path(&dir))?;
    let mut query = Query::new(db.native_driver().create_result());
    assert!(!query.exec("SELEKT * FROM t")?);
    assert!(query.last_error().is_valid());
    assert_eq!(query.last_error().kind(), ErrorKind::StatementError);
    Ok(())
}

#[test]
fn closed_connection_cannot_begin() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = open_with_table(&temp_db_path(&dir))?;
    db.close()?;
    assert!(!db.is_open());
    let err = TransactionScope::new(&db).err().expect("closed connection");
    assert!(matches!(err, SqlTxError::TransactionError(_)));

    db.reopen()?;
    let mut scope = TransactionScope::new(&db)?;
    scope.commit()?;
    Ok(())
}

#[test]
fn busy_database_refuses_second_writer() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = temp_db_path(&dir);
    drop(open_with_table(&path)?);

    let options = SqliteDatabase::builder(path)
        .busy_timeout_ms(0)
        .behavior(TxBehavior::Immediate)
        .finish();
    let first = SqliteDatabase::open(options.clone())?;
    let second = SqliteDatabase::open(options)?;

    let _held = TransactionScope::new(&first)?;
    let err = TransactionScope::new(&second).err().expect("database is locked");
    let failure = err.statement_failure().expect("statement payload");
    assert_eq!(failure.statement_text(), "BEGIN");
    assert_eq!(failure.code(), "5");
    Ok(())
}
