#![cfg(feature = "sqlite")]

use sql_facade::prelude::*;
use sql_facade::test_utils::{RecordingProvider, TEST_TABLE_DDL, sqlite_memory};
use tempfile::tempdir;

fn foo_values(result: &mut SelectResult) -> Vec<RowValues> {
    let mut values = Vec::new();
    while let Some(row) = result.fetch_row() {
        values.push(row.get("foo").cloned().unwrap_or(RowValues::Null));
    }
    values
}

fn text(value: &str) -> RowValues {
    RowValues::Text(value.to_string())
}

#[test]
fn rollback_discards_changes_made_in_the_transaction() -> Result<(), Box<dyn std::error::Error>> {
    let mut sql = SqlFacade::new(sqlite_memory(TEST_TABLE_DDL)?);
    let none = NamedParams::new();

    sql.insert(
        "INSERT into testtable (foo) VALUES (:foo)",
        &named_params! { "foo" => "myFirstValue" },
        None,
    )?;

    let tx = sql.begin_transaction()?;
    assert!(sql.in_transaction());
    sql.insert(
        "INSERT into testtable (foo) VALUES (:foo)",
        &named_params! { "foo" => "mySecondValue" },
        Some(&tx),
    )?;
    sql.update(
        "UPDATE testtable SET foo = :foo WHERE id = :id",
        &named_params! { "foo" => "myUpdatedFirstValue", "id" => 1 },
        Some(&tx),
    )?;

    let mut within = sql.select("SELECT * FROM testtable", &none, Some(&tx))?;
    assert_eq!(within.row_count(), 2);
    assert_eq!(
        within.fetch_numeric(),
        Some(vec![RowValues::Int(1), text("myUpdatedFirstValue")])
    );
    assert_eq!(
        within.fetch_numeric(),
        Some(vec![RowValues::Int(2), text("mySecondValue")])
    );

    sql.rollback(&tx)?;
    assert!(!sql.in_transaction());

    let mut after = sql.select("SELECT * FROM testtable", &none, None)?;
    assert_eq!(after.row_count(), 1);
    assert_eq!(
        after.fetch_numeric(),
        Some(vec![RowValues::Int(1), text("myFirstValue")])
    );
    Ok(())
}

#[test]
fn commit_keeps_changes_made_in_the_transaction() -> Result<(), Box<dyn std::error::Error>> {
    let mut sql = SqlFacade::new(sqlite_memory(TEST_TABLE_DDL)?);
    let none = NamedParams::new();
    let insert = PreparedQuery::new("INSERT into testtable (foo) VALUES (:foo)");

    sql.insert_prepared(&insert, &named_params! { "foo" => "myFirstValue" }, None)?;

    let tx = sql.begin_transaction()?;
    sql.insert_prepared(&insert, &named_params! { "foo" => "mySecondValue" }, Some(&tx))?;
    sql.update_prepared(
        &PreparedQuery::new("UPDATE testtable SET foo = :foo WHERE id = :id"),
        &named_params! { "foo" => "myUpdatedFirstValue", "id" => 1 },
        Some(&tx),
    )?;
    sql.commit(&tx)?;

    let mut after = sql.select("SELECT * FROM testtable ORDER BY id", &none, None)?;
    assert_eq!(after.row_count(), 2);
    assert_eq!(
        foo_values(&mut after),
        vec![text("myUpdatedFirstValue"), text("mySecondValue")]
    );
    Ok(())
}

#[test]
fn transaction_state_machine_rejects_misuse() -> Result<(), Box<dyn std::error::Error>> {
    let mut sql = SqlFacade::new(sqlite_memory(TEST_TABLE_DDL)?);
    let mut other = SqlFacade::new(sqlite_memory(TEST_TABLE_DDL)?);
    let none = NamedParams::new();
    let select = "SELECT * FROM testtable";

    let foreign = other.begin_transaction()?;
    assert!(matches!(
        sql.commit(&foreign),
        Err(SqlFacadeError::NoActiveTransaction)
    ));
    assert!(matches!(
        sql.rollback(&foreign),
        Err(SqlFacadeError::NoActiveTransaction)
    ));
    assert!(matches!(
        sql.select(select, &none, Some(&foreign)),
        Err(SqlFacadeError::UnexpectedTransactionArgument)
    ));

    let stale = sql.begin_transaction()?;
    assert!(matches!(
        sql.begin_transaction(),
        Err(SqlFacadeError::TransactionAlreadyActive)
    ));
    sql.commit(&stale)?;

    let current = sql.begin_transaction()?;
    assert_ne!(current, stale);
    assert!(matches!(
        sql.select(select, &none, None),
        Err(SqlFacadeError::MissingTransactionArgument)
    ));
    for token in [&stale, &foreign] {
        assert!(matches!(
            sql.select(select, &none, Some(token)),
            Err(SqlFacadeError::TransactionMismatch)
        ));
        assert!(matches!(
            sql.delete("DELETE FROM testtable", &none, Some(token)),
            Err(SqlFacadeError::TransactionMismatch)
        ));
        assert!(matches!(
            sql.commit(token),
            Err(SqlFacadeError::TransactionMismatch)
        ));
        assert!(matches!(
            sql.rollback(token),
            Err(SqlFacadeError::TransactionMismatch)
        ));
    }
    assert!(sql.in_transaction());
    sql.rollback(&current)?;
    other.rollback(&foreign)?;
    Ok(())
}

#[test]
fn execution_failure_inside_transaction_does_not_roll_back() -> Result<(), Box<dyn std::error::Error>>
{
    let provider = RecordingProvider::new(sqlite_memory(TEST_TABLE_DDL)?);
    let log = provider.log();
    let mut sql = SqlFacade::new(provider);
    let none = NamedParams::new();

    let tx = sql.begin_transaction()?;
    sql.insert(
        "INSERT INTO testtable (foo) VALUES (:foo)",
        &named_params! { "foo" => "kept" },
        Some(&tx),
    )?;
    let err = sql
        .insert(
            "INSERT INTO testtable (id, foo) VALUES (:id, :foo)",
            &named_params! { "id" => 1, "foo" => "duplicate" },
            Some(&tx),
        )
        .unwrap_err();
    assert!(matches!(err, SqlFacadeError::SqliteError(_)), "{err}");
    assert!(err.is_execution());

    assert!(sql.in_transaction());
    assert_eq!(log.rollbacks(), 0);
    let rows = sql.select("SELECT * FROM testtable", &none, Some(&tx))?;
    assert_eq!(rows.row_count(), 1);

    sql.rollback(&tx)?;
    assert_eq!(log.begins(), 1);
    assert_eq!(log.rollbacks(), 1);
    assert_eq!(log.commits(), 0);
    Ok(())
}

#[test]
fn uncommitted_changes_are_invisible_to_other_connections() -> Result<(), Box<dyn std::error::Error>>
{
    let dir = tempdir()?;
    let path = dir.path().join("isolation.db");
    let options = SqliteOptions::builder(path.to_string_lossy())
        .busy_timeout_ms(5000)
        .init_batch(
            "CREATE TABLE IF NOT EXISTS testtable (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                foo VARCHAR(80) NULL
            );",
        )
        .finish();
    let none = NamedParams::new();
    let all_rows = "SELECT * FROM testtable";

    let mut writer = SqlFacade::new(SqliteProvider::new(options.clone())?);
    let mut reader = SqlFacade::new(SqliteProvider::new(options)?);

    writer.insert(
        "INSERT INTO testtable (foo) VALUES (:foo)",
        &named_params! { "foo" => "before" },
        None,
    )?;
    assert_eq!(reader.select(all_rows, &none, None)?.row_count(), 1);

    let tx = writer.begin_transaction()?;
    writer.insert(
        "INSERT INTO testtable (foo) VALUES (:foo)",
        &named_params! { "foo" => "pending" },
        Some(&tx),
    )?;
    assert_eq!(writer.select(all_rows, &none, Some(&tx))?.row_count(), 2);
    assert_eq!(reader.select(all_rows, &none, None)?.row_count(), 1);

    writer.commit(&tx)?;
    assert_eq!(reader.select(all_rows, &none, None)?.row_count(), 2);
    Ok(())
}

#[test]
fn dropping_the_facade_rolls_back_an_open_transaction() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("drop.db");
    let options = SqliteOptions::builder(path.to_string_lossy())
        .init_batch(
            "CREATE TABLE IF NOT EXISTS testtable (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                foo VARCHAR(80) NULL
            );",
        )
        .finish();

    let provider = RecordingProvider::new(SqliteProvider::new(options.clone())?);
    let log = provider.log();
    {
        let mut sql = SqlFacade::new(provider);
        let tx = sql.begin_transaction()?;
        sql.insert(
            "INSERT INTO testtable (foo) VALUES (:foo)",
            &named_params! { "foo" => "abandoned" },
            Some(&tx),
        )?;
    }
    assert_eq!(log.rollbacks(), 1);

    let mut sql = SqlFacade::new(SqliteProvider::new(options)?);
    let rows = sql.select("SELECT * FROM testtable", &NamedParams::new(), None)?;
    assert_eq!(rows.row_count(), 0);
    Ok(())
}
