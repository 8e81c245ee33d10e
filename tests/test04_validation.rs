#![cfg(feature = "sqlite")]

use sql_facade::prelude::*;
use sql_facade::test_utils::{TEST_TABLE_DDL, recording_sqlite_memory};
use tempfile::tempdir;

const QUERIES: [(&str, QueryKind); 4] = [
    ("SELECT * FROM testtable", QueryKind::Select),
    ("INSERT INTO testtable (foo) VALUES ('x')", QueryKind::Insert),
    ("UPDATE testtable SET foo = 'y'", QueryKind::Update),
    ("DELETE FROM testtable", QueryKind::Delete),
];

/// Run `query` through the entry point for `kind`, inline or prepared, discarding the result.
fn run<P: ConnectionProvider>(
    sql: &mut SqlFacade<P>,
    kind: QueryKind,
    prepared: bool,
    query: &str,
) -> Result<(), SqlFacadeError> {
    let params = NamedParams::new();
    let handle = PreparedQuery::new(query);
    match (kind, prepared) {
        (QueryKind::Select, false) => sql.select(query, &params, None).map(drop),
        (QueryKind::Insert, false) => sql.insert(query, &params, None).map(drop),
        (QueryKind::Update, false) => sql.update(query, &params, None).map(drop),
        (QueryKind::Delete, false) => sql.delete(query, &params, None).map(drop),
        (QueryKind::Select, true) => sql.select_prepared(&handle, &params, None).map(drop),
        (QueryKind::Insert, true) => sql.insert_prepared(&handle, &params, None).map(drop),
        (QueryKind::Update, true) => sql.update_prepared(&handle, &params, None).map(drop),
        (QueryKind::Delete, true) => sql.delete_prepared(&handle, &params, None).map(drop),
    }
}

#[test]
fn wrong_kind_is_rejected_before_any_io() -> Result<(), Box<dyn std::error::Error>> {
    let provider = recording_sqlite_memory(TEST_TABLE_DDL)?;
    let log = provider.log();
    let mut sql = SqlFacade::new(provider);

    for (query, actual) in QUERIES {
        for (_, entry) in QUERIES {
            if entry == actual {
                continue;
            }
            for prepared in [false, true] {
                let err = run(&mut sql, entry, prepared, query).unwrap_err();
                assert!(
                    matches!(err, SqlFacadeError::WrongQueryKind { expected } if expected == entry),
                    "{entry} accepted {query}"
                );
                assert!(err.is_validation());
            }
        }
    }

    assert_eq!(log.connects(), 0);
    assert_eq!(log.executions(), 0);
    assert!(!sql.is_connected());
    Ok(())
}

#[test]
fn matching_kind_is_accepted_by_both_forms() -> Result<(), Box<dyn std::error::Error>> {
    let provider = recording_sqlite_memory(TEST_TABLE_DDL)?;
    let log = provider.log();
    let mut sql = SqlFacade::new(provider);

    for prepared in [false, true] {
        for (query, kind) in QUERIES {
            run(&mut sql, kind, prepared, query)?;
        }
    }
    assert_eq!(log.connects(), 1);
    assert_eq!(log.executions(), 8);
    assert_eq!(log.prepares(), 4);
    Ok(())
}

#[test]
fn queries_without_separator_or_with_leading_text_are_rejected() -> Result<(), Box<dyn std::error::Error>>
{
    let mut sql = SqlFacade::new(recording_sqlite_memory(TEST_TABLE_DDL)?);
    let none = NamedParams::new();
    for query in [
        " SELECT * FROM testtable",
        "SELECT*FROM testtable",
        "/* hint */ SELECT * FROM testtable",
        "",
    ] {
        assert!(matches!(
            sql.select(query, &none, None),
            Err(SqlFacadeError::WrongQueryKind {
                expected: QueryKind::Select
            })
        ));
    }
    Ok(())
}

#[test]
fn missing_parameters_are_rejected_before_any_io() -> Result<(), Box<dyn std::error::Error>> {
    let provider = recording_sqlite_memory(TEST_TABLE_DDL)?;
    let log = provider.log();
    let mut sql = SqlFacade::new(provider);

    let err = sql
        .delete(
            "DELETE FROM testtable WHERE id = :id",
            &named_params! { "ids" => 1 },
            None,
        )
        .unwrap_err();
    assert!(matches!(&err, SqlFacadeError::MissingParameter(name) if name == "id"));
    assert!(err.is_validation());

    // `:id` never stands in for `:identifier`
    let err = sql
        .select_prepared(
            &PreparedQuery::new("SELECT * FROM testtable WHERE id = :identifier"),
            &named_params! { "id" => 1 },
            None,
        )
        .unwrap_err();
    assert!(matches!(&err, SqlFacadeError::MissingParameter(name) if name == "identifier"));

    assert_eq!(log.connects(), 0);
    assert_eq!(sql.cached_statement_count(), 0);
    Ok(())
}

#[test]
fn transaction_argument_is_checked_before_any_io() -> Result<(), Box<dyn std::error::Error>> {
    let provider = recording_sqlite_memory(TEST_TABLE_DDL)?;
    let log = provider.log();
    let mut sql = SqlFacade::new(provider);

    let mut other = SqlFacade::new(recording_sqlite_memory(TEST_TABLE_DDL)?);
    let foreign = other.begin_transaction()?;

    let err = sql
        .insert_prepared(
            &PreparedQuery::new("INSERT INTO testtable (foo) VALUES (:foo)"),
            &named_params! { "foo" => "x" },
            Some(&foreign),
        )
        .unwrap_err();
    assert!(matches!(err, SqlFacadeError::UnexpectedTransactionArgument));
    assert_eq!(log.connects(), 0);
    other.rollback(&foreign)?;
    Ok(())
}

#[test]
fn blob_parameters_require_a_prepared_query() -> Result<(), Box<dyn std::error::Error>> {
    let provider = recording_sqlite_memory("CREATE TABLE files (id INTEGER PRIMARY KEY, data BLOB);")?;
    let log = provider.log();
    let mut sql = SqlFacade::new(provider);
    let params = named_params! { "data" => vec![1_u8, 2, 3] };

    let err = sql
        .insert("INSERT INTO files (data) VALUES (:data)", &params, None)
        .unwrap_err();
    assert!(matches!(err, SqlFacadeError::ParameterError(_)));
    assert!(err.is_validation());
    assert_eq!(log.connects(), 0);
    assert_eq!(log.executions(), 0);
    assert!(!sql.is_connected());

    let inserted = sql.insert_prepared(
        &PreparedQuery::new("INSERT INTO files (data) VALUES (:data)"),
        &params,
        None,
    )?;
    assert_eq!(inserted.affected_rows(), 1);
    assert_eq!(log.connects(), 1);
    Ok(())
}

#[test]
fn connection_failure_is_reported_as_execution_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("missing").join("nested").join("db.sqlite");
    let mut sql = SqlFacade::new(SqliteProvider::new(SqliteOptions::new(
        path.to_string_lossy(),
    ))?);

    let err = sql
        .select("SELECT 1 AS one", &NamedParams::new(), None)
        .unwrap_err();
    assert!(matches!(err, SqlFacadeError::ConnectionError(_)), "{err}");
    assert!(err.is_execution());
    assert!(!sql.is_connected());

    let err = sql.begin_transaction().unwrap_err();
    assert!(matches!(err, SqlFacadeError::ConnectionError(_)));
    assert!(!sql.in_transaction());
    Ok(())
}

#[test]
fn driver_errors_are_passed_through_unchanged() -> Result<(), Box<dyn std::error::Error>> {
    let mut sql = SqlFacade::new(recording_sqlite_memory(TEST_TABLE_DDL)?);
    let err = sql
        .update(
            "UPDATE no_such_table SET foo = :foo",
            &named_params! { "foo" => "x" },
            None,
        )
        .unwrap_err();
    match err {
        SqlFacadeError::SqliteError(inner) => {
            assert!(inner.to_string().contains("no_such_table"), "{inner}");
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}
