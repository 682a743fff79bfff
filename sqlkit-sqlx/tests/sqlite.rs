//! End-to-end tests against in-memory SQLite.
//!
//! An in-memory database lives and dies with its connection, so every test
//! seeds and queries through one session.

use serde::{Deserialize, Serialize};
use sqlkit::{
    dialect, params, CacheConfig, ConnectionStrings, DataError, QueryOptions, Session, Value,
};
use sqlkit_cache::MemoryCache;
use sqlkit_sqlx::SqliteProvider;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Person {
    id: i64,
    name: String,
    score: Option<f64>,
}

fn provider() -> Arc<SqliteProvider> {
    let strings = ConnectionStrings::new().with("default", "sqlite::memory:");
    Arc::new(SqliteProvider::new(strings))
}

fn session() -> Session {
    Session::builder(provider(), Arc::new(dialect::Sqlite)).build()
}

async fn seed(session: &mut Session, rows: i64) {
    let opts = QueryOptions::new();
    session
        .execute(
            "CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score REAL)",
            &params! {},
            &opts,
        )
        .await
        .unwrap();
    for id in 1..=rows {
        session
            .execute(
                "INSERT INTO people (id, name, score) VALUES (:Id, :Name, :Score)",
                &params! {
                    "Id" => id,
                    "Name" => format!("person-{id}"),
                    "Score" => if id % 5 == 0 { None } else { Some(id as f64 / 2.0) },
                },
                &opts,
            )
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn typed_query_with_named_parameters() {
    let mut session = session();
    seed(&mut session, 5).await;

    let people: Vec<Person> = session
        .query(
            "SELECT id, name, score FROM people WHERE id > :Min ORDER BY id",
            &params! { "Min" => 3i64 },
            &QueryOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(people.len(), 2);
    assert_eq!(people[0].name, "person-4");
    assert_eq!(people[1].score, None);

    session.close().await.unwrap();
}

#[tokio::test]
async fn page_query_returns_the_requested_window() {
    let mut session = session();
    seed(&mut session, 25).await;

    let page = session
        .query_page::<Person>(
            "SELECT COUNT(*) FROM people",
            "SELECT id, name, score FROM people ORDER BY id LIMIT :Take OFFSET :Skip",
            2,
            10,
            &params! {},
            &QueryOptions::new(),
        )
        .await
        .unwrap();

    assert_eq!(page.total_count, 25);
    assert_eq!(page.page, 2);
    assert_eq!(page.total_pages, 3);
    let ids: Vec<i64> = page.contents.iter().map(|p| p.id).collect();
    assert_eq!(ids, (11..=20).collect::<Vec<_>>());

    session.close().await.unwrap();
}

#[tokio::test]
async fn overshooting_page_clamps_metadata_only() {
    let mut session = session();
    seed(&mut session, 25).await;

    let page = session
        .query_page::<Person>(
            "SELECT COUNT(*) FROM people",
            "SELECT id, name, score FROM people ORDER BY id LIMIT :Take OFFSET :Skip",
            5,
            10,
            &params! {},
            &QueryOptions::new(),
        )
        .await
        .unwrap();

    assert_eq!(page.total_pages, 3);
    assert_eq!(page.page, 3);
    assert!(page.contents.is_empty());

    session.close().await.unwrap();
}

#[tokio::test]
async fn zero_matches_reports_page_zero() {
    let mut session = session();
    seed(&mut session, 5).await;

    let page = session
        .query_page::<Person>(
            "SELECT COUNT(*) FROM people WHERE id > :Min",
            "SELECT id, name, score FROM people WHERE id > :Min ORDER BY id LIMIT :Take OFFSET :Skip",
            1,
            10,
            &params! { "Min" => 100i64 },
            &QueryOptions::new(),
        )
        .await
        .unwrap();

    assert_eq!(page.total_count, 0);
    assert_eq!(page.page, 0);
    assert_eq!(page.total_pages, 0);

    session.close().await.unwrap();
}

#[tokio::test]
async fn count_statement_may_carry_its_own_terminator() {
    let mut session = session();
    seed(&mut session, 3).await;

    let page = session
        .query_page_raw(
            "SELECT COUNT(*) FROM people;",
            "SELECT id FROM people ORDER BY id LIMIT :Take OFFSET :Skip",
            1,
            10,
            &params! {},
            &QueryOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(page.total_count, 3);
    assert_eq!(page.contents.len(), 3);

    session.close().await.unwrap();
}

#[tokio::test]
async fn invalid_page_arguments_are_rejected() {
    let mut session = session();
    let err = session
        .query_page::<Person>("SELECT COUNT(*) FROM people", "SELECT 1", 0, 10, &params! {}, &QueryOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::InvalidInput(_)));
}

#[tokio::test]
async fn transactions_commit_and_roll_back() {
    let mut session = session();
    seed(&mut session, 2).await;
    let opts = QueryOptions::new();

    session.begin_transaction().await.unwrap();
    session
        .execute(
            "INSERT INTO people (id, name) VALUES (:Id, :Name)",
            &params! { "Id" => 100i64, "Name" => "discarded" },
            &opts,
        )
        .await
        .unwrap();
    session.rollback_transaction().await.unwrap();

    let count: Option<i64> = session
        .query_scalar("SELECT COUNT(*) FROM people", &params! {}, &opts)
        .await
        .unwrap();
    assert_eq!(count, Some(2));

    session.begin_transaction().await.unwrap();
    session
        .execute(
            "INSERT INTO people (id, name) VALUES (:Id, :Name)",
            &params! { "Id" => 100i64, "Name" => "kept" },
            &opts,
        )
        .await
        .unwrap();
    session.commit_transaction().await.unwrap();

    let count: Option<i64> = session
        .query_scalar("SELECT COUNT(*) FROM people", &params! {}, &opts)
        .await
        .unwrap();
    assert_eq!(count, Some(3));

    session.close().await.unwrap();
}

#[tokio::test]
async fn cached_reads_survive_underlying_mutation() {
    let strings = ConnectionStrings::new().with("default", "sqlite::memory:");
    let mut session = Session::builder(
        Arc::new(SqliteProvider::new(strings)),
        Arc::new(dialect::Sqlite),
    )
    .cache(
        Arc::new(MemoryCache::new()),
        CacheConfig {
            all_methods_enable_cache: false,
            expire: None,
        },
    )
    .build();
    seed(&mut session, 3).await;

    let cached = QueryOptions::new().cached(true);
    let sql = "SELECT id, name, score FROM people ORDER BY id";
    let before: Vec<Person> = session.query(sql, &params! {}, &cached).await.unwrap();
    assert_eq!(before.len(), 3);

    session
        .execute("DELETE FROM people", &params! {}, &QueryOptions::new())
        .await
        .unwrap();

    // Same statement and parameters resolve to the stored entry.
    let after: Vec<Person> = session.query(sql, &params! {}, &cached).await.unwrap();
    assert_eq!(after, before);

    // Bypassing the cache shows the real state.
    let live: Vec<Person> = session
        .query(sql, &params! {}, &QueryOptions::new().cached(false))
        .await
        .unwrap();
    assert!(live.is_empty());

    session.close().await.unwrap();
}

#[tokio::test]
async fn execute_reports_affected_rows() {
    let mut session = session();
    seed(&mut session, 10).await;

    let affected = session
        .execute(
            "DELETE FROM people WHERE id <= :Max",
            &params! { "Max" => 4i64 },
            &QueryOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(affected, 4);

    session.close().await.unwrap();
}

#[tokio::test]
async fn multi_statement_batches_yield_one_set_each() {
    let mut session = session();
    seed(&mut session, 4).await;

    let sets = session
        .query_multiple(
            "SELECT COUNT(*) AS n FROM people;SELECT name FROM people WHERE id = :Id",
            &params! { "Id" => 2i64 },
            &QueryOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0][0].get("n"), Some(&Value::Int(4)));
    assert_eq!(
        sets[1][0].get("name"),
        Some(&Value::Text("person-2".to_string()))
    );

    session.close().await.unwrap();
}

#[tokio::test]
async fn untyped_rows_carry_blobs_and_nulls() {
    let mut session = session();
    let opts = QueryOptions::new();
    session
        .execute("CREATE TABLE files (name TEXT, body BLOB)", &params! {}, &opts)
        .await
        .unwrap();
    session
        .execute(
            "INSERT INTO files (name, body) VALUES (:Name, :Body)",
            &params! { "Name" => "a.bin", "Body" => vec![1u8, 2, 3] },
            &opts,
        )
        .await
        .unwrap();

    let rows = session
        .query_raw("SELECT name, body FROM files", &params! {}, &opts)
        .await
        .unwrap();
    assert_eq!(rows[0].get("body"), Some(&Value::Blob(vec![1, 2, 3])));

    // NULL columns decode to Value::Null regardless of declared type.
    let row = session
        .query_first_raw("SELECT NULL AS score", &params! {}, &opts)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get("score"), Some(&Value::Null));

    session.close().await.unwrap();
}

#[tokio::test]
async fn missing_connection_string_is_a_configuration_error() {
    let provider = Arc::new(SqliteProvider::new(ConnectionStrings::new()));
    let mut session = Session::builder(provider, Arc::new(dialect::Sqlite)).build();
    let err = session
        .query_raw("SELECT 1", &params! {}, &QueryOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::Configuration(_)));
}
