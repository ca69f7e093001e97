//! Replication against a live PostgreSQL server
//!
//! Run with `cargo test --features integration_tests`. Connection settings
//! come from `SCHEMA_MIRROR_TEST_HOST`, `_PORT`, `_DATABASE`, `_USER` and
//! `_PASSWORD` (defaults: localhost:5432, postgres/postgres). Each test works
//! in its own pair of schemas, which it recreates on start.
#![cfg(feature = "integration_tests")]

use pretty_assertions::assert_eq;
use std::env;
use std::time::Duration;

use schema_mirror::error::{ApplyPhase, Error, SchemaSide};
use schema_mirror::schema::ForeignKey;
use schema_mirror::{
    ConnectionParams, DatabaseConnection, FixedAnswer, NoProgress, ReplicationOutcome, Replicator,
    SchemaAnalyzer, SchemaDiff, SchemaSource, SqlExecutor,
};

fn params(schema: &str) -> ConnectionParams {
    let var = |name: &str, default: &str| env::var(format!("SCHEMA_MIRROR_TEST_{}", name)).unwrap_or_else(|_| default.to_string());

    ConnectionParams {
        host: var("HOST", "localhost"),
        port: var("PORT", "5432").parse().expect("SCHEMA_MIRROR_TEST_PORT must be a port"),
        database: var("DATABASE", "postgres"),
        user: var("USER", "postgres"),
        password: Some(var("PASSWORD", "postgres")),
        schema: Some(schema.to_string()),
    }
}

async fn connect(schema: &str, side: SchemaSide) -> DatabaseConnection {
    let connection = DatabaseConnection::connect(&params(schema), Duration::from_secs(5), side)
        .await
        .expect("test database must be reachable");

    sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema))
        .execute(connection.pool())
        .await
        .unwrap();
    sqlx::query(&format!("CREATE SCHEMA {}", schema))
        .execute(connection.pool())
        .await
        .unwrap();

    connection
}

async fn run_sql(connection: &DatabaseConnection, statements: &[&str]) {
    for sql in statements {
        sqlx::query(sql).execute(connection.pool()).await.unwrap();
    }
}

const SHOP: &[&str] = &[
    "CREATE TABLE users (id int NOT NULL PRIMARY KEY, name text, tags text[])",
    "CREATE TABLE orders (id int NOT NULL PRIMARY KEY, user_id int NOT NULL REFERENCES users(id), note varchar(200) DEFAULT 'none')",
    "CREATE TABLE empty_table ()",
];

async fn replace(source: &DatabaseConnection, target: &DatabaseConnection) -> schema_mirror::Result<ReplicationOutcome> {
    Replicator::new(FixedAnswer(true), NoProgress)
        .run(
            &SchemaAnalyzer::new(source.clone()),
            &SchemaAnalyzer::new(target.clone()),
            &SqlExecutor::new(target.clone()),
        )
        .await
}

#[tokio::test]
async fn round_trip_reproduces_shape_and_keys() {
    let source = connect("mirror_rt_src", SchemaSide::Source).await;
    let target = connect("mirror_rt_dst", SchemaSide::Target).await;
    run_sql(&source, SHOP).await;
    run_sql(&target, &["CREATE TABLE leftover (id int)"]).await;

    let outcome = replace(&source, &target).await.unwrap();
    assert!(matches!(outcome, ReplicationOutcome::Committed(_)));

    let expected = SchemaAnalyzer::new(source.clone()).read_schema(true).await.unwrap();
    let actual = SchemaAnalyzer::new(target.clone()).read_schema(true).await.unwrap();

    assert!(actual.table("leftover").is_none());
    assert_eq!(actual.table_names().collect::<Vec<_>>(), expected.table_names().collect::<Vec<_>>());
    for (name, table) in &expected.tables {
        let copy = actual.table(name).unwrap();
        assert_eq!(copy.primary_key_column, table.primary_key_column);
        assert_eq!(copy.foreign_keys, table.foreign_keys);

        let shape = |t: &schema_mirror::schema::Table| {
            t.columns
                .iter()
                .map(|c| (c.name.clone(), c.data_type.clone(), c.nullable))
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(copy), shape(table));
    }

    let users = actual.table("users").unwrap();
    assert_eq!(users.column("tags").unwrap().data_type, "text[]");
    assert!(actual.table("empty_table").unwrap().columns.is_empty());
}

#[tokio::test]
async fn second_run_yields_same_target() {
    let source = connect("mirror_idem_src", SchemaSide::Source).await;
    let target = connect("mirror_idem_dst", SchemaSide::Target).await;
    run_sql(&source, SHOP).await;

    replace(&source, &target).await.unwrap();
    let first = SchemaAnalyzer::new(target.clone()).read_schema(true).await.unwrap();

    replace(&source, &target).await.unwrap();
    let second = SchemaAnalyzer::new(target.clone()).read_schema(true).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn failing_statement_rolls_everything_back() {
    let source = connect("mirror_atom_src", SchemaSide::Source).await;
    let target = connect("mirror_atom_dst", SchemaSide::Target).await;
    run_sql(&source, SHOP).await;
    // Enum columns surface as USER-DEFINED, which the target cannot create,
    // so `weights` fails after the drops and earlier creates have run.
    run_sql(
        &source,
        &["CREATE TYPE unit AS ENUM ('g', 'kg')", "CREATE TABLE weights (id int NOT NULL, amount unit)"],
    )
    .await;
    run_sql(&target, &["CREATE TABLE keep_me (id int NOT NULL PRIMARY KEY)"]).await;

    let before = SchemaAnalyzer::new(target.clone()).read_schema(true).await.unwrap();

    let err = replace(&source, &target).await.unwrap_err();
    assert!(
        matches!(err, Error::ApplyError { phase: ApplyPhase::Create, ref table, .. } if table == "weights"),
        "unexpected error: {err}"
    );

    let after = SchemaAnalyzer::new(target.clone()).read_schema(true).await.unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn same_named_foreign_keys_keep_their_own_targets() {
    let source = connect("mirror_fkname_src", SchemaSide::Source).await;
    let target = connect("mirror_fkname_dst", SchemaSide::Target).await;
    run_sql(
        &source,
        &[
            "CREATE TABLE users (id int NOT NULL PRIMARY KEY)",
            "CREATE TABLE accounts (id int NOT NULL PRIMARY KEY)",
            "CREATE TABLE orders (id int NOT NULL PRIMARY KEY, owner int CONSTRAINT fk_owner REFERENCES users(id))",
            "CREATE TABLE invoices (id int NOT NULL PRIMARY KEY, owner int CONSTRAINT fk_owner REFERENCES accounts(id))",
        ],
    )
    .await;

    let read = SchemaAnalyzer::new(source.clone()).read_schema(true).await.unwrap();
    assert_eq!(read.table("orders").unwrap().foreign_keys, vec![ForeignKey::new("owner", "users", "id")]);
    assert_eq!(read.table("invoices").unwrap().foreign_keys, vec![ForeignKey::new("owner", "accounts", "id")]);

    replace(&source, &target).await.unwrap();

    let copied = SchemaAnalyzer::new(target.clone()).read_schema(true).await.unwrap();
    assert_eq!(copied.table("orders").unwrap().foreign_keys, vec![ForeignKey::new("owner", "users", "id")]);
    assert_eq!(copied.table("invoices").unwrap().foreign_keys, vec![ForeignKey::new("owner", "accounts", "id")]);
}

const READER_ROLE: &str = "mirror_reader";

#[tokio::test]
async fn read_only_role_sees_keys_of_tables_it_does_not_own() {
    let owner = connect("mirror_ro_src", SchemaSide::Source).await;
    run_sql(
        &owner,
        &[
            "CREATE TABLE users (id int NOT NULL PRIMARY KEY)",
            "CREATE TABLE orders (id int NOT NULL PRIMARY KEY, user_id int REFERENCES users(id))",
        ],
    )
    .await;
    sqlx::query(&format!(
        "DO $$ BEGIN IF NOT EXISTS (SELECT FROM pg_roles WHERE rolname = '{role}') \
         THEN CREATE ROLE {role} LOGIN PASSWORD '{role}'; END IF; END $$",
        role = READER_ROLE
    ))
    .execute(owner.pool())
    .await
    .unwrap();
    let grant_usage = format!("GRANT USAGE ON SCHEMA mirror_ro_src TO {}", READER_ROLE);
    let grant_select = format!("GRANT SELECT ON ALL TABLES IN SCHEMA mirror_ro_src TO {}", READER_ROLE);
    run_sql(&owner, &[grant_usage.as_str(), grant_select.as_str()]).await;

    let mut reader_params = params("mirror_ro_src");
    reader_params.user = READER_ROLE.to_string();
    reader_params.password = Some(READER_ROLE.to_string());
    let reader = DatabaseConnection::connect(&reader_params, Duration::from_secs(5), SchemaSide::Source)
        .await
        .unwrap();

    let schema = SchemaAnalyzer::new(reader.clone()).read_schema(true).await.unwrap();
    reader.close().await;

    let users = schema.table("users").unwrap();
    assert_eq!(users.primary_key_column.as_deref(), Some("id"));
    assert!(users.foreign_keys.is_empty());

    let orders = schema.table("orders").unwrap();
    assert_eq!(orders.primary_key_column.as_deref(), Some("id"));
    assert_eq!(orders.foreign_keys, vec![ForeignKey::new("user_id", "users", "id")]);
}

#[tokio::test]
async fn diff_compares_table_names() {
    let source = connect("mirror_diff_src", SchemaSide::Source).await;
    let target = connect("mirror_diff_dst", SchemaSide::Target).await;
    run_sql(&source, &["CREATE TABLE shared (id int)", "CREATE TABLE fresh (id int)"]).await;
    run_sql(&target, &["CREATE TABLE shared (id text)", "CREATE TABLE stale (id int)"]).await;

    let diff = SchemaDiff::compare(
        &SchemaAnalyzer::new(source.clone()).read_schema(false).await.unwrap(),
        &SchemaAnalyzer::new(target.clone()).read_schema(false).await.unwrap(),
    );

    assert_eq!(diff.new_tables, vec!["fresh"]);
    assert_eq!(diff.removed_tables, vec!["stale"]);
}

#[tokio::test]
async fn unreachable_host_fails_fast() {
    let mut unreachable = params("public");
    unreachable.host = "10.255.255.1".to_string();

    let started = std::time::Instant::now();
    let err = DatabaseConnection::connect(&unreachable, Duration::from_secs(1), SchemaSide::Target)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ConnectionError { side: SchemaSide::Target, .. }));
    assert!(started.elapsed() < Duration::from_secs(10));
}
