//! Unit tests for the initial schema migration.
//!
//! The migration runs against a mock connection; assertions inspect the DDL
//! it issues rather than a live database.
//!
//! Run with: cargo test --test schema_unit_test

use migration::{Migrator, MigratorTrait, SchemaManager};
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

#[tokio::test]
async fn identifier_columns_are_unbounded_text() {
    // up() issues six statements: three tables, three indexes
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results((0..6).map(|_| MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }))
        .into_connection();

    let manager = SchemaManager::new(&db);
    for migration in Migrator::migrations() {
        migration
            .up(&manager)
            .await
            .expect("migration should apply cleanly");
    }

    let log = format!("{:?}", db.into_transaction_log());
    assert!(log.contains(r#"\"uid\" text NOT NULL UNIQUE"#), "log: {log}");
    assert!(log.contains(r#"\"location\" text NOT NULL"#), "log: {log}");
    assert!(log.contains(r#"\"machine_name\" text NOT NULL"#), "log: {log}");
    assert!(log.contains(r#"\"owner\" text NOT NULL"#), "log: {log}");
    assert!(log.contains(r#"\"username\" text NOT NULL UNIQUE"#), "log: {log}");
    assert!(log.contains(r#"\"email\" text NOT NULL"#), "log: {log}");

    // Uids and usernames carry no server-side length cap
    assert!(!log.contains("varchar"), "log: {log}");
}
