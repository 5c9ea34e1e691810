//! Tests for database initialization
//!
//! Covers automatic creation, reopening an existing file, idempotent schema
//! creation and the table constraints the attribution service relies on.

use leadtrail_common::db::init::{init_database, BUSY_TIMEOUT_MS};
use leadtrail_common::db::migrations::{get_schema_version, CURRENT_SCHEMA_VERSION};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("data").join("leadtrail.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("leadtrail.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_idempotent_initialization_keeps_data() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("leadtrail.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO leads (id, attribution_method, attribution_confidence, created_at) \
         VALUES ('lead-1', 'direct', 100, 0)",
    )
    .execute(&pool1)
    .await
    .unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads")
        .fetch_one(&pool2)
        .await
        .unwrap();

    assert_eq!(count, 1);
    assert_eq!(get_schema_version(&pool2).await.unwrap(), CURRENT_SCHEMA_VERSION);
}

#[tokio::test]
async fn test_wal_mode_enabled() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("leadtrail.db");

    let pool = init_database(&db_path).await.unwrap();
    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(mode.to_lowercase(), "wal");
}

#[tokio::test]
async fn test_busy_timeout_on_every_connection() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("leadtrail.db")).await.unwrap();

    // Hold two connections at once so both are checked, not one reused
    let mut first = pool.acquire().await.unwrap();
    let mut second = pool.acquire().await.unwrap();

    for conn in [&mut first, &mut second] {
        let timeout: i64 = sqlx::query_scalar("PRAGMA busy_timeout")
            .fetch_one(&mut **conn)
            .await
            .unwrap();
        assert_eq!(timeout, BUSY_TIMEOUT_MS as i64);
    }
}

#[tokio::test]
async fn test_leads_reject_unknown_method() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("leadtrail.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO leads (id, attribution_method, attribution_confidence, created_at) \
         VALUES ('lead-1', 'referral', 100, 0)",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "CHECK constraint should reject unknown methods");
}

#[tokio::test]
async fn test_dedup_index_rejects_same_day_duplicate() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("leadtrail.db")).await.unwrap();

    let insert = "INSERT INTO referrer_visits \
         (id, referrer_username, email, identity_key, created_at, day_bucket) \
         VALUES (?, 'janesmith', 'jane@example.com', 'e:jane@example.com', 1000, 0)";

    sqlx::query(insert).bind("visit-1").execute(&pool).await.unwrap();
    let second = sqlx::query(insert).bind("visit-2").execute(&pool).await;

    assert!(second.is_err(), "unique dedup index should reject the second row");
}

#[tokio::test]
async fn test_dedup_conflict_target_valid_on_every_connection() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("leadtrail.db")).await.unwrap();

    // Connections opened with the pool must see the migrated schema
    let mut first = pool.acquire().await.unwrap();
    let mut second = pool.acquire().await.unwrap();

    let upsert = "INSERT INTO referrer_visits \
         (id, referrer_username, email, identity_key, created_at, day_bucket) \
         VALUES (?, 'janesmith', 'jane@example.com', 'k', 1000, 0) \
         ON CONFLICT (referrer_username, identity_key, day_bucket) DO NOTHING";

    let inserted = sqlx::query(upsert)
        .bind("visit-1")
        .execute(&mut *first)
        .await
        .unwrap()
        .rows_affected();
    let suppressed = sqlx::query(upsert)
        .bind("visit-2")
        .execute(&mut *second)
        .await
        .unwrap()
        .rows_affected();

    assert_eq!(inserted, 1);
    assert_eq!(suppressed, 0);
}
