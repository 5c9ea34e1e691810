//! Shared fixtures for leadtrail-attribution integration tests

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use leadtrail_common::db::init_database;
use leadtrail_common::{time, uuid_utils, AttributionMethod};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Fresh on-disk database; keep the `TempDir` alive for the test's duration
pub async fn setup_test_db() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().expect("Should create temp dir");
    let pool = init_database(&dir.path().join("leadtrail.db"))
        .await
        .expect("Should initialize database");
    (dir, pool)
}

/// Persist a lead the way the capture flow does after attribution
pub async fn insert_lead(
    pool: &SqlitePool,
    method: AttributionMethod,
    referrer: Option<&str>,
    confidence: u8,
    created_at: DateTime<Utc>,
) {
    sqlx::query(
        "INSERT INTO leads \
         (id, email, phone, attribution_method, attribution_confidence, referrer_username, created_at) \
         VALUES (?, 'lead@example.com', NULL, ?, ?, ?, ?)",
    )
    .bind(uuid_utils::generate().to_string())
    .bind(method.as_str())
    .bind(i64::from(confidence))
    .bind(referrer)
    .bind(time::to_millis(created_at))
    .execute(pool)
    .await
    .expect("Should insert lead");
}

pub async fn visit_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM referrer_visits")
        .fetch_one(pool)
        .await
        .expect("Should count visits")
}
