//! Fixtures for unit tests: raw inserts that bypass the tracker

use chrono::{DateTime, Utc};
use leadtrail_common::{time, uuid_utils, AttributionMethod};
use sqlx::SqlitePool;

use crate::identity::VisitIdentity;
use crate::policy::confidence_for;

/// Insert a visit row directly, with the same derived columns the tracker writes
pub async fn insert_visit(
    pool: &SqlitePool,
    referrer: &str,
    email: Option<&str>,
    phone: Option<&str>,
    created_at: DateTime<Utc>,
) {
    let identity = VisitIdentity::from_raw(email, phone).expect("fixture needs an identity");

    sqlx::query(
        "INSERT INTO referrer_visits \
         (id, referrer_username, email, phone, identity_key, ip_address, user_agent, created_at, day_bucket) \
         VALUES (?, ?, ?, ?, ?, '198.51.100.1', 'fixture', ?, ?)",
    )
    .bind(uuid_utils::generate().to_string())
    .bind(referrer)
    .bind(&identity.email)
    .bind(&identity.phone)
    .bind(identity.key())
    .bind(time::to_millis(created_at))
    .bind(time::day_bucket(created_at))
    .execute(pool)
    .await
    .expect("insert visit fixture");
}

/// Insert a lead as the capture flow would persist it
pub async fn insert_lead(
    pool: &SqlitePool,
    method: AttributionMethod,
    referrer: Option<&str>,
    created_at: DateTime<Utc>,
) {
    sqlx::query(
        "INSERT INTO leads \
         (id, email, phone, attribution_method, attribution_confidence, referrer_username, created_at) \
         VALUES (?, 'lead@example.com', NULL, ?, ?, ?, ?)",
    )
    .bind(uuid_utils::generate().to_string())
    .bind(method.as_str())
    .bind(i64::from(confidence_for(method)))
    .bind(referrer)
    .bind(time::to_millis(created_at))
    .execute(pool)
    .await
    .expect("insert lead fixture");
}
