//! Referrer visit recording with 24-hour dedup
//!
//! **Algorithm:**
//! 1. Validate referrer, normalize identity (phone to digits)
//! 2. One conditional INSERT: write the row only if no visit for the same
//!    referrer inside the dedup window matches every supplied identity field
//! 3. If no row was written, read back and return the existing visit
//!
//! Step 2 is a single statement, so SQLite's write lock makes the window
//! check and the insert atomic. The unique `(referrer_username,
//! identity_key, day_bucket)` index is a second, store-enforced guard: two
//! visits with identical fields on the same UTC day are under 24 hours apart,
//! so step 2 already suppresses them. A conflicting insert is dropped with
//! `ON CONFLICT DO NOTHING` and the caller converges on the winner in step 3.

use chrono::{DateTime, SubsecRound, Utc};
use leadtrail_common::{time, uuid_utils, Error, ReferrerVisit, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::identity::VisitIdentity;
use crate::policy::VISIT_DEDUP_WINDOW;

/// Input for recording a referral-link visit
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReferrerVisit {
    pub referrer_username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub user_agent: String,
}

/// Records referrer visits, at most one per referrer, identity and 24 hours
#[derive(Clone)]
pub struct VisitTracker {
    db: SqlitePool,
}

impl VisitTracker {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record a visit now, or return the visit already recorded in the window
    pub async fn track_referrer_visit(&self, input: NewReferrerVisit) -> Result<ReferrerVisit> {
        self.track_referrer_visit_at(input, time::now()).await
    }

    /// Record a visit as of `now`
    pub async fn track_referrer_visit_at(
        &self,
        input: NewReferrerVisit,
        now: DateTime<Utc>,
    ) -> Result<ReferrerVisit> {
        let referrer_username = input.referrer_username.trim();
        if referrer_username.is_empty() {
            return Err(Error::InvalidInput("referrerUsername is required".to_string()));
        }

        let identity = VisitIdentity::from_raw(input.email.as_deref(), input.phone.as_deref())
            .ok_or_else(|| {
                Error::InvalidInput("At least one of email or phone is required".to_string())
            })?;
        let identity_key = identity.key();

        // Stored precision is milliseconds; keep the returned value identical
        // to what a later read produces
        let now = now.trunc_subsecs(3);
        let window_start = time::to_millis(now - VISIT_DEDUP_WINDOW);
        let day_bucket = time::day_bucket(now);

        let candidate = ReferrerVisit {
            id: uuid_utils::generate(),
            referrer_username: referrer_username.to_string(),
            email: identity.email,
            phone: identity.phone,
            ip_address: input.ip_address,
            user_agent: input.user_agent,
            created_at: now,
        };

        let inserted = sqlx::query(
            r#"
            INSERT INTO referrer_visits (
                id, referrer_username, email, phone, identity_key,
                ip_address, user_agent, created_at, day_bucket
            )
            SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM referrer_visits
                WHERE referrer_username = ?
                  AND (? IS NULL OR email = ?)
                  AND (? IS NULL OR phone = ?)
                  AND created_at >= ?
            )
            ON CONFLICT (referrer_username, identity_key, day_bucket) DO NOTHING
            "#,
        )
        .bind(candidate.id.to_string())
        .bind(&candidate.referrer_username)
        .bind(&candidate.email)
        .bind(&candidate.phone)
        .bind(&identity_key)
        .bind(&candidate.ip_address)
        .bind(&candidate.user_agent)
        .bind(time::to_millis(now))
        .bind(day_bucket)
        .bind(&candidate.referrer_username)
        .bind(&candidate.email)
        .bind(&candidate.email)
        .bind(&candidate.phone)
        .bind(&candidate.phone)
        .bind(window_start)
        .execute(&self.db)
        .await?
        .rows_affected();

        if inserted == 1 {
            info!(
                visit_id = %candidate.id,
                referrer = %candidate.referrer_username,
                "Recorded referrer visit"
            );
            return Ok(candidate);
        }

        let existing = self
            .find_existing(&candidate, &identity_key, window_start, day_bucket)
            .await?
            .ok_or_else(|| {
                Error::Internal(format!(
                    "Visit insert for {} was suppressed but no existing visit was found",
                    referrer_username
                ))
            })?;

        debug!(
            visit_id = %existing.id,
            referrer = %existing.referrer_username,
            "Visit deduplicated within window"
        );

        Ok(existing)
    }

    /// The visit that suppressed an insert: inside the window and matching
    /// every supplied field, or holding the same identity and day bucket
    async fn find_existing(
        &self,
        candidate: &ReferrerVisit,
        identity_key: &str,
        window_start: i64,
        day_bucket: i64,
    ) -> Result<Option<ReferrerVisit>> {
        let sql = format!(
            "SELECT {} FROM referrer_visits \
             WHERE referrer_username = ? \
               AND (((? IS NULL OR email = ?) AND (? IS NULL OR phone = ?) AND created_at >= ?) \
                 OR (identity_key = ? AND day_bucket = ?)) \
             ORDER BY created_at DESC LIMIT 1",
            ReferrerVisit::COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(&candidate.referrer_username)
            .bind(&candidate.email)
            .bind(&candidate.email)
            .bind(&candidate.phone)
            .bind(&candidate.phone)
            .bind(window_start)
            .bind(identity_key)
            .bind(day_bucket)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(ReferrerVisit::from_row).transpose()
    }
}
