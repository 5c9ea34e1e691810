//! Recent-visit lookup by email or phone

use chrono::{DateTime, Utc};
use leadtrail_common::{time, ReferrerVisit, Result};
use sqlx::SqlitePool;
use tracing::debug;

use crate::identity::IdentityKind;
use crate::policy::VISIT_STALENESS_WINDOW;

/// Looks up the most recent eligible visit for an identity
#[derive(Clone)]
pub struct VisitMatcher {
    db: SqlitePool,
}

impl VisitMatcher {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Most recent visit whose `kind` field equals `value` and whose
    /// `created_at >= as_of - 14 days`
    ///
    /// `value` is normalized first (phone to digits); a value that normalizes
    /// to nothing matches nothing and performs no query.
    pub async fn find_recent_visit(
        &self,
        kind: IdentityKind,
        value: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Option<ReferrerVisit>> {
        let Some(value) = kind.normalize(value) else {
            return Ok(None);
        };

        let window_start = as_of - VISIT_STALENESS_WINDOW;

        // Column name comes from a closed enum, never from input
        let sql = format!(
            "SELECT {} FROM referrer_visits \
             WHERE {} = ? AND created_at >= ? \
             ORDER BY created_at DESC LIMIT 1",
            ReferrerVisit::COLUMNS,
            kind.column()
        );

        let row = sqlx::query(&sql)
            .bind(&value)
            .bind(time::to_millis(window_start))
            .fetch_optional(&self.db)
            .await?;

        let visit = row.as_ref().map(ReferrerVisit::from_row).transpose()?;

        debug!(
            identity = %kind,
            matched = visit.is_some(),
            referrer = visit.as_ref().map(|v| v.referrer_username.as_str()).unwrap_or(""),
            "Recent visit lookup"
        );

        Ok(visit)
    }
}
