//! Attribution resolution
//!
//! Strictly ordered fallback chain, first match wins:
//! 1. Referral cookie (no store access)
//! 2. Recent visit matched on email
//! 3. Recent visit matched on phone
//! 4. Direct
//!
//! A store failure in step 2 or 3 is an error, never a `direct` result:
//! "could not check" must not be counted as "no referrer".

use chrono::{DateTime, Utc};
use leadtrail_common::{time, AttributionMethod};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::cookie::CookieSignalReader;
use crate::error::AttributionError;
use crate::identity::IdentityKind;
use crate::policy::confidence_for;
use crate::visits::VisitMatcher;

/// Outcome of attribution for one lead
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionResult {
    pub attribution_method: AttributionMethod,
    pub attribution_confidence: u8,
    pub referrer_username: Option<String>,
}

impl AttributionResult {
    fn credited(method: AttributionMethod, referrer_username: String) -> Self {
        Self {
            attribution_method: method,
            attribution_confidence: confidence_for(method),
            referrer_username: Some(referrer_username),
        }
    }

    pub fn direct() -> Self {
        Self {
            attribution_method: AttributionMethod::Direct,
            attribution_confidence: confidence_for(AttributionMethod::Direct),
            referrer_username: None,
        }
    }
}

/// Decides which referrer, if any, gets credit for a lead. Read-only.
#[derive(Clone)]
pub struct AttributionResolver {
    matcher: VisitMatcher,
}

impl AttributionResolver {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            matcher: VisitMatcher::new(db),
        }
    }

    /// Resolve attribution at the current time
    ///
    /// `cookie` is the raw referral cookie value, if the request carried one.
    pub async fn get_attribution(
        &self,
        cookie: Option<&str>,
        email: &str,
        phone: &str,
    ) -> Result<AttributionResult, AttributionError> {
        self.get_attribution_at(cookie, email, phone, time::now()).await
    }

    /// Resolve attribution as of `now`
    pub async fn get_attribution_at(
        &self,
        cookie: Option<&str>,
        email: &str,
        phone: &str,
        now: DateTime<Utc>,
    ) -> Result<AttributionResult, AttributionError> {
        if let Some(signal) = CookieSignalReader::read(cookie, now) {
            debug!(referrer = %signal.referrer_username, "Attributed by cookie");
            return Ok(AttributionResult::credited(
                AttributionMethod::Cookie,
                signal.referrer_username,
            ));
        }

        let strategies = [
            (IdentityKind::Email, email, AttributionMethod::EmailMatch),
            (IdentityKind::Phone, phone, AttributionMethod::PhoneMatch),
        ];

        for (kind, value, method) in strategies {
            if value.trim().is_empty() {
                continue;
            }

            let visit = self
                .matcher
                .find_recent_visit(kind, value, now)
                .await
                .map_err(|source| {
                    warn!(identity = %kind, error = %source, "Visit lookup failed");
                    AttributionError::LookupFailed {
                        strategy: kind,
                        source,
                    }
                })?;

            if let Some(visit) = visit {
                debug!(
                    referrer = %visit.referrer_username,
                    method = %method,
                    visit_id = %visit.id,
                    "Attributed by visit match"
                );
                return Ok(AttributionResult::credited(method, visit.referrer_username));
            }
        }

        debug!("No referral signal, attributing as direct");
        Ok(AttributionResult::direct())
    }
}
