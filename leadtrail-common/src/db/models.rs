//! Database models

use crate::{time, uuid_utils, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How a lead was credited to its referrer
///
/// Stored in `leads.attribution_method` as its snake_case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionMethod {
    /// Same-device referral cookie
    Cookie,
    /// Stored visit matched on email
    EmailMatch,
    /// Stored visit matched on phone
    PhoneMatch,
    /// No referrer
    Direct,
}

impl AttributionMethod {
    pub const ALL: [AttributionMethod; 4] = [
        AttributionMethod::Cookie,
        AttributionMethod::EmailMatch,
        AttributionMethod::PhoneMatch,
        AttributionMethod::Direct,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributionMethod::Cookie => "cookie",
            AttributionMethod::EmailMatch => "email_match",
            AttributionMethod::PhoneMatch => "phone_match",
            AttributionMethod::Direct => "direct",
        }
    }

    /// True when the referrer was inferred from a visit recorded on another
    /// device (email or phone match)
    pub fn is_cross_device(&self) -> bool {
        matches!(self, AttributionMethod::EmailMatch | AttributionMethod::PhoneMatch)
    }
}

impl fmt::Display for AttributionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cookie" => Ok(AttributionMethod::Cookie),
            "email_match" => Ok(AttributionMethod::EmailMatch),
            "phone_match" => Ok(AttributionMethod::PhoneMatch),
            "direct" => Ok(AttributionMethod::Direct),
            other => Err(Error::InvalidInput(format!(
                "Unknown attribution method: {}",
                other
            ))),
        }
    }
}

/// A recorded click-through on a referral link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferrerVisit {
    pub id: Uuid,
    pub referrer_username: String,
    pub email: Option<String>,
    /// Digits only
    pub phone: Option<String>,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

impl ReferrerVisit {
    /// Columns expected by [`ReferrerVisit::from_row`], in select-list form
    pub const COLUMNS: &'static str =
        "id, referrer_username, email, phone, ip_address, user_agent, created_at";

    /// Decode a row selected with [`ReferrerVisit::COLUMNS`]
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let id: String = row.try_get("id")?;
        let created_at: i64 = row.try_get("created_at")?;

        Ok(Self {
            id: uuid_utils::parse_stored(&id)?,
            referrer_username: row.try_get("referrer_username")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            ip_address: row.try_get("ip_address")?,
            user_agent: row.try_get("user_agent")?,
            created_at: time::from_millis(created_at)?,
        })
    }
}

/// An inbound lead as persisted by the lead-capture flow
///
/// `referrer_username` is `None` exactly when the method is
/// [`AttributionMethod::Direct`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub attribution_method: AttributionMethod,
    pub attribution_confidence: u8,
    pub referrer_username: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    pub const COLUMNS: &'static str = "id, email, phone, attribution_method, \
         attribution_confidence, referrer_username, created_at";

    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let id: String = row.try_get("id")?;
        let method: String = row.try_get("attribution_method")?;
        let confidence: i64 = row.try_get("attribution_confidence")?;
        let created_at: i64 = row.try_get("created_at")?;

        let attribution_confidence = u8::try_from(confidence)
            .ok()
            .filter(|c| *c <= 100)
            .ok_or_else(|| {
                Error::Internal(format!("Attribution confidence out of range: {}", confidence))
            })?;

        Ok(Self {
            id: uuid_utils::parse_stored(&id)?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            attribution_method: method.parse().map_err(|e: Error| Error::Internal(e.to_string()))?,
            attribution_confidence,
            referrer_username: row.try_get("referrer_username")?,
            created_at: time::from_millis(created_at)?,
        })
    }
}
