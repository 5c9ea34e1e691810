//! Referral cookie signal
//!
//! The cookie value is either form encoded
//! (`referrer_username=johnsmith&expires_at=1730000000000`, values
//! percent-encoded) or a JSON object with the same fields. `expires_at` is
//! unix milliseconds or RFC 3339.
//! Reading is purely local so it can run before any store access.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;
use url::form_urlencoded;

use crate::policy::REFERRAL_COOKIE_TTL;

const USERNAME_FIELDS: [&str; 2] = ["referrer_username", "referrerUsername"];
const EXPIRY_FIELDS: [&str; 2] = ["expires_at", "expiresAt"];

/// An unexpired referrer identity carried by the referral cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSignal {
    pub referrer_username: String,
    pub expires_at: DateTime<Utc>,
}

impl CookieSignal {
    /// New signal valid for [`REFERRAL_COOKIE_TTL`] from `now`
    pub fn issue(referrer_username: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            referrer_username: referrer_username.into(),
            expires_at: now + REFERRAL_COOKIE_TTL,
        }
    }

    /// Cookie-safe value understood by [`CookieSignalReader::read`]
    ///
    /// The username is percent-encoded, so `&`, `=` and `;` survive the
    /// round trip.
    pub fn to_cookie_value(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("referrer_username", &self.referrer_username)
            .append_pair("expires_at", &self.expires_at.timestamp_millis().to_string())
            .finish()
    }

    /// Honored only while the expiry is strictly in the future
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Parses the raw referral cookie
pub struct CookieSignalReader;

impl CookieSignalReader {
    /// Referrer identity from the cookie, if present, well formed and unexpired
    ///
    /// Never fails: absent, malformed and expired cookies all yield `None`.
    pub fn read(raw_cookie: Option<&str>, now: DateTime<Utc>) -> Option<CookieSignal> {
        let raw = raw_cookie?.trim();
        if raw.is_empty() {
            return None;
        }

        let signal = if raw.starts_with('{') {
            parse_json(raw)
        } else {
            parse_form(raw)
        };

        match signal {
            Some(signal) if signal.is_valid_at(now) => Some(signal),
            Some(signal) => {
                debug!(
                    referrer = %signal.referrer_username,
                    expires_at = %signal.expires_at,
                    "Ignoring expired referral cookie"
                );
                None
            }
            None => {
                debug!("Ignoring malformed referral cookie");
                None
            }
        }
    }
}

fn parse_json(raw: &str) -> Option<CookieSignal> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;

    let username = USERNAME_FIELDS
        .iter()
        .find_map(|field| object.get(*field))
        .and_then(Value::as_str)?;

    let expires_at = match EXPIRY_FIELDS.iter().find_map(|field| object.get(*field))? {
        Value::Number(n) => from_epoch_millis(n.as_i64()?)?,
        Value::String(s) => parse_expiry(s)?,
        _ => return None,
    };

    build(username, expires_at)
}

fn parse_form(raw: &str) -> Option<CookieSignal> {
    let mut username = None;
    let mut expires_at = None;

    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        let key = key.trim();
        if USERNAME_FIELDS.contains(&key) {
            username = Some(value.into_owned());
        } else if EXPIRY_FIELDS.contains(&key) {
            expires_at = Some(parse_expiry(value.trim())?);
        }
    }

    build(&username?, expires_at?)
}

fn build(username: &str, expires_at: DateTime<Utc>) -> Option<CookieSignal> {
    let username = username.trim();
    if username.is_empty() {
        return None;
    }

    Some(CookieSignal {
        referrer_username: username.to_string(),
        expires_at,
    })
}

fn parse_expiry(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(millis) = value.parse::<i64>() {
        return from_epoch_millis(millis);
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}
