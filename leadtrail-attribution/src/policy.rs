//! Attribution policy constants
//!
//! Fixed by product policy, not runtime configuration.

use chrono::Duration;
use leadtrail_common::AttributionMethod;

/// Confidence for a same-device referral cookie
pub const COOKIE_CONFIDENCE: u8 = 100;

/// Confidence for a visit matched on email
pub const EMAIL_MATCH_CONFIDENCE: u8 = 90;

/// Confidence for a visit matched on phone
pub const PHONE_MATCH_CONFIDENCE: u8 = 85;

/// Confidence that there is no referrer at all
pub const DIRECT_CONFIDENCE: u8 = 100;

/// Visits older than this are not eligible for matching
pub const VISIT_STALENESS_WINDOW: Duration = Duration::days(14);

/// Repeat visits for the same referrer and identity inside this window
/// collapse into one stored record
pub const VISIT_DEDUP_WINDOW: Duration = Duration::hours(24);

/// Name of the referral cookie set by the link-click flow
pub const REFERRAL_COOKIE_NAME: &str = "referral";

/// Lifetime of a freshly issued referral cookie
pub const REFERRAL_COOKIE_TTL: Duration = Duration::days(30);

/// Fixed confidence for an attribution method
pub const fn confidence_for(method: AttributionMethod) -> u8 {
    match method {
        AttributionMethod::Cookie => COOKIE_CONFIDENCE,
        AttributionMethod::EmailMatch => EMAIL_MATCH_CONFIDENCE,
        AttributionMethod::PhoneMatch => PHONE_MATCH_CONFIDENCE,
        AttributionMethod::Direct => DIRECT_CONFIDENCE,
    }
}
