//! Visitor identity normalization
//!
//! Email is accepted as given (trimmed); phone is reduced to its digits. A
//! value that is empty after normalization counts as absent.

use std::fmt;

/// Which contact field a visit lookup is keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    Email,
    Phone,
}

impl IdentityKind {
    /// `referrer_visits` column holding this identity
    pub(crate) fn column(&self) -> &'static str {
        match self {
            IdentityKind::Email => "email",
            IdentityKind::Phone => "phone",
        }
    }

    /// Normalize a raw value for this kind; `None` when nothing usable remains
    pub fn normalize(&self, raw: &str) -> Option<String> {
        match self {
            IdentityKind::Email => normalize_email(raw),
            IdentityKind::Phone => normalize_phone(raw),
        }
    }
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Strip everything except ASCII digits
///
/// `"(555) 123-4567"` becomes `"5551234567"`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (!digits.is_empty()).then_some(digits)
}

/// Trim surrounding whitespace; case is kept as given
pub fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// The identity fields supplied with a visit
///
/// Dedup matches an earlier visit when every supplied field equals the stored
/// one; [`VisitIdentity::key`] is the exact field set, used by the unique
/// same-day index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitIdentity {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl VisitIdentity {
    /// Normalize raw fields; `None` when neither yields a usable value
    pub fn from_raw(email: Option<&str>, phone: Option<&str>) -> Option<Self> {
        let email = email.and_then(normalize_email);
        let phone = phone.and_then(normalize_phone);

        if email.is_none() && phone.is_none() {
            return None;
        }

        Some(Self { email, phone })
    }

    /// Canonical, unambiguous text form stored in `identity_key`
    pub fn key(&self) -> String {
        // JSON array so separators inside an email cannot collide
        serde_json::json!([self.email, self.phone]).to_string()
    }
}
