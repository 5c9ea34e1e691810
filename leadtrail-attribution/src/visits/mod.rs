//! Referrer visit log: matching for attribution, dedup-aware recording

pub mod matcher;
pub mod tracker;

pub use matcher::VisitMatcher;
pub use tracker::{NewReferrerVisit, VisitTracker};
