//! # LeadTrail Common Library
//!
//! Shared code for LeadTrail services including:
//! - Database bootstrap, migrations and models
//! - Attribution method definitions
//! - Configuration loading
//! - Utility functions

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use db::models::{AttributionMethod, Lead, ReferrerVisit};
pub use error::{Error, Result};
