//! leadtrail-attribution library
//!
//! Credits inbound leads to the referrer who caused them and rolls the
//! results up into per-referrer statistics.
//!
//! Entry points used by collaborators:
//! - [`VisitTracker::track_referrer_visit`] on every referral-link click
//! - [`AttributionResolver::get_attribution`] before a lead is persisted
//! - [`StatsAggregator::get_referrer_attribution_stats`] for dashboards

use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cookie;
pub mod error;
pub mod identity;
pub mod policy;
pub mod resolver;
pub mod stats;
pub mod visits;

#[cfg(test)]
pub(crate) mod test_support;

pub use cookie::{CookieSignal, CookieSignalReader};
pub use error::{ApiError, ApiResult, AttributionError};
pub use resolver::{AttributionResolver, AttributionResult};
pub use stats::{MethodBreakdown, ReferrerStats, StatsAggregator, StatsRange};
pub use visits::{NewReferrerVisit, VisitMatcher, VisitTracker};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub resolver: AttributionResolver,
    pub tracker: VisitTracker,
    pub stats: StatsAggregator,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool) -> Self {
        Self {
            resolver: AttributionResolver::new(db.clone()),
            tracker: VisitTracker::new(db.clone()),
            stats: StatsAggregator::new(db.clone()),
            db,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::attribution_routes())
        .merge(api::visit_routes())
        .merge(api::stats_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
