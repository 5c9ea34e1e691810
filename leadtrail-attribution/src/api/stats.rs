//! Referrer statistics endpoint for reporting surfaces

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use leadtrail_common::time;
use serde::Deserialize;

use crate::{ApiError, ApiResult, AppState, ReferrerStats, StatsRange};

/// Optional range for the rollup; no parameters means all leads
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    /// RFC 3339, inclusive
    pub since: Option<DateTime<Utc>>,
    /// RFC 3339, exclusive
    pub until: Option<DateTime<Utc>>,
    /// Trailing window in days; exclusive with `since`/`until`
    pub days: Option<i64>,
}

impl StatsQuery {
    fn into_range(self, now: DateTime<Utc>) -> ApiResult<StatsRange> {
        match self.days {
            Some(_) if self.since.is_some() || self.until.is_some() => Err(ApiError::BadRequest(
                "days cannot be combined with since/until".to_string(),
            )),
            Some(days) if days <= 0 => {
                Err(ApiError::BadRequest("days must be positive".to_string()))
            }
            Some(days) => Ok(StatsRange::last_days(days, now)?),
            None => Ok(StatsRange::between(self.since, self.until)?),
        }
    }
}

/// GET /api/referrers/:username/stats
///
/// **Response:** `{"totalLeads": 7, "byMethod": {"cookie": 3, "emailMatch": 2, "phoneMatch": 1, "direct": 1}, "crossDeviceRate": 43}`
pub async fn get_referrer_stats(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<ReferrerStats>> {
    let range = query.into_range(time::now())?;
    let stats = state
        .stats
        .get_referrer_attribution_stats_in(&username, range)
        .await?;
    Ok(Json(stats))
}

pub fn stats_routes() -> Router<AppState> {
    Router::new().route("/api/referrers/:username/stats", get(get_referrer_stats))
}
