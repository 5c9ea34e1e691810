//! Referral-link visit recording endpoint

use axum::{extract::State, routing::post, Json, Router};
use leadtrail_common::ReferrerVisit;

use crate::{ApiResult, AppState, NewReferrerVisit};

/// POST /api/visits
///
/// **Request:** `{"referrerUsername": "janesmith", "email": "...", "phone": "...", "ipAddress": "...", "userAgent": "..."}`
/// **Response:** the stored visit; a repeat inside 24 hours returns the
/// original record unchanged
///
/// **Errors:**
/// - 400 Bad Request: missing referrer, or neither email nor phone
pub async fn track_visit(
    State(state): State<AppState>,
    Json(payload): Json<NewReferrerVisit>,
) -> ApiResult<Json<ReferrerVisit>> {
    let visit = state.tracker.track_referrer_visit(payload).await?;
    Ok(Json(visit))
}

pub fn visit_routes() -> Router<AppState> {
    Router::new().route("/api/visits", post(track_visit))
}
