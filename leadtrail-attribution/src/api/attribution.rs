//! Attribution endpoint for the lead-capture flow

use axum::{
    extract::State,
    http::{header::COOKIE, HeaderMap},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::policy::REFERRAL_COOKIE_NAME;
use crate::{ApiResult, AppState, AttributionResult};

/// Request payload for attribution
#[derive(Debug, Default, Deserialize)]
pub struct AttributionRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Raw referral cookie value; when absent the `Cookie` header is used
    #[serde(default)]
    pub cookie: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttributionResponse {
    pub attribution: AttributionResult,
}

/// POST /api/attribution
///
/// **Request:** `{"email": "...", "phone": "...", "cookie": "..."}`
/// **Response:** `{"attribution": {"attributionMethod": "email_match", "attributionConfidence": 90, "referrerUsername": "janesmith"}}`
///
/// **Errors:**
/// - 503 Service Unavailable: visit store could not be queried
pub async fn get_attribution(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AttributionRequest>,
) -> ApiResult<Json<AttributionResponse>> {
    let cookie = payload
        .cookie
        .or_else(|| referral_cookie_from_headers(&headers));

    let attribution = state
        .resolver
        .get_attribution(
            cookie.as_deref(),
            payload.email.as_deref().unwrap_or(""),
            payload.phone.as_deref().unwrap_or(""),
        )
        .await?;

    Ok(Json(AttributionResponse { attribution }))
}

/// Value of the referral cookie from any `Cookie` header
pub fn referral_cookie_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == REFERRAL_COOKIE_NAME)
        .map(|(_, value)| value.to_string())
}

pub fn attribution_routes() -> Router<AppState> {
    Router::new().route("/api/attribution", post(get_attribution))
}
