use crate::domain::payment::ErrorEnvelope;
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

pub async fn get_payments_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> impl IntoResponse {
    let from = match parse_bound(query.from.as_deref()) {
        Ok(v) => v,
        Err(msg) => return bad_request(&msg).into_response(),
    };
    let to = match parse_bound(query.to.as_deref()) {
        Ok(v) => v,
        Err(msg) => return bad_request(&msg).into_response(),
    };

    let summary = state.payment_service.summary(from, to);
    (StatusCode::OK, Json(summary)).into_response()
}

fn parse_bound(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, String> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| format!("invalid timestamp {s}: {e}")),
    }
}

fn bad_request(msg: &str) -> (StatusCode, Json<ErrorEnvelope>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorEnvelope::new("INVALID_RANGE", msg)),
    )
}
