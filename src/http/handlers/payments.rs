use crate::domain::payment::{CreatePaymentRequest, CreatePaymentResponse, ErrorEnvelope, PaymentRequest};
use crate::error::AdmissionError;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

pub async fn create_payment(
    State(state): State<AppState>,
    Json(req): Json<CreatePaymentRequest>,
) -> impl IntoResponse {
    let req = match PaymentRequest::try_from(req) {
        Ok(req) => req,
        Err(e) => return admission_error(e).into_response(),
    };

    match state.payment_service.submit(req).await {
        Ok(outcome) if outcome.success => (
            StatusCode::OK,
            Json(CreatePaymentResponse {
                message: "payment processed successfully".to_string(),
            }),
        )
            .into_response(),
        Ok(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorEnvelope::new(
                "PAYMENT_FAILED",
                "payment could not be processed by any processor",
            )),
        )
            .into_response(),
        Err(e) => admission_error(e).into_response(),
    }
}

fn admission_error(e: AdmissionError) -> (StatusCode, Json<ErrorEnvelope>) {
    let (status, code) = match &e {
        AdmissionError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
        AdmissionError::DuplicateCorrelationId(_) => {
            (StatusCode::BAD_REQUEST, "DUPLICATE_CORRELATION_ID")
        }
        AdmissionError::QueueFull => (StatusCode::SERVICE_UNAVAILABLE, "QUEUE_FULL"),
        AdmissionError::QueueClosed => (StatusCode::SERVICE_UNAVAILABLE, "QUEUE_CLOSED"),
        AdmissionError::TimedOut => (StatusCode::GATEWAY_TIMEOUT, "PAYMENT_TIMEOUT"),
    };
    (status, Json(ErrorEnvelope::new(code, &e.to_string())))
}
