use crate::error::AdmissionError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Default,
    Fallback,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Default, Backend::Fallback];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Default => "default",
            Backend::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound body of `POST /payments`. Fields are optional so that a missing
/// value surfaces as a validation error instead of a deserialization one.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub correlation_id: Option<String>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePaymentResponse {
    pub message: String,
}

/// An admitted payment. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub correlation_id: String,
    pub amount: Decimal,
    pub requested_at: DateTime<Utc>,
}

impl PaymentRequest {
    pub fn new(correlation_id: impl Into<String>, amount: Decimal) -> Result<Self, AdmissionError> {
        Self::with_requested_at(correlation_id, amount, Utc::now())
    }

    pub fn with_requested_at(
        correlation_id: impl Into<String>,
        amount: Decimal,
        requested_at: DateTime<Utc>,
    ) -> Result<Self, AdmissionError> {
        let correlation_id = correlation_id.into();
        if correlation_id.trim().is_empty() {
            return Err(AdmissionError::InvalidRequest(
                "correlationId is required".to_string(),
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(AdmissionError::InvalidRequest(
                "amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            correlation_id,
            amount,
            requested_at,
        })
    }

    pub fn payload(&self) -> ProcessorPayment {
        ProcessorPayment {
            correlation_id: self.correlation_id.clone(),
            amount: self.amount,
            requested_at: self.requested_at,
        }
    }
}

impl TryFrom<CreatePaymentRequest> for PaymentRequest {
    type Error = AdmissionError;

    fn try_from(req: CreatePaymentRequest) -> Result<Self, Self::Error> {
        let correlation_id = req.correlation_id.unwrap_or_default();
        let amount = req.amount.ok_or_else(|| {
            AdmissionError::InvalidRequest("amount is required".to_string())
        })?;
        PaymentRequest::new(correlation_id, amount)
    }
}

/// Body of `POST <processor>/payments`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorPayment {
    pub correlation_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub correlation_id: String,
    pub amount: Decimal,
    pub requested_at: DateTime<Utc>,
    pub success: bool,
    pub backend_used: Option<Backend>,
}

impl PaymentOutcome {
    pub fn succeeded(req: &PaymentRequest, backend: Backend) -> Self {
        Self {
            correlation_id: req.correlation_id.clone(),
            amount: req.amount,
            requested_at: req.requested_at,
            success: true,
            backend_used: Some(backend),
        }
    }

    pub fn failed(req: &PaymentRequest) -> Self {
        Self {
            correlation_id: req.correlation_id.clone(),
            amount: req.amount,
            requested_at: req.requested_at,
            success: false,
            backend_used: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub total_requests: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentsSummaryResponse {
    pub default: PaymentSummary,
    pub fallback: PaymentSummary,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            error: ErrorPayload {
                code: code.to_string(),
                message: message.to_string(),
                details: None,
            },
        }
    }
}
