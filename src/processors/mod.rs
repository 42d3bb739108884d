use crate::domain::health::ServiceHealth;
use crate::domain::payment::{Backend, ProcessorPayment};
use crate::error::CallError;
use std::time::Duration;

pub mod http;
pub mod mock;

/// Outbound contract of the two downstream payment processors.
///
/// Implementations must bound every call by the given timeout and report any
/// non-2xx answer as an error; retrying is the caller's business.
#[async_trait::async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn submit(
        &self,
        backend: Backend,
        payment: &ProcessorPayment,
        timeout: Duration,
    ) -> Result<(), CallError>;

    async fn service_health(
        &self,
        backend: Backend,
        timeout: Duration,
    ) -> Result<ServiceHealth, CallError>;
}
