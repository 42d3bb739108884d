use crate::config::RetryPolicy;
use crate::domain::payment::{Backend, ProcessorPayment};
use crate::processors::PaymentProcessor;
use std::time::Duration;

/// Longest single wait between two attempts.
pub const MAX_BACKOFF_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base: f64,
    pub unit: Duration,
}

impl Backoff {
    /// Wait after the `attempt`-th (1-based) failed attempt: `unit * base^attempt`,
    /// capped at [`MAX_BACKOFF_DELAY`].
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.base.max(1.0).powi(attempt.min(16) as i32);
        Duration::try_from_secs_f64(self.unit.as_secs_f64() * factor)
            .map_or(MAX_BACKOFF_DELAY, |d| d.min(MAX_BACKOFF_DELAY))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionStep {
    pub backend: Backend,
    pub attempt_timeout: Duration,
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl ExecutionStep {
    pub fn from_policy(backend: Backend, policy: &RetryPolicy) -> Self {
        Self {
            backend,
            attempt_timeout: policy.attempt_timeout,
            max_attempts: policy.max_attempts(),
            backoff: Backoff {
                base: policy.backoff_base,
                unit: policy.backoff_unit,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Processor that accepted the payment, if any.
    pub handled_by: Option<Backend>,
    pub attempts: u32,
}

/// Ordered processor steps tried until one accepts the payment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    pub steps: Vec<ExecutionStep>,
}

impl ExecutionPlan {
    /// The default route may fall back once to the fallback processor; the
    /// fallback route has nowhere else to go.
    pub fn for_route(route: Option<Backend>, policy: &RetryPolicy) -> Self {
        let backends: &[Backend] = match route {
            Some(Backend::Default) => &[Backend::Default, Backend::Fallback],
            Some(Backend::Fallback) => &[Backend::Fallback],
            None => &[],
        };
        Self {
            steps: backends
                .iter()
                .map(|b| ExecutionStep::from_policy(*b, policy))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub async fn run(
        &self,
        processor: &dyn PaymentProcessor,
        payment: &ProcessorPayment,
    ) -> ExecutionReport {
        let mut attempts = 0;
        for step in &self.steps {
            for attempt in 1..=step.max_attempts.max(1) {
                attempts += 1;
                match processor
                    .submit(step.backend, payment, step.attempt_timeout)
                    .await
                {
                    Ok(()) => {
                        return ExecutionReport {
                            handled_by: Some(step.backend),
                            attempts,
                        };
                    }
                    Err(e) => {
                        tracing::debug!(
                            correlation_id = %payment.correlation_id,
                            backend = %step.backend,
                            attempt,
                            error = %e,
                            "payment attempt failed"
                        );
                    }
                }
                if attempt < step.max_attempts {
                    tokio::time::sleep(step.backoff.delay(attempt)).await;
                }
            }
            tracing::warn!(
                correlation_id = %payment.correlation_id,
                backend = %step.backend,
                "processor exhausted its attempts"
            );
        }

        ExecutionReport {
            handled_by: None,
            attempts,
        }
    }
}
