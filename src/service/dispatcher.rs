use crate::config::{RetryPolicy, RoutingPolicy};
use crate::domain::health::ProcessorHealth;
use crate::domain::payment::{Backend, PaymentOutcome, PaymentRequest};
use crate::ledger::Ledger;
use crate::processors::PaymentProcessor;
use crate::router::policy::choose;
use crate::service::correlation::{AdmittedPayment, CorrelationTable};
use crate::service::retry_orchestrator::ExecutionPlan;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Turns one admitted payment into exactly one outcome.
#[derive(Clone)]
pub struct Dispatcher {
    pub processor: Arc<dyn PaymentProcessor>,
    pub health: Arc<ProcessorHealth>,
    pub correlations: Arc<CorrelationTable>,
    pub ledger: Arc<Ledger>,
    pub retry: RetryPolicy,
    pub routing: RoutingPolicy,
}

impl Dispatcher {
    /// Routes, executes and records the payment, then resolves the
    /// registration it was admitted under. A panic inside the outbound call
    /// is converted into a failed outcome.
    pub async fn dispatch(&self, admitted: AdmittedPayment) -> PaymentOutcome {
        let AdmittedPayment { ticket, request: req } = admitted;
        let outcome = match AssertUnwindSafe(self.execute(&req)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!(
                    correlation_id = %req.correlation_id,
                    "payment execution panicked"
                );
                PaymentOutcome::failed(&req)
            }
        };

        if let Some(backend) = outcome.backend_used.filter(|_| outcome.success) {
            self.ledger.append(backend, &outcome);
        }
        if !self.correlations.resolve(ticket, outcome.clone()) {
            tracing::debug!(
                correlation_id = %outcome.correlation_id,
                success = outcome.success,
                "outcome had no waiter"
            );
        }
        outcome
    }

    async fn execute(&self, req: &PaymentRequest) -> PaymentOutcome {
        let route = self.route();
        let plan = ExecutionPlan::for_route(route, &self.retry);
        if plan.is_empty() {
            tracing::warn!(
                correlation_id = %req.correlation_id,
                "no healthy processor, failing payment"
            );
            return PaymentOutcome::failed(req);
        }

        let report = plan.run(self.processor.as_ref(), &req.payload()).await;
        match report.handled_by {
            Some(backend) => {
                tracing::debug!(
                    correlation_id = %req.correlation_id,
                    %backend,
                    attempts = report.attempts,
                    "payment processed"
                );
                PaymentOutcome::succeeded(req, backend)
            }
            None => {
                tracing::warn!(
                    correlation_id = %req.correlation_id,
                    attempts = report.attempts,
                    "payment failed on every planned processor"
                );
                PaymentOutcome::failed(req)
            }
        }
    }

    fn route(&self) -> Option<Backend> {
        let default = self.health.default.snapshot();
        let fallback = self.health.fallback.snapshot();
        choose(&default, &fallback, self.routing)
    }
}
