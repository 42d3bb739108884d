use crate::domain::health::ServiceHealth;
use crate::domain::payment::{Backend, ProcessorPayment};
use crate::error::CallError;
use crate::processors::PaymentProcessor;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    AlwaysSuccess,
    AlwaysStatus(u16),
    /// Answers `status` for the first `n` calls, then succeeds.
    FailFirst { n: u32, status: u16 },
    /// Succeeds after `delay`, or times out if the caller's timeout is shorter.
    Delay(Duration),
}

struct BackendScript {
    behavior: MockBehavior,
    health: Result<ServiceHealth, CallError>,
    /// Stall before answering a health probe, ignoring the caller's timeout.
    health_delay: Option<Duration>,
    payment_calls: AtomicU32,
    health_calls: AtomicU32,
    accepted: Vec<ProcessorPayment>,
}

impl BackendScript {
    fn new() -> Self {
        Self {
            behavior: MockBehavior::AlwaysSuccess,
            health: Ok(ServiceHealth {
                failing: false,
                min_response_time: 0,
            }),
            health_delay: None,
            payment_calls: AtomicU32::new(0),
            health_calls: AtomicU32::new(0),
            accepted: Vec::new(),
        }
    }
}

/// Scripted in-process stand-in for both processors.
pub struct MockProcessor {
    scripts: Mutex<HashMap<Backend, BackendScript>>,
}

impl Default for MockProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProcessor {
    pub fn new() -> Self {
        let scripts = Backend::ALL
            .into_iter()
            .map(|b| (b, BackendScript::new()))
            .collect();
        Self {
            scripts: Mutex::new(scripts),
        }
    }

    pub fn with_behavior(self, backend: Backend, behavior: MockBehavior) -> Self {
        self.set_behavior(backend, behavior);
        self
    }

    pub fn set_behavior(&self, backend: Backend, behavior: MockBehavior) {
        if let Some(script) = self.scripts.lock().get_mut(&backend) {
            script.behavior = behavior;
        }
    }

    pub fn set_health(&self, backend: Backend, health: Result<ServiceHealth, CallError>) {
        if let Some(script) = self.scripts.lock().get_mut(&backend) {
            script.health = health;
        }
    }

    pub fn set_health_delay(&self, backend: Backend, delay: Duration) {
        if let Some(script) = self.scripts.lock().get_mut(&backend) {
            script.health_delay = Some(delay);
        }
    }

    pub fn payment_calls(&self, backend: Backend) -> u32 {
        self.scripts
            .lock()
            .get(&backend)
            .map(|s| s.payment_calls.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn total_payment_calls(&self) -> u32 {
        Backend::ALL.iter().map(|b| self.payment_calls(*b)).sum()
    }

    pub fn health_calls(&self, backend: Backend) -> u32 {
        self.scripts
            .lock()
            .get(&backend)
            .map(|s| s.health_calls.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Payments this backend answered with 2xx.
    pub fn accepted(&self, backend: Backend) -> Vec<ProcessorPayment> {
        self.scripts
            .lock()
            .get(&backend)
            .map(|s| s.accepted.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl PaymentProcessor for MockProcessor {
    async fn submit(
        &self,
        backend: Backend,
        payment: &ProcessorPayment,
        timeout: Duration,
    ) -> Result<(), CallError> {
        let (behavior, call) = {
            let scripts = self.scripts.lock();
            let Some(script) = scripts.get(&backend) else {
                return Err(CallError::Transport(format!("no script for {backend}")));
            };
            let call = script.payment_calls.fetch_add(1, Ordering::SeqCst) + 1;
            (script.behavior.clone(), call)
        };

        let result = match behavior {
            MockBehavior::AlwaysSuccess => Ok(()),
            MockBehavior::AlwaysStatus(status) => Err(CallError::Status(status)),
            MockBehavior::FailFirst { n, status } if call <= n => Err(CallError::Status(status)),
            MockBehavior::FailFirst { .. } => Ok(()),
            MockBehavior::Delay(delay) => tokio::time::timeout(timeout, tokio::time::sleep(delay))
                .await
                .map_err(|_| CallError::Timeout),
        };

        if result.is_ok() {
            if let Some(script) = self.scripts.lock().get_mut(&backend) {
                script.accepted.push(payment.clone());
            }
        }
        result
    }

    async fn service_health(
        &self,
        backend: Backend,
        _timeout: Duration,
    ) -> Result<ServiceHealth, CallError> {
        let (health, delay) = {
            let scripts = self.scripts.lock();
            let Some(script) = scripts.get(&backend) else {
                return Err(CallError::Transport(format!("no script for {backend}")));
            };
            script.health_calls.fetch_add(1, Ordering::SeqCst);
            (script.health.clone(), script.health_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        health
    }
}
