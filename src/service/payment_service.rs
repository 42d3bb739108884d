use crate::config::EngineConfig;
use crate::domain::health::{HealthSnapshot, ProcessorHealth};
use crate::domain::payment::{
    Backend, PaymentOutcome, PaymentRequest, PaymentSummary, PaymentsSummaryResponse,
};
use crate::error::{AdmissionError, QueueError};
use crate::ledger::Ledger;
use crate::processors::PaymentProcessor;
use crate::service::admission_queue::AdmissionQueue;
use crate::service::correlation::{AdmittedPayment, CorrelationTable};
use crate::service::dispatcher::Dispatcher;
use crate::service::health_monitor::HealthMonitor;
use crate::service::worker_pool::WorkerPool;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Admission entry point of the gateway. Cheap to clone; all clones share
/// the same queue, workers and ledger.
#[derive(Clone)]
pub struct PaymentService {
    pub queue: Arc<AdmissionQueue<AdmittedPayment>>,
    pub correlations: Arc<CorrelationTable>,
    pub ledger: Arc<Ledger>,
    pub health: Arc<ProcessorHealth>,
    pub admission_timeout: Duration,
    shutdown: CancellationToken,
    workers: Arc<Mutex<Option<WorkerPool>>>,
    monitors: Arc<Mutex<Vec<tokio::task::JoinHandle<()>>>>,
}

impl PaymentService {
    /// Builds the engine and starts its background tasks. Both processors are
    /// probed once before this returns so the first payments are routed on
    /// real health data.
    pub async fn start(config: &EngineConfig, processor: Arc<dyn PaymentProcessor>) -> Self {
        let health = Arc::new(ProcessorHealth::new());
        let monitor = HealthMonitor {
            processor: processor.clone(),
            health: health.clone(),
            interval: config.health_check_interval,
            probe_timeout: config.health_probe_timeout,
        };
        futures::future::join_all(Backend::ALL.map(|b| monitor.probe(b))).await;

        let service = Self::build(config, processor, health);
        let monitors = monitor.spawn_after_first_interval(service.shutdown.clone());
        *service.monitors.lock() = monitors;
        service
    }

    /// Builds the engine without health monitoring; `health` is used as-is.
    pub fn start_with_health(
        config: &EngineConfig,
        processor: Arc<dyn PaymentProcessor>,
        health: Arc<ProcessorHealth>,
    ) -> Self {
        Self::build(config, processor, health)
    }

    fn build(
        config: &EngineConfig,
        processor: Arc<dyn PaymentProcessor>,
        health: Arc<ProcessorHealth>,
    ) -> Self {
        let queue = Arc::new(AdmissionQueue::new(
            config.queue_capacity,
            config.queue_full_policy,
        ));
        let correlations = Arc::new(CorrelationTable::new());
        let ledger = Arc::new(Ledger::new());
        let shutdown = CancellationToken::new();

        let dispatcher = Dispatcher {
            processor,
            health: health.clone(),
            correlations: correlations.clone(),
            ledger: ledger.clone(),
            retry: config.retry,
            routing: config.routing_policy,
        };
        let workers = WorkerPool::spawn(
            config.worker_count,
            queue.clone(),
            dispatcher,
            shutdown.clone(),
        );
        tracing::info!(
            workers = workers.size(),
            queue_capacity = queue.capacity(),
            policy = ?queue.policy(),
            "payment engine started"
        );

        Self {
            queue,
            correlations,
            ledger,
            health,
            admission_timeout: config.admission_timeout,
            shutdown,
            workers: Arc::new(Mutex::new(Some(workers))),
            monitors: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Admits `req` and waits for its outcome. A single deadline of
    /// `admission_timeout` covers both phases: a payment that never reached
    /// the queue is rejected with `QueueFull`, one that was queued but not
    /// resolved in time yields `TimedOut` and keeps being processed.
    pub async fn submit(&self, req: PaymentRequest) -> Result<PaymentOutcome, AdmissionError> {
        let correlation_id = req.correlation_id.clone();
        let waiter = self.correlations.register(&correlation_id)?;
        let ticket = waiter.ticket;
        let deadline = Instant::now() + self.admission_timeout;

        let admitted = AdmittedPayment {
            ticket,
            request: req,
        };
        match tokio::time::timeout_at(deadline, self.queue.enqueue(admitted)).await {
            Ok(Ok(None)) => {}
            Ok(Ok(Some(evicted))) => {
                tracing::warn!(
                    correlation_id = %evicted.request.correlation_id,
                    "queue full, evicting oldest payment"
                );
                self.correlations
                    .resolve(evicted.ticket, PaymentOutcome::failed(&evicted.request));
            }
            Ok(Err(QueueError::Closed)) => {
                self.correlations.abandon(&correlation_id, ticket);
                return Err(AdmissionError::QueueClosed);
            }
            Err(_) => {
                self.correlations.abandon(&correlation_id, ticket);
                tracing::warn!(correlation_id = %correlation_id, "admission queue stayed full");
                return Err(AdmissionError::QueueFull);
            }
        }

        let mut receiver = waiter.receiver;
        match tokio::time::timeout_at(deadline, &mut receiver).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => {
                self.correlations.abandon(&correlation_id, ticket);
                Err(AdmissionError::QueueClosed)
            }
            Err(_) => {
                // The worker may have resolved the entry just as the timer fired.
                if let Ok(outcome) = receiver.try_recv() {
                    return Ok(outcome);
                }
                self.correlations.abandon(&correlation_id, ticket);
                tracing::warn!(correlation_id = %correlation_id, "payment admission timed out");
                Err(AdmissionError::TimedOut)
            }
        }
    }

    pub fn query_summary(
        &self,
        backend: Backend,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> PaymentSummary {
        self.ledger.query(backend, from, to)
    }

    pub fn summary(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> PaymentsSummaryResponse {
        PaymentsSummaryResponse {
            default: self.query_summary(Backend::Default, from, to),
            fallback: self.query_summary(Backend::Fallback, from, to),
        }
    }

    pub fn health_snapshot(&self, backend: Backend) -> HealthSnapshot {
        self.health.record(backend).snapshot()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stops admissions, fails every payment still queued, and waits for the
    /// workers to finish what they already picked up.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let drained = self.queue.close();
        if !drained.is_empty() {
            tracing::warn!(count = drained.len(), "failing queued payments on shutdown");
        }
        for queued in drained {
            self.correlations
                .resolve(queued.ticket, PaymentOutcome::failed(&queued.request));
        }

        let monitors = std::mem::take(&mut *self.monitors.lock());
        for handle in monitors {
            let _ = handle.await;
        }
        let workers = self.workers.lock().take();
        if let Some(workers) = workers {
            workers.join().await;
        }
        tracing::info!("payment engine stopped");
    }
}
