use crate::domain::health::ProcessorHealth;
use crate::domain::payment::Backend;
use crate::processors::PaymentProcessor;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Polls each processor's health endpoint and keeps its record current.
#[derive(Clone)]
pub struct HealthMonitor {
    pub processor: Arc<dyn PaymentProcessor>,
    pub health: Arc<ProcessorHealth>,
    pub interval: Duration,
    pub probe_timeout: Duration,
}

impl HealthMonitor {
    /// One independent loop per processor; the first probe fires immediately.
    pub fn spawn(self, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        self.spawn_from(Instant::now(), shutdown)
    }

    /// Like [`HealthMonitor::spawn`], for callers that already ran an initial
    /// probe themselves.
    pub fn spawn_after_first_interval(self, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        let start = Instant::now() + self.interval;
        self.spawn_from(start, shutdown)
    }

    fn spawn_from(self, start: Instant, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        Backend::ALL
            .into_iter()
            .map(|backend| {
                let monitor = self.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move { monitor.run(backend, start, shutdown).await })
            })
            .collect()
    }

    async fn run(self, backend: Backend, start: Instant, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.probe(backend).await,
            }
        }
        tracing::debug!(%backend, "health monitor stopped");
    }

    /// Runs a single probe and records its result. Never takes longer than
    /// the probe timeout, whatever the processor implementation does.
    pub async fn probe(&self, backend: Backend) {
        let record = self.health.record(backend);
        let result = tokio::time::timeout(
            self.probe_timeout,
            self.processor.service_health(backend, self.probe_timeout),
        )
        .await;

        match result {
            Ok(Ok(health)) => {
                let was_healthy = record.observe(health);
                if was_healthy && health.failing {
                    tracing::warn!(%backend, "processor reports failing");
                } else if !was_healthy && !health.failing {
                    tracing::info!(
                        %backend,
                        min_response_time = health.min_response_time,
                        "processor recovered"
                    );
                }
            }
            Ok(Err(e)) => {
                if record.mark_unreachable() {
                    tracing::warn!(%backend, error = %e, "health probe failed");
                }
            }
            Err(_) => {
                if record.mark_unreachable() {
                    tracing::warn!(%backend, "health probe timed out");
                }
            }
        }
    }
}
