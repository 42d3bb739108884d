use crate::service::admission_queue::AdmissionQueue;
use crate::service::correlation::AdmittedPayment;
use crate::service::dispatcher::Dispatcher;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` workers draining `queue`. Each worker stops when the
    /// queue closes or `shutdown` is cancelled; a payment already taken off
    /// the queue is always finished first.
    pub fn spawn(
        size: usize,
        queue: Arc<AdmissionQueue<AdmittedPayment>>,
        dispatcher: Dispatcher,
        shutdown: CancellationToken,
    ) -> Self {
        let handles = (0..size.max(1))
            .map(|id| {
                let queue = queue.clone();
                let dispatcher = dispatcher.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    run_worker(id, queue, dispatcher, shutdown).await;
                })
            })
            .collect();
        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!("payment worker terminated abnormally: {}", e);
            }
        }
    }
}

async fn run_worker(
    id: usize,
    queue: Arc<AdmissionQueue<AdmittedPayment>>,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
) {
    tracing::debug!(worker = id, "payment worker started");
    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => None,
            req = queue.dequeue() => req,
        };
        let Some(req) = next else {
            break;
        };
        dispatcher.dispatch(req).await;
    }
    tracing::debug!(worker = id, "payment worker stopped");
}
