use payments_router::config::{EngineConfig, QueueFullPolicy, RetryPolicy};
use payments_router::domain::health::{ProcessorHealth, ServiceHealth, UNREACHABLE_RESPONSE_TIME_MS};
use payments_router::domain::payment::{Backend, PaymentRequest, PaymentSummary};
use payments_router::error::{AdmissionError, CallError};
use payments_router::processors::mock::{MockBehavior, MockProcessor};
use payments_router::service::payment_service::PaymentService;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

fn config(workers: usize, capacity: usize, policy: QueueFullPolicy) -> EngineConfig {
    EngineConfig {
        queue_capacity: capacity,
        queue_full_policy: policy,
        worker_count: workers,
        ..EngineConfig::default()
    }
}

fn payment(id: &str) -> PaymentRequest {
    PaymentRequest::new(id, dec!(100.00)).unwrap()
}

fn engine(mock: Arc<MockProcessor>, cfg: &EngineConfig) -> PaymentService {
    PaymentService::start_with_health(cfg, mock, Arc::new(ProcessorHealth::new()))
}

#[tokio::test(start_paused = true)]
async fn default_processor_handles_healthy_traffic() {
    let mock = Arc::new(MockProcessor::new());
    let svc = engine(mock.clone(), &config(2, 16, QueueFullPolicy::Block));

    let outcome = svc.submit(payment("p-1")).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.backend_used, Some(Backend::Default));
    assert_eq!(mock.payment_calls(Backend::Default), 1);
    assert_eq!(mock.payment_calls(Backend::Fallback), 0);

    let summary = svc.summary(None, None);
    assert_eq!(
        summary.default,
        PaymentSummary {
            total_requests: 1,
            total_amount: dec!(100.00)
        }
    );
    assert_eq!(summary.fallback, PaymentSummary::default());
    svc.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn exhausted_default_falls_back_and_books_under_fallback() {
    let mock = Arc::new(
        MockProcessor::new().with_behavior(Backend::Default, MockBehavior::AlwaysStatus(500)),
    );
    let svc = engine(mock.clone(), &config(1, 16, QueueFullPolicy::Block));

    let outcome = svc.submit(payment("p-2")).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.backend_used, Some(Backend::Fallback));
    assert_eq!(
        mock.payment_calls(Backend::Default),
        RetryPolicy::default().max_attempts()
    );
    assert_eq!(mock.payment_calls(Backend::Fallback), 1);

    let summary = svc.summary(None, None);
    assert_eq!(summary.default.total_requests, 0);
    assert_eq!(summary.fallback.total_requests, 1);
    assert_eq!(summary.fallback.total_amount, dec!(100.00));
    svc.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn no_healthy_processor_fails_without_calls() {
    let mock = Arc::new(MockProcessor::new());
    let health = Arc::new(ProcessorHealth::new());
    health.default.set(false, UNREACHABLE_RESPONSE_TIME_MS);
    health.fallback.set(false, UNREACHABLE_RESPONSE_TIME_MS);
    let svc = PaymentService::start_with_health(
        &config(1, 16, QueueFullPolicy::Block),
        mock.clone(),
        health,
    );

    let outcome = svc.submit(payment("p-3")).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.backend_used, None);
    assert_eq!(mock.total_payment_calls(), 0);
    assert_eq!(svc.summary(None, None).default, PaymentSummary::default());
    svc.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn start_routes_on_probed_health() {
    let mock = Arc::new(MockProcessor::new());
    mock.set_health(
        Backend::Default,
        Ok(ServiceHealth {
            failing: false,
            min_response_time: 40,
        }),
    );
    mock.set_health(
        Backend::Fallback,
        Ok(ServiceHealth {
            failing: false,
            min_response_time: 10,
        }),
    );
    let svc = PaymentService::start(&config(1, 16, QueueFullPolicy::Block), mock.clone()).await;
    assert_eq!(mock.health_calls(Backend::Default), 1);
    assert_eq!(mock.health_calls(Backend::Fallback), 1);

    let outcome = svc.submit(payment("p-4")).await.unwrap();
    assert_eq!(outcome.backend_used, Some(Backend::Fallback));
    assert_eq!(mock.payment_calls(Backend::Default), 0);
    svc.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn start_with_both_processors_down_rejects_payments() {
    let mock = Arc::new(MockProcessor::new());
    mock.set_health(Backend::Default, Err(CallError::Timeout));
    mock.set_health(Backend::Fallback, Err(CallError::Status(503)));
    let svc = PaymentService::start(&config(1, 16, QueueFullPolicy::Block), mock.clone()).await;

    let outcome = svc.submit(payment("p-5")).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(mock.total_payment_calls(), 0);
    svc.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn full_queue_blocks_producers_until_space_frees() {
    let mock = Arc::new(MockProcessor::new().with_behavior(
        Backend::Default,
        MockBehavior::Delay(Duration::from_millis(200)),
    ));
    let svc = engine(mock.clone(), &config(1, 1, QueueFullPolicy::Block));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let svc = svc.clone();
            tokio::spawn(async move { svc.submit(payment(&format!("b-{i}"))).await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(svc.queue.len(), 1);
    assert_eq!(svc.correlations.len(), 4);
    assert!(mock.accepted(Backend::Default).is_empty());

    for h in handles {
        assert!(h.await.unwrap().unwrap().success);
    }
    assert_eq!(mock.accepted(Backend::Default).len(), 4);
    svc.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn drop_oldest_fails_the_evicted_payment() {
    let mock = Arc::new(MockProcessor::new().with_behavior(
        Backend::Default,
        MockBehavior::Delay(Duration::from_millis(500)),
    ));
    let svc = engine(mock.clone(), &config(1, 1, QueueFullPolicy::DropOldest));

    let spawn = |id: &'static str| {
        let svc = svc.clone();
        tokio::spawn(async move { svc.submit(payment(id)).await })
    };

    let in_flight = spawn("d-1");
    tokio::time::sleep(Duration::from_millis(10)).await;
    let evicted = spawn("d-2");
    tokio::time::sleep(Duration::from_millis(10)).await;
    let newest = spawn("d-3");

    let evicted = evicted.await.unwrap().unwrap();
    assert!(!evicted.success);
    assert_eq!(evicted.correlation_id, "d-2");
    assert!(in_flight.await.unwrap().unwrap().success);
    assert!(newest.await.unwrap().unwrap().success);

    let ids: Vec<_> = mock
        .accepted(Backend::Default)
        .into_iter()
        .map(|p| p.correlation_id)
        .collect();
    assert_eq!(ids, vec!["d-1".to_string(), "d-3".to_string()]);
    svc.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn admission_timeout_does_not_cancel_processing() {
    let mock = Arc::new(MockProcessor::new().with_behavior(
        Backend::Default,
        MockBehavior::Delay(Duration::from_millis(1_000)),
    ));
    let mut cfg = config(1, 16, QueueFullPolicy::Block);
    cfg.admission_timeout = Duration::from_millis(300);
    let svc = engine(mock.clone(), &cfg);

    let err = svc.submit(payment("t-1")).await.unwrap_err();
    assert_eq!(err, AdmissionError::TimedOut);
    assert!(svc.correlations.is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(svc.summary(None, None).default.total_requests, 1);
    svc.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn duplicate_correlation_id_is_rejected_while_pending() {
    let mock = Arc::new(MockProcessor::new().with_behavior(
        Backend::Default,
        MockBehavior::Delay(Duration::from_millis(500)),
    ));
    let svc = engine(mock.clone(), &config(1, 16, QueueFullPolicy::Block));

    let first = {
        let svc = svc.clone();
        tokio::spawn(async move { svc.submit(payment("dup")).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let err = svc.submit(payment("dup")).await.unwrap_err();
    assert!(matches!(err, AdmissionError::DuplicateCorrelationId(id) if id == "dup"));
    assert!(first.await.unwrap().unwrap().success);
    assert_eq!(mock.payment_calls(Backend::Default), 1);

    // the id is free again once resolved
    assert!(svc.submit(payment("dup")).await.unwrap().success);
    svc.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_fails_queued_payments_and_closes_admission() {
    let mock = Arc::new(MockProcessor::new().with_behavior(
        Backend::Default,
        MockBehavior::Delay(Duration::from_millis(500)),
    ));
    let svc = engine(mock.clone(), &config(1, 16, QueueFullPolicy::Block));

    let handles: Vec<_> = ["s-1", "s-2", "s-3"]
        .into_iter()
        .map(|id| {
            let svc = svc.clone();
            let h = tokio::spawn(async move { svc.submit(payment(id)).await });
            (id, h)
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(svc.queue.len(), 2);

    svc.shutdown().await;
    assert!(svc.is_shutting_down());

    let mut succeeded = Vec::new();
    for (id, h) in handles {
        if h.await.unwrap().unwrap().success {
            succeeded.push(id);
        }
    }
    assert_eq!(succeeded, vec!["s-1"]);
    assert!(svc.correlations.is_empty());

    let err = svc.submit(payment("s-4")).await.unwrap_err();
    assert_eq!(err, AdmissionError::QueueClosed);
}

#[tokio::test(start_paused = true)]
async fn summary_window_filters_by_requested_at() {
    let mock = Arc::new(MockProcessor::new());
    let svc = engine(mock, &config(2, 16, QueueFullPolicy::Block));

    let base = chrono::DateTime::parse_from_rfc3339("2025-07-10T12:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    for (i, offset) in [0i64, 60, 120].into_iter().enumerate() {
        let req = PaymentRequest::with_requested_at(
            format!("w-{i}"),
            dec!(10.50),
            base + chrono::Duration::seconds(offset),
        )
        .unwrap();
        assert!(svc.submit(req).await.unwrap().success);
    }

    let window = svc.query_summary(
        Backend::Default,
        Some(base + chrono::Duration::seconds(60)),
        Some(base + chrono::Duration::seconds(120)),
    );
    assert_eq!(window.total_requests, 2);
    assert_eq!(window.total_amount, dec!(21.00));
    svc.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn late_outcome_never_reaches_a_resubmitted_id() {
    let mock = Arc::new(MockProcessor::new().with_behavior(
        Backend::Default,
        MockBehavior::Delay(Duration::from_millis(150)),
    ));
    let mut cfg = config(1, 16, QueueFullPolicy::Block);
    cfg.admission_timeout = Duration::from_millis(250);
    let svc = engine(mock.clone(), &cfg);

    let blocker = {
        let svc = svc.clone();
        tokio::spawn(async move { svc.submit(payment("z")).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let first = svc
        .submit(PaymentRequest::new("a", dec!(1)).unwrap())
        .await
        .unwrap_err();
    assert_eq!(first, AdmissionError::TimedOut);

    // the first "a" is still in flight and finishes before this one
    let second = svc
        .submit(PaymentRequest::new("a", dec!(2)).unwrap())
        .await
        .unwrap();
    assert!(second.success);
    assert_eq!(second.amount, dec!(2));

    assert!(blocker.await.unwrap().unwrap().success);
    let summary = svc.summary(None, None).default;
    assert_eq!(summary.total_requests, 3);
    assert_eq!(summary.total_amount, dec!(103));
    svc.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn blocked_admission_is_rejected_not_timed_out() {
    let mock = Arc::new(MockProcessor::new().with_behavior(
        Backend::Default,
        MockBehavior::Delay(Duration::from_millis(1_000)),
    ));
    let mut cfg = config(1, 1, QueueFullPolicy::Block);
    cfg.admission_timeout = Duration::from_millis(300);
    let svc = engine(mock.clone(), &cfg);

    let spawn = |id: &'static str| {
        let svc = svc.clone();
        tokio::spawn(async move { svc.submit(payment(id)).await })
    };
    let in_flight = spawn("q-1");
    tokio::time::sleep(Duration::from_millis(10)).await;
    let queued = spawn("q-2");
    tokio::time::sleep(Duration::from_millis(10)).await;

    let err = svc.submit(payment("q-3")).await.unwrap_err();
    assert_eq!(err, AdmissionError::QueueFull);

    assert_eq!(queued.await.unwrap().unwrap_err(), AdmissionError::TimedOut);
    assert_eq!(in_flight.await.unwrap().unwrap_err(), AdmissionError::TimedOut);
    assert!(svc.correlations.is_empty());

    tokio::time::sleep(Duration::from_secs(3)).await;
    let ids: Vec<_> = mock
        .accepted(Backend::Default)
        .into_iter()
        .map(|p| p.correlation_id)
        .collect();
    assert_eq!(ids, vec!["q-1".to_string(), "q-2".to_string()]);
    svc.shutdown().await;
}
