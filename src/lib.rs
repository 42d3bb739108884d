pub mod config;
pub mod domain {
    pub mod health;
    pub mod payment;
}
pub mod error;
pub mod http {
    pub mod handlers {
        pub mod ops;
        pub mod payments;
        pub mod summary;
    }
}
pub mod ledger;
pub mod processors;
pub mod router {
    pub mod policy;
}
pub mod service {
    pub mod admission_queue;
    pub mod correlation;
    pub mod dispatcher;
    pub mod health_monitor;
    pub mod payment_service;
    pub mod retry_orchestrator;
    pub mod worker_pool;
}

use axum::routing::{get, post};
use axum::Router;

#[derive(Clone)]
pub struct AppState {
    pub payment_service: service::payment_service::PaymentService,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/payments", post(http::handlers::payments::create_payment))
        .route(
            "/payments-summary",
            get(http::handlers::summary::get_payments_summary),
        )
        .route("/ops/readiness", get(http::handlers::ops::readiness))
        .route("/ops/liveness", get(http::handlers::ops::liveness))
        .with_state(state)
}
