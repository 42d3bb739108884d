use payments_router::config::AppConfig;
use payments_router::processors::http::HttpProcessor;
use payments_router::service::payment_service::PaymentService;
use payments_router::AppState;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let processor = Arc::new(HttpProcessor::new(
        cfg.default_processor_url.clone(),
        cfg.fallback_processor_url.clone(),
    ));
    tracing::info!(
        default = %cfg.default_processor_url,
        fallback = %cfg.fallback_processor_url,
        "using payment processors"
    );

    let payment_service = PaymentService::start(&cfg.engine, processor).await;
    let state = AppState {
        payment_service: payment_service.clone(),
    };
    let app = payments_router::app(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    payment_service.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
