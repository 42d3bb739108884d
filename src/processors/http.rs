use crate::domain::health::ServiceHealth;
use crate::domain::payment::{Backend, ProcessorPayment};
use crate::error::CallError;
use crate::processors::PaymentProcessor;
use std::time::Duration;

pub struct HttpProcessor {
    pub default_base_url: String,
    pub fallback_base_url: String,
    pub client: reqwest::Client,
}

impl HttpProcessor {
    pub fn new(default_base_url: impl Into<String>, fallback_base_url: impl Into<String>) -> Self {
        Self {
            default_base_url: default_base_url.into(),
            fallback_base_url: fallback_base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn base_url(&self, backend: Backend) -> &str {
        let url = match backend {
            Backend::Default => &self.default_base_url,
            Backend::Fallback => &self.fallback_base_url,
        };
        url.trim_end_matches('/')
    }
}

#[async_trait::async_trait]
impl PaymentProcessor for HttpProcessor {
    async fn submit(
        &self,
        backend: Backend,
        payment: &ProcessorPayment,
        timeout: Duration,
    ) -> Result<(), CallError> {
        let url = format!("{}/payments", self.base_url(backend));
        let resp = self
            .client
            .post(url)
            .json(payment)
            .timeout(timeout)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!(
                %backend,
                status = status.as_u16(),
                body = %body.chars().take(200).collect::<String>(),
                "processor rejected payment"
            );
            Err(CallError::Status(status.as_u16()))
        }
    }

    async fn service_health(
        &self,
        backend: Backend,
        timeout: Duration,
    ) -> Result<ServiceHealth, CallError> {
        let url = format!("{}/payments/service-health", self.base_url(backend));
        let resp = self.client.get(url).timeout(timeout).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CallError::Status(status.as_u16()));
        }
        let health = resp.json::<ServiceHealth>().await?;
        Ok(health)
    }
}
