use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueFullPolicy {
    /// Callers wait for a free slot.
    Block,
    /// The oldest queued payment is evicted (and failed) to admit the new one.
    DropOldest,
}

impl FromStr for QueueFullPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" | "wait" => Ok(QueueFullPolicy::Block),
            "drop_oldest" | "drop-oldest" => Ok(QueueFullPolicy::DropOldest),
            other => Err(format!("unknown queue full policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingPolicy {
    /// Prefer the fallback when the default is markedly slower.
    LoadAware,
    /// Only switch to the fallback when the default is unhealthy.
    HealthOnly,
}

impl FromStr for RoutingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "load_aware" | "load-aware" => Ok(RoutingPolicy::LoadAware),
            "health_only" | "health-only" => Ok(RoutingPolicy::HealthOnly),
            other => Err(format!("unknown routing policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempt_timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: f64,
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_millis(1500),
            max_retries: 2,
            backoff_base: 1.5,
            backoff_unit: Duration::from_millis(100),
        }
    }
}

/// Options consumed by the admission/dispatch engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub queue_capacity: usize,
    pub queue_full_policy: QueueFullPolicy,
    pub worker_count: usize,
    pub health_check_interval: Duration,
    pub health_probe_timeout: Duration,
    pub retry: RetryPolicy,
    pub admission_timeout: Duration,
    pub routing_policy: RoutingPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            queue_full_policy: QueueFullPolicy::Block,
            worker_count: default_worker_count(),
            health_check_interval: Duration::from_secs(5),
            health_probe_timeout: Duration::from_secs(2),
            retry: RetryPolicy::default(),
            admission_timeout: Duration::from_secs(10),
            routing_policy: RoutingPolicy::LoadAware,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub default_processor_url: String,
    pub fallback_processor_url: String,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = EngineConfig::default();
        let retry = RetryPolicy {
            attempt_timeout: env_millis("ATTEMPT_TIMEOUT_MS", defaults.retry.attempt_timeout),
            max_retries: env_or("MAX_RETRIES", defaults.retry.max_retries),
            backoff_base: checked_backoff_base(
                env_or("RETRY_BACKOFF_BASE", defaults.retry.backoff_base),
                defaults.retry.backoff_base,
            ),
            backoff_unit: env_millis("RETRY_BACKOFF_UNIT_MS", defaults.retry.backoff_unit),
        };

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:9999".to_string()),
            default_processor_url: std::env::var("PROCESSOR_DEFAULT_URL")
                .unwrap_or_else(|_| "http://localhost:8001".to_string()),
            fallback_processor_url: std::env::var("PROCESSOR_FALLBACK_URL")
                .unwrap_or_else(|_| "http://localhost:8002".to_string()),
            engine: EngineConfig {
                queue_capacity: env_or("QUEUE_CAPACITY", defaults.queue_capacity).max(1),
                queue_full_policy: env_or("QUEUE_FULL_POLICY", defaults.queue_full_policy),
                worker_count: env_or("WORKER_COUNT", defaults.worker_count).max(1),
                health_check_interval: env_millis(
                    "HEALTH_CHECK_INTERVAL_MS",
                    defaults.health_check_interval,
                ),
                health_probe_timeout: env_millis(
                    "HEALTH_PROBE_TIMEOUT_MS",
                    defaults.health_probe_timeout,
                ),
                retry,
                admission_timeout: env_millis("ADMISSION_TIMEOUT_MS", defaults.admission_timeout),
                routing_policy: env_or("ROUTING_POLICY", defaults.routing_policy),
            },
        }
    }
}

pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 2
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparsable config value");
                default
            }
        },
        Err(_) => default,
    }
}

/// Accepted range for `RETRY_BACKOFF_BASE`.
pub const BACKOFF_BASE_RANGE: std::ops::RangeInclusive<f64> = 1.0..=10.0;

fn checked_backoff_base(base: f64, default: f64) -> f64 {
    if BACKOFF_BASE_RANGE.contains(&base) {
        base
    } else {
        tracing::warn!(
            value = base,
            fallback = default,
            "RETRY_BACKOFF_BASE out of range, using default"
        );
        default
    }
}

fn env_millis(key: &str, default: Duration) -> Duration {
    Duration::from_millis(env_or(key, default.as_millis() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_queue_policy() {
        assert_eq!("block".parse::<QueueFullPolicy>(), Ok(QueueFullPolicy::Block));
        assert_eq!(
            "Drop-Oldest".parse::<QueueFullPolicy>(),
            Ok(QueueFullPolicy::DropOldest)
        );
        assert!("lifo".parse::<QueueFullPolicy>().is_err());
    }

    #[test]
    fn parses_routing_policy() {
        assert_eq!("health_only".parse::<RoutingPolicy>(), Ok(RoutingPolicy::HealthOnly));
        assert_eq!("load-aware".parse::<RoutingPolicy>(), Ok(RoutingPolicy::LoadAware));
    }

    #[test]
    fn retries_count_on_top_of_first_attempt() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts(), 3);
    }

    #[test]
    fn out_of_range_backoff_base_falls_back() {
        assert_eq!(checked_backoff_base(2.0, 1.5), 2.0);
        assert_eq!(checked_backoff_base(f64::INFINITY, 1.5), 1.5);
        assert_eq!(checked_backoff_base(1e30, 1.5), 1.5);
        assert_eq!(checked_backoff_base(f64::NAN, 1.5), 1.5);
        assert_eq!(checked_backoff_base(0.5, 1.5), 1.5);
    }

    #[test]
    fn defaults_are_sane() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.queue_full_policy, QueueFullPolicy::Block);
        assert!(cfg.worker_count >= 2);
        assert_eq!(cfg.health_probe_timeout, Duration::from_secs(2));
    }
}
