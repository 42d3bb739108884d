use crate::domain::payment::Backend;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

/// `minResponseTime` recorded when a probe fails.
pub const UNREACHABLE_RESPONSE_TIME_MS: u64 = u64::MAX;

/// Body of `GET <processor>/payments/service-health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub failing: bool,
    pub min_response_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub is_healthy: bool,
    pub min_response_time_ms: u64,
    pub last_checked_ms: Option<i64>,
}

impl HealthSnapshot {
    pub fn healthy(min_response_time_ms: u64) -> Self {
        Self {
            is_healthy: true,
            min_response_time_ms,
            last_checked_ms: None,
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            is_healthy: false,
            min_response_time_ms: UNREACHABLE_RESPONSE_TIME_MS,
            last_checked_ms: None,
        }
    }
}

/// Latest health observation of one processor.
///
/// Written by that processor's monitor loop only, read by every worker. Each
/// field is an independent atomic; readers may observe a fresh `is_healthy`
/// next to a previous `min_response_time`.
#[derive(Debug)]
pub struct HealthRecord {
    healthy: AtomicBool,
    min_response_time_ms: AtomicU64,
    last_checked_ms: AtomicI64,
}

impl Default for HealthRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRecord {
    pub fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            min_response_time_ms: AtomicU64::new(0),
            last_checked_ms: AtomicI64::new(0),
        }
    }

    #[cfg(test)]
    pub fn from_snapshot(snapshot: HealthSnapshot) -> Self {
        let record = Self::new();
        record.set(snapshot.is_healthy, snapshot.min_response_time_ms);
        record
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub fn min_response_time_ms(&self) -> u64 {
        self.min_response_time_ms.load(Ordering::Acquire)
    }

    pub fn set(&self, is_healthy: bool, min_response_time_ms: u64) {
        self.min_response_time_ms
            .store(min_response_time_ms, Ordering::Release);
        self.healthy.store(is_healthy, Ordering::Release);
    }

    /// Applies a successful probe. Returns the previous `is_healthy`.
    pub fn observe(&self, health: ServiceHealth) -> bool {
        self.touch();
        self.min_response_time_ms
            .store(health.min_response_time, Ordering::Release);
        self.healthy.swap(!health.failing, Ordering::AcqRel)
    }

    /// Applies a failed probe. Returns the previous `is_healthy`.
    pub fn mark_unreachable(&self) -> bool {
        self.touch();
        self.min_response_time_ms
            .store(UNREACHABLE_RESPONSE_TIME_MS, Ordering::Release);
        self.healthy.swap(false, Ordering::AcqRel)
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let last = self.last_checked_ms.load(Ordering::Acquire);
        HealthSnapshot {
            is_healthy: self.is_healthy(),
            min_response_time_ms: self.min_response_time_ms(),
            last_checked_ms: (last > 0).then_some(last),
        }
    }

    fn touch(&self) {
        self.last_checked_ms
            .store(chrono::Utc::now().timestamp_millis(), Ordering::Release);
    }
}

/// Health records of both processors.
#[derive(Debug, Default)]
pub struct ProcessorHealth {
    pub default: HealthRecord,
    pub fallback: HealthRecord,
}

impl ProcessorHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, backend: Backend) -> &HealthRecord {
        match backend {
            Backend::Default => &self.default,
            Backend::Fallback => &self.fallback,
        }
    }
}
