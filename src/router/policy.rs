use crate::config::RoutingPolicy;
use crate::domain::health::HealthSnapshot;
use crate::domain::payment::Backend;

/// Default is dropped in favour of a healthy fallback once its minimum
/// response time exceeds this multiple of the fallback's.
pub const LOAD_SHED_FACTOR: u64 = 3;

/// Picks the processor for one payment from a fresh snapshot of both health
/// records. `None` means neither processor may be called.
pub fn choose(
    default: &HealthSnapshot,
    fallback: &HealthSnapshot,
    policy: RoutingPolicy,
) -> Option<Backend> {
    if !default.is_healthy {
        return fallback.is_healthy.then_some(Backend::Fallback);
    }

    match policy {
        RoutingPolicy::HealthOnly => Some(Backend::Default),
        RoutingPolicy::LoadAware => {
            let threshold = fallback
                .min_response_time_ms
                .saturating_mul(LOAD_SHED_FACTOR);
            if fallback.is_healthy && default.min_response_time_ms > threshold {
                Some(Backend::Fallback)
            } else {
                Some(Backend::Default)
            }
        }
    }
}
