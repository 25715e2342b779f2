//! Reusable retry policy for API calls.
//!
//! Both guild operations share one backoff contract: a bounded attempt
//! count, a randomized delay band per failure class, and an optional pacing
//! delay slept before every request. Rate-limit (429) waits are dictated by
//! the server and handled at the call site with `retry_after_seconds`.

use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

/// Delay rules applied around every attempt of an API operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum attempts per operation.
    pub attempts: u32,
    /// Jitter band slept after a 500/503 response, seconds.
    pub server_error_delay: (f64, f64),
    /// Jitter band slept after a retryable network or status failure, seconds.
    pub network_delay: (f64, f64),
    /// When set, a jittered delay slept before every attempt. Used by the
    /// leave operation to pace outbound traffic regardless of outcome.
    pub pacing_delay: Option<(f64, f64)>,
    /// Wait applied for a 429 response missing a usable Retry-After header.
    pub fallback_retry_after: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            server_error_delay: (5.0, 10.0),
            network_delay: (3.0, 6.0),
            pacing_delay: None,
            fallback_retry_after: 5.0,
        }
    }
}

impl RetryPolicy {
    /// Default policy with a pacing band, for the leave operation.
    pub fn paced(pacing_delay: (f64, f64)) -> Self {
        Self {
            pacing_delay: Some(pacing_delay),
            ..Self::default()
        }
    }

    /// Policy with every delay band collapsed to zero. Tests use this to
    /// exercise retry flow without waiting out the jitter.
    pub fn immediate() -> Self {
        Self {
            attempts: 3,
            server_error_delay: (0.0, 0.0),
            network_delay: (0.0, 0.0),
            pacing_delay: None,
            fallback_retry_after: 0.0,
        }
    }

    /// Random delay drawn from an inclusive band.
    pub fn jitter(range: (f64, f64)) -> Duration {
        let (low, high) = range;
        if high <= low {
            return Duration::from_secs_f64(low.max(0.0));
        }
        Duration::from_secs_f64(rand::rng().random_range(low..=high))
    }

    /// Sleep the pacing delay, when one is configured.
    pub async fn pace(&self) {
        if let Some(range) = self.pacing_delay {
            sleep(Self::jitter(range)).await;
        }
    }

    pub async fn backoff_server_error(&self) {
        sleep(Self::jitter(self.server_error_delay)).await;
    }

    pub async fn backoff_network(&self) {
        sleep(Self::jitter(self.network_delay)).await;
    }

    /// Seconds to wait out a 429, honoring the server-supplied header.
    pub fn retry_after_seconds(&self, header: Option<&str>) -> f64 {
        header
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(self.fallback_retry_after)
    }
}
