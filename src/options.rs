use std::time::Duration;

/// Configures HTTP timeout and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Total attempts per logical call, first attempt included.
    pub max_attempts: u32,
    /// Wait tuning between attempts.
    pub backoff: BackoffPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 20_000,
            max_attempts: 6,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl ClientOptions {
    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Backoff constants, all in milliseconds.
///
/// The generic branch (network errors, 429 without `Retry-After`, 5xx) waits
/// `min(cap_ms, base_ms * 2^(attempt-1)) + jitter` with jitter drawn from
/// `[0, jitter_ms)`. Edge blocks wait `min(edge_cap_ms, edge_step_ms * attempt)`
/// plus jitter from `[0, edge_jitter_ms)`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BackoffPolicy {
    pub base_ms: u64,
    pub cap_ms: u64,
    pub jitter_ms: u64,
    pub edge_step_ms: u64,
    pub edge_cap_ms: u64,
    pub edge_jitter_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_ms: 2_000,
            cap_ms: 30_000,
            jitter_ms: 1_500,
            edge_step_ms: 10_000,
            edge_cap_ms: 120_000,
            edge_jitter_ms: 3_000,
        }
    }
}

impl BackoffPolicy {
    /// A policy with every wait scaled down to at most a couple of
    /// milliseconds. Handy for tests and local tooling.
    pub fn immediate() -> Self {
        Self {
            base_ms: 1,
            cap_ms: 2,
            jitter_ms: 0,
            edge_step_ms: 1,
            edge_cap_ms: 2,
            edge_jitter_ms: 0,
        }
    }
}
