use std::time::Duration;

use rand::Rng;

use crate::BackoffPolicy;

/// Which wait formula applies to a retryable failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitKind {
    /// Doubling backoff capped at [`BackoffPolicy::cap_ms`].
    Exponential,
    /// Server-directed wait (`Retry-After`), taken as-is.
    ServerDirected(Duration),
    /// Attempt-scaled backoff for edge-proxy blocks.
    EdgeBlock,
}

/// Result of asking the retry budget whether to go again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffDecision {
    pub wait: Duration,
    pub retry: bool,
}

/// Attempt counter for one logical call. Network failures and retryable
/// statuses draw from the same budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
    max_attempts: u32,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 1,
            max_attempts: max_attempts.max(1),
        }
    }

    /// 1-based number of the attempt in progress.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides what follows a retryable failure on the current attempt.
    /// The last attempt never sleeps.
    pub fn decide<R: Rng + ?Sized>(
        &self,
        policy: &BackoffPolicy,
        kind: WaitKind,
        rng: &mut R,
    ) -> BackoffDecision {
        if self.attempt >= self.max_attempts {
            return BackoffDecision {
                wait: Duration::ZERO,
                retry: false,
            };
        }
        BackoffDecision {
            wait: policy.delay(kind, self.attempt, rng),
            retry: true,
        }
    }

    pub fn advance(&mut self) {
        self.attempt = self.attempt.saturating_add(1);
    }
}

impl BackoffPolicy {
    /// Jitter-free exponential wait for a 1-based attempt.
    pub fn exponential_ms(&self, attempt: u32) -> u64 {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        self.base_ms.saturating_mul(factor).min(self.cap_ms)
    }

    /// Jitter-free edge-block wait for a 1-based attempt.
    pub fn edge_ms(&self, attempt: u32) -> u64 {
        self.edge_step_ms
            .saturating_mul(u64::from(attempt))
            .min(self.edge_cap_ms)
    }

    /// Full wait, jitter included.
    pub fn delay<R: Rng + ?Sized>(&self, kind: WaitKind, attempt: u32, rng: &mut R) -> Duration {
        let millis = match kind {
            WaitKind::Exponential => self
                .exponential_ms(attempt)
                .saturating_add(jitter(rng, self.jitter_ms)),
            WaitKind::ServerDirected(hint) => {
                let hint_ms = u64::try_from(hint.as_millis()).unwrap_or(u64::MAX);
                hint_ms.saturating_add(jitter(rng, self.jitter_ms))
            }
            WaitKind::EdgeBlock => self
                .edge_ms(attempt)
                .saturating_add(jitter(rng, self.edge_jitter_ms)),
        };
        Duration::from_millis(millis)
    }
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, upper_ms: u64) -> u64 {
    if upper_ms == 0 {
        0
    } else {
        rng.gen_range(0..upper_ms)
    }
}
