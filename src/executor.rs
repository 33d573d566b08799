use std::{fmt, sync::Arc, time::Duration};

use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    backoff::{RetryState, WaitKind},
    classify::{classify, BlockDetector, MarkerBlockDetector, Outcome},
    ClientOptions, CrmError, RequestSpec, Result, RetryCause,
};

/// Sends [`RequestSpec`]s with bounded retries.
///
/// Network failures, 429, edge-proxy 403s and 5xx are retried inside one
/// attempt budget ([`ClientOptions::max_attempts`]). Every other status fails
/// immediately as [`CrmError::ClientFatal`]. Waits are async timers, so a
/// slow retry chain never blocks other tasks on the runtime.
#[derive(Clone)]
pub struct Executor {
    http: reqwest::Client,
    options: ClientOptions,
    detector: Arc<dyn BlockDetector>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

impl Executor {
    pub fn new(options: ClientOptions) -> Self {
        Self::with_http(reqwest::Client::new(), options)
    }

    /// Reuses an existing `reqwest` client (connection pool, proxies, TLS).
    pub fn with_http(http: reqwest::Client, options: ClientOptions) -> Self {
        Self {
            http,
            options,
            detector: Arc::new(MarkerBlockDetector::default()),
        }
    }

    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the edge-block predicate applied to 403 bodies.
    pub fn with_block_detector(mut self, detector: impl BlockDetector + 'static) -> Self {
        self.detector = Arc::new(detector);
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sends the request and decodes a 2xx JSON body into `T`.
    ///
    /// An empty success body decodes as JSON `null`.
    pub async fn send<T: DeserializeOwned>(&self, spec: &RequestSpec) -> Result<T> {
        self.send_with_cancel(spec, &CancellationToken::new()).await
    }

    /// Like [`Executor::send`], aborting with [`CrmError::Cancelled`] as soon
    /// as `cancel` fires, whether a dispatch or a backoff wait is pending.
    pub async fn send_with_cancel<T: DeserializeOwned>(
        &self,
        spec: &RequestSpec,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let body = self.execute(spec, cancel).await?;
        decode_body(&body)
    }

    async fn execute(&self, spec: &RequestSpec, cancel: &CancellationToken) -> Result<String> {
        let mut state = RetryState::new(self.options.max_attempts);

        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(spec, state.attempt())),
                outcome = self.dispatch(spec) => outcome,
            };

            let (cause, kind) = match outcome {
                Outcome::Success(body) => return Ok(body),
                Outcome::ClientFatal {
                    status,
                    body_preview,
                } => {
                    return Err(CrmError::ClientFatal {
                        method: spec.method().to_string(),
                        path: spec.path(),
                        status,
                        body_preview,
                    })
                }
                Outcome::RateLimited { retry_after } => (
                    RetryCause::RateLimited,
                    retry_after.map_or(WaitKind::Exponential, WaitKind::ServerDirected),
                ),
                Outcome::EdgeBlocked => (RetryCause::EdgeBlocked, WaitKind::EdgeBlock),
                Outcome::ServerTransient { status } => {
                    (RetryCause::ServerTransient(status), WaitKind::Exponential)
                }
                Outcome::NetworkFailure(err) => (RetryCause::Network(err), WaitKind::Exponential),
            };

            let decision = state.decide(&self.options.backoff, kind, &mut rand::thread_rng());
            if !decision.retry {
                tracing::error!(
                    layer = cause.layer(),
                    status_or_error = %cause.label(),
                    attempt = state.attempt(),
                    ceiling = state.max_attempts(),
                    method = %spec.method(),
                    path = %spec.path(),
                    "retry budget exhausted"
                );
                return Err(CrmError::RetryExhausted {
                    method: spec.method().to_string(),
                    path: spec.path(),
                    attempts: state.attempt(),
                    last: cause,
                });
            }

            tracing::warn!(
                layer = cause.layer(),
                status_or_error = %cause.label(),
                wait_ms = u64::try_from(decision.wait.as_millis()).unwrap_or(u64::MAX),
                attempt = state.attempt(),
                ceiling = state.max_attempts(),
                method = %spec.method(),
                path = %spec.path(),
                "retrying request"
            );

            wait(decision.wait, cancel)
                .await
                .map_err(|()| cancelled(spec, state.attempt()))?;
            state.advance();
        }
    }

    /// One attempt. Any received status is classified; a request or body-read
    /// error becomes [`Outcome::NetworkFailure`].
    async fn dispatch(&self, spec: &RequestSpec) -> Outcome {
        tracing::debug!(method = %spec.method(), url = %spec.url(), "dispatching request");

        let response = match spec.build(&self.http, self.options.timeout()).send().await {
            Ok(response) => response,
            Err(err) => return Outcome::NetworkFailure(err),
        };
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        match response.text().await {
            Ok(body) => classify(status, &headers, body, self.detector.as_ref()),
            Err(err) => Outcome::NetworkFailure(err),
        }
    }
}

async fn wait(duration: Duration, cancel: &CancellationToken) -> std::result::Result<(), ()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(()),
        _ = sleep(duration) => Ok(()),
    }
}

fn cancelled(spec: &RequestSpec, attempts: u32) -> CrmError {
    CrmError::Cancelled {
        method: spec.method().to_string(),
        path: spec.path(),
        attempts,
    }
}

fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    let text = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(text).map_err(|err| {
        CrmError::Decode(format!(
            "invalid response JSON: {err}; body: {}",
            crate::classify::body_preview(body)
        ))
    })
}
