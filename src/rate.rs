use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{wire::RatePayload, ClientOptions, Executor, ExchangeRate, RequestSpec, Result};

/// Official dollar quote, selling side.
pub const DEFAULT_RATE_URL: &str = "https://dolarapi.com/v1/dolares/oficial";

const RATE_TIMEOUT: Duration = Duration::from_secs(15);

/// Unauthenticated source of the daily exchange rate.
#[derive(Clone, Debug)]
pub struct RateClient {
    executor: Executor,
    url: String,
    cancel: CancellationToken,
}

impl Default for RateClient {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_URL)
    }
}

impl RateClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            executor: Executor::default(),
            url: url.into(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.executor = self.executor.with_options(opts);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetches the current rate with a 15 second per-call timeout.
    pub async fn fetch(&self) -> Result<ExchangeRate> {
        let spec = RequestSpec::get(&self.url)?.with_timeout(RATE_TIMEOUT);
        let payload: RatePayload = self.executor.send_with_cancel(&spec, &self.cancel).await?;
        Ok(ExchangeRate {
            rate: payload.venta,
            updated_at: payload.fecha_actualizacion,
        })
    }
}
