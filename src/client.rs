use std::fmt;

use reqwest::{
    header::{HeaderValue, AUTHORIZATION},
    Method,
};
use tokio_util::sync::CancellationToken;

use crate::{
    wire::BatchUpdateBody, BatchUpdateResponse, BlockDetector, ClientOptions, CrmError, Executor,
    RecordUpdate, RequestSpec, Result, SearchRequest, SearchResponse,
};

/// Public HubSpot API host.
pub const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";

/// CRM object type used when none is configured.
pub const DEFAULT_OBJECT_TYPE: &str = "deals";

#[derive(Clone)]
/// Bearer-authenticated client for the CRM object search and batch-update
/// endpoints. All retry and failure handling lives in the [`Executor`].
pub struct CrmClient {
    executor: Executor,
    base_url: String,
    authorization: HeaderValue,
    object_type: String,
    cancel: CancellationToken,
}

impl fmt::Debug for CrmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrmClient")
            .field("base_url", &self.base_url)
            .field("object_type", &self.object_type)
            .field("token", &"<redacted>")
            .field("options", self.executor.options())
            .finish()
    }
}

impl CrmClient {
    /// Creates a client from a bearer token.
    ///
    /// If the token is missing the `Bearer ` prefix, it is added automatically.
    /// An empty token is rejected: calls without credentials can never succeed.
    pub fn new_bearer(base_url: impl Into<String>, token: impl AsRef<str>) -> Result<Self> {
        if token.as_ref().trim().is_empty() {
            return Err(CrmError::Config("CRM token is empty".to_owned()));
        }
        let mut authorization =
            HeaderValue::from_str(&normalize_bearer_authorization(token.as_ref()))
                .map_err(|_| CrmError::Config("CRM token is not a valid header value".to_owned()))?;
        authorization.set_sensitive(true);
        let base_url: String = base_url.into();

        Ok(Self {
            executor: Executor::default(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            authorization,
            object_type: DEFAULT_OBJECT_TYPE.to_owned(),
            cancel: CancellationToken::new(),
        })
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `HUBSPOT_TOKEN` — private app token (required)
    /// - `HUBSPOT_BASE_URL` — API host, defaults to [`DEFAULT_BASE_URL`]
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("HUBSPOT_TOKEN").map_err(|_| {
            CrmError::Config("missing HUBSPOT_TOKEN environment variable".to_owned())
        })?;
        let base_url = std::env::var("HUBSPOT_BASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        Self::new_bearer(base_url, token)
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.executor = self.executor.with_options(opts);
        self
    }

    /// Replaces the predicate that recognizes edge-proxy 403 pages.
    pub fn with_block_detector(mut self, detector: impl BlockDetector + 'static) -> Self {
        self.executor = self.executor.with_block_detector(detector);
        self
    }

    /// Targets another CRM object type (`contacts`, `companies`, ...).
    pub fn with_object_type(mut self, object_type: impl Into<String>) -> Self {
        self.object_type = object_type.into();
        self
    }

    /// Token observed by every call; cancelling it aborts in-flight retries.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs a search and returns one page of matching records.
    pub async fn search(&self, criteria: &SearchRequest) -> Result<SearchResponse> {
        let path = format!("/crm/v3/objects/{}/search", self.object_type);
        let spec = self.spec(Method::POST, &path, criteria)?;
        self.executor.send_with_cancel(&spec, &self.cancel).await
    }

    /// Writes property values on several records in one request.
    pub async fn batch_update(&self, updates: &[RecordUpdate]) -> Result<BatchUpdateResponse> {
        let path = format!("/crm/v3/objects/{}/batch/update", self.object_type);
        let spec = self.spec(Method::POST, &path, &BatchUpdateBody { inputs: updates })?;
        self.executor.send_with_cancel(&spec, &self.cancel).await
    }

    fn spec<T: serde::Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &T,
    ) -> Result<RequestSpec> {
        let url = format!("{}{path}", self.base_url);
        Ok(RequestSpec::json(method, &url, body)?
            .with_header(AUTHORIZATION, self.authorization.clone()))
    }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
