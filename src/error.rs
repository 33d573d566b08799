/// Error type returned by this crate.
///
/// Retryable failures never surface on their own: the executor absorbs them
/// and only reports them wrapped in [`CrmError::RetryExhausted`].
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    /// Non-retryable HTTP status (auth, validation, not-found, unmarked 403).
    #[error("{method} {path} -> {status} | {body_preview}")]
    ClientFatal {
        method: String,
        path: String,
        status: u16,
        /// Response body truncated to at most 500 characters.
        body_preview: String,
    },
    /// Every attempt of the retry budget ended in a retryable failure.
    #[error("{method} {path} -> failed after {attempts} attempts: {last}")]
    RetryExhausted {
        method: String,
        path: String,
        attempts: u32,
        #[source]
        last: RetryCause,
    },
    /// The caller cancelled the call while it was in flight or backing off.
    #[error("{method} {path} -> cancelled after {attempts} attempts")]
    Cancelled {
        method: String,
        path: String,
        attempts: u32,
    },
    /// Request body encoding or response decoding failure.
    #[error("decode error: {0}")]
    Decode(String),
    /// Missing or invalid configuration (token, URLs).
    #[error("configuration error: {0}")]
    Config(String),
}

/// Last retryable failure observed before the budget ran out.
#[derive(Debug, thiserror::Error)]
pub enum RetryCause {
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("429 rate limited")]
    RateLimited,
    #[error("403 edge proxy block")]
    EdgeBlocked,
    #[error("{0} server error")]
    ServerTransient(u16),
}

impl RetryCause {
    /// Short label used in retry log lines.
    pub(crate) fn label(&self) -> String {
        match self {
            Self::Network(err) => format!("network: {err}"),
            Self::RateLimited => "429".to_owned(),
            Self::EdgeBlocked => "403 edge block".to_owned(),
            Self::ServerTransient(status) => status.to_string(),
        }
    }

    pub(crate) fn layer(&self) -> &'static str {
        match self {
            Self::Network(_) => "http",
            _ => "crm",
        }
    }
}
