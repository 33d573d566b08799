//! `crm-fx-sync` keeps an exchange-rate property on CRM deals in sync with
//! the official daily rate.
//!
//! Every CRM call goes through the [`Executor`], a retrying HTTP layer that
//! separates transient failures (network errors, 429, edge-proxy 403 blocks,
//! 5xx) from permanent ones (any other 4xx):
//! - [`CrmClient::search`]
//! - [`CrmClient::batch_update`]
//! - [`RateClient::fetch`]
//! - [`sync::run_sync`]

mod backoff;
mod classify;
mod client;
mod error;
mod executor;
mod options;
mod rate;
mod request;
mod types;
mod wire;

pub mod sync;

pub use backoff::{BackoffDecision, RetryState, WaitKind};
pub use classify::{
    body_preview, classify, parse_retry_after, BlockDetector, MarkerBlockDetector, Outcome,
    DEFAULT_BLOCK_MARKERS,
};
pub use client::{CrmClient, DEFAULT_BASE_URL, DEFAULT_OBJECT_TYPE};
pub use error::{CrmError, RetryCause};
pub use executor::Executor;
pub use options::{BackoffPolicy, ClientOptions};
pub use rate::{RateClient, DEFAULT_RATE_URL};
pub use request::RequestSpec;
pub use types::{
    BatchUpdateResponse, ExchangeRate, Filter, FilterGroup, FilterOperator, NextPage, Paging,
    Record, RecordUpdate, SearchRequest, SearchResponse,
};

pub type Result<T> = std::result::Result<T, CrmError>;
