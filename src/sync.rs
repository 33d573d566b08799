//! The periodic job: stamp recently modified deals with the current rate.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{
    rate::DEFAULT_RATE_URL, CrmClient, CrmError, ExchangeRate, Filter, FilterOperator, RateClient,
    RecordUpdate, Result, SearchRequest,
};

pub const DEFAULT_RATE_PROPERTY: &str = "tc_presupuesto_ars_usd";
pub const DEFAULT_DATE_PROPERTY: &str = "fecha_tc_presupuesto";
const AMOUNT_PROPERTY: &str = "amount";
const LAST_MODIFIED_PROPERTY: &str = "hs_lastmodifieddate";

/// Job tuning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncSettings {
    pub rate_property: String,
    pub date_property: String,
    /// How far back to look for modified records.
    pub lookback: Duration,
    /// Page size of the single search request.
    pub search_limit: u32,
    /// Upper bound of the random delay before the job starts.
    pub start_jitter: Duration,
    pub rate_url: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            rate_property: DEFAULT_RATE_PROPERTY.to_owned(),
            date_property: DEFAULT_DATE_PROPERTY.to_owned(),
            lookback: Duration::from_secs(10 * 60),
            search_limit: 100,
            start_jitter: Duration::from_secs(20),
            rate_url: DEFAULT_RATE_URL.to_owned(),
        }
    }
}

impl SyncSettings {
    /// Defaults overridden by `FX_LOOKBACK_MINUTES`, `FX_START_JITTER_MS` and
    /// `FX_RATE_URL` when set.
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();
        if let Some(minutes) = env_u64("FX_LOOKBACK_MINUTES")? {
            settings.lookback = Duration::from_secs(minutes.saturating_mul(60));
        }
        if let Some(millis) = env_u64("FX_START_JITTER_MS")? {
            settings.start_jitter = Duration::from_millis(millis);
        }
        if let Ok(url) = std::env::var("FX_RATE_URL") {
            if !url.trim().is_empty() {
                settings.rate_url = url;
            }
        }
        Ok(settings)
    }
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| {
                CrmError::Config(format!("{name} must be a non-negative integer, got '{raw}'"))
            }),
        Err(_) => Ok(None),
    }
}

/// What one run did.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncReport {
    pub rate: ExchangeRate,
    /// Records modified inside the lookback window.
    pub found: usize,
    /// Records with a non-empty amount, all of which were updated.
    pub updated: usize,
}

/// Runs the job against the current clock.
pub async fn run_sync(
    crm: &CrmClient,
    rates: &RateClient,
    settings: &SyncSettings,
) -> Result<SyncReport> {
    run_sync_at(crm, rates, settings, Utc::now()).await
}

/// Runs the job as if the clock read `now`.
pub async fn run_sync_at(
    crm: &CrmClient,
    rates: &RateClient,
    settings: &SyncSettings,
    now: DateTime<Utc>,
) -> Result<SyncReport> {
    let rate = rates.fetch().await?;
    tracing::info!(rate = rate.rate, updated_at = %rate.updated_at, "fetched exchange rate");

    let since = lookback_start(now, settings.lookback)?;
    let criteria = SearchRequest::new(
        vec![Filter::new(LAST_MODIFIED_PROPERTY, FilterOperator::Gte, since)],
        [AMOUNT_PROPERTY, settings.rate_property.as_str()],
        settings.search_limit,
    );
    let page = crm.search(&criteria).await?;
    let found = page.results.len();

    let updates = rate_updates(&page.results, &rate, settings);
    tracing::info!(found, eligible = updates.len(), "searched recently modified records");

    if updates.is_empty() {
        tracing::info!("no records to update");
        return Ok(SyncReport {
            rate,
            found,
            updated: 0,
        });
    }

    crm.batch_update(&updates).await?;
    tracing::info!(updated = updates.len(), "batch update completed");

    Ok(SyncReport {
        rate,
        found,
        updated: updates.len(),
    })
}

fn lookback_start(now: DateTime<Utc>, lookback: Duration) -> Result<String> {
    let lookback = chrono::Duration::from_std(lookback)
        .map_err(|_| CrmError::Config("lookback window is too large".to_owned()))?;
    let since = now
        .checked_sub_signed(lookback)
        .ok_or_else(|| CrmError::Config("lookback window is too large".to_owned()))?;
    Ok(since.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Updates for every record carrying a non-empty amount.
fn rate_updates(
    records: &[crate::Record],
    rate: &ExchangeRate,
    settings: &SyncSettings,
) -> Vec<RecordUpdate> {
    let rate_value = rate.rate.to_string();
    let date_value = rate.date().to_owned();
    records
        .iter()
        .filter(|record| record.property(AMOUNT_PROPERTY).is_some())
        .map(|record| {
            RecordUpdate::new(
                record.id.clone(),
                [
                    (settings.rate_property.clone(), rate_value.clone()),
                    (settings.date_property.clone(), date_value.clone()),
                ],
            )
        })
        .collect()
}
