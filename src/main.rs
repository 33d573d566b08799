use std::time::Duration;

use anyhow::Context;
use crm_fx_sync::{sync::SyncSettings, CrmClient, RateClient};
use rand::Rng;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %format!("{err:#}"), "sync failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let crm = CrmClient::from_env().context("could not configure CRM client")?;
    let settings = SyncSettings::from_env().context("invalid sync settings")?;
    let rates = RateClient::new(settings.rate_url.clone());

    // Spread runs so scheduled instances don't hit the API in lockstep.
    let jitter_ms = u64::try_from(settings.start_jitter.as_millis()).unwrap_or(u64::MAX);
    if jitter_ms > 0 {
        let delay_ms = rand::thread_rng().gen_range(0..jitter_ms);
        tracing::debug!(delay_ms, "start jitter");
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    let report = crm_fx_sync::sync::run_sync(&crm, &rates, &settings).await?;
    tracing::info!(
        rate = report.rate.rate,
        found = report.found,
        updated = report.updated,
        "sync completed"
    );
    Ok(())
}
