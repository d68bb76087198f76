use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::Gemini;
use apify_client::ApifyClient;
use hunter_common::{Config, StoreConfig};
use hunter_worker::store::{PgStore, PostgrestStore};
use hunter_worker::{Orchestrator, RecordStore, Scheduler};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("hunter=info".parse()?)
                .add_directive("hunter_worker=info".parse()?),
        )
        .init();

    info!("Lead hunter starting...");

    let config = Config::from_env()?;

    let records: Arc<dyn RecordStore> = match &config.store {
        StoreConfig::Postgres { database_url } => {
            let store = PgStore::connect(database_url).await?;
            store.migrate().await?;
            info!("Connected to Postgres");
            Arc::new(store)
        }
        StoreConfig::Postgrest { url, key } => {
            info!(url = url.as_str(), "Using PostgREST store");
            Arc::new(PostgrestStore::new(url, key.clone()))
        }
    };

    let ai = Arc::new(Gemini::new(config.google_api_key.clone(), config.gemini_model.clone()));
    let crawler = Arc::new(ApifyClient::new(config.apify_api_key.clone()).with_actor(config.apify_actor.clone()));

    let orchestrator = Orchestrator::new(ai, crawler, records, &config.language);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown requested, finishing current cycle");
                    cancel.cancel();
                }
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
            }
        });
    }

    let cycles = Scheduler::new(config.cycle_interval)
        .run(&orchestrator, cancel)
        .await;

    info!(cycles, "Lead hunter stopped");
    Ok(())
}
