mod config;
mod infrahub;
mod ipam;
mod seed;
mod utils;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use infrahub::{GraphStore, InfrahubClient, MemoryStore, SavePolicy};
use ipam::AddressPools;
use seed::{SeedContext, SeedOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edge_seed=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let cfg = Config::load();
    cfg.validate()?;
    let scenarios = cfg.parsed_scenarios()?;
    tracing::info!("Starting Edge-Seed");
    tracing::info!("Infrahub: {}", cfg.infrahub_address);
    tracing::info!("Branch: {}", cfg.branch);
    tracing::info!("Sites: {}", cfg.sites.join(", "));

    let client: Arc<dyn GraphStore> = if cfg.dry_run {
        tracing::info!("Dry run: writing to an in-memory store");
        Arc::new(MemoryStore::new(&cfg.branch))
    } else {
        let client = InfrahubClient::new(cfg.infrahub_address.clone(), cfg.api_token.clone(), cfg.timeout_secs)?;
        if !client.test_connection().await {
            tracing::warn!("Infrahub at {} did not answer the connectivity probe", cfg.infrahub_address);
        }
        Arc::new(client)
    };

    let pools = AddressPools::from_cidrs(&cfg.internal_pool, &cfg.external_pool, &cfg.management_pool)?;
    let options = SeedOptions {
        policy: SavePolicy {
            upsert: cfg.upsert,
            allow_update: cfg.upsert,
            fetch_on_failure: cfg.fetch_on_failure,
        },
        batch_size: cfg.batch_size,
    };

    let mut ctx = SeedContext::new(client, &cfg.branch, pools, options);
    let summary = seed::run(&mut ctx, &cfg.sites, &scenarios, cfg.scenario_site()).await?;

    tracing::info!("{}", summary.message);
    tracing::info!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
