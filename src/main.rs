use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pr_dispenser::store::SqliteStore;
use pr_dispenser::{api, db, server, Config, Dispenser};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "pr_dispenser=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    let engine = config.dispenser_config()?;

    log::info!("Opening database at {}", config.database.display());
    let pool = db::initialize(&config.database).await?;

    let dispenser = Dispenser::new(Arc::new(SqliteStore::new(pool)), engine);
    let app = api::router(Arc::new(dispenser));

    let listener = server::bind(config.listen_addr()).await?;
    server::serve(listener, app, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for ctrl-c: {}", e);
        }
    })
    .await?;

    Ok(())
}
