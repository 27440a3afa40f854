use std::net::SocketAddr;

use anyhow::{Context, Result};
use domain::models::Taxonomy;
use persistence::repositories::SettingRepository;
use tracing::info;

use complaint_portal_api::{app, config, middleware, services::SettingsCache};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load()?;

    middleware::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;
    middleware::init_metrics().context("failed to install metrics recorder")?;

    info!("Starting complaint portal API v{}", env!("CARGO_PKG_VERSION"));

    let db_config: persistence::DatabaseConfig = (&config.database).into();
    let pool = persistence::create_pool(&db_config).await?;

    info!("Running database migrations...");
    persistence::run_migrations(&pool).await?;
    info!("Migrations completed");

    let setting_repo = SettingRepository::new(pool.clone());
    let seeded = setting_repo.seed_taxonomy(&Taxonomy::default_seed()).await?;
    if seeded > 0 {
        info!(rows = seeded, "Seeded default taxonomy");
    }
    let settings = SettingsCache::load(&setting_repo).await?;

    tokio::fs::create_dir_all(&config.storage.root_dir)
        .await
        .with_context(|| format!("failed to create {}", config.storage.root_dir))?;

    let addr = config.socket_addr()?;
    let app = app::create_app(config, pool, settings);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
