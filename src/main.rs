use anyhow::{bail, Context};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use layanan_aptika::attachments::AttachmentStore;
use layanan_aptika::cli::{Cli, Command};
use layanan_aptika::config::{self, AppConfig};
use layanan_aptika::database::seed::{run_sql_seeds, seed_memory};
use layanan_aptika::database::{Backend, DatabaseManager, MemoryStore, PgStore};
use layanan_aptika::notification::{DisabledNotifier, ExpoNotifier, Notifier};
use layanan_aptika::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL and the JWT secrets are picked up
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = config::config();
    info!("Starting layanan-aptika in {:?} mode", config.environment);

    match cli.command() {
        Command::Serve { port } => serve(config, port).await,
        Command::Migrate => {
            let pool = postgres_pool(config).await?;
            DatabaseManager::migrate(&pool).await?;
            Ok(())
        }
        Command::Seed { dir } => {
            let pool = postgres_pool(config).await?;
            let files = run_sql_seeds(&pool, &dir).await?;
            info!("Applied {} seed files from {}", files.len(), dir.display());
            Ok(())
        }
    }
}

async fn postgres_pool(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    if DatabaseManager::is_memory_url(&config.database.url) {
        bail!("DATABASE_URL points at the in-memory store; set a postgres:// URL");
    }
    Ok(DatabaseManager::connect(&config.database).await?)
}

fn notifier(config: &AppConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    if config.notification.enabled {
        let notifier = ExpoNotifier::new(&config.notification).context("building push client")?;
        info!("Push notifications go to {}", config.notification.endpoint);
        Ok(Arc::new(notifier))
    } else {
        info!("Push notifications disabled");
        Ok(Arc::new(DisabledNotifier))
    }
}

async fn serve(config: &AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    AttachmentStore::new(&config.storage.upload_dir)
        .ensure_dirs()
        .await
        .with_context(|| format!("creating upload directories under {}", config.storage.upload_dir.display()))?;

    if DatabaseManager::is_memory_url(&config.database.url) {
        warn!("Using the in-memory store; data is lost on restart");
        let store = MemoryStore::new();
        let password = std::env::var("DEV_SEED_PASSWORD").unwrap_or_else(|_| "rahasia123".to_string());
        seed_memory(&store, &password, config.security.bcrypt_cost)?;
        run(store, config, port).await
    } else {
        let pool = DatabaseManager::connect(&config.database).await?;
        if config.database.run_migrations {
            DatabaseManager::migrate(&pool).await?;
        }
        run(PgStore::new(pool), config, port).await
    }
}

async fn run<S: Backend>(store: S, config: &AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    let state = AppState::new(store, config, notifier(config)?).context("JWT configuration")?;
    let router = app(state, config);

    let bind_addr = format!("0.0.0.0:{}", port.unwrap_or(config.server.port));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("layanan-aptika listening on http://{}", bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
