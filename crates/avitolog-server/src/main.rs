mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use avitolog_api::scraper::AvitoScraper;
use avitolog_api::{AppState, AppStateInner, routes};
use avitolog_db::{AdStore, Database, MemoryAdStore};

use crate::config::{Config, StoreBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "avitolog=debug,avitolog_api=debug,avitolog_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;
    if config.has_placeholder_secret() {
        warn!("AVITOLOG_JWT_SECRET is unset or still a placeholder; tokens are forgeable");
    }

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);

    if let Some(title) = &config.header_title {
        db.set_header_title(title)?;
        info!("Header title set to {:?}", title);
    }

    let ads: Arc<dyn AdStore> = match config.ad_store {
        StoreBackend::Sqlite => db.clone(),
        StoreBackend::Memory => Arc::new(MemoryAdStore::new()),
    };
    info!("Ad store: {:?}", config.ad_store);

    let metadata = Arc::new(AvitoScraper::new(config.fetch_timeout)?);

    let state: AppState = Arc::new(AppStateInner {
        db,
        ads,
        metadata,
        jwt_secret: config.jwt_secret.clone(),
        token_ttl: config.token_ttl,
    });

    let app = routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Avitolog server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
