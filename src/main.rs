mod analysis;
mod api;
mod config;
mod db;
mod error;
mod language;
mod models;
mod store;

use dotenv::dotenv;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::db::PgSongStore;
use crate::language::LanguageClient;
use crate::store::{MemorySongStore, SongStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lyrics_insight=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    info!(project = %config.language.project_id, "Loaded configuration");

    let store: Arc<dyn SongStore> = match &config.database_url {
        Some(url) => {
            let pool = db::connect(url, config.db_max_connections).await?;
            db::init_db(&pool).await?;
            Arc::new(PgSongStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, songs and counters are kept in memory only");
            Arc::new(MemorySongStore::new())
        }
    };

    let state = Arc::new(api::AppState {
        language: LanguageClient::new(&config.language)?,
        store,
    });

    let app = api::router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("🎵 Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
