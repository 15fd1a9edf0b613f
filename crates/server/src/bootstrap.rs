//! Startup wiring. Configuration is validated first, the database is
//! connected and migrated, and the phrase index is embedded once; a failure
//! in any step aborts startup instead of serving with a broken dependency.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use bookline_core::catalog::{ExtractionPipeline, FetchError, HttpPageFetcher};
use bookline_core::config::{AppConfig, ConfigError, LoadOptions};
use bookline_core::embeddings::{EmbeddingError, HttpEmbeddingClient};
use bookline_core::intent::{phrase_catalog, IntentIndex, IntentResolver};
use bookline_db::{connect, migrations, DbPool, SqliteSessionStore};
use bookline_line::client::{HttpReplyClient, ReplyError};

use crate::handler::UtteranceHandler;
use crate::routes::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("embedding provider setup failed: {0}")]
    Embeddings(#[from] EmbeddingError),
    #[error("catalog fetcher setup failed: {0}")]
    Fetcher(#[from] FetchError),
    #[error("reply client setup failed: {0}")]
    ReplyClient(#[from] ReplyError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = prepare_database(&config).await?;
    info!(
        event_name = "system.bootstrap.database_ready",
        correlation_id = "bootstrap",
        "database connected and migrated"
    );

    let embedding_client = Arc::new(HttpEmbeddingClient::from_config(&config.embeddings)?);
    // Embeds every canonical phrase up front; the index stays frozen for the
    // lifetime of the process.
    let index = IntentIndex::build(embedding_client.as_ref(), phrase_catalog()).await?;
    let resolver =
        IntentResolver::new(embedding_client, index, config.intent.distance_threshold);
    info!(
        event_name = "system.bootstrap.intent_index_ready",
        correlation_id = "bootstrap",
        threshold = config.intent.distance_threshold,
        "intent phrase index embedded"
    );

    let fetcher =
        HttpPageFetcher::new(Duration::from_secs(config.catalog.fetch_timeout_secs.max(1)))?;
    let pipeline = ExtractionPipeline::new(Arc::new(fetcher), config.catalog.base_url.as_str());

    let sessions = Arc::new(SqliteSessionStore::new(db_pool.clone()));
    let handler = UtteranceHandler::new(resolver, pipeline, sessions);

    let reply_client = HttpReplyClient::new(
        &config.line.api_base,
        config.line.channel_token.clone(),
        Duration::from_secs(config.line.timeout_secs.max(1)),
    )?;

    let state = AppState {
        handler: Arc::new(handler),
        channel_secret: config.line.channel_secret.clone(),
        reply_client: Arc::new(reply_client),
    };

    Ok(Application { config, db_pool, state })
}

async fn prepare_database(config: &AppConfig) -> Result<DbPool, BootstrapError> {
    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    Ok(db_pool)
}
