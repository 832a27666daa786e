//! Wiring shared by the commands: store, index, embedder and chat service
//! built from one `AppConfig`.

use jobsuite_agent::{ChatService, Orchestrator, SessionStore};
use jobsuite_config::AppConfig;
use jobsuite_core::event::EventBus;
use jobsuite_core::index::{Embedder, VectorIndex};
use jobsuite_core::listing::RelationalStore;
use jobsuite_index::{IndexSync, LocalEmbedder, SqliteIndex};
use jobsuite_providers::RemoteEmbedder;
use jobsuite_providers::router::{decision_provider, embedding_provider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct Runtime {
    pub config: AppConfig,
    pub store: Arc<dyn RelationalStore>,
    pub index: Arc<dyn VectorIndex>,
    pub embedder: Arc<dyn Embedder>,
    pub events: Arc<EventBus>,
}

impl Runtime {
    pub async fn open(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let url = config.database.url.clone().ok_or(
            "No database configured. Set DATABASE_URL or [database] url in config.toml",
        )?;
        let store = jobsuite_store::connect(
            &url,
            &config.database.listings_table,
            config.database.max_connections,
        )
        .await?;

        let embedder = build_embedder(&config)?;
        let index = open_index(&config, embedder.as_ref()).await?;

        Ok(Self {
            config,
            store,
            index,
            embedder,
            events: Arc::new(EventBus::default()),
        })
    }

    pub fn index_sync(&self) -> IndexSync {
        IndexSync::new(self.store.clone(), self.index.clone(), self.embedder.clone())
            .with_batch_size(self.config.embedding.batch_size)
            .with_events(self.events.clone())
    }

    pub fn chat_service(&self) -> ChatService {
        let provider = decision_provider(&self.config.decision, self.config.api_key.as_deref());
        let tools = jobsuite_tools::build_registry(
            self.store.clone(),
            self.index.clone(),
            self.embedder.clone(),
            &self.config.orchestrator,
        );
        let orchestrator = Orchestrator::from_config(
            provider,
            Arc::new(tools),
            self.events.clone(),
            &self.config.decision,
            &self.config.orchestrator,
        );
        let sessions = SessionStore::new(Duration::from_secs(self.config.orchestrator.session_ttl_secs));
        ChatService::new(Arc::new(orchestrator), Arc::new(sessions))
    }
}

/// The embedder named by `[embedding]`; ingestion and search share it.
pub fn build_embedder(config: &AppConfig) -> Result<Arc<dyn Embedder>, Box<dyn std::error::Error>> {
    let embedding = &config.embedding;
    if embedding.is_local() {
        debug!(model = %embedding.model, dims = embedding.dims, "Using local embedder");
        let embedder = LocalEmbedder::new(&embedding.model, embedding.dims)?
            .with_cache_dir(embedding.resolved_cache_dir())
            .with_batch_size(embedding.batch_size);
        return Ok(Arc::new(embedder));
    }

    let provider = embedding_provider(embedding, config.api_key.as_deref())
        .ok_or_else(|| format!("Embedding provider '{}' is not available", embedding.provider))?;
    debug!(provider = %embedding.provider, model = %embedding.model, "Using remote embedder");
    Ok(Arc::new(RemoteEmbedder::new(provider, &embedding.model, embedding.dims)))
}

pub async fn open_index(
    config: &AppConfig,
    embedder: &dyn Embedder,
) -> Result<Arc<dyn VectorIndex>, Box<dyn std::error::Error>> {
    let path = config.index.resolved_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    info!(path = %path.display(), collection = %config.index.collection, "Opening vector index");

    let index = SqliteIndex::new(
        &path.to_string_lossy(),
        &config.index.collection,
        embedder.model_id(),
        embedder.dims(),
    )
    .await?;
    Ok(Arc::new(index))
}
