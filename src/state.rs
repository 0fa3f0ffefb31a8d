use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::embedding::EmbeddingClient;
use crate::llm::{GeminiProvider, LlmProvider};
use crate::mattermost::MattermostClient;
use crate::rag::{
    AnswerGenerator, FilterExtractor, ImportPipeline, QdrantStore, SearchOrchestrator,
    VectorStore,
};

/// Global application state shared across all routes and background tasks.
///
/// Backend clients are constructed once here and injected by reference;
/// nothing in this struct is mutated after startup.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub llm: Arc<dyn LlmProvider>,
    pub store: Arc<dyn VectorStore>,
    pub search: SearchOrchestrator,
    pub import: ImportPipeline,
    pub mattermost: MattermostClient,
}

impl AppState {
    pub fn initialize() -> Arc<Self> {
        let config = Arc::new(AppConfig::from_env());

        let llm: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::new(&config));
        let store: Arc<dyn VectorStore> = Arc::new(QdrantStore::new(&config));
        let embeddings = EmbeddingClient::new(llm.clone(), config.embedding_batch_size);

        let search = SearchOrchestrator::new(
            embeddings.clone(),
            FilterExtractor::new(llm.clone()),
            store.clone(),
            AnswerGenerator::new(llm.clone()),
        );
        let import = ImportPipeline::new(embeddings, store.clone());
        let mattermost = MattermostClient::new(&config);

        Arc::new(AppState {
            config,
            llm,
            store,
            search,
            import,
            mattermost,
        })
    }
}
