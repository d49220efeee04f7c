//! The meeting vector store service.
//!
//! One [`MeetingVectorStore`] owns the in-memory [`Store`], its on-disk
//! snapshot and the embedding provider. Writers (add, delete, reset) are
//! serialized behind a write lock; searches share a read lock. Embedding
//! always happens before a lock is taken, so a slow or failing provider
//! never leaves the store half-updated.

use crate::config::StoreConfig;
use crate::embeddings::{create_provider, Embedder, EmbeddingProvider};
use crate::ingest::{build_records, MeetingContent};
use crate::persistence::StoreFiles;
use crate::search::{normalize_query, paginate, rank, SearchFilters, SearchRequest};
use crate::store::Store;
use crate::types::{SearchHit, SearchPage, StoreStats};
use minutes_core::{AppConfig, AppResult};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Handle to an open meeting vector store.
#[derive(Debug)]
pub struct MeetingVectorStore {
    config: StoreConfig,
    embedder: Embedder,
    files: StoreFiles,
    state: RwLock<Store>,
}

impl MeetingVectorStore {
    /// Open the store for an application workspace.
    pub async fn from_app_config(app: &AppConfig) -> AppResult<Self> {
        let config = StoreConfig::from_app_config(app)?;
        Self::open(config).await
    }

    /// Open a store, creating the configured embedding provider.
    pub async fn open(config: StoreConfig) -> AppResult<Self> {
        config.validate()?;
        let provider = create_provider(&config.embedding).await?;
        Self::with_provider(config, provider)
    }

    /// Open a store with an explicit embedding provider.
    ///
    /// A snapshot that is corrupt or was built with a different embedding
    /// dimension is discarded with a warning; the store starts empty and the
    /// next save replaces it.
    pub fn with_provider(
        config: StoreConfig,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> AppResult<Self> {
        config.validate()?;

        let files = StoreFiles::new(&config.store_path);
        let expected_dimension = Some(provider.dimensions()).filter(|&d| d > 0);

        let store = match files.load(expected_dimension) {
            Ok(Some(store)) => store,
            Ok(None) => {
                tracing::info!(
                    "No existing vector store at {:?}, starting empty",
                    files.dir()
                );
                Store::new()
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(
                    "Discarding vector store at {:?}: {}. Starting from an empty store",
                    files.dir(),
                    e
                );
                Store::new()
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            "Opened vector store at {:?}: {} vectors, provider '{}' (model: {})",
            files.dir(),
            store.len(),
            provider.provider_name(),
            provider.model_name()
        );

        let embedder = Embedder::new(
            provider,
            config.embed_timeout(),
            config.embedding.batch_size,
        );

        Ok(Self {
            config,
            embedder,
            files,
            state: RwLock::new(store),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        self.embedder.provider()
    }

    /// Index everything derived from one meeting. Returns the number of vectors added.
    ///
    /// The batch is applied and persisted as a unit: if embedding, the
    /// dimension check or the save fails, the store is left as it was.
    pub async fn add_meeting_embeddings(&self, content: &MeetingContent) -> AppResult<usize> {
        let start = Instant::now();
        let records = build_records(content, self.config.chunk_size, self.config.chunk_overlap)?;
        if records.is_empty() {
            tracing::debug!("Nothing to index for meeting '{}'", content.meeting_id);
            return Ok(0);
        }

        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let vectors = self.embedder.embed_texts(&texts).await?;

        let mut store = self.state.write().await;
        let checkpoint = store.checkpoint();
        let added = store.add_batch(vectors.into_iter().zip(records).collect())?;

        if let Err(e) = self.files.save(&store) {
            store.rollback(checkpoint);
            return Err(e);
        }

        tracing::info!(
            "Added {} vectors for meeting '{}' in {:.2}s ({} total)",
            added,
            content.meeting_id,
            start.elapsed().as_secs_f64(),
            store.len()
        );

        Ok(added)
    }

    /// Ranked hits for a query, at most `top_k`.
    ///
    /// The read lock is released while the query is embedded. If a reset
    /// and re-index with another embedding dimension land in that window,
    /// none of the stored vectors are comparable and the search finds nothing.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filters: &SearchFilters,
    ) -> AppResult<Vec<SearchHit>> {
        let query = normalize_query(query)?;

        let seen_dimension = {
            let store = self.state.read().await;
            if top_k == 0 || store.is_empty() {
                return Ok(Vec::new());
            }
            store.dimension()
        };

        let vector = self.embedder.embed_query(&query).await?;
        let store = self.state.read().await;
        if store.dimension() != seen_dimension {
            tracing::debug!(
                "Store dimension changed from {:?} to {:?} while embedding '{}', no comparable vectors",
                seen_dimension,
                store.dimension(),
                query
            );
            return Ok(Vec::new());
        }
        let hits = rank(&store, &vector, top_k, filters)?;

        tracing::debug!("Search for '{}' returned {} hits", query, hits.len());
        Ok(hits)
    }

    /// One page of results for a paginated request.
    pub async fn search_page(&self, request: &SearchRequest) -> AppResult<SearchPage> {
        let query = request.validate()?;
        let hits = self
            .search(&query, request.fetch_limit(), &request.filters)
            .await?;

        let page = paginate(query, hits, request);
        tracing::info!(
            "Search found {} results, returning page {}/{} ({} results)",
            page.total_results,
            page.page,
            page.total_pages,
            page.results.len()
        );
        Ok(page)
    }

    /// Remove every vector of a meeting. Returns false when the meeting had none.
    ///
    /// Survivors keep their stored vectors; nothing is re-embedded. The new
    /// state is persisted before it replaces the in-memory store.
    pub async fn delete_meeting_vectors(&self, meeting_id: &str) -> AppResult<bool> {
        let mut store = self.state.write().await;
        if store.count_for_meeting(meeting_id) == 0 {
            tracing::debug!("No vectors found for meeting '{}'", meeting_id);
            return Ok(false);
        }

        let mut next = store.clone();
        let removed = next.remove_where(|md| md.meeting_id == meeting_id);
        self.files.save(&next)?;
        *store = next;

        tracing::info!(
            "Deleted {} vectors for meeting '{}' ({} remaining)",
            removed,
            meeting_id,
            store.len()
        );
        Ok(true)
    }

    pub async fn get_stats(&self) -> StoreStats {
        self.state.read().await.stats()
    }

    pub async fn meeting_vector_count(&self, meeting_id: &str) -> usize {
        self.state.read().await.count_for_meeting(meeting_id)
    }

    pub async fn project_vector_count(&self, project_id: &str) -> usize {
        self.state.read().await.count_for_project(project_id)
    }

    /// Discard all vectors, in memory and on disk.
    pub async fn reset(&self) -> AppResult<()> {
        let mut store = self.state.write().await;
        self.files.remove()?;
        let discarded = store.len();
        store.clear();

        tracing::info!("Reset vector store ({} vectors discarded)", discarded);
        Ok(())
    }

    /// Flush the final state and release the store.
    pub async fn close(self) -> AppResult<()> {
        let store = self.state.into_inner();
        self.files.save(&store)?;
        tracing::debug!("Closed vector store at {:?}", self.files.dir());
        Ok(())
    }
}
