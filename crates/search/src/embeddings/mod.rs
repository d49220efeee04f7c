//! Embedding generation for stored segments and search queries.
//!
//! Providers implement [`EmbeddingProvider`]. The [`Embedder`] wraps one
//! provider with batching, a per-call timeout and sanity checks on the
//! returned vectors, so nothing malformed ever reaches the index.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use minutes_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Provider wrapper used by the store for every embedding call.
#[derive(Debug, Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
    batch_size: usize,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, timeout: Duration, batch_size: usize) -> Self {
        Self {
            provider,
            timeout,
            batch_size: batch_size.max(1),
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Embed texts in provider batches, preserving input order.
    ///
    /// Fails with `EmbeddingUnavailable` when the provider errors, times out,
    /// returns the wrong number of vectors or returns non-finite values, and
    /// with `DimensionMismatch` when vectors disagree in length.
    pub async fn embed_texts(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            "Embedding {} texts using provider '{}' (model: {})",
            texts.len(),
            self.provider.provider_name(),
            self.provider.model_name()
        );

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let vectors = self.embed_batch_with_timeout(batch).await?;
            if vectors.len() != batch.len() {
                return Err(AppError::EmbeddingUnavailable(format!(
                    "Provider returned {} embeddings for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            embeddings.extend(vectors);
        }

        check_vectors(&embeddings)?;
        Ok(embeddings)
    }

    /// Embed a single query text.
    pub async fn embed_query(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut vectors = self.embed_texts(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| AppError::EmbeddingUnavailable("No embedding returned".to_string()))
    }

    async fn embed_batch_with_timeout(&self, batch: &[String]) -> AppResult<Vec<Vec<f32>>> {
        match tokio::time::timeout(self.timeout, self.provider.embed_batch(batch)).await {
            Ok(Ok(vectors)) => Ok(vectors),
            Ok(Err(e @ AppError::DimensionMismatch { .. })) => Err(e),
            Ok(Err(AppError::EmbeddingUnavailable(msg))) => {
                Err(AppError::EmbeddingUnavailable(msg))
            }
            Ok(Err(e)) => Err(AppError::EmbeddingUnavailable(e.to_string())),
            Err(_) => {
                tracing::warn!(
                    "Embedding provider '{}' timed out after {:?}",
                    self.provider.provider_name(),
                    self.timeout
                );
                Err(AppError::EmbeddingUnavailable(format!(
                    "Embedding timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }
}

fn check_vectors(vectors: &[Vec<f32>]) -> AppResult<()> {
    let Some(first) = vectors.first() else {
        return Ok(());
    };
    let expected = first.len();
    if expected == 0 {
        return Err(AppError::EmbeddingUnavailable(
            "Provider returned an empty embedding".to_string(),
        ));
    }

    for vector in vectors {
        if vector.len() != expected {
            return Err(AppError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(AppError::EmbeddingUnavailable(
                "Provider returned non-finite embedding values".to_string(),
            ));
        }
    }
    Ok(())
}
