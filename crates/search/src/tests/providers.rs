//! Embedding provider doubles for service tests.

use crate::embeddings::EmbeddingProvider;
use minutes_core::{AppError, AppResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Places each text on a line: the trailing number of the text is its x
/// coordinate, everything else embeds at the origin.
#[derive(Debug, Default)]
pub struct LineProvider {
    pub calls: AtomicUsize,
}

impl LineProvider {
    fn position(text: &str) -> f32 {
        text.split_whitespace()
            .last()
            .and_then(|token| token.trim_end_matches('.').parse::<f32>().ok())
            .unwrap_or(0.0)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for LineProvider {
    fn provider_name(&self) -> &str {
        "line"
    }

    fn model_name(&self) -> &str {
        "line-v1"
    }

    fn dimensions(&self) -> usize {
        2
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|text| vec![Self::position(text), 0.0])
            .collect())
    }
}

/// Always fails, as an unreachable embedding service would.
#[derive(Debug, Default)]
pub struct FailingProvider;

#[async_trait::async_trait]
impl EmbeddingProvider for FailingProvider {
    fn provider_name(&self) -> &str {
        "failing"
    }

    fn model_name(&self) -> &str {
        "failing"
    }

    fn dimensions(&self) -> usize {
        2
    }

    async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Err(AppError::EmbeddingUnavailable(
            "connection refused".to_string(),
        ))
    }
}

/// Answers eventually, but long after any reasonable timeout.
#[derive(Debug)]
pub struct SlowProvider {
    pub delay: Duration,
}

#[async_trait::async_trait]
impl EmbeddingProvider for SlowProvider {
    fn provider_name(&self) -> &str {
        "slow"
    }

    fn model_name(&self) -> &str {
        "slow"
    }

    fn dimensions(&self) -> usize {
        2
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![vec![0.0, 0.0]; texts.len()])
    }
}

/// Returns vectors of a dimension that can be changed between calls.
#[derive(Debug)]
pub struct ResizableProvider {
    pub dimensions: AtomicUsize,
}

impl ResizableProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: AtomicUsize::new(dimensions),
        }
    }

    pub fn resize(&self, dimensions: usize) {
        self.dimensions.store(dimensions, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for ResizableProvider {
    fn provider_name(&self) -> &str {
        "resizable"
    }

    fn model_name(&self) -> &str {
        "resizable"
    }

    fn dimensions(&self) -> usize {
        self.dimensions.load(Ordering::SeqCst)
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let dimensions = self.dimensions();
        Ok(texts
            .iter()
            .map(|text| vec![text.len() as f32; dimensions])
            .collect())
    }
}

/// Resizable provider that parks after embedding one chosen text, holding
/// its vector until released.
#[derive(Debug)]
pub struct GatedProvider {
    pub inner: ResizableProvider,
    gated_text: String,
    pub reached: Notify,
    pub release: Notify,
}

impl GatedProvider {
    pub fn new(dimensions: usize, gated_text: &str) -> Self {
        Self {
            inner: ResizableProvider::new(dimensions),
            gated_text: gated_text.to_string(),
            reached: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for GatedProvider {
    fn provider_name(&self) -> &str {
        "gated"
    }

    fn model_name(&self) -> &str {
        "gated"
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let vectors = self.inner.embed_batch(texts).await?;
        if texts.iter().any(|text| *text == self.gated_text) {
            self.reached.notify_one();
            self.release.notified().await;
        }
        Ok(vectors)
    }
}
