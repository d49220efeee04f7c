//! Embedding configuration types.

use minutes_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Embedding provider settings for a store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram", "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Whether to normalize embeddings to unit length
    #[serde(default = "default_normalize")]
    pub normalize: bool,

    /// Maximum number of texts per provider call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Provider-specific configuration (JSON object)
    #[serde(default)]
    pub provider_config: serde_json::Value,
}

fn default_normalize() -> bool {
    true
}

fn default_batch_size() -> usize {
    100
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            normalize: true,
            batch_size: default_batch_size(),
            provider_config: serde_json::json!({}),
        }
    }
}

impl EmbeddingConfig {
    /// Reject settings no provider can honor.
    pub fn validate(&self) -> AppResult<()> {
        if self.dimensions == 0 {
            return Err(AppError::InvalidConfiguration(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(AppError::InvalidConfiguration(
                "embedding batch_size must be greater than zero".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(AppError::InvalidConfiguration(
                "embedding model must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// String value from `provider_config`, if set.
    pub fn provider_option(&self, key: &str) -> Option<&str> {
        self.provider_config.get(key).and_then(|v| v.as_str())
    }

    /// Integer value from `provider_config`, if set.
    pub fn provider_option_u64(&self, key: &str) -> Option<u64> {
        self.provider_config.get(key).and_then(|v| v.as_u64())
    }
}
