//! Store configuration management.
//!
//! Settings live in `.minutes/store.yaml` next to the application config.
//! `VECTOR_STORE_PATH` and `EMBEDDING_MODEL` override the file.

use crate::embeddings::EmbeddingConfig;
use minutes_core::config::DATA_DIR_NAME;
use minutes_core::{AppConfig, AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const STORE_CONFIG_FILE: &str = "store.yaml";
pub const DEFAULT_STORE_DIR: &str = "vectors";

/// Configuration for one meeting vector store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Directory holding the vector and metadata files
    #[serde(default)]
    pub store_path: PathBuf,

    /// Transcript chunk window, in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Upper bound on a single embedding call
    #[serde(default = "default_embed_timeout_secs")]
    pub embed_timeout_secs: u64,

    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_embed_timeout_secs() -> u64 {
    30
}

impl StoreConfig {
    /// Defaults rooted in a workspace.
    pub fn for_workspace(workspace: &Path) -> Self {
        Self {
            store_path: workspace.join(DATA_DIR_NAME).join(DEFAULT_STORE_DIR),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            embed_timeout_secs: default_embed_timeout_secs(),
            embedding: EmbeddingConfig::default(),
        }
    }

    /// Load the store config for an application config's workspace.
    pub fn from_app_config(app: &AppConfig) -> AppResult<Self> {
        Self::load(&app.workspace)
    }

    /// Load from `.minutes/store.yaml` if it exists, then apply environment overrides.
    pub fn load(workspace: &Path) -> AppResult<Self> {
        let mut config = Self::load_file(workspace)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn load_file(workspace: &Path) -> AppResult<Self> {
        let config_path = config_path(workspace);

        if !config_path.exists() {
            tracing::debug!("No store config at {:?}, using defaults", config_path);
            return Ok(Self::for_workspace(workspace));
        }

        let content = fs::read_to_string(&config_path).map_err(|e| {
            AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
        })?;

        let mut config: StoreConfig = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
        })?;

        // Relative store paths are relative to the workspace
        if config.store_path.as_os_str().is_empty() {
            config.store_path = Self::for_workspace(workspace).store_path;
        } else if config.store_path.is_relative() {
            config.store_path = workspace.join(&config.store_path);
        }

        tracing::debug!("Loaded store config from {:?}", config_path);
        Ok(config)
    }

    /// Apply `VECTOR_STORE_PATH` and `EMBEDDING_MODEL` from a variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("VECTOR_STORE_PATH").filter(|p| !p.trim().is_empty()) {
            self.store_path = PathBuf::from(path);
        }
        if let Some(model) = lookup("EMBEDDING_MODEL").filter(|m| !m.trim().is_empty()) {
            self.embedding.model = model;
        }
    }

    /// Save to `.minutes/store.yaml`.
    pub fn save(&self, workspace: &Path) -> AppResult<()> {
        let config_path = config_path(workspace);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let yaml = serde_yaml::to_string(self)?;

        fs::write(&config_path, yaml).map_err(|e| {
            AppError::Config(format!("Failed to write config to {:?}: {}", config_path, e))
        })?;

        tracing::debug!("Saved store config to {:?}", config_path);
        Ok(())
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        crate::chunker::validate_window(self.chunk_size, self.chunk_overlap)?;
        if self.embed_timeout_secs == 0 {
            return Err(AppError::InvalidConfiguration(
                "embed_timeout_secs must be greater than zero".to_string(),
            ));
        }
        self.embedding.validate()
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.embed_timeout_secs)
    }
}

/// Get the path to the store config file.
pub fn config_path(workspace: &Path) -> PathBuf {
    workspace.join(DATA_DIR_NAME).join(STORE_CONFIG_FILE)
}
