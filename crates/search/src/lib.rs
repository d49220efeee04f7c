//! Semantic search over meeting content.
//!
//! Meeting transcripts and the items extracted from them (topics, decisions,
//! action items, summaries) are embedded and kept in an exact nearest-neighbor
//! index alongside their metadata. Queries are embedded the same way, ranked
//! by squared Euclidean distance and filtered by segment type, meeting and
//! project.
//!
//! The entry point is [`MeetingVectorStore`]:
//!
//! ```no_run
//! use minutes_search::{MeetingContent, MeetingVectorStore, SearchFilters, StoreConfig};
//!
//! # async fn demo() -> minutes_core::AppResult<()> {
//! let config = StoreConfig::for_workspace(std::path::Path::new("."));
//! let store = MeetingVectorStore::open(config).await?;
//!
//! let content = MeetingContent::new("m1").with_summary("The budget was approved.");
//! store.add_meeting_embeddings(&content).await?;
//!
//! let hits = store.search("budget approval", 5, &SearchFilters::new()).await?;
//! # let _ = hits;
//! store.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod ingest;
pub mod persistence;
pub mod records;
pub mod search;
pub mod service;
pub mod store;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use config::StoreConfig;
pub use ingest::{
    ActionItemInput, DecisionInput, MeetingContent, SummaryInput, TopicInput, Transcript,
    TranscriptSegment,
};
pub use search::{SearchFilters, SearchRequest};
pub use service::MeetingVectorStore;
pub use store::Store;
pub use types::{
    SearchHit, SearchPage, SegmentDetails, SegmentType, StoreStats, VectorMetadata,
};
