//! Filtered similarity search over a [`Store`].
//!
//! Candidates are over-fetched from the index (twice the requested count),
//! filtered by metadata, scored against the farthest candidate of the batch,
//! and returned in descending similarity order.

use crate::store::Store;
use crate::types::{SearchHit, SearchPage, SegmentType, VectorMetadata};
use minutes_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Queries longer than this are truncated, in characters.
pub const MAX_QUERY_CHARS: usize = 500;

pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Metadata filters for a search.
///
/// An absent or empty list means "no restriction" for that field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Keep only these segment types
    pub segment_types: Option<Vec<SegmentType>>,

    /// Keep only these meetings
    pub meeting_ids: Option<Vec<String>>,

    /// Keep only this project; records without a project never match
    pub project_id: Option<String>,

    /// Minimum similarity score (0.0 to 1.0)
    #[serde(default)]
    pub min_score: f32,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_segment_types(mut self, segment_types: Vec<SegmentType>) -> Self {
        self.segment_types = Some(segment_types);
        self
    }

    pub fn with_meeting_ids(mut self, meeting_ids: Vec<String>) -> Self {
        self.meeting_ids = Some(meeting_ids);
        self
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Check if any metadata filter is set (the score threshold is not counted)
    pub fn has_filters(&self) -> bool {
        self.segment_types.as_ref().is_some_and(|t| !t.is_empty())
            || self.meeting_ids.as_ref().is_some_and(|m| !m.is_empty())
            || self.project_id.is_some()
    }

    /// Metadata filters in order: segment type, meeting, project.
    pub fn matches(&self, metadata: &VectorMetadata) -> bool {
        if let Some(types) = self.segment_types.as_ref().filter(|t| !t.is_empty()) {
            if !types.contains(&metadata.segment_type()) {
                return false;
            }
        }

        if let Some(meetings) = self.meeting_ids.as_ref().filter(|m| !m.is_empty()) {
            if !meetings.iter().any(|m| *m == metadata.meeting_id) {
                return false;
            }
        }

        if let Some(project_id) = &self.project_id {
            if metadata.project_id.as_deref() != Some(project_id.as_str()) {
                return false;
            }
        }

        true
    }
}

/// Convert a distance to a similarity relative to the batch's farthest candidate.
pub fn similarity(distance: f32, max_distance: f32) -> f32 {
    if max_distance > 0.0 {
        1.0 - distance / max_distance
    } else {
        1.0
    }
}

/// Rank stored records against an embedded query.
///
/// Returns at most `top_k` hits in descending similarity. An empty store or
/// `top_k == 0` yields no hits.
pub fn rank(
    store: &Store,
    query: &[f32],
    top_k: usize,
    filters: &SearchFilters,
) -> AppResult<Vec<SearchHit>> {
    if top_k == 0 || store.is_empty() {
        return Ok(Vec::new());
    }

    let fetch = top_k.saturating_mul(2).min(store.len());
    let candidates = store.nearest(query, fetch)?;

    let max_distance = candidates
        .iter()
        .map(|(neighbor, _)| neighbor.distance)
        .fold(0.0_f32, f32::max);

    let mut hits = Vec::with_capacity(top_k.min(candidates.len()));
    for (neighbor, metadata) in &candidates {
        if !filters.matches(metadata) {
            continue;
        }

        let score = similarity(neighbor.distance, max_distance);
        if score < filters.min_score {
            continue;
        }

        hits.push(SearchHit::from_metadata(metadata, score, neighbor.distance));
        if hits.len() >= top_k {
            break;
        }
    }

    // Stable: equal scores keep candidate order
    hits.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));

    tracing::debug!(
        "Ranked {} of {} candidates (top_k={}, max_distance={})",
        hits.len(),
        candidates.len(),
        top_k,
        max_distance
    );

    Ok(hits)
}

/// Trim a query and cap it at [`MAX_QUERY_CHARS`] characters.
pub fn normalize_query(query: &str) -> AppResult<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidRequest("Query cannot be empty".to_string()));
    }

    match trimmed.char_indices().nth(MAX_QUERY_CHARS) {
        Some((cut, _)) => {
            tracing::warn!("Query truncated to {} characters", MAX_QUERY_CHARS);
            Ok(trimmed[..cut].to_string())
        }
        None => Ok(trimmed.to_string()),
    }
}

/// A paginated search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(flatten)]
    pub filters: SearchFilters,

    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: usize,

    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: DEFAULT_TOP_K,
            filters: SearchFilters::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Check paging arguments and return the normalized query.
    pub fn validate(&self) -> AppResult<String> {
        if self.page == 0 {
            return Err(AppError::InvalidRequest("page must be at least 1".to_string()));
        }
        if self.page_size == 0 {
            return Err(AppError::InvalidRequest(
                "page_size must be at least 1".to_string(),
            ));
        }
        normalize_query(&self.query)
    }

    /// Results fetched before slicing. Independent of `page`, so pages concatenate.
    pub fn fetch_limit(&self) -> usize {
        self.top_k.saturating_mul(self.page_size)
    }
}

/// Slice ranked hits into the requested page.
pub fn paginate(query: String, hits: Vec<SearchHit>, request: &SearchRequest) -> SearchPage {
    let total_results = hits.len();
    let page_size = request.page_size.max(1);
    let total_pages = total_results.div_ceil(page_size);

    let start = request.page.saturating_sub(1).saturating_mul(page_size);
    let results: Vec<SearchHit> = hits.into_iter().skip(start).take(page_size).collect();

    SearchPage {
        query,
        results,
        total_results,
        page: request.page,
        page_size: request.page_size,
        total_pages,
        segment_types_filter: request.filters.segment_types.clone(),
        meeting_ids_filter: request.filters.meeting_ids.clone(),
        project_id_filter: request.filters.project_id.clone(),
    }
}
