//! Meeting search type definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use minutes_core::AppError;

/// Kind of meeting-derived content a vector was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    Transcript,
    Topic,
    Decision,
    ActionItem,
    Summary,
}

impl SegmentType {
    pub const ALL: [SegmentType; 5] = [
        SegmentType::Transcript,
        SegmentType::Topic,
        SegmentType::Decision,
        SegmentType::ActionItem,
        SegmentType::Summary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentType::Transcript => "transcript",
            SegmentType::Topic => "topic",
            SegmentType::Decision => "decision",
            SegmentType::ActionItem => "action_item",
            SegmentType::Summary => "summary",
        }
    }
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SegmentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AppError::InvalidRequest(format!("Unknown segment type: '{}'", s)))
    }
}

/// Extra fields of a topic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicDetails {
    pub topic: String,
    pub description: String,
}

/// Extra fields of a decision record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionDetails {
    pub decision: String,
    pub context: String,
    #[serde(default)]
    pub participants: Vec<String>,
    pub impact: Option<String>,
}

/// Extra fields of an action item record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItemDetails {
    pub action: String,
    pub assignee: String,
    pub deadline: String,
    pub status: String,
}

/// Flavor of an indexed summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    /// Free-form summary text
    Plain,
    /// Structured executive summary produced by the summary agent
    ExecutiveSummary,
}

/// Extra fields of a summary record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryDetails {
    pub kind: SummaryKind,
}

/// Type-specific data carried by a record, keyed by segment type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "segment_type",
    content = "additional_data",
    rename_all = "snake_case"
)]
pub enum SegmentDetails {
    Transcript,
    Topic(TopicDetails),
    Decision(DecisionDetails),
    ActionItem(ActionItemDetails),
    Summary(SummaryDetails),
}

impl SegmentDetails {
    pub fn segment_type(&self) -> SegmentType {
        match self {
            SegmentDetails::Transcript => SegmentType::Transcript,
            SegmentDetails::Topic(_) => SegmentType::Topic,
            SegmentDetails::Decision(_) => SegmentType::Decision,
            SegmentDetails::ActionItem(_) => SegmentType::ActionItem,
            SegmentDetails::Summary(_) => SegmentType::Summary,
        }
    }
}

/// Metadata stored alongside each vector, one per indexed unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    /// Owning meeting (non-empty)
    pub meeting_id: String,

    /// Indexed content
    pub text: String,

    /// Seconds into the meeting, when known
    #[serde(default)]
    pub timestamp: Option<f64>,

    /// Ordinal position within its segment type for the meeting
    #[serde(default)]
    pub segment_index: Option<u32>,

    /// Owning project; absent for legacy records
    #[serde(default)]
    pub project_id: Option<String>,

    /// Segment type and its type-specific data
    pub details: SegmentDetails,
}

impl VectorMetadata {
    pub fn segment_type(&self) -> SegmentType {
        self.details.segment_type()
    }
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub text: String,
    pub meeting_id: String,
    pub segment_type: SegmentType,
    pub timestamp: Option<f64>,
    pub segment_index: Option<u32>,
    pub project_id: Option<String>,
    /// Similarity normalized against the query's candidate batch (0.0 to 1.0)
    pub similarity_score: f32,
    /// Raw squared Euclidean distance
    pub distance: f32,
    pub details: SegmentDetails,
}

impl SearchHit {
    pub(crate) fn from_metadata(metadata: &VectorMetadata, similarity: f32, distance: f32) -> Self {
        Self {
            text: metadata.text.clone(),
            meeting_id: metadata.meeting_id.clone(),
            segment_type: metadata.segment_type(),
            timestamp: metadata.timestamp,
            segment_index: metadata.segment_index,
            project_id: metadata.project_id.clone(),
            similarity_score: similarity,
            distance,
            details: metadata.details.clone(),
        }
    }
}

/// Statistics about a vector store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_vectors: usize,

    /// None until the first vector fixes the dimension
    pub embedding_dimension: Option<usize>,

    /// Vector counts keyed by meeting id
    pub meetings: BTreeMap<String, usize>,

    /// Vector counts keyed by segment type
    pub segment_types: BTreeMap<SegmentType, usize>,

    /// Vector counts keyed by project id ("none" for records without a project)
    pub projects: BTreeMap<String, usize>,
}

/// One page of ranked search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub total_results: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub segment_types_filter: Option<Vec<SegmentType>>,
    pub meeting_ids_filter: Option<Vec<String>>,
    pub project_id_filter: Option<String>,
}
