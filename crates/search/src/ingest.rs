//! Mapping of meeting-derived content to indexable records.
//!
//! Input shapes follow what transcription and extraction agents emit, so the
//! field aliases (`name`, `text`, `task`) are accepted when deserializing.

use crate::chunker::chunk_text;
use crate::types::{
    ActionItemDetails, DecisionDetails, SegmentDetails, SummaryDetails, SummaryKind, TopicDetails,
    VectorMetadata,
};
use minutes_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

const DEFAULT_ACTION_STATUS: &str = "pending";

/// One timed segment of a transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicInput {
    #[serde(default, alias = "name")]
    pub topic: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionInput {
    #[serde(default, alias = "text")]
    pub decision: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionItemInput {
    #[serde(default, alias = "task")]
    pub action: String,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub deadline: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

/// A meeting summary, either free text or an agent's structured output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SummaryInput {
    Text(String),
    Structured {
        #[serde(default)]
        summary: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },
}

impl SummaryInput {
    fn text(&self) -> &str {
        match self {
            SummaryInput::Text(text) => text,
            SummaryInput::Structured { summary, text } => summary
                .as_deref()
                .filter(|s| !s.is_empty())
                .or(text.as_deref())
                .unwrap_or_default(),
        }
    }

    fn kind(&self) -> SummaryKind {
        match self {
            SummaryInput::Text(_) => SummaryKind::Plain,
            SummaryInput::Structured { .. } => SummaryKind::ExecutiveSummary,
        }
    }
}

impl From<&str> for SummaryInput {
    fn from(text: &str) -> Self {
        SummaryInput::Text(text.to_string())
    }
}

/// Everything indexed for one meeting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeetingContent {
    pub meeting_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub transcript: Option<Transcript>,
    #[serde(default)]
    pub topics: Vec<TopicInput>,
    #[serde(default)]
    pub decisions: Vec<DecisionInput>,
    #[serde(default)]
    pub action_items: Vec<ActionItemInput>,
    #[serde(default)]
    pub summary: Option<SummaryInput>,
}

impl MeetingContent {
    pub fn new(meeting_id: impl Into<String>) -> Self {
        Self {
            meeting_id: meeting_id.into(),
            ..Default::default()
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = Some(transcript);
        self
    }

    pub fn with_topics(mut self, topics: Vec<TopicInput>) -> Self {
        self.topics = topics;
        self
    }

    pub fn with_decisions(mut self, decisions: Vec<DecisionInput>) -> Self {
        self.decisions = decisions;
        self
    }

    pub fn with_action_items(mut self, action_items: Vec<ActionItemInput>) -> Self {
        self.action_items = action_items;
        self
    }

    pub fn with_summary(mut self, summary: impl Into<SummaryInput>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// Build the records to embed for a meeting, in insertion order:
/// transcript chunks, topics, decisions, action items, summary.
pub fn build_records(
    content: &MeetingContent,
    chunk_size: usize,
    overlap: usize,
) -> AppResult<Vec<VectorMetadata>> {
    if content.meeting_id.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "meeting_id must not be empty".to_string(),
        ));
    }

    let record = |text: String,
                  timestamp: Option<f64>,
                  segment_index: Option<u32>,
                  details: SegmentDetails| VectorMetadata {
        meeting_id: content.meeting_id.clone(),
        text,
        timestamp,
        segment_index,
        project_id: content.project_id.clone(),
        details,
    };

    let mut records = Vec::new();

    if let Some(transcript) = content.transcript.as_ref().filter(|t| !t.text.trim().is_empty()) {
        for chunk in chunk_text(&transcript.text, chunk_size, overlap)? {
            // Chunks line up with segments by position only
            let (timestamp, segment_index) = match transcript.segments.get(chunk.position) {
                Some(segment) => (segment.start, position(chunk.position)),
                None => (None, None),
            };
            records.push(record(
                chunk.text,
                timestamp,
                segment_index,
                SegmentDetails::Transcript,
            ));
        }
    }

    for (i, topic) in content.topics.iter().enumerate() {
        if all_empty(&[&topic.topic, &topic.description]) {
            continue;
        }
        records.push(record(
            join_text(format!("{}. {}", topic.topic, topic.description)),
            topic.start_time,
            position(i),
            SegmentDetails::Topic(TopicDetails {
                topic: topic.topic.clone(),
                description: topic.description.clone(),
            }),
        ));
    }

    for (i, decision) in content.decisions.iter().enumerate() {
        if all_empty(&[&decision.decision, &decision.context]) {
            continue;
        }
        records.push(record(
            join_text(format!("{}. {}", decision.decision, decision.context)),
            decision.timestamp,
            position(i),
            SegmentDetails::Decision(DecisionDetails {
                decision: decision.decision.clone(),
                context: decision.context.clone(),
                participants: decision.participants.clone(),
                impact: decision.impact.clone(),
            }),
        ));
    }

    for (i, item) in content.action_items.iter().enumerate() {
        if all_empty(&[&item.action, &item.assignee, &item.deadline]) {
            continue;
        }
        records.push(record(
            join_text(format!(
                "{}. Assigned to: {}. Deadline: {}",
                item.action, item.assignee, item.deadline
            )),
            item.timestamp,
            position(i),
            SegmentDetails::ActionItem(ActionItemDetails {
                action: item.action.clone(),
                assignee: item.assignee.clone(),
                deadline: item.deadline.clone(),
                status: item
                    .status
                    .clone()
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| DEFAULT_ACTION_STATUS.to_string()),
            }),
        ));
    }

    if let Some(summary) = &content.summary {
        let text = summary.text().trim();
        if !text.is_empty() {
            records.push(record(
                text.to_string(),
                None,
                None,
                SegmentDetails::Summary(SummaryDetails {
                    kind: summary.kind(),
                }),
            ));
        }
    }

    tracing::debug!(
        "Built {} records for meeting '{}'",
        records.len(),
        content.meeting_id
    );

    Ok(records)
}

fn all_empty(parts: &[&str]) -> bool {
    parts.iter().all(|p| p.trim().is_empty())
}

fn join_text(text: String) -> String {
    text.trim().to_string()
}

fn position(i: usize) -> Option<u32> {
    u32::try_from(i).ok()
}
