use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use querygate_core::{ConversationTurn, ResultPayload};

/// Prefix on the query text of a summary entry.
pub const SUMMARY_MARKER: &str = "[CONVERSATION SUMMARY]";

/// Metadata recorded on a summary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationSummary {
    /// Number of original turns folded into this summary.
    pub original_count: usize,
    pub key_topics: Vec<String>,
    pub interaction_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryPayload {
    Result(ResultPayload),
    Summary(ConsolidationSummary),
}

/// One recorded turn, or a summary of many.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub user_query: String,
    pub assistant_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EntryPayload>,
}

impl HistoryEntry {
    pub fn new(
        user_query: impl Into<String>,
        assistant_response: impl Into<String>,
        payload: Option<ResultPayload>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            user_query: user_query.into(),
            assistant_response: assistant_response.into(),
            data: payload
                .filter(|p| !p.is_empty())
                .map(EntryPayload::Result),
        }
    }

    pub fn summary(&self) -> Option<&ConsolidationSummary> {
        match &self.data {
            Some(EntryPayload::Summary(s)) => Some(s),
            _ => None,
        }
    }

    pub fn is_summary(&self) -> bool {
        self.summary().is_some()
    }

    /// Number of original turns this entry stands for.
    pub fn turn_count(&self) -> usize {
        self.summary().map(|s| s.original_count).unwrap_or(1)
    }

    pub fn as_turn(&self) -> ConversationTurn {
        ConversationTurn {
            query: self.user_query.clone(),
            response: self.assistant_response.clone(),
        }
    }
}
