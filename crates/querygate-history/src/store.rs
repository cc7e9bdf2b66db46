//! Bounded per-user conversation history.
//!
//! Each user owns an append-only sequence guarded by its own lock, so appends
//! for one user are serialized while different users proceed independently.
//! Once a sequence reaches the high-water mark, its oldest share is folded
//! into a single summary entry kept at the head.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use querygate_core::config::HistoryConfig;
use querygate_core::{ConversationTurn, QuerygateError, ResultPayload};

use crate::entry::{ConsolidationSummary, EntryPayload, HistoryEntry, SUMMARY_MARKER};
use crate::topics::{categorize_interactions, extract_topics, merge_distinct};

/// Consolidation thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPolicy {
    pub high_water_mark: usize,
    pub consolidate_percent: u8,
    pub max_topics: usize,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self::from(&HistoryConfig::default())
    }
}

impl From<&HistoryConfig> for HistoryPolicy {
    fn from(config: &HistoryConfig) -> Self {
        Self {
            high_water_mark: config.high_water_mark.max(2),
            consolidate_percent: config.consolidate_percent.clamp(1, 99),
            max_topics: config.max_topics,
        }
    }
}

/// Per-user activity summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub user_id: String,
    /// Turns represented, counting the turns folded into a summary.
    pub total_turns: usize,
    /// Entries currently buffered.
    pub buffered_entries: usize,
    pub has_summary: bool,
    pub last_activity: Option<DateTime<Utc>>,
    /// Up to five most recent non-summary queries, oldest first.
    pub recent_queries: Vec<String>,
}

type UserLog = Arc<RwLock<Vec<HistoryEntry>>>;

/// Owned store of every user's conversation history.
#[derive(Debug, Default)]
pub struct HistoryStore {
    policy: HistoryPolicy,
    users: RwLock<HashMap<String, UserLog>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl HistoryStore {
    pub fn new(policy: HistoryPolicy) -> Self {
        Self {
            policy: HistoryPolicy {
                high_water_mark: policy.high_water_mark.max(2),
                consolidate_percent: policy.consolidate_percent.clamp(1, 99),
                max_topics: policy.max_topics,
            },
            users: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> HistoryPolicy {
        self.policy
    }

    fn log(&self, user_id: &str) -> Option<UserLog> {
        read(&self.users).get(user_id).cloned()
    }

    fn log_or_create(&self, user_id: &str) -> UserLog {
        if let Some(log) = self.log(user_id) {
            return log;
        }
        write(&self.users)
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }

    /// Record a turn. Always succeeds; consolidates when the user's sequence
    /// reaches the high-water mark.
    pub fn append(
        &self,
        user_id: &str,
        query: &str,
        response: &str,
        payload: Option<ResultPayload>,
    ) {
        let entry = HistoryEntry::new(query, response, payload);
        self.append_entry(user_id, self.log_or_create(user_id), entry);
    }

    /// Push onto `log` once it is locked and still the user's live log. A
    /// concurrent `clear` detaches the log from the map, so retry on the
    /// fresh one instead of writing into the detached log.
    fn append_entry(&self, user_id: &str, mut log: UserLog, entry: HistoryEntry) {
        loop {
            let mut entries = write(&log);
            let live = self
                .log(user_id)
                .is_some_and(|current| Arc::ptr_eq(&current, &log));
            if live {
                entries.push(entry);
                debug!(user_id = %user_id, entries = entries.len(), "History entry appended");
                if entries.len() >= self.policy.high_water_mark {
                    self.consolidate(user_id, &mut entries);
                }
                return;
            }
            drop(entries);
            log = self.log_or_create(user_id);
        }
    }

    fn consolidate(&self, user_id: &str, entries: &mut Vec<HistoryEntry>) {
        let len = entries.len();
        let older = (len * usize::from(self.policy.consolidate_percent) / 100).clamp(1, len - 1);
        let block: Vec<HistoryEntry> = entries.drain(..older).collect();

        let previous = block.first().and_then(|e| e.summary()).cloned();
        let turns: Vec<&HistoryEntry> = block.iter().filter(|e| !e.is_summary()).collect();
        let queries = || turns.iter().map(|e| e.user_query.as_str());

        let new_topics = extract_topics(queries(), self.policy.max_topics);
        let new_kinds = categorize_interactions(queries());
        let (original_count, key_topics, interaction_types) = match &previous {
            Some(prev) => (
                prev.original_count + turns.len(),
                merge_distinct(&prev.key_topics, &new_topics, self.policy.max_topics),
                merge_distinct(&prev.interaction_types, &new_kinds, usize::MAX),
            ),
            None => (turns.len(), new_topics, new_kinds),
        };

        let timestamp = block.first().map(|e| e.timestamp).unwrap_or_else(Utc::now);
        let summary = HistoryEntry {
            timestamp,
            user_query: format!("{} {} previous conversations", SUMMARY_MARKER, original_count),
            assistant_response: summary_text(original_count, &key_topics, &interaction_types),
            data: Some(EntryPayload::Summary(ConsolidationSummary {
                original_count,
                key_topics,
                interaction_types,
            })),
        };
        entries.insert(0, summary);

        info!(
            user_id = %user_id,
            consolidated = older,
            original_count,
            remaining = entries.len(),
            "History consolidated"
        );
    }

    /// The `limit` most recent entries, most-recent-last.
    pub fn recent(&self, user_id: &str, limit: usize) -> Vec<HistoryEntry> {
        match self.log(user_id) {
            Some(log) => {
                let entries = read(&log);
                let start = entries.len().saturating_sub(limit);
                entries[start..].to_vec()
            }
            None => Vec::new(),
        }
    }

    /// Every buffered entry for the user, including any summary.
    pub fn all(&self, user_id: &str) -> Vec<HistoryEntry> {
        self.log(user_id)
            .map(|log| read(&log).clone())
            .unwrap_or_default()
    }

    /// Recent turns in the shape handed to response composers.
    pub fn recent_turns(&self, user_id: &str, limit: usize) -> Vec<ConversationTurn> {
        self.recent(user_id, limit)
            .iter()
            .map(HistoryEntry::as_turn)
            .collect()
    }

    /// Remove all of a user's history. Clearing an unknown user is a no-op.
    pub fn clear(&self, user_id: &str) -> bool {
        // The map guard is released before the log is locked.
        let removed = write(&self.users).remove(user_id);
        match removed {
            Some(log) => {
                write(&log).clear();
                info!(user_id = %user_id, "History cleared");
                true
            }
            None => false,
        }
    }

    /// Users with buffered history, sorted.
    pub fn users(&self) -> Vec<String> {
        let mut users: Vec<String> = read(&self.users).keys().cloned().collect();
        users.sort();
        users
    }

    /// Buffered entries across all users.
    pub fn total_entries(&self) -> usize {
        let logs: Vec<UserLog> = read(&self.users).values().cloned().collect();
        logs.iter().map(|log| read(log).len()).sum()
    }

    pub fn stats(&self, user_id: &str) -> Option<UserStats> {
        let log = self.log(user_id)?;
        let entries = read(&log);
        let recent_queries: Vec<String> = {
            let turns: Vec<&HistoryEntry> = entries.iter().filter(|e| !e.is_summary()).collect();
            let start = turns.len().saturating_sub(5);
            turns[start..].iter().map(|e| e.user_query.clone()).collect()
        };
        Some(UserStats {
            user_id: user_id.to_string(),
            total_turns: entries.iter().map(HistoryEntry::turn_count).sum(),
            buffered_entries: entries.len(),
            has_summary: entries.first().map(HistoryEntry::is_summary).unwrap_or(false),
            last_activity: entries.last().map(|e| e.timestamp),
            recent_queries,
        })
    }

    /// Pretty-printed JSON of the user's history.
    pub fn export_json(&self, user_id: &str) -> Result<String, QuerygateError> {
        let entries = self.all(user_id);
        Ok(serde_json::to_string_pretty(&entries)?)
    }

    /// Plain-text rendering of recent turns, for prompt context.
    pub fn context_text(&self, user_id: &str, limit: usize) -> String {
        let entries = self.recent(user_id, limit);
        if entries.is_empty() {
            return String::new();
        }
        let mut out = String::from("Previous conversation context:\n");
        for entry in &entries {
            out.push_str(&format!("User: {}\n", entry.user_query));
            out.push_str(&format!("Assistant: {}\n", entry.assistant_response));
        }
        out
    }
}

fn summary_text(count: usize, topics: &[String], kinds: &[String]) -> String {
    let topics = if topics.is_empty() {
        "general conversation".to_string()
    } else {
        topics.join(", ")
    };
    let mut text = format!(
        "Previous conversation summary: {} earlier exchanges covering {}.",
        count, topics
    );
    if !kinds.is_empty() {
        text.push_str(&format!(" Interaction types: {}.", kinds.join(", ")));
    }
    text
}
