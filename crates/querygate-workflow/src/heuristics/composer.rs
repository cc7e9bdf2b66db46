//! Template-based response text.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use querygate_core::{CollaboratorError, Composition, ConversationTurn, ResponseComposer};

use crate::messages::CASUAL_FALLBACK;

/// Rows quoted verbatim in a data answer.
const PREVIEW_ROWS: usize = 5;

static GREETING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(hi|hello|hey|good\s+(?:morning|afternoon|evening))\b")
        .expect("Invalid greeting regex")
});

static HOW_ARE_YOU_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhow\s+are\s+you\b").expect("Invalid wellbeing regex"));

static THANKS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(thanks|thank\s+you|cheers)\b").expect("Invalid thanks regex")
});

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(your\s+name|who\s+are\s+you)\b").expect("Invalid name regex")
});

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Composes answers from fixed templates.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateComposer;

#[async_trait]
impl ResponseComposer for TemplateComposer {
    async fn compose(&self, composition: Composition<'_>) -> Result<String, CollaboratorError> {
        let Some(table) = composition.table else {
            return Err(CollaboratorError::Empty("response composer"));
        };
        if table.is_empty() {
            return Ok("I didn't find any matching records for that request.".to_string());
        }

        let noun = if table.row_count == 1 { "record" } else { "records" };
        let mut out = format!(
            "I found {} {}. Columns: {}.",
            table.row_count,
            noun,
            table.headers.join(", ")
        );
        for row in table.rows.iter().take(PREVIEW_ROWS) {
            let cells: Vec<String> = table
                .headers
                .iter()
                .zip(row)
                .map(|(h, v)| format!("{}: {}", h, cell_text(v)))
                .collect();
            out.push_str(&format!("\n- {}", cells.join(", ")));
        }
        if table.row_count > PREVIEW_ROWS {
            out.push_str(&format!("\n...and {} more.", table.row_count - PREVIEW_ROWS));
        }
        if let Some(chart) = composition.chart {
            out.push_str(&format!(
                "\nI've also prepared a {} chart: {}.",
                chart.chart_type, chart.label
            ));
        }
        Ok(out)
    }

    async fn converse(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<String, CollaboratorError> {
        let reply = if HOW_ARE_YOU_RE.is_match(query) {
            "I'm doing well, thank you for asking! I can help you explore users, orders, \
             products, and sales data. What would you like to know?"
                .to_string()
        } else if THANKS_RE.is_match(query) {
            "You're welcome! Let me know if there's anything else you'd like to look up."
                .to_string()
        } else if NAME_RE.is_match(query) {
            "I'm your data assistant. Ask me about the data you have access to.".to_string()
        } else if GREETING_RE.is_match(query) {
            if history.is_empty() {
                CASUAL_FALLBACK.to_string()
            } else {
                "Welcome back! What would you like to look at next?".to_string()
            }
        } else {
            CASUAL_FALLBACK.to_string()
        };
        Ok(reply)
    }
}
