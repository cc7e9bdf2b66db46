//! Intent routing.
//!
//! Delegates classification to the [`Classifier`] collaborator and maps its
//! label onto the first workflow stage. Labels outside the vocabulary fall
//! back to casual conversation.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info};

use querygate_core::{Classifier, CollaboratorError};

use crate::stage::Signal;
use crate::state::TurnState;

static VISUALIZATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(charts?|graphs?|plots?|plotting|visuali[sz]e|visuali[sz]ation|diagram|histogram|show\s+me\s+a)\b",
    )
    .expect("Invalid visualization regex")
});

/// True when the query itself asks for a chart.
pub fn mentions_visualization(query: &str) -> bool {
    VISUALIZATION_RE.is_match(query)
}

/// Closed intent vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentLabel {
    Casual,
    Simple,
    Complex,
    Visualize,
    Restricted,
}

impl IntentLabel {
    /// Map a raw classifier label. Unknown labels become [`IntentLabel::Casual`].
    pub fn from_label(raw: &str) -> Self {
        raw.parse().unwrap_or(IntentLabel::Casual)
    }

    pub fn signal(&self) -> Signal {
        match self {
            IntentLabel::Casual => Signal::Casual,
            IntentLabel::Simple => Signal::SimpleQuery,
            IntentLabel::Complex | IntentLabel::Visualize => Signal::ComplexQuery,
            IntentLabel::Restricted => Signal::Restricted,
        }
    }
}

impl fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentLabel::Casual => write!(f, "casual"),
            IntentLabel::Simple => write!(f, "simple"),
            IntentLabel::Complex => write!(f, "complex"),
            IntentLabel::Visualize => write!(f, "visualize"),
            IntentLabel::Restricted => write!(f, "restricted"),
        }
    }
}

impl std::str::FromStr for IntentLabel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s
            .trim()
            .trim_matches(|c: char| !c.is_ascii_alphanumeric())
            .to_ascii_lowercase();
        match cleaned.as_str() {
            "casual" | "chitchat" | "chit_chat" => Ok(IntentLabel::Casual),
            "simple" | "db1" => Ok(IntentLabel::Simple),
            "complex" | "db2" => Ok(IntentLabel::Complex),
            "visualize" | "visualise" | "visualization" => Ok(IntentLabel::Visualize),
            "restricted" | "unauthorized" => Ok(IntentLabel::Restricted),
            _ => Err(format!("Unknown intent label: {}", s)),
        }
    }
}

/// Routing outcome for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDecision {
    pub label: IntentLabel,
    pub signal: Signal,
    pub needs_visualization: bool,
}

pub struct Router {
    classifier: Arc<dyn Classifier>,
}

impl Router {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// Classify the turn's query. Classifier failures are returned to the
    /// engine; unknown labels are not failures.
    pub async fn classify(&self, state: &TurnState) -> Result<RouteDecision, CollaboratorError> {
        let raw = self.classifier.classify(state.query()).await?;
        let label = match raw.parse::<IntentLabel>() {
            Ok(label) => label,
            Err(_) => {
                info!(
                    turn_id = %state.turn_id(),
                    label = %raw,
                    "Unknown intent label, treating as casual"
                );
                IntentLabel::Casual
            }
        };
        debug!(turn_id = %state.turn_id(), label = %label, "Query classified");
        Ok(RouteDecision {
            label,
            signal: label.signal(),
            needs_visualization: label == IntentLabel::Visualize,
        })
    }
}
