//! Keyword-based intent classification.

use async_trait::async_trait;
use regex::Regex;

use querygate_core::{Classifier, CollaboratorError};

use crate::router::IntentLabel;

/// Classifies queries by keyword groups, checked in priority order:
/// restricted, visualize, casual (no data terms), complex, simple.
pub struct KeywordClassifier {
    restricted: Regex,
    visualize: Regex,
    data_terms: Regex,
    aggregation: Regex,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self {
            restricted: Regex::new(
                r"(?i)\b(passwords?|salar(?:y|ies)|ssn|social\s+security|credit\s+cards?|secrets?|api\s+keys?|private\s+keys?|drop|delete|truncate|insert|alter)\b",
            )
            .expect("Invalid restricted regex"),
            visualize: Regex::new(
                r"(?i)\b(charts?|graphs?|plots?|plotting|visuali[sz]e|visuali[sz]ation|diagram|histogram|pie|dashboard)\b",
            )
            .expect("Invalid visualization regex"),
            data_terms: Regex::new(
                r"(?i)\b(users?|customers?|orders?|purchases?|products?|items?|categor(?:y|ies)|sales|revenue|analytics|metrics?|amounts?|prices?|stock|emails?|city|cities|months?|monthly|regions?|tables?|data|records?|rows?|count|total|average|sum|list|show|find|get|display)\b",
            )
            .expect("Invalid data-term regex"),
            aggregation: Regex::new(
                r"(?i)\b(total|sum|average|avg|count|how\s+many|group(?:ed)?|by\s+(?:month|region|category|city|status)|per|top\s+\d*|most|highest|lowest|trend|compare|comparison|breakdown|monthly)\b",
            )
            .expect("Invalid aggregation regex"),
        }
    }

    /// Classify synchronously.
    pub fn label(&self, query: &str) -> IntentLabel {
        if self.restricted.is_match(query) {
            IntentLabel::Restricted
        } else if self.visualize.is_match(query) {
            IntentLabel::Visualize
        } else if !self.data_terms.is_match(query) {
            IntentLabel::Casual
        } else if self.aggregation.is_match(query) {
            IntentLabel::Complex
        } else {
            IntentLabel::Simple
        }
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, query: &str) -> Result<String, CollaboratorError> {
        Ok(self.label(query).to_string())
    }
}
