//! Cosmetic statement repair.

use async_trait::async_trait;

use querygate_core::{CollaboratorError, StatementCorrector};

/// Strips markdown fences, collapses whitespace and drops trailing
/// semicolons. Never changes what a statement reads.
#[derive(Debug, Default, Clone, Copy)]
pub struct FenceCorrector;

impl FenceCorrector {
    pub fn clean(statement: &str) -> String {
        let mut text = statement.trim();
        if let Some(rest) = text.strip_prefix("```") {
            // Drop an optional language tag on the opening fence.
            text = match rest.find('\n') {
                Some(idx) if is_language_tag(&rest[..idx]) => &rest[idx + 1..],
                _ => rest,
            };
        }
        if let Some(rest) = text.trim_end().strip_suffix("```") {
            text = rest;
        }
        let collapsed = collapse_whitespace(text);
        collapsed.trim_end_matches([';', ' ']).to_string()
    }
}

/// Collapse whitespace runs to one space, leaving quoted spans untouched.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut closing: Option<char> = None;
    let mut pending_space = false;
    for c in text.chars() {
        if let Some(close) = closing {
            out.push(c);
            if c == close {
                closing = None;
            }
            continue;
        }
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        closing = match c {
            '\'' | '"' | '`' => Some(c),
            '[' => Some(']'),
            _ => None,
        };
        out.push(c);
    }
    out
}

fn is_language_tag(word: &str) -> bool {
    let word = word.trim();
    word.chars().all(|c| c.is_ascii_alphanumeric())
        && !word.eq_ignore_ascii_case("select")
        && !word.eq_ignore_ascii_case("with")
}

#[async_trait]
impl StatementCorrector for FenceCorrector {
    async fn correct(&self, statement: &str) -> Result<Option<String>, CollaboratorError> {
        let cleaned = Self::clean(statement);
        if cleaned.is_empty() {
            return Err(CollaboratorError::Empty("statement corrector"));
        }
        Ok((cleaned != statement).then_some(cleaned))
    }
}
