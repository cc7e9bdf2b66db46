//! Caller-facing fixed messages.
//!
//! None of these ever include statement text or validator detail.

use querygate_core::Role;

/// Summarizer reply when an earlier stage or the composer failed.
pub const APOLOGY: &str =
    "I apologize, but I encountered an error processing your request. Please try again.";

/// Reply when the router or the denial stage itself fails.
pub const GENERIC_FAILURE: &str =
    "I'm sorry, I couldn't process that request right now. Please try again later.";

/// Reply for casual conversation when the composer has nothing to say.
pub const CASUAL_FALLBACK: &str = "Hello! I'm here to help. How can I assist you today?";

/// Polite refusal for a denied request, tailored to the caller's role.
pub fn denial_message(role: Role) -> String {
    let role_note = match role {
        Role::Viewer => {
            "As a viewer, you have limited access to basic user and order information."
        }
        Role::Readonly => {
            "As a read-only user, you can access users, orders, products, and categories."
        }
        Role::Analyst => {
            "As an analyst, you can access most business data but not sensitive or administrative information."
        }
        Role::Admin => "This request falls outside what can be answered from the data store.",
    };
    format!(
        "I don't have permission to access that information for you. {} \
         Please contact your administrator if you need access to this data.",
        role_note
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_message_mentions_role_scope() {
        let msg = denial_message(Role::Viewer);
        assert!(msg.starts_with("I don't have permission"));
        assert!(msg.contains("As a viewer"));
        assert!(msg.ends_with("Please contact your administrator if you need access to this data."));
    }

    #[test]
    fn test_denial_message_for_every_role() {
        for role in Role::ALL {
            let msg = denial_message(role);
            assert!(!msg.to_lowercase().contains("select"));
            assert!(msg.contains("administrator"));
        }
    }
}
