//! Role-based access control for generated read statements.
//!
//! [`PolicyStore`] holds the static role table; [`AccessValidator`] checks a
//! statement against it using the lexical scan in [`lexer`].

pub mod error;
pub mod lexer;
pub mod policy;
pub mod validator;

pub use error::AccessError;
pub use policy::{PolicyEntry, PolicyStore, TableScope};
pub use validator::{AccessDecision, AccessValidator, DenyReason};
