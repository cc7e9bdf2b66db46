pub mod collaborator;
pub mod config;
pub mod error;
pub mod types;

pub use collaborator::{
    Classifier, ChartSpecGenerator, Composition, ConversationTurn, ResponseComposer,
    ResultExecutor, StatementCorrector, StatementGenerator,
};
pub use config::QuerygateConfig;
pub use error::{CollaboratorError, QuerygateError, Result};
pub use types::*;
