//! Interfaces to the external collaborators the workflow delegates to.
//!
//! The engine treats each collaborator as an opaque async call. Any of them
//! may fail or return nothing; the engine absorbs that at the stage boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::types::{ChartSpec, QueryComplexity, Role, SchemaContext, TableResult};

/// A prior exchange handed to composers as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub query: String,
    pub response: String,
}

/// Everything the response composer may draw on for a data-backed answer.
#[derive(Debug, Clone, Copy)]
pub struct Composition<'a> {
    pub query: &'a str,
    pub table: Option<&'a TableResult>,
    pub chart: Option<&'a ChartSpec>,
    pub history: &'a [ConversationTurn],
}

/// Maps a query to an intent label. Labels outside the known vocabulary are
/// tolerated; the router treats them as casual conversation.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, query: &str) -> Result<String, CollaboratorError>;
}

/// Translates a natural-language query into a read statement.
#[async_trait]
pub trait StatementGenerator: Send + Sync {
    async fn generate(
        &self,
        query: &str,
        role: Role,
        schema: &SchemaContext,
        complexity: QueryComplexity,
    ) -> Result<String, CollaboratorError>;
}

/// Single-shot statement repair. Returns `Some(corrected)` when the statement
/// needed fixing, `None` when it is fine as is.
#[async_trait]
pub trait StatementCorrector: Send + Sync {
    async fn correct(&self, statement: &str) -> Result<Option<String>, CollaboratorError>;
}

/// Runs an approved statement against the data store.
///
/// Implementations must refuse anything that is not a read statement,
/// independently of the access validator.
#[async_trait]
pub trait ResultExecutor: Send + Sync {
    async fn execute(&self, statement: &str, role: Role) -> Result<TableResult, CollaboratorError>;

    /// Full data-store schema. Callers narrow it to what a role may see.
    async fn schema(&self) -> Result<SchemaContext, CollaboratorError>;
}

/// Derives a chart from a table. `None` means no sensible chart exists.
#[async_trait]
pub trait ChartSpecGenerator: Send + Sync {
    async fn generate(
        &self,
        table: &TableResult,
        query: &str,
    ) -> Result<Option<ChartSpec>, CollaboratorError>;
}

/// Produces the natural-language response text.
#[async_trait]
pub trait ResponseComposer: Send + Sync {
    async fn compose(&self, composition: Composition<'_>) -> Result<String, CollaboratorError>;

    /// Reply to casual conversation that needs no data.
    async fn converse(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<String, CollaboratorError>;
}
