//! Built-in collaborators that need no external model.
//!
//! Each implements one collaborator trait from `querygate_core` with keyword
//! and schema heuristics, so the service answers end to end out of the box.

pub mod charts;
pub mod classifier;
pub mod composer;
pub mod corrector;
pub mod generator;

pub use charts::HeuristicChartGenerator;
pub use classifier::KeywordClassifier;
pub use composer::TemplateComposer;
pub use corrector::FenceCorrector;
pub use generator::SchemaStatementGenerator;
