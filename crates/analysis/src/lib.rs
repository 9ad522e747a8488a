//! ClauseLens analysis pipeline
//!
//! Turns an uploaded contract into a stored, cached analysis:
//! text extraction, prompt construction, completion cleanup and
//! parsing, and the read-through store used by the HTTP layer.

pub mod errors;
pub mod pdf;
pub mod processor;
pub mod prompt;
pub mod sanitize;
pub mod store;

pub use errors::AnalysisError;
pub use processor::{AnalyzerConfig, ContractAnalyzer};
pub use store::AnalysisStore;

#[cfg(test)]
pub(crate) mod test_support;
