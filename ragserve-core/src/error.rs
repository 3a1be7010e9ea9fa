//! Error types for the `ragserve-core` crate.

use thiserror::Error;

/// Errors that can occur in the retrieval pipeline.
///
/// The taxonomy separates caller mistakes (`InvalidParameter`,
/// `EmptyCorpus`, `NoRelevantContent`) from remote-service failures
/// (`EmbeddingUnavailable`, `GenerationUnavailable`), which the HTTP
/// layer maps to 4xx and 5xx responses respectively.
#[derive(Debug, Error)]
pub enum RagError {
    /// A caller-supplied parameter failed validation.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The corpus contains no documents.
    #[error("The corpus is empty; ingest at least one document before querying")]
    EmptyCorpus,

    /// The corpus contains documents but none of them produced any chunks.
    #[error("The corpus contains no retrievable content")]
    NoRelevantContent,

    /// The remote embedding service failed after retries were exhausted.
    #[error("Embedding service unavailable ({provider}): {message}")]
    EmbeddingUnavailable {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The remote generation service failed after retries were exhausted.
    #[error("Generation service unavailable ({provider}): {message}")]
    GenerationUnavailable {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RagError {
    /// Whether this error was caused by the caller rather than a service.
    ///
    /// Caller errors are safe to report as 4xx and must not be retried.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            RagError::InvalidParameter(_)
                | RagError::EmptyCorpus
                | RagError::NoRelevantContent
                | RagError::ConfigError(_)
        )
    }
}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;
