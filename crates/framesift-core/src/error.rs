//! Error types for framesift-core.
//!
//! This module defines error types shared across the library: embedding
//! provider failures, keyframe content loading failures, and reranker
//! failures. Search-specific errors live next to the search types in
//! [`crate::search::types`], and retriever errors next to the retriever
//! traits in [`crate::search::retriever`].

use thiserror::Error;

/// Errors that can occur while encoding text or visual content.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    /// The encoding service could not be reached
    #[error("Encoder unreachable: {0}")]
    Unreachable(String),
    /// The encoding request was rejected or failed remotely
    #[error("Encoding request failed: {0}")]
    RequestFailed(String),
    /// The service responded with something we could not parse
    #[error("Invalid encoder response: {0}")]
    InvalidResponse(String),
    /// Returned vector has the wrong dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected embedding dimension
        expected: usize,
        /// Actual embedding dimension received
        actual: usize,
    },
}

/// Errors that can occur while loading keyframe content.
#[derive(Debug, Clone, Error)]
pub enum ContentError {
    /// No content exists for the requested keyframe
    #[error("Content not found: {0}")]
    NotFound(String),
    /// Content exists but could not be read
    #[error("Failed to load content: {0}")]
    LoadFailed(String),
    /// Content was read but is invalid or corrupted
    #[error("Invalid content data: {0}")]
    InvalidData(String),
}

/// Errors that can occur during fine-grained reranking.
///
/// A `RerankError` is never fatal to a search: the engine falls back to the
/// fused ordering when the reranker fails.
#[derive(Debug, Clone, Error)]
pub enum RerankError {
    /// The scoring model is not available (failed to initialize or reach)
    #[error("Scorer unavailable: {0}")]
    ScorerUnavailable(String),
    /// Scoring ran but produced an unusable result
    #[error("Scoring failed: {0}")]
    ScoringFailed(String),
}

impl From<EmbeddingError> for RerankError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::Unreachable(msg) => RerankError::ScorerUnavailable(msg),
            other => RerankError::ScoringFailed(other.to_string()),
        }
    }
}
