//! Collaborator traits for the signal retrieval backends.
//!
//! Each signal source (vector similarity, lexical metadata, lexical content)
//! is an independent read-only service behind one of these traits. A
//! retriever answers a single query operation with a direction-tagged
//! [`RankedList`], so the declared sort semantics travel with the data.
//!
//! Infrastructure adapters implement these traits; the engine only sees the
//! contract. Implementations take `&self` and are shared immutably across
//! requests; per-request state belongs to the request, not the client.
//! Retriever failures are never fatal to a search: the engine treats a failed
//! or timed-out source as having returned nothing.

use super::query::ObjectConstraint;
use super::types::{FrameId, RankedList, VideoId};
use async_trait::async_trait;
use thiserror::Error;

/// Errors a signal retriever can report.
#[derive(Debug, Clone, Error)]
pub enum RetrieverError {
    /// The backend cannot be reached
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    /// The backend was reached but the query failed
    #[error("Backend query failed: {0}")]
    QueryFailed(String),
}

/// Nearest-neighbor search over keyframe embeddings.
///
/// Returns an Ascending list: raw scores are distances, lower is better.
#[async_trait]
pub trait VectorRetriever: Send + Sync {
    /// Finds up to `limit` keyframes nearest to `embedding`.
    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<RankedList<FrameId>, RetrieverError>;
}

/// Lexical search over video-level metadata (title, description, keywords).
///
/// Returns a Descending list: raw scores are relevance, higher is better.
/// Empty query text matches all known videos with a uniform neutral score
/// rather than erroring, so metadata can still contribute a candidate pool
/// when the user gave no metadata clause.
#[async_trait]
pub trait MetadataRetriever: Send + Sync {
    /// Scores videos against `text`, returning up to `limit` results.
    async fn search(
        &self,
        text: &str,
        limit: usize,
    ) -> Result<RankedList<VideoId>, RetrieverError>;
}

/// Lexical search over keyframe content: OCR text and detected objects.
///
/// Returns a Descending list. When `objects` is non-empty, only keyframes
/// satisfying *all* label constraints qualify and the text match acts as a
/// score boost. With no constraints, text alone determines results. With
/// neither, the call is a no-op that may return all known keyframes at a
/// uniform score or nothing at all. Callers tolerate either.
#[async_trait]
pub trait ContentRetriever: Send + Sync {
    /// Scores keyframes against `text` under `objects` constraints,
    /// returning up to `limit` results.
    async fn search(
        &self,
        text: &str,
        objects: &[ObjectConstraint],
        limit: usize,
    ) -> Result<RankedList<FrameId>, RetrieverError>;
}
