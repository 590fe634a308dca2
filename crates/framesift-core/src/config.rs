//! Production configuration constants.
//!
//! Default values used throughout the engine and by the CLI. Every one of
//! these can be overridden per engine via
//! [`EngineConfig`](crate::search::EngineConfig); the constants exist so the
//! engine, the tests, and the CLI agree on the same numbers.

use std::time::Duration;

// =============================================================================
// Rank fusion
// =============================================================================

/// Default `k` constant for reciprocal rank fusion.
///
/// The value 60 comes from the original RRF paper ("Reciprocal Rank Fusion
/// outperforms Condorcet and individual Rank Learning Methods", Cormack,
/// Clarke and Buettcher, SIGIR 2009) and dampens the weight of low ranks:
/// smaller k emphasizes top results, larger k flattens the curve.
pub const RRF_K: f32 = 60.0;

// =============================================================================
// Signal retriever candidate limits
// =============================================================================

/// Maximum keyframe candidates requested from the vector retriever.
pub const VECTOR_CANDIDATE_LIMIT: usize = 500;

/// Maximum video candidates requested from the metadata retriever.
pub const METADATA_CANDIDATE_LIMIT: usize = 500;

/// Maximum keyframe candidates requested from the content (OCR/object)
/// retriever. Larger than the others because object constraints narrow the
/// set before scoring.
pub const CONTENT_CANDIDATE_LIMIT: usize = 1000;

/// Per-retriever timeout. A retriever that exceeds this is treated as having
/// returned nothing; the search proceeds with the lists that completed.
pub const RETRIEVER_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Fine-grained reranking
// =============================================================================

/// Default number of fused candidates handed to the reranker.
pub const RERANK_TOP_N: usize = 100;

/// Maximum concurrent keyframe content loads during reranking.
pub const RERANK_LOAD_CONCURRENCY: usize = 8;

/// Per-candidate content load timeout. One slow load must not stall the
/// whole batch.
pub const RERANK_LOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Score assigned to candidates whose content could not be loaded during
/// reranking. Strictly lower than any score a scorer can produce, so failed
/// candidates are demoted to the end of the reranked block instead of being
/// dropped.
pub const RERANK_SENTINEL_SCORE: f32 = f32::NEG_INFINITY;

// =============================================================================
// Embedding
// =============================================================================

/// Embedding vector dimension of the default CLIP-family encoder.
pub const EMBEDDING_DIM: usize = 512;
