//! Multi-signal keyframe search.
//!
//! This module implements the retrieval pipeline that combines:
//! - **Vector similarity** (keyframe embeddings, distance-ranked)
//! - **Lexical metadata** (video titles/descriptions/keywords, relevance-ranked)
//! - **Lexical content** (OCR text and detected objects, relevance-ranked)
//! - **Reciprocal Rank Fusion** (RRF) to merge the rankings
//! - an optional **fine-grained reranker** over the fused top candidates
//!
//! # Architecture
//!
//! - `types`: core types (VideoId, FrameId, RankedList, SearchResult, SearchError)
//! - `query`: structured queries and the per-source decomposer
//! - `retriever`: collaborator traits for the three signal backends
//! - `granularity`: video-level vs keyframe-level reconciliation
//! - `fusion`: the RRF algorithm
//! - `rerank`: content loading and fine-grained scoring strategies
//! - `engine`: the orchestrating [`RetrievalEngine`]
//!
//! # Usage
//!
//! ```ignore
//! use framesift_core::search::{RetrievalEngine, StructuredQuery};
//!
//! let engine = RetrievalEngine::new(vector, metadata, content, encoder);
//! let results = engine
//!     .search(&StructuredQuery::text("a vehicle on the road"), 20)
//!     .await?;
//! ```
//!
//! # Algorithm details
//!
//! **Reciprocal Rank Fusion**: `score = 1 / (k + rank + 1)` summed per list,
//! k=60 by default. Fuses on rank position only, which is what makes distance
//! scores and relevance scores combinable without normalization.
//!
//! **Granularity**: metadata scores whole videos while the other sources
//! score keyframes; video scores are propagated onto already-known keyframe
//! candidates before fusion (never inventing new ones), or everything
//! collapses to video level when no keyframe candidates exist.

pub mod types;

mod engine;
mod granularity;
mod query;
mod retriever;

#[doc(hidden)]
pub mod fusion;
#[doc(hidden)]
pub mod rerank;

// Re-export main types (public API)
pub use engine::{EngineConfig, RerankMode, RerankSettings, RetrievalEngine};
pub use granularity::{collapse_to_videos, propagate_to_frames, reconcile, Reconciled, ScopedList};
pub use query::{decompose, ObjectConstraint, StructuredQuery, SubQuery};
pub use rerank::{BiEncoderScorer, ContentLoader, FineReranker, FrameScorer, RemoteCrossScorer};
pub use retriever::{ContentRetriever, MetadataRetriever, RetrieverError, VectorRetriever};
pub use types::{
    FrameContent, FrameId, RankedList, SearchError, SearchResult, SortDirection, VideoId,
};

pub use fusion::{reciprocal_rank_fusion, RRF_K};
