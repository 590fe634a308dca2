//! The embedding collaborator contract.

use crate::error::EmbeddingError;
use crate::search::types::FrameContent;
use async_trait::async_trait;

/// Encodes text and visual content into a shared embedding space.
///
/// Stateless per call from the engine's perspective: the provider owns
/// whatever model or connection state it needs, loaded once at process
/// startup and reused for every request (never re-initialized per request).
///
/// Implementations must be `Send + Sync`; the engine shares one provider
/// across concurrent searches behind an `Arc`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// The dimension of every vector this provider produces.
    fn embedding_dim(&self) -> usize;

    /// Encodes query text into an embedding of [`embedding_dim`] length.
    ///
    /// [`embedding_dim`]: EmbeddingProvider::embedding_dim
    async fn encode_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Encodes keyframe content into an embedding of the same dimension,
    /// comparable to text embeddings (CLIP-style joint space).
    async fn encode_content(&self, content: &FrameContent) -> Result<Vec<f32>, EmbeddingError>;
}
