//! Embedding provider abstractions.
//!
//! The engine never runs a model itself: query text and keyframe content are
//! encoded by an external collaborator behind the [`EmbeddingProvider`]
//! trait. The one production implementation talks HTTP to an
//! OpenAI-compatible embedding service ([`RemoteEncoder`]); tests substitute
//! their own deterministic providers.

mod remote;
mod traits;

pub use remote::RemoteEncoder;
pub use traits::EmbeddingProvider;
