//! Fine-grained reranking of fused candidates.
//!
//! After rank fusion, the top candidates can optionally be re-scored by a
//! model that looks at the actual keyframe content instead of index-time
//! signals. Two scoring strategies sit behind one contract:
//!
//! - [`BiEncoderScorer`]: embeds the query and each keyframe independently
//!   and scores by cosine similarity.
//! - [`RemoteCrossScorer`]: ships query/image pairs to an HTTP cross-encoder
//!   that scores them jointly.
//!
//! Content loads run concurrently under a bounded pool with a per-candidate
//! timeout; a keyframe whose content cannot be loaded is demoted with a
//! sentinel score rather than silently dropped. Scorer failure bubbles up so
//! the caller can fall back to the fused ordering.

use super::types::{FrameContent, FrameId};
use crate::config::{RERANK_LOAD_CONCURRENCY, RERANK_LOAD_TIMEOUT, RERANK_SENTINEL_SCORE};
use crate::embedding::EmbeddingProvider;
use crate::error::{ContentError, RerankError};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

/// Maps a keyframe identifier to its visual content.
#[async_trait]
pub trait ContentLoader: Send + Sync {
    /// Loads the content for one keyframe.
    async fn load(&self, frame: &FrameId) -> Result<FrameContent, ContentError>;
}

/// Scores query/keyframe pairs with a fine-grained model.
///
/// Returned scores are raw similarities on the scorer's own scale, one per
/// input item, order-aligned with the input. How they feed back into the
/// final ordering (replace or blend) is the caller's decision.
#[async_trait]
pub trait FrameScorer: Send + Sync {
    /// Scores every `(frame, content)` pair against `query`.
    async fn score_batch(
        &self,
        query: &str,
        items: &[(FrameId, FrameContent)],
    ) -> Result<Vec<f32>, RerankError>;
}

/// Bi-encoder strategy: embed query and content independently, compare by
/// cosine similarity.
pub struct BiEncoderScorer {
    encoder: Arc<dyn EmbeddingProvider>,
}

impl BiEncoderScorer {
    /// Creates a scorer over the given embedding provider.
    pub fn new(encoder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { encoder }
    }
}

#[async_trait]
impl FrameScorer for BiEncoderScorer {
    async fn score_batch(
        &self,
        query: &str,
        items: &[(FrameId, FrameContent)],
    ) -> Result<Vec<f32>, RerankError> {
        let query_vec = self.encoder.encode_text(query).await?;

        let mut scores = Vec::with_capacity(items.len());
        for (_, content) in items {
            let content_vec = self.encoder.encode_content(content).await?;
            scores.push(cosine_similarity(&query_vec, &content_vec));
        }
        Ok(scores)
    }
}

/// Cosine similarity of two vectors; 0.0 when either has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|y| y * y).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

/// Default request timeout for the remote cross-encoder.
const CROSS_SCORER_TIMEOUT: Duration = Duration::from_secs(60);

/// Cross-encoder strategy: an HTTP service that scores query/image pairs
/// jointly (`/rerank` endpoint, Jina-style request shape).
#[derive(Debug, Clone)]
pub struct RemoteCrossScorer {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<String>,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankEntry>,
}

#[derive(Deserialize)]
struct RerankEntry {
    index: usize,
    relevance_score: f32,
}

impl RemoteCrossScorer {
    /// Creates a scorer for the service at `base_url` using `model`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(CROSS_SCORER_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl FrameScorer for RemoteCrossScorer {
    async fn score_batch(
        &self,
        query: &str,
        items: &[(FrameId, FrameContent)],
    ) -> Result<Vec<f32>, RerankError> {
        let url = format!("{}/rerank", self.base_url.trim_end_matches('/'));
        let documents = items
            .iter()
            .map(|(_, content)| format!("data:image/jpeg;base64,{}", BASE64.encode(&content.bytes)))
            .collect();

        let request = RerankRequest {
            model: &self.model,
            query,
            documents,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RerankError::ScorerUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RerankError::ScoringFailed(format!("{status}")));
        }

        let parsed: RerankResponse = response
            .json()
            .await
            .map_err(|e| RerankError::ScoringFailed(e.to_string()))?;

        // Responses come back ordered by relevance; realign to input order
        let mut scores = vec![RERANK_SENTINEL_SCORE; items.len()];
        for entry in parsed.results {
            if entry.index >= items.len() {
                return Err(RerankError::ScoringFailed(format!(
                    "result index {} out of range",
                    entry.index
                )));
            }
            scores[entry.index] = entry.relevance_score;
        }
        Ok(scores)
    }
}

/// Reranks fused candidates by direct query-to-content similarity.
///
/// Loads each candidate's content through the [`ContentLoader`] (bounded
/// concurrency, per-candidate timeout) and scores the successfully loaded
/// ones with the configured [`FrameScorer`]. Every input candidate appears
/// in the output map: unloadable ones carry
/// [`RERANK_SENTINEL_SCORE`], strictly lower than any real score.
pub struct FineReranker {
    loader: Arc<dyn ContentLoader>,
    scorer: Arc<dyn FrameScorer>,
    concurrency: usize,
    load_timeout: Duration,
}

impl FineReranker {
    /// Creates a reranker with default concurrency and timeout.
    pub fn new(loader: Arc<dyn ContentLoader>, scorer: Arc<dyn FrameScorer>) -> Self {
        Self {
            loader,
            scorer,
            concurrency: RERANK_LOAD_CONCURRENCY,
            load_timeout: RERANK_LOAD_TIMEOUT,
        }
    }

    /// Overrides the content-load worker pool size.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Overrides the per-candidate content-load timeout.
    pub fn with_load_timeout(mut self, load_timeout: Duration) -> Self {
        self.load_timeout = load_timeout;
        self
    }

    /// Scores `candidates` against `query`.
    ///
    /// # Errors
    ///
    /// Fails only when the scoring model itself fails; the caller is expected
    /// to fall back to its pre-rerank ordering in that case. Individual
    /// content-load failures never error; those candidates get the sentinel.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn rerank(
        &self,
        query: &str,
        candidates: &[FrameId],
    ) -> Result<HashMap<FrameId, f32>, RerankError> {
        let loaded: Vec<Option<(FrameId, FrameContent)>> = stream::iter(candidates.to_vec())
            .map(|frame| {
                let loader = Arc::clone(&self.loader);
                let load_timeout = self.load_timeout;
                async move {
                    match timeout(load_timeout, loader.load(&frame)).await {
                        Ok(Ok(content)) => Some((frame, content)),
                        Ok(Err(e)) => {
                            warn!(frame = %frame, error = %e, "content load failed, demoting");
                            None
                        }
                        Err(_) => {
                            warn!(frame = %frame, "content load timed out, demoting");
                            None
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let items: Vec<(FrameId, FrameContent)> = loaded.into_iter().flatten().collect();

        // Every candidate starts at the sentinel; successful scores overwrite
        let mut refined: HashMap<FrameId, f32> = candidates
            .iter()
            .map(|frame| (frame.clone(), RERANK_SENTINEL_SCORE))
            .collect();

        if items.is_empty() {
            warn!("no candidate content could be loaded for reranking");
            return Ok(refined);
        }

        debug!(loaded = items.len(), "scoring loaded candidates");
        let scores = self.scorer.score_batch(query, &items).await?;
        if scores.len() != items.len() {
            return Err(RerankError::ScoringFailed(format!(
                "scorer returned {} scores for {} items",
                scores.len(),
                items.len()
            )));
        }

        for ((frame, _), score) in items.iter().zip(scores) {
            refined.insert(frame.clone(), score);
        }
        Ok(refined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::types::VideoId;

    fn frame(video: &str, index: u32) -> FrameId {
        FrameId::new(VideoId::new(video), index)
    }

    struct MapLoader {
        frames: HashMap<FrameId, Vec<u8>>,
    }

    #[async_trait]
    impl ContentLoader for MapLoader {
        async fn load(&self, id: &FrameId) -> Result<FrameContent, ContentError> {
            self.frames
                .get(id)
                .map(|bytes| FrameContent::new(bytes.clone()))
                .ok_or_else(|| ContentError::NotFound(id.to_string()))
        }
    }

    /// Scores by content length; deterministic and model-free.
    struct LengthScorer;

    #[async_trait]
    impl FrameScorer for LengthScorer {
        async fn score_batch(
            &self,
            _query: &str,
            items: &[(FrameId, FrameContent)],
        ) -> Result<Vec<f32>, RerankError> {
            Ok(items.iter().map(|(_, c)| c.bytes.len() as f32).collect())
        }
    }

    struct FailingScorer;

    #[async_trait]
    impl FrameScorer for FailingScorer {
        async fn score_batch(
            &self,
            _query: &str,
            _items: &[(FrameId, FrameContent)],
        ) -> Result<Vec<f32>, RerankError> {
            Err(RerankError::ScorerUnavailable("model offline".to_string()))
        }
    }

    fn loader_with(frames: &[(FrameId, usize)]) -> Arc<dyn ContentLoader> {
        Arc::new(MapLoader {
            frames: frames
                .iter()
                .map(|(id, len)| (id.clone(), vec![0u8; *len]))
                .collect(),
        })
    }

    #[tokio::test]
    async fn test_rerank_scores_loaded_candidates() {
        let a = frame("v1", 0);
        let b = frame("v1", 1);
        let loader = loader_with(&[(a.clone(), 10), (b.clone(), 30)]);
        let reranker = FineReranker::new(loader, Arc::new(LengthScorer));

        let refined = reranker.rerank("query", &[a.clone(), b.clone()]).await.unwrap();

        assert_eq!(refined[&a], 10.0);
        assert_eq!(refined[&b], 30.0);
    }

    #[tokio::test]
    async fn test_missing_content_gets_sentinel_but_stays_present() {
        let present = frame("v1", 0);
        let missing = frame("v2", 7);
        let loader = loader_with(&[(present.clone(), 5)]);
        let reranker = FineReranker::new(loader, Arc::new(LengthScorer));

        let refined = reranker
            .rerank("query", &[present.clone(), missing.clone()])
            .await
            .unwrap();

        assert_eq!(refined.len(), 2);
        assert_eq!(refined[&missing], RERANK_SENTINEL_SCORE);
        assert!(refined[&missing] < refined[&present]);
    }

    #[tokio::test]
    async fn test_all_loads_failing_yields_all_sentinels() {
        let loader = loader_with(&[]);
        let reranker = FineReranker::new(loader, Arc::new(LengthScorer));

        let candidates = vec![frame("v1", 0), frame("v1", 1), frame("v2", 2)];
        let refined = reranker.rerank("query", &candidates).await.unwrap();

        assert_eq!(refined.len(), 3);
        assert!(refined.values().all(|&s| s == RERANK_SENTINEL_SCORE));
    }

    #[tokio::test]
    async fn test_scorer_failure_is_an_error() {
        let a = frame("v1", 0);
        let loader = loader_with(&[(a.clone(), 5)]);
        let reranker = FineReranker::new(loader, Arc::new(FailingScorer));

        let result = reranker.rerank("query", &[a]).await;
        assert!(matches!(result, Err(RerankError::ScorerUnavailable(_))));
    }

    #[tokio::test]
    async fn test_bi_encoder_scores_by_cosine() {
        struct AxisEncoder;

        #[async_trait]
        impl EmbeddingProvider for AxisEncoder {
            fn embedding_dim(&self) -> usize {
                2
            }

            async fn encode_text(&self, _text: &str) -> Result<Vec<f32>, crate::error::EmbeddingError> {
                Ok(vec![1.0, 0.0])
            }

            async fn encode_content(
                &self,
                content: &FrameContent,
            ) -> Result<Vec<f32>, crate::error::EmbeddingError> {
                // First byte steers the vector: 0 → aligned, 1 → orthogonal
                if content.bytes.first() == Some(&0) {
                    Ok(vec![1.0, 0.0])
                } else {
                    Ok(vec![0.0, 1.0])
                }
            }
        }

        let scorer = BiEncoderScorer::new(Arc::new(AxisEncoder));
        let items = vec![
            (frame("v1", 0), FrameContent::new(vec![0])),
            (frame("v1", 1), FrameContent::new(vec![1])),
        ];

        let scores = scorer.score_batch("query", &items).await.unwrap();
        assert!((scores[0] - 1.0).abs() < 1e-6);
        assert!(scores[1].abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
