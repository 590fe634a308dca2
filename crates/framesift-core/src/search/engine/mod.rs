//! The retrieval engine: decompose, retrieve, reconcile, fuse, rerank.
//!
//! This is the single operation the library exposes to callers:
//! [`RetrievalEngine::search`] takes a [`StructuredQuery`] and returns the
//! final explainable ranking. The stages:
//!
//! 1. Decompose the query into per-source sub-queries.
//! 2. Issue the signal retriever calls concurrently, each under its own
//!    timeout. A source that fails or times out contributes an empty list;
//!    the search proceeds with whatever completed.
//! 3. Reconcile granularity so every list addresses the same candidate space.
//! 4. Fuse by reciprocal rank.
//! 5. Optionally re-score the fused top-N with the fine-grained reranker.
//! 6. Assemble result records carrying per-source raw scores.
//!
//! Everything the engine computes is request-scoped; the engine itself is
//! constructed once at startup and shared immutably across requests.


use super::fusion::reciprocal_rank_fusion;
use super::granularity::{reconcile, Reconciled, ScopedList};
use super::query::{decompose, ObjectConstraint, StructuredQuery, SubQuery};
use super::rerank::FineReranker;
use super::retriever::{ContentRetriever, MetadataRetriever, VectorRetriever};
use super::types::{FrameId, RankedList, SearchError, SearchResult, SortDirection, VideoId};
use crate::config::{
    CONTENT_CANDIDATE_LIMIT, METADATA_CANDIDATE_LIMIT, RERANK_TOP_N, RETRIEVER_TIMEOUT, RRF_K,
    VECTOR_CANDIDATE_LIMIT,
};
use crate::embedding::EmbeddingProvider;
use crate::metrics::global_metrics;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// How reranker output feeds back into the final ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerankMode {
    /// Reorder the fused top-N by refined score, demoted sentinels last.
    /// Stable on ties, so an entirely failed batch leaves the fused order
    /// untouched.
    Replace,
    /// Fuse the refined ordering with the RRF ordering via a second
    /// reciprocal-rank pass, blending both signals instead of trusting the
    /// reranker outright.
    Fuse,
}

/// Reranking stage settings.
#[derive(Debug, Clone)]
pub struct RerankSettings {
    /// How many fused candidates to hand to the reranker
    pub top_n: usize,
    /// How refined scores combine with the fused ordering
    pub mode: RerankMode,
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self {
            top_n: RERANK_TOP_N,
            mode: RerankMode::Replace,
        }
    }
}

/// Per-engine configuration. [`Default`] mirrors the constants in
/// [`crate::config`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// RRF dampening constant
    pub rrf_k: f32,
    /// Candidate limit for the vector retriever
    pub vector_limit: usize,
    /// Candidate limit for the metadata retriever
    pub metadata_limit: usize,
    /// Candidate limit for the content retriever
    pub content_limit: usize,
    /// Per-retriever timeout; slower sources are skipped for the request
    pub retriever_timeout: Duration,
    /// Rerank stage settings; `None` disables reranking even when a
    /// reranker is attached
    pub rerank: Option<RerankSettings>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rrf_k: RRF_K,
            vector_limit: VECTOR_CANDIDATE_LIMIT,
            metadata_limit: METADATA_CANDIDATE_LIMIT,
            content_limit: CONTENT_CANDIDATE_LIMIT,
            retriever_timeout: RETRIEVER_TIMEOUT,
            rerank: Some(RerankSettings::default()),
        }
    }
}

/// Per-source raw scores retained for result assembly. Diagnostic only;
/// never feeds back into fusion math.
struct SignalScores {
    vector: HashMap<FrameId, f32>,
    content: HashMap<FrameId, f32>,
    metadata: HashMap<VideoId, f32>,
}

/// Multi-signal retrieval engine.
///
/// Generic over the three signal retrievers so infrastructure adapters plug
/// in without dynamic dispatch on the hot path; the embedding provider and
/// reranker are shared trait objects since both are optional collaborators
/// swapped at configuration time.
pub struct RetrievalEngine<V, M, C> {
    vector: V,
    metadata: M,
    content: C,
    encoder: Arc<dyn EmbeddingProvider>,
    reranker: Option<FineReranker>,
    config: EngineConfig,
}

impl<V, M, C> RetrievalEngine<V, M, C>
where
    V: VectorRetriever,
    M: MetadataRetriever,
    C: ContentRetriever,
{
    /// Creates an engine with default configuration and no reranker.
    pub fn new(vector: V, metadata: M, content: C, encoder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            vector,
            metadata,
            content,
            encoder,
            reranker: None,
            config: EngineConfig::default(),
        }
    }

    /// Replaces the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches a fine-grained reranker.
    pub fn with_reranker(mut self, reranker: FineReranker) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Runs a full multi-signal search.
    ///
    /// Returns at most `top_k` result records ordered best-first. An empty
    /// query yields an empty result, not an error; so does a query for which
    /// every backend failed (availability over completeness).
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidQuery`] if `top_k` is 0.
    #[must_use = "Search results should be used or errors handled"]
    #[instrument(skip(self, query))]
    pub async fn search(
        &self,
        query: &StructuredQuery,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if top_k == 0 {
            return Err(SearchError::InvalidQuery(
                "Number of results (top_k) must be greater than 0".to_string(),
            ));
        }

        let total_start = Instant::now();

        let sub_queries = decompose(query);
        if sub_queries.is_empty() {
            info!("query decomposed to nothing, returning empty result");
            return Ok(Vec::new());
        }

        let mut vector_text: Option<String> = None;
        let mut metadata_text = String::new();
        let mut content_text = String::new();
        let mut object_constraints: Vec<ObjectConstraint> = Vec::new();
        for sub in sub_queries {
            match sub {
                SubQuery::Vector { text } => vector_text = Some(text),
                SubQuery::Metadata { text } => metadata_text = text,
                SubQuery::Content { text, objects } => {
                    content_text = text;
                    object_constraints = objects;
                }
            }
        }

        // Independent read-only sources: issue all three concurrently, each
        // with its own timeout
        let retrieve_start = Instant::now();
        let (vector_list, metadata_list, content_list) = tokio::join!(
            self.run_vector(vector_text.as_deref()),
            self.run_metadata(&metadata_text),
            self.run_content(&content_text, &object_constraints),
        );
        global_metrics().record("search.retrieve", elapsed_ms(retrieve_start));

        debug!(
            vector = vector_list.len(),
            metadata = metadata_list.len(),
            content = content_list.len(),
            "signal retrieval complete"
        );

        let signals = SignalScores {
            vector: score_map(&vector_list),
            content: score_map(&content_list),
            metadata: score_map(&metadata_list),
        };

        let fuse_start = Instant::now();
        let reconciled = reconcile(vec![
            ScopedList::Frames(vector_list),
            ScopedList::Frames(content_list),
            ScopedList::Videos(metadata_list),
        ]);

        let results = match reconciled {
            Reconciled::Frames(lists) => {
                let fused = reciprocal_rank_fusion(&lists, self.config.rrf_k);
                global_metrics().record("search.fuse", elapsed_ms(fuse_start));

                let rerank_query = vector_text.unwrap_or_default();
                let (ordered, refined) = self.apply_rerank(&rerank_query, fused).await;

                ordered
                    .into_iter()
                    .take(top_k)
                    .map(|(frame, score)| SearchResult {
                        vector_score: signals.vector.get(&frame).copied(),
                        content_score: signals.content.get(&frame).copied(),
                        metadata_score: signals.metadata.get(&frame.video).copied(),
                        rerank_score: refined.as_ref().and_then(|r| r.get(&frame).copied()),
                        video_id: frame.video,
                        keyframe_index: Some(frame.index),
                        score,
                    })
                    .collect()
            }
            Reconciled::Videos(lists) => {
                let fused = reciprocal_rank_fusion(&lists, self.config.rrf_k);
                global_metrics().record("search.fuse", elapsed_ms(fuse_start));

                fused
                    .into_iter()
                    .take(top_k)
                    .map(|(video, score)| SearchResult {
                        metadata_score: signals.metadata.get(&video).copied(),
                        video_id: video,
                        keyframe_index: None,
                        score,
                        vector_score: None,
                        content_score: None,
                        rerank_score: None,
                    })
                    .collect()
            }
        };

        global_metrics().record("search.total", elapsed_ms(total_start));
        Ok(results)
    }

    /// Encodes the query text and runs the vector retriever. Encoder or
    /// backend failure degrades to an empty list, logged once per request.
    async fn run_vector(&self, text: Option<&str>) -> RankedList<FrameId> {
        let empty = || RankedList::new(SortDirection::Ascending);

        let Some(text) = text else {
            return empty();
        };

        let embedding = match self.encoder.encode_text(text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "query encoding failed, skipping vector signal");
                return empty();
            }
        };

        match timeout(
            self.config.retriever_timeout,
            self.vector.search(&embedding, self.config.vector_limit),
        )
        .await
        {
            Ok(Ok(list)) => list,
            Ok(Err(e)) => {
                warn!(error = %e, "vector backend failed, proceeding without it");
                empty()
            }
            Err(_) => {
                warn!("vector backend timed out, proceeding without it");
                empty()
            }
        }
    }

    async fn run_metadata(&self, text: &str) -> RankedList<VideoId> {
        match timeout(
            self.config.retriever_timeout,
            self.metadata.search(text, self.config.metadata_limit),
        )
        .await
        {
            Ok(Ok(list)) => list,
            Ok(Err(e)) => {
                warn!(error = %e, "metadata backend failed, proceeding without it");
                RankedList::new(SortDirection::Descending)
            }
            Err(_) => {
                warn!("metadata backend timed out, proceeding without it");
                RankedList::new(SortDirection::Descending)
            }
        }
    }

    async fn run_content(
        &self,
        text: &str,
        objects: &[ObjectConstraint],
    ) -> RankedList<FrameId> {
        match timeout(
            self.config.retriever_timeout,
            self.content.search(text, objects, self.config.content_limit),
        )
        .await
        {
            Ok(Ok(list)) => list,
            Ok(Err(e)) => {
                warn!(error = %e, "content backend failed, proceeding without it");
                RankedList::new(SortDirection::Descending)
            }
            Err(_) => {
                warn!("content backend timed out, proceeding without it");
                RankedList::new(SortDirection::Descending)
            }
        }
    }

    /// Applies the optional rerank stage to a fused frame ordering.
    ///
    /// Returns the (possibly reordered) candidates, still carrying their
    /// fused scores, plus the refined score map for diagnostics. Reranker
    /// failure falls back to the fused order, logged once.
    async fn apply_rerank(
        &self,
        query: &str,
        fused: Vec<(FrameId, f32)>,
    ) -> (Vec<(FrameId, f32)>, Option<HashMap<FrameId, f32>>) {
        let (Some(reranker), Some(settings)) = (&self.reranker, &self.config.rerank) else {
            return (fused, None);
        };
        if fused.is_empty() || query.is_empty() {
            return (fused, None);
        }

        let rerank_start = Instant::now();
        let n = settings.top_n.min(fused.len());
        let head_ids: Vec<FrameId> = fused[..n].iter().map(|(id, _)| id.clone()).collect();

        let refined = match reranker.rerank(query, &head_ids).await {
            Ok(refined) => refined,
            Err(e) => {
                warn!(error = %e, "reranker unavailable, keeping fused order");
                return (fused, None);
            }
        };

        let mut head: Vec<(FrameId, f32)> = fused[..n].to_vec();
        match settings.mode {
            RerankMode::Replace => {
                // Stable sort: equal refined scores (including an
                // all-sentinel batch) preserve the fused order exactly
                head.sort_by(|a, b| {
                    refined[&b.0]
                        .partial_cmp(&refined[&a.0])
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            }
            RerankMode::Fuse => {
                let fused_scores = RankedList::from_entries(SortDirection::Descending, head.clone());
                let refined_scores = RankedList::from_entries(
                    SortDirection::Descending,
                    head.iter()
                        .map(|(id, _)| (id.clone(), refined[id]))
                        .collect(),
                );
                let blended = reciprocal_rank_fusion(
                    &[fused_scores, refined_scores],
                    self.config.rrf_k,
                );

                let original: HashMap<FrameId, f32> = head.iter().cloned().collect();
                head = blended
                    .into_iter()
                    .map(|(id, _)| {
                        let score = original[&id];
                        (id, score)
                    })
                    .collect();
            }
        }

        let mut ordered = head;
        ordered.extend_from_slice(&fused[n..]);
        global_metrics().record("search.rerank", elapsed_ms(rerank_start));
        (ordered, Some(refined))
    }
}

fn score_map<K: Clone + Eq + std::hash::Hash>(list: &RankedList<K>) -> HashMap<K, f32> {
    list.entries().iter().cloned().collect()
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
