//! In-memory signal backends.

use crate::error::ContentError;
use crate::search::{
    ContentLoader, ContentRetriever, FrameContent, FrameId, MetadataRetriever, ObjectConstraint,
    RankedList, RetrieverError, SortDirection, VectorRetriever, VideoId,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Boost applied to title matches, mirroring the production index mapping.
const TITLE_BOOST: f32 = 2.0;
/// Boost applied to keyword matches.
const KEYWORD_BOOST: f32 = 1.5;
/// Boost applied to OCR text matches in content search.
const OCR_BOOST: f32 = 2.0;
/// Extra score when a detected-object count meets the requested minimum.
const COUNT_MET_BOOST: f32 = 1.5;
/// Neutral score for match-all results.
const NEUTRAL_SCORE: f32 = 1.0;

/// Video-level descriptive metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Video title
    #[serde(default)]
    pub title: String,
    /// Longer description
    #[serde(default)]
    pub description: String,
    /// Keyword tags
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// An object detected in a keyframe, with its detection count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Object label, e.g. "person"
    pub label: String,
    /// How many instances were detected
    pub count: u32,
}

/// Indexed per-keyframe content: OCR text plus detected objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameDocument {
    /// Text recognized in the keyframe
    #[serde(default)]
    pub ocr_text: String,
    /// Objects detected in the keyframe
    #[serde(default)]
    pub objects: Vec<DetectedObject>,
}

/// Linear-scan vector index over keyframe embeddings (L2 distance).
#[derive(Debug, Default)]
pub struct MemoryVectorIndex {
    entries: Vec<(FrameId, Vec<f32>)>,
}

impl MemoryVectorIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a keyframe embedding.
    pub fn insert(&mut self, frame: FrameId, embedding: Vec<f32>) {
        self.entries.push((frame, embedding));
    }

    /// Number of indexed embeddings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl VectorRetriever for MemoryVectorIndex {
    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<RankedList<FrameId>, RetrieverError> {
        let mut scored: Vec<(FrameId, f32)> = self
            .entries
            .iter()
            .map(|(frame, stored)| (frame.clone(), l2_distance(embedding, stored)))
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(RankedList::from_entries(SortDirection::Ascending, scored))
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Token-overlap metadata index with per-field boosts.
#[derive(Debug, Default)]
pub struct MemoryMetadataIndex {
    videos: Vec<(VideoId, VideoMetadata)>,
}

impl MemoryMetadataIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a video's metadata.
    pub fn insert(&mut self, video: VideoId, metadata: VideoMetadata) {
        self.videos.push((video, metadata));
    }

    /// Number of indexed videos.
    pub fn len(&self) -> usize {
        self.videos.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}

#[async_trait]
impl MetadataRetriever for MemoryMetadataIndex {
    async fn search(
        &self,
        text: &str,
        limit: usize,
    ) -> Result<RankedList<VideoId>, RetrieverError> {
        // Empty query matches all videos at a neutral score
        if text.trim().is_empty() {
            let mut all: Vec<(VideoId, f32)> = self
                .videos
                .iter()
                .map(|(video, _)| (video.clone(), NEUTRAL_SCORE))
                .collect();
            all.truncate(limit);
            return Ok(RankedList::from_entries(SortDirection::Descending, all));
        }

        let query_tokens = tokenize(text);
        let mut scored: Vec<(VideoId, f32)> = self
            .videos
            .iter()
            .filter_map(|(video, metadata)| {
                let keywords = metadata.keywords.join(" ");
                let score = TITLE_BOOST * overlap(&query_tokens, &metadata.title)
                    + overlap(&query_tokens, &metadata.description)
                    + KEYWORD_BOOST * overlap(&query_tokens, &keywords);
                (score > 0.0).then(|| (video.clone(), score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(RankedList::from_entries(SortDirection::Descending, scored))
    }
}

/// OCR/object content index.
#[derive(Debug, Default)]
pub struct MemoryContentIndex {
    frames: Vec<(FrameId, FrameDocument)>,
}

impl MemoryContentIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a keyframe's content document.
    pub fn insert(&mut self, frame: FrameId, document: FrameDocument) {
        self.frames.push((frame, document));
    }

    /// Number of indexed keyframes.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[async_trait]
impl ContentRetriever for MemoryContentIndex {
    async fn search(
        &self,
        text: &str,
        objects: &[ObjectConstraint],
        limit: usize,
    ) -> Result<RankedList<FrameId>, RetrieverError> {
        let text = text.trim();

        // No query at all: a no-op that answers with everything at a
        // neutral score (callers tolerate uniform-or-empty)
        if text.is_empty() && objects.is_empty() {
            let mut all: Vec<(FrameId, f32)> = self
                .frames
                .iter()
                .map(|(frame, _)| (frame.clone(), NEUTRAL_SCORE))
                .collect();
            all.truncate(limit);
            return Ok(RankedList::from_entries(SortDirection::Descending, all));
        }

        let query_tokens = tokenize(text);
        let mut scored: Vec<(FrameId, f32)> = self
            .frames
            .iter()
            .filter_map(|(frame, doc)| {
                let mut score = 0.0;

                // Object constraints are hard requirements; the count
                // threshold only boosts
                for constraint in objects {
                    let detected = doc
                        .objects
                        .iter()
                        .find(|o| o.label.eq_ignore_ascii_case(&constraint.label))?;
                    score += 1.0;
                    if detected.count >= constraint.min_count {
                        score += COUNT_MET_BOOST;
                    }
                }

                score += OCR_BOOST * overlap(&query_tokens, &doc.ocr_text);

                if objects.is_empty() && score == 0.0 {
                    return None;
                }
                Some((frame.clone(), score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(RankedList::from_entries(SortDirection::Descending, scored))
    }
}

/// In-memory keyframe content store.
#[derive(Debug, Default)]
pub struct MemoryFrameStore {
    frames: HashMap<FrameId, Vec<u8>>,
}

impl MemoryFrameStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the encoded image bytes for a keyframe.
    pub fn insert(&mut self, frame: FrameId, bytes: Vec<u8>) {
        self.frames.insert(frame, bytes);
    }
}

#[async_trait]
impl ContentLoader for MemoryFrameStore {
    async fn load(&self, frame: &FrameId) -> Result<FrameContent, ContentError> {
        self.frames
            .get(frame)
            .map(|bytes| FrameContent::new(bytes.clone()))
            .ok_or_else(|| ContentError::NotFound(frame.to_string()))
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

/// Number of query tokens that occur in `field`, as f32.
fn overlap(query_tokens: &[String], field: &str) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let field_tokens = tokenize(field);
    query_tokens
        .iter()
        .filter(|token| field_tokens.contains(token))
        .count() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(video: &str, index: u32) -> FrameId {
        FrameId::new(VideoId::new(video), index)
    }

    #[tokio::test]
    async fn test_vector_index_ranks_by_distance_ascending() {
        let mut index = MemoryVectorIndex::new();
        index.insert(frame("v1", 0), vec![1.0, 0.0]);
        index.insert(frame("v2", 0), vec![0.0, 1.0]);

        let list = index.search(&[0.9, 0.1], 10).await.unwrap();

        assert_eq!(list.direction(), SortDirection::Ascending);
        assert_eq!(list.ranked()[0].0, frame("v1", 0));
    }

    #[tokio::test]
    async fn test_vector_index_respects_limit() {
        let mut index = MemoryVectorIndex::new();
        for i in 0..10 {
            index.insert(frame("v1", i), vec![i as f32]);
        }

        let list = index.search(&[0.0], 3).await.unwrap();
        assert_eq!(list.len(), 3);
    }

    #[tokio::test]
    async fn test_metadata_empty_query_matches_all_neutral() {
        let mut index = MemoryMetadataIndex::new();
        index.insert(VideoId::new("v1"), VideoMetadata::default());
        index.insert(VideoId::new("v2"), VideoMetadata::default());

        let list = index.search("  ", 10).await.unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list.score_of(&VideoId::new("v1")), Some(NEUTRAL_SCORE));
        assert_eq!(list.score_of(&VideoId::new("v2")), Some(NEUTRAL_SCORE));
    }

    #[tokio::test]
    async fn test_metadata_title_outweighs_description() {
        let mut index = MemoryMetadataIndex::new();
        index.insert(
            VideoId::new("title-hit"),
            VideoMetadata {
                title: "harbor sunrise".to_string(),
                ..VideoMetadata::default()
            },
        );
        index.insert(
            VideoId::new("desc-hit"),
            VideoMetadata {
                description: "a harbor at dawn".to_string(),
                ..VideoMetadata::default()
            },
        );

        let list = index.search("harbor", 10).await.unwrap();
        assert_eq!(list.ranked()[0].0, VideoId::new("title-hit"));
    }

    #[tokio::test]
    async fn test_metadata_nonmatching_videos_absent() {
        let mut index = MemoryMetadataIndex::new();
        index.insert(
            VideoId::new("v1"),
            VideoMetadata {
                title: "cooking show".to_string(),
                ..VideoMetadata::default()
            },
        );

        let list = index.search("harbor", 10).await.unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn test_content_object_constraint_is_hard_filter() {
        let mut index = MemoryContentIndex::new();
        index.insert(
            frame("v1", 0),
            FrameDocument {
                objects: vec![DetectedObject {
                    label: "person".to_string(),
                    count: 3,
                }],
                ..FrameDocument::default()
            },
        );
        index.insert(
            frame("v1", 1),
            FrameDocument {
                objects: vec![DetectedObject {
                    label: "car".to_string(),
                    count: 1,
                }],
                ..FrameDocument::default()
            },
        );

        let constraints = vec![ObjectConstraint::new("person", 1)];
        let list = index.search("", &constraints, 10).await.unwrap();

        assert_eq!(list.len(), 1);
        assert!(list.score_of(&frame("v1", 0)).is_some());
    }

    #[tokio::test]
    async fn test_content_count_threshold_boosts_not_filters() {
        let mut index = MemoryContentIndex::new();
        index.insert(
            frame("v1", 0),
            FrameDocument {
                objects: vec![DetectedObject {
                    label: "person".to_string(),
                    count: 5,
                }],
                ..FrameDocument::default()
            },
        );
        index.insert(
            frame("v1", 1),
            FrameDocument {
                objects: vec![DetectedObject {
                    label: "person".to_string(),
                    count: 1,
                }],
                ..FrameDocument::default()
            },
        );

        let constraints = vec![ObjectConstraint::new("person", 3)];
        let list = index.search("", &constraints, 10).await.unwrap();

        // Both frames qualify (label matched); the one meeting the count
        // ranks first
        assert_eq!(list.len(), 2);
        assert_eq!(list.ranked()[0].0, frame("v1", 0));
    }

    #[tokio::test]
    async fn test_content_text_only_search() {
        let mut index = MemoryContentIndex::new();
        index.insert(
            frame("v1", 0),
            FrameDocument {
                ocr_text: "EXIT 42".to_string(),
                ..FrameDocument::default()
            },
        );
        index.insert(frame("v1", 1), FrameDocument::default());

        let list = index.search("exit", &[], 10).await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(list.score_of(&frame("v1", 0)).is_some());
    }

    #[tokio::test]
    async fn test_content_no_query_returns_uniform() {
        let mut index = MemoryContentIndex::new();
        index.insert(frame("v1", 0), FrameDocument::default());
        index.insert(frame("v1", 1), FrameDocument::default());

        let list = index.search("", &[], 10).await.unwrap();
        assert_eq!(list.len(), 2);
    }

    #[tokio::test]
    async fn test_frame_store_load_and_missing() {
        let mut store = MemoryFrameStore::new();
        store.insert(frame("v1", 0), vec![1, 2, 3]);

        let content = store.load(&frame("v1", 0)).await.unwrap();
        assert_eq!(content.bytes, vec![1, 2, 3]);

        let missing = store.load(&frame("v9", 9)).await;
        assert!(matches!(missing, Err(ContentError::NotFound(_))));
    }
}
