use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use thiserror::Error;

/// Identifier of a whole video.
///
/// Opaque string assigned at ingestion time (typically the source file stem).
/// Ordering is lexicographic and is used as the deterministic tie-break when
/// fused scores are exactly equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VideoId(String);

impl VideoId {
    /// Creates a video identifier from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a single keyframe: a video plus a frame index within it.
///
/// A `FrameId` always belongs to exactly one video. Ordering is
/// (video, index), giving fused-score ties a stable, reproducible order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameId {
    /// The video this keyframe was extracted from
    pub video: VideoId,
    /// 0-based keyframe index within the video
    pub index: u32,
}

impl FrameId {
    /// Creates a keyframe identifier.
    pub fn new(video: VideoId, index: u32) -> Self {
        Self { video, index }
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.video, self.index)
    }
}

/// Which way raw scores in a [`RankedList`] sort.
///
/// Signal sources score on incompatible scales: Euclidean distance (lower is
/// better) versus relevance (higher is better). Every list declares its own
/// direction so downstream code never has to guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    /// Lower raw score is better (e.g. vector distance)
    Ascending,
    /// Higher raw score is better (e.g. lexical relevance)
    Descending,
}

impl SortDirection {
    /// Compares two raw scores so that `Ordering::Less` means `a` ranks
    /// before (better than) `b` under this direction.
    pub fn compare(&self, a: f32, b: f32) -> Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match self {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }

    /// Returns the better of two raw scores under this direction.
    pub fn better(&self, a: f32, b: f32) -> f32 {
        if self.compare(a, b) == Ordering::Greater {
            b
        } else {
            a
        }
    }
}

/// Ordered result of a single signal source.
///
/// Entries preserve the order the retriever returned them, which is what
/// makes equal raw scores rank deterministically during fusion. Keys are
/// unique within one list; an absent key means "unscored by this source",
/// never "score zero".
#[derive(Debug, Clone, PartialEq)]
pub struct RankedList<K> {
    direction: SortDirection,
    entries: Vec<(K, f32)>,
}

impl<K: Clone + Eq + Hash> RankedList<K> {
    /// Creates an empty list with the given sort direction.
    pub fn new(direction: SortDirection) -> Self {
        Self {
            direction,
            entries: Vec::new(),
        }
    }

    /// Builds a list from raw entries, keeping the first occurrence of any
    /// duplicated key.
    pub fn from_entries(direction: SortDirection, entries: Vec<(K, f32)>) -> Self {
        let mut list = Self::new(direction);
        for (key, score) in entries {
            list.push(key, score);
        }
        list
    }

    /// Appends an entry, silently skipping keys already present.
    pub fn push(&mut self, key: K, score: f32) {
        if !self.entries.iter().any(|(k, _)| *k == key) {
            self.entries.push((key, score));
        }
    }

    /// The list's declared sort direction.
    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Entries in retriever order.
    pub fn entries(&self) -> &[(K, f32)] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw score for `key`, if this source scored it.
    pub fn score_of(&self, key: &K) -> Option<f32> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, s)| *s)
    }

    /// Entries sorted best-first by this list's direction.
    ///
    /// The sort is stable, so equal raw scores keep the order the retriever
    /// returned them. The fusion engine imposes no tie-break of its own.
    pub fn ranked(&self) -> Vec<(K, f32)> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| self.direction.compare(a.1, b.1));
        sorted
    }
}

/// Opaque visual content of one keyframe, as loaded for reranking.
///
/// Holds the encoded image bytes (typically JPEG); decoding is the scoring
/// model's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameContent {
    /// Encoded image bytes
    pub bytes: Vec<u8>,
}

impl FrameContent {
    /// Wraps encoded image bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

/// One record of the final ranking handed back to the caller.
///
/// Carries the fused score plus every originating source's raw score where
/// available, so a consumer can explain *why* a keyframe ranked where it did.
/// No field here ever feeds back into fusion math.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// The video this result belongs to
    pub video_id: VideoId,
    /// Keyframe index, or `None` when the request resolved at video
    /// granularity (no frame-scoped signal produced candidates)
    pub keyframe_index: Option<u32>,
    /// Fused RRF score. Comparable only within this response.
    pub score: f32,
    /// Raw vector distance, if the vector source scored this keyframe
    pub vector_score: Option<f32>,
    /// Raw OCR/object relevance, if the content source scored this keyframe
    pub content_score: Option<f32>,
    /// Raw metadata relevance of the parent video, if scored
    pub metadata_score: Option<f32>,
    /// Refined similarity from the reranker, if the rerank stage ran
    pub rerank_score: Option<f32>,
}

/// Errors surfaced to the caller of a search.
///
/// Deliberately small: backend outages, reranker failures, and unloadable
/// content all degrade instead of erroring (availability over completeness).
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// The caller's request parameters are unusable
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Collects the union of keys across several ranked lists, in first-appearance
/// order. Shared by the granularity reconciler, which needs deterministic
/// candidate enumeration.
pub(crate) fn first_appearance_union<K: Clone + Eq + Hash>(lists: &[&RankedList<K>]) -> Vec<K> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    for list in lists {
        for (key, _) in list.entries() {
            if seen.insert(key.clone()) {
                ordered.push(key.clone());
            }
        }
    }
    ordered
}
