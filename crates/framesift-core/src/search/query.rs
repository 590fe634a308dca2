//! Structured queries and their decomposition into per-source sub-queries.
//!
//! A user query is a bag of optional clauses (free text, object constraints,
//! OCR text, metadata text). The decomposer routes each clause to the signal
//! retriever that can answer it, synthesizing a fallback embedding text when
//! the vector source would otherwise have nothing to embed.

use serde::Deserialize;
use tracing::debug;

/// A required object with a minimum detection count, e.g. ("person", 2).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObjectConstraint {
    /// Detected-object label to require
    pub label: String,
    /// Minimum number of detections of that label
    pub min_count: u32,
}

impl ObjectConstraint {
    /// Creates a constraint requiring at least `min_count` detections of
    /// `label`.
    pub fn new(label: impl Into<String>, min_count: u32) -> Self {
        Self {
            label: label.into(),
            min_count,
        }
    }
}

/// A structured search request with named optional clauses.
///
/// Deserialization ignores unrecognized fields, so a malformed or unknown
/// clause in an incoming request is dropped rather than failing the whole
/// search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StructuredQuery {
    /// Free-text clause, embedded for vector similarity search
    #[serde(default)]
    pub query: Option<String>,
    /// Object constraints evaluated by the content retriever
    #[serde(default)]
    pub objects: Vec<ObjectConstraint>,
    /// OCR text searched within keyframe content
    #[serde(default)]
    pub ocr_text: Option<String>,
    /// Free text matched against video metadata (title, description, keywords)
    #[serde(default)]
    pub metadata: Option<String>,
}

impl StructuredQuery {
    /// A query with only a free-text clause.
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    /// True when every clause is empty or whitespace-only.
    pub fn is_empty(&self) -> bool {
        non_blank(&self.query).is_none()
            && self.objects.is_empty()
            && non_blank(&self.ocr_text).is_none()
            && non_blank(&self.metadata).is_none()
    }
}

/// One sub-query addressed to exactly one signal retriever kind.
#[derive(Debug, Clone, PartialEq)]
pub enum SubQuery {
    /// Text to embed for the vector similarity retriever
    Vector {
        /// Text to encode into the query embedding
        text: String,
    },
    /// Text for the lexical metadata retriever; may be empty, which the
    /// retriever answers with all known videos at a uniform neutral score
    Metadata {
        /// Metadata match text
        text: String,
    },
    /// OCR text plus object constraints for the lexical content retriever
    Content {
        /// OCR match text (may be empty)
        text: String,
        /// Hard object-label constraints (may be empty)
        objects: Vec<ObjectConstraint>,
    },
}

/// Splits a structured query into independent per-retriever sub-queries.
///
/// Returns an empty vec when every clause is empty; the search then
/// terminates with an empty result rather than an error. Otherwise one
/// sub-query per retriever kind is produced:
///
/// - The vector sub-query uses the free-text clause. When that clause is
///   absent, a fallback text is synthesized by concatenating the present
///   clauses in a fixed order (object `label+count` tokens first, then OCR
///   text, then metadata text, single-space joined), because the vector
///   retriever always needs something to embed.
/// - The metadata sub-query uses the metadata clause, falling back to the
///   free-text clause.
/// - The content sub-query carries the OCR text and object constraints
///   verbatim; both may be empty (a tolerated no-op at the retriever).
pub fn decompose(query: &StructuredQuery) -> Vec<SubQuery> {
    if query.is_empty() {
        debug!("query has no usable clauses, decomposing to nothing");
        return Vec::new();
    }

    let vector_text = match non_blank(&query.query) {
        Some(text) => text.to_string(),
        None => fallback_vector_text(query),
    };

    let metadata_text = non_blank(&query.metadata)
        .or_else(|| non_blank(&query.query))
        .unwrap_or_default()
        .to_string();

    let content_text = non_blank(&query.ocr_text).unwrap_or_default().to_string();

    vec![
        SubQuery::Vector { text: vector_text },
        SubQuery::Metadata {
            text: metadata_text,
        },
        SubQuery::Content {
            text: content_text,
            objects: query.objects.clone(),
        },
    ]
}

/// Builds the synthesized embedding text from the non-free-text clauses:
/// `label+count` tokens, OCR text, metadata text, in that order.
fn fallback_vector_text(query: &StructuredQuery) -> String {
    let object_tokens = query
        .objects
        .iter()
        .map(|c| format!("{}{}", c.label, c.min_count))
        .collect::<Vec<_>>()
        .join(" ");

    [
        object_tokens.as_str(),
        non_blank(&query.ocr_text).unwrap_or_default(),
        non_blank(&query.metadata).unwrap_or_default(),
    ]
    .iter()
    .filter(|part| !part.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(" ")
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
