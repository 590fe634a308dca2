//! Output formatting for search results.

use anyhow::Result;
use framesift_core::search::{SearchResult, StructuredQuery};
use std::fmt::Write;

/// Renders results as pretty-printed JSON.
pub fn format_json(results: &[SearchResult]) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// Renders results for a terminal.
pub fn format_human(query: &StructuredQuery, results: &[SearchResult]) -> String {
    let mut out = String::new();

    let description = describe_query(query);
    if results.is_empty() {
        let _ = write!(out, "No results for {description}.");
        return out;
    }

    let _ = writeln!(out, "Results for {description}:\n");
    for (position, result) in results.iter().enumerate() {
        let location = match result.keyframe_index {
            Some(index) => format!("{} frame {}", result.video_id, index),
            None => format!("{} (video)", result.video_id),
        };
        let _ = writeln!(
            out,
            "{:>3}. {}  score {:.5}",
            position + 1,
            location,
            result.score
        );

        let mut sources = Vec::new();
        if let Some(distance) = result.vector_score {
            sources.push(format!("vector dist {distance:.4}"));
        }
        if let Some(relevance) = result.content_score {
            sources.push(format!("content {relevance:.2}"));
        }
        if let Some(relevance) = result.metadata_score {
            sources.push(format!("metadata {relevance:.2}"));
        }
        if let Some(similarity) = result.rerank_score {
            if similarity.is_finite() {
                sources.push(format!("rerank {similarity:.4}"));
            } else {
                sources.push("rerank n/a".to_string());
            }
        }
        if !sources.is_empty() {
            let _ = writeln!(out, "     {}", sources.join(" | "));
        }
    }

    out
}

fn describe_query(query: &StructuredQuery) -> String {
    let mut parts = Vec::new();
    if let Some(text) = query.query.as_deref().filter(|s| !s.trim().is_empty()) {
        parts.push(format!("\"{text}\""));
    }
    for constraint in &query.objects {
        parts.push(format!("{}\u{00d7}{}", constraint.label, constraint.min_count));
    }
    if let Some(text) = query.ocr_text.as_deref().filter(|s| !s.trim().is_empty()) {
        parts.push(format!("ocr:\"{text}\""));
    }
    if let Some(text) = query.metadata.as_deref().filter(|s| !s.trim().is_empty()) {
        parts.push(format!("metadata:\"{text}\""));
    }
    parts.join(" ")
}
