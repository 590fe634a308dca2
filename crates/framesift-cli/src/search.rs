//! Search command implementation.
//!
//! Loads the fixture index into the in-memory backends, wires up the engine,
//! and executes the query.

use crate::{config, store::DirFrameStore};
use anyhow::{anyhow, Context, Result};
use framesift_core::backends::{
    DetectedObject, FrameDocument, MemoryContentIndex, MemoryMetadataIndex, MemoryVectorIndex,
    VideoMetadata,
};
use framesift_core::config::EMBEDDING_DIM;
use framesift_core::embedding::RemoteEncoder;
use framesift_core::search::{
    BiEncoderScorer, EngineConfig, FineReranker, FrameId, RerankMode, RerankSettings,
    RetrievalEngine, SearchResult, StructuredQuery, VideoId,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Options resolved from CLI flags.
pub struct SearchOptions {
    /// Explicit index directory, if given
    pub index_dir: Option<PathBuf>,
    /// Embedding service URL, if given
    pub encoder_url: Option<String>,
    /// Rerank top-N, if reranking was requested
    pub rerank_top_n: Option<usize>,
    /// Maximum results to return
    pub limit: usize,
}

/// One keyframe record in `frames.json`.
#[derive(Debug, Deserialize)]
struct FrameRecord {
    video_id: String,
    keyframe_index: u32,
    #[serde(default)]
    ocr_text: String,
    #[serde(default)]
    objects: Vec<DetectedObject>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

/// Loads the index and runs one search.
pub async fn execute_search(
    query: &StructuredQuery,
    options: &SearchOptions,
) -> Result<Vec<SearchResult>> {
    let index_dir = config::index_dir(options.index_dir.as_ref())?;
    if !index_dir.exists() {
        return Err(anyhow!(
            "No index found at {}.\n\
             Point --index-dir (or ${}) at a directory containing {} and {}.",
            index_dir.display(),
            config::INDEX_DIR_ENV,
            config::METADATA_FILENAME,
            config::FRAMES_FILENAME,
        ));
    }

    info!("Loading index from {}", index_dir.display());
    let (vector, metadata, content) = load_index(&index_dir)?;
    info!(
        "Loaded {} videos, {} keyframes ({} with embeddings)",
        metadata.len(),
        content.len(),
        vector.len()
    );

    let encoder_url = options
        .encoder_url
        .clone()
        .unwrap_or_else(|| config::DEFAULT_ENCODER_URL.to_string());
    let encoder = Arc::new(RemoteEncoder::new(
        encoder_url,
        config::ENCODER_MODEL,
        EMBEDDING_DIM,
    ));

    let engine_config = EngineConfig {
        rerank: options.rerank_top_n.map(|top_n| RerankSettings {
            top_n,
            mode: RerankMode::Replace,
        }),
        ..EngineConfig::default()
    };

    let mut engine = RetrievalEngine::new(vector, metadata, content, encoder.clone())
        .with_config(engine_config);

    if options.rerank_top_n.is_some() {
        let loader = Arc::new(DirFrameStore::new(index_dir));
        let scorer = Arc::new(BiEncoderScorer::new(encoder));
        engine = engine.with_reranker(FineReranker::new(loader, scorer));
    }

    let results = engine
        .search(query, options.limit)
        .await
        .map_err(|e| anyhow!("Search failed: {e}"))?;

    info!("Search returned {} results", results.len());
    Ok(results)
}

/// Reads the fixture files and builds the in-memory backends.
fn load_index(
    index_dir: &Path,
) -> Result<(MemoryVectorIndex, MemoryMetadataIndex, MemoryContentIndex)> {
    let metadata_path = config::metadata_path(index_dir);
    let metadata_raw = std::fs::read_to_string(&metadata_path)
        .with_context(|| format!("Failed to read {}", metadata_path.display()))?;
    let videos: HashMap<String, VideoMetadata> = serde_json::from_str(&metadata_raw)
        .with_context(|| format!("Failed to parse {}", metadata_path.display()))?;

    let frames_path = config::frames_path(index_dir);
    let frames_raw = std::fs::read_to_string(&frames_path)
        .with_context(|| format!("Failed to read {}", frames_path.display()))?;
    let frames: Vec<FrameRecord> = serde_json::from_str(&frames_raw)
        .with_context(|| format!("Failed to parse {}", frames_path.display()))?;

    // Insert in sorted order so uniform-score ties rank reproducibly
    let mut videos: Vec<(String, VideoMetadata)> = videos.into_iter().collect();
    videos.sort_by(|a, b| a.0.cmp(&b.0));

    let mut metadata_index = MemoryMetadataIndex::new();
    for (video_id, video) in videos {
        metadata_index.insert(VideoId::new(video_id), video);
    }

    let mut vector_index = MemoryVectorIndex::new();
    let mut content_index = MemoryContentIndex::new();
    for record in frames {
        let frame = FrameId::new(VideoId::new(record.video_id), record.keyframe_index);
        content_index.insert(
            frame.clone(),
            FrameDocument {
                ocr_text: record.ocr_text,
                objects: record.objects,
            },
        );
        if let Some(embedding) = record.embedding {
            vector_index.insert(frame, embedding);
        }
    }

    Ok((vector_index, metadata_index, content_index))
}
