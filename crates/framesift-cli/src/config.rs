//! Configuration and path resolution for the CLI.
//!
//! Resolves the index directory (fixture JSON files plus keyframe images)
//! and the embedding service defaults.

use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Video metadata fixture file inside the index directory.
pub const METADATA_FILENAME: &str = "metadata.json";

/// Keyframe fixture file inside the index directory.
pub const FRAMES_FILENAME: &str = "frames.json";

/// Environment variable overriding the index directory.
pub const INDEX_DIR_ENV: &str = "FRAMESIFT_INDEX_DIR";

/// Default embedding service URL when `--encoder-url` is absent. If nothing
/// is listening there, the vector signal degrades and lexical signals still
/// answer.
pub const DEFAULT_ENCODER_URL: &str = "http://localhost:8000";

/// Embedding model requested from the service.
pub const ENCODER_MODEL: &str = "clip-vit-b-32";

/// Resolves the index directory.
///
/// Precedence: explicit `--index-dir`, then `$FRAMESIFT_INDEX_DIR`, then the
/// platform data directory (e.g. `~/.local/share/framesift/index` on Linux).
pub fn index_dir(custom_dir: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = custom_dir {
        return Ok(dir.clone());
    }

    if let Ok(dir) = std::env::var(INDEX_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    ProjectDirs::from("io", "framesift", "framesift")
        .map(|dirs| dirs.data_dir().join("index"))
        .ok_or_else(|| anyhow!("Could not determine index directory"))
}

/// Path to the metadata fixture inside `index_dir`.
pub fn metadata_path(index_dir: &Path) -> PathBuf {
    index_dir.join(METADATA_FILENAME)
}

/// Path to the frames fixture inside `index_dir`.
pub fn frames_path(index_dir: &Path) -> PathBuf {
    index_dir.join(FRAMES_FILENAME)
}
