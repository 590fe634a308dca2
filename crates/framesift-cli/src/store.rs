//! Keyframe image store backed by the index directory.
//!
//! Images live at `<index_dir>/<video_id>/<keyframe_index:03>.jpg`, the
//! layout the ingestion pipeline writes.

use async_trait::async_trait;
use framesift_core::error::ContentError;
use framesift_core::search::{ContentLoader, FrameContent, FrameId};
use std::path::PathBuf;

/// Loads keyframe images from the filesystem.
pub struct DirFrameStore {
    root: PathBuf,
}

impl DirFrameStore {
    /// Creates a store rooted at the index directory.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn frame_path(&self, frame: &FrameId) -> PathBuf {
        self.root
            .join(frame.video.as_str())
            .join(format!("{:03}.jpg", frame.index))
    }
}

#[async_trait]
impl ContentLoader for DirFrameStore {
    async fn load(&self, frame: &FrameId) -> Result<FrameContent, ContentError> {
        let path = self.frame_path(frame);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(FrameContent::new(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ContentError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(ContentError::LoadFailed(format!(
                "{}: {e}",
                path.display()
            ))),
        }
    }
}
