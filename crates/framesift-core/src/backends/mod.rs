//! Reference backend adapters.
//!
//! Production deployments put a real nearest-neighbor service and a real
//! lexical engine behind the retriever traits. The in-memory adapters here
//! back the CLI's fixture mode and the test suite: linear-scan vector search
//! and token-overlap lexical scoring, faithful to the production backends'
//! scoring contracts (distance semantics, field boosts, hard object
//! constraints) at toy scale.

mod memory;

pub use memory::{
    DetectedObject, FrameDocument, MemoryContentIndex, MemoryFrameStore, MemoryMetadataIndex,
    MemoryVectorIndex, VideoMetadata,
};
