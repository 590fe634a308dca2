//! Granularity reconciliation across signal sources.
//!
//! Signal retrievers do not agree on what a candidate is: the vector and
//! content sources score individual keyframes while the metadata source
//! scores whole videos. Before rank fusion every list must address the same
//! candidate space; this module picks the target granularity for a request
//! and rewrites each list into it.

use super::types::{first_appearance_union, FrameId, RankedList, VideoId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// A single source's ranked list, tagged with the granularity it was
/// produced at.
#[derive(Debug, Clone)]
pub enum ScopedList {
    /// Keyframe-scoped results (vector similarity, OCR/object content)
    Frames(RankedList<FrameId>),
    /// Video-scoped results (metadata relevance)
    Videos(RankedList<VideoId>),
}

/// All sources' lists rewritten into one shared granularity.
#[derive(Debug, Clone)]
pub enum Reconciled {
    /// Frame-level candidate space; chosen when any frame-scoped source
    /// produced candidates
    Frames(Vec<RankedList<FrameId>>),
    /// Video-level candidate space; the fallback when only video-scoped
    /// sources answered
    Videos(Vec<RankedList<VideoId>>),
}

/// Rewrites every list into a common granularity.
///
/// Frame-level is the target whenever at least one frame-scoped list is
/// non-empty; video-scoped lists are then propagated onto the frame
/// candidates (see [`propagate_to_frames`]). Otherwise everything collapses
/// to video-level so that metadata-only hits still surface rather than being
/// discarded.
///
/// Empty lists are dropped either way: they carry no rank information and
/// would only add noise to per-source accounting.
pub fn reconcile(lists: Vec<ScopedList>) -> Reconciled {
    let frame_candidates: Vec<FrameId> = {
        let frame_lists: Vec<&RankedList<FrameId>> = lists
            .iter()
            .filter_map(|l| match l {
                ScopedList::Frames(list) => Some(list),
                ScopedList::Videos(_) => None,
            })
            .collect();
        first_appearance_union(&frame_lists)
    };

    if frame_candidates.is_empty() {
        let reconciled = lists
            .into_iter()
            .map(|list| match list {
                ScopedList::Videos(videos) => videos,
                ScopedList::Frames(frames) => collapse_to_videos(&frames),
            })
            .filter(|l| !l.is_empty())
            .collect();
        return Reconciled::Videos(reconciled);
    }

    let reconciled = lists
        .into_iter()
        .map(|list| match list {
            ScopedList::Frames(frames) => frames,
            ScopedList::Videos(videos) => propagate_to_frames(&videos, &frame_candidates),
        })
        .filter(|l| !l.is_empty())
        .collect();
    Reconciled::Frames(reconciled)
}

/// Propagates video-level scores onto an existing keyframe candidate set.
///
/// Each candidate frame whose video was scored receives that video's raw
/// score unchanged, with no decay or weighting; rank position during fusion is
/// the only weighting that happens. Frames whose video is unscored stay
/// absent (unscored, not zero), and no frame is invented from a video-level
/// hit alone.
///
/// `candidates` must be in a deterministic order (the engine passes
/// first-appearance order across the frame-scoped lists); propagated entries
/// inherit it, which fixes the tie order among frames sharing one video
/// score.
pub fn propagate_to_frames(
    videos: &RankedList<VideoId>,
    candidates: &[FrameId],
) -> RankedList<FrameId> {
    let video_scores: HashMap<&VideoId, f32> = videos
        .entries()
        .iter()
        .map(|(v, s)| (v, *s))
        .collect();

    let mut propagated = RankedList::new(videos.direction());
    for frame in candidates {
        if let Some(score) = video_scores.get(&frame.video) {
            propagated.push(frame.clone(), *score);
        }
    }
    propagated
}

/// Reduces a keyframe-scoped list to one representative entry per video.
///
/// The representative is the *best* raw score under the list's own direction
/// (minimum for distances, maximum for relevance), never an average: videos
/// with denser keyframe extraction would otherwise be punished for having
/// more scored frames. Videos keep the order their first frame appeared in.
pub fn collapse_to_videos(frames: &RankedList<FrameId>) -> RankedList<VideoId> {
    let direction = frames.direction();
    let mut best: HashMap<VideoId, f32> = HashMap::new();
    let mut order: Vec<VideoId> = Vec::new();

    for (frame, score) in frames.entries() {
        match best.entry(frame.video.clone()) {
            Entry::Occupied(mut entry) => {
                let current = entry.get_mut();
                *current = direction.better(*current, *score);
            }
            Entry::Vacant(entry) => {
                entry.insert(*score);
                order.push(frame.video.clone());
            }
        }
    }

    let mut collapsed = RankedList::new(direction);
    for video in order {
        let score = best[&video];
        collapsed.push(video, score);
    }
    collapsed
}
