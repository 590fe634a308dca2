// Reciprocal Rank Fusion (RRF) over direction-tagged ranked lists

use super::types::RankedList;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

pub use crate::config::RRF_K;

/// Combines ranked results from any number of signal sources using RRF.
///
/// RRF formula: `score(c) = sum over lists containing c of 1 / (k + rank + 1)`
/// where `rank` is the candidate's 0-based position in that list, best first.
///
/// Raw score magnitudes are discarded entirely (only rank positions matter),
/// which is what lets distance-scaled, relevance-scaled, and similarity-scaled
/// sources fuse without any normalization step. A candidate absent from a list
/// contributes nothing for that list; a candidate present in a single list
/// still gets a nonzero score and can outrank multi-list candidates if its one
/// rank is good enough.
///
/// Each input list must come from a distinct retriever: feeding the same
/// source's output twice double-counts its vote.
///
/// # Determinism
///
/// Per-list ranking is a stable sort by the list's own direction, so equal raw
/// scores keep retriever order. The fused output is sorted by descending fused
/// score with exact ties broken by candidate identity (`K: Ord`), so repeated
/// runs over the same inputs always produce the same ordering regardless of
/// hash-map iteration order.
///
/// # Arguments
///
/// * `lists` - One ranked list per signal source. Empty slice fuses to empty.
/// * `k` - Rank dampening constant; [`RRF_K`] (60) at every production call
///   site, overridable per call.
pub fn reciprocal_rank_fusion<K>(lists: &[RankedList<K>], k: f32) -> Vec<(K, f32)>
where
    K: Clone + Eq + Hash + Ord,
{
    let mut fused: HashMap<K, f32> = HashMap::new();

    for list in lists {
        for (rank, (key, _raw)) in list.ranked().into_iter().enumerate() {
            *fused.entry(key).or_insert(0.0) += 1.0 / (k + rank as f32 + 1.0);
        }
    }

    let mut combined: Vec<(K, f32)> = fused.into_iter().collect();
    combined.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::types::SortDirection;

    fn asc<K: Clone + Eq + std::hash::Hash>(entries: Vec<(K, f32)>) -> RankedList<K> {
        RankedList::from_entries(SortDirection::Ascending, entries)
    }

    fn desc<K: Clone + Eq + std::hash::Hash>(entries: Vec<(K, f32)>) -> RankedList<K> {
        RankedList::from_entries(SortDirection::Descending, entries)
    }

    #[test]
    fn test_rrf_no_lists() {
        let lists: Vec<RankedList<&str>> = vec![];
        assert!(reciprocal_rank_fusion(&lists, RRF_K).is_empty());
    }

    #[test]
    fn test_rrf_single_list_preserves_order_with_decreasing_scores() {
        let lists = vec![asc(vec![("a", 0.1), ("b", 0.4), ("c", 0.9)])];
        let fused = reciprocal_rank_fusion(&lists, RRF_K);

        let keys: Vec<_> = fused.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);

        // Fused scores must strictly decrease with rank for a single list
        assert!(fused[0].1 > fused[1].1);
        assert!(fused[1].1 > fused[2].1);
        assert!((fused[0].1 - 1.0 / 61.0).abs() < 1e-6);
        assert!((fused[2].1 - 1.0 / 63.0).abs() < 1e-6);
    }

    #[test]
    fn test_rrf_respects_sort_direction() {
        // Ascending: 0.1 is the best distance. Descending: 9.0 is the best
        // relevance. Both lists therefore rank "top" first.
        let lists = vec![
            asc(vec![("other", 0.5), ("top", 0.1)]),
            desc(vec![("top", 9.0), ("other", 2.0)]),
        ];
        let fused = reciprocal_rank_fusion(&lists, RRF_K);
        assert_eq!(fused[0].0, "top");
        assert!((fused[0].1 - 2.0 / 61.0).abs() < 1e-6);
    }

    #[test]
    fn test_rrf_consensus_rank_zero_beats_single_list() {
        // Present at rank 0 in every list strictly beats any single-list
        // candidate, for any k > 0 and >= 2 lists.
        for k in [1.0, 10.0, 60.0, 1000.0] {
            let lists = vec![
                asc(vec![("both", 0.1), ("solo", 0.2)]),
                desc(vec![("both", 8.0)]),
            ];
            let fused = reciprocal_rank_fusion(&lists, k);
            assert_eq!(fused[0].0, "both", "k={k}");
        }
    }

    #[test]
    fn test_rrf_symmetric_ranks_tie_broken_by_identity() {
        // A = 1/61 + 1/62 and B = 1/62 + 1/61, an exact tie resolved by
        // candidate identity order.
        let lists = vec![
            asc(vec![("A", 0.1), ("B", 0.3)]),
            desc(vec![("B", 9.0), ("A", 2.0)]),
        ];
        let fused = reciprocal_rank_fusion(&lists, 60.0);

        assert_eq!(fused.len(), 2);
        assert!((fused[0].1 - fused[1].1).abs() < 1e-9);
        assert_eq!(fused[0].0, "A");
        assert_eq!(fused[1].0, "B");
        assert!((fused[0].1 - (1.0 / 61.0 + 1.0 / 62.0)).abs() < 1e-6);
    }

    #[test]
    fn test_rrf_extending_one_list_leaves_other_scores_unchanged() {
        let short = vec![
            asc(vec![("A", 0.1), ("B", 0.3)]),
            desc(vec![("B", 9.0), ("A", 2.0)]),
        ];
        let long = vec![
            asc(vec![("A", 0.1), ("B", 0.3), ("C", 0.5)]),
            desc(vec![("B", 9.0), ("A", 2.0)]),
        ];

        let fused_short = reciprocal_rank_fusion(&short, 60.0);
        let fused_long = reciprocal_rank_fusion(&long, 60.0);

        let score = |fused: &[(&str, f32)], key: &str| {
            fused.iter().find(|(k, _)| *k == key).map(|(_, s)| *s)
        };

        assert_eq!(score(&fused_short, "A"), score(&fused_long, "A"));
        assert_eq!(score(&fused_short, "B"), score(&fused_long, "B"));
        let c = score(&fused_long, "C").unwrap();
        assert!((c - 1.0 / 63.0).abs() < 1e-6);
    }

    #[test]
    fn test_rrf_raw_magnitudes_ignored() {
        // Wildly different raw scales, mirrored ranks: fused scores must be
        // symmetric because only positions matter.
        let lists = vec![
            desc(vec![("x", 1000.0), ("y", 0.001)]),
            desc(vec![("y", 0.9), ("x", 0.1)]),
        ];
        let fused = reciprocal_rank_fusion(&lists, RRF_K);
        assert!((fused[0].1 - fused[1].1).abs() < 1e-9);
    }

    #[test]
    fn test_rrf_determinism_across_runs() {
        let lists = vec![
            asc(vec![("m", 0.2), ("n", 0.2), ("o", 0.2)]),
            desc(vec![("o", 4.0), ("m", 4.0)]),
        ];
        let first = reciprocal_rank_fusion(&lists, RRF_K);
        for _ in 0..10 {
            assert_eq!(reciprocal_rank_fusion(&lists, RRF_K), first);
        }
    }

    #[test]
    fn test_rrf_k_configurable() {
        let lists = vec![desc(vec![("a", 1.0)])];
        let tight = reciprocal_rank_fusion(&lists, 1.0);
        let flat = reciprocal_rank_fusion(&lists, 100.0);
        assert!((tight[0].1 - 0.5).abs() < 1e-6);
        assert!((flat[0].1 - 1.0 / 101.0).abs() < 1e-6);
    }
}
