use crate::utils::box_set::BoxSet;
use rayon::prelude::*;
use std::cmp::Ordering;

/// Below this size the ranking is sorted on the calling thread
pub const PARALLEL_RANK_MIN_CANDIDATES: usize = 4096;

/// The value candidates are ranked by, highest first
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RankKey {
    /// Confidence score
    #[default]
    Score,
    /// Box area, so the largest of a group of overlapping boxes survives
    Area,
}

/// Ranks all candidates by descending score, ties resolved by ascending index
///
pub fn rank(set: &BoxSet) -> Vec<usize> {
    rank_by(set, RankKey::Score, None)
}

/// Ranks the candidates by descending `key`.
///
/// Equal keys keep ascending index order. When `min_score` is set, candidates with a lower
/// score are left out of the ranking entirely.
///
pub fn rank_by(set: &BoxSet, key: RankKey, min_score: Option<f32>) -> Vec<usize> {
    let scores = set.scores();
    let mut order = match min_score {
        Some(min) => (0..set.len()).filter(|&i| scores[i] >= min).collect::<Vec<_>>(),
        None => (0..set.len()).collect::<Vec<_>>(),
    };

    match key {
        RankKey::Score => sort_desc(&mut order, |i| scores[i] as f64),
        RankKey::Area => {
            let boxes = set.boxes();
            sort_desc(&mut order, |i| boxes[i].area())
        }
    }
    order
}

fn sort_desc<F>(order: &mut [usize], key: F)
where
    F: Fn(usize) -> f64 + Sync,
{
    let cmp = |a: &usize, b: &usize| {
        key(*b)
            .partial_cmp(&key(*a))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(b))
    };
    if order.len() >= PARALLEL_RANK_MIN_CANDIDATES {
        order.par_sort_by(cmp);
    } else {
        order.sort_by(cmp);
    }
}
