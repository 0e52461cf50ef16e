/// Worker pool running independent suppression passes
pub mod batch;
/// Suppression pass configuration
pub mod options;
/// Strategies skipping pairs that cannot overlap
pub mod pruning;
pub mod ranking;
pub mod state;

use crate::utils::box_set::BoxSet;
use crate::utils::nms::options::NmsOptions;
use crate::utils::nms::pruning::{NoPruning, PrunerFactory, SpatialPruner};
use crate::utils::nms::ranking::rank_by;
use crate::utils::nms::state::SuppressionState;
use crate::Result;
use log::{debug, trace, warn};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Below this number of candidates for one kept box the inner loop stays on the calling
/// thread even in parallel mode
pub const PARALLEL_MIN_CANDIDATES: usize = 512;

/// Outcome of one suppression pass
///
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuppressionReport {
    /// Indices of kept candidates in the order they were confirmed
    pub kept: Vec<usize>,
    /// Number of candidates left after the score threshold
    pub ranked: usize,
    /// Number of overlap evaluations performed
    pub evaluations: usize,
    /// `false` when a time or comparison budget stopped the pass early
    pub complete: bool,
}

/// Greedy suppression over a ranked candidate order
///
#[derive(Debug, Clone)]
pub struct SuppressionEngine {
    options: NmsOptions,
}

impl SuppressionEngine {
    /// Creates the engine; fails with a configuration error when an option is out of range
    ///
    pub fn new(options: NmsOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &NmsOptions {
        &self.options
    }

    /// Runs the pass with the configured pruning strategy
    ///
    pub fn run(&self, set: &BoxSet) -> SuppressionReport {
        let pruning = self.options.pruning;
        self.run_with(set, &pruning)
    }

    /// Runs the pass with a caller supplied pruning strategy
    ///
    pub fn run_with(&self, set: &BoxSet, factory: &dyn PrunerFactory) -> SuppressionReport {
        let opts = &self.options;
        let threshold = opts.iou_threshold;
        let order = rank_by(set, opts.rank_key, opts.score_threshold);
        let boxes = set.boxes();

        // disjoint boxes still reach a zero threshold
        let pruner: Box<dyn SpatialPruner + '_> = if threshold > 0.0 {
            factory.build(boxes, &order)
        } else {
            Box::new(NoPruning::new(order.len()))
        };

        debug!(
            "NMS pass: {} candidates, {} ranked, threshold {}, pruner {}",
            set.len(),
            order.len(),
            threshold,
            if threshold > 0.0 {
                factory.name()
            } else {
                "none"
            }
        );

        let state = SuppressionState::new(set.len());
        let evaluations = AtomicUsize::new(0);
        let started = Instant::now();
        let mut kept = Vec::new();
        let mut complete = true;
        let mut neighbours = Vec::new();

        for (pos, &current) in order.iter().enumerate() {
            if !state.is_pending(current) {
                continue;
            }

            if self.budget_exhausted(started, evaluations.load(Ordering::Relaxed)) {
                warn!(
                    "NMS budget exhausted after {} kept boxes and {} evaluations, the result is incomplete",
                    kept.len(),
                    evaluations.load(Ordering::Relaxed)
                );
                complete = false;
                break;
            }

            state.keep(current);
            kept.push(current);
            if opts.max_output.map_or(false, |max| kept.len() >= max) {
                break;
            }

            neighbours.clear();
            pruner.candidates(pos, &mut neighbours);

            let anchor = &boxes[current];
            let check = |p: &usize| {
                let other = order[*p];
                if !state.is_pending(other) || !set.same_class(current, other) {
                    return;
                }
                evaluations.fetch_add(1, Ordering::Relaxed);
                let overlap = opts.metric.evaluate(anchor, &boxes[other]);
                if overlap >= threshold && state.suppress(other) {
                    trace!("{} suppressed by {} with overlap {}", other, current, overlap);
                }
            };

            if opts.parallel && neighbours.len() >= PARALLEL_MIN_CANDIDATES {
                neighbours.par_iter().for_each(check);
            } else {
                neighbours.iter().for_each(check);
            }
        }

        let evaluations = evaluations.into_inner();
        debug!(
            "NMS pass finished: {} kept, {} evaluations",
            kept.len(),
            evaluations
        );

        SuppressionReport {
            kept,
            ranked: order.len(),
            evaluations,
            complete,
        }
    }

    fn budget_exhausted(&self, started: Instant, evaluations: usize) -> bool {
        self.options
            .comparison_budget
            .map_or(false, |budget| evaluations >= budget)
            || self
                .options
                .time_budget
                .map_or(false, |budget| started.elapsed() >= budget)
    }
}

/// NMS algorithm implementation
///
/// # Parameters
/// * `set` - validated candidates;
/// * `iou_threshold` - boxes whose IoU with a kept, higher ranked box is at least the threshold are excluded.
///
/// Returns the indices of kept boxes, highest score first.
///
pub fn nms(set: &BoxSet, iou_threshold: f32) -> Result<Vec<usize>> {
    let engine = SuppressionEngine::new(NmsOptions::default().iou_threshold(iou_threshold))?;
    Ok(engine.run(set).kept)
}

/// Runs one pass with full options and instrumentation
///
pub fn suppress(set: &BoxSet, options: &NmsOptions) -> Result<SuppressionReport> {
    Ok(SuppressionEngine::new(options.clone())?.run(set))
}

/// Same as [`suppress`] with a custom pruning strategy
///
pub fn nms_with_pruner(
    set: &BoxSet,
    options: &NmsOptions,
    factory: &dyn PrunerFactory,
) -> Result<SuppressionReport> {
    Ok(SuppressionEngine::new(options.clone())?.run_with(set, factory))
}

#[cfg(test)]
mod tests {
    use crate::utils::bbox::{BoxFormat, OverlapMetric};
    use crate::utils::box_set::BoxSet;
    use crate::utils::nms::options::NmsOptions;
    use crate::utils::nms::pruning::Pruning;
    use crate::utils::nms::ranking::RankKey;
    use crate::utils::nms::{nms, suppress, SuppressionEngine};
    use crate::Errors;

    fn abc() -> BoxSet {
        BoxSet::new(
            &[
                [0.0, 0.0, 10.0, 10.0],
                [1.0, 1.0, 11.0, 11.0],
                [50.0, 50.0, 60.0, 60.0],
            ],
            &[0.9, 0.8, 0.7],
            BoxFormat::Xyxy,
        )
        .unwrap()
    }

    #[test]
    fn nms_test() {
        assert_eq!(nms(&abc(), 0.5).unwrap(), vec![0, 2]);
        assert_eq!(nms(&abc(), 0.7).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn empty_and_single() {
        let empty = BoxSet::default();
        assert!(nms(&empty, 0.5).unwrap().is_empty());

        let single = BoxSet::new(&[[0.0, 0.0, 1.0, 1.0]], &[-1.0], BoxFormat::Xyxy).unwrap();
        assert_eq!(nms(&single, 0.0).unwrap(), vec![0]);
        assert_eq!(nms(&single, 1.0).unwrap(), vec![0]);
    }

    #[test]
    fn invalid_threshold() {
        assert!(matches!(
            nms(&abc(), 1.5),
            Err(Errors::ConfigurationError {
                parameter: "iou_threshold",
                ..
            })
        ));
        assert!(SuppressionEngine::new(NmsOptions::default().iou_threshold(-0.1)).is_err());
    }

    #[test]
    fn threshold_equality_suppresses() {
        // IoU of the pair is exactly 0.5
        let set = BoxSet::new(
            &[[0.0, 0.0, 10.0, 10.0], [0.0, 0.0, 10.0, 5.0]],
            &[0.9, 0.8],
            BoxFormat::Xyxy,
        )
        .unwrap();
        assert_eq!(nms(&set, 0.5).unwrap(), vec![0]);
        assert_eq!(nms(&set, 0.500001).unwrap(), vec![0, 1]);
    }

    #[test]
    fn zero_threshold_keeps_top_box_only() {
        assert_eq!(nms(&abc(), 0.0).unwrap(), vec![0]);
    }

    #[test]
    fn score_threshold_and_cap() {
        let opts = NmsOptions::default().score_threshold(0.85);
        let report = suppress(&abc(), &opts).unwrap();
        assert_eq!(report.kept, vec![0]);
        assert_eq!(report.ranked, 1);

        // dropping A lets B survive
        let opts = NmsOptions::default().score_threshold(0.75).iou_threshold(0.5);
        let set = BoxSet::new(
            &[
                [0.0, 0.0, 10.0, 10.0],
                [1.0, 1.0, 11.0, 11.0],
                [50.0, 50.0, 60.0, 60.0],
            ],
            &[0.7, 0.8, 0.9],
            BoxFormat::Xyxy,
        )
        .unwrap();
        assert_eq!(suppress(&set, &opts).unwrap().kept, vec![2, 1]);

        let opts = NmsOptions::default().max_output(1);
        let report = suppress(&abc(), &opts).unwrap();
        assert_eq!(report.kept, vec![0]);
        assert!(report.complete);
    }

    #[test]
    fn largest_box_mode() {
        // ranking by area with intersection over minimum keeps the enclosing box
        let set = BoxSet::new(
            &[
                [2.0, 2.0, 4.0, 4.0],
                [0.0, 0.0, 10.0, 10.0],
                [20.0, 20.0, 22.0, 22.0],
            ],
            &[0.9, 0.1, 0.5],
            BoxFormat::Xyxy,
        )
        .unwrap();
        let opts = NmsOptions::default()
            .rank_key(RankKey::Area)
            .metric(OverlapMetric::IntersectionOverMinimum);
        assert_eq!(suppress(&set, &opts).unwrap().kept, vec![1, 2]);
        assert_eq!(nms(&set, 0.5).unwrap(), vec![0, 2, 1]);
    }

    #[test]
    fn classes_do_not_suppress_each_other() {
        let set = abc().with_classes(vec![0, 1, 0]).unwrap();
        assert_eq!(nms(&set, 0.5).unwrap(), vec![0, 1, 2]);
        assert_eq!(nms(&set, 0.0).unwrap(), vec![0, 1]);
    }

    #[test]
    fn pruners_agree() {
        for pruning in [
            Pruning::None,
            Pruning::SortedInterval,
            Pruning::Grid { cell_size: None },
            Pruning::Grid {
                cell_size: Some(0.5),
            },
        ] {
            let opts = NmsOptions::default().pruning(pruning);
            assert_eq!(suppress(&abc(), &opts).unwrap().kept, vec![0, 2]);
        }
    }

    #[test]
    fn evaluations_are_counted() {
        let none = suppress(&abc(), &NmsOptions::default().pruning(Pruning::None)).unwrap();
        // A vs B, A vs C, then C has nobody left
        assert_eq!(none.evaluations, 2);
        let pruned = suppress(&abc(), &NmsOptions::default()).unwrap();
        assert_eq!(pruned.evaluations, 1);
    }

    #[test]
    fn comparison_budget_interrupts() {
        let opts = NmsOptions::default()
            .pruning(Pruning::None)
            .comparison_budget(1);
        let set = BoxSet::new(
            &[
                [0.0, 0.0, 1.0, 1.0],
                [2.0, 0.0, 3.0, 1.0],
                [4.0, 0.0, 5.0, 1.0],
            ],
            &[0.9, 0.8, 0.7],
            BoxFormat::Xyxy,
        )
        .unwrap();
        let report = suppress(&set, &opts).unwrap();
        assert_eq!(report.kept, vec![0]);
        assert!(!report.complete);
    }
}
