use crate::utils::bbox::OverlapMetric;
use crate::utils::nms::pruning::Pruning;
use crate::utils::nms::ranking::RankKey;
use crate::{Errors, Result};
use std::time::Duration;

/// Overlap threshold used when none is configured
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.5;

fn config_error(parameter: &'static str, reason: String) -> Errors {
    Errors::ConfigurationError { parameter, reason }
}

/// Class that is used to configure a suppression pass
///
#[derive(Debug, Clone, PartialEq)]
pub struct NmsOptions {
    pub(crate) iou_threshold: f32,
    pub(crate) score_threshold: Option<f32>,
    pub(crate) max_output: Option<usize>,
    pub(crate) metric: OverlapMetric,
    pub(crate) rank_key: RankKey,
    pub(crate) pruning: Pruning,
    pub(crate) parallel: bool,
    pub(crate) time_budget: Option<Duration>,
    pub(crate) comparison_budget: Option<usize>,
}

impl Default for NmsOptions {
    fn default() -> Self {
        Self {
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            score_threshold: None,
            max_output: None,
            metric: OverlapMetric::default(),
            rank_key: RankKey::default(),
            pruning: Pruning::default(),
            parallel: false,
            time_budget: None,
            comparison_budget: None,
        }
    }
}

impl NmsOptions {
    /// Overlap ratio at or above which a lower-ranked candidate is suppressed.
    ///
    /// Must lie in `[0, 1]`. With `0.0` every lower-ranked candidate of the same class is
    /// suppressed by the top one, even a disjoint one; with `1.0` only exact duplicates are.
    ///
    pub fn iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    /// Candidates scoring strictly below the value are dropped before ranking and take no
    /// part in suppression
    ///
    pub fn score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    /// Stops the pass once `n` candidates are kept
    ///
    pub fn max_output(mut self, n: usize) -> Self {
        self.max_output = Some(n);
        self
    }

    pub fn metric(mut self, metric: OverlapMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn rank_key(mut self, key: RankKey) -> Self {
        self.rank_key = key;
        self
    }

    /// The pruning strategy never changes the result, only the number of evaluated pairs
    ///
    pub fn pruning(mut self, pruning: Pruning) -> Self {
        self.pruning = pruning;
        self
    }

    /// Evaluates the candidates of every kept box on the rayon pool
    ///
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Wall-clock budget checked before each candidate is confirmed. An exhausted budget ends
    /// the pass with an incomplete result.
    ///
    pub fn time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    /// Budget on overlap evaluations, checked like [`NmsOptions::time_budget`]
    ///
    pub fn comparison_budget(mut self, evaluations: usize) -> Self {
        self.comparison_budget = Some(evaluations);
        self
    }

    pub fn get_iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    pub fn get_pruning(&self) -> Pruning {
        self.pruning
    }

    /// Checks every parameter against its valid range
    ///
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(config_error(
                "iou_threshold",
                format!("must be within [0, 1], got {}", self.iou_threshold),
            ));
        }
        if let Some(t) = self.score_threshold {
            if !t.is_finite() {
                return Err(config_error(
                    "score_threshold",
                    format!("must be finite, got {}", t),
                ));
            }
        }
        if self.max_output == Some(0) {
            return Err(config_error("max_output", "must be positive".into()));
        }
        if let Pruning::Grid {
            cell_size: Some(cell),
        } = self.pruning
        {
            if !(cell.is_finite() && cell > 0.0) {
                return Err(config_error(
                    "cell_size",
                    format!("must be positive and finite, got {}", cell),
                ));
            }
        }
        Ok(())
    }
}
