use crate::utils;

pub use utils::bbox::{BoundingBox, BoxFormat, OverlapMetric};
pub use utils::box_set::BoxSet;
pub use utils::nms::batch::{BatchNms, BatchRequest, BatchResult};
pub use utils::nms::options::NmsOptions;
pub use utils::nms::pruning::{Pruning, PrunerFactory, SpatialPruner};
pub use utils::nms::ranking::{rank, rank_by, RankKey};
pub use utils::nms::{nms, nms_with_pruner, suppress, SuppressionEngine, SuppressionReport};

pub use crate::{Errors, InputError};
