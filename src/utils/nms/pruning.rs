use crate::utils::bbox::BoundingBox;
use itertools::Itertools;
use std::collections::HashMap;

/// Boxes covering more grid cells than this are tested against everything instead of being
/// registered in every cell
pub const GRID_MAX_CELLS_PER_BOX: i64 = 64;

/// Answers which lower-ranked candidates may overlap a kept one enough to matter.
///
/// Implementations work on ranked positions: position `p` stands for candidate
/// `order[p]` of the order the pruner was built for. The answer for `pos` must contain every
/// later position whose box has a positive-area intersection with the box at `pos`; extra
/// positions are allowed, missing ones are not.
///
pub trait SpatialPruner: Sync {
    /// Pushes the ranked positions after `pos` that may overlap the box at `pos` into `out`,
    /// in ascending order.
    fn candidates(&self, pos: usize, out: &mut Vec<usize>);
}

/// Builds a [`SpatialPruner`] for one suppression pass
///
pub trait PrunerFactory: Sync {
    fn name(&self) -> &'static str;

    fn build<'a>(
        &self,
        boxes: &'a [BoundingBox],
        order: &'a [usize],
    ) -> Box<dyn SpatialPruner + 'a>;
}

/// Built-in pruning strategies
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Pruning {
    /// Every later candidate is evaluated
    None,
    /// Sweep over boxes sorted by `x_min`
    SortedInterval,
    /// Uniform grid; the cell size defaults to the median box extent
    Grid { cell_size: Option<f32> },
}

impl Default for Pruning {
    fn default() -> Self {
        Pruning::SortedInterval
    }
}

impl PrunerFactory for Pruning {
    fn name(&self) -> &'static str {
        match self {
            Pruning::None => "none",
            Pruning::SortedInterval => "sorted-interval",
            Pruning::Grid { .. } => "grid",
        }
    }

    fn build<'a>(
        &self,
        boxes: &'a [BoundingBox],
        order: &'a [usize],
    ) -> Box<dyn SpatialPruner + 'a> {
        match self {
            Pruning::None => Box::new(NoPruning { len: order.len() }),
            Pruning::SortedInterval => Box::new(SortedIntervalPruner::new(boxes, order)),
            Pruning::Grid { cell_size } => Box::new(GridPruner::new(boxes, order, *cell_size)),
        }
    }
}

/// Pruner which prunes nothing
///
pub struct NoPruning {
    len: usize,
}

impl NoPruning {
    pub fn new(len: usize) -> Self {
        Self { len }
    }
}

impl SpatialPruner for NoPruning {
    fn candidates(&self, pos: usize, out: &mut Vec<usize>) {
        out.extend(pos + 1..self.len);
    }
}

/// Boxes wider than this multiple of the median width bypass the sweep
pub const SWEEP_WIDE_FACTOR: f32 = 4.0;

/// Sweep-line pruner.
///
/// Ranked positions are sorted by `x_min`, together with the running maximum of `x_max`. For
/// an anchor box only the window starting at the first entry whose running maximum reaches
/// the anchor's `x_min` and ending at the last entry whose `x_min` does not exceed the
/// anchor's `x_max` can intersect it; the y intervals are checked inside the window. No
/// candidate is ever missed since no arithmetic is done on coordinates.
///
/// The window opens as far left as the widest swept box reaches, so boxes wider than
/// [`SWEEP_WIDE_FACTOR`] times the median width are kept out of the sweep and checked for
/// every anchor instead. Scenes where most boxes are wide still degrade to quadratic interval
/// checks; the number of overlap evaluations stays unaffected.
///
pub struct SortedIntervalPruner<'a> {
    boxes: &'a [BoundingBox],
    order: &'a [usize],
    by_x_min: Vec<usize>,
    running_x_max: Vec<f32>,
    wide: Vec<usize>,
}

impl<'a> SortedIntervalPruner<'a> {
    pub fn new(boxes: &'a [BoundingBox], order: &'a [usize]) -> Self {
        let width_limit =
            median(order.iter().map(|&i| boxes[i].width())).map(|w| w * SWEEP_WIDE_FACTOR);
        let (wide, narrow): (Vec<usize>, Vec<usize>) = (0..order.len())
            .partition(|&p| width_limit.map_or(false, |limit| boxes[order[p]].width() > limit));

        let by_x_min = narrow
            .into_iter()
            .sorted_by(|a, b| {
                boxes[order[*a]]
                    .x_min()
                    .total_cmp(&boxes[order[*b]].x_min())
                    .then(a.cmp(b))
            })
            .collect::<Vec<_>>();

        let running_x_max = by_x_min
            .iter()
            .scan(f32::NEG_INFINITY, |acc, &p| {
                *acc = acc.max(boxes[order[p]].x_max());
                Some(*acc)
            })
            .collect::<Vec<_>>();

        Self {
            boxes,
            order,
            by_x_min,
            running_x_max,
            wide,
        }
    }

    fn bbox(&self, pos: usize) -> &BoundingBox {
        &self.boxes[self.order[pos]]
    }

    /// Swept positions whose x interval may reach the anchor
    ///
    fn window(&self, anchor: &BoundingBox) -> &[usize] {
        let start = self
            .running_x_max
            .partition_point(|&x_max| x_max < anchor.x_min());
        let len = self.by_x_min[start..]
            .partition_point(|&p| self.bbox(p).x_min() <= anchor.x_max());
        &self.by_x_min[start..start + len]
    }

    pub fn wide_len(&self) -> usize {
        self.wide.len()
    }
}

impl<'a> SpatialPruner for SortedIntervalPruner<'a> {
    fn candidates(&self, pos: usize, out: &mut Vec<usize>) {
        let anchor = self.bbox(pos);
        let first = out.len();
        let later_overlapping =
            |p: &usize| *p > pos && anchor.intervals_intersect(self.bbox(*p));
        out.extend(self.window(anchor).iter().copied().filter(later_overlapping));
        out.extend(self.wide.iter().copied().filter(later_overlapping));
        out[first..].sort_unstable();
    }
}

type CellRange = (i64, i64, i64, i64);

/// Uniform grid pruner.
///
/// Each box is registered in every cell its closed extent touches; two boxes whose extents
/// intersect share at least one cell because the cell mapping is monotonic. Boxes spanning
/// more than [`GRID_MAX_CELLS_PER_BOX`] cells live in an overflow list checked for every
/// anchor.
///
pub struct GridPruner<'a> {
    boxes: &'a [BoundingBox],
    order: &'a [usize],
    origin: (f64, f64),
    cell_size: f64,
    ranges: Vec<Option<CellRange>>,
    cells: HashMap<(i64, i64), Vec<usize>>,
    overflow: Vec<usize>,
}

fn median(values: impl Iterator<Item = f32>) -> Option<f32> {
    let mut values = values.filter(|v| *v > 0.0).collect::<Vec<_>>();
    if values.is_empty() {
        return None;
    }
    let mid = values.len() / 2;
    let (_, median, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    Some(*median)
}

/// Median of the larger box side; `1.0` for fully degenerate sets
///
pub fn median_extent(boxes: &[BoundingBox], order: &[usize]) -> f32 {
    median(order.iter().map(|&i| boxes[i].width().max(boxes[i].height()))).unwrap_or(1.0)
}

impl<'a> GridPruner<'a> {
    pub fn new(boxes: &'a [BoundingBox], order: &'a [usize], cell_size: Option<f32>) -> Self {
        let cell_size = cell_size.unwrap_or_else(|| median_extent(boxes, order)) as f64;
        let origin = order.iter().fold((f64::MAX, f64::MAX), |(x, y), &i| {
            (x.min(boxes[i].x_min() as f64), y.min(boxes[i].y_min() as f64))
        });

        let mut grid = Self {
            boxes,
            order,
            origin,
            cell_size,
            ranges: Vec::with_capacity(order.len()),
            cells: HashMap::new(),
            overflow: Vec::new(),
        };

        for p in 0..order.len() {
            let range = grid.cell_range(&boxes[order[p]]);
            let (cx0, cy0, cx1, cy1) = range;
            let covered = (cx1 - cx0)
                .saturating_add(1)
                .saturating_mul((cy1 - cy0).saturating_add(1));
            if covered > GRID_MAX_CELLS_PER_BOX {
                grid.overflow.push(p);
                grid.ranges.push(None);
            } else {
                for cx in cx0..=cx1 {
                    for cy in cy0..=cy1 {
                        grid.cells.entry((cx, cy)).or_default().push(p);
                    }
                }
                grid.ranges.push(Some(range));
            }
        }
        grid
    }

    fn cell_range(&self, b: &BoundingBox) -> CellRange {
        let cell = |v: f32, origin: f64| ((v as f64 - origin) / self.cell_size).floor() as i64;
        (
            cell(b.x_min(), self.origin.0),
            cell(b.y_min(), self.origin.1),
            cell(b.x_max(), self.origin.0),
            cell(b.y_max(), self.origin.1),
        )
    }

    fn bbox(&self, pos: usize) -> &BoundingBox {
        &self.boxes[self.order[pos]]
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn overflow_len(&self) -> usize {
        self.overflow.len()
    }
}

impl<'a> SpatialPruner for GridPruner<'a> {
    fn candidates(&self, pos: usize, out: &mut Vec<usize>) {
        let anchor = self.bbox(pos);
        let first = out.len();
        match self.ranges[pos] {
            None => out.extend(
                (pos + 1..self.order.len()).filter(|&p| anchor.intervals_intersect(self.bbox(p))),
            ),
            Some((cx0, cy0, cx1, cy1)) => {
                for cx in cx0..=cx1 {
                    for cy in cy0..=cy1 {
                        if let Some(cell) = self.cells.get(&(cx, cy)) {
                            out.extend(cell.iter().copied().filter(|&p| {
                                p > pos && anchor.intervals_intersect(self.bbox(p))
                            }));
                        }
                    }
                }
                out.extend(
                    self.overflow
                        .iter()
                        .copied()
                        .filter(|&p| p > pos && anchor.intervals_intersect(self.bbox(p))),
                );
            }
        }
        out[first..].sort_unstable();
        let unique = out[first..].iter().copied().dedup().collect::<Vec<_>>();
        out.truncate(first);
        out.extend(unique);
    }
}
