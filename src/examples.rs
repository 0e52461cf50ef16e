use crate::utils::bbox::BoundingBox;
use crate::utils::box_set::BoxSet;
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Reproducible scene generator
///
pub struct SceneGen {
    rng: StdRng,
}

impl SceneGen {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn score(&mut self) -> f32 {
        // coarse steps so that ties happen
        self.rng.gen_range(0..100) as f32 / 100.0
    }

    /// `n` boxes with sides in `[1, max_size)` placed uniformly inside `[0, extent)²`
    ///
    pub fn uniform(&mut self, n: usize, extent: f32, max_size: f32) -> BoxSet {
        let mut boxes = Vec::with_capacity(n);
        let mut scores = Vec::with_capacity(n);
        for _ in 0..n {
            let x = self.rng.gen_range(0.0..extent);
            let y = self.rng.gen_range(0.0..extent);
            let w = self.rng.gen_range(1.0..max_size);
            let h = self.rng.gen_range(1.0..max_size);
            boxes.push(BoundingBox::ltwh(x, y, w, h));
            scores.push(self.score());
        }
        BoxSet::from_parts_unchecked(boxes, scores)
    }

    /// `clusters` groups of `per_cluster` boxes of side `box_size`, each jittered by up to
    /// `jitter` around a cluster center placed inside `[0, extent)²`
    ///
    pub fn clustered(
        &mut self,
        clusters: usize,
        per_cluster: usize,
        extent: f32,
        box_size: f32,
        jitter: f32,
    ) -> BoxSet {
        let mut boxes = Vec::with_capacity(clusters * per_cluster);
        let mut scores = Vec::with_capacity(clusters * per_cluster);
        let dist_jitter = Uniform::new_inclusive(-jitter, jitter);
        for _ in 0..clusters {
            let cx = self.rng.gen_range(0.0..extent);
            let cy = self.rng.gen_range(0.0..extent);
            for _ in 0..per_cluster {
                boxes.push(BoundingBox::cxcywh(
                    cx + self.rng.sample(dist_jitter),
                    cy + self.rng.sample(dist_jitter),
                    box_size + self.rng.sample(dist_jitter).abs(),
                    box_size + self.rng.sample(dist_jitter).abs(),
                ));
                scores.push(self.score());
            }
        }
        BoxSet::from_parts_unchecked(boxes, scores)
    }

    /// `n` boxes of side `box_size` starting on the diagonal, each moved by a random walk of
    /// `steps` steps. A step shifts the position by up to `pos_drift` and each side by up to
    /// `box_drift`; sides never shrink below `1`.
    ///
    pub fn drifting(
        &mut self,
        n: usize,
        box_size: f32,
        pos_drift: f32,
        box_drift: f32,
        steps: usize,
    ) -> BoxSet {
        let dist_pos = Uniform::new_inclusive(-pos_drift, pos_drift);
        let dist_box = Uniform::new_inclusive(-box_drift, box_drift);
        let mut boxes = Vec::with_capacity(n);
        let mut scores = Vec::with_capacity(n);
        for i in 0..n {
            let (mut x, mut y) = (i as f32, i as f32);
            let (mut w, mut h) = (box_size, box_size);
            for _ in 0..steps {
                x += self.rng.sample(dist_pos);
                y += self.rng.sample(dist_pos);
                w = (w + self.rng.sample(dist_box)).max(1.0);
                h = (h + self.rng.sample(dist_box)).max(1.0);
            }
            boxes.push(BoundingBox::ltwh(x, y, w, h));
            scores.push(self.score());
        }
        BoxSet::from_parts_unchecked(boxes, scores)
    }

    /// `n` disjoint squares of side `box_size` on a lattice with the given `spacing`, scores
    /// shuffled
    ///
    pub fn lattice(&mut self, n: usize, box_size: f32, spacing: f32) -> BoxSet {
        let columns = (n as f64).sqrt().ceil().max(1.0) as usize;
        let boxes = (0..n)
            .map(|i| {
                let (col, row) = ((i % columns) as f32, (i / columns) as f32);
                BoundingBox::ltwh(col * spacing, row * spacing, box_size, box_size)
            })
            .collect::<Vec<_>>();
        let scores = (0..n).map(|_| self.score()).collect();
        BoxSet::from_parts_unchecked(boxes, scores)
    }
}
