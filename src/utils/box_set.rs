use crate::utils::bbox::{BoundingBox, BoxFormat};
use crate::{Errors, InputError, Result};

/// Validated candidates: one box and one score per index, optionally one class label.
///
/// The index of a candidate inside the set is its identity in suppression results. Every box
/// has finite coordinates with `x_min <= x_max` and `y_min <= y_max`, every score is finite.
///
#[derive(Clone, Debug, Default)]
pub struct BoxSet {
    boxes: Vec<BoundingBox>,
    scores: Vec<f32>,
    classes: Option<Vec<u32>>,
}

fn check_length(field: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(InputError::LengthMismatch {
            field,
            expected,
            actual,
        }
        .into());
    }
    Ok(())
}

fn check_box(index: usize, raw: [f32; 4], format: BoxFormat) -> Result<BoundingBox> {
    if let Some(value) = raw.iter().copied().find(|v| !v.is_finite()) {
        return Err(InputError::NonFiniteCoordinate { index, value }.into());
    }
    let bbox = format
        .decode(raw)
        .map_err(|reason| InputError::MalformedBox { index, reason })?;
    // size-based layouts may overflow while being converted
    if let Some(value) = bbox.as_xyxy().into_iter().find(|v| !v.is_finite()) {
        return Err(InputError::NonFiniteCoordinate { index, value }.into());
    }
    if bbox.x_min() > bbox.x_max() {
        return Err(InputError::MalformedBox {
            index,
            reason: "x_min is greater than x_max",
        }
        .into());
    }
    if bbox.y_min() > bbox.y_max() {
        return Err(InputError::MalformedBox {
            index,
            reason: "y_min is greater than y_max",
        }
        .into());
    }
    Ok(bbox)
}

fn check_scores(scores: &[f32]) -> Result<()> {
    match scores.iter().enumerate().find(|(_, s)| !s.is_finite()) {
        Some((index, value)) => Err(InputError::NonFiniteScore {
            index,
            value: *value,
        }
        .into()),
        None => Ok(()),
    }
}

impl BoxSet {
    /// Builds the set from coordinate quadruples in the given layout
    ///
    pub fn new(boxes: &[[f32; 4]], scores: &[f32], format: BoxFormat) -> Result<Self> {
        check_length("scores", boxes.len(), scores.len())?;
        let boxes = boxes
            .iter()
            .enumerate()
            .map(|(index, raw)| check_box(index, *raw, format))
            .collect::<Result<Vec<_>>>()?;
        check_scores(scores)?;
        Ok(Self {
            boxes,
            scores: scores.to_vec(),
            classes: None,
        })
    }

    /// Builds the set from a flat buffer of `4 * N` coordinates
    ///
    pub fn from_flat(coords: &[f32], scores: &[f32], format: BoxFormat) -> Result<Self> {
        check_length("coords", scores.len() * 4, coords.len())?;
        let quads = coords
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect::<Vec<_>>();
        Self::new(&quads, scores, format)
    }

    /// Builds the set from per-coordinate columns in the corner layout
    ///
    pub fn from_columns(
        x_min: &[f32],
        y_min: &[f32],
        x_max: &[f32],
        y_max: &[f32],
        scores: &[f32],
    ) -> Result<Self> {
        let n = scores.len();
        check_length("x_min", n, x_min.len())?;
        check_length("y_min", n, y_min.len())?;
        check_length("x_max", n, x_max.len())?;
        check_length("y_max", n, y_max.len())?;
        let quads = (0..n)
            .map(|i| [x_min[i], y_min[i], x_max[i], y_max[i]])
            .collect::<Vec<_>>();
        Self::new(&quads, scores, BoxFormat::Xyxy)
    }

    /// Builds the set from already constructed boxes
    ///
    pub fn from_boxes(boxes: Vec<BoundingBox>, scores: Vec<f32>) -> Result<Self> {
        check_length("scores", boxes.len(), scores.len())?;
        for (index, b) in boxes.iter().enumerate() {
            check_box(index, b.as_xyxy(), BoxFormat::Xyxy)?;
        }
        check_scores(&scores)?;
        Ok(Self {
            boxes,
            scores,
            classes: None,
        })
    }

    /// Used by generators which produce valid boxes by construction
    ///
    pub(crate) fn from_parts_unchecked(boxes: Vec<BoundingBox>, scores: Vec<f32>) -> Self {
        debug_assert_eq!(boxes.len(), scores.len());
        Self {
            boxes,
            scores,
            classes: None,
        }
    }

    /// Attaches class labels; only boxes of the same class suppress each other afterwards
    ///
    pub fn with_classes(mut self, classes: Vec<u32>) -> Result<Self> {
        check_length("classes", self.boxes.len(), classes.len())?;
        self.classes = Some(classes);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    pub fn classes(&self) -> Option<&[u32]> {
        self.classes.as_deref()
    }

    pub fn bbox(&self, index: usize) -> Option<&BoundingBox> {
        self.boxes.get(index)
    }

    pub fn score(&self, index: usize) -> Option<f32> {
        self.scores.get(index).copied()
    }

    pub fn class(&self, index: usize) -> Option<u32> {
        self.classes.as_ref().and_then(|c| c.get(index).copied())
    }

    /// `true` when the candidates may suppress each other with respect to class labels
    ///
    #[inline]
    pub(crate) fn same_class(&self, a: usize, b: usize) -> bool {
        match &self.classes {
            Some(c) => c[a] == c[b],
            None => true,
        }
    }

    /// New set holding the given candidates in the given order, renumbered from zero
    ///
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&index) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(Errors::InvalidInput(InputError::IndexOutOfRange {
                index,
                len: self.len(),
            }));
        }
        Ok(Self {
            boxes: indices.iter().map(|&i| self.boxes[i]).collect(),
            scores: indices.iter().map(|&i| self.scores[i]).collect(),
            classes: self
                .classes
                .as_ref()
                .map(|c| indices.iter().map(|&i| c[i]).collect()),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::bbox::{BoundingBox, BoxFormat};
    use crate::utils::box_set::BoxSet;
    use crate::{Errors, InputError};

    #[test]
    fn empty_set_is_valid() {
        let set = BoxSet::new(&[], &[], BoxFormat::Xyxy).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn length_mismatch() {
        let err = BoxSet::new(&[[0.0, 0.0, 1.0, 1.0]], &[0.5, 0.4], BoxFormat::Xyxy).unwrap_err();
        assert_eq!(
            err,
            Errors::InvalidInput(InputError::LengthMismatch {
                field: "scores",
                expected: 1,
                actual: 2
            })
        );

        let err = BoxSet::from_flat(&[0.0, 0.0, 1.0], &[0.5], BoxFormat::Xyxy).unwrap_err();
        assert!(matches!(
            err,
            Errors::InvalidInput(InputError::LengthMismatch { field: "coords", .. })
        ));

        let err = BoxSet::from_columns(&[0.0], &[0.0], &[1.0, 2.0], &[1.0], &[0.1]).unwrap_err();
        assert!(matches!(
            err,
            Errors::InvalidInput(InputError::LengthMismatch { field: "x_max", .. })
        ));
    }

    #[test]
    fn non_finite_values() {
        let err = BoxSet::new(
            &[[0.0, 0.0, 1.0, 1.0], [0.0, f32::NAN, 1.0, 1.0]],
            &[0.5, 0.4],
            BoxFormat::Xyxy,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Errors::InvalidInput(InputError::NonFiniteCoordinate { index: 1, .. })
        ));

        let err = BoxSet::new(
            &[[0.0, 0.0, 1.0, 1.0], [0.0, 0.0, 1.0, 1.0]],
            &[0.5, f32::INFINITY],
            BoxFormat::Xyxy,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Errors::InvalidInput(InputError::NonFiniteScore { index: 1, .. })
        ));

        let err = BoxSet::new(
            &[[f32::MAX, 0.0, f32::MAX, 1.0]],
            &[0.5],
            BoxFormat::Ltwh,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Errors::InvalidInput(InputError::NonFiniteCoordinate { index: 0, .. })
        ));
    }

    #[test]
    fn malformed_boxes() {
        let err = BoxSet::new(&[[5.0, 0.0, 1.0, 1.0]], &[0.5], BoxFormat::Xyxy).unwrap_err();
        assert!(matches!(
            err,
            Errors::InvalidInput(InputError::MalformedBox { index: 0, .. })
        ));

        let err = BoxSet::new(
            &[[0.0, 0.0, 1.0, 1.0], [0.0, 0.0, 1.0, -1.0]],
            &[0.5, 0.5],
            BoxFormat::Ltwh,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Errors::InvalidInput(InputError::MalformedBox { index: 1, .. })
        ));

        let err = BoxSet::from_boxes(vec![BoundingBox::new(0.0, 3.0, 1.0, 1.0)], vec![0.1])
            .unwrap_err();
        assert!(matches!(
            err,
            Errors::InvalidInput(InputError::MalformedBox { index: 0, .. })
        ));
    }

    #[test]
    fn zero_area_and_negative_scores_are_valid() {
        let set = BoxSet::new(
            &[[1.0, 1.0, 1.0, 1.0], [0.0, 0.0, 2.0, 0.0]],
            &[-3.0, 0.0],
            BoxFormat::Xyxy,
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.score(0), Some(-3.0));
        assert_eq!(set.score(2), None);
    }

    #[test]
    fn layouts_are_converted() {
        let set = BoxSet::from_flat(
            &[5.0, 5.0, 10.0, 10.0, 0.0, 0.0, 4.0, 4.0],
            &[0.9, 0.1],
            BoxFormat::Cxcywh,
        )
        .unwrap();
        assert_eq!(set.bbox(0), Some(&BoundingBox::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(set.bbox(1), Some(&BoundingBox::new(-2.0, -2.0, 2.0, 2.0)));

        let set = BoxSet::from_columns(&[0.0], &[1.0], &[2.0], &[3.0], &[0.3]).unwrap();
        assert_eq!(set.bbox(0), Some(&BoundingBox::new(0.0, 1.0, 2.0, 3.0)));
    }

    #[test]
    fn classes_and_subsets() {
        let set = BoxSet::new(
            &[
                [0.0, 0.0, 1.0, 1.0],
                [1.0, 1.0, 2.0, 2.0],
                [2.0, 2.0, 3.0, 3.0],
            ],
            &[0.1, 0.2, 0.3],
            BoxFormat::Xyxy,
        )
        .unwrap();
        assert!(set.clone().with_classes(vec![1]).is_err());

        let set = set.with_classes(vec![7, 8, 7]).unwrap();
        assert!(set.same_class(0, 2));
        assert!(!set.same_class(0, 1));

        let sub = set.subset(&[2, 0]).unwrap();
        assert_eq!(sub.scores(), &[0.3, 0.1]);
        assert_eq!(sub.classes(), Some(&[7, 7][..]));
        assert_eq!(
            set.subset(&[0, 3]).unwrap_err(),
            Errors::InvalidInput(InputError::IndexOutOfRange { index: 3, len: 3 })
        );
    }
}
