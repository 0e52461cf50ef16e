use crate::{EstimateClose, EPS};

/// Bounding box in the format (x_min, y_min, x_max, y_max)
///
/// It is the only representation used inside the suppression machinery; other layouts are
/// converted at the boundary with [`BoxFormat`]. The constructor does not validate the corner
/// order, [`crate::utils::box_set::BoxSet`] does.
///
#[derive(Clone, Default, Debug, Copy)]
pub struct BoundingBox {
    _x_min: f32,
    _y_min: f32,
    _x_max: f32,
    _y_max: f32,
}

impl BoundingBox {
    /// Constructor
    ///
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            _x_min: x_min,
            _y_min: y_min,
            _x_max: x_max,
            _y_max: y_max,
        }
    }

    /// Constructor from the (left, top, width, height) layout
    ///
    pub fn ltwh(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self::new(left, top, left + width, top + height)
    }

    /// Constructor from the (center_x, center_y, width, height) layout
    ///
    pub fn cxcywh(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Self::new(cx - hw, cy - hh, cx + hw, cy + hh)
    }

    pub fn x_min(&self) -> f32 {
        self._x_min
    }

    pub fn y_min(&self) -> f32 {
        self._y_min
    }

    pub fn x_max(&self) -> f32 {
        self._x_max
    }

    pub fn y_max(&self) -> f32 {
        self._y_max
    }

    pub fn width(&self) -> f32 {
        self._x_max - self._x_min
    }

    pub fn height(&self) -> f32 {
        self._y_max - self._y_min
    }

    pub fn as_xyxy(&self) -> [f32; 4] {
        [self._x_min, self._y_min, self._x_max, self._y_max]
    }

    pub fn as_ltwh(&self) -> [f32; 4] {
        [self._x_min, self._y_min, self.width(), self.height()]
    }

    pub fn as_cxcywh(&self) -> [f32; 4] {
        let (w, h) = (self.width(), self.height());
        [self._x_min + w / 2.0, self._y_min + h / 2.0, w, h]
    }

    /// Area in `f64`; zero for degenerate boxes
    ///
    pub fn area(&self) -> f64 {
        let w = self._x_max as f64 - self._x_min as f64;
        let h = self._y_max as f64 - self._y_min as f64;
        if w > 0.0 && h > 0.0 {
            w * h
        } else {
            0.0
        }
    }

    /// Checks that both closed coordinate intervals of the boxes intersect.
    ///
    /// A `false` answer proves that the intersection area is zero. Touching boxes answer `true`.
    ///
    pub fn intervals_intersect(&self, other: &BoundingBox) -> bool {
        self._x_min <= other._x_max
            && other._x_min <= self._x_max
            && self._y_min <= other._y_max
            && other._y_min <= self._y_max
    }

    /// Intersection area; only commutative operations combine the operands
    ///
    pub fn intersection(l: &BoundingBox, r: &BoundingBox) -> f64 {
        let (x1, y1) = (l._x_min.max(r._x_min), l._y_min.max(r._y_min));
        let (x2, y2) = (l._x_max.min(r._x_max), l._y_max.min(r._y_max));

        let int_width = x2 as f64 - x1 as f64;
        let int_height = y2 as f64 - y1 as f64;

        if int_width > 0.0 && int_height > 0.0 {
            int_width * int_height
        } else {
            0.0_f64
        }
    }

    /// Intersection over union.
    ///
    /// When the union is empty (two zero-area boxes) the ratio is defined as `0`. The result is
    /// bit-identical for swapped arguments.
    ///
    pub fn iou(l: &BoundingBox, r: &BoundingBox) -> f32 {
        let intersection = BoundingBox::intersection(l, r);
        if intersection == 0.0 {
            return 0.0;
        }
        let union = l.area() + r.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        ((intersection / union) as f32).min(1.0)
    }

    /// Intersection over the area of the smaller box, `0` when that area is empty
    ///
    pub fn iom(l: &BoundingBox, r: &BoundingBox) -> f32 {
        let intersection = BoundingBox::intersection(l, r);
        if intersection == 0.0 {
            return 0.0;
        }
        let min_area = l.area().min(r.area());
        if min_area <= 0.0 {
            return 0.0;
        }
        ((intersection / min_area) as f32).min(1.0)
    }
}

impl EstimateClose for BoundingBox {
    /// Allows comparing bboxes
    ///
    fn almost_same(&self, other: &Self, eps: f32) -> bool {
        (self._x_min - other._x_min).abs() < eps
            && (self._y_min - other._y_min).abs() < eps
            && (self._x_max - other._x_max).abs() < eps
            && (self._y_max - other._y_max).abs() < eps
    }
}

impl PartialEq<Self> for BoundingBox {
    fn eq(&self, other: &Self) -> bool {
        self.almost_same(other, EPS)
    }
}

/// Coordinate layout of raw input quadruples
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoxFormat {
    /// (x_min, y_min, x_max, y_max)
    #[default]
    Xyxy,
    /// (left, top, width, height)
    Ltwh,
    /// (center_x, center_y, width, height)
    Cxcywh,
}

impl BoxFormat {
    /// Converts a raw quadruple into the canonical box.
    ///
    /// Size-based layouts with a negative width or height are rejected; for `Xyxy` the corner
    /// order is checked on the resulting box.
    ///
    pub fn decode(self, c: [f32; 4]) -> Result<BoundingBox, &'static str> {
        match self {
            BoxFormat::Xyxy => Ok(BoundingBox::new(c[0], c[1], c[2], c[3])),
            BoxFormat::Ltwh | BoxFormat::Cxcywh if c[2] < 0.0 => Err("negative width"),
            BoxFormat::Ltwh | BoxFormat::Cxcywh if c[3] < 0.0 => Err("negative height"),
            BoxFormat::Ltwh => Ok(BoundingBox::ltwh(c[0], c[1], c[2], c[3])),
            BoxFormat::Cxcywh => Ok(BoundingBox::cxcywh(c[0], c[1], c[2], c[3])),
        }
    }
}

/// Overlap ratio used to decide suppression
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverlapMetric {
    /// Intersection over union
    #[default]
    Iou,
    /// Intersection over the smaller of the two areas; favours keeping large boxes that
    /// swallow small ones
    IntersectionOverMinimum,
}

impl OverlapMetric {
    #[inline]
    pub fn evaluate(&self, l: &BoundingBox, r: &BoundingBox) -> f32 {
        match self {
            OverlapMetric::Iou => BoundingBox::iou(l, r),
            OverlapMetric::IntersectionOverMinimum => BoundingBox::iom(l, r),
        }
    }
}
