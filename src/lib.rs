//! Greedy non-maximum suppression for scored, axis-aligned boxes.
//!
//! The crate ranks candidates by score, walks the ranking and discards every lower-ranked
//! candidate whose overlap with an already kept one reaches the threshold. Spatial pruners
//! keep the number of evaluated pairs far below `N²` for sparse scenes.
//!
//! ```
//! use nms_optimized::prelude::*;
//!
//! let set = BoxSet::new(
//!     &[[0.0, 0.0, 10.0, 10.0], [1.0, 1.0, 11.0, 11.0], [50.0, 50.0, 60.0, 60.0]],
//!     &[0.9, 0.8, 0.7],
//!     BoxFormat::Xyxy,
//! )
//! .unwrap();
//! assert_eq!(nms(&set, 0.5).unwrap(), vec![0, 2]);
//! ```

/// Scene generators for tests and benchmarks
pub mod examples;
pub mod prelude;
pub mod utils;

use thiserror::Error;

/// Defects of the candidate data detected before suppression starts.
///
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("`{field}` has {actual} elements, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("box {index} has a non-finite coordinate {value}")]
    NonFiniteCoordinate { index: usize, value: f32 },
    #[error("box {index} has a non-finite score {value}")]
    NonFiniteScore { index: usize, value: f32 },
    #[error("box {index} is malformed: {reason}")]
    MalformedBox { index: usize, reason: &'static str },
    #[error("index {index} is out of range for {len} candidates")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Errors {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),
    #[error("Invalid value of `{parameter}`: {reason}")]
    ConfigurationError {
        parameter: &'static str,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Errors>;

pub(crate) const EPS: f32 = 0.00001;

/// Approximate comparison for floating point objects
///
pub trait EstimateClose {
    fn almost_same(&self, other: &Self, eps: f32) -> bool;
}

impl EstimateClose for f32 {
    fn almost_same(&self, other: &Self, eps: f32) -> bool {
        (self - other).abs() < eps
    }
}
