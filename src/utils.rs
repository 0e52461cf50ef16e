/// Bounding boxes and overlap metrics
pub mod bbox;

/// Validated candidate sets
pub mod box_set;

/// Non maximum suppression implementation for detected boxes
pub mod nms;
