/// Axis-aligned bounding box in pixel coordinates of the source frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxRect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

/// One detected object in one frame.
///
/// Detections carry no cross-frame identity: frame N's "person" has no
/// correspondence to frame N-1's.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub label: String,
    /// Model confidence in [0, 1].
    pub confidence: f32,
    pub rect: BoxRect,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, rect: BoxRect) -> Self {
        Self {
            label: label.into(),
            confidence,
            rect,
        }
    }
}
