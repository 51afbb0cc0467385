use crate::detection::Detection;

/// One decoded video frame's worth of detector output.
pub struct Frame {
    pub detections: Vec<Detection>,
    pub timestamp: f32, // in seconds
}

impl Frame {
    pub fn new(timestamp: f32, detections: Vec<Detection>) -> Self {
        Self {
            detections,
            timestamp,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter()
    }
}
