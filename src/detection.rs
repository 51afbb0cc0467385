use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// Axis-aligned box in image coordinates with its classifier output.
/// Produced once per frame by an external detector.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    #[serde(rename = "p")]
    pub confidence: f32,
    #[serde(rename = "c")]
    pub class_id: i32,
    #[serde(default)]
    pub class_name: String,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_id: i32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id,
            class_name: String::new(),
        }
    }

    #[inline]
    pub fn center(&self) -> na::Point2<f32> {
        na::Point2::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn iou(&self, other: &Detection) -> f32 {
        let i_xmin = self.x1.max(other.x1);
        let i_xmax = self.x2.min(other.x2);
        let i_ymin = self.y1.max(other.y1);
        let i_ymax = self.y2.min(other.y2);

        let i_area = (i_xmax - i_xmin).max(0.0) * (i_ymax - i_ymin).max(0.0);
        let union = self.area() + other.area() - i_area;

        if union > 0.0 {
            i_area / union
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_and_area() {
        let det = Detection::new(10.0, 20.0, 30.0, 60.0, 0.9, 2);

        assert_eq!(det.center(), na::Point2::new(20.0, 40.0));
        assert_eq!(det.area(), 800.0);
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let det = Detection::new(0.0, 0.0, 10.0, 10.0, 0.9, 2);
        assert!((det.iou(&det) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = Detection::new(0.0, 0.0, 10.0, 10.0, 0.9, 2);
        let b = Detection::new(20.0, 20.0, 30.0, 30.0, 0.9, 2);

        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = Detection::new(0.0, 0.0, 10.0, 10.0, 0.9, 2);
        let b = Detection::new(5.0, 0.0, 15.0, 10.0, 0.9, 2);

        // intersection 50, union 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }
}
