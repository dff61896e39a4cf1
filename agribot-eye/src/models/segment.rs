//! Instance segmentation output and the model seam

use crate::camera::Frame;
use crate::error::VisionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One detected object instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Mask outline in frame pixels
    pub polygon: Vec<(f64, f64)>,
    /// x1, y1, x2, y2
    #[serde(rename = "box", default)]
    pub bbox: [f32; 4],
    #[serde(rename = "class", default)]
    pub class_name: String,
    #[serde(default)]
    pub confidence: f32,
}

impl Segment {
    pub fn from_polygon(polygon: Vec<(f64, f64)>) -> Self {
        let bbox = bounding_box(&polygon);
        Self {
            polygon,
            bbox,
            class_name: String::new(),
            confidence: 1.0,
        }
    }
}

fn bounding_box(polygon: &[(f64, f64)]) -> [f32; 4] {
    if polygon.is_empty() {
        return [0.0; 4];
    }
    let mut bbox = [f64::MAX, f64::MAX, f64::MIN, f64::MIN];
    for &(x, y) in polygon {
        bbox[0] = bbox[0].min(x);
        bbox[1] = bbox[1].min(y);
        bbox[2] = bbox[2].max(x);
        bbox[3] = bbox[3].max(y);
    }
    bbox.map(|v| v as f32)
}

/// Image in, instance polygons out.
#[async_trait]
pub trait SegmentationModel: Send + Sync {
    async fn infer(&self, frame: &Frame) -> Result<Vec<Segment>, VisionError>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_segment_wire_names() {
        let segment: Segment = serde_json::from_value(json!({
            "polygon": [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]],
            "box": [0.0, 0.0, 10.0, 10.0],
            "class": "weed",
            "confidence": 0.87
        }))
        .unwrap();
        assert_eq!(segment.class_name, "weed");
        assert_eq!(segment.polygon.len(), 3);
        assert_eq!(segment.bbox, [0.0, 0.0, 10.0, 10.0]);
    }

    #[test]
    fn test_from_polygon_computes_box() {
        let segment = Segment::from_polygon(vec![(5.0, 7.0), (15.0, 2.0), (9.0, 20.0)]);
        assert_eq!(segment.bbox, [5.0, 2.0, 15.0, 20.0]);
    }

    #[test]
    fn test_from_empty_polygon() {
        let segment = Segment::from_polygon(Vec::new());
        assert_eq!(segment.bbox, [0.0; 4]);
    }
}
