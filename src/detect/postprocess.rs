//! Box filtering shared by model-backed detector backends.

use std::cmp::Ordering;

use crate::detect::result::RawDetection;

/// Per-class non-maximum suppression.
///
/// Returns the kept detections ordered by descending confidence. Boxes of
/// different classes never suppress each other.
pub fn nms_per_class(mut candidates: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<RawDetection> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

/// Drop detections below `threshold` or with degenerate boxes.
pub fn filter_candidates(candidates: Vec<RawDetection>, threshold: f32) -> Vec<RawDetection> {
    candidates
        .into_iter()
        .filter(|d| d.confidence >= threshold && d.bbox.is_valid())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::BoundingBox;

    fn det(x: f32, conf: f32, class_id: i64) -> RawDetection {
        RawDetection::new(BoundingBox::new(x, 0.0, x + 10.0, 10.0), conf, class_id)
    }

    #[test]
    fn overlapping_same_class_is_suppressed() {
        let kept = nms_per_class(vec![det(0.0, 0.6, 0), det(1.0, 0.9, 0), det(50.0, 0.5, 0)], 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.5);
    }

    #[test]
    fn overlapping_other_class_is_kept() {
        let kept = nms_per_class(vec![det(0.0, 0.6, 0), det(1.0, 0.9, 1)], 0.45);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn filter_drops_low_confidence_and_degenerate() {
        let degenerate = RawDetection::new(BoundingBox::new(5.0, 5.0, 5.0, 6.0), 0.9, 0);
        let kept = filter_candidates(vec![det(0.0, 0.2, 0), det(0.0, 0.3, 1), degenerate], 0.25);
        assert_eq!(kept, vec![det(0.0, 0.3, 1)]);
    }
}
