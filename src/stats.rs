//! Aggregation of detections into per-class statistics.
//!
//! A [`StatisticsSummary`] is always derived from a full list of detections;
//! nothing is maintained incrementally. Maps are keyed by class name; the
//! order in which classes were first seen is kept separately and decides
//! ties and listing order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::detect::Detection;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub total_detections: usize,
    pub class_counts: BTreeMap<String, usize>,
    /// Mean confidence over all detections; `0.0` when there are none.
    pub confidence_avg: f64,
    pub class_confidence_avg: BTreeMap<String, f64>,
    /// Class names in the order they first appear in `all_detections`.
    pub class_order: Vec<String>,
    /// The aggregated input, kept for recomputation downstream.
    pub all_detections: Vec<Detection>,
}

/// Fold a list of detections into a summary.
///
/// The empty list yields the zero summary.
pub fn aggregate(detections: &[Detection]) -> StatisticsSummary {
    if detections.is_empty() {
        return StatisticsSummary::default();
    }

    let mut class_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut class_order: Vec<String> = Vec::new();
    let mut class_sums: BTreeMap<&str, f64> = BTreeMap::new();
    let mut total = 0.0f64;

    for detection in detections {
        let confidence = detection.confidence as f64;
        let count = class_counts
            .entry(detection.class_name.clone())
            .or_insert(0);
        if *count == 0 {
            class_order.push(detection.class_name.clone());
        }
        *count += 1;
        *class_sums.entry(detection.class_name.as_str()).or_insert(0.0) += confidence;
        total += confidence;
    }

    let class_confidence_avg = class_sums
        .into_iter()
        .map(|(name, sum)| {
            let count = class_counts.get(name).copied().unwrap_or(1);
            (name.to_string(), sum / count as f64)
        })
        .collect();

    StatisticsSummary {
        total_detections: detections.len(),
        class_counts,
        confidence_avg: total / detections.len() as f64,
        class_confidence_avg,
        class_order,
        all_detections: detections.to_vec(),
    }
}

/// Aggregate the concatenation of several detection lists.
pub fn aggregate_lists<L: AsRef<[Detection]>>(lists: &[L]) -> StatisticsSummary {
    let all: Vec<Detection> = lists
        .iter()
        .flat_map(|list| list.as_ref().iter().cloned())
        .collect();
    aggregate(&all)
}

impl StatisticsSummary {
    pub fn is_empty(&self) -> bool {
        self.total_detections == 0
    }

    /// Number of distinct classes seen.
    pub fn class_count(&self) -> usize {
        self.class_counts.len()
    }

    /// Class with the highest count and its count.
    ///
    /// Ties go to the class seen first.
    pub fn most_common(&self) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for (name, count) in self.classes_in_order() {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((name, count));
            }
        }
        best
    }

    /// `(class name, count)` pairs in first-seen order.
    pub fn classes_in_order(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.class_order.iter().map(|name| {
            (
                name.as_str(),
                self.class_counts.get(name).copied().unwrap_or(0),
            )
        })
    }

    /// Share of `class_name` among all detections, in percent.
    pub fn class_share(&self, class_name: &str) -> f64 {
        if self.total_detections == 0 {
            return 0.0;
        }
        let count = self.class_counts.get(class_name).copied().unwrap_or(0);
        count as f64 * 100.0 / self.total_detections as f64
    }

    /// Summary over the detections of both inputs, e.g. images plus video.
    pub fn combine(a: &StatisticsSummary, b: &StatisticsSummary) -> StatisticsSummary {
        aggregate_lists(&[&a.all_detections[..], &b.all_detections[..]])
    }

    /// Detection counts per confidence bin over `[0, 1]`.
    ///
    /// Confidences outside the range land in the first or last bin.
    pub fn confidence_histogram(&self, bins: usize) -> Vec<usize> {
        let mut histogram = vec![0usize; bins];
        if bins == 0 {
            return histogram;
        }
        for detection in &self.all_detections {
            let c = detection.confidence.clamp(0.0, 1.0) as f64;
            let idx = ((c * bins as f64) as usize).min(bins - 1);
            histogram[idx] += 1;
        }
        histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::{ClassLabel, Color};
    use crate::detect::BoundingBox;

    fn det(name: &str, confidence: f32) -> Detection {
        Detection {
            bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            confidence,
            label: ClassLabel::Unknown(-1),
            class_name: name.to_string(),
            display_color: Color::NEUTRAL,
        }
    }

    #[test]
    fn empty_input_is_zero_summary() {
        let summary = aggregate(&[]);
        assert_eq!(summary.total_detections, 0);
        assert!(summary.class_counts.is_empty());
        assert!(summary.class_confidence_avg.is_empty());
        assert_eq!(summary.confidence_avg, 0.0);
        assert!(summary.all_detections.is_empty());
        assert_eq!(summary.most_common(), None);
        assert_eq!(summary.class_share("A"), 0.0);
    }

    #[test]
    fn most_common_breaks_ties_by_first_seen() {
        let summary = aggregate(&[det("B", 0.5), det("A", 0.5), det("B", 0.5), det("A", 0.5)]);
        assert_eq!(summary.most_common(), Some(("B", 2)));
        assert_eq!(summary.class_order, vec!["B", "A"]);

        let summary = aggregate(&[det("A", 0.5), det("B", 0.5), det("B", 0.5)]);
        assert_eq!(summary.most_common(), Some(("B", 2)));
    }

    #[test]
    fn histogram_bins_confidences() {
        let summary = aggregate(&[det("A", 0.05), det("A", 0.55), det("A", 1.0), det("A", 1.5)]);
        assert_eq!(summary.confidence_histogram(10), vec![1, 0, 0, 0, 0, 1, 0, 0, 0, 2]);
        assert!(summary.confidence_histogram(0).is_empty());
    }

    #[test]
    fn combine_recomputes_over_both_inputs() {
        let images = aggregate(&[det("A", 0.4)]);
        let video = aggregate(&[det("A", 0.8), det("B", 0.6)]);
        let combined = StatisticsSummary::combine(&images, &video);
        assert_eq!(combined.total_detections, 3);
        assert_eq!(combined.class_counts["A"], 2);
        assert!((combined.class_confidence_avg["A"] - 0.6).abs() < 1e-6);
        assert!((combined.class_share("B") - 100.0 / 3.0).abs() < 1e-9);
    }
}
