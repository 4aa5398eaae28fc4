//! Narrative summary and headline metrics for a [`StatisticsSummary`].

use serde::Serialize;

use crate::stats::StatisticsSummary;

const NAME_DISPLAY_LIMIT: usize = 15;

/// Human-readable paragraph describing a summary.
///
/// `duration_secs` is the analyzed footage length, when known.
pub fn summary_text(summary: &StatisticsSummary, duration_secs: Option<f64>) -> String {
    if summary.is_empty() {
        return "No objects were detected in the provided content.".to_string();
    }

    let total = summary.total_detections;
    let mut text = String::from("In the analyzed content");
    if let Some(duration) = duration_secs.filter(|d| *d > 0.0) {
        let minutes = (duration / 60.0).floor() as u64;
        let seconds = (duration % 60.0).floor() as u64;
        text.push_str(&format!(" ({minutes}m {seconds}s of footage)"));
    }
    text.push_str(&format!(
        ", {} heritage objects were detected with an average confidence of {:.1}%.",
        total,
        summary.confidence_avg * 100.0
    ));

    if let Some((name, _)) = summary.most_common() {
        text.push_str(&format!(
            " The most common detection was {} ({:.0}% of all detections).",
            name,
            summary.class_share(name)
        ));
    }

    if summary.class_count() > 1 {
        let breakdown: Vec<String> = summary
            .classes_in_order()
            .map(|(name, _)| format!("{} ({:.0}%)", name, summary.class_share(name)))
            .collect();
        text.push_str(" The detection breakdown includes: ");
        text.push_str(&breakdown.join(", "));
        text.push('.');
    }

    text
}

/// Headline numbers shown above detailed results.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KeyMetrics {
    pub total_detections: usize,
    pub average_confidence: f64,
    pub classes_detected: usize,
    pub most_common: Option<MostCommon>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MostCommon {
    /// Class name, shortened for display.
    pub display_name: String,
    pub count: usize,
}

impl KeyMetrics {
    pub fn from_summary(summary: &StatisticsSummary) -> Self {
        Self {
            total_detections: summary.total_detections,
            average_confidence: summary.confidence_avg,
            classes_detected: summary.class_count(),
            most_common: summary.most_common().map(|(name, count)| MostCommon {
                display_name: shorten(name, NAME_DISPLAY_LIMIT),
                count,
            }),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Total Detections:   {}", self.total_detections),
            format!(
                "Average Confidence: {:.1}%",
                self.average_confidence * 100.0
            ),
            format!("Classes Detected:   {}", self.classes_detected),
        ];
        if let Some(most) = &self.most_common {
            lines.push(format!(
                "Most Common:        {} ({} detections)",
                most.display_name, most.count
            ));
        }
        lines
    }
}

fn shorten(name: &str, limit: usize) -> String {
    if name.chars().count() > limit {
        let head: String = name.chars().take(limit).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}
