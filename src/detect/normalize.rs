use crate::classes::ClassLabel;
use crate::detect::result::{Detection, RawDetection};

/// Attach class name and display color to a raw detection.
///
/// Never fails: ids missing from the class table become `"Class {id}"` with
/// the neutral color.
pub fn normalize(raw: RawDetection) -> Detection {
    let label = ClassLabel::from_raw(raw.class_id);
    Detection {
        bbox: raw.bbox,
        confidence: raw.confidence,
        label,
        class_name: label.name().into_owned(),
        display_color: label.display_color(),
    }
}
