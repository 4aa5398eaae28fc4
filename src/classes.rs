//! Fixed class table for the heritage detector.
//!
//! The detector is trained on a small closed set of categories. Each category
//! has a human-readable name and a display color used by the annotator. Ids
//! the table does not know about still resolve to a label (`Class {id}`) so
//! that an out-of-date model never breaks downstream statistics.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// RGB display color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub [u8; 3]);

impl Color {
    /// Fallback color for ids missing from the class table.
    pub const NEUTRAL: Color = Color([255, 255, 255]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color([r, g, b])
    }

    /// Same color in BGR channel order.
    pub fn to_bgr(self) -> [u8; 3] {
        let [r, g, b] = self.0;
        [b, g, r]
    }
}

/// Known detector classes. The discriminant is the model's class index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassId {
    Stones = 0,
    Crops = 1,
    NonArchaeological = 2,
    HeritageSite = 3,
}

impl ClassId {
    pub const ALL: [ClassId; 4] = [
        ClassId::Stones,
        ClassId::Crops,
        ClassId::NonArchaeological,
        ClassId::HeritageSite,
    ];

    pub fn from_raw(id: i64) -> Option<Self> {
        match id {
            0 => Some(ClassId::Stones),
            1 => Some(ClassId::Crops),
            2 => Some(ClassId::NonArchaeological),
            3 => Some(ClassId::HeritageSite),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn definition(self) -> &'static ClassDefinition {
        &CLASS_TABLE[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.definition().name
    }

    pub fn display_color(self) -> Color {
        self.definition().display_color
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassDefinition {
    pub id: ClassId,
    pub name: &'static str,
    pub display_color: Color,
}

/// Class table, indexed by `ClassId as usize`.
pub static CLASS_TABLE: [ClassDefinition; 4] = [
    ClassDefinition {
        id: ClassId::Stones,
        name: "Stones / Stone Pillars / Stone Structures",
        display_color: Color::rgb(139, 69, 19),
    },
    ClassDefinition {
        id: ClassId::Crops,
        name: "Crops / Farmland",
        display_color: Color::rgb(34, 139, 34),
    },
    ClassDefinition {
        id: ClassId::NonArchaeological,
        name: "Non-archaeological (deserts, water, mountains, etc.)",
        display_color: Color::rgb(105, 105, 105),
    },
    ClassDefinition {
        id: ClassId::HeritageSite,
        name: "Heritage Sites (temples, palaces, forts, museums)",
        display_color: Color::rgb(184, 134, 11),
    },
];

/// Class of a detection: either a table entry or a raw id the table lacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassLabel {
    Known(ClassId),
    Unknown(i64),
}

impl ClassLabel {
    pub fn from_raw(id: i64) -> Self {
        match ClassId::from_raw(id) {
            Some(class) => ClassLabel::Known(class),
            None => ClassLabel::Unknown(id),
        }
    }

    pub fn raw_id(self) -> i64 {
        match self {
            ClassLabel::Known(class) => class as i64,
            ClassLabel::Unknown(id) => id,
        }
    }

    pub fn name(self) -> Cow<'static, str> {
        match self {
            ClassLabel::Known(class) => Cow::Borrowed(class.name()),
            ClassLabel::Unknown(id) => Cow::Owned(format!("Class {id}")),
        }
    }

    pub fn display_color(self) -> Color {
        match self {
            ClassLabel::Known(class) => class.display_color(),
            ClassLabel::Unknown(_) => Color::NEUTRAL,
        }
    }

    pub fn is_known(self) -> bool {
        matches!(self, ClassLabel::Known(_))
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_class_id() {
        for class in ClassId::ALL {
            assert_eq!(CLASS_TABLE[class.index()].id, class);
            assert_eq!(ClassId::from_raw(class as i64), Some(class));
        }
    }

    #[test]
    fn unknown_ids_get_synthetic_label() {
        let label = ClassLabel::from_raw(99);
        assert_eq!(label, ClassLabel::Unknown(99));
        assert_eq!(label.name(), "Class 99");
        assert_eq!(label.display_color(), Color::NEUTRAL);
        assert_eq!(label.raw_id(), 99);

        assert_eq!(ClassLabel::from_raw(-1).name(), "Class -1");
    }

    #[test]
    fn known_ids_resolve_name_and_color() {
        let label = ClassLabel::from_raw(1);
        assert!(label.is_known());
        assert_eq!(label.to_string(), "Crops / Farmland");
        assert_eq!(label.display_color(), Color::rgb(34, 139, 34));
        assert_eq!(Color::rgb(1, 2, 3).to_bgr(), [3, 2, 1]);
    }
}
