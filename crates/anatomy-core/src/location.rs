//! Diagnostic location table
//!
//! Maps the location code produced by the classifier onto a position in
//! normalized model space. The rows are contract data shared with whatever
//! assigns the codes, so they are written out literally and never computed.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version of the code table below. Bump together with the classifier.
pub const TABLE_VERSION: u32 = 1;

/// Opaque location code handed to the viewer by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationCode(pub u32);

impl LocationCode {
    /// Parse a code from user-facing text (URL query value, CLI argument).
    /// Anything that isn't a plain unsigned integer yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        text.trim().parse::<u32>().ok().map(Self)
    }
}

impl fmt::Display for LocationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for LocationCode {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

/// A single row of the location table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationEntry {
    pub code: LocationCode,
    /// Marker anchor in normalized model space (model max dimension = 2.0)
    pub position: Vec3,
    /// Short text rendered on the label billboard
    pub label: &'static str,
    pub description: &'static str,
}

const LOCATIONS: [LocationEntry; 8] = [
    LocationEntry {
        code: LocationCode(1),
        position: Vec3::new(-0.40, -0.50, 0.30),
        label: "Thyroid Center",
        description: "Central thyroid region at the midline",
    },
    LocationEntry {
        code: LocationCode(2),
        position: Vec3::new(-0.65, -0.20, 0.30),
        label: "Right Lobe Upper",
        description: "Superior pole of the right thyroid lobe",
    },
    LocationEntry {
        code: LocationCode(3),
        position: Vec3::new(-0.70, -0.45, 0.32),
        label: "Right Lobe Middle",
        description: "Mid portion of the right thyroid lobe",
    },
    LocationEntry {
        code: LocationCode(4),
        position: Vec3::new(-0.65, -0.70, 0.30),
        label: "Right Lobe Lower",
        description: "Inferior pole of the right thyroid lobe",
    },
    LocationEntry {
        code: LocationCode(5),
        position: Vec3::new(-0.15, -0.20, 0.30),
        label: "Left Lobe Upper",
        description: "Superior pole of the left thyroid lobe",
    },
    LocationEntry {
        code: LocationCode(6),
        position: Vec3::new(-0.10, -0.45, 0.32),
        label: "Left Lobe Middle",
        description: "Mid portion of the left thyroid lobe",
    },
    LocationEntry {
        code: LocationCode(7),
        position: Vec3::new(-0.15, -0.70, 0.30),
        label: "Left Lobe Lower",
        description: "Inferior pole of the left thyroid lobe",
    },
    LocationEntry {
        code: LocationCode(8),
        position: Vec3::new(-0.40, -0.60, 0.40),
        label: "Isthmus",
        description: "Isthmus bridging the two lobes",
    },
];

/// Look up the table row for a code. `None` means "no marker", not an error.
pub fn map(code: LocationCode) -> Option<&'static LocationEntry> {
    LOCATIONS.iter().find(|entry| entry.code == code)
}

/// All rows, in code order
pub fn entries() -> &'static [LocationEntry] {
    &LOCATIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thyroid_center_literal() {
        let entry = map(LocationCode(1)).unwrap();
        assert_eq!(entry.position, Vec3::new(-0.40, -0.50, 0.30));
        assert_eq!(entry.label, "Thyroid Center");
    }

    #[test]
    fn test_every_row_maps_to_itself() {
        for entry in entries() {
            let found = map(entry.code).unwrap();
            assert_eq!(found.position, entry.position);
            assert_eq!(found.label, entry.label);
        }
    }

    #[test]
    fn test_table_shape() {
        assert_eq!(entries().len(), 8);

        // Codes are 1..=8 with no gaps or duplicates
        let codes: Vec<u32> = entries().iter().map(|e| e.code.0).collect();
        assert_eq!(codes, (1..=8).collect::<Vec<_>>());

        // Every sub-region has its own position and label
        for (i, a) in entries().iter().enumerate() {
            for b in &entries()[i + 1..] {
                assert_ne!(a.position, b.position);
                assert_ne!(a.label, b.label);
            }
        }
    }

    #[test]
    fn test_unknown_codes() {
        assert!(map(LocationCode(0)).is_none());
        assert!(map(LocationCode(9)).is_none());
        assert!(map(LocationCode(u32::MAX)).is_none());
    }

    #[test]
    fn test_parse() {
        assert_eq!(LocationCode::parse("3"), Some(LocationCode(3)));
        assert_eq!(LocationCode::parse(" 7 "), Some(LocationCode(7)));
        assert_eq!(LocationCode::parse("-1"), None);
        assert_eq!(LocationCode::parse("thyroid"), None);
        assert_eq!(LocationCode::parse(""), None);
    }
}
