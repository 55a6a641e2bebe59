//! Identifier generation
//!
//! Ids are a one-letter prefix naming the element family followed by a
//! random UUID, so they are valid `xml:id` values (which may not start
//! with a digit).

use uuid::Uuid;

/// Element family an id is generated for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdKind {
    Document,
    Source,
    Surface,
    Graphic,
    Movement,
    Section,
    Measure,
    /// Zone drawn on the drawing surface
    DrawnZone,
    /// Zone produced by the measure detector
    DetectedZone,
    /// Zone spanning a whole page
    SeedZone,
    PageBreak,
    SystemBreak,
}

impl IdKind {
    pub fn prefix(&self) -> char {
        match self {
            IdKind::Document | IdKind::Movement => 'm',
            IdKind::Source | IdKind::Surface => 's',
            IdKind::Graphic => 'g',
            IdKind::Section => 'c',
            IdKind::Measure => 'b',
            IdKind::DrawnZone | IdKind::SeedZone => 'z',
            IdKind::DetectedZone => 'd',
            IdKind::PageBreak => 'p',
            IdKind::SystemBreak => 'y',
        }
    }
}

/// Generate a globally unique id for the given element family
pub fn new_id(kind: IdKind) -> String {
    format!("{}{}", kind.prefix(), Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_prefix_and_uniqueness() {
        let ids: HashSet<String> = (0..200).map(|_| new_id(IdKind::Measure)).collect();
        assert_eq!(ids.len(), 200);
        assert!(ids.iter().all(|id| id.starts_with('b') && id.len() == 37));
    }

    #[test]
    fn test_detected_zone_prefix() {
        assert!(new_id(IdKind::DetectedZone).starts_with('d'));
        assert!(new_id(IdKind::Surface).starts_with('s'));
    }
}
