//! Zone geometry classification
//!
//! Groups the measure zones of one page into systems (rows) in reading
//! order. This is a greedy row-clustering heuristic, not layout detection:
//! the topmost remaining zone anchors a row, every zone whose top lies
//! within `ratio × min_height` of the anchor's top joins it, and the rest
//! is clustered the same way. Skewed scans or systems whose height differs
//! a lot from the smallest zone can be split or merged wrongly.

use crate::models::{Measure, Rect, Zone};

/// A zone reduced to what the classifier needs
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneBox {
    pub id: String,
    pub rect: Rect,
}

/// One row of zones, ordered left to right
#[derive(Clone, Debug, PartialEq, Default)]
pub struct System {
    pub zones: Vec<ZoneBox>,
}

impl System {
    pub fn first(&self) -> Option<&ZoneBox> {
        self.zones.first()
    }

    /// Rightmost zone of the row
    pub fn last(&self) -> Option<&ZoneBox> {
        self.zones.last()
    }

    pub fn contains(&self, zone_id: &str) -> bool {
        self.zones.iter().any(|z| z.id == zone_id)
    }
}

/// Reading-order layout of a page
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SystemLayout {
    pub systems: Vec<System>,
}

impl SystemLayout {
    /// (system index, index within system) of a zone
    pub fn locate(&self, zone_id: &str) -> Option<(usize, usize)> {
        self.systems.iter().enumerate().find_map(|(si, system)| {
            system
                .zones
                .iter()
                .position(|z| z.id == zone_id)
                .map(|zi| (si, zi))
        })
    }

    /// System index of the first of the measure's zones found on this page
    pub fn system_of(&self, measure: &Measure) -> Option<usize> {
        measure
            .facs
            .iter()
            .find_map(|zone_id| self.locate(zone_id).map(|(si, _)| si))
    }

    /// All zone ids flattened in reading order
    pub fn reading_order(&self) -> Vec<&str> {
        self.systems
            .iter()
            .flat_map(|s| s.zones.iter().map(|z| z.id.as_str()))
            .collect()
    }

    /// Zone preceding `zone_id` in reading order on this page
    pub fn preceding(&self, zone_id: &str) -> Option<&str> {
        let order = self.reading_order();
        let index = order.iter().position(|id| *id == zone_id)?;
        index.checked_sub(1).map(|i| order[i])
    }

    /// Last zone in reading order
    pub fn last_zone(&self) -> Option<&ZoneBox> {
        self.systems.last().and_then(System::last)
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

/// Classify the measure zones of a page into systems
///
/// Zones of other kinds (the page seed zone) are ignored.
pub fn classify_systems(zones: &[Zone], ratio: f64) -> SystemLayout {
    let mut remaining: Vec<ZoneBox> = zones
        .iter()
        .filter(|z| z.is_measure_zone())
        .map(|z| ZoneBox {
            id: z.id.clone(),
            rect: z.rect,
        })
        .collect();

    let min_height = match remaining.iter().map(|z| z.rect.height()).min() {
        Some(h) => h,
        None => return SystemLayout::default(),
    };
    let threshold = min_height as f64 * ratio;

    remaining.sort_by(|a, b| {
        a.rect
            .uly
            .cmp(&b.rect.uly)
            .then(a.rect.ulx.cmp(&b.rect.ulx))
    });

    let mut systems = Vec::new();
    while let Some(anchor) = remaining.first() {
        let anchor_top = anchor.rect.uly;
        // The anchor always joins its own row, even for degenerate heights
        let (mut row, rest): (Vec<ZoneBox>, Vec<ZoneBox>) = remaining
            .into_iter()
            .partition(|z| z.rect.uly == anchor_top || ((z.rect.uly - anchor_top) as f64) < threshold);
        row.sort_by_key(|z| z.rect.ulx);
        systems.push(System { zones: row });
        remaining = rest;
    }

    SystemLayout { systems }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ZoneKind;

    fn zone(id: &str, x: i64, y: i64, w: i64, h: i64) -> Zone {
        Zone::new(id, Rect::from_xywh(x, y, w, h))
    }

    fn ids(system: &System) -> Vec<&str> {
        system.zones.iter().map(|z| z.id.as_str()).collect()
    }

    #[test]
    fn test_empty_page() {
        assert!(classify_systems(&[], 0.8).is_empty());
    }

    #[test]
    fn test_two_rows_left_to_right() {
        let zones = vec![
            zone("b2", 300, 520, 200, 100),
            zone("a2", 300, 10, 200, 100),
            zone("a1", 0, 0, 200, 100),
            zone("b1", 0, 500, 200, 120),
        ];
        let layout = classify_systems(&zones, 0.8);
        assert_eq!(layout.systems.len(), 2);
        assert_eq!(ids(&layout.systems[0]), vec!["a1", "a2"]);
        assert_eq!(ids(&layout.systems[1]), vec!["b1", "b2"]);
        assert_eq!(layout.reading_order(), vec!["a1", "a2", "b1", "b2"]);
    }

    #[test]
    fn test_threshold_uses_smallest_height() {
        // min height 50 -> threshold 40: a top offset of 45 starts a new row
        let zones = vec![
            zone("a", 0, 0, 100, 50),
            zone("b", 100, 39, 100, 200),
            zone("c", 200, 45, 100, 200),
        ];
        let layout = classify_systems(&zones, 0.8);
        assert_eq!(layout.systems.len(), 2);
        assert_eq!(ids(&layout.systems[0]), vec!["a", "b"]);
        assert_eq!(ids(&layout.systems[1]), vec!["c"]);
    }

    #[test]
    fn test_seed_zone_ignored() {
        let mut seed = zone("page", 0, 0, 1000, 1000);
        seed.kind = ZoneKind::Page;
        let zones = vec![seed, zone("a", 50, 50, 100, 100)];
        let layout = classify_systems(&zones, 0.8);
        assert_eq!(layout.reading_order(), vec!["a"]);
    }

    #[test]
    fn test_zero_height_zones_terminate() {
        let zones = vec![zone("a", 0, 10, 10, 0), zone("b", 20, 10, 10, 0), zone("c", 0, 30, 10, 0)];
        let layout = classify_systems(&zones, 0.8);
        assert_eq!(layout.systems.len(), 2);
        assert_eq!(ids(&layout.systems[0]), vec!["a", "b"]);
    }

    #[test]
    fn test_locate_and_preceding() {
        let zones = vec![
            zone("a1", 0, 0, 100, 100),
            zone("a2", 120, 0, 100, 100),
            zone("b1", 0, 300, 100, 100),
        ];
        let layout = classify_systems(&zones, 0.8);
        assert_eq!(layout.locate("a2"), Some((0, 1)));
        assert_eq!(layout.locate("b1"), Some((1, 0)));
        assert_eq!(layout.preceding("b1"), Some("a2"));
        assert_eq!(layout.preceding("a1"), None);
        assert_eq!(layout.last_zone().map(|z| z.id.as_str()), Some("b1"));
    }
}
