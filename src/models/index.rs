//! Document-order addressing and id lookups
//!
//! A `MeasurePos` addresses one entry of a section stream. Positions are
//! only valid for the snapshot they were computed on; after a structural
//! change the index is rebuilt.

use std::collections::HashMap;
use std::sync::Arc;

use super::core::{Document, Measure, SectionItem};

/// Address of a section item: movement, section and item indices
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeasurePos {
    pub movement: usize,
    pub section: usize,
    pub item: usize,
}

impl MeasurePos {
    pub fn new(movement: usize, section: usize, item: usize) -> Self {
        Self { movement, section, item }
    }
}

/// id → node lookups for one snapshot
#[derive(Clone, Debug, Default)]
pub struct DocumentIndex {
    measures: HashMap<String, MeasurePos>,
    zones: HashMap<String, (usize, usize)>,
    /// zone id → ids of the measures linking to it, in document order
    facs: HashMap<String, Vec<String>>,
}

impl DocumentIndex {
    pub fn build(doc: &Document) -> Self {
        let mut index = Self::default();
        for (pi, page) in doc.pages.iter().enumerate() {
            for (zi, zone) in page.zones.iter().enumerate() {
                index.zones.insert(zone.id.clone(), (pi, zi));
            }
        }
        for pos in doc.measure_positions() {
            if let Some(measure) = doc.measure_at(pos) {
                index.measures.insert(measure.id.clone(), pos);
                for zone_id in &measure.facs {
                    index
                        .facs
                        .entry(zone_id.clone())
                        .or_default()
                        .push(measure.id.clone());
                }
            }
        }
        index
    }

    pub fn measure(&self, id: &str) -> Option<MeasurePos> {
        self.measures.get(id).copied()
    }

    /// (page index, zone index) of a zone
    pub fn zone(&self, id: &str) -> Option<(usize, usize)> {
        self.zones.get(id).copied()
    }

    /// Measures linking to a zone, in document order
    pub fn measures_for_zone(&self, zone_id: &str) -> Vec<MeasurePos> {
        self.facs
            .get(zone_id)
            .map(|ids| ids.iter().filter_map(|id| self.measure(id)).collect())
            .unwrap_or_default()
    }

    pub fn first_measure_for_zone(&self, zone_id: &str) -> Option<MeasurePos> {
        self.measures_for_zone(zone_id).into_iter().next()
    }
}

impl Document {
    /// Positions of all measures in document order
    pub fn measure_positions(&self) -> Vec<MeasurePos> {
        let mut out = Vec::new();
        for (mi, movement) in self.movements.iter().enumerate() {
            for (si, section) in movement.sections.iter().enumerate() {
                for (ii, item) in section.items.iter().enumerate() {
                    if matches!(item, SectionItem::Measure(_)) {
                        out.push(MeasurePos::new(mi, si, ii));
                    }
                }
            }
        }
        out
    }

    /// Positions of all measures after `pos`, crossing section and movement
    /// boundaries, up to the end of the document
    pub fn following_positions(&self, pos: MeasurePos) -> Vec<MeasurePos> {
        self.measure_positions()
            .into_iter()
            .filter(|p| *p > pos)
            .collect()
    }

    pub fn item_at(&self, pos: MeasurePos) -> Option<&SectionItem> {
        self.movements
            .get(pos.movement)?
            .sections
            .get(pos.section)?
            .items
            .get(pos.item)
    }

    pub fn measure_at(&self, pos: MeasurePos) -> Option<&Measure> {
        self.item_at(pos).and_then(SectionItem::as_measure)
    }

    pub fn measure_at_mut(&mut self, pos: MeasurePos) -> Option<&mut Measure> {
        let movement = self.movements.get_mut(pos.movement).map(Arc::make_mut)?;
        movement
            .sections
            .get_mut(pos.section)?
            .items
            .get_mut(pos.item)
            .and_then(SectionItem::as_measure_mut)
    }

    /// Section items of the given section, mutably
    pub fn section_items_mut(&mut self, movement: usize, section: usize) -> Option<&mut Vec<SectionItem>> {
        let movement = self.movements.get_mut(movement).map(Arc::make_mut)?;
        movement.sections.get_mut(section).map(|s| &mut s.items)
    }

    /// Linear lookup of a measure by id
    pub fn find_measure(&self, id: &str) -> Option<MeasurePos> {
        self.measure_positions()
            .into_iter()
            .find(|p| self.measure_at(*p).map(|m| m.id == id).unwrap_or(false))
    }

    /// Last measure in document order
    pub fn last_measure_position(&self) -> Option<MeasurePos> {
        self.measure_positions().last().copied()
    }

    /// Measure preceding `pos` within the same movement
    pub fn preceding_in_movement(&self, pos: MeasurePos) -> Option<MeasurePos> {
        self.measure_positions()
            .into_iter()
            .filter(|p| p.movement == pos.movement && *p < pos)
            .last()
    }
}
