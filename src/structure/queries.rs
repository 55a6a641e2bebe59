//! Read-only views of a snapshot for the editor UI

use serde::{Deserialize, Serialize};

use crate::models::{Document, EditContext, Measure};

/// One page as listed in the page navigator
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PageSummary {
    pub id: String,
    pub n: usize,
    pub label: String,
    pub uri: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// True once any measure zone was drawn on the page
    pub has_zones: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MovementSummary {
    pub id: String,
    pub label: String,
    pub index: usize,
    pub measure_count: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MeasureSummary {
    pub id: String,
    pub n: i64,
    pub label: Option<String>,
    pub multi_rest: Option<u32>,
    pub zones: Vec<String>,
    /// Position within its movement
    pub index: usize,
}

impl MeasureSummary {
    fn of(measure: &Measure, index: usize) -> Self {
        Self {
            id: measure.id.clone(),
            n: measure.n,
            label: measure.label.clone(),
            multi_rest: measure.multi_rest(),
            zones: measure.facs.clone(),
            index,
        }
    }
}

/// Measures of one movement with their summaries
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MovementMeasures {
    pub movement: MovementSummary,
    pub measures: Vec<MeasureSummary>,
}

pub fn page_summaries(doc: &Document) -> Vec<PageSummary> {
    doc.pages
        .iter()
        .map(|page| PageSummary {
            id: page.id.clone(),
            n: page.n,
            label: page.label.clone(),
            uri: page.graphic.target.clone(),
            width: page.width,
            height: page.height,
            has_zones: page.has_measure_zones(),
        })
        .collect()
}

pub fn movement_summaries(doc: &Document) -> Vec<MovementSummary> {
    doc.movements
        .iter()
        .enumerate()
        .map(|(index, movement)| MovementSummary {
            id: movement.id.clone(),
            label: movement.label.clone(),
            index,
            measure_count: movement.measures().count(),
        })
        .collect()
}

pub fn measure_summaries(doc: &Document) -> Vec<MovementMeasures> {
    movement_summaries(doc)
        .into_iter()
        .zip(doc.movements.iter())
        .map(|(movement, mdiv)| MovementMeasures {
            movement,
            measures: mdiv
                .measures()
                .enumerate()
                .map(|(i, m)| MeasureSummary::of(m, i))
                .collect(),
        })
        .collect()
}

pub fn current_measure(doc: &Document, ctx: &EditContext) -> Option<MeasureSummary> {
    let id = ctx.current_measure.as_deref()?;
    let pos = doc.find_measure(id)?;
    let index = doc.movements[pos.movement]
        .measures()
        .position(|m| m.id == id)?;
    doc.measure_at(pos).map(|m| MeasureSummary::of(m, index))
}

/// First measure in document order that no zone depicts yet
pub fn first_measure_without_zone(doc: &Document) -> Option<MeasureSummary> {
    doc.movements.iter().find_map(|movement| {
        movement
            .measures()
            .enumerate()
            .find(|(_, m)| !m.has_facs())
            .map(|(i, m)| MeasureSummary::of(m, i))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Movement, Page, Rect, SectionItem, Staff, Zone};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn sample() -> Document {
        let mut doc = Document::new();
        let mut page = Page::new(1, "1r", "img1", Some((100, 200)));
        page.zones.push(Zone::new("z1", Rect::new(0, 0, 10, 10)));
        doc.push_page(page);
        doc.push_page(Page::new(2, "1v", "img2", None));

        let mut movement = Movement::new("Allegro");
        let mut first = Measure::for_zone("z1");
        first.staves.push(Staff::with_multi_rest(2));
        let mut second = Measure::new(3);
        second.label = Some("3a".to_string());
        movement.sections[0].items.push(SectionItem::Measure(first));
        movement.sections[0].items.push(SectionItem::Measure(second));
        doc.movements.push(Arc::new(movement));
        doc
    }

    #[test]
    fn test_page_summaries() {
        let pages = page_summaries(&sample());
        assert_eq!(pages.len(), 2);
        assert!(pages[0].has_zones);
        assert!(!pages[1].has_zones);
        assert_eq!(pages[1].n, 2);
        assert_eq!(pages[1].width, None);
        assert_eq!(pages[0].uri, "img1");
    }

    #[test]
    fn test_measure_summaries_per_movement() {
        let doc = sample();
        let all = measure_summaries(&doc);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].movement.label, "Allegro");
        assert_eq!(all[0].movement.measure_count, 2);
        assert_eq!(all[0].measures[0].multi_rest, Some(2));
        assert_eq!(all[0].measures[0].zones, vec!["z1".to_string()]);
        assert_eq!(all[0].measures[1].label.as_deref(), Some("3a"));
        assert_eq!(all[0].measures[1].index, 1);
    }

    #[test]
    fn test_current_and_first_unlinked() {
        let doc = sample();
        let second_id = doc.movements[0].measures().nth(1).unwrap().id.clone();

        let unlinked = first_measure_without_zone(&doc).unwrap();
        assert_eq!(unlinked.id, second_id);

        let mut ctx = EditContext::new();
        assert_eq!(current_measure(&doc, &ctx), None);
        ctx.current_measure = Some(second_id.clone());
        assert_eq!(current_measure(&doc, &ctx).map(|m| m.n), Some(3));
    }
}
