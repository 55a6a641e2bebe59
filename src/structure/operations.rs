//! Snapshot-in, snapshot-out edit operations
//!
//! Every function here takes the current `(&Document, &EditContext)` pair
//! and returns an [`EditOutcome`] holding the next pair. The inputs are
//! never modified: the document is cloned (cheap, pages and movements are
//! shared) and only the touched subtrees are copied by the helpers in the
//! sibling modules.
//!
//! Stale ids are no-ops: the unchanged snapshot comes back and a warning
//! is logged.

use crate::converters::annotation::{annotation_to_zone, detector_rect_to_zone, Annotation, AnnotationError, DetectorRect};
use crate::models::{ContentPolicy, Document, DocumentIndex, EditContext, EditMode, EditOutcome, Page, Rect};

use super::movements::{create_movement_with_content, select_movement};
use super::multi_rest::set_multi_rest;
use super::zones::{delete_zone, place_detected_zones, place_zone, toggle_additional_zone, update_zone};

/// Run `edit` on copies of the inputs; `false` means nothing happened
fn apply<F>(doc: &Document, ctx: &EditContext, edit: F) -> EditOutcome
where
    F: FnOnce(&mut Document, &mut EditContext) -> bool,
{
    let mut document = doc.clone();
    let mut context = ctx.clone();
    if !edit(&mut document, &mut context) {
        return EditOutcome::unchanged(doc, ctx);
    }
    context.validate(&document);
    EditOutcome::new(document, context)
}

// ============================================================================
// Zones
// ============================================================================

/// Create a zone on the current page from a drawn annotation
pub fn create_zone(doc: &Document, ctx: &EditContext, annotation: &Annotation) -> Result<EditOutcome, AnnotationError> {
    let zone = annotation_to_zone(annotation)?;
    let page = ctx.current_page;
    Ok(apply(doc, ctx, |doc, ctx| place_zone(doc, ctx, page, zone).is_some()))
}

/// Create zones on the current page from detector output, in the given order
pub fn create_detected_zones(doc: &Document, ctx: &EditContext, rects: &[DetectorRect]) -> EditOutcome {
    let zones = rects.iter().map(detector_rect_to_zone).collect();
    let page = ctx.current_page;
    apply(doc, ctx, |doc, ctx| !place_detected_zones(doc, ctx, page, zones).is_empty())
}

/// Replace the rectangle of the zone named by the annotation
pub fn update_zone_from_annotation(
    doc: &Document,
    ctx: &EditContext,
    annotation: &Annotation,
) -> Result<EditOutcome, AnnotationError> {
    let zone = annotation_to_zone(annotation)?;
    Ok(update_zone_rect(doc, ctx, &zone.id, zone.rect))
}

pub fn update_zone_rect(doc: &Document, ctx: &EditContext, zone_id: &str, rect: Rect) -> EditOutcome {
    apply(doc, ctx, |doc, _| update_zone(doc, zone_id, rect))
}

/// Delete a zone and, where it was the last one, its measure
pub fn remove_zone(doc: &Document, ctx: &EditContext, zone_id: &str) -> EditOutcome {
    apply(doc, ctx, |doc, ctx| delete_zone(doc, ctx, zone_id).is_some())
}

/// Split a zone off its shared measure, or merge it into its predecessor's
pub fn toggle_zone(doc: &Document, ctx: &EditContext, zone_id: &str) -> EditOutcome {
    apply(doc, ctx, |doc, ctx| toggle_additional_zone(doc, ctx, zone_id).is_some())
}

// ============================================================================
// Measures
// ============================================================================

/// Set (`Some(n)`, n > 0) or clear the multi-rest of the current measure
pub fn set_current_multi_rest(doc: &Document, ctx: &EditContext, value: Option<u32>) -> EditOutcome {
    let Some(measure_id) = ctx.current_measure.clone() else {
        log::warn!("set_multi_rest: no current measure");
        return EditOutcome::unchanged(doc, ctx);
    };
    apply(doc, ctx, |doc, _| set_multi_rest(doc, &measure_id, value).is_some())
}

/// Set or clear the display label of the current measure
pub fn set_measure_label(doc: &Document, ctx: &EditContext, label: Option<&str>) -> EditOutcome {
    let Some(measure_id) = ctx.current_measure.clone() else {
        log::warn!("set_measure_label: no current measure");
        return EditOutcome::unchanged(doc, ctx);
    };
    let label = label.map(str::trim).filter(|l| !l.is_empty()).map(str::to_string);
    apply(doc, ctx, |doc, _| {
        let Some(pos) = doc.find_measure(&measure_id) else {
            log::warn!("set_measure_label: measure {} not found", measure_id);
            return false;
        };
        match doc.measure_at_mut(pos) {
            Some(measure) => {
                measure.label = label;
                true
            }
            None => false,
        }
    })
}

// ============================================================================
// Labels and dimensions
// ============================================================================

pub fn set_movement_label(doc: &Document, ctx: &EditContext, movement_id: &str, label: &str) -> EditOutcome {
    apply(doc, ctx, |doc, _| {
        let Some(index) = doc.movement_index(movement_id) else {
            log::warn!("set_movement_label: movement {} not found", movement_id);
            return false;
        };
        match doc.movement_mut(index) {
            Some(movement) => {
                movement.label = label.to_string();
                true
            }
            None => false,
        }
    })
}

pub fn set_page_label(doc: &Document, ctx: &EditContext, page_index: usize, label: &str) -> EditOutcome {
    apply(doc, ctx, |doc, _| match doc.page_mut(page_index) {
        Some(page) => {
            page.label = label.to_string();
            true
        }
        None => {
            log::warn!("set_page_label: no page {}", page_index);
            false
        }
    })
}

/// Set a page's image size; the seed zone is stretched to match
pub fn set_page_dimensions(doc: &Document, ctx: &EditContext, page_index: usize, width: u32, height: u32) -> EditOutcome {
    apply(doc, ctx, |doc, _| match doc.page_mut(page_index) {
        Some(page) => {
            page.set_dimensions(width, height);
            true
        }
        None => {
            log::warn!("set_page_dimensions: no page {}", page_index);
            false
        }
    })
}

/// Append an externally loaded page image with a seed zone
pub fn add_imported_page(doc: &Document, ctx: &EditContext, url: &str, width: u32, height: u32) -> EditOutcome {
    apply(doc, ctx, |doc, _| {
        let n = doc.pages.len() + 1;
        doc.push_page(Page::new(n, n.to_string(), url, Some((width, height))));
        log::info!("added page {} from {}", n, url);
        true
    })
}

// ============================================================================
// Movements
// ============================================================================

/// New movement after the current one, taking the current measure's run
pub fn create_movement(doc: &Document, ctx: &EditContext) -> EditOutcome {
    apply(doc, ctx, |doc, ctx| {
        create_movement_with_content(doc, ctx);
        true
    })
}

/// Make a movement current, taking the current measure's run into it
pub fn choose_movement(doc: &Document, ctx: &EditContext, movement_id: &str) -> EditOutcome {
    apply(doc, ctx, |doc, ctx| select_movement(doc, ctx, movement_id))
}

// ============================================================================
// Context only
// ============================================================================

/// Show another page; out-of-range indices are ignored
pub fn set_current_page(doc: &Document, ctx: &EditContext, page_index: usize) -> EditOutcome {
    if page_index >= doc.pages.len() {
        log::warn!("set_current_page: {} out of range ({} pages)", page_index, doc.pages.len());
        return EditOutcome::unchanged(doc, ctx);
    }
    let mut context = ctx.clone();
    context.current_page = page_index;
    context.selected_zone = None;
    EditOutcome::new(doc.clone(), context)
}

pub fn set_current_movement(doc: &Document, ctx: &EditContext, movement_id: &str) -> EditOutcome {
    if doc.movement_index(movement_id).is_none() {
        log::warn!("set_current_movement: movement {} not found", movement_id);
        return EditOutcome::unchanged(doc, ctx);
    }
    let mut context = ctx.clone();
    context.current_movement = Some(movement_id.to_string());
    EditOutcome::new(doc.clone(), context)
}

/// Make a measure current; its movement becomes current as well
pub fn set_current_measure(doc: &Document, ctx: &EditContext, measure_id: &str) -> EditOutcome {
    let Some(pos) = doc.find_measure(measure_id) else {
        log::warn!("set_current_measure: measure {} not found", measure_id);
        return EditOutcome::unchanged(doc, ctx);
    };
    let mut context = ctx.clone();
    context.current_measure = Some(measure_id.to_string());
    context.current_movement = Some(doc.movements[pos.movement].id.clone());
    EditOutcome::new(doc.clone(), context)
}

/// Select a zone and make the first measure depicted by it current
pub fn set_current_measure_by_zone(doc: &Document, ctx: &EditContext, zone_id: &str) -> EditOutcome {
    let index = DocumentIndex::build(doc);
    let Some((page_index, _)) = index.zone(zone_id) else {
        log::warn!("set_current_measure_by_zone: zone {} not found", zone_id);
        return EditOutcome::unchanged(doc, ctx);
    };
    let mut context = ctx.clone();
    context.current_page = page_index;
    context.selected_zone = Some(zone_id.to_string());
    match index.first_measure_for_zone(zone_id) {
        Some(pos) => {
            context.current_measure = doc.measure_at(pos).map(|m| m.id.clone());
            context.current_movement = Some(doc.movements[pos.movement].id.clone());
        }
        None => log::debug!("zone {} is not linked to a measure", zone_id),
    }
    EditOutcome::new(doc.clone(), context)
}

pub fn set_mode(doc: &Document, ctx: &EditContext, mode: EditMode) -> EditOutcome {
    let context = ctx.clone().with_mode(mode);
    EditOutcome::new(doc.clone(), context)
}

pub fn set_policy(doc: &Document, ctx: &EditContext, policy: ContentPolicy) -> EditOutcome {
    let context = ctx.clone().with_policy(policy);
    EditOutcome::new(doc.clone(), context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::annotation::{format_xywh, AnnotationTarget, FragmentSelector, ANNOTATION_CONTEXT, MEDIA_FRAGMENTS};
    use std::sync::Arc;

    fn drawn(id: &str, rect: Rect) -> Annotation {
        Annotation {
            kind: "Annotation".to_string(),
            body: Vec::new(),
            target: AnnotationTarget {
                source: "img".to_string(),
                selector: FragmentSelector {
                    kind: "FragmentSelector".to_string(),
                    conforms_to: MEDIA_FRAGMENTS.to_string(),
                    value: format_xywh(&rect),
                },
            },
            context: ANNOTATION_CONTEXT.to_string(),
            id: id.to_string(),
        }
    }

    fn start() -> (Document, EditContext) {
        let mut doc = Document::new();
        doc.push_page(Page::new(1, "1r", "img", Some((1000, 1000))));
        (doc, EditContext::on_page(0))
    }

    #[test]
    fn test_create_zone_leaves_input_snapshot_alone() {
        let (doc, ctx) = start();
        let out = create_zone(&doc, &ctx, &drawn("z1", Rect::new(0, 0, 100, 100))).unwrap();

        assert_eq!(doc.measure_count(), 0);
        assert_eq!(doc.pages[0].zones.len(), 1);
        assert_eq!(out.document.measure_count(), 1);
        assert_eq!(out.context.selected_zone.as_deref(), Some("z1"));
        assert!(out.context.current_measure.is_some());
        assert!(out.context.current_movement.is_some());
    }

    #[test]
    fn test_selection_mode_returns_same_snapshot() {
        let (doc, ctx) = start();
        let ctx = ctx.with_mode(EditMode::Selection);
        let out = create_zone(&doc, &ctx, &drawn("z1", Rect::new(0, 0, 100, 100))).unwrap();
        assert!(Arc::ptr_eq(&doc.pages[0], &out.document.pages[0]));
        assert_eq!(out.context, ctx);
    }

    #[test]
    fn test_labels_and_multi_rest_on_current_measure() {
        let (doc, ctx) = start();
        let out = create_zone(&doc, &ctx, &drawn("z1", Rect::new(0, 0, 100, 100))).unwrap();
        let out = create_zone(&out.document, &out.context, &drawn("z2", Rect::new(150, 0, 250, 100))).unwrap();
        let out = set_current_measure_by_zone(&out.document, &out.context, "z1");

        let out = set_current_multi_rest(&out.document, &out.context, Some(4));
        let numbers: Vec<i64> = out.document.measures().map(|m| m.n).collect();
        assert_eq!(numbers, vec![1, 5]);

        let out = set_measure_label(&out.document, &out.context, Some(" 1-4 "));
        assert_eq!(out.document.measures().next().unwrap().label.as_deref(), Some("1-4"));
        let out = set_measure_label(&out.document, &out.context, Some(""));
        assert_eq!(out.document.measures().next().unwrap().label, None);
    }

    #[test]
    fn test_set_current_page_bounds() {
        let (doc, ctx) = start();
        let out = add_imported_page(&doc, &ctx, "img2", 10, 20);
        assert_eq!(out.document.pages[1].label, "2");
        assert_eq!(out.document.pages[1].zones[0].rect, Rect::new(0, 0, 10, 20));

        let moved = set_current_page(&out.document, &out.context, 1);
        assert_eq!(moved.context.current_page, 1);
        let ignored = set_current_page(&moved.document, &moved.context, 7);
        assert_eq!(ignored.context.current_page, 1);
    }

    #[test]
    fn test_page_dimensions_and_labels() {
        let (doc, ctx) = start();
        let out = set_page_dimensions(&doc, &ctx, 0, 640, 480);
        assert_eq!(out.document.pages[0].zones[0].rect, Rect::new(0, 0, 640, 480));
        let out = set_page_label(&out.document, &out.context, 0, "f. 1r");
        assert_eq!(out.document.pages[0].label, "f. 1r");
        let stale = set_page_label(&out.document, &out.context, 4, "x");
        assert!(Arc::ptr_eq(&stale.document.pages[0], &out.document.pages[0]));
    }

    #[test]
    fn test_remove_unknown_zone_is_noop() {
        let (doc, ctx) = start();
        let out = remove_zone(&doc, &ctx, "nope");
        assert_eq!(out.document, doc);
        assert_eq!(out.context, ctx);
    }
}
