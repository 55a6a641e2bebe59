//! Moving content between movements
//!
//! The run that moves starts at a measure (plus the page or system break
//! right before it) and extends to the end of its movement.

use crate::models::{Document, EditContext, Measure, MeasurePos, SectionItem};

use super::breaks::{collapse_breaks, remove_measure_at};
use super::insertion::insert_measure;
use super::numbering::shift_following;

/// Result of a move
#[derive(Clone, Debug, PartialEq, Default)]
pub struct MoveReport {
    pub target: String,
    /// Moved measures in their new order
    pub moved: Vec<String>,
}

/// Move `first_measure_id` and everything after it in its movement into
/// `target_id`
///
/// An empty target receives the run as is and is numbered from 1. A target
/// that already has measures gets every moved measure re-inserted at the
/// position its first zone dictates.
pub fn move_content_to_movement(
    doc: &mut Document,
    ctx: &mut EditContext,
    first_measure_id: &str,
    target_id: &str,
) -> Option<MoveReport> {
    let Some(start) = doc.find_measure(first_measure_id) else {
        log::warn!("move: measure {} not found", first_measure_id);
        return None;
    };
    let Some(target) = doc.movement_index(target_id) else {
        log::warn!("move: movement {} not found", target_id);
        return None;
    };
    if start.movement == target {
        log::debug!("move: {} already belongs to {}", first_measure_id, target_id);
        return None;
    }

    let report = if doc.movements[target].has_measures() {
        reinsert_run(doc, ctx, start, target_id)
    } else {
        append_run(doc, start, target)
    };
    ctx.current_movement = Some(target_id.to_string());
    ctx.current_measure = Some(first_measure_id.to_string());
    log::info!("moved {} measure(s) into {}", report.moved.len(), target_id);
    Some(report)
}

/// Cut the run out of its movement, leading break included
fn take_run(doc: &mut Document, start: MeasurePos) -> Vec<SectionItem> {
    let Some(movement) = doc.movement_mut(start.movement) else {
        return Vec::new();
    };
    let Some(section) = movement.sections.get_mut(start.section) else {
        return Vec::new();
    };
    let from = match start.item.checked_sub(1).and_then(|i| section.items.get(i)) {
        Some(item) if item.is_break() => start.item - 1,
        _ => start.item,
    };
    let mut run = section.items.split_off(from);
    let len = section.items.len();
    collapse_breaks(&mut section.items, len);

    for later in movement.sections.drain(start.section + 1..) {
        run.extend(later.items);
    }
    run
}

fn append_run(doc: &mut Document, start: MeasurePos, target: usize) -> MoveReport {
    let mut run = take_run(doc, start);

    let mut next = 1;
    let mut moved = Vec::new();
    for measure in run.iter_mut().filter_map(SectionItem::as_measure_mut) {
        moved.push(measure.id.clone());
        if measure.label.is_some() {
            continue;
        }
        measure.n = next;
        next += measure.span();
    }

    let target_id = doc.movements[target].id.clone();
    if let Some(movement) = doc.movement_mut(target) {
        match movement.sections.last_mut() {
            Some(section) => section.items.extend(run),
            None => {
                let mut section = crate::models::Section::new();
                section.items = run;
                movement.sections.push(section);
            }
        }
    }
    MoveReport {
        target: target_id,
        moved,
    }
}

fn reinsert_run(doc: &mut Document, ctx: &mut EditContext, start: MeasurePos, target_id: &str) -> MoveReport {
    let run: Vec<String> = take_measure_ids(doc, start);
    let mut moved = Vec::new();

    for measure_id in run {
        let Some(measure) = detach(doc, &measure_id) else {
            continue;
        };
        let anchor = measure
            .facs
            .first()
            .and_then(|zone| doc.zone_location(zone).map(|(pi, _)| (zone.clone(), pi)));
        let placed = match anchor {
            Some((zone, page_index)) => {
                insert_measure(doc, ctx, measure, &zone, page_index, Some(target_id)).map(|r| r.measure_id)
            }
            None => append_unanchored(doc, measure, target_id),
        };
        if let Some(id) = placed {
            moved.push(id);
        }
    }
    MoveReport {
        target: target_id.to_string(),
        moved,
    }
}

/// Ids of the measures from `start` to the end of its movement
fn take_measure_ids(doc: &Document, start: MeasurePos) -> Vec<String> {
    doc.measure_positions()
        .into_iter()
        .filter(|p| p.movement == start.movement && *p >= start)
        .filter_map(|p| doc.measure_at(p).map(|m| m.id.clone()))
        .collect()
}

/// Remove a measure, pulling the numbers behind it down by its span
fn detach(doc: &mut Document, measure_id: &str) -> Option<Measure> {
    let pos = doc.find_measure(measure_id)?;
    let span = doc.measure_at(pos)?.span();
    shift_following(doc, pos, -span);
    remove_measure_at(doc, pos)
}

/// A measure without zones goes to the end of the target movement
fn append_unanchored(doc: &mut Document, mut measure: Measure, target_id: &str) -> Option<String> {
    let target = doc.movement_index(target_id)?;
    measure.n = doc.movements[target]
        .measures()
        .last()
        .map(|m| m.n + m.span())
        .unwrap_or(1);
    let id = measure.id.clone();
    let span = measure.span();
    let movement = doc.movement_mut(target)?;
    if movement.sections.is_empty() {
        movement.sections.push(crate::models::Section::new());
    }
    let section = movement.sections.len() - 1;
    let items = &mut movement.sections[section].items;
    items.push(SectionItem::Measure(measure));
    let pos = MeasurePos::new(target, section, items.len() - 1);
    shift_following(doc, pos, span);
    Some(id)
}

/// Create a movement after the current one and move the current measure's
/// run into it; returns the new movement's id
pub fn create_movement_with_content(doc: &mut Document, ctx: &mut EditContext) -> String {
    let after = ctx.current_movement.clone();
    let id = doc.create_movement(after.as_deref(), &ctx.settings.movement_label_prefix);
    log::info!("created movement {}", id);
    match ctx.current_measure.clone() {
        Some(measure_id) => {
            move_content_to_movement(doc, ctx, &measure_id, &id);
        }
        None => log::debug!("no current measure, new movement stays empty"),
    }
    ctx.current_movement = Some(id.clone());
    id
}

/// Make `movement_id` current, moving the current measure's run into it
pub fn select_movement(doc: &mut Document, ctx: &mut EditContext, movement_id: &str) -> bool {
    if doc.movement_index(movement_id).is_none() {
        log::warn!("select_movement: movement {} not found", movement_id);
        return false;
    }
    if let Some(measure_id) = ctx.current_measure.clone() {
        move_content_to_movement(doc, ctx, &measure_id, movement_id);
    }
    ctx.current_movement = Some(movement_id.to_string());
    true
}
