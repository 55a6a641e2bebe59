//! Page/system break bookkeeping
//!
//! Removing a measure can leave two break markers next to each other, or
//! a marker with nothing after it. `collapse_breaks` repairs the junction
//! where the measure used to be:
//!
//! - `pb, sb` → `pb` (a new page already starts a new system)
//! - `sb, sb` → `sb`
//! - `sb, pb` → `pb`
//! - `pb, pb` → the later `pb` (the earlier page has no measures left)
//! - a break at the end of the section → removed
//! - an `sb` at the start of the section → removed

use crate::models::{Document, Measure, MeasurePos, SectionItem};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Slot {
    Measure,
    Page,
    System,
}

fn slot(item: &SectionItem) -> Slot {
    match item {
        SectionItem::Measure(_) => Slot::Measure,
        SectionItem::PageBreak(_) => Slot::Page,
        SectionItem::SystemBreak(_) => Slot::System,
    }
}

/// Collapse break markers around `junction`, the index where an item was
/// removed. Returns the number of markers dropped.
pub fn collapse_breaks(items: &mut Vec<SectionItem>, junction: usize) -> usize {
    let mut removed = 0;
    let mut at = junction.min(items.len());
    loop {
        let prev = at.checked_sub(1).and_then(|i| items.get(i)).map(slot);
        let next = items.get(at).map(slot);
        match (prev, next) {
            (Some(Slot::Page), Some(Slot::System)) | (Some(Slot::System), Some(Slot::System)) => {
                items.remove(at);
            }
            (Some(Slot::System), Some(Slot::Page)) | (Some(Slot::Page), Some(Slot::Page)) => {
                items.remove(at - 1);
                at -= 1;
            }
            (Some(Slot::Page), None) | (Some(Slot::System), None) => {
                items.remove(at - 1);
                at -= 1;
            }
            (None, Some(Slot::System)) => {
                items.remove(at);
            }
            _ => break,
        }
        removed += 1;
    }
    removed
}

/// Remove the measure at `pos` and collapse the breaks around it
///
/// Numbering is left to the caller.
pub fn remove_measure_at(doc: &mut Document, pos: MeasurePos) -> Option<Measure> {
    let items = doc.section_items_mut(pos.movement, pos.section)?;
    if !matches!(items.get(pos.item), Some(SectionItem::Measure(_))) {
        return None;
    }
    let removed = match items.remove(pos.item) {
        SectionItem::Measure(m) => m,
        _ => return None,
    };
    let dropped = collapse_breaks(items, pos.item);
    if dropped > 0 {
        log::debug!("dropped {} dangling break(s) after removing {}", dropped, removed.id);
    }
    Some(removed)
}
