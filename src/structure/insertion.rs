//! Measure insertion
//!
//! Places the measure belonging to a zone at the position in the measure
//! stream that matches the zone's reading-order position on its page.
//!
//! Decision order:
//!
//! 1. A zone with a linked zone before it on the same page (reading order)
//!    goes right after that zone's measure. If the two zones sit in
//!    different systems a system break is put between them.
//! 2. The first zone of a page goes after the last measure of the nearest
//!    earlier page that has linked zones, behind a new page break.
//! 3. Otherwise it is the first zone of the document: it goes in front of
//!    the page break of this or the next later page already in the
//!    stream, or at the end of the target movement, behind a new page break.
//!
//! After placement the stream around the new measure is normalized: a
//! break between the new measure and a following measure of the same
//! system is dropped, and a system break is added in front of a following
//! measure that belongs to a later system of the same page.

use crate::models::{
    Document, DocumentIndex, EditContext, Measure, MeasurePos, PageBreak, Section, SectionItem,
    SystemBreak,
};

use super::numbering::{number_from_predecessor, shift_following};
use super::systems::{classify_systems, SystemLayout};

/// What an insertion did
#[derive(Clone, Debug, PartialEq)]
pub struct InsertReport {
    pub measure_id: String,
    pub position: MeasurePos,
    /// Measures whose number was shifted by the insertion
    pub shifted: Vec<String>,
}

/// Break marker to put in front of the new measure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NewBreak {
    None,
    System,
    Page,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Placement {
    /// Directly after an existing measure
    After { pos: MeasurePos, brk: NewBreak },
    /// In front of an existing page break, with a new page break
    Before { pos: MeasurePos },
    /// At the end of a movement's last section, with a new page break
    Append { movement: usize },
}

/// Resolve the movement a new measure goes to, creating one if needed
///
/// An explicit target wins; otherwise the context's current movement,
/// otherwise the last movement. The context is updated when it had to
/// fall back.
pub fn resolve_movement(doc: &mut Document, ctx: &mut EditContext, target: Option<&str>) -> usize {
    if let Some(id) = target {
        if let Some(index) = doc.movement_index(id) {
            return index;
        }
        log::warn!("target movement {} not found, falling back to current movement", id);
    }
    if let Some(index) = ctx
        .current_movement
        .as_deref()
        .and_then(|id| doc.movement_index(id))
    {
        return index;
    }
    if doc.movements.is_empty() {
        let id = doc.create_movement(None, &ctx.settings.movement_label_prefix);
        log::info!("created movement {} on demand", id);
    }
    let index = doc.movements.len() - 1;
    ctx.current_movement = Some(doc.movements[index].id.clone());
    index
}

/// Insert `measure` for `zone_id` (already on page `page_index`)
///
/// The measure's number is set from its predecessor and every following
/// measure is shifted by the measure's span. Returns `None` when the
/// page or zone cannot be found; the document is left unchanged then.
pub fn insert_measure(
    doc: &mut Document,
    ctx: &mut EditContext,
    mut measure: Measure,
    zone_id: &str,
    page_index: usize,
    target: Option<&str>,
) -> Option<InsertReport> {
    let Some(page) = doc.page(page_index) else {
        log::warn!("insert_measure: page {} does not exist", page_index);
        return None;
    };
    let layout = classify_systems(&page.zones, ctx.settings.system_threshold_ratio);
    let Some((system, _)) = layout.locate(zone_id) else {
        log::warn!("insert_measure: zone {} is not a measure zone of page {}", zone_id, page_index);
        return None;
    };
    let page_break = PageBreak::for_page(page);
    let page_id = page.id.clone();

    let movement = resolve_movement(doc, ctx, target);
    let restrict = target.and_then(|t| doc.movement_index(t));
    let index = DocumentIndex::build(doc);

    let placement = choose_placement(doc, &index, &layout, zone_id, page_index, movement, restrict);
    log::debug!("placing measure for zone {}: {:?}", zone_id, placement);

    let span = measure.span();
    let measure_id = measure.id.clone();
    measure.n = 0;
    let position = apply_placement(doc, placement, measure, page_break)?;
    normalize_around(doc, position, &layout, system, &page_id);

    let n = number_from_predecessor(doc, position);
    if let Some(m) = doc.measure_at_mut(position) {
        m.n = n;
    }
    let shifted = shift_following(doc, position, span);

    Some(InsertReport {
        measure_id,
        position,
        shifted,
    })
}

fn choose_placement(
    doc: &Document,
    index: &DocumentIndex,
    layout: &SystemLayout,
    zone_id: &str,
    page_index: usize,
    movement: usize,
    restrict: Option<usize>,
) -> Placement {
    if let Some(placement) = placement_on_page(index, layout, zone_id, restrict) {
        return placement;
    }

    // First linked zone on its page: continue after the previous page
    for pi in (0..page_index).rev() {
        let anchor = doc.pages[pi]
            .measure_zones()
            .flat_map(|z| index.measures_for_zone(&z.id))
            .filter(|pos| restrict.map_or(true, |r| pos.movement == r))
            .max();
        if let Some(pos) = anchor {
            return Placement::After {
                pos,
                brk: NewBreak::Page,
            };
        }
    }

    // First zone of the document
    match page_break_from(doc, page_index, restrict) {
        Some(pos) => Placement::Before { pos },
        None => Placement::Append { movement },
    }
}

/// Anchor on the nearest linked zone before `zone_id` on the same page
fn placement_on_page(
    index: &DocumentIndex,
    layout: &SystemLayout,
    zone_id: &str,
    restrict: Option<usize>,
) -> Option<Placement> {
    let (system, _) = layout.locate(zone_id)?;
    let order = layout.reading_order();
    let own = order.iter().position(|id| *id == zone_id)?;

    for prev_id in order[..own].iter().rev() {
        let candidates = index.measures_for_zone(prev_id);
        let pos = match restrict {
            Some(r) => candidates.iter().copied().find(|p| p.movement == r),
            None => candidates.first().copied(),
        };
        if let Some(pos) = pos {
            let prev_system = layout.locate(prev_id).map(|(s, _)| s);
            let brk = if prev_system == Some(system) {
                NewBreak::None
            } else {
                NewBreak::System
            };
            return Some(Placement::After { pos, brk });
        }
    }
    None
}

/// Page break of page `page_index` or the nearest later page
fn page_break_from(doc: &Document, page_index: usize, restrict: Option<usize>) -> Option<MeasurePos> {
    let mut best: Option<(usize, MeasurePos)> = None;
    for (mi, movement) in doc.movements.iter().enumerate() {
        if restrict.map_or(false, |r| r != mi) {
            continue;
        }
        for (si, section) in movement.sections.iter().enumerate() {
            for (ii, item) in section.items.iter().enumerate() {
                if let SectionItem::PageBreak(pb) = item {
                    let Some(pi) = doc.page_index(&pb.page_id) else {
                        continue;
                    };
                    if pi >= page_index && best.map_or(true, |(b, _)| pi < b) {
                        best = Some((pi, MeasurePos::new(mi, si, ii)));
                    }
                }
            }
        }
    }
    best.map(|(_, pos)| pos)
}

fn apply_placement(
    doc: &mut Document,
    placement: Placement,
    measure: Measure,
    page_break: PageBreak,
) -> Option<MeasurePos> {
    match placement {
        Placement::After { pos, brk } => {
            let items = doc.section_items_mut(pos.movement, pos.section)?;
            let mut k = pos.item + 1;
            match brk {
                NewBreak::None => {}
                NewBreak::System => {
                    items.insert(k, SectionItem::SystemBreak(SystemBreak::new()));
                    k += 1;
                }
                NewBreak::Page => {
                    items.insert(k, SectionItem::PageBreak(page_break));
                    k += 1;
                }
            }
            items.insert(k, SectionItem::Measure(measure));
            Some(MeasurePos::new(pos.movement, pos.section, k))
        }
        Placement::Before { pos } => {
            let items = doc.section_items_mut(pos.movement, pos.section)?;
            items.insert(pos.item, SectionItem::PageBreak(page_break));
            items.insert(pos.item + 1, SectionItem::Measure(measure));
            Some(MeasurePos::new(pos.movement, pos.section, pos.item + 1))
        }
        Placement::Append { movement } => {
            let target = doc.movement_mut(movement)?;
            if target.sections.is_empty() {
                target.sections.push(Section::new());
            }
            let section = target.sections.len() - 1;
            let items = &mut target.sections[section].items;
            items.push(SectionItem::PageBreak(page_break));
            items.push(SectionItem::Measure(measure));
            Some(MeasurePos::new(movement, section, items.len() - 1))
        }
    }
}

/// Fix the markers between the new measure and what follows it
fn normalize_around(doc: &mut Document, pos: MeasurePos, layout: &SystemLayout, system: usize, page_id: &str) {
    let Some(items) = doc.section_items_mut(pos.movement, pos.section) else {
        return;
    };
    let next = pos.item + 1;
    match (items.get(next), items.get(next + 1)) {
        (Some(brk), Some(SectionItem::Measure(following)))
            if brk.is_break() && layout.system_of(following) == Some(system) =>
        {
            log::debug!("dropping break before {}: same system as new measure", following.id);
            items.remove(next);
        }
        (Some(SectionItem::PageBreak(pb)), Some(SectionItem::Measure(following)))
            if pb.page_id == page_id && layout.system_of(following).is_some() =>
        {
            log::debug!("page break before {} now inside its page, turning it into a system break", following.id);
            items[next] = SectionItem::SystemBreak(SystemBreak::new());
        }
        (Some(SectionItem::Measure(following)), _)
            if layout.system_of(following).map_or(false, |s| s != system) =>
        {
            log::debug!("adding system break before {}", following.id);
            items.insert(next, SectionItem::SystemBreak(SystemBreak::new()));
        }
        _ => {}
    }
}
