//! Zone lifecycle: create, update, delete and the split/merge toggle
//!
//! How a new zone is linked depends on the edit mode and the content policy:
//!
//! | policy          | manual rectangle                  | additional zone                      |
//! |-----------------|-----------------------------------|--------------------------------------|
//! | free            | new measure via the insertion engine | added to the selected zone's measure, else to the last measure |
//! | existing music  | linked to the first measure without zones | added to the last measure with zones |
//!
//! Detector batches ignore the mode and behave like manual rectangles.

use crate::models::{ContentPolicy, Document, DocumentIndex, EditContext, EditMode, Measure, MeasurePos, Rect, Zone};

use super::breaks::remove_measure_at;
use super::insertion::insert_measure;
use super::numbering::shift_following;
use super::systems::classify_systems;

/// Result of creating one zone
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneReport {
    pub zone_id: String,
    /// Measure the zone got linked to, if any
    pub measure_id: Option<String>,
    /// Measures renumbered because a new measure was inserted
    pub shifted: Vec<String>,
}

/// Result of deleting one zone
#[derive(Clone, Debug, PartialEq, Default)]
pub struct DeleteReport {
    /// Measures that lost their last zone and were removed
    pub removed_measures: Vec<String>,
    /// Measures that only lost the reference
    pub unlinked_measures: Vec<String>,
    pub shifted: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleAction {
    /// The zone left a shared measure and now has its own
    Split,
    /// The zone joined the measure of its predecessor
    Merge,
}

/// Result of toggling a zone
#[derive(Clone, Debug, PartialEq)]
pub struct ToggleReport {
    pub action: ToggleAction,
    /// Measures whose facs or numbering changed
    pub affected: Vec<String>,
}

/// Put `zone` on page `page_index` and link it according to the context
///
/// Returns `None` (document untouched) in selection mode or when the page
/// does not exist.
pub fn place_zone(doc: &mut Document, ctx: &mut EditContext, page_index: usize, zone: Zone) -> Option<ZoneReport> {
    if ctx.mode == EditMode::Selection {
        log::debug!("selection mode: ignoring new zone {}", zone.id);
        return None;
    }
    let zone_id = zone.id.clone();
    doc.page_mut(page_index)?.zones.push(zone);

    let report = match (ctx.policy, ctx.mode) {
        (ContentPolicy::Free, EditMode::AdditionalZone) => attach_to_selected_or_last(doc, ctx, &zone_id),
        (ContentPolicy::Free, _) => insert_new_measure(doc, ctx, &zone_id, page_index),
        (ContentPolicy::ExistingMusic, EditMode::AdditionalZone) => attach_to_last_linked(doc, ctx, &zone_id),
        (ContentPolicy::ExistingMusic, _) => link_first_unlinked(doc, ctx, &zone_id),
    };
    ctx.selected_zone = Some(zone_id);
    Some(report)
}

/// Put a batch of detector rectangles on a page, in the given order
pub fn place_detected_zones(
    doc: &mut Document,
    ctx: &mut EditContext,
    page_index: usize,
    zones: Vec<Zone>,
) -> Vec<ZoneReport> {
    if doc.page(page_index).is_none() {
        log::warn!("detector zones for missing page {}", page_index);
        return Vec::new();
    }
    let mut reports = Vec::with_capacity(zones.len());
    for zone in zones {
        let zone_id = zone.id.clone();
        if let Some(page) = doc.page_mut(page_index) {
            page.zones.push(zone);
        }
        let report = match ctx.policy {
            ContentPolicy::Free => insert_new_measure(doc, ctx, &zone_id, page_index),
            ContentPolicy::ExistingMusic => link_first_unlinked(doc, ctx, &zone_id),
        };
        reports.push(report);
    }
    log::info!("placed {} detected zones on page {}", reports.len(), page_index + 1);
    reports
}

fn unlinked(zone_id: &str) -> ZoneReport {
    ZoneReport {
        zone_id: zone_id.to_string(),
        measure_id: None,
        shifted: Vec::new(),
    }
}

fn linked(zone_id: &str, measure_id: &str) -> ZoneReport {
    ZoneReport {
        zone_id: zone_id.to_string(),
        measure_id: Some(measure_id.to_string()),
        shifted: Vec::new(),
    }
}

fn insert_new_measure(doc: &mut Document, ctx: &mut EditContext, zone_id: &str, page_index: usize) -> ZoneReport {
    match insert_measure(doc, ctx, Measure::for_zone(zone_id), zone_id, page_index, None) {
        Some(report) => {
            ctx.current_measure = Some(report.measure_id.clone());
            ZoneReport {
                zone_id: zone_id.to_string(),
                measure_id: Some(report.measure_id),
                shifted: report.shifted,
            }
        }
        None => unlinked(zone_id),
    }
}

fn attach_at(doc: &mut Document, pos: MeasurePos, zone_id: &str) -> Option<String> {
    let measure = doc.measure_at_mut(pos)?;
    if !measure.has_zone(zone_id) {
        measure.facs.push(zone_id.to_string());
    }
    Some(measure.id.clone())
}

fn attach_to_selected_or_last(doc: &mut Document, ctx: &mut EditContext, zone_id: &str) -> ZoneReport {
    let index = DocumentIndex::build(doc);
    let target = ctx
        .selected_zone
        .as_deref()
        .and_then(|z| index.first_measure_for_zone(z))
        .or_else(|| doc.last_measure_position());
    let Some(pos) = target else {
        log::warn!("no measure to add zone {} to", zone_id);
        return unlinked(zone_id);
    };
    match attach_at(doc, pos, zone_id) {
        Some(measure_id) => {
            ctx.current_measure = Some(measure_id.clone());
            linked(zone_id, &measure_id)
        }
        None => unlinked(zone_id),
    }
}

fn link_first_unlinked(doc: &mut Document, ctx: &mut EditContext, zone_id: &str) -> ZoneReport {
    let target = doc
        .measure_positions()
        .into_iter()
        .find(|p| doc.measure_at(*p).map_or(false, |m| !m.has_facs()));
    link_existing(doc, ctx, zone_id, target)
}

fn attach_to_last_linked(doc: &mut Document, ctx: &mut EditContext, zone_id: &str) -> ZoneReport {
    let target = doc
        .measure_positions()
        .into_iter()
        .rev()
        .find(|p| doc.measure_at(*p).map_or(false, Measure::has_facs));
    link_existing(doc, ctx, zone_id, target)
}

fn link_existing(doc: &mut Document, ctx: &mut EditContext, zone_id: &str, target: Option<MeasurePos>) -> ZoneReport {
    let Some(pos) = target else {
        log::warn!("no existing measure left for zone {}", zone_id);
        return unlinked(zone_id);
    };
    let Some(measure_id) = attach_at(doc, pos, zone_id) else {
        return unlinked(zone_id);
    };
    ctx.current_movement = Some(doc.movements[pos.movement].id.clone());
    ctx.current_measure = Some(measure_id.clone());
    linked(zone_id, &measure_id)
}

/// Replace a zone's rectangle; measure links are untouched
pub fn update_zone(doc: &mut Document, zone_id: &str, rect: Rect) -> bool {
    let Some((pi, zi)) = doc.zone_location(zone_id) else {
        log::warn!("update_zone: zone {} not found", zone_id);
        return false;
    };
    match doc.page_mut(pi) {
        Some(page) => {
            page.zones[zi].rect = rect;
            true
        }
        None => false,
    }
}

/// Remove a zone and the measures that depended on it alone
///
/// A measure that loses its only zone is removed, following measures move
/// down by its span and dangling breaks are collapsed.
pub fn delete_zone(doc: &mut Document, ctx: &mut EditContext, zone_id: &str) -> Option<DeleteReport> {
    let Some((page_index, _)) = doc.zone_location(zone_id) else {
        log::warn!("delete_zone: zone {} not found", zone_id);
        return None;
    };

    let mut report = DeleteReport::default();
    let owners: Vec<String> = doc
        .measures()
        .filter(|m| m.has_zone(zone_id))
        .map(|m| m.id.clone())
        .collect();

    for measure_id in owners {
        let Some(pos) = doc.find_measure(&measure_id) else {
            continue;
        };
        let Some(measure) = doc.measure_at_mut(pos) else {
            continue;
        };
        if measure.facs.len() > 1 {
            measure.facs.retain(|f| f != zone_id);
            report.unlinked_measures.push(measure_id);
            continue;
        }
        let span = measure.span();
        report.shifted.extend(shift_following(doc, pos, -span));
        if remove_measure_at(doc, pos).is_some() {
            report.removed_measures.push(measure_id);
        }
    }

    if let Some(page) = doc.page_mut(page_index) {
        page.zones.retain(|z| z.id != zone_id);
    }
    ctx.validate(doc);
    log::debug!(
        "deleted zone {}: {} measure(s) removed, {} unlinked",
        zone_id,
        report.removed_measures.len(),
        report.unlinked_measures.len()
    );
    Some(report)
}

/// Zone preceding `zone_id` in reading order, looking back across pages
pub fn preceding_zone(doc: &Document, ratio: f64, zone_id: &str) -> Option<String> {
    let (page_index, _) = doc.zone_location(zone_id)?;
    let layout = classify_systems(&doc.pages[page_index].zones, ratio);
    if let Some(prev) = layout.preceding(zone_id) {
        return Some(prev.to_string());
    }
    (0..page_index).rev().find_map(|pi| {
        classify_systems(&doc.pages[pi].zones, ratio)
            .last_zone()
            .map(|z| z.id.clone())
    })
}

/// Split a zone off its shared measure, or merge it into its predecessor's
///
/// If the zone's measure also depicts the preceding zone, the zone gets a
/// measure of its own; otherwise it joins the preceding zone's measure.
/// With existing music, zones are shifted along the measure chain instead
/// of measures being created or removed.
pub fn toggle_additional_zone(doc: &mut Document, ctx: &mut EditContext, zone_id: &str) -> Option<ToggleReport> {
    let Some(predecessor) = preceding_zone(doc, ctx.settings.system_threshold_ratio, zone_id) else {
        log::debug!("toggle: zone {} has no predecessor", zone_id);
        return None;
    };
    let owners: Vec<String> = doc
        .measures()
        .filter(|m| m.has_zone(zone_id))
        .map(|m| m.id.clone())
        .collect();
    if owners.is_empty() {
        log::warn!("toggle: zone {} is not linked to a measure", zone_id);
        return None;
    }

    let mut result: Option<ToggleReport> = None;
    for measure_id in owners {
        let Some(pos) = doc.find_measure(&measure_id) else {
            continue;
        };
        let shares_predecessor = doc.measure_at(pos).map_or(false, |m| m.has_zone(&predecessor));
        let report = match (ctx.policy, shares_predecessor) {
            (ContentPolicy::Free, true) => split_free(doc, ctx, pos, zone_id),
            (ContentPolicy::Free, false) => merge_free(doc, pos, zone_id, &predecessor),
            (ContentPolicy::ExistingMusic, true) => split_shifting(doc, pos, zone_id),
            (ContentPolicy::ExistingMusic, false) => merge_shifting(doc, pos, zone_id, &predecessor),
        };
        if let Some(report) = report {
            result = Some(match result.take() {
                Some(mut acc) => {
                    acc.affected.extend(report.affected);
                    acc
                }
                None => report,
            });
        }
    }
    ctx.validate(doc);
    result
}

fn split_free(doc: &mut Document, ctx: &mut EditContext, pos: MeasurePos, zone_id: &str) -> Option<ToggleReport> {
    let (page_index, _) = doc.zone_location(zone_id)?;
    let movement_id = doc.movements.get(pos.movement)?.id.clone();
    let measure = doc.measure_at_mut(pos)?;
    measure.facs.retain(|f| f != zone_id);
    let mut affected = vec![measure.id.clone()];

    let report = insert_measure(doc, ctx, Measure::for_zone(zone_id), zone_id, page_index, Some(&movement_id))?;
    affected.push(report.measure_id);
    affected.extend(report.shifted);
    Some(ToggleReport {
        action: ToggleAction::Split,
        affected,
    })
}

fn merge_free(doc: &mut Document, pos: MeasurePos, zone_id: &str, predecessor: &str) -> Option<ToggleReport> {
    let measure = doc.measure_at(pos)?.clone();
    let index = DocumentIndex::build(doc);
    let targets = index.measures_for_zone(predecessor);
    if targets.is_empty() {
        log::warn!("merge: preceding zone {} has no measure", predecessor);
        return None;
    }

    let keeps_measure = measure.facs.len() > 1;
    let carries_notation = !keeps_measure && measure.has_notation();
    if carries_notation
        && targets
            .iter()
            .any(|p| doc.measure_at(*p).map_or(false, Measure::has_notation))
    {
        log::warn!(
            "merge: both {} and the preceding measure carry notation, leaving them apart",
            measure.id
        );
        return None;
    }

    let mut affected = Vec::new();
    for target in &targets {
        if let Some(prev) = doc.measure_at_mut(*target) {
            if !prev.has_zone(zone_id) {
                prev.facs.push(zone_id.to_string());
            }
            if carries_notation {
                prev.staves.extend(measure.staves.iter().cloned());
            }
            affected.push(prev.id.clone());
        }
    }

    if keeps_measure {
        if let Some(m) = doc.measure_at_mut(pos) {
            m.facs.retain(|f| f != zone_id);
        }
        affected.push(measure.id);
    } else {
        affected.extend(shift_following(doc, pos, -measure.span()));
        remove_measure_at(doc, pos);
        affected.push(measure.id);
    }
    Some(ToggleReport {
        action: ToggleAction::Merge,
        affected,
    })
}

fn split_shifting(doc: &mut Document, pos: MeasurePos, zone_id: &str) -> Option<ToggleReport> {
    let measure = doc.measure_at_mut(pos)?;
    measure.facs.retain(|f| f != zone_id);
    let mut affected = vec![measure.id.clone()];

    let mut carry = vec![zone_id.to_string()];
    for next in doc.following_positions(pos) {
        let Some(m) = doc.measure_at_mut(next) else {
            continue;
        };
        affected.push(m.id.clone());
        if m.has_facs() {
            std::mem::swap(&mut m.facs, &mut carry);
        } else {
            m.facs = std::mem::take(&mut carry);
            break;
        }
    }
    if !carry.is_empty() {
        log::warn!("split: no measure left for zone(s) {}", carry.join(", "));
    }
    Some(ToggleReport {
        action: ToggleAction::Split,
        affected,
    })
}

/// Existing music: the zone joins its predecessor's measure and every later
/// link moves back one measure. Notation never moves, so two notated
/// measures are never merged here.
fn merge_shifting(doc: &mut Document, pos: MeasurePos, zone_id: &str, predecessor: &str) -> Option<ToggleReport> {
    let index = DocumentIndex::build(doc);
    let mut affected = Vec::new();
    for target in index.measures_for_zone(predecessor) {
        if let Some(prev) = doc.measure_at_mut(target) {
            if !prev.has_zone(zone_id) {
                prev.facs.push(zone_id.to_string());
            }
            affected.push(prev.id.clone());
        }
    }

    let mut chain = vec![pos];
    chain.extend(doc.following_positions(pos));
    for (i, current) in chain.iter().enumerate() {
        let next_facs = chain
            .get(i + 1)
            .and_then(|p| doc.measure_at(*p))
            .filter(|m| m.has_facs())
            .map(|m| m.facs.clone());
        let Some(m) = doc.measure_at_mut(*current) else {
            continue;
        };
        affected.push(m.id.clone());
        match next_facs {
            Some(facs) => m.facs = facs,
            None => {
                m.facs.clear();
                break;
            }
        }
    }
    Some(ToggleReport {
        action: ToggleAction::Merge,
        affected,
    })
}
