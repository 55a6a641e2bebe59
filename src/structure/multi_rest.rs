//! Multi-rest editing
//!
//! A multi-rest makes one measure stand for `num` consecutive bars, so the
//! numbers of everything after it move by the difference between the new
//! and the old count. An unset count counts as 1.

use crate::models::{Document, LayerElement, Measure, Staff};

use super::numbering::shift_following;

/// What a multi-rest change did
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiRestChange {
    pub measure_id: String,
    pub old: Option<u32>,
    pub new: Option<u32>,
    /// Shift applied to every following measure
    pub delta: i64,
    pub shifted: Vec<String>,
}

/// Set (`Some`) or clear (`None`) the multi-rest of a measure
///
/// `Some(0)` is treated as clearing. Returns `None` when the measure does
/// not exist.
pub fn set_multi_rest(doc: &mut Document, measure_id: &str, value: Option<u32>) -> Option<MultiRestChange> {
    let value = value.filter(|v| *v > 0);
    let Some(pos) = doc.find_measure(measure_id) else {
        log::warn!("set_multi_rest: measure {} not found", measure_id);
        return None;
    };
    let measure = doc.measure_at_mut(pos)?;
    let old = measure.multi_rest();
    apply_to_measure(measure, old, value);

    let delta = i64::from(value.unwrap_or(1)) - i64::from(old.unwrap_or(1));
    let shifted = shift_following(doc, pos, delta);
    Some(MultiRestChange {
        measure_id: measure_id.to_string(),
        old,
        new: value,
        delta,
        shifted,
    })
}

fn apply_to_measure(measure: &mut Measure, old: Option<u32>, value: Option<u32>) {
    match (old, value) {
        (Some(_), Some(num)) => {
            for element in multi_rests_mut(measure) {
                *element = LayerElement::MultiRest { num };
            }
        }
        (Some(_), None) if measure.has_notation() => {
            for staff in &mut measure.staves {
                for layer in &mut staff.layers {
                    layer
                        .elements
                        .retain(|e| !matches!(e, LayerElement::MultiRest { .. }));
                }
            }
        }
        (Some(_), None) => {
            // Only the placeholder was there
            measure.staves.clear();
        }
        (None, Some(num)) => {
            measure.staves.push(Staff::with_multi_rest(num));
        }
        (None, None) => {}
    }
}

fn multi_rests_mut(measure: &mut Measure) -> impl Iterator<Item = &mut LayerElement> {
    measure
        .staves
        .iter_mut()
        .flat_map(|s| s.layers.iter_mut())
        .flat_map(|l| l.elements.iter_mut())
        .filter(|e| matches!(e, LayerElement::MultiRest { .. }))
}
