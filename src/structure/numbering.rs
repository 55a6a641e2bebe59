//! Measure renumbering
//!
//! Numbers flow forward through the whole document: a shift started in
//! one movement continues across section and movement boundaries up to
//! the last measure. Movement boundaries do not reset numbering.

use crate::models::{Document, MeasurePos};

/// Add `delta` to the number of every measure after `from`
///
/// Returns the ids of the measures that were shifted.
pub fn shift_following(doc: &mut Document, from: MeasurePos, delta: i64) -> Vec<String> {
    if delta == 0 {
        return Vec::new();
    }
    let mut shifted = Vec::new();
    for pos in doc.following_positions(from) {
        if let Some(measure) = doc.measure_at_mut(pos) {
            measure.n += delta;
            shifted.push(measure.id.clone());
        }
    }
    log::debug!("shifted {} measures by {}", shifted.len(), delta);
    shifted
}

/// Number a measure placed at `pos` from the measure preceding it in the
/// same movement (`n + span`), or 1 if it opens the movement
pub fn number_from_predecessor(doc: &Document, pos: MeasurePos) -> i64 {
    doc.preceding_in_movement(pos)
        .and_then(|p| doc.measure_at(p))
        .map(|prev| prev.n + prev.span())
        .unwrap_or(1)
}

/// A pair of adjacent measures breaking `n(next) = n(prev) + span(prev)`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumberingViolation {
    pub movement: String,
    pub previous: String,
    pub next: String,
    pub expected: i64,
    pub found: i64,
}

/// Check the numbering invariant in every movement
///
/// Pairs where either measure carries an explicit label are skipped.
pub fn numbering_violations(doc: &Document) -> Vec<NumberingViolation> {
    let mut violations = Vec::new();
    for movement in &doc.movements {
        let measures: Vec<_> = movement.measures().collect();
        for pair in measures.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if prev.label.is_some() || next.label.is_some() {
                continue;
            }
            let expected = prev.n + prev.span();
            if next.n != expected {
                violations.push(NumberingViolation {
                    movement: movement.id.clone(),
                    previous: prev.id.clone(),
                    next: next.id.clone(),
                    expected,
                    found: next.n,
                });
            }
        }
    }
    violations
}
