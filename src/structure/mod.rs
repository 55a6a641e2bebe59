//! Structural editing of the measure stream
//!
//! Everything that keeps the symbolic side in step with the zones on the
//! page images: system detection, measure placement, renumbering, break
//! markers, multi-rests, zone lifecycle and moving content between
//! movements.
//!
//! ## Modules
//!
//! - `systems`: geometric grouping of zones into systems and reading order
//! - `insertion`: where a new measure goes and which breaks it needs
//! - `numbering`: forward renumbering and the numbering invariant
//! - `breaks`: page/system break upkeep when measures disappear
//! - `multi_rest`: multi-rest counts and their numbering delta
//! - `zones`: create, update, delete and split/merge of zones
//! - `movements`: moving a run of measures into another movement
//! - `operations`: the snapshot-in, snapshot-out surface over all of the above
//! - `queries`: read-only summaries for the UI
//!
//! The `&mut Document` helpers in the lower modules are the building
//! blocks; callers outside this module go through `operations`.

pub mod breaks;
pub mod insertion;
pub mod movements;
pub mod multi_rest;
pub mod numbering;
pub mod operations;
pub mod queries;
pub mod systems;
pub mod zones;

// Re-exports for convenience
pub use numbering::{numbering_violations, NumberingViolation};
pub use operations::*;
pub use queries::{
    current_measure, first_measure_without_zone, measure_summaries, movement_summaries, page_summaries,
    MeasureSummary, MovementMeasures, MovementSummary, PageSummary,
};
pub use systems::{classify_systems, SystemLayout};
