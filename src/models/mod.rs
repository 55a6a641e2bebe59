//! Models module for the facsimile editor
//!
//! This module contains the document tree (facsimile pages and zones,
//! movements, sections, measures), the edit context passed into every
//! operation, and the id/index helpers used to address nodes.

pub mod content;
pub mod core;
pub mod editor_state;
pub mod ids;
pub mod index;

// Re-export commonly used types
pub use self::content::{Layer, LayerElement, Staff};
pub use self::core::*;
pub use self::editor_state::{ContentPolicy, EditContext, EditMode, EditOutcome, EditSettings};
pub use self::ids::{new_id, IdKind};
pub use self::index::{DocumentIndex, MeasurePos};
