//! Facsimile Editor WASM Module
//!
//! Keeps the measures of an MEI encoding in sync with the zones drawn on
//! scanned page images: zones become measures in reading order, numbering
//! follows every insertion and deletion, and multi-rests, system and page
//! breaks are maintained along the way.

pub mod api;
pub mod converters;
pub mod error;
pub mod iiif_import;
pub mod models;
pub mod session;
pub mod structure;
pub mod undo;

// Re-export commonly used types
pub use error::{Error, Result};
pub use models::{
    ContentPolicy, Document, EditContext, EditMode, EditOutcome, EditSettings, Measure, Movement, Page, Rect, Zone,
};
pub use session::{Session, SessionConfig};

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    console_log::init_with_level(log::Level::Debug).ok();

    log::info!("Facsimile editor WASM module initialized");
}
