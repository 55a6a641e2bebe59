//! WASM API for the facsimile editor
//!
//! Thin wrappers over the process-wide [`Session`](crate::session::Session):
//! arguments are deserialized, the matching operation from
//! [`crate::structure::operations`] is applied, and results come back as
//! plain JS values. Mutating calls return whether the document changed.

use wasm_bindgen::prelude::*;

use super::helpers::{deserialize, js_error, serialize, with_session};
use crate::converters::annotation::{page_annotations, zone_id_to_annotation, Annotation, DetectorRect};
use crate::models::{ContentPolicy, EditMode};
use crate::session::SessionConfig;
use crate::structure::{operations as ops, queries};

// ============================================================================
// Session and files
// ============================================================================

/// Reset the session with an optional JSON configuration
#[wasm_bindgen(js_name = initSession)]
pub fn init_session(config_json: Option<String>) -> Result<(), JsValue> {
    let config = match config_json {
        Some(json) => SessionConfig::from_json(&json).map_err(|e| js_error("initSession", e))?,
        None => SessionConfig::default(),
    };
    with_session("initSession", |session| {
        session.close();
        session.set_config(config);
        Ok(())
    })
}

#[wasm_bindgen(js_name = loadMei)]
pub fn load_mei(xml: &str) -> Result<(), JsValue> {
    log::info!("loadMei: {} bytes", xml.len());
    with_session("loadMei", |session| session.load_mei(xml))
}

#[wasm_bindgen(js_name = exportMei)]
pub fn export_mei() -> Result<String, JsValue> {
    with_session("exportMei", |session| session.export_mei())
}

/// Build a new document from a IIIF manifest
///
/// `dimensions` holds one `[width, height]` (or `null`) per canvas, fetched
/// by the host from each image's `info.json`.
#[wasm_bindgen(js_name = importManifest)]
pub fn import_manifest(json: &str, url: &str, dimensions: Option<js_sys::Array>) -> Result<(), JsValue> {
    let dims = match dimensions {
        Some(array) => dimensions_from_js(&array)?,
        None => Vec::new(),
    };
    with_session("importManifest", |session| session.import_manifest(json, url, &dims))
}

fn dimensions_from_js(array: &js_sys::Array) -> Result<Vec<Option<(u32, u32)>>, JsValue> {
    array
        .iter()
        .map(|entry| {
            if entry.is_null() || entry.is_undefined() {
                Ok(None)
            } else {
                deserialize::<(u32, u32)>(entry, "importManifest: dimensions").map(Some)
            }
        })
        .collect()
}

// ============================================================================
// Zones
// ============================================================================

#[wasm_bindgen(js_name = createZone)]
pub fn create_zone(annotation: JsValue) -> Result<bool, JsValue> {
    let annotation: Annotation = deserialize(annotation, "createZone: annotation")?;
    with_session("createZone", |session| session.try_apply(|d, c| ops::create_zone(d, c, &annotation)))
}

#[wasm_bindgen(js_name = createDetectedZones)]
pub fn create_detected_zones(rects: JsValue) -> Result<bool, JsValue> {
    let rects: Vec<DetectorRect> = deserialize(rects, "createDetectedZones: rects")?;
    with_session("createDetectedZones", |session| {
        session.apply(|d, c| ops::create_detected_zones(d, c, &rects))
    })
}

#[wasm_bindgen(js_name = updateZone)]
pub fn update_zone(annotation: JsValue) -> Result<bool, JsValue> {
    let annotation: Annotation = deserialize(annotation, "updateZone: annotation")?;
    with_session("updateZone", |session| {
        session.try_apply(|d, c| ops::update_zone_from_annotation(d, c, &annotation))
    })
}

#[wasm_bindgen(js_name = deleteZone)]
pub fn delete_zone(zone_id: &str) -> Result<bool, JsValue> {
    with_session("deleteZone", |session| session.apply(|d, c| ops::remove_zone(d, c, zone_id)))
}

#[wasm_bindgen(js_name = toggleZone)]
pub fn toggle_zone(zone_id: &str) -> Result<bool, JsValue> {
    with_session("toggleZone", |session| session.apply(|d, c| ops::toggle_zone(d, c, zone_id)))
}

// ============================================================================
// Context
// ============================================================================

/// Set the edit mode (`"Selection"`, `"ManualRect"`, `"AdditionalZone"`)
#[wasm_bindgen(js_name = setMode)]
pub fn set_mode(mode: JsValue) -> Result<(), JsValue> {
    let mode: EditMode = deserialize(mode, "setMode")?;
    with_session("setMode", |session| session.apply(|d, c| ops::set_mode(d, c, mode)).map(|_| ()))
}

#[wasm_bindgen(js_name = setExistingMusic)]
pub fn set_existing_music(enabled: bool) -> Result<(), JsValue> {
    let policy = if enabled { ContentPolicy::ExistingMusic } else { ContentPolicy::Free };
    with_session("setExistingMusic", |session| {
        session.apply(|d, c| ops::set_policy(d, c, policy)).map(|_| ())
    })
}

#[wasm_bindgen(js_name = setCurrentPage)]
pub fn set_current_page(page_index: usize) -> Result<(), JsValue> {
    with_session("setCurrentPage", |session| {
        session.apply(|d, c| ops::set_current_page(d, c, page_index)).map(|_| ())
    })
}

#[wasm_bindgen(js_name = setCurrentMovement)]
pub fn set_current_movement(movement_id: &str) -> Result<(), JsValue> {
    with_session("setCurrentMovement", |session| {
        session.apply(|d, c| ops::set_current_movement(d, c, movement_id)).map(|_| ())
    })
}

#[wasm_bindgen(js_name = setCurrentMeasure)]
pub fn set_current_measure(measure_id: &str) -> Result<(), JsValue> {
    with_session("setCurrentMeasure", |session| {
        session.apply(|d, c| ops::set_current_measure(d, c, measure_id)).map(|_| ())
    })
}

#[wasm_bindgen(js_name = selectZone)]
pub fn select_zone(zone_id: &str) -> Result<(), JsValue> {
    with_session("selectZone", |session| {
        session.apply(|d, c| ops::set_current_measure_by_zone(d, c, zone_id)).map(|_| ())
    })
}

#[wasm_bindgen(js_name = getContext)]
pub fn get_context() -> Result<JsValue, JsValue> {
    let context = with_session("getContext", |session| Ok(session.context().clone()))?;
    serialize(&context, "getContext")
}

// ============================================================================
// Measures, movements, pages
// ============================================================================

/// Set or clear (`null`/`0`) the multi-rest of the current measure
#[wasm_bindgen(js_name = setMultiRest)]
pub fn set_multi_rest(num: Option<u32>) -> Result<bool, JsValue> {
    with_session("setMultiRest", |session| session.apply(|d, c| ops::set_current_multi_rest(d, c, num)))
}

#[wasm_bindgen(js_name = setMeasureLabel)]
pub fn set_measure_label(label: Option<String>) -> Result<bool, JsValue> {
    with_session("setMeasureLabel", |session| {
        session.apply(|d, c| ops::set_measure_label(d, c, label.as_deref()))
    })
}

#[wasm_bindgen(js_name = createMovement)]
pub fn create_movement() -> Result<bool, JsValue> {
    with_session("createMovement", |session| session.apply(ops::create_movement))
}

#[wasm_bindgen(js_name = selectMovement)]
pub fn select_movement(movement_id: &str) -> Result<bool, JsValue> {
    with_session("selectMovement", |session| {
        session.apply(|d, c| ops::choose_movement(d, c, movement_id))
    })
}

#[wasm_bindgen(js_name = setMovementLabel)]
pub fn set_movement_label(movement_id: &str, label: &str) -> Result<bool, JsValue> {
    with_session("setMovementLabel", |session| {
        session.apply(|d, c| ops::set_movement_label(d, c, movement_id, label))
    })
}

#[wasm_bindgen(js_name = setPageLabel)]
pub fn set_page_label(page_index: usize, label: &str) -> Result<bool, JsValue> {
    with_session("setPageLabel", |session| {
        session.apply(|d, c| ops::set_page_label(d, c, page_index, label))
    })
}

#[wasm_bindgen(js_name = setPageDimensions)]
pub fn set_page_dimensions(page_index: usize, width: u32, height: u32) -> Result<bool, JsValue> {
    with_session("setPageDimensions", |session| {
        session.apply(|d, c| ops::set_page_dimensions(d, c, page_index, width, height))
    })
}

#[wasm_bindgen(js_name = addImportedPage)]
pub fn add_imported_page(url: &str, width: u32, height: u32) -> Result<bool, JsValue> {
    with_session("addImportedPage", |session| {
        session.apply(|d, c| ops::add_imported_page(d, c, url, width, height))
    })
}

// ============================================================================
// Queries
// ============================================================================

#[wasm_bindgen(js_name = getPages)]
pub fn get_pages() -> Result<JsValue, JsValue> {
    let pages = with_session("getPages", |session| Ok(queries::page_summaries(session.document()?)))?;
    serialize(&pages, "getPages")
}

#[wasm_bindgen(js_name = getMovements)]
pub fn get_movements() -> Result<JsValue, JsValue> {
    let movements = with_session("getMovements", |session| Ok(queries::movement_summaries(session.document()?)))?;
    serialize(&movements, "getMovements")
}

#[wasm_bindgen(js_name = getMeasures)]
pub fn get_measures() -> Result<JsValue, JsValue> {
    let measures = with_session("getMeasures", |session| Ok(queries::measure_summaries(session.document()?)))?;
    serialize(&measures, "getMeasures")
}

#[wasm_bindgen(js_name = getCurrentMeasure)]
pub fn get_current_measure() -> Result<JsValue, JsValue> {
    let measure = with_session("getCurrentMeasure", |session| {
        Ok(queries::current_measure(session.document()?, session.context()))
    })?;
    serialize(&measure, "getCurrentMeasure")
}

#[wasm_bindgen(js_name = getFirstMeasureWithoutZone)]
pub fn get_first_measure_without_zone() -> Result<JsValue, JsValue> {
    let measure = with_session("getFirstMeasureWithoutZone", |session| {
        Ok(queries::first_measure_without_zone(session.document()?))
    })?;
    serialize(&measure, "getFirstMeasureWithoutZone")
}

/// Annotations for the measure zones of a page, optionally leaving one out
#[wasm_bindgen(js_name = getPageAnnotations)]
pub fn get_page_annotations(page_index: usize, exclude: Option<String>) -> Result<JsValue, JsValue> {
    let annotations = with_session("getPageAnnotations", |session| {
        Ok(page_annotations(session.document()?, page_index, exclude.as_deref()))
    })?;
    serialize(&annotations, "getPageAnnotations")
}

#[wasm_bindgen(js_name = getZoneAnnotation)]
pub fn get_zone_annotation(zone_id: &str) -> Result<JsValue, JsValue> {
    let annotation = with_session("getZoneAnnotation", |session| {
        Ok(zone_id_to_annotation(session.document()?, zone_id)?)
    })?;
    serialize(&annotation, "getZoneAnnotation")
}

// ============================================================================
// History
// ============================================================================

#[wasm_bindgen]
pub fn undo() -> Result<bool, JsValue> {
    with_session("undo", |session| Ok(session.undo()))
}

#[wasm_bindgen]
pub fn redo() -> Result<bool, JsValue> {
    with_session("redo", |session| Ok(session.redo()))
}

#[wasm_bindgen(js_name = canUndo)]
pub fn can_undo() -> Result<bool, JsValue> {
    with_session("canUndo", |session| Ok(session.can_undo()))
}

#[wasm_bindgen(js_name = canRedo)]
pub fn can_redo() -> Result<bool, JsValue> {
    with_session("canRedo", |session| Ok(session.can_redo()))
}
