//! Shared helpers for WASM API operations
//!
//! Serialization across the boundary, error conversion to `JsValue`
//! strings, and access to the process-wide session.

use std::sync::Mutex;

use lazy_static::lazy_static;
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::session::Session;

// WASM-owned session (canonical source of truth)
lazy_static! {
    static ref SESSION: Mutex<Session> = Mutex::new(Session::default());
}

// ============================================================================
// Console Logging Functions
// ============================================================================

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn error(s: &str);
}

pub fn log_error(msg: &str) {
    error(&format!("[WASM] ❌ {}", msg));
}

// ============================================================================
// Serialization/Deserialization Helpers
// ============================================================================

/// Deserialize a value from JavaScript with automatic error handling
pub fn deserialize<T: DeserializeOwned>(value: JsValue, error_context: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| {
        let msg = format!("{}: {}", error_context, e);
        log_error(&msg);
        JsValue::from_str(&msg)
    })
}

/// Serialize a value to JavaScript with automatic error handling
pub fn serialize<T: Serialize>(value: &T, error_context: &str) -> Result<JsValue, JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value.serialize(&serializer).map_err(|e| {
        let msg = format!("{}: {}", error_context, e);
        log_error(&msg);
        JsValue::from_str(&msg)
    })
}

// ============================================================================
// Result Conversion Helpers
// ============================================================================

/// Convert a crate error to a JsValue string
pub fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    let msg = format!("{}: {}", context, err);
    log_error(&msg);
    JsValue::from_str(&msg)
}

/// Run `f` on the locked session, mapping its error for JavaScript
pub fn with_session<T, F>(context: &str, f: F) -> Result<T, JsValue>
where
    F: FnOnce(&mut Session) -> crate::error::Result<T>,
{
    let mut session = SESSION.lock().map_err(|e| js_error(context, e))?;
    f(&mut session).map_err(|e| js_error(context, e))
}
