//! Facsimile Editor WASM API
//!
//! This module provides the JavaScript-facing API of the editor. It is the
//! only place that touches `wasm-bindgen`; everything below it is plain
//! Rust and can be driven natively through [`crate::session::Session`].
//!
//! # Module Structure
//!
//! - `helpers`: serialization, error conversion and the shared session
//! - `core`: the exported functions, grouped by concern

pub mod helpers;
pub mod core;

pub use self::core::*;
