//! IIIF manifest import
//!
//! Turns a IIIF presentation manifest (v2 or v3) into a fresh document with
//! one page per canvas. Image sizes come either from the host (the browser
//! fetches `info.json` itself) or from an [`ImageInfoSource`].

pub mod dimensions;
pub mod manifest;

pub use dimensions::{resolve_dimensions, ImageInfoSource};
#[cfg(feature = "http")]
pub use dimensions::HttpImageInfoSource;
pub use manifest::{check_manifest, parse_manifest, CanvasInfo, ManifestInfo, ManifestVersion};

use chrono::Utc;
use thiserror::Error;

use crate::models::{new_id, Document, IdKind, Page};

/// Manifest import errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    #[error("Invalid JSON: {0}")]
    Json(String),

    /// Neither a v2 nor a v3 manifest
    #[error("Not a IIIF manifest: {0}")]
    NotAManifest(String),

    #[error("Missing field in manifest: {0}")]
    MissingField(String),

    #[error("Dimension count {found} does not match {expected} canvases")]
    DimensionCount { expected: usize, found: usize },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid image info: {0}")]
    ImageInfo(String),
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::Json(err.to_string())
    }
}

/// Import a manifest, looking up every page size through `source`
pub fn import_manifest(json: &str, url: &str, source: &dyn ImageInfoSource) -> Result<Document, ImportError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let info = parse_manifest(&value)?;
    let dims = resolve_dimensions(&info.canvases, source);
    Ok(build_document(info, url, &dims))
}

/// Import a manifest with sizes already resolved by the caller
///
/// `dims` is indexed like the canvases; `None` entries fall back to the
/// size declared on the canvas.
pub fn import_manifest_with_dimensions(
    json: &str,
    url: &str,
    dims: &[Option<(u32, u32)>],
) -> Result<Document, ImportError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let info = parse_manifest(&value)?;
    if !dims.is_empty() && dims.len() != info.canvases.len() {
        return Err(ImportError::DimensionCount {
            expected: info.canvases.len(),
            found: dims.len(),
        });
    }
    let dims: Vec<Option<(u32, u32)>> = info
        .canvases
        .iter()
        .enumerate()
        .map(|(i, canvas)| dims.get(i).copied().flatten().or_else(|| canvas.declared_size()))
        .collect();
    Ok(build_document(info, url, &dims))
}

fn build_document(info: ManifestInfo, url: &str, dims: &[Option<(u32, u32)>]) -> Document {
    let mut doc = Document::new();
    doc.meta.title = info.title;
    doc.meta.shelfmark = info.shelfmark;
    doc.meta.composer = info.composer;
    doc.meta.manifest_url = Some(url.to_string());
    doc.meta.source_id = Some(new_id(IdKind::Source));
    doc.meta.change_date = Some(Utc::now().format("%Y-%m-%d").to_string());

    for (i, canvas) in info.canvases.into_iter().enumerate() {
        let size = dims.get(i).copied().flatten();
        if size.is_none() {
            log::warn!("no dimensions for canvas {} ({})", i + 1, canvas.service);
        }
        doc.push_page(Page::new(i + 1, canvas.label, canvas.service, size));
    }

    log::info!(
        "imported {:?} manifest {} with {} pages",
        info.version,
        url,
        doc.pages.len()
    );
    doc
}
