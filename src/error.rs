//! Crate-wide error type

use thiserror::Error;

use crate::converters::annotation::AnnotationError;
use crate::converters::mei::MeiError;
use crate::iiif_import::ImportError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Mei(#[from] MeiError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An operation needed a loaded document
    #[error("No document loaded")]
    NoDocument,
}

pub type Result<T> = std::result::Result<T, Error>;
