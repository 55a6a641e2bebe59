//! Format converters
//!
//! This module contains the converters between the document tree and the
//! formats it is exchanged in: MEI files and web annotations.

pub mod annotation;
pub mod mei;

// Re-export for convenience
pub use annotation::{
    annotation_to_zone, detector_rect_to_zone, page_annotations, zone_id_to_annotation, zone_to_annotation,
    Annotation, AnnotationError, DetectorRect,
};
pub use mei::{read_mei, write_mei, MeiError};
