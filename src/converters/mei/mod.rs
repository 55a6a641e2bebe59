//! MEI serialization
//!
//! The document is stored as MEI: the facsimile side under
//! `music/facsimile` (`surface`, `graphic`, `zone`) and the symbolic side
//! under `music/body` (`mdiv`, `score`, `section`, `measure`, `pb`, `sb`).
//! Measures point at their zones through `@facs="#z1 #z2"`.

mod reader;
mod writer;

pub use reader::read_mei;
pub use writer::write_mei;

use thiserror::Error;

pub const MEI_NS: &str = "http://www.music-encoding.org/ns/mei";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
pub const MEI_VERSION: &str = "5.0";

/// MEI read/write errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeiError {
    /// Not well-formed, or the writer failed
    #[error("XML error: {0}")]
    Xml(String),

    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("Invalid @{attribute} on <{element}>: {value:?}")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },
}
