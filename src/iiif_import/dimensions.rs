//! Page image size lookup
//!
//! One lookup per canvas, run on scoped threads and joined before the
//! document is built. A failed lookup never aborts the import.

use std::thread;

use super::{CanvasInfo, ImportError};

/// Resolves the pixel size of an image from its `info.json` URL
pub trait ImageInfoSource: Sync {
    fn dimensions(&self, url: &str) -> Result<(u32, u32), ImportError>;
}

/// Look up every canvas image; failures fall back to the canvas size
pub fn resolve_dimensions(canvases: &[CanvasInfo], source: &dyn ImageInfoSource) -> Vec<Option<(u32, u32)>> {
    let lookups: Vec<Result<(u32, u32), ImportError>> = thread::scope(|scope| {
        let handles: Vec<_> = canvases
            .iter()
            .map(|canvas| scope.spawn(move || source.dimensions(&canvas.service)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(ImportError::ImageInfo("lookup thread panicked".to_string())))
            })
            .collect()
    });

    canvases
        .iter()
        .zip(lookups)
        .map(|(canvas, lookup)| match lookup {
            Ok(size) => Some(size),
            Err(err) => {
                log::warn!("image info lookup failed for {}: {}", canvas.service, err);
                canvas.declared_size()
            }
        })
        .collect()
}

/// Width/height pair of an image info document
pub fn parse_image_info(value: &serde_json::Value) -> Result<(u32, u32), ImportError> {
    let field = |key: &str| {
        value
            .get(key)
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| ImportError::ImageInfo(format!("missing {}", key)))
    };
    Ok((field("width")?, field("height")?))
}

/// Fetches `info.json` over HTTP
#[cfg(feature = "http")]
pub struct HttpImageInfoSource {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpImageInfoSource {
    pub fn new() -> Result<Self, ImportError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(2))
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| ImportError::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
impl ImageInfoSource for HttpImageInfoSource {
    fn dimensions(&self, url: &str) -> Result<(u32, u32), ImportError> {
        let info: serde_json::Value = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| ImportError::Http(e.to_string()))?;
        parse_image_info(&info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FakeSource;

    impl ImageInfoSource for FakeSource {
        fn dimensions(&self, url: &str) -> Result<(u32, u32), ImportError> {
            if url.contains("broken") {
                Err(ImportError::Http("404".to_string()))
            } else {
                Ok((url.len() as u32, 100))
            }
        }
    }

    fn canvas(service: &str, size: Option<(u32, u32)>) -> CanvasInfo {
        CanvasInfo {
            label: "1".to_string(),
            width: size.map(|s| s.0),
            height: size.map(|s| s.1),
            service: service.to_string(),
        }
    }

    #[test]
    fn test_resolve_keeps_canvas_order_and_falls_back() {
        let canvases = vec![
            canvas("a", None),
            canvas("broken", Some((5, 6))),
            canvas("broken", None),
            canvas("abc", None),
        ];
        let dims = resolve_dimensions(&canvases, &FakeSource);
        assert_eq!(dims, vec![Some((1, 100)), Some((5, 6)), None, Some((3, 100))]);
    }

    #[test]
    fn test_parse_image_info() {
        assert_eq!(parse_image_info(&json!({"width": 10, "height": 20})), Ok((10, 20)));
        assert!(parse_image_info(&json!({"width": 10})).is_err());
    }
}
