//! Manifest validation and canvas extraction

use serde_json::Value;

use super::ImportError;

pub const PRESENTATION_2_CONTEXT: &str = "http://iiif.io/api/presentation/2/context.json";
pub const PRESENTATION_3_CONTEXT: &str = "http://iiif.io/api/presentation/3/context.json";

const SHELFMARK_LABEL: &str = "Signatur";
const COMPOSER_LABEL: &str = "Autor";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManifestVersion {
    V2,
    V3,
}

/// One canvas of the manifest, reduced to what a page needs
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasInfo {
    pub label: String,
    /// Size declared on the canvas itself
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Image service `info.json` URL
    pub service: String,
}

impl CanvasInfo {
    pub fn declared_size(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}

/// Validated manifest content
#[derive(Clone, Debug, PartialEq)]
pub struct ManifestInfo {
    pub version: ManifestVersion,
    pub id: String,
    pub title: Option<String>,
    pub shelfmark: Option<String>,
    pub composer: Option<String>,
    pub canvases: Vec<CanvasInfo>,
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Decide which presentation version a manifest claims to be
pub fn check_manifest(json: &Value) -> Result<ManifestVersion, ImportError> {
    if !json.is_object() {
        return Err(ImportError::NotAManifest("top level is not an object".to_string()));
    }

    if json.get("items").map_or(false, Value::is_array) {
        return match non_empty_str(json.get("id")).or_else(|| non_empty_str(json.get("@id"))) {
            Some(_) => Ok(ManifestVersion::V3),
            None => Err(ImportError::MissingField("id".to_string())),
        };
    }

    let context = json.get("@context").and_then(Value::as_str);
    if context != Some(PRESENTATION_2_CONTEXT) && context != Some(PRESENTATION_3_CONTEXT) {
        return Err(ImportError::NotAManifest(format!("unsupported @context {:?}", context)));
    }
    if json.get("@type").and_then(Value::as_str) != Some("sc:Manifest") {
        return Err(ImportError::NotAManifest("@type is not sc:Manifest".to_string()));
    }
    if non_empty_str(json.get("@id")).is_none() {
        return Err(ImportError::MissingField("@id".to_string()));
    }
    if !json.get("sequences").map_or(false, Value::is_array) {
        return Err(ImportError::MissingField("sequences".to_string()));
    }
    Ok(ManifestVersion::V2)
}

/// Validate the manifest and extract its metadata and canvases
pub fn parse_manifest(json: &Value) -> Result<ManifestInfo, ImportError> {
    let version = check_manifest(json)?;

    let id = non_empty_str(json.get("@id"))
        .or_else(|| non_empty_str(json.get("id")))
        .unwrap_or_default()
        .to_string();

    let canvases = match version {
        ManifestVersion::V2 => json
            .pointer("/sequences/0/canvases")
            .and_then(Value::as_array)
            .ok_or_else(|| ImportError::MissingField("sequences[0].canvases".to_string()))?,
        ManifestVersion::V3 => json
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| ImportError::MissingField("items".to_string()))?,
    };

    let canvases = canvases
        .iter()
        .enumerate()
        .map(|(i, canvas)| read_canvas(canvas, i, version))
        .collect::<Result<Vec<_>, _>>()?;

    let title = json.get("label").and_then(text_value);
    let (shelfmark, composer) = read_metadata(json);

    Ok(ManifestInfo {
        version,
        id,
        title,
        shelfmark,
        composer,
        canvases,
    })
}

fn read_canvas(canvas: &Value, index: usize, version: ManifestVersion) -> Result<CanvasInfo, ImportError> {
    let service = match version {
        ManifestVersion::V2 => canvas
            .pointer("/images/0/resource/service/@id")
            .and_then(Value::as_str),
        ManifestVersion::V3 => canvas
            .pointer("/items/0/items/0/body/service/0")
            .and_then(|s| s.get("id").or_else(|| s.get("@id")))
            .and_then(Value::as_str),
    }
    .ok_or_else(|| ImportError::MissingField(format!("image service of canvas {}", index + 1)))?;

    let label = canvas
        .get("label")
        .and_then(text_value)
        .unwrap_or_else(|| (index + 1).to_string());

    let dimension = |key: &str| canvas.get(key).and_then(Value::as_u64).and_then(|v| u32::try_from(v).ok());

    Ok(CanvasInfo {
        label,
        width: dimension("width"),
        height: dimension("height"),
        service: format!("{}/info.json", service.trim_end_matches('/')),
    })
}

/// Plain string, v3 language map or v2 `@value` list, flattened to one string
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(values) => values.iter().find_map(text_value),
        Value::Object(map) => match map.get("@value") {
            Some(v) => text_value(v),
            None => map.values().find_map(text_value),
        },
        _ => None,
    }
}

fn read_metadata(json: &Value) -> (Option<String>, Option<String>) {
    let Some(entries) = json.get("metadata").and_then(Value::as_array) else {
        log::info!("manifest has no metadata");
        return (None, None);
    };

    let lookup = |wanted: &str| {
        let found = entries.iter().find_map(|entry| {
            let label = entry.get("label").and_then(text_value)?;
            if label == wanted {
                entry.get("value").and_then(text_value)
            } else {
                None
            }
        });
        if found.is_none() {
            log::info!("manifest metadata has no {:?} entry", wanted);
        }
        found
    };

    (lookup(SHELFMARK_LABEL), lookup(COMPOSER_LABEL))
}
