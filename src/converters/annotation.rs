//! Web-annotation exchange format for zones
//!
//! The drawing surface speaks W3C web annotations: the rectangle travels
//! as a media-fragment selector (`xywh=pixel:x,y,w,h`), the zone id as the
//! annotation id. Outgoing annotations also carry the measure label as a
//! tagging body and three `Dataset` bodies with CSS selectors that the
//! surface uses to style zones by measure and movement.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{new_id, Document, IdKind, Measure, Rect, Zone};

pub const ANNOTATION_CONTEXT: &str = "http://www.w3.org/ns/anno.jsonld";
pub const MEDIA_FRAGMENTS: &str = "http://www.w3.org/TR/media-frags/";

/// Label for a zone without any measure
pub const NO_MEASURE_LABEL: &str = "–";

static XYWH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^xywh=(?:pixel:)?\s*(-?[\d.]+)\s*,\s*(-?[\d.]+)\s*,\s*(-?[\d.]+)\s*,\s*(-?[\d.]+)\s*$")
        .expect("selector pattern is valid")
});

/// Annotation conversion errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnnotationError {
    #[error("Invalid fragment selector: {0}")]
    InvalidSelector(String),

    #[error("Annotation has no id")]
    MissingId,

    #[error("Zone not found: {0}")]
    UnknownZone(String),
}

// ============================================================================
// Wire types
// ============================================================================

fn annotation_type() -> String {
    "Annotation".to_string()
}

fn annotation_context() -> String {
    ANNOTATION_CONTEXT.to_string()
}

/// A web annotation as exchanged with the drawing surface
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Annotation {
    #[serde(rename = "type", default = "annotation_type")]
    pub kind: String,

    #[serde(default)]
    pub body: Vec<AnnotationBody>,

    pub target: AnnotationTarget,

    #[serde(rename = "@context", default = "annotation_context")]
    pub context: String,

    #[serde(default)]
    pub id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum AnnotationBody {
    TextualBody { purpose: String, value: String },
    Dataset { selector: CssSelector },
    /// Bodies added by the surface that the editor does not read
    #[serde(other)]
    Unknown,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CssSelector {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AnnotationTarget {
    #[serde(default)]
    pub source: String,
    pub selector: FragmentSelector,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FragmentSelector {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "conformsTo", default)]
    pub conforms_to: String,
    pub value: String,
}

impl Annotation {
    /// Text of the tagging body, if any
    pub fn label(&self) -> Option<&str> {
        self.body.iter().find_map(|b| match b {
            AnnotationBody::TextualBody { value, .. } => Some(value.as_str()),
            _ => None,
        })
    }

    /// Values of the `Dataset` selectors, in body order
    pub fn datasets(&self) -> Vec<&str> {
        self.body
            .iter()
            .filter_map(|b| match b {
                AnnotationBody::Dataset { selector } => Some(selector.value.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Rectangle as reported by the measure detector
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct DetectorRect {
    pub ulx: f64,
    pub uly: f64,
    pub lrx: f64,
    pub lry: f64,
}

// ============================================================================
// Selector
// ============================================================================

/// Parse `xywh=pixel:x,y,w,h`; fractional values are rounded
pub fn parse_xywh(value: &str) -> Result<Rect, AnnotationError> {
    let caps = XYWH_RE
        .captures(value.trim())
        .ok_or_else(|| AnnotationError::InvalidSelector(value.to_string()))?;
    let mut parts = [0i64; 4];
    for (i, part) in parts.iter_mut().enumerate() {
        let raw = &caps[i + 1];
        let number: f64 = raw
            .parse()
            .map_err(|_| AnnotationError::InvalidSelector(value.to_string()))?;
        *part = number.round() as i64;
    }
    Ok(Rect::from_xywh(parts[0], parts[1], parts[2], parts[3]))
}

pub fn format_xywh(rect: &Rect) -> String {
    format!(
        "xywh=pixel:{},{},{},{}",
        rect.ulx,
        rect.uly,
        rect.width(),
        rect.height()
    )
}

// ============================================================================
// Conversions
// ============================================================================

/// Zone described by an incoming annotation
pub fn annotation_to_zone(annotation: &Annotation) -> Result<Zone, AnnotationError> {
    let id = annotation.id.trim().trim_start_matches('#');
    if id.is_empty() {
        return Err(AnnotationError::MissingId);
    }
    let rect = parse_xywh(&annotation.target.selector.value)?;
    Ok(Zone::new(id, rect))
}

/// Zone with a fresh detector id for a detected rectangle
pub fn detector_rect_to_zone(rect: &DetectorRect) -> Zone {
    Zone::new(
        new_id(IdKind::DetectedZone),
        Rect::new(
            rect.ulx.round() as i64,
            rect.uly.round() as i64,
            rect.lrx.round() as i64,
            rect.lry.round() as i64,
        ),
    )
}

fn zone_label(measures: &[&Measure]) -> String {
    match measures {
        [] => NO_MEASURE_LABEL.to_string(),
        [only] => only.display_label(),
        _ => {
            let lowest = measures.iter().min_by_key(|m| m.n);
            let highest = measures.iter().max_by_key(|m| m.n);
            match (lowest, highest) {
                (Some(lo), Some(hi)) => format!("{}–{}", lo.display_label(), hi.display_label()),
                _ => NO_MEASURE_LABEL.to_string(),
            }
        }
    }
}

fn dataset(value: String) -> AnnotationBody {
    AnnotationBody::Dataset {
        selector: CssSelector {
            kind: "CssSelector".to_string(),
            value,
        },
    }
}

/// Describe a zone of `doc` as an annotation on `page_uri`
pub fn zone_to_annotation(doc: &Document, zone: &Zone, page_uri: &str) -> Annotation {
    let mut measures: Vec<&Measure> = Vec::new();
    let mut measure_links = Vec::new();
    let mut movement_links: Vec<String> = Vec::new();
    let mut movement_classes = Vec::new();

    for (index, movement) in doc.movements.iter().enumerate() {
        for measure in movement.measures().filter(|m| m.has_zone(&zone.id)) {
            measures.push(measure);
            measure_links.push(format!("measure#{}", measure.id));
            movement_classes.push(format!("mov_{}", index));
            let link = format!("mdiv#{}", movement.id);
            if !movement_links.contains(&link) {
                movement_links.push(link);
            }
        }
    }
    if measures.is_empty() && zone.is_measure_zone() {
        log::debug!("zone {} is not linked to any measure", zone.id);
    }

    Annotation {
        kind: annotation_type(),
        body: vec![
            AnnotationBody::TextualBody {
                purpose: "tagging".to_string(),
                value: zone_label(&measures),
            },
            dataset(measure_links.join(", ")),
            dataset(movement_links.join(", ")),
            dataset(movement_classes.join(", ")),
        ],
        target: AnnotationTarget {
            source: page_uri.to_string(),
            selector: FragmentSelector {
                kind: "FragmentSelector".to_string(),
                conforms_to: MEDIA_FRAGMENTS.to_string(),
                value: format_xywh(&zone.rect),
            },
        },
        context: annotation_context(),
        id: zone.id.clone(),
    }
}

/// Annotation for a zone looked up by id
pub fn zone_id_to_annotation(doc: &Document, zone_id: &str) -> Result<Annotation, AnnotationError> {
    let (page_index, zone_index) = doc
        .zone_location(zone_id)
        .ok_or_else(|| AnnotationError::UnknownZone(zone_id.to_string()))?;
    let page = &doc.pages[page_index];
    Ok(zone_to_annotation(doc, &page.zones[zone_index], &page.graphic.target))
}

/// Annotations for the measure zones of a page, leaving out `exclude`
/// (the zone currently being edited on the surface)
pub fn page_annotations(doc: &Document, page_index: usize, exclude: Option<&str>) -> Vec<Annotation> {
    let Some(page) = doc.page(page_index) else {
        return Vec::new();
    };
    page.measure_zones()
        .filter(|z| Some(z.id.as_str()) != exclude)
        .map(|z| zone_to_annotation(doc, z, &page.graphic.target))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Movement, Page, SectionItem};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn doc_with_zone() -> Document {
        let mut doc = Document::new();
        let mut page = Page::new(1, "1", "https://img/p1/info.json", Some((1000, 1000)));
        page.zones.push(Zone::new("z1", Rect::new(10, 20, 110, 220)));
        doc.push_page(page);
        doc
    }

    fn measure(n: i64, zone: &str) -> Measure {
        let mut m = Measure::for_zone(zone);
        m.n = n;
        m
    }

    #[test]
    fn test_parse_xywh_rounds() {
        assert_eq!(parse_xywh("xywh=pixel:10.4,20.6,30,40.5").unwrap(), Rect::new(10, 21, 40, 62));
        assert_eq!(parse_xywh("xywh=1,2,3,4").unwrap(), Rect::new(1, 2, 4, 6));
        assert!(matches!(
            parse_xywh("xywh=pixel:1,2,3"),
            Err(AnnotationError::InvalidSelector(_))
        ));
        assert!(parse_xywh("pixel:a,b,c,d").is_err());
    }

    #[test]
    fn test_unlinked_zone_annotation() {
        let doc = doc_with_zone();
        let annotation = zone_id_to_annotation(&doc, "z1").unwrap();
        assert_eq!(annotation.label(), Some(NO_MEASURE_LABEL));
        assert_eq!(annotation.target.selector.value, "xywh=pixel:10,20,100,200");
        assert_eq!(annotation.target.source, "https://img/p1/info.json");
        assert_eq!(annotation.datasets(), vec!["", "", ""]);
    }

    #[test]
    fn test_label_and_datasets() {
        let mut doc = doc_with_zone();
        let mut first = Movement::new("I");
        let a = measure(4, "z1");
        let mut b = measure(5, "z1");
        b.label = Some("5a".to_string());
        let (a_id, b_id) = (a.id.clone(), b.id.clone());
        first.sections[0].items.push(SectionItem::Measure(a));
        first.sections[0].items.push(SectionItem::Measure(b));
        let movement_id = first.id.clone();
        doc.movements.push(Arc::new(first));

        let annotation = zone_id_to_annotation(&doc, "z1").unwrap();
        assert_eq!(annotation.label(), Some("4–5a"));
        assert_eq!(
            annotation.datasets(),
            vec![
                format!("measure#{}, measure#{}", a_id, b_id).as_str(),
                format!("mdiv#{}", movement_id).as_str(),
                "mov_0, mov_0",
            ]
        );
    }

    #[test]
    fn test_json_shape_and_round_trip() {
        let doc = doc_with_zone();
        let annotation = zone_id_to_annotation(&doc, "z1").unwrap();
        let json = serde_json::to_value(&annotation).unwrap();
        assert_eq!(json["type"], "Annotation");
        assert_eq!(json["@context"], ANNOTATION_CONTEXT);
        assert_eq!(json["body"][0]["type"], "TextualBody");
        assert_eq!(json["body"][1]["selector"]["type"], "CssSelector");
        assert_eq!(json["target"]["selector"]["conformsTo"], MEDIA_FRAGMENTS);

        let back: Annotation = serde_json::from_value(json).unwrap();
        let zone = annotation_to_zone(&back).unwrap();
        assert_eq!(&zone, doc.zone("z1").unwrap());
    }

    #[test]
    fn test_incoming_annotation_with_foreign_body() {
        let json = r##"{
            "type": "Annotation",
            "body": [{"type": "SpecificResource", "source": "x"}],
            "target": {"source": "img", "selector": {"type": "FragmentSelector", "value": "xywh=pixel:1,2,3,4"}},
            "id": "#abc"
        }"##;
        let annotation: Annotation = serde_json::from_str(json).unwrap();
        assert_eq!(annotation.body, vec![AnnotationBody::Unknown]);
        let zone = annotation_to_zone(&annotation).unwrap();
        assert_eq!(zone.id, "abc");
        assert_eq!(zone.rect, Rect::new(1, 2, 4, 6));
    }

    #[test]
    fn test_detector_rect_rounds_and_prefixes() {
        let zone = detector_rect_to_zone(&DetectorRect {
            ulx: 0.4,
            uly: 1.5,
            lrx: 99.5,
            lry: 100.2,
        });
        assert!(zone.id.starts_with('d'));
        assert_eq!(zone.rect, Rect::new(0, 2, 100, 100));
    }

    #[test]
    fn test_page_annotations_skip_seed_and_excluded() {
        let mut doc = doc_with_zone();
        doc.page_mut(0).unwrap().zones.push(Zone::new("z2", Rect::new(0, 0, 5, 5)));
        let ids: Vec<String> = page_annotations(&doc, 0, Some("z2")).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["z1".to_string()]);
        assert!(page_annotations(&doc, 3, None).is_empty());
    }
}
