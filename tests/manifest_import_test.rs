// Test: IIIF manifests become one page per canvas
//
// A three-canvas manifest yields exactly three pages in canvas order, each
// with a seed zone spanning the resolved image size.

use facsimile_editor_wasm::iiif_import::{import_manifest, ImageInfoSource, ImportError};
use facsimile_editor_wasm::models::{Rect, ZoneKind};
use facsimile_editor_wasm::session::Session;
use facsimile_editor_wasm::Error;
use pretty_assertions::assert_eq;
use serde_json::json;

/// Image sizes keyed by the service URL
struct StaticSizes;

impl ImageInfoSource for StaticSizes {
    fn dimensions(&self, url: &str) -> Result<(u32, u32), ImportError> {
        match url {
            "https://iiif.example.org/p1/info.json" => Ok((1000, 1400)),
            "https://iiif.example.org/p2/info.json" => Ok((1010, 1410)),
            _ => Err(ImportError::Http(format!("404 for {}", url))),
        }
    }
}

fn v3_manifest(canvases: usize) -> String {
    let items: Vec<_> = (1..=canvases)
        .map(|i| {
            json!({
                "id": format!("https://iiif.example.org/canvas/{}", i),
                "type": "Canvas",
                "label": { "none": [format!("p. {}", i)] },
                "width": 900,
                "height": 1300,
                "items": [{
                    "type": "AnnotationPage",
                    "items": [{
                        "type": "Annotation",
                        "body": {
                            "type": "Image",
                            "service": [{ "id": format!("https://iiif.example.org/p{}", i), "type": "ImageService3" }]
                        }
                    }]
                }]
            })
        })
        .collect();
    json!({
        "@context": "http://iiif.io/api/presentation/3/context.json",
        "id": "https://iiif.example.org/manifest.json",
        "type": "Manifest",
        "label": { "en": ["Three pages"] },
        "items": items
    })
    .to_string()
}

#[test]
fn test_three_canvases_become_three_pages() {
    let doc = import_manifest(&v3_manifest(3), "https://iiif.example.org/manifest.json", &StaticSizes).unwrap();

    assert_eq!(doc.pages.len(), 3);
    let labels: Vec<&str> = doc.pages.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["p. 1", "p. 2", "p. 3"]);
    let ns: Vec<usize> = doc.pages.iter().map(|p| p.n).collect();
    assert_eq!(ns, vec![1, 2, 3]);

    for page in &doc.pages {
        assert_eq!(page.zones.len(), 1);
        assert_eq!(page.zones[0].kind, ZoneKind::Page);
        assert!(page.graphic.target.ends_with("/info.json"));
    }
    assert_eq!(doc.pages[0].zones[0].rect, Rect::new(0, 0, 1000, 1400));
    assert_eq!(doc.pages[1].zones[0].rect, Rect::new(0, 0, 1010, 1410));
    // failed lookup: canvas size
    assert_eq!(doc.pages[2].zones[0].rect, Rect::new(0, 0, 900, 1300));

    assert_eq!(doc.meta.title.as_deref(), Some("Three pages"));
    assert_eq!(doc.meta.composer, None);
    assert_eq!(doc.meta.manifest_url.as_deref(), Some("https://iiif.example.org/manifest.json"));
}

#[test]
fn test_rejected_manifest_leaves_session_untouched() {
    let mut session = Session::default();
    session
        .import_manifest(&v3_manifest(2), "https://iiif.example.org/manifest.json", &[])
        .unwrap();
    let before = session.document().unwrap().id.clone();

    let bogus = json!({ "@context": "http://iiif.io/api/presentation/2/context.json", "@type": "sc:Collection" });
    let err = session.import_manifest(&bogus.to_string(), "u", &[]).unwrap_err();

    assert!(matches!(err, Error::Import(ImportError::NotAManifest(_))));
    assert_eq!(session.document().unwrap().id, before);
    assert_eq!(session.document().unwrap().pages.len(), 2);
}

#[test]
fn test_imported_document_survives_mei_export() {
    let mut session = Session::default();
    session
        .import_manifest(&v3_manifest(2), "https://iiif.example.org/manifest.json", &[Some((10, 20)), None])
        .unwrap();

    let xml = session.export_mei().unwrap();
    assert!(xml.contains(r#"target="https://iiif.example.org/manifest.json""#));
    assert!(xml.contains(r#"<graphic xml:id="#));

    let mut reloaded = Session::default();
    reloaded.load_mei(&xml).unwrap();
    let doc = reloaded.document().unwrap();
    assert_eq!(doc.pages.len(), 2);
    assert_eq!(doc.pages[0].width, Some(10));
    assert_eq!(doc.pages[1].height, Some(1300));
}
