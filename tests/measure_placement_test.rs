// Test: zones drawn on the page become measures in reading order
//
// Rows are detected from the zone tops; a zone to the right of a row goes
// after that row's last measure, a zone in a new row gets a system break,
// and the first zone of a new page gets a page break.

use facsimile_editor_wasm::converters::annotation::Annotation;
use facsimile_editor_wasm::models::{Document, EditContext, Page, Rect, SectionItem};
use facsimile_editor_wasm::structure::operations as ops;
use facsimile_editor_wasm::structure::numbering_violations;
use pretty_assertions::assert_eq;
use serde_json::json;

fn annotation(id: &str, rect: Rect) -> Annotation {
    serde_json::from_value(json!({
        "type": "Annotation",
        "id": id,
        "target": {
            "source": "img",
            "selector": {
                "type": "FragmentSelector",
                "conformsTo": "http://www.w3.org/TR/media-frags/",
                "value": format!("xywh=pixel:{},{},{},{}", rect.ulx, rect.uly, rect.width(), rect.height())
            }
        }
    }))
    .unwrap()
}

fn draw(doc: &mut Document, ctx: &mut EditContext, id: &str, rect: Rect) {
    let out = ops::create_zone(doc, ctx, &annotation(id, rect)).unwrap();
    *doc = out.document;
    *ctx = out.context;
}

fn start(pages: usize) -> (Document, EditContext) {
    let mut doc = Document::new();
    for i in 0..pages {
        doc.push_page(Page::new(i + 1, format!("{}r", i + 1), format!("img{}", i), Some((2000, 3000))));
    }
    (doc, EditContext::on_page(0))
}

/// Stream of the first movement: zone id for measures, `|` for system and
/// `||` for page breaks
fn stream(doc: &Document) -> Vec<String> {
    doc.movements[0].sections[0]
        .items
        .iter()
        .map(|item| match item {
            SectionItem::Measure(m) => format!("{}:{}", m.facs.join("+"), m.n),
            SectionItem::SystemBreak(_) => "|".to_string(),
            SectionItem::PageBreak(_) => "||".to_string(),
        })
        .collect()
}

#[test]
fn test_zone_right_of_system_goes_after_its_last_measure() {
    let (mut doc, mut ctx) = start(1);
    draw(&mut doc, &mut ctx, "z1", Rect::new(0, 0, 100, 100));
    draw(&mut doc, &mut ctx, "z2", Rect::new(150, 0, 250, 100));
    draw(&mut doc, &mut ctx, "z3", Rect::new(0, 300, 100, 400));
    assert_eq!(stream(&doc), vec!["||", "z1:1", "z2:2", "|", "z3:3"]);

    // top within 0.8 x 100 of the first row, right of z2
    draw(&mut doc, &mut ctx, "z4", Rect::new(300, 30, 400, 130));

    assert_eq!(stream(&doc), vec!["||", "z1:1", "z2:2", "z4:3", "|", "z3:4"]);
    assert!(numbering_violations(&doc).is_empty());
}

#[test]
fn test_zone_before_existing_row_shifts_numbers() {
    let (mut doc, mut ctx) = start(1);
    draw(&mut doc, &mut ctx, "z2", Rect::new(150, 0, 250, 100));
    draw(&mut doc, &mut ctx, "z3", Rect::new(0, 300, 100, 400));
    draw(&mut doc, &mut ctx, "z1", Rect::new(0, 0, 100, 100));

    assert_eq!(stream(&doc), vec!["||", "z1:1", "z2:2", "|", "z3:3"]);
}

#[test]
fn test_first_zone_of_next_page_gets_page_break() {
    let (mut doc, mut ctx) = start(2);
    draw(&mut doc, &mut ctx, "a1", Rect::new(0, 0, 100, 100));
    draw(&mut doc, &mut ctx, "a2", Rect::new(150, 0, 250, 100));

    let out = ops::set_current_page(&doc, &ctx, 1);
    doc = out.document;
    ctx = out.context;
    draw(&mut doc, &mut ctx, "b1", Rect::new(0, 0, 100, 100));

    assert_eq!(stream(&doc), vec!["||", "a1:1", "a2:2", "||", "b1:3"]);
    let pb_pages: Vec<&str> = doc.movements[0].sections[0]
        .items
        .iter()
        .filter_map(|item| match item {
            SectionItem::PageBreak(pb) => Some(pb.page_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(pb_pages, vec![doc.pages[0].id.as_str(), doc.pages[1].id.as_str()]);
}

#[test]
fn test_zone_on_earlier_page_goes_in_front() {
    let (mut doc, mut ctx) = start(2);
    let out = ops::set_current_page(&doc, &ctx, 1);
    doc = out.document;
    ctx = out.context;
    draw(&mut doc, &mut ctx, "b1", Rect::new(0, 0, 100, 100));

    let out = ops::set_current_page(&doc, &ctx, 0);
    doc = out.document;
    ctx = out.context;
    draw(&mut doc, &mut ctx, "a1", Rect::new(0, 0, 100, 100));

    assert_eq!(stream(&doc), vec!["||", "a1:1", "||", "b1:2"]);
}
