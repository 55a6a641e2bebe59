// Test: deleting zones removes their measures and renumbers what follows
//
// Scenario: one page, one system, Z1 (left 0) -> measure 1 and Z2
// (left 100) -> measure 2. Deleting Z1 leaves a single measure numbered 1.

use facsimile_editor_wasm::models::{ContentPolicy, Document, EditContext, EditMode, Page, Rect, SectionItem, Zone};
use facsimile_editor_wasm::structure::operations as ops;
use facsimile_editor_wasm::structure::zones::place_zone;
use facsimile_editor_wasm::structure::numbering_violations;
use pretty_assertions::assert_eq;

fn start() -> (Document, EditContext) {
    let mut doc = Document::new();
    doc.push_page(Page::new(1, "1r", "img", Some((2000, 3000))));
    (doc, EditContext::on_page(0))
}

fn draw(doc: &mut Document, ctx: &mut EditContext, id: &str, rect: Rect) {
    let page = ctx.current_page;
    place_zone(doc, ctx, page, Zone::new(id, rect)).expect("zone placed");
}

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
fn test_delete_first_zone_renumbers_second() {
    let (mut doc, mut ctx) = start();
    draw(&mut doc, &mut ctx, "Z1", Rect::new(0, 0, 80, 100));
    draw(&mut doc, &mut ctx, "Z2", Rect::new(100, 0, 180, 100));
    let numbers: Vec<i64> = doc.measures().map(|m| m.n).collect();
    assert_eq!(numbers, vec![1, 2]);

    let out = ops::remove_zone(&doc, &ctx, "Z1");

    let measures: Vec<_> = out.document.measures().collect();
    assert_eq!(measures.len(), 1);
    assert_eq!(measures[0].n, 1);
    assert_eq!(measures[0].facs, vec!["Z2".to_string()]);
    assert!(out.document.zone("Z1").is_none());
    // the input snapshot still has both
    assert_eq!(doc.measure_count(), 2);
}

#[test]
fn test_deleting_inserted_zone_restores_numbering() {
    let (mut doc, mut ctx) = start();
    draw(&mut doc, &mut ctx, "a", Rect::new(200, 0, 300, 100));
    draw(&mut doc, &mut ctx, "b", Rect::new(400, 0, 500, 100));
    draw(&mut doc, &mut ctx, "c", Rect::new(0, 300, 100, 400));
    let before = stream(&doc);
    let ids_before: Vec<String> = doc.measures().map(|m| m.id.clone()).collect();

    // left of everything: first in reading order
    draw(&mut doc, &mut ctx, "x", Rect::new(0, 0, 100, 100));
    assert_eq!(stream(&doc), vec!["||", "x:1", "a:2", "b:3", "|", "c:4"]);

    let out = ops::remove_zone(&doc, &ctx, "x");
    assert_eq!(stream(&out.document), before);
    let ids_after: Vec<String> = out.document.measures().map(|m| m.id.clone()).collect();
    assert_eq!(ids_after, ids_before);
}

#[test]
fn test_deleting_shared_zone_keeps_measure() {
    let (mut doc, mut ctx) = start();
    draw(&mut doc, &mut ctx, "a", Rect::new(0, 0, 100, 100));
    ctx = ctx.with_mode(EditMode::AdditionalZone);
    draw(&mut doc, &mut ctx, "a2", Rect::new(0, 300, 100, 400));
    assert_eq!(doc.measure_count(), 1);
    assert_eq!(doc.measures().next().unwrap().facs, vec!["a".to_string(), "a2".to_string()]);

    let out = ops::remove_zone(&doc, &ctx, "a");
    assert_eq!(out.document.measure_count(), 1);
    assert_eq!(out.document.measures().next().unwrap().facs, vec!["a2".to_string()]);
}

#[test]
fn test_toggle_merges_and_splits() {
    let (mut doc, mut ctx) = start();
    draw(&mut doc, &mut ctx, "a", Rect::new(0, 0, 100, 100));
    draw(&mut doc, &mut ctx, "b", Rect::new(150, 0, 250, 100));
    draw(&mut doc, &mut ctx, "c", Rect::new(300, 0, 400, 100));

    let merged = ops::toggle_zone(&doc, &ctx, "b");
    assert_eq!(stream(&merged.document), vec!["||", "a+b:1", "c:2"]);
    assert!(numbering_violations(&merged.document).is_empty());

    let split = ops::toggle_zone(&merged.document, &merged.context, "b");
    assert_eq!(stream(&split.document), vec!["||", "a:1", "b:2", "c:3"]);
}

#[test]
fn test_existing_music_links_unlinked_measures_in_order() {
    let (mut doc, mut ctx) = start();
    draw(&mut doc, &mut ctx, "a", Rect::new(0, 0, 100, 100));
    draw(&mut doc, &mut ctx, "b", Rect::new(150, 0, 250, 100));
    // strip the zones, keeping measures that await facsimile links
    for page in doc.pages.iter_mut() {
        std::sync::Arc::make_mut(page).zones.retain(|z| !z.is_measure_zone());
    }
    for pos in doc.measure_positions() {
        doc.measure_at_mut(pos).unwrap().facs.clear();
    }

    ctx = ctx.with_policy(ContentPolicy::ExistingMusic).with_mode(EditMode::ManualRect);
    draw(&mut doc, &mut ctx, "p", Rect::new(0, 0, 100, 100));
    draw(&mut doc, &mut ctx, "q", Rect::new(0, 500, 100, 600));

    let facs: Vec<Vec<String>> = doc.measures().map(|m| m.facs.clone()).collect();
    assert_eq!(facs, vec![vec!["p".to_string()], vec!["q".to_string()]]);
    assert_eq!(doc.measure_count(), 2);
}
