//! MEI reader
//!
//! Reads the facsimile and the measure stream back into a `Document`.
//! Layer content other than `multiRest` is kept as raw markup.

use std::sync::Arc;

use roxmltree::Node;

use super::{MeiError, XML_NS};
use crate::models::{
    new_id, Document, DocumentMeta, Graphic, IdKind, Layer, LayerElement, Measure, Movement, Page, PageBreak, Rect,
    Section, SectionItem, Staff, SystemBreak, Zone, ZoneKind,
};

fn is(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is(n, name))
}

fn descendant<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.descendants().find(|n| is(n, name))
}

fn xml_id(node: Node<'_, '_>) -> Option<String> {
    node.attribute((XML_NS, "id")).map(str::to_string)
}

fn text_of(node: Node<'_, '_>) -> Option<String> {
    let text: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn invalid(node: Node<'_, '_>, attribute: &str, value: &str) -> MeiError {
    MeiError::InvalidAttribute {
        element: node.tag_name().name().to_string(),
        attribute: attribute.to_string(),
        value: value.to_string(),
    }
}

/// Parse a numeric attribute; absent is `None`, unparsable is an error
fn number_attr<T: std::str::FromStr>(node: Node<'_, '_>, name: &str) -> Result<Option<T>, MeiError> {
    match node.attribute(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(node, name, raw)),
    }
}

/// Parse a pixel coordinate, rounding fractional values
fn coord_attr(node: Node<'_, '_>, name: &str) -> Result<i64, MeiError> {
    match number_attr::<f64>(node, name)? {
        Some(value) if value.is_finite() => Ok(value.round() as i64),
        Some(_) => Err(invalid(node, name, node.attribute(name).unwrap_or_default())),
        None => Ok(0),
    }
}

/// Lenient numeric attribute: unparsable values are logged and dropped
fn lenient_attr<T: std::str::FromStr>(node: Node<'_, '_>, name: &str) -> Option<T> {
    number_attr(node, name).unwrap_or_else(|e| {
        log::warn!("{}", e);
        None
    })
}

/// Dimension from the graphic, else from the surface extent
fn dimension(graphic: Option<Node<'_, '_>>, surface: Node<'_, '_>, name: &str, extent: &str) -> Result<Option<u32>, MeiError> {
    if let Some(value) = graphic.map(|g| number_attr::<u32>(g, name)).transpose()?.flatten() {
        return Ok(Some(value));
    }
    number_attr::<u32>(surface, extent)
}

fn id_refs(value: &str) -> Vec<String> {
    value
        .split_whitespace()
        .map(|r| r.trim_start_matches('#').to_string())
        .filter(|r| !r.is_empty())
        .collect()
}

/// Parse an MEI string into a document
pub fn read_mei(xml: &str) -> Result<Document, MeiError> {
    let tree = roxmltree::Document::parse(xml).map_err(|e| MeiError::Xml(e.to_string()))?;
    let root = tree.root_element();
    if !is(&root, "mei") {
        return Err(MeiError::MissingElement("mei".to_string()));
    }
    let music = descendant(root, "music").ok_or_else(|| MeiError::MissingElement("music".to_string()))?;

    let mut doc = Document::new();
    if let Some(id) = xml_id(root) {
        doc.id = id;
    }
    if let Some(head) = child(root, "meiHead") {
        doc.meta = read_head(head);
    }

    if let Some(facsimile) = descendant(music, "facsimile") {
        for (index, surface) in facsimile.children().filter(|n| is(n, "surface")).enumerate() {
            doc.pages.push(Arc::new(read_surface(surface, index)?));
        }
    }

    if let Some(body) = descendant(music, "body") {
        for mdiv in body
            .descendants()
            .filter(|n| is(n, "mdiv") && child(*n, "score").is_some())
        {
            let movement = read_movement(mdiv, doc.movements.len(), &doc.pages)?;
            doc.movements.push(Arc::new(movement));
        }
    }

    log::info!(
        "read MEI: {} pages, {} movements, {} measures",
        doc.pages.len(),
        doc.movements.len(),
        doc.measure_count()
    );
    Ok(doc)
}

fn read_head(head: Node<'_, '_>) -> DocumentMeta {
    let mut meta = DocumentMeta::default();
    if let Some(title_stmt) = descendant(head, "titleStmt") {
        meta.title = child(title_stmt, "title").and_then(text_of);
        meta.composer = child(title_stmt, "composer").and_then(text_of);
    }
    if let Some(source) = descendant(head, "source") {
        meta.source_id = xml_id(source);
        meta.manifest_url = source.attribute("target").map(str::to_string);
        meta.shelfmark = descendant(source, "identifier").and_then(text_of);
    }
    meta.change_date = descendant(head, "change")
        .and_then(|c| descendant(c, "date"))
        .and_then(|d| d.attribute("isodate"))
        .map(str::to_string);
    meta
}

fn read_surface(surface: Node<'_, '_>, index: usize) -> Result<Page, MeiError> {
    let graphic_node = child(surface, "graphic");
    let width = dimension(graphic_node, surface, "width", "lrx")?;
    let height = dimension(graphic_node, surface, "height", "lry")?;

    let n = lenient_attr::<usize>(surface, "n").unwrap_or(index + 1);
    let graphic = Graphic {
        id: graphic_node
            .and_then(xml_id)
            .unwrap_or_else(|| new_id(IdKind::Graphic)),
        target: graphic_node
            .and_then(|g| g.attribute("target"))
            .map(|t| t.trim().to_string())
            .unwrap_or_default(),
    };

    let mut zones = Vec::new();
    for zone in surface.children().filter(|n| is(n, "zone")) {
        zones.push(Zone {
            id: xml_id(zone).unwrap_or_else(|| new_id(IdKind::DrawnZone)),
            kind: ZoneKind::from_mei_type(zone.attribute("type")),
            rect: Rect::new(
                coord_attr(zone, "ulx")?,
                coord_attr(zone, "uly")?,
                coord_attr(zone, "lrx")?,
                coord_attr(zone, "lry")?,
            ),
        });
    }

    Ok(Page {
        id: xml_id(surface).unwrap_or_else(|| new_id(IdKind::Surface)),
        n,
        label: surface
            .attribute("label")
            .map(str::to_string)
            .unwrap_or_else(|| n.to_string()),
        width,
        height,
        graphic,
        zones,
    })
}

fn read_movement(mdiv: Node<'_, '_>, index: usize, pages: &[Arc<Page>]) -> Result<Movement, MeiError> {
    let mut movement = Movement {
        id: xml_id(mdiv).unwrap_or_else(|| new_id(IdKind::Movement)),
        label: mdiv
            .attribute("label")
            .map(str::to_string)
            .unwrap_or_else(|| format!("Movement {}", index + 1)),
        sections: Vec::new(),
    };
    let mut order = 0;
    if let Some(score) = child(mdiv, "score") {
        for section in score.children().filter(|n| is(n, "section")) {
            let mut items = Vec::new();
            read_section_items(section, pages, &mut items, &mut order)?;
            movement.sections.push(Section {
                id: xml_id(section).unwrap_or_else(|| new_id(IdKind::Section)),
                items,
            });
        }
    }
    if movement.sections.is_empty() {
        movement.sections.push(Section::new());
    }
    Ok(movement)
}

/// Collect measures and breaks, flattening nested sections and endings
fn read_section_items(
    node: Node<'_, '_>,
    pages: &[Arc<Page>],
    items: &mut Vec<SectionItem>,
    order: &mut i64,
) -> Result<(), MeiError> {
    for item in node.children().filter(|n| n.is_element()) {
        match item.tag_name().name() {
            "measure" => {
                *order += 1;
                items.push(SectionItem::Measure(read_measure(item, *order)?));
            }
            "pb" => items.push(SectionItem::PageBreak(read_page_break(item, pages))),
            "sb" => items.push(SectionItem::SystemBreak(SystemBreak {
                id: xml_id(item).unwrap_or_else(|| new_id(IdKind::SystemBreak)),
            })),
            "section" | "ending" => read_section_items(item, pages, items, order)?,
            other => log::debug!("skipping <{}> in section", other),
        }
    }
    Ok(())
}

/// Folio numbers such as "1r" take `n` from the surface the break points at
fn read_page_break(node: Node<'_, '_>, pages: &[Arc<Page>]) -> PageBreak {
    let page_id = node
        .attribute("facs")
        .and_then(|f| id_refs(f).into_iter().next())
        .unwrap_or_default();
    let n = lenient_attr::<usize>(node, "n")
        .or_else(|| pages.iter().find(|p| p.id == page_id).map(|p| p.n))
        .unwrap_or(0);
    PageBreak {
        id: xml_id(node).unwrap_or_else(|| new_id(IdKind::PageBreak)),
        page_id,
        n,
    }
}

fn read_measure(node: Node<'_, '_>, order: i64) -> Result<Measure, MeiError> {
    let mut label = node.attribute("label").map(str::to_string);
    let n = match node.attribute("n") {
        None => order,
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(n) => n,
            Err(_) => {
                // Non-numeric numbers such as "12a" survive as the label
                label.get_or_insert_with(|| raw.to_string());
                order
            }
        },
    };

    let mut staves = Vec::new();
    for (si, staff) in node.children().filter(|n| is(n, "staff")).enumerate() {
        let mut layers = Vec::new();
        for (li, layer) in staff.children().filter(|n| is(n, "layer")).enumerate() {
            let mut elements = Vec::new();
            for element in layer.children().filter(|n| n.is_element()) {
                elements.push(read_layer_element(element)?);
            }
            layers.push(Layer {
                n: number_attr::<u32>(layer, "n")?.unwrap_or(li as u32 + 1),
                elements,
            });
        }
        staves.push(Staff {
            n: number_attr::<u32>(staff, "n")?.unwrap_or(si as u32 + 1),
            layers,
        });
    }

    Ok(Measure {
        id: xml_id(node).unwrap_or_else(|| new_id(IdKind::Measure)),
        n,
        label,
        facs: node.attribute("facs").map(id_refs).unwrap_or_default(),
        staves,
    })
}

fn read_layer_element(element: Node<'_, '_>) -> Result<LayerElement, MeiError> {
    if is(&element, "multiRest") {
        let num = number_attr::<u32>(element, "num")?.unwrap_or(1);
        return Ok(LayerElement::MultiRest { num });
    }
    let source = element.document().input_text();
    Ok(LayerElement::Other {
        name: element.tag_name().name().to_string(),
        xml: with_namespaces(element, &source[element.range()]),
    })
}

/// Declare on the snippet's start tag the prefixes it uses but inherits
/// from an ancestor, so the markup stays well-formed when written back
fn with_namespaces(element: Node<'_, '_>, raw: &str) -> String {
    let declarations: String = element
        .namespaces()
        .filter_map(|ns| ns.name().map(|prefix| (prefix, ns.uri())))
        .filter(|(prefix, _)| *prefix != "xml")
        .filter(|(prefix, _)| raw.contains(&format!("{}:", prefix)) && !raw.contains(&format!("xmlns:{}=", prefix)))
        .map(|(prefix, uri)| format!(" xmlns:{}=\"{}\"", prefix, quick_xml::escape::escape(uri)))
        .collect();
    if declarations.is_empty() {
        return raw.to_string();
    }
    let name_end = raw[1..]
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .map_or(raw.len(), |i| i + 1);
    format!("{}{}{}", &raw[..name_end], declarations, &raw[name_end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<mei xmlns="http://www.music-encoding.org/ns/mei" xml:id="mdoc">
  <meiHead>
    <fileDesc>
      <titleStmt><title>Sonata</title><composer><persName>Anon.</persName></composer></titleStmt>
      <sourceDesc><source xml:id="src1" target="https://m/manifest.json"><physLoc><identifier>Mus. 1</identifier></physLoc></source></sourceDesc>
    </fileDesc>
  </meiHead>
  <music>
    <facsimile>
      <surface xml:id="s1" n="1" label="1r" lrx="500" lry="700">
        <graphic xml:id="g1" target=" https://img/1/info.json " width="1000" height="1400"/>
        <zone xml:id="seed" type="page" ulx="0" uly="0" lrx="1000" lry="1400"/>
        <zone xml:id="z1" type="measure" ulx="10" uly="20" lrx="30" lry="40"/>
      </surface>
    </facsimile>
    <body>
      <mdiv xml:id="mv1" label="I">
        <score>
          <section xml:id="sec1">
            <pb xml:id="pb1" n="1" facs="#s1"/>
            <measure xml:id="b1" n="1" facs="#z1">
              <staff n="1"><layer n="1"><note pname="c" oct="4"/><multiRest num="2"/></layer></staff>
            </measure>
            <sb xml:id="sb1"/>
            <measure xml:id="b2" n="3a"/>
            <measure xml:id="b3"/>
          </section>
        </score>
      </mdiv>
    </body>
  </music>
</mei>"##;

    #[test]
    fn test_reads_sample() {
        let doc = read_mei(SAMPLE).unwrap();
        assert_eq!(doc.id, "mdoc");
        assert_eq!(doc.meta.title.as_deref(), Some("Sonata"));
        assert_eq!(doc.meta.composer.as_deref(), Some("Anon."));
        assert_eq!(doc.meta.shelfmark.as_deref(), Some("Mus. 1"));
        assert_eq!(doc.meta.manifest_url.as_deref(), Some("https://m/manifest.json"));

        let page = &doc.pages[0];
        assert_eq!((page.width, page.height), (Some(1000), Some(1400)));
        assert_eq!(page.graphic.target, "https://img/1/info.json");
        assert_eq!(page.zones[0].kind, ZoneKind::Page);
        assert_eq!(page.zones[1].rect, Rect::new(10, 20, 30, 40));

        let items = &doc.movements[0].sections[0].items;
        assert_eq!(items.len(), 5);
        let measures: Vec<&Measure> = doc.measures().collect();
        assert_eq!(measures[0].facs, vec!["z1".to_string()]);
        assert_eq!(measures[0].multi_rest(), Some(2));
        assert!(measures[0].has_notation());
        assert_eq!(measures[1].label.as_deref(), Some("3a"));
        assert_eq!(measures[2].n, 3);
    }

    #[test]
    fn test_keeps_raw_layer_markup() {
        let doc = read_mei(SAMPLE).unwrap();
        let first = doc.measures().next().unwrap();
        match &first.staves[0].layers[0].elements[0] {
            LayerElement::Other { name, xml } => {
                assert_eq!(name, "note");
                assert_eq!(xml, r#"<note pname="c" oct="4"/>"#);
            }
            other => panic!("expected raw element, got {:?}", other),
        }
    }

    fn wrap(facsimile: &str, section: &str) -> String {
        format!(
            r#"<mei xmlns="http://www.music-encoding.org/ns/mei" xmlns:xlink="http://www.w3.org/1999/xlink"><music><facsimile>{}</facsimile><body><mdiv><score><section>{}</section></score></mdiv></body></music></mei>"#,
            facsimile, section
        )
    }

    #[test]
    fn test_folio_page_break_number_comes_from_surface() {
        let xml = wrap(
            r#"<surface xml:id="s1" n="7" label="1r"/>"#,
            r##"<pb n="1r" facs="#s1"/><measure n="1"/>"##,
        );
        let doc = read_mei(&xml).unwrap();
        match &doc.movements[0].sections[0].items[0] {
            SectionItem::PageBreak(pb) => {
                assert_eq!(pb.page_id, "s1");
                assert_eq!(pb.n, 7);
            }
            other => panic!("expected page break, got {:?}", other),
        }
    }

    #[test]
    fn test_fractional_zone_coordinates_are_rounded() {
        let xml = wrap(
            r#"<surface xml:id="s1"><zone xml:id="z1" ulx="12.5" uly="20.4" lrx="99.6" lry="140"/></surface>"#,
            "",
        );
        let doc = read_mei(&xml).unwrap();
        assert_eq!(doc.pages[0].zones[0].rect, Rect::new(13, 20, 100, 140));
    }

    #[test]
    fn test_surface_extent_only_read_without_graphic_size() {
        let xml = wrap(
            r#"<surface xml:id="s1" lrx="wide" lry="tall"><graphic target="img" width="800" height="600"/></surface>"#,
            "",
        );
        let doc = read_mei(&xml).unwrap();
        assert_eq!((doc.pages[0].width, doc.pages[0].height), (Some(800), Some(600)));
    }

    #[test]
    fn test_raw_markup_keeps_inherited_prefixes() {
        let xml = wrap(
            "",
            r##"<measure n="1"><staff n="1"><layer n="1"><note xlink:href="#x"/></layer></staff></measure>"##,
        );
        let doc = read_mei(&xml).unwrap();
        let note = match &doc.measures().next().unwrap().staves[0].layers[0].elements[0] {
            LayerElement::Other { xml, .. } => xml.clone(),
            other => panic!("expected raw element, got {:?}", other),
        };
        assert_eq!(
            note,
            r##"<note xmlns:xlink="http://www.w3.org/1999/xlink" xlink:href="#x"/>"##
        );

        let written = crate::converters::mei::write_mei(&doc).unwrap();
        let reread = read_mei(&written).unwrap();
        assert_eq!(reread.measures().next().unwrap().staves, doc.measures().next().unwrap().staves);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(read_mei("<mei"), Err(MeiError::Xml(_))));
        assert_eq!(
            read_mei("<tei/>").unwrap_err(),
            MeiError::MissingElement("mei".to_string())
        );
        let bad = r#"<mei xmlns="http://www.music-encoding.org/ns/mei"><music><facsimile><surface><zone ulx="x"/></surface></facsimile></music></mei>"#;
        assert!(matches!(
            read_mei(bad),
            Err(MeiError::InvalidAttribute { ref attribute, .. }) if attribute == "ulx"
        ));
    }
}
