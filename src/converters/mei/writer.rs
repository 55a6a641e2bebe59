//! MEI writer

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::{MeiError, MEI_NS, MEI_VERSION};
use crate::models::{Document, DocumentMeta, LayerElement, Measure, Movement, Page, SectionItem, Staff};

type Attrs<'a> = &'a [(&'a str, String)];

/// Thin wrapper mapping writer failures to `MeiError`
struct MeiWriter {
    inner: Writer<Cursor<Vec<u8>>>,
}

impl MeiWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), MeiError> {
        self.inner
            .write_event(event)
            .map_err(|e| MeiError::Xml(e.to_string()))
    }

    fn element(name: &str, attrs: Attrs<'_>) -> BytesStart<'static> {
        let mut element = BytesStart::new(name.to_string());
        for (key, value) in attrs {
            element.push_attribute((*key, value.as_str()));
        }
        element
    }

    fn start(&mut self, name: &str, attrs: Attrs<'_>) -> Result<(), MeiError> {
        self.event(Event::Start(Self::element(name, attrs)))
    }

    fn empty(&mut self, name: &str, attrs: Attrs<'_>) -> Result<(), MeiError> {
        self.event(Event::Empty(Self::element(name, attrs)))
    }

    fn end(&mut self, name: &str) -> Result<(), MeiError> {
        self.event(Event::End(BytesEnd::new(name.to_string())))
    }

    fn text_element(&mut self, name: &str, attrs: Attrs<'_>, text: &str) -> Result<(), MeiError> {
        self.start(name, attrs)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    /// Pre-serialized markup, written unescaped. Snippets carry their own
    /// prefix declarations (see the reader), only the MEI namespace is declared here
    fn raw(&mut self, xml: &str) -> Result<(), MeiError> {
        self.event(Event::Text(BytesText::from_escaped(xml)))
    }

    fn finish(self) -> Result<String, MeiError> {
        String::from_utf8(self.inner.into_inner().into_inner()).map_err(|e| MeiError::Xml(e.to_string()))
    }
}

fn id(value: &str) -> (&'static str, String) {
    ("xml:id", value.to_string())
}

/// Serialize a document to an MEI string
pub fn write_mei(doc: &Document) -> Result<String, MeiError> {
    let mut w = MeiWriter::new();
    w.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    w.start(
        "mei",
        &[
            ("xmlns", MEI_NS.to_string()),
            ("meiversion", MEI_VERSION.to_string()),
            id(&doc.id),
        ],
    )?;
    write_head(&mut w, &doc.meta)?;

    w.start("music", &[])?;
    w.start("facsimile", &[])?;
    for page in &doc.pages {
        write_surface(&mut w, page)?;
    }
    w.end("facsimile")?;

    w.start("body", &[])?;
    for movement in &doc.movements {
        write_movement(&mut w, movement)?;
    }
    w.end("body")?;
    w.end("music")?;
    w.end("mei")?;

    let xml = w.finish()?;
    log::debug!("wrote MEI: {} pages, {} movements, {} bytes", doc.pages.len(), doc.movements.len(), xml.len());
    Ok(xml)
}

fn write_head(w: &mut MeiWriter, meta: &DocumentMeta) -> Result<(), MeiError> {
    w.start("meiHead", &[])?;
    w.start("fileDesc", &[])?;

    w.start("titleStmt", &[])?;
    w.text_element("title", &[], meta.title.as_deref().unwrap_or_default())?;
    if let Some(composer) = &meta.composer {
        w.start("composer", &[])?;
        w.text_element("persName", &[], composer)?;
        w.end("composer")?;
    }
    w.end("titleStmt")?;
    w.empty("pubStmt", &[])?;

    if meta.source_id.is_some() || meta.manifest_url.is_some() || meta.shelfmark.is_some() {
        w.start("sourceDesc", &[])?;
        let mut attrs = Vec::new();
        if let Some(source_id) = &meta.source_id {
            attrs.push(id(source_id));
        }
        if let Some(url) = &meta.manifest_url {
            attrs.push(("target", url.clone()));
        }
        w.start("source", &attrs)?;
        if let Some(shelfmark) = &meta.shelfmark {
            w.start("physLoc", &[])?;
            w.text_element("identifier", &[], shelfmark)?;
            w.end("physLoc")?;
        }
        w.end("source")?;
        w.end("sourceDesc")?;
    }
    w.end("fileDesc")?;

    if let Some(date) = &meta.change_date {
        w.start("revisionDesc", &[])?;
        w.start("change", &[])?;
        w.empty("date", &[("isodate", date.clone())])?;
        w.start("changeDesc", &[])?;
        w.start("p", &[])?;
        w.event(Event::Text(BytesText::new("Facsimile imported")))?;
        if let Some(source_id) = &meta.source_id {
            w.empty("ptr", &[("target", format!("#{}", source_id))])?;
        }
        w.end("p")?;
        w.end("changeDesc")?;
        w.end("change")?;
        w.end("revisionDesc")?;
    }
    w.end("meiHead")
}

fn write_surface(w: &mut MeiWriter, page: &Page) -> Result<(), MeiError> {
    let mut attrs = vec![
        id(&page.id),
        ("n", page.n.to_string()),
        ("label", page.label.clone()),
        ("ulx", "0".to_string()),
        ("uly", "0".to_string()),
    ];
    if let (Some(width), Some(height)) = (page.width, page.height) {
        attrs.push(("lrx", width.to_string()));
        attrs.push(("lry", height.to_string()));
    }
    w.start("surface", &attrs)?;

    let mut graphic = vec![
        id(&page.graphic.id),
        ("type", "facsimile".to_string()),
        ("target", page.graphic.target.clone()),
    ];
    if let (Some(width), Some(height)) = (page.width, page.height) {
        graphic.push(("width", width.to_string()));
        graphic.push(("height", height.to_string()));
    }
    w.empty("graphic", &graphic)?;

    for zone in &page.zones {
        w.empty(
            "zone",
            &[
                id(&zone.id),
                ("type", zone.kind.as_mei_type().to_string()),
                ("ulx", zone.rect.ulx.to_string()),
                ("uly", zone.rect.uly.to_string()),
                ("lrx", zone.rect.lrx.to_string()),
                ("lry", zone.rect.lry.to_string()),
            ],
        )?;
    }
    w.end("surface")
}

fn write_movement(w: &mut MeiWriter, movement: &Movement) -> Result<(), MeiError> {
    w.start("mdiv", &[id(&movement.id), ("label", movement.label.clone())])?;
    w.start("score", &[])?;
    for section in &movement.sections {
        if section.items.is_empty() {
            w.empty("section", &[id(&section.id)])?;
            continue;
        }
        w.start("section", &[id(&section.id)])?;
        for item in &section.items {
            match item {
                SectionItem::Measure(measure) => write_measure(w, measure)?,
                SectionItem::PageBreak(pb) => w.empty(
                    "pb",
                    &[id(&pb.id), ("n", pb.n.to_string()), ("facs", format!("#{}", pb.page_id))],
                )?,
                SectionItem::SystemBreak(sb) => w.empty("sb", &[id(&sb.id)])?,
            }
        }
        w.end("section")?;
    }
    w.end("score")?;
    w.end("mdiv")
}

fn write_measure(w: &mut MeiWriter, measure: &Measure) -> Result<(), MeiError> {
    let mut attrs = vec![id(&measure.id), ("n", measure.n.to_string())];
    if let Some(label) = &measure.label {
        attrs.push(("label", label.clone()));
    }
    if measure.has_facs() {
        attrs.push(("facs", measure.facs_attr()));
    }
    if measure.staves.is_empty() {
        return w.empty("measure", &attrs);
    }
    w.start("measure", &attrs)?;
    for staff in &measure.staves {
        write_staff(w, staff)?;
    }
    w.end("measure")
}

fn write_staff(w: &mut MeiWriter, staff: &Staff) -> Result<(), MeiError> {
    w.start("staff", &[("n", staff.n.to_string())])?;
    for layer in &staff.layers {
        if layer.elements.is_empty() {
            w.empty("layer", &[("n", layer.n.to_string())])?;
            continue;
        }
        w.start("layer", &[("n", layer.n.to_string())])?;
        for element in &layer.elements {
            match element {
                LayerElement::MultiRest { num } => w.empty("multiRest", &[("num", num.to_string())])?,
                LayerElement::Other { xml, .. } => w.raw(xml)?,
            }
        }
        w.end("layer")?;
    }
    w.end("staff")
}
