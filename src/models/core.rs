//! Core data structures for the facsimile editor
//!
//! The document is a two-sided tree: the facsimile side (pages and the
//! zones drawn on them) and the symbolic side (movements, sections and the
//! measure stream with its page/system break markers).
//!
//! Pages and movements sit behind `Arc` so that cloning a `Document` only
//! copies pointers. Mutations go through `Arc::make_mut`, which copies the
//! touched subtree and leaves every other snapshot untouched.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::content::{LayerElement, Staff};
use super::ids::{new_id, IdKind};

// ============================================================================
// Geometry
// ============================================================================

/// Pixel rectangle on a page image (upper-left / lower-right corners)
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub ulx: i64,
    pub uly: i64,
    pub lrx: i64,
    pub lry: i64,
}

impl Rect {
    pub fn new(ulx: i64, uly: i64, lrx: i64, lry: i64) -> Self {
        Self { ulx, uly, lrx, lry }
    }

    /// Build a rectangle from an `x, y, w, h` quadruple
    pub fn from_xywh(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self {
            ulx: x,
            uly: y,
            lrx: x + w,
            lry: y + h,
        }
    }

    pub fn width(&self) -> i64 {
        self.lrx - self.ulx
    }

    pub fn height(&self) -> i64 {
        self.lry - self.uly
    }
}

// ============================================================================
// Facsimile side
// ============================================================================

/// What a zone stands for on its page
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ZoneKind {
    /// A measure rectangle drawn by the user or produced by the detector
    #[default]
    Measure,
    /// Seed zone spanning the whole page image
    Page,
}

impl ZoneKind {
    /// Value of the MEI `@type` attribute
    pub fn as_mei_type(&self) -> &'static str {
        match self {
            ZoneKind::Measure => "measure",
            ZoneKind::Page => "page",
        }
    }

    pub fn from_mei_type(value: Option<&str>) -> Self {
        match value {
            Some("page") => ZoneKind::Page,
            _ => ZoneKind::Measure,
        }
    }
}

/// Pixel rectangle on a page; the facsimile counterpart of a measure
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Zone {
    /// Stable identifier, never changed after creation
    pub id: String,
    pub kind: ZoneKind,
    pub rect: Rect,
}

impl Zone {
    pub fn new(id: impl Into<String>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            kind: ZoneKind::Measure,
            rect,
        }
    }

    pub fn is_measure_zone(&self) -> bool {
        self.kind == ZoneKind::Measure
    }
}

/// Image reference of a page
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Graphic {
    pub id: String,
    /// Externally resolvable image URI (e.g. an IIIF `info.json`)
    pub target: String,
}

/// A facsimile surface: one scanned page image and its zones
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Page {
    pub id: String,
    /// 1-based ordinal
    pub n: usize,
    pub label: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub graphic: Graphic,
    pub zones: Vec<Zone>,
}

impl Page {
    /// Create a page with a seed zone spanning the whole image
    pub fn new(n: usize, label: impl Into<String>, uri: impl Into<String>, size: Option<(u32, u32)>) -> Self {
        let (width, height) = match size {
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, None),
        };
        let mut page = Self {
            id: new_id(IdKind::Surface),
            n,
            label: label.into(),
            width,
            height,
            graphic: Graphic {
                id: new_id(IdKind::Graphic),
                target: uri.into(),
            },
            zones: Vec::new(),
        };
        page.zones.push(Zone {
            id: new_id(IdKind::SeedZone),
            kind: ZoneKind::Page,
            rect: page.full_rect(),
        });
        page
    }

    /// Rectangle covering the whole image (empty if the size is unknown)
    pub fn full_rect(&self) -> Rect {
        Rect::new(
            0,
            0,
            self.width.unwrap_or(0) as i64,
            self.height.unwrap_or(0) as i64,
        )
    }

    /// Set the image size and stretch the seed zone to match
    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = Some(width);
        self.height = Some(height);
        let full = self.full_rect();
        for zone in self.zones.iter_mut().filter(|z| z.kind == ZoneKind::Page) {
            zone.rect = full;
        }
    }

    /// Zones that represent measures, in stored order
    pub fn measure_zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(|z| z.is_measure_zone())
    }

    pub fn has_measure_zones(&self) -> bool {
        self.measure_zones().next().is_some()
    }

    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }
}

// ============================================================================
// Symbolic side
// ============================================================================

/// Symbolic measure with its number, optional label and facs links
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Measure {
    pub id: String,
    pub n: i64,
    /// Explicit display label overriding the number
    pub label: Option<String>,
    /// Ids of the zones depicting this measure (without the leading `#`)
    pub facs: Vec<String>,
    /// Notational content; only the multi-rest is interpreted
    pub staves: Vec<Staff>,
}

impl Measure {
    pub fn new(n: i64) -> Self {
        Self {
            id: new_id(IdKind::Measure),
            n,
            label: None,
            facs: Vec::new(),
            staves: Vec::new(),
        }
    }

    /// A fresh measure depicted by a single zone
    pub fn for_zone(zone_id: &str) -> Self {
        let mut measure = Self::new(1);
        measure.facs.push(zone_id.to_string());
        measure
    }

    pub fn has_zone(&self, zone_id: &str) -> bool {
        self.facs.iter().any(|f| f == zone_id)
    }

    pub fn has_facs(&self) -> bool {
        !self.facs.is_empty()
    }

    /// Rest count of the first multi-rest in the measure, if any
    pub fn multi_rest(&self) -> Option<u32> {
        self.staves
            .iter()
            .flat_map(|s| s.layers.iter())
            .flat_map(|l| l.elements.iter())
            .find_map(|e| match e {
                LayerElement::MultiRest { num } => Some(*num),
                _ => None,
            })
    }

    /// Number of bars this measure stands for
    pub fn span(&self) -> i64 {
        self.multi_rest().map(i64::from).unwrap_or(1)
    }

    /// True if the measure holds notation other than a multi-rest
    pub fn has_notation(&self) -> bool {
        self.staves
            .iter()
            .flat_map(|s| s.layers.iter())
            .flat_map(|l| l.elements.iter())
            .any(|e| !matches!(e, LayerElement::MultiRest { .. }))
    }

    /// Label if set, otherwise the number
    pub fn display_label(&self) -> String {
        match &self.label {
            Some(label) if !label.is_empty() => label.clone(),
            _ => self.n.to_string(),
        }
    }

    /// `facs` attribute value (`#a #b`)
    pub fn facs_attr(&self) -> String {
        self.facs
            .iter()
            .map(|f| format!("#{}", f))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Page break marker; refers to the page it starts
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PageBreak {
    pub id: String,
    pub page_id: String,
    pub n: usize,
}

impl PageBreak {
    pub fn for_page(page: &Page) -> Self {
        Self {
            id: new_id(IdKind::PageBreak),
            page_id: page.id.clone(),
            n: page.n,
        }
    }
}

/// System break marker
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SystemBreak {
    pub id: String,
}

impl SystemBreak {
    pub fn new() -> Self {
        Self {
            id: new_id(IdKind::SystemBreak),
        }
    }
}

impl Default for SystemBreak {
    fn default() -> Self {
        Self::new()
    }
}

/// One entry of a section's content stream
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum SectionItem {
    Measure(Measure),
    PageBreak(PageBreak),
    SystemBreak(SystemBreak),
}

impl SectionItem {
    pub fn as_measure(&self) -> Option<&Measure> {
        match self {
            SectionItem::Measure(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_measure_mut(&mut self) -> Option<&mut Measure> {
        match self {
            SectionItem::Measure(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, SectionItem::Measure(_))
    }

    pub fn is_page_break(&self) -> bool {
        matches!(self, SectionItem::PageBreak(_))
    }

    pub fn is_system_break(&self) -> bool {
        matches!(self, SectionItem::SystemBreak(_))
    }

    pub fn id(&self) -> &str {
        match self {
            SectionItem::Measure(m) => &m.id,
            SectionItem::PageBreak(pb) => &pb.id,
            SectionItem::SystemBreak(sb) => &sb.id,
        }
    }
}

/// Ordered stream of measures and break markers
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Section {
    pub id: String,
    pub items: Vec<SectionItem>,
}

impl Section {
    pub fn new() -> Self {
        Self {
            id: new_id(IdKind::Section),
            items: Vec::new(),
        }
    }

    pub fn measures(&self) -> impl Iterator<Item = &Measure> {
        self.items.iter().filter_map(SectionItem::as_measure)
    }
}

impl Default for Section {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-level grouping of sections (MEI `mdiv`)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Movement {
    pub id: String,
    pub label: String,
    pub sections: Vec<Section>,
}

impl Movement {
    /// New movement with one empty section
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: new_id(IdKind::Movement),
            label: label.into(),
            sections: vec![Section::new()],
        }
    }

    pub fn measures(&self) -> impl Iterator<Item = &Measure> {
        self.sections.iter().flat_map(|s| s.measures())
    }

    pub fn has_measures(&self) -> bool {
        self.measures().next().is_some()
    }

    /// True if any measure carries notation beyond a multi-rest
    pub fn has_notation(&self) -> bool {
        self.measures().any(Measure::has_notation)
    }
}

// ============================================================================
// Document
// ============================================================================

/// Descriptive metadata carried in the MEI header
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct DocumentMeta {
    pub title: Option<String>,
    /// Manifest the pages were imported from
    pub manifest_url: Option<String>,
    pub source_id: Option<String>,
    /// Shelfmark of the physical source
    pub shelfmark: Option<String>,
    pub composer: Option<String>,
    /// ISO date of the last structural change record
    pub change_date: Option<String>,
}

/// Root of the facsimile/notation tree
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub meta: DocumentMeta,
    pub pages: Vec<Arc<Page>>,
    pub movements: Vec<Arc<Movement>>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            id: new_id(IdKind::Document),
            meta: DocumentMeta::default(),
            pages: Vec::new(),
            movements: Vec::new(),
        }
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index).map(|p| p.as_ref())
    }

    pub fn page_mut(&mut self, index: usize) -> Option<&mut Page> {
        self.pages.get_mut(index).map(Arc::make_mut)
    }

    pub fn page_index(&self, page_id: &str) -> Option<usize> {
        self.pages.iter().position(|p| p.id == page_id)
    }

    pub fn movement_index(&self, movement_id: &str) -> Option<usize> {
        self.movements.iter().position(|m| m.id == movement_id)
    }

    pub fn movement_mut(&mut self, index: usize) -> Option<&mut Movement> {
        self.movements.get_mut(index).map(Arc::make_mut)
    }

    /// Append a page at the end of the facsimile, numbering it in sequence
    pub fn push_page(&mut self, mut page: Page) {
        page.n = self.pages.len() + 1;
        self.pages.push(Arc::new(page));
    }

    /// Insert a new movement after `after` (or at the end) and return its id
    pub fn create_movement(&mut self, after: Option<&str>, label_prefix: &str) -> String {
        let movement = Movement::new(format!("{} {}", label_prefix, self.movements.len() + 1));
        let id = movement.id.clone();
        let index = after
            .and_then(|a| self.movement_index(a))
            .map(|i| i + 1)
            .unwrap_or(self.movements.len());
        self.movements.insert(index, Arc::new(movement));
        id
    }

    /// All measures in document order
    pub fn measures(&self) -> impl Iterator<Item = &Measure> {
        self.movements.iter().flat_map(|m| m.measures())
    }

    pub fn measure_count(&self) -> usize {
        self.measures().count()
    }

    /// Find the page holding a zone
    pub fn zone_location(&self, zone_id: &str) -> Option<(usize, usize)> {
        self.pages.iter().enumerate().find_map(|(pi, page)| {
            page.zones
                .iter()
                .position(|z| z.id == zone_id)
                .map(|zi| (pi, zi))
        })
    }

    pub fn zone(&self, zone_id: &str) -> Option<&Zone> {
        self.zone_location(zone_id)
            .map(|(pi, zi)| &self.pages[pi].zones[zi])
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
