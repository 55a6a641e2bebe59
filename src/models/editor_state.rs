//! Edit context
//!
//! Everything an edit needs to know besides the document itself: which
//! page is shown, which movement/measure is current, and how new zones
//! are to be interpreted. Operations receive the context by reference and
//! hand back an updated copy together with the new document.

use serde::{Deserialize, Serialize};

use crate::models::Document;

/// How a newly drawn zone is interpreted
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EditMode {
    /// Zones are only selected, never created
    #[default]
    Selection,
    /// Each drawn zone becomes (or is attached to) one measure
    ManualRect,
    /// A drawn zone is added to an already existing measure
    AdditionalZone,
}

/// Whether the movement already holds notation that zones are mapped onto
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ContentPolicy {
    /// Measures are created, removed and renumbered freely
    #[default]
    Free,
    /// Measures carry notation; zones are shifted between them instead
    ExistingMusic,
}

/// Tunable parameters of the engine
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EditSettings {
    /// Fraction of the smallest zone height used as the row threshold
    pub system_threshold_ratio: f64,
    /// Label prefix for movements created on demand
    pub movement_label_prefix: String,
}

impl Default for EditSettings {
    fn default() -> Self {
        Self {
            system_threshold_ratio: 0.8,
            movement_label_prefix: "Movement".to_string(),
        }
    }
}

impl EditSettings {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Explicit editor state passed into every operation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct EditContext {
    /// Zero-based index of the page being edited
    pub current_page: usize,

    /// Movement new measures go to when no target is given
    pub current_movement: Option<String>,

    pub current_measure: Option<String>,

    /// Zone currently selected on the drawing surface
    pub selected_zone: Option<String>,

    pub mode: EditMode,

    pub policy: ContentPolicy,

    pub settings: EditSettings,
}

impl EditContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for placing measures on the given page
    pub fn on_page(page: usize) -> Self {
        Self {
            current_page: page,
            mode: EditMode::ManualRect,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: EditMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_policy(mut self, policy: ContentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_movement(mut self, movement_id: impl Into<String>) -> Self {
        self.current_movement = Some(movement_id.into());
        self
    }

    pub fn is_existing_music(&self) -> bool {
        self.policy == ContentPolicy::ExistingMusic
    }

    /// Flip between free and existing-music policies
    pub fn toggle_policy(&mut self) {
        self.policy = match self.policy {
            ContentPolicy::Free => ContentPolicy::ExistingMusic,
            ContentPolicy::ExistingMusic => ContentPolicy::Free,
        };
    }

    /// Drop references that no longer resolve in `doc` and clamp the page
    pub fn validate(&mut self, doc: &Document) {
        if self.current_page >= doc.pages.len() {
            self.current_page = doc.pages.len().saturating_sub(1);
        }
        if let Some(id) = &self.current_movement {
            if doc.movement_index(id).is_none() {
                self.current_movement = None;
            }
        }
        if let Some(id) = &self.current_measure {
            if !doc.measures().any(|m| &m.id == id) {
                self.current_measure = None;
            }
        }
        if let Some(id) = &self.selected_zone {
            if doc.zone(id).is_none() {
                self.selected_zone = None;
            }
        }
    }
}

/// Result of a mutation: the new snapshot and the context that goes with it
#[derive(Clone, Debug)]
pub struct EditOutcome {
    pub document: Document,
    pub context: EditContext,
}

impl EditOutcome {
    pub fn new(document: Document, context: EditContext) -> Self {
        Self { document, context }
    }

    /// The unchanged snapshot, for operations that turn out to be no-ops
    pub fn unchanged(document: &Document, context: &EditContext) -> Self {
        Self {
            document: document.clone(),
            context: context.clone(),
        }
    }
}
