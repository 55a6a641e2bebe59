//! Editing session
//!
//! Owns the one document being edited, its edit context and the undo
//! history. Operations from [`crate::structure::operations`] are run
//! against the current snapshot and their outcome is published in one
//! step: history first, then the live state.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::converters::mei::{read_mei, write_mei};
use crate::error::{Error, Result};
use crate::iiif_import::import_manifest_with_dimensions;
use crate::models::{Document, EditContext, EditOutcome, EditSettings};
use crate::undo::{History, Snapshot};

/// Session configuration, loadable from JSON
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Snapshots kept for undo, the present one included
    pub history_limit: usize,
    pub settings: EditSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            settings: EditSettings::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Default)]
pub struct Session {
    document: Option<Document>,
    context: EditContext,
    history: History,
    config: SessionConfig,
}

/// True when `b` is `a` unchanged: same root and the same shared subtrees
fn same_tree(a: &Document, b: &Document) -> bool {
    a.id == b.id
        && a.meta == b.meta
        && a.pages.len() == b.pages.len()
        && a.movements.len() == b.movements.len()
        && a.pages.iter().zip(&b.pages).all(|(x, y)| Arc::ptr_eq(x, y))
        && a.movements.iter().zip(&b.movements).all(|(x, y)| Arc::ptr_eq(x, y))
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            document: None,
            context: Self::fresh_context(&config),
            history: History::new(config.history_limit),
            config,
        }
    }

    fn fresh_context(config: &SessionConfig) -> EditContext {
        EditContext {
            settings: config.settings.clone(),
            ..EditContext::default()
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replace the configuration; the history limit applies from the next load
    pub fn set_config(&mut self, config: SessionConfig) {
        self.context.settings = config.settings.clone();
        self.config = config;
    }

    pub fn document(&self) -> Result<&Document> {
        self.document.as_ref().ok_or(Error::NoDocument)
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn context(&self) -> &EditContext {
        &self.context
    }

    // ========================================================================
    // Loading and saving
    // ========================================================================

    /// Start editing `document` with a fresh context and history
    pub fn open(&mut self, document: Document) {
        let mut context = Self::fresh_context(&self.config);
        context.validate(&document);
        context.current_movement = document.movements.first().map(|m| m.id.clone());

        self.history = History::new(self.config.history_limit);
        self.history.reset(Snapshot::new(document.clone(), context.clone()));
        log::info!(
            "opened document {} ({} pages, {} measures)",
            document.id,
            document.pages.len(),
            document.measure_count()
        );
        self.document = Some(document);
        self.context = context;
    }

    pub fn load_mei(&mut self, xml: &str) -> Result<()> {
        let document = read_mei(xml)?;
        self.open(document);
        Ok(())
    }

    pub fn export_mei(&self) -> Result<String> {
        Ok(write_mei(self.document()?)?)
    }

    /// Open a new document built from a IIIF manifest
    pub fn import_manifest(&mut self, json: &str, url: &str, dims: &[Option<(u32, u32)>]) -> Result<()> {
        let document = import_manifest_with_dimensions(json, url, dims)?;
        self.open(document);
        Ok(())
    }

    pub fn close(&mut self) {
        self.document = None;
        self.context = Self::fresh_context(&self.config);
        self.history.clear();
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Run an operation on the current snapshot and publish its outcome
    ///
    /// Returns `Ok(true)` when the document changed (and a history entry
    /// was recorded), `Ok(false)` for context-only changes and no-ops.
    pub fn apply<F>(&mut self, op: F) -> Result<bool>
    where
        F: FnOnce(&Document, &EditContext) -> EditOutcome,
    {
        let current = self.document.as_ref().ok_or(Error::NoDocument)?;
        let outcome = op(current, &self.context);
        Ok(self.publish(outcome))
    }

    /// Like [`Session::apply`] for operations that can fail before editing
    pub fn try_apply<F, E>(&mut self, op: F) -> Result<bool>
    where
        F: FnOnce(&Document, &EditContext) -> std::result::Result<EditOutcome, E>,
        Error: From<E>,
    {
        let current = self.document.as_ref().ok_or(Error::NoDocument)?;
        let outcome = op(current, &self.context)?;
        Ok(self.publish(outcome))
    }

    fn publish(&mut self, outcome: EditOutcome) -> bool {
        let EditOutcome { document, context } = outcome;
        let changed = match &self.document {
            Some(current) => !same_tree(current, &document),
            None => true,
        };
        if changed {
            self.history.commit(Snapshot::new(document.clone(), context.clone()));
            log::debug!("committed edit, {} undo steps", self.history.undo_count());
        }
        self.document = Some(document);
        self.context = context;
        changed
    }

    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo().cloned() else {
            return false;
        };
        self.restore(snapshot);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo().cloned() else {
            return false;
        };
        self.restore(snapshot);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn restore(&mut self, snapshot: Snapshot) {
        let Snapshot { document, mut context } = snapshot;
        // keep the page the user is looking at if it still exists
        context.current_page = self.context.current_page;
        context.mode = self.context.mode;
        context.validate(&document);
        self.document = Some(document);
        self.context = context;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EditMode, Page, Rect};
    use crate::structure::operations::{set_current_page, set_mode, set_page_dimensions, update_zone_rect};

    fn session_with_pages(n: usize) -> Session {
        let mut doc = Document::new();
        for i in 0..n {
            doc.push_page(Page::new(i + 1, (i + 1).to_string(), "img", None));
        }
        let mut session = Session::default();
        session.open(doc);
        session
    }

    #[test]
    fn test_operations_need_a_document() {
        let mut session = Session::default();
        let result = session.apply(|d, c| set_mode(d, c, EditMode::ManualRect));
        assert!(matches!(result, Err(Error::NoDocument)));
        assert!(matches!(session.export_mei(), Err(Error::NoDocument)));
    }

    #[test]
    fn test_context_changes_skip_history() {
        let mut session = session_with_pages(2);
        assert!(!session.apply(|d, c| set_current_page(d, c, 1)).unwrap());
        assert_eq!(session.context().current_page, 1);
        assert!(!session.can_undo());
    }

    #[test]
    fn test_undo_restores_previous_document() {
        let mut session = session_with_pages(1);
        assert!(session.apply(|d, c| set_page_dimensions(d, c, 0, 50, 60)).unwrap());
        assert_eq!(session.document().unwrap().pages[0].width, Some(50));

        assert!(session.undo());
        assert_eq!(session.document().unwrap().pages[0].width, None);
        assert!(!session.undo());

        assert!(session.redo());
        assert_eq!(session.document().unwrap().pages[0].width, Some(50));
    }

    #[test]
    fn test_noop_edit_records_nothing() {
        let mut session = session_with_pages(1);
        let changed = session
            .apply(|d, c| update_zone_rect(d, c, "missing", Rect::new(0, 0, 1, 1)))
            .unwrap();
        assert!(!changed);
        assert_eq!(session.history.undo_count(), 0);
    }

    #[test]
    fn test_config_from_json() {
        let config = SessionConfig::from_json(r#"{"history_limit": 5, "settings": {"movement_label_prefix": "Satz"}}"#)
            .unwrap();
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.settings.movement_label_prefix, "Satz");
        let session = Session::new(config);
        assert_eq!(session.context().settings.movement_label_prefix, "Satz");
    }
}
