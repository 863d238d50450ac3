pub mod shortcuts;

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

use crate::graph_utils::error::GraphError;
use crate::graph_utils::graph::{MindMap, NodeId, ROOT_ID};
use crate::graph_utils::render::{HeadlessView, RenderAdapter, Size};
use crate::persistence::document::{self, DocumentError};
use crate::persistence::persist::{self, Slot};
use crate::persistence::settings::AppSettings;

pub const DEFAULT_VIEWPORT: Size = Size::new(1280.0, 720.0);

#[derive(Error, Debug)]
pub enum EditorError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("Import failed: {0}")]
    ImportParse(#[from] DocumentError),
    #[error("an import is already in progress")]
    ImportBusy,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Proof that `begin_import` succeeded; hand it back to `finish_import` or
/// `cancel_import` to release the busy guard.
#[must_use]
#[derive(Debug)]
pub struct ImportTicket {
    _private: (),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StartupSource {
    Slot,
    Fresh,
    // The slot held something that could not be loaded.
    Fallback,
}

/// One editing session over a mind map: the commands the toolbar, the
/// inspector and the canvas trigger, on top of the graph model.
pub struct Editor<R: RenderAdapter = HeadlessView> {
    map: MindMap<R>,
    settings: AppSettings,
    slot: Slot,
    viewport: Size,
    dragging: Option<NodeId>,
    import_pending: bool,
}

impl Editor<HeadlessView> {
    pub fn headless(settings: AppSettings) -> Self {
        Editor::new(HeadlessView::new(), settings)
    }
}

impl<R: RenderAdapter> Editor<R> {
    pub fn new(view: R, settings: AppSettings) -> Self {
        let slot = Slot::from_settings(&settings);
        Editor {
            map: MindMap::new(view).with_spacing(settings.node_spacing),
            settings,
            slot,
            viewport: DEFAULT_VIEWPORT,
            dragging: None,
            import_pending: false,
        }
    }

    pub fn with_slot(mut self, slot: Slot) -> Self {
        self.slot = slot;
        self
    }

    pub fn map(&self) -> &MindMap<R> { &self.map }
    pub fn map_mut(&mut self) -> &mut MindMap<R> { &mut self.map }
    pub fn settings(&self) -> &AppSettings { &self.settings }
    pub fn slot(&self) -> &Slot { &self.slot }
    pub fn viewport(&self) -> Size { self.viewport }
    pub fn dragging(&self) -> Option<&str> { self.dragging.as_deref() }
    pub fn import_pending(&self) -> bool { self.import_pending }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    pub fn add_root_node(&mut self) -> Result<NodeId, EditorError> {
        let x = (self.viewport.width / 2.0).floor();
        let y = (self.viewport.height / 2.0).floor();
        let id = self.map.create_root(Some(ROOT_ID.to_string()), "root", x, y)?;
        Ok(id)
    }

    pub fn new_document(&mut self) -> Result<NodeId, EditorError> {
        self.map.clear();
        self.dragging = None;
        let id = self.add_root_node()?;
        info!("started a new document");
        Ok(id)
    }

    // "Add": a blank child under the selected node. Ok(None) without a selection.
    pub fn add_to_selected(&mut self) -> Result<Option<NodeId>, EditorError> {
        let Some(parent) = self.map.selected_id().map(str::to_string) else { return Ok(None) };
        let id = self.map.create_node(None, Some(&parent), "", "")?;
        self.map.add_child(&parent, &id)?;
        Ok(Some(id))
    }

    // "Delete": the selected node and everything under it. The root stays.
    pub fn delete_selected(&mut self) -> Result<Vec<NodeId>, EditorError> {
        let Some(id) = self.map.selected_id().map(str::to_string) else { return Ok(Vec::new()) };
        self.map.clear_selection();
        match self.map.remove_subtree(&id) {
            Ok(removed) => {
                if self.dragging.as_ref().is_some_and(|d| removed.contains(d)) {
                    self.dragging = None;
                }
                debug!("deleted {} node(s)", removed.len());
                Ok(removed)
            }
            Err(GraphError::InvalidOperation(msg)) => {
                warn!("delete ignored: {}", msg);
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn select(&mut self, id: &str) -> Result<(), EditorError> {
        self.map.set_selected(id, true)?;
        Ok(())
    }

    pub fn deselect_all(&mut self) {
        self.map.clear_selection();
    }

    pub fn rename_selected(&mut self, name: &str) -> Result<bool, EditorError> {
        let Some(id) = self.map.selected_id().map(str::to_string) else { return Ok(false) };
        self.map.rename(&id, name)?;
        Ok(true)
    }

    pub fn set_selected_content(&mut self, content: &str) -> Result<bool, EditorError> {
        let Some(id) = self.map.selected_id().map(str::to_string) else { return Ok(false) };
        self.map.set_content(&id, content)?;
        Ok(true)
    }

    pub fn begin_drag(&mut self, id: &str) {
        if self.map.contains(id) {
            self.dragging = Some(id.to_string());
        }
    }

    // Keeps the dragged node centered under the cursor.
    pub fn drag_to(&mut self, cursor_x: f64, cursor_y: f64) -> Result<(), EditorError> {
        let Some(id) = self.dragging.clone() else { return Ok(()) };
        let size = self.map.view().node_size(&id);
        let x = cursor_x - (size.width / 2.0).floor();
        let y = cursor_y - (size.height / 2.0).floor();
        self.map.move_node(&id, x, y)?;
        Ok(())
    }

    pub fn end_drag(&mut self) {
        self.dragging = None;
    }

    pub fn pan(&mut self, movement_x: f64, movement_y: f64) {
        let speed = self.settings.pan_speed;
        self.map.pan_by(movement_x * speed, movement_y * speed);
    }

    pub fn document_text(&self, pretty: bool) -> Result<String, EditorError> {
        Ok(document::to_json(&self.map.serialize(), pretty)?)
    }

    pub fn save(&self) -> Result<PathBuf, EditorError> {
        let text = self.document_text(false)?;
        Ok(self.slot.save(&text)?)
    }

    // Startup: the saved document if there is one, else a lone root.
    pub fn load_saved(&mut self) -> Result<StartupSource, EditorError> {
        let blob = match self.slot.load() {
            Ok(blob) => blob,
            Err(e) => {
                warn!("loading failed: {}", e);
                None
            }
        };
        let Some(blob) = blob else {
            self.new_document()?;
            return Ok(StartupSource::Fresh);
        };
        match self.replace_with(&blob) {
            Ok(count) => {
                info!("loaded {} nodes from {}", count, self.slot.path().display());
                Ok(StartupSource::Slot)
            }
            Err(e) => {
                warn!("loading failed: {}", e);
                self.new_document()?;
                Ok(StartupSource::Fallback)
            }
        }
    }

    pub fn export(&self) -> Result<PathBuf, EditorError> {
        let path = persist::export_path(&self.settings);
        self.export_to(&path)?;
        Ok(path)
    }

    pub fn export_to(&self, path: &Path) -> Result<(), EditorError> {
        let text = self.document_text(true)?;
        persist::write_export(path, &text)?;
        Ok(())
    }

    pub fn begin_import(&mut self) -> Result<ImportTicket, EditorError> {
        if self.import_pending {
            return Err(EditorError::ImportBusy);
        }
        self.import_pending = true;
        Ok(ImportTicket { _private: () })
    }

    pub fn cancel_import(&mut self, _ticket: ImportTicket) {
        self.import_pending = false;
    }

    // The current graph is only replaced once `text` has been parsed and
    // validated; on failure it is left exactly as it was.
    pub fn finish_import(&mut self, _ticket: ImportTicket, text: &str) -> Result<usize, EditorError> {
        self.import_pending = false;
        match self.replace_with(text) {
            Ok(count) => {
                info!("imported {} nodes", count);
                Ok(count)
            }
            Err(e) => {
                warn!("Import failed. {}", e);
                Err(e)
            }
        }
    }

    pub fn import_text(&mut self, text: &str) -> Result<usize, EditorError> {
        let ticket = self.begin_import()?;
        self.finish_import(ticket, text)
    }

    pub fn import_file(&mut self, path: &Path) -> Result<usize, EditorError> {
        let ticket = self.begin_import()?;
        match persist::read_to_string(path) {
            Ok(text) => self.finish_import(ticket, &text),
            Err(e) => {
                self.cancel_import(ticket);
                Err(e.into())
            }
        }
    }

    fn replace_with(&mut self, text: &str) -> Result<usize, EditorError> {
        let records = document::parse_validated(text)?;
        self.map.clear();
        self.dragging = None;
        if let Err(e) = self.map.deserialize(&records) {
            // Validation passed, so this is not expected; keep a usable graph.
            self.add_root_node()?;
            return Err(e.into());
        }
        Ok(self.map.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> Editor {
        let mut ed = Editor::headless(AppSettings::default());
        ed.set_viewport(Size::new(801.0, 600.0));
        ed.new_document().unwrap();
        ed
    }

    #[test]
    fn root_sits_in_the_middle_of_the_viewport() {
        let ed = editor();
        let root = ed.map().root().unwrap();
        assert_eq!(root.id, ROOT_ID);
        assert_eq!((root.x, root.y), (400.0, 300.0));
    }

    #[test]
    fn add_needs_a_selection() {
        let mut ed = editor();
        assert_eq!(ed.add_to_selected().unwrap(), None);
        ed.select(ROOT_ID).unwrap();
        let id = ed.add_to_selected().unwrap().unwrap();
        assert_eq!(ed.map().node(&id).unwrap().parent.as_deref(), Some(ROOT_ID));
        assert!(ed.map().line(ROOT_ID, &id).is_some());
        // Selection stays on the parent.
        assert_eq!(ed.map().selected_id(), Some(ROOT_ID));
    }

    #[test]
    fn deleting_the_root_is_a_no_op() {
        let mut ed = editor();
        ed.select(ROOT_ID).unwrap();
        assert!(ed.delete_selected().unwrap().is_empty());
        assert_eq!(ed.map().len(), 1);
        assert!(ed.map().selected_id().is_none());
    }

    #[test]
    fn delete_takes_the_subtree() {
        let mut ed = editor();
        ed.select(ROOT_ID).unwrap();
        let a = ed.add_to_selected().unwrap().unwrap();
        ed.select(&a).unwrap();
        let b = ed.add_to_selected().unwrap().unwrap();
        let removed = ed.delete_selected().unwrap();
        assert_eq!(removed, vec![b, a]);
        assert_eq!(ed.map().len(), 1);
        assert!(ed.map().lines().is_empty());
    }

    #[test]
    fn drag_centers_node_on_cursor() {
        let mut ed = editor();
        ed.begin_drag(ROOT_ID);
        ed.drag_to(500.0, 500.0).unwrap();
        let root = ed.map().root().unwrap();
        // HeadlessView default is 120x40.
        assert_eq!((root.x, root.y), (440.0, 480.0));
        ed.end_drag();
        ed.drag_to(0.0, 0.0).unwrap();
        assert_eq!(ed.map().root().unwrap().x, 440.0);
    }

    #[test]
    fn pan_applies_speed() {
        let mut ed = editor();
        ed.pan(10.0, -4.0);
        let root = ed.map().root().unwrap();
        assert_eq!((root.x, root.y), (415.0, 294.0));
    }

    #[test]
    fn add_reports_exhausted_ids() {
        let mut ed = editor();
        ed.map_mut().set_id_source(rand::rngs::mock::StepRng::new(0, 0));
        ed.select(ROOT_ID).unwrap();
        assert!(ed.add_to_selected().unwrap().is_some());
        let err = ed.add_to_selected().unwrap_err();
        assert!(matches!(err, EditorError::Graph(GraphError::IdSpaceExhausted { .. })));
        assert_eq!(ed.map().len(), 2);
        assert_eq!(ed.map().lines().len(), 1);
    }

    #[test]
    fn import_busy_guard() {
        let mut ed = editor();
        let ticket = ed.begin_import().unwrap();
        assert!(matches!(ed.begin_import(), Err(EditorError::ImportBusy)));
        assert!(matches!(ed.import_text("[]"), Err(EditorError::ImportBusy)));
        ed.cancel_import(ticket);
        assert!(!ed.import_pending());
        assert!(ed.begin_import().is_ok());
    }

    #[test]
    fn failed_import_leaves_graph_alone() {
        let mut ed = editor();
        ed.select(ROOT_ID).unwrap();
        let a = ed.add_to_selected().unwrap().unwrap();
        let before = ed.map().serialize();

        let bad = r#"[{"id":"x","name":"x","content":"","x":0,"y":0,"children":["missing"]}]"#;
        assert!(matches!(ed.import_text(bad), Err(EditorError::ImportParse(_))));
        assert!(matches!(ed.import_text("not json"), Err(EditorError::ImportParse(_))));
        assert_eq!(ed.map().serialize(), before);
        assert!(ed.map().contains(&a));
        assert!(!ed.import_pending());
    }
}
