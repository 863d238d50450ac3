use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, Rect, Sense, Stroke, Vec2};
use log::{error, info, warn};

use crate::editor::shortcuts::{self, Action, Modifiers, SHORTCUTS};
use crate::editor::{Editor, ImportTicket, StartupSource};
use crate::graph_utils::graph::NodeId;
use crate::graph_utils::render::Size;
use crate::gui::scene::{to_screen, CanvasScene};

const NODE_PADDING: Vec2 = Vec2::new(10.0, 6.0);
const NODE_MIN_WIDTH: f32 = 60.0;
const CONTENT_WRAP_WIDTH: f32 = 220.0;
const NOTICE_DURATION: Duration = Duration::from_secs(3);

// What to load once the canvas size is known.
#[derive(Debug, Clone)]
pub enum Startup {
    Slot,
    File(PathBuf),
}

fn node_count_label(count: usize) -> String {
    match count {
        1 => "1 node".to_string(),
        n => format!("{} nodes", n),
    }
}

// Result of a background file read for Import.
type ImportMessage = (PathBuf, anyhow::Result<String>);

#[derive(Clone, Debug)]
struct NodeSnapshot {
    id: NodeId,
    name: String,
    content: String,
    selected: bool,
}

pub struct MindLoomApp {
    editor: Editor<CanvasScene>,
    startup: Option<Startup>,
    // Inspector edit buffers, bound to `edit_target`
    edit_target: Option<NodeId>,
    name_edit: String,
    content_edit: String,
    // Pending import: the worker thread sends the file contents back here
    import_rx: Option<Receiver<ImportMessage>>,
    import_ticket: Option<ImportTicket>,
    // Transient notices
    info: Option<String>,
    info_time: Option<Instant>,
    error: Option<String>,
    confirm_new: bool,
    show_shortcuts: bool,
}

impl MindLoomApp {
    pub fn new(editor: Editor<CanvasScene>, startup: Startup) -> Self {
        Self {
            editor,
            startup: Some(startup),
            edit_target: None,
            name_edit: String::new(),
            content_edit: String::new(),
            import_rx: None,
            import_ticket: None,
            info: None,
            info_time: None,
            error: None,
            confirm_new: false,
            show_shortcuts: false,
        }
    }

    fn notify(&mut self, msg: impl Into<String>) {
        self.info = Some(msg.into());
        self.info_time = Some(Instant::now());
        self.error = None;
    }

    fn fail(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        error!("{}", msg);
        self.error = Some(msg);
    }

    // Deferred until the first frame so the root can be centered on the canvas.
    fn run_startup(&mut self) {
        let Some(startup) = self.startup.take() else { return };
        if let Startup::File(path) = &startup {
            match self.editor.import_file(path) {
                Ok(n) => {
                    self.notify(format!("Imported {} nodes from {}", n, path.display()));
                    return;
                }
                Err(e) => self.fail(format!("Import failed: {}", e)),
            }
        }
        match self.editor.load_saved() {
            Ok(StartupSource::Slot) => self.notify("Loaded saved document"),
            Ok(StartupSource::Fresh) => {}
            Ok(StartupSource::Fallback) => self.fail("Saved document could not be loaded; started fresh"),
            Err(e) => self.fail(format!("Startup failed: {}", e)),
        }
    }

    fn run_action(&mut self, action: Action) {
        match action {
            Action::New => self.confirm_new = true,
            Action::Save => self.menu_save(),
            Action::Import => self.menu_import(),
            Action::Export => self.menu_export(),
            Action::Pan => {}
        }
    }

    pub fn menu_save(&mut self) {
        match self.editor.save() {
            Ok(path) => self.notify(format!("Saved to {}", path.display())),
            Err(e) => self.fail(format!("Save failed: {}", e)),
        }
    }

    pub fn menu_export(&mut self) {
        match self.editor.export() {
            Ok(path) => self.notify(format!("Exported to {}", path.display())),
            Err(e) => self.fail(format!("Export failed: {}", e)),
        }
    }

    pub fn menu_new(&mut self) {
        match self.editor.new_document() {
            Ok(_) => self.notify("Created new document"),
            Err(e) => self.fail(format!("New failed: {}", e)),
        }
        self.edit_target = None;
    }

    pub fn menu_import(&mut self) {
        let ticket = match self.editor.begin_import() {
            Ok(t) => t,
            Err(e) => {
                warn!("{}", e);
                self.notify("An import is already running");
                return;
            }
        };
        let picked = rfd::FileDialog::new()
            .add_filter("Mindmap JSON", &["json"])
            .pick_file();
        let Some(path) = picked else {
            self.editor.cancel_import(ticket);
            return;
        };
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let text = crate::persistence::persist::read_to_string(&path);
            let _ = tx.send((path, text));
        });
        self.import_rx = Some(rx);
        self.import_ticket = Some(ticket);
    }

    fn poll_import(&mut self) {
        let Some(rx) = &self.import_rx else { return };
        let msg = match rx.try_recv() {
            Ok(msg) => msg,
            Err(mpsc::TryRecvError::Empty) => return,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.import_rx = None;
                if let Some(ticket) = self.import_ticket.take() {
                    self.editor.cancel_import(ticket);
                }
                self.fail("Import failed: reader stopped");
                return;
            }
        };
        self.import_rx = None;
        let Some(ticket) = self.import_ticket.take() else { return };
        let (path, text) = msg;
        match text {
            Ok(text) => match self.editor.finish_import(ticket, &text) {
                Ok(n) => {
                    info!("imported {}", path.display());
                    self.edit_target = None;
                    self.notify(format!("Imported {} nodes", n));
                }
                Err(e) => self.fail(format!("{}", e)),
            },
            Err(e) => {
                self.editor.cancel_import(ticket);
                self.fail(format!("Import failed: {}", e));
            }
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let events = ctx.input(|i| i.events.clone());
        for event in events {
            if let egui::Event::Key { key, pressed: true, repeat: false, modifiers, .. } = event {
                let mods = Modifiers { ctrl: modifiers.ctrl, alt: modifiers.alt };
                if let Some(action) = shortcuts::match_shortcut(key.name(), mods) {
                    self.run_action(action);
                }
            }
        }
    }

    // Keep the inspector buffers in step with the selection.
    fn sync_inspector(&mut self) {
        let selected = self.editor.map().selected().map(|n| (n.id.clone(), n.name.clone(), n.content.clone()));
        match selected {
            Some((id, name, content)) if self.edit_target.as_deref() != Some(id.as_str()) => {
                self.edit_target = Some(id);
                self.name_edit = name;
                self.content_edit = content;
            }
            Some(_) => {}
            None => {
                self.edit_target = None;
                self.name_edit.clear();
                self.content_edit.clear();
            }
        }
    }

    fn show_inspector(&mut self, ui: &mut egui::Ui) {
        self.sync_inspector();
        let has_sel = self.edit_target.is_some();
        ui.heading("Inspector");
        ui.separator();
        ui.label("Name");
        let name_resp = ui.add_enabled(has_sel, egui::TextEdit::singleline(&mut self.name_edit).desired_width(f32::INFINITY));
        if name_resp.changed() {
            if let Err(e) = self.editor.rename_selected(&self.name_edit) {
                self.fail(format!("Rename failed: {}", e));
            }
        }
        ui.label("Content");
        let content_resp = ui.add_enabled(
            has_sel,
            egui::TextEdit::multiline(&mut self.content_edit).desired_rows(6).desired_width(f32::INFINITY),
        );
        if content_resp.changed() {
            if let Err(e) = self.editor.set_selected_content(&self.content_edit) {
                self.fail(format!("Edit failed: {}", e));
            }
        }
        ui.horizontal(|ui| {
            if ui.add_enabled(has_sel, egui::Button::new("Add")).clicked() {
                if let Err(e) = self.editor.add_to_selected() {
                    self.fail(format!("Add failed: {}", e));
                }
            }
            if ui.add_enabled(has_sel, egui::Button::new("Delete")).clicked() {
                match self.editor.delete_selected() {
                    Ok(removed) if !removed.is_empty() => self.notify(format!("Deleted {} node(s)", removed.len())),
                    Ok(_) => {}
                    Err(e) => self.fail(format!("Delete failed: {}", e)),
                }
            }
        });
        if let Some(id) = &self.edit_target {
            ui.separator();
            ui.small(format!("id: {}", id));
        }
    }

    fn show_canvas(&mut self, ui: &mut egui::Ui) {
        let available = ui.available_rect_before_wrap();
        self.editor.set_viewport(Size::new(f64::from(available.width()), f64::from(available.height())));
        self.run_startup();

        let origin = available.min.to_vec2();
        let bg_resp = ui.allocate_rect(available, Sense::click_and_drag());
        let painter = ui.painter_at(available);
        painter.rect_filled(available, 0.0, Color32::from_rgb(30, 32, 40));

        // Ctrl + primary drag pans the whole map instead of moving a node.
        let (ctrl, primary_down, delta) = ui.input(|i| (i.modifiers.ctrl, i.pointer.primary_down(), i.pointer.delta()));
        let panning = ctrl && primary_down;
        if panning && delta != Vec2::ZERO {
            self.editor.end_drag();
            self.editor.pan(f64::from(delta.x), f64::from(delta.y));
        }

        let line_stroke = Stroke::new(1.5, Color32::WHITE);
        for (_, line) in self.editor.map().view().lines() {
            painter.line_segment(
                [to_screen(line.x1, line.y1) + origin, to_screen(line.x2, line.y2) + origin],
                line_stroke,
            );
        }

        let snapshot: Vec<NodeSnapshot> = self
            .editor
            .map()
            .nodes()
            .map(|n| NodeSnapshot { id: n.id.clone(), name: n.name.clone(), content: n.content.clone(), selected: n.selected })
            .collect();
        let mut clicked: Option<NodeId> = None;
        let mut node_hit = false;
        for node in snapshot {
            let Some(pos) = self.editor.map().view().position(&node.id) else { continue };
            let name_color = Color32::from_rgb(235, 235, 240);
            let name_galley = painter.layout_no_wrap(node.name.clone(), egui::FontId::proportional(14.0), name_color);
            let content_galley = painter.layout(
                node.content.clone(),
                egui::FontId::proportional(12.0),
                Color32::from_gray(190),
                CONTENT_WRAP_WIDTH,
            );
            let inner = Vec2::new(
                name_galley.size().x.max(content_galley.size().x).max(NODE_MIN_WIDTH),
                name_galley.size().y + if node.content.is_empty() { 0.0 } else { content_galley.size().y + 4.0 },
            );
            let size = inner + NODE_PADDING * 2.0;
            self.editor.map_mut().view_mut().measure(&node.id, size);

            let rect = Rect::from_min_size(pos + origin, size);
            let resp = ui.interact(rect, ui.id().with(("node", &node.id)), Sense::click_and_drag());
            let (fill, border) = if node.selected {
                (Color32::from_rgb(60, 70, 110), Stroke::new(2.0, Color32::from_rgb(255, 210, 90)))
            } else {
                (Color32::from_rgb(45, 48, 60), Stroke::new(1.0, Color32::from_gray(150)))
            };
            painter.rect_filled(rect, 6.0, fill);
            painter.rect_stroke(rect, 6.0, border, egui::StrokeKind::Inside);
            let text_pos = rect.min + NODE_PADDING;
            let name_height = name_galley.size().y;
            painter.galley(text_pos, name_galley, name_color);
            if !node.content.is_empty() {
                painter.galley(text_pos + Vec2::new(0.0, name_height + 4.0), content_galley, Color32::from_gray(190));
            }

            if resp.hovered() || resp.dragged() {
                node_hit = true;
            }
            if resp.drag_started() && !panning {
                self.editor.begin_drag(&node.id);
            }
            if resp.clicked() {
                clicked = Some(node.id.clone());
            }
        }

        if !panning && self.editor.dragging().is_some() {
            if let Some(p) = ui.input(|i| i.pointer.interact_pos()) {
                if let Err(e) = self.editor.drag_to(f64::from(p.x - origin.x), f64::from(p.y - origin.y)) {
                    self.fail(format!("Move failed: {}", e));
                }
            }
        }
        if !primary_down {
            self.editor.end_drag();
        }

        if let Some(id) = clicked {
            if let Err(e) = self.editor.select(&id) {
                self.fail(format!("Select failed: {}", e));
            }
        } else if bg_resp.clicked() && !node_hit {
            self.editor.deselect_all();
        }

        // Box sizes only settle after layout; re-aim the connectors when they move.
        if self.editor.map_mut().view_mut().take_sizes_changed() {
            self.editor.map_mut().refresh_all_lines();
            ui.ctx().request_repaint();
        }
    }

    fn show_new_confirm(&mut self, ctx: &egui::Context) {
        if !self.confirm_new {
            return;
        }
        let mut open = true;
        let mut decided: Option<bool> = None;
        egui::Window::new("New Document")
            .collapsible(false)
            .resizable(false)
            .open(&mut open)
            .show(ctx, |ui| {
                ui.label("Warning: all unsaved progress will be lost. Continue?");
                ui.horizontal(|ui| {
                    if ui.button("Continue").clicked() { decided = Some(true); }
                    if ui.button("Cancel").clicked() { decided = Some(false); }
                });
            });
        if decided == Some(true) {
            self.menu_new();
        }
        if !open || decided.is_some() {
            self.confirm_new = false;
        }
    }

    fn show_shortcuts_window(&mut self, ctx: &egui::Context) {
        if !self.show_shortcuts {
            return;
        }
        let mut open = true;
        egui::Window::new("Keyboard Shortcuts")
            .collapsible(false)
            .open(&mut open)
            .show(ctx, |ui| {
                egui::Grid::new("shortcut_grid").striped(true).show(ui, |ui| {
                    for s in SHORTCUTS {
                        ui.strong(s.name);
                        ui.monospace(s.describe());
                        ui.end_row();
                    }
                });
            });
        self.show_shortcuts = open;
    }
}

impl eframe::App for MindLoomApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_import();
        self.handle_shortcuts(ctx);
        if self.import_rx.is_some() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Mind-Loom");
                ui.separator();
                if ui.button("New").clicked() { self.run_action(Action::New); }
                if ui.button("Save").clicked() { self.run_action(Action::Save); }
                if ui.button("Import").clicked() { self.run_action(Action::Import); }
                if ui.button("Export").clicked() { self.run_action(Action::Export); }
                ui.separator();
                if ui.link("Keyboard shortcuts").clicked() { self.show_shortcuts = true; }
                ui.small(format!("Version {}", env!("CARGO_PKG_VERSION")));
                ui.small(node_count_label(self.editor.map().len()));
                if let Some(err) = &self.error {
                    ui.separator();
                    ui.colored_label(Color32::RED, err);
                } else if let (Some(msg), Some(t)) = (&self.info, self.info_time) {
                    if t.elapsed() < NOTICE_DURATION {
                        ui.separator();
                        ui.small(msg.clone());
                    }
                }
            });
        });

        egui::SidePanel::right("inspector")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| self.show_inspector(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.show_canvas(ui));

        self.show_new_confirm(ctx);
        self.show_shortcuts_window(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if self.editor.settings().save_on_exit {
            if let Err(e) = self.editor.save() {
                error!("save on exit failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_count_reads_as_words() {
        assert_eq!(node_count_label(0), "0 nodes");
        assert_eq!(node_count_label(1), "1 node");
        assert_eq!(node_count_label(12), "12 nodes");
    }
}
