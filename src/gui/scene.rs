use std::collections::HashMap;

use egui::{Pos2, Vec2};

use crate::graph_utils::graph::{Node, NodeId};
use crate::graph_utils::lines::{Edge, Line};
use crate::graph_utils::render::{RenderAdapter, Size};

/// What the canvas draws: node boxes sized from their laid-out text, plus the
/// connector lines the graph model pushed last.
///
/// Node sizes are only known after egui has laid the text out, so the canvas
/// reports them through `measure` every frame; when one changes the lines
/// touching it need a refresh.
#[derive(Debug, Default)]
pub struct CanvasScene {
    sizes: HashMap<NodeId, Size>,
    positions: HashMap<NodeId, Pos2>,
    lines: HashMap<Edge, Line>,
    sizes_changed: bool,
}

impl CanvasScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn measure(&mut self, id: &str, size: Vec2) {
        let size = Size::new(f64::from(size.x.round()), f64::from(size.y.round()));
        if self.sizes.get(id) != Some(&size) {
            self.sizes.insert(id.to_string(), size);
            self.sizes_changed = true;
        }
    }

    pub fn take_sizes_changed(&mut self) -> bool {
        std::mem::take(&mut self.sizes_changed)
    }

    pub fn position(&self, id: &str) -> Option<Pos2> {
        self.positions.get(id).copied()
    }

    pub fn lines(&self) -> impl Iterator<Item = (&Edge, &Line)> {
        self.lines.iter()
    }
}

// Model coordinates are f64; egui draws in f32.
pub fn to_screen(x: f64, y: f64) -> Pos2 {
    egui::pos2(x as f32, y as f32)
}

impl RenderAdapter for CanvasScene {
    fn node_size(&self, id: &str) -> Size {
        self.sizes.get(id).copied().unwrap_or_default()
    }

    fn create_visual(&mut self, node: &Node) {
        self.positions.insert(node.id.clone(), to_screen(node.x, node.y));
    }

    fn remove_visual(&mut self, id: &str) {
        self.positions.remove(id);
        self.sizes.remove(id);
    }

    fn set_position(&mut self, id: &str, x: f64, y: f64) {
        self.positions.insert(id.to_string(), to_screen(x, y));
    }

    fn create_line(&mut self, edge: &Edge, line: &Line) {
        self.lines.insert(edge.clone(), *line);
    }

    fn update_line(&mut self, edge: &Edge, line: &Line) {
        self.lines.insert(edge.clone(), *line);
    }

    fn remove_line(&mut self, edge: &Edge) {
        self.lines.remove(edge);
    }

    fn clear(&mut self) {
        self.positions.clear();
        self.sizes.clear();
        self.lines.clear();
        self.sizes_changed = false;
    }
}
