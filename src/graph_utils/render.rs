use std::collections::HashMap;

use super::graph::{Node, NodeId};
use super::lines::{Edge, Line};

pub const DEFAULT_NODE_WIDTH: f64 = 120.0;
pub const DEFAULT_NODE_HEIGHT: f64 = 40.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::new(DEFAULT_NODE_WIDTH, DEFAULT_NODE_HEIGHT)
    }
}

/// The view side of the editor.
///
/// The graph model only needs to know how large a node is on screen and to
/// forward visual changes; everything else about drawing stays behind this
/// trait.
pub trait RenderAdapter {
    fn node_size(&self, id: &str) -> Size;
    fn create_visual(&mut self, node: &Node);
    fn remove_visual(&mut self, id: &str);
    fn set_position(&mut self, id: &str, x: f64, y: f64);
    fn create_line(&mut self, edge: &Edge, line: &Line);
    fn update_line(&mut self, edge: &Edge, line: &Line);
    fn remove_line(&mut self, edge: &Edge);
    fn clear(&mut self);
}

// A view without a window: fixed node sizes, and it keeps whatever the model
// last pushed so tests can inspect it.
#[derive(Debug, Default, Clone)]
pub struct HeadlessView {
    pub default_size: Size,
    pub sizes: HashMap<NodeId, Size>,
    pub positions: HashMap<NodeId, (f64, f64)>,
    pub lines: HashMap<Edge, Line>,
}

impl HeadlessView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_size(width: f64, height: f64) -> Self {
        Self { default_size: Size::new(width, height), ..Self::default() }
    }

    pub fn set_size(&mut self, id: &str, width: f64, height: f64) {
        self.sizes.insert(id.to_string(), Size::new(width, height));
    }
}

impl RenderAdapter for HeadlessView {
    fn node_size(&self, id: &str) -> Size {
        self.sizes.get(id).copied().unwrap_or(self.default_size)
    }

    fn create_visual(&mut self, node: &Node) {
        self.positions.insert(node.id.clone(), (node.x, node.y));
    }

    fn remove_visual(&mut self, id: &str) {
        self.positions.remove(id);
    }

    fn set_position(&mut self, id: &str, x: f64, y: f64) {
        self.positions.insert(id.to_string(), (x, y));
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
        self.lines.clear();
    }
}
