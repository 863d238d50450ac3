use std::collections::HashMap;

use indexmap::IndexMap;

use super::graph::{Node, NodeId};
use super::render::{RenderAdapter, Size};

/// A parent/child pair. A line has no identity beyond the edge it draws.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub parent: NodeId,
    pub child: NodeId,
}

impl Edge {
    pub fn new(parent: impl Into<NodeId>, child: impl Into<NodeId>) -> Self {
        Self { parent: parent.into(), child: child.into() }
    }
}

/// Connector endpoints: (x1, y1) is the parent's center, (x2, y2) the child's.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Line {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Line {
    pub fn between<V: RenderAdapter + ?Sized>(parent: &Node, child: &Node, view: &V) -> Self {
        let (x1, y1) = node_center(parent, view.node_size(&parent.id));
        let (x2, y2) = node_center(child, view.node_size(&child.id));
        Line { x1, y1, x2, y2 }
    }
}

// Center in whole pixels, the same rounding the box layout uses.
pub fn node_center(node: &Node, size: Size) -> (f64, f64) {
    (node.x + (size.width / 2.0).floor(), node.y + (size.height / 2.0).floor())
}

/// Tracks one line per edge, grouped under the parent and keyed by child id.
///
/// A line is either tracked (its endpoints get refreshed) or gone. The table
/// never looks at the graph on its own: whoever moves a node has to ask for
/// the affected lines to be recomputed.
#[derive(Debug, Default, Clone)]
pub struct LineSync {
    by_parent: HashMap<NodeId, IndexMap<NodeId, Line>>,
}

impl LineSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_line<V: RenderAdapter + ?Sized>(&mut self, parent: &Node, child: &Node, view: &V) -> Line {
        let line = Line::between(parent, child, view);
        self.by_parent
            .entry(parent.id.clone())
            .or_default()
            .insert(child.id.clone(), line);
        line
    }

    pub fn update_line<V: RenderAdapter + ?Sized>(&mut self, parent: &Node, child: &Node, view: &V) -> Option<Line> {
        let slot = self.by_parent.get_mut(&parent.id)?.get_mut(&child.id)?;
        *slot = Line::between(parent, child, view);
        Some(*slot)
    }

    // Refreshes the lines from `node` down to its children. The line from
    // `node` up to its own parent is not touched here.
    pub fn update_all_lines<V: RenderAdapter + ?Sized>(
        &mut self,
        node: &Node,
        nodes: &IndexMap<NodeId, Node>,
        view: &V,
    ) -> Vec<(Edge, Line)> {
        let mut updated = Vec::new();
        let Some(children) = self.by_parent.get_mut(&node.id) else { return updated };
        for (child_id, slot) in children.iter_mut() {
            if let Some(child) = nodes.get(child_id) {
                *slot = Line::between(node, child, view);
                updated.push((Edge::new(node.id.clone(), child_id.clone()), *slot));
            }
        }
        updated
    }

    pub fn remove_line(&mut self, parent: &str, child: &str) -> Option<Line> {
        let children = self.by_parent.get_mut(parent)?;
        let removed = children.shift_remove(child);
        if children.is_empty() {
            self.by_parent.remove(parent);
        }
        removed
    }

    // Drop every line touching `id`, both as parent and as child.
    pub fn remove_node(&mut self, id: &str) -> Vec<Edge> {
        let mut removed = Vec::new();
        if let Some(children) = self.by_parent.remove(id) {
            removed.extend(children.into_keys().map(|child| Edge::new(id, child)));
        }
        let parents: Vec<NodeId> = self
            .by_parent
            .iter()
            .filter(|(_, children)| children.contains_key(id))
            .map(|(parent, _)| parent.clone())
            .collect();
        for parent in parents {
            self.remove_line(&parent, id);
            removed.push(Edge::new(parent, id));
        }
        removed
    }

    pub fn get(&self, parent: &str, child: &str) -> Option<&Line> {
        self.by_parent.get(parent)?.get(child)
    }

    pub fn contains(&self, parent: &str, child: &str) -> bool {
        self.get(parent, child).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Edge, &Line)> {
        self.by_parent.iter().flat_map(|(parent, children)| {
            children
                .iter()
                .map(move |(child, line)| (Edge::new(parent.clone(), child.clone()), line))
        })
    }

    pub fn len(&self) -> usize {
        self.by_parent.values().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_parent.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_parent.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_utils::render::HeadlessView;

    fn node_at(id: &str, x: f64, y: f64) -> Node {
        let mut n = Node::new(id.to_string(), id.to_string(), String::new());
        n.x = x;
        n.y = y;
        n
    }

    #[test]
    fn centers_round_half_size_down() {
        let mut view = HeadlessView::new();
        view.set_size("a", 101.0, 41.0);
        let a = node_at("a", 10.0, 20.0);
        let b = node_at("b", 0.0, 0.0);
        let line = Line::between(&a, &b, &view);
        assert_eq!((line.x1, line.y1), (60.0, 40.0));
        assert_eq!((line.x2, line.y2), (60.0, 20.0));
    }

    #[test]
    fn update_all_lines_skips_the_line_to_the_parent() {
        let view = HeadlessView::with_default_size(20.0, 10.0);
        let mut nodes = IndexMap::new();
        for (id, x) in [("p", 0.0), ("m", 100.0), ("c", 200.0)] {
            nodes.insert(id.to_string(), node_at(id, x, 0.0));
        }
        let mut sync = LineSync::new();
        sync.create_line(&nodes["p"], &nodes["m"], &view);
        sync.create_line(&nodes["m"], &nodes["c"], &view);

        nodes.get_mut("m").unwrap().x = 500.0;
        let updated = sync.update_all_lines(&nodes["m"], &nodes, &view);
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].0, Edge::new("m", "c"));
        assert_eq!(sync.get("m", "c").unwrap().x1, 510.0);
        // The parent's line still points at the old spot.
        assert_eq!(sync.get("p", "m").unwrap().x2, 110.0);

        sync.update_line(&nodes["p"], &nodes["m"], &view);
        assert_eq!(sync.get("p", "m").unwrap().x2, 510.0);
    }

    #[test]
    fn remove_node_drops_lines_on_both_sides() {
        let view = HeadlessView::new();
        let nodes: Vec<Node> = ["a", "b", "c"].iter().map(|id| node_at(id, 0.0, 0.0)).collect();
        let mut sync = LineSync::new();
        sync.create_line(&nodes[0], &nodes[1], &view);
        sync.create_line(&nodes[1], &nodes[2], &view);
        assert_eq!(sync.len(), 2);

        let removed = sync.remove_node("b");
        assert_eq!(removed.len(), 2);
        assert!(sync.is_empty());
        assert!(sync.update_line(&nodes[0], &nodes[1], &view).is_none());
    }
}
