use indexmap::{IndexMap, IndexSet};
use log::debug;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::error::GraphError;
use super::ids::IdRegistry;
use super::lines::{Edge, Line, LineSync};
use super::render::{HeadlessView, RenderAdapter};
use crate::persistence::document;

// Basic type aliases for clarity
pub type NodeId = String;

pub const ROOT_ID: &str = "root";
pub const DEFAULT_NODE_SPACING: f64 = 30.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub content: String,
    pub x: f64,
    pub y: f64,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub selected: bool,
}

impl Node {
    pub fn new(id: NodeId, name: String, content: String) -> Self {
        Node {
            id,
            name,
            content,
            x: 0.0,
            y: 0.0,
            parent: None,
            children: Vec::new(),
            selected: false,
        }
    }

    pub fn to_record(&self) -> NodeRecord {
        NodeRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            content: self.content.clone(),
            x: self.x,
            y: self.y,
            children: self.children.clone(),
        }
    }
}

/// One entry of the flat serialized document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub content: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub children: Vec<NodeId>,
}

/// The graph context: node registry, issued ids, selection, and the line
/// table derived from the tree. All structural edits go through here so the
/// registry, the child lists and the lines never drift apart.
pub struct MindMap<R: RenderAdapter = HeadlessView> {
    nodes: IndexMap<NodeId, Node>,
    ids: IdRegistry,
    lines: LineSync,
    selected: Option<NodeId>,
    root: Option<NodeId>,
    spacing: f64,
    // None draws ids from the thread rng.
    id_source: Option<Box<dyn RngCore>>,
    view: R,
}

impl Default for MindMap<HeadlessView> {
    fn default() -> Self {
        MindMap::new(HeadlessView::new())
    }
}

impl<R: RenderAdapter> MindMap<R> {
    pub fn new(view: R) -> Self {
        MindMap {
            nodes: IndexMap::new(),
            ids: IdRegistry::new(),
            lines: LineSync::new(),
            selected: None,
            root: None,
            spacing: DEFAULT_NODE_SPACING,
            id_source: None,
            view,
        }
    }

    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn set_id_source(&mut self, rng: impl RngCore + 'static) {
        self.id_source = Some(Box::new(rng));
    }

    // Allocate and register a node. Linking it under `parent` is a separate
    // step (`add_child`); the parent only decides the default position.
    pub fn create_node(
        &mut self,
        id: Option<NodeId>,
        parent: Option<&str>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<NodeId, GraphError> {
        let (x, y) = match parent {
            Some(pid) => {
                let p = self.nodes.get(pid).ok_or_else(|| GraphError::NodeNotFound(pid.to_string()))?;
                let size = self.view.node_size(pid);
                (p.x, p.y + size.height + self.spacing)
            }
            None => (0.0, 0.0),
        };
        let id = match id {
            Some(id) => {
                if self.nodes.contains_key(&id) {
                    return Err(GraphError::DuplicateId(id));
                }
                self.ids.register(&id);
                id
            }
            None => match self.id_source.as_mut() {
                Some(rng) => self.ids.generate_with(&mut **rng)?,
                None => self.ids.generate()?,
            },
        };
        let mut node = Node::new(id.clone(), name.into(), content.into());
        node.x = x;
        node.y = y;
        self.view.create_visual(&node);
        self.nodes.insert(id.clone(), node);
        debug!("created node {}", id);
        Ok(id)
    }

    pub fn create_root(&mut self, id: Option<NodeId>, name: impl Into<String>, x: f64, y: f64) -> Result<NodeId, GraphError> {
        if let Some(existing) = &self.root {
            return Err(GraphError::invalid(format!("graph already has root {}", existing)));
        }
        let id = self.create_node(id, None, name, "")?;
        self.set_position(&id, x, y)?;
        self.root = Some(id.clone());
        Ok(id)
    }

    pub fn add_child(&mut self, parent: &str, child: &str) -> Result<(), GraphError> {
        if !self.nodes.contains_key(parent) {
            return Err(GraphError::invalid(format!("parent {} is not attached", parent)));
        }
        let c = self.nodes.get(child).ok_or_else(|| GraphError::NodeNotFound(child.to_string()))?;
        if let Some(existing) = &c.parent {
            return Err(GraphError::invalid(format!("{} already has parent {}", child, existing)));
        }
        if self.root.as_deref() == Some(child) {
            return Err(GraphError::invalid("the root cannot become a child"));
        }
        if self.is_ancestor(child, parent) {
            return Err(GraphError::invalid(format!("linking {} under {} would create a cycle", child, parent)));
        }

        self.nodes[parent].children.push(child.to_string());
        self.nodes[child].parent = Some(parent.to_string());
        let line = self.lines.create_line(&self.nodes[parent], &self.nodes[child], &self.view);
        self.view.create_line(&Edge::new(parent, child), &line);
        debug!("linked {} under {}", child, parent);
        Ok(())
    }

    // Single level: the removed node's own children stay registered as
    // orphans (no parent, no line). Use `remove_subtree` to take them along.
    pub fn remove_child(&mut self, parent: &str, child: &str) -> Result<(), GraphError> {
        let p = self
            .nodes
            .get_mut(parent)
            .ok_or_else(|| GraphError::invalid(format!("parent {} is not attached", parent)))?;
        let idx = p
            .children
            .iter()
            .position(|c| c == child)
            .ok_or_else(|| GraphError::invalid(format!("{} is not a child of {}", child, parent)))?;
        p.children.remove(idx);
        self.discard(child);
        debug!("removed {} from {}", child, parent);
        Ok(())
    }

    pub fn remove_subtree(&mut self, id: &str) -> Result<Vec<NodeId>, GraphError> {
        let node = self.nodes.get(id).ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        let parent = node
            .parent
            .clone()
            .ok_or_else(|| GraphError::invalid(format!("{} has no parent and cannot be removed", id)))?;

        // Reversed pre-order: every node comes before its parent.
        let mut order = Vec::new();
        let mut stack = node.children.clone();
        while let Some(next) = stack.pop() {
            if let Some(n) = self.nodes.get(&next) {
                stack.extend(n.children.iter().cloned());
            }
            order.push(next);
        }
        order.reverse();

        for desc in &order {
            if let Some(p) = self.nodes.get(desc).and_then(|n| n.parent.clone()) {
                self.remove_child(&p, desc)?;
            }
        }
        self.remove_child(&parent, id)?;
        order.push(id.to_string());
        Ok(order)
    }

    pub fn destroy(&mut self, id: &str) -> Result<(), GraphError> {
        let node = self.nodes.get(id).ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        match node.parent.clone() {
            Some(parent) => self.remove_child(&parent, id),
            None => Err(GraphError::invalid(format!("{} has no parent and cannot be destroyed", id))),
        }
    }

    pub fn set_selected(&mut self, id: &str, value: bool) -> Result<(), GraphError> {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::NodeNotFound(id.to_string()));
        }
        if value {
            if let Some(prev) = self.selected.take()
                && let Some(n) = self.nodes.get_mut(&prev)
            {
                n.selected = false;
            }
            self.nodes[id].selected = true;
            self.selected = Some(id.to_string());
        } else {
            self.nodes[id].selected = false;
            if self.selected.as_deref() == Some(id) {
                self.selected = None;
            }
        }
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        if let Some(prev) = self.selected.take()
            && let Some(n) = self.nodes.get_mut(&prev)
        {
            n.selected = false;
        }
    }

    // Moves the node and reports which lines are now stale: the one up to
    // its parent and every one down to its children. Nothing is redrawn
    // until the caller passes them to `refresh_lines`.
    pub fn set_position(&mut self, id: &str, x: f64, y: f64) -> Result<Vec<Edge>, GraphError> {
        let node = self.nodes.get_mut(id).ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        node.x = x;
        node.y = y;
        let mut dirty = Vec::with_capacity(node.children.len() + 1);
        if let Some(parent) = &node.parent {
            dirty.push(Edge::new(parent.clone(), id));
        }
        dirty.extend(node.children.iter().map(|c| Edge::new(id, c.clone())));
        self.view.set_position(id, x, y);
        Ok(dirty)
    }

    pub fn refresh_lines(&mut self, dirty: &[Edge]) -> usize {
        let mut refreshed = 0;
        for edge in dirty {
            let (Some(p), Some(c)) = (self.nodes.get(&edge.parent), self.nodes.get(&edge.child)) else { continue };
            if let Some(line) = self.lines.update_line(p, c, &self.view) {
                self.view.update_line(edge, &line);
                refreshed += 1;
            }
        }
        refreshed
    }

    pub fn move_node(&mut self, id: &str, x: f64, y: f64) -> Result<(), GraphError> {
        let dirty = self.set_position(id, x, y)?;
        self.refresh_lines(&dirty);
        Ok(())
    }

    pub fn update_line(&mut self, parent: &str, child: &str) -> bool {
        self.refresh_lines(&[Edge::new(parent, child)]) == 1
    }

    // Only the lines from `id` to its children; see `LineSync::update_all_lines`.
    pub fn update_all_lines(&mut self, id: &str) -> Vec<Edge> {
        let Some(node) = self.nodes.get(id) else { return Vec::new() };
        let updated = self.lines.update_all_lines(node, &self.nodes, &self.view);
        updated
            .into_iter()
            .map(|(edge, line)| {
                self.view.update_line(&edge, &line);
                edge
            })
            .collect()
    }

    pub fn refresh_all_lines(&mut self) -> usize {
        let all: Vec<Edge> = self.lines.iter().map(|(edge, _)| edge).collect();
        self.refresh_lines(&all)
    }

    // Shift every node; each stale line is recomputed once.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let ids: Vec<NodeId> = self.nodes.keys().cloned().collect();
        let mut dirty: IndexSet<Edge> = IndexSet::new();
        for id in ids {
            let (x, y) = {
                let n = &self.nodes[&id];
                (n.x + dx, n.y + dy)
            };
            if let Ok(edges) = self.set_position(&id, x, y) {
                dirty.extend(edges);
            }
        }
        let dirty: Vec<Edge> = dirty.into_iter().collect();
        self.refresh_lines(&dirty);
    }

    pub fn rename(&mut self, id: &str, name: impl Into<String>) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(id).ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        node.name = name.into();
        Ok(())
    }

    pub fn set_content(&mut self, id: &str, content: impl Into<String>) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(id).ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        node.content = content.into();
        Ok(())
    }

    pub fn serialize(&self) -> Vec<NodeRecord> {
        self.nodes.values().map(Node::to_record).collect()
    }

    // Two passes: create every node unlinked, then replay the child lists.
    // The whole document is validated up front, and anything created by a
    // failed attempt is discarded again.
    pub fn deserialize(&mut self, records: &[NodeRecord]) -> Result<(), GraphError> {
        if !self.nodes.is_empty() {
            return Err(GraphError::invalid("documents can only be loaded into an empty graph"));
        }
        let root = document::validate(records).map_err(|e| GraphError::InvalidDocument(e.to_string()))?;

        let mut created = Vec::with_capacity(records.len());
        if let Err(e) = self.load_records(records, &mut created) {
            for id in created.iter().rev() {
                self.discard(id);
            }
            return Err(e);
        }
        self.root = Some(root);
        debug!("loaded {} nodes", created.len());
        Ok(())
    }

    fn load_records(&mut self, records: &[NodeRecord], created: &mut Vec<NodeId>) -> Result<(), GraphError> {
        for r in records {
            let id = self.create_node(Some(r.id.clone()), None, r.name.clone(), r.content.clone())?;
            created.push(id);
            self.set_position(&r.id, r.x, r.y)?;
        }
        for r in records {
            for child in &r.children {
                self.add_child(&r.id, child)?;
            }
        }
        Ok(())
    }

    // Drop a node from the registry with everything that mentions it, except
    // its parent's child list.
    fn discard(&mut self, id: &str) {
        for edge in self.lines.remove_node(id) {
            self.view.remove_line(&edge);
        }
        if let Some(removed) = self.nodes.shift_remove(id) {
            for orphan in &removed.children {
                if let Some(n) = self.nodes.get_mut(orphan) {
                    n.parent = None;
                }
            }
        }
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        if self.root.as_deref() == Some(id) {
            self.root = None;
        }
        self.view.remove_visual(id);
    }

    // Issued ids survive this on purpose: they stay unique for the session.
    pub fn clear(&mut self) {
        let ids: Vec<NodeId> = self.nodes.keys().cloned().collect();
        for id in &ids {
            self.view.remove_visual(id);
        }
        self.nodes.clear();
        self.lines.clear();
        self.view.clear();
        self.selected = None;
        self.root = None;
        debug!("cleared {} nodes", ids.len());
    }

    fn is_ancestor(&self, candidate: &str, of: &str) -> bool {
        let mut cur = Some(of);
        let mut steps = 0;
        while let Some(id) = cur {
            if id == candidate {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
            cur = self.nodes.get(id).and_then(|n| n.parent.as_deref());
        }
        false
    }

    pub fn node(&self, id: &str) -> Option<&Node> { self.nodes.get(id) }
    pub fn nodes(&self) -> impl Iterator<Item = &Node> { self.nodes.values() }
    pub fn contains(&self, id: &str) -> bool { self.nodes.contains_key(id) }
    pub fn len(&self) -> usize { self.nodes.len() }
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }
    pub fn root_id(&self) -> Option<&str> { self.root.as_deref() }
    pub fn root(&self) -> Option<&Node> { self.root.as_deref().and_then(|id| self.nodes.get(id)) }
    pub fn selected_id(&self) -> Option<&str> { self.selected.as_deref() }
    pub fn selected(&self) -> Option<&Node> { self.selected.as_deref().and_then(|id| self.nodes.get(id)) }
    pub fn line(&self, parent: &str, child: &str) -> Option<&Line> { self.lines.get(parent, child) }
    pub fn lines(&self) -> &LineSync { &self.lines }
    pub fn ids(&self) -> &IdRegistry { &self.ids }
    pub fn spacing(&self) -> f64 { self.spacing }
    pub fn set_spacing(&mut self, spacing: f64) { self.spacing = spacing; }
    pub fn view(&self) -> &R { &self.view }
    pub fn view_mut(&mut self) -> &mut R { &mut self.view }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with_root() -> MindMap {
        let mut map = MindMap::new(HeadlessView::with_default_size(100.0, 40.0));
        map.create_root(Some(ROOT_ID.to_string()), "root", 100.0, 100.0).unwrap();
        map
    }

    #[test]
    fn exhausted_id_space_reaches_the_caller() {
        let mut map = map_with_root();
        map.set_id_source(rand::rngs::mock::StepRng::new(0, 0));
        let first = map.create_node(None, Some(ROOT_ID), "first", "").unwrap();
        let err = map.create_node(None, Some(ROOT_ID), "second", "").unwrap_err();
        assert!(matches!(err, GraphError::IdSpaceExhausted { .. }));
        assert_eq!(map.len(), 2);
        assert!(map.contains(&first));
        // Explicit ids do not draw from the source.
        assert!(map.create_node(Some("manual".into()), None, "m", "").is_ok());
    }

    #[test]
    fn child_defaults_below_parent() {
        let mut map = map_with_root();
        let id = map.create_node(None, Some(ROOT_ID), "Idea", "").unwrap();
        let n = map.node(&id).unwrap();
        assert_eq!((n.x, n.y), (100.0, 100.0 + 40.0 + DEFAULT_NODE_SPACING));
        // Not linked until add_child.
        assert!(n.parent.is_none());
        assert!(map.root().unwrap().children.is_empty());
    }

    #[test]
    fn explicit_duplicate_id_is_rejected() {
        let mut map = map_with_root();
        let err = map.create_node(Some(ROOT_ID.to_string()), None, "again", "").unwrap_err();
        assert_eq!(err, GraphError::DuplicateId(ROOT_ID.to_string()));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn add_child_rejects_detached_parent_and_cycles() {
        let mut map = map_with_root();
        let a = map.create_node(None, Some(ROOT_ID), "a", "").unwrap();
        let b = map.create_node(None, Some(ROOT_ID), "b", "").unwrap();
        map.add_child(ROOT_ID, &a).unwrap();
        map.add_child(&a, &b).unwrap();

        assert!(matches!(map.add_child("ghost", &b), Err(GraphError::InvalidOperation(_))));
        assert!(matches!(map.add_child(&b, ROOT_ID), Err(GraphError::InvalidOperation(_))));
        assert!(matches!(map.add_child(&b, &b), Err(GraphError::InvalidOperation(_))));
        // a already has a parent
        assert!(matches!(map.add_child(&b, &a), Err(GraphError::InvalidOperation(_))));
        assert_eq!(map.lines().len(), 2);
    }

    #[test]
    fn remove_child_orphans_grandchildren() {
        let mut map = map_with_root();
        let a = map.create_node(None, Some(ROOT_ID), "a", "").unwrap();
        map.add_child(ROOT_ID, &a).unwrap();
        let b = map.create_node(None, Some(&a), "b", "").unwrap();
        map.add_child(&a, &b).unwrap();

        map.remove_child(ROOT_ID, &a).unwrap();
        assert!(!map.contains(&a));
        assert!(map.contains(&b));
        assert!(map.node(&b).unwrap().parent.is_none());
        assert!(map.lines().is_empty());
        assert!(map.view().lines.is_empty());
    }

    #[test]
    fn remove_subtree_takes_descendants() {
        let mut map = map_with_root();
        let a = map.create_node(None, Some(ROOT_ID), "a", "").unwrap();
        map.add_child(ROOT_ID, &a).unwrap();
        let b = map.create_node(None, Some(&a), "b", "").unwrap();
        map.add_child(&a, &b).unwrap();
        let c = map.create_node(None, Some(&b), "c", "").unwrap();
        map.add_child(&b, &c).unwrap();

        let removed = map.remove_subtree(&a).unwrap();
        assert_eq!(removed, vec![c, b, a]);
        assert_eq!(map.len(), 1);
        assert!(map.lines().is_empty());
    }

    #[test]
    fn destroy_root_is_refused() {
        let mut map = map_with_root();
        assert!(matches!(map.destroy(ROOT_ID), Err(GraphError::InvalidOperation(_))));
        assert!(map.root().is_some());
    }

    #[test]
    fn set_position_reports_parent_and_child_edges() {
        let mut map = map_with_root();
        let a = map.create_node(None, Some(ROOT_ID), "a", "").unwrap();
        map.add_child(ROOT_ID, &a).unwrap();
        let b = map.create_node(None, Some(&a), "b", "").unwrap();
        map.add_child(&a, &b).unwrap();

        let dirty = map.set_position(&a, 0.0, 0.0).unwrap();
        assert_eq!(dirty, vec![Edge::new(ROOT_ID, a.clone()), Edge::new(a.clone(), b.clone())]);
        // Stale until refreshed.
        assert_ne!(map.line(ROOT_ID, &a).unwrap().x2, 50.0);
        assert_eq!(map.refresh_lines(&dirty), 2);
        assert_eq!(map.line(ROOT_ID, &a).unwrap().x2, 50.0);
        assert_eq!(map.line(&a, &b).unwrap().x1, 50.0);
    }

    #[test]
    fn pan_moves_everything_and_keeps_lines_attached() {
        let mut map = map_with_root();
        let a = map.create_node(None, Some(ROOT_ID), "a", "").unwrap();
        map.add_child(ROOT_ID, &a).unwrap();
        map.pan_by(15.0, -5.0);
        let root = map.root().unwrap();
        assert_eq!((root.x, root.y), (115.0, 95.0));
        let line = *map.line(ROOT_ID, &a).unwrap();
        assert_eq!((line.x1, line.y1), (165.0, 115.0));
        assert_eq!(map.view().lines[&Edge::new(ROOT_ID, a)], line);
    }

    #[test]
    fn clear_keeps_issued_ids() {
        let mut map = map_with_root();
        let a = map.create_node(None, Some(ROOT_ID), "a", "").unwrap();
        map.clear();
        assert!(map.is_empty());
        assert!(map.root().is_none());
        assert!(map.ids().is_issued(&a));
        assert!(map.ids().is_issued(ROOT_ID));
    }
}
