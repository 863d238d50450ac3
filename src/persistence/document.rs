use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

use crate::graph_utils::graph::{NodeId, NodeRecord, ROOT_ID};

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("malformed document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("document contains no nodes")]
    Empty,
    #[error("duplicate node id {0}")]
    DuplicateId(NodeId),
    #[error("node {parent} lists unknown child {child}")]
    UnknownChild { parent: NodeId, child: NodeId },
    #[error("node {0} lists itself as a child")]
    SelfReference(NodeId),
    #[error("node {0} is listed as a child more than once")]
    SharedChild(NodeId),
    #[error("document has no root node")]
    NoRoot,
    #[error("node {0} is not reachable from a root")]
    Cycle(NodeId),
    #[error("node {0} has a non-finite position")]
    NonFiniteCoordinate(NodeId),
}

pub fn parse(text: &str) -> Result<Vec<NodeRecord>, DocumentError> {
    let records: Vec<NodeRecord> = serde_json::from_str(text)?;
    Ok(records)
}

// Parse and validate in one go; nothing is handed back unless the whole
// document could be loaded.
pub fn parse_validated(text: &str) -> Result<Vec<NodeRecord>, DocumentError> {
    let records = parse(text)?;
    validate(&records)?;
    Ok(records)
}

pub fn to_json(records: &[NodeRecord], pretty: bool) -> Result<String, DocumentError> {
    let s = if pretty { serde_json::to_string_pretty(records)? } else { serde_json::to_string(records)? };
    Ok(s)
}

/// Check that the records form a loadable tree and return the root id.
///
/// The document has no root marker: the root is a record no other record
/// lists as a child. If orphans were saved alongside the tree there can be
/// several such records; `"root"` wins, else the first one in the file.
pub fn validate(records: &[NodeRecord]) -> Result<NodeId, DocumentError> {
    if records.is_empty() {
        return Err(DocumentError::Empty);
    }

    let mut ids: HashSet<&str> = HashSet::with_capacity(records.len());
    for r in records {
        if !ids.insert(r.id.as_str()) {
            return Err(DocumentError::DuplicateId(r.id.clone()));
        }
        // serde_json writes NaN and infinities as null, which would not load back.
        if !r.x.is_finite() || !r.y.is_finite() {
            return Err(DocumentError::NonFiniteCoordinate(r.id.clone()));
        }
    }

    let mut referenced: HashSet<&str> = HashSet::new();
    for r in records {
        for child in &r.children {
            if child == &r.id {
                return Err(DocumentError::SelfReference(r.id.clone()));
            }
            if !ids.contains(child.as_str()) {
                return Err(DocumentError::UnknownChild { parent: r.id.clone(), child: child.clone() });
            }
            if !referenced.insert(child.as_str()) {
                return Err(DocumentError::SharedChild(child.clone()));
            }
        }
    }

    let tops: Vec<&str> = records
        .iter()
        .map(|r| r.id.as_str())
        .filter(|id| !referenced.contains(id))
        .collect();
    if tops.is_empty() {
        return Err(DocumentError::NoRoot);
    }

    // Every child has exactly one parent by now, so anything not reachable
    // from a top-level record sits on a cycle.
    let children: HashMap<&str, &Vec<NodeId>> = records.iter().map(|r| (r.id.as_str(), &r.children)).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(records.len());
    let mut queue: VecDeque<&str> = tops.iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        if let Some(kids) = children.get(id) {
            queue.extend(kids.iter().map(|k| k.as_str()));
        }
    }
    if let Some(stray) = records.iter().find(|r| !seen.contains(r.id.as_str())) {
        return Err(DocumentError::Cycle(stray.id.clone()));
    }

    let root = tops.iter().find(|id| **id == ROOT_ID).unwrap_or(&tops[0]);
    Ok(root.to_string())
}
