use thiserror::Error;

use super::graph::NodeId;

// Failures of the node graph model. Id collisions are retried inside the
// id registry and never show up here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("no unused node id found after {attempts} attempts")]
    IdSpaceExhausted { attempts: usize },
    #[error("node with id {0} not found")]
    NodeNotFound(NodeId),
    #[error("node id {0} is already in use")]
    DuplicateId(NodeId),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

impl GraphError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        GraphError::InvalidOperation(msg.into())
    }
}
