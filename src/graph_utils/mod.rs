pub mod error;
pub mod graph;
pub mod ids;
pub mod lines;
pub mod render;
