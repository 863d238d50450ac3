pub mod editor;
pub mod graph_utils;
pub mod gui;
pub mod persistence;
