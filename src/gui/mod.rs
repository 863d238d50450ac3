pub mod frontend;
pub mod scene;
