pub mod config;
pub mod editor;
pub mod viewport;

pub use config::EditorConfig;
pub use editor::{DiagramEditor, RenderState};
pub use viewport::{Viewport, ZoomLimits};
