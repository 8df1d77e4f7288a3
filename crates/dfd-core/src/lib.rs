pub mod error;
pub mod exchange;
pub mod geometry;
pub mod hierarchy;
pub mod id;
pub mod layout;
pub mod model;

pub use error::{DiagramError, FormatError};
pub use exchange::{Document, emit_document, export_document, parse_document};
pub use geometry::{ArrowGeometry, Bounds, Outline, Point, Shape, ShapeMetrics, arrow_geometry};
pub use hierarchy::{ContextInfo, ViewContext, VisibleSet, compute_visible_set};
pub use id::{ElementId, FlowId};
pub use layout::{GridPlacer, LayoutConfig};
pub use model::*;
