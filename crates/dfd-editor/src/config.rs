//! Editor configuration.
//!
//! Every field has a default, so the page can pass a partial JSON object
//! such as `{"metrics": {"process_diameter": 80}}`.

use crate::viewport::ZoomLimits;
use dfd_core::{LayoutConfig, ShapeMetrics};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Grid used for imported shapes without coordinates.
    pub layout: LayoutConfig,
    /// Shape sizes used for arrow clipping.
    pub metrics: ShapeMetrics,
    pub zoom: ZoomLimits,
    /// Title of a new, empty diagram.
    pub title: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            metrics: ShapeMetrics::default(),
            zoom: ZoomLimits::default(),
            title: "Data Flow Diagram".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            EditorConfig::from_json(r#"{"metrics": {"process_diameter": 80}, "zoom": {"max": 2}}"#)
                .unwrap();
        assert_eq!(config.metrics.process_diameter, 80.0);
        assert_eq!(config.metrics.entity_width, ShapeMetrics::default().entity_width);
        assert_eq!(config.zoom.max, 2.0);
        assert_eq!(config.zoom.min, 0.2);
        assert_eq!(config.layout, LayoutConfig::default());
        assert_eq!(config.title, "Data Flow Diagram");
    }
}
