//! Grid auto-layout for imported shapes without explicit coordinates.
//!
//! Slots run left to right, then wrap to a new row once the next column
//! would cross the canvas width.

use crate::model::Position;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Left edge of the first column.
    pub origin_x: f32,
    /// Top edge of the first row.
    pub origin_y: f32,
    pub x_spacing: f32,
    pub y_spacing: f32,
    /// Visible canvas width used for wrapping.
    pub canvas_width: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: 50.0,
            origin_y: 50.0,
            x_spacing: 200.0,
            y_spacing: 150.0,
            canvas_width: 1200.0,
        }
    }
}

/// Hands out grid slots in reading order.
#[derive(Debug, Clone)]
pub struct GridPlacer {
    config: LayoutConfig,
    x: f32,
    y: f32,
}

impl GridPlacer {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            x: config.origin_x,
            y: config.origin_y,
        }
    }

    /// Take the current slot and advance to the next one.
    pub fn next_slot(&mut self) -> Position {
        let slot = Position::new(self.y, self.x);
        self.x += self.config.x_spacing;
        if self.x + self.config.x_spacing > self.config.canvas_width {
            self.x = self.config.origin_x;
            self.y += self.config.y_spacing;
        }
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn slots_wrap_at_canvas_width() {
        let mut grid = GridPlacer::new(LayoutConfig {
            canvas_width: 700.0,
            ..Default::default()
        });
        let slots: Vec<Position> = (0..4).map(|_| grid.next_slot()).collect();
        assert_eq!(
            slots,
            vec![
                Position::new(50.0, 50.0),
                Position::new(50.0, 250.0),
                // 450 + 200 fits, 650 + 200 does not.
                Position::new(50.0, 450.0),
                Position::new(200.0, 50.0),
            ]
        );
    }

    #[test]
    fn narrow_canvas_gives_one_column() {
        let mut grid = GridPlacer::new(LayoutConfig {
            canvas_width: 100.0,
            ..Default::default()
        });
        assert_eq!(grid.next_slot(), Position::new(50.0, 50.0));
        assert_eq!(grid.next_slot(), Position::new(200.0, 50.0));
    }
}
