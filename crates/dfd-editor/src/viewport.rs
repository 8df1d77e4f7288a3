//! Pan/zoom transform between screen pixels and diagram content space.
//!
//! The model never sees screen coordinates: pointer positions go through
//! [`Viewport::screen_to_content`] before they reach the diagram.

use dfd_core::{Point, Position};
use serde::{Deserialize, Serialize};

/// Wheel zoom bounds and step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: 0.2,
            max: 3.0,
            step: 0.1,
        }
    }
}

/// Visible canvas size plus the `translate(pan) scale(zoom)` applied to content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1200.0, 800.0)
    }
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }

    /// Back to 100% with no pan. Size is kept.
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }

    /// One wheel notch at screen point `(x, y)`. Negative `delta_y` zooms in.
    /// The content point under the cursor stays put.
    pub fn zoom_at(&mut self, x: f32, y: f32, delta_y: f32, limits: &ZoomLimits) {
        let old = self.zoom;
        if delta_y < 0.0 {
            self.zoom = (self.zoom + limits.step).min(limits.max);
        } else if delta_y > 0.0 {
            self.zoom = (self.zoom - limits.step).max(limits.min);
        } else {
            return;
        }
        let ratio = self.zoom / old;
        self.pan_x = x - (x - self.pan_x) * ratio;
        self.pan_y = y - (y - self.pan_y) * ratio;
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    pub fn pan_to(&mut self, x: f32, y: f32) {
        self.pan_x = x;
        self.pan_y = y;
    }

    pub fn screen_to_content(&self, p: Point) -> Point {
        Point::new((p.x - self.pan_x) / self.zoom, (p.y - self.pan_y) / self.zoom)
    }

    pub fn content_to_screen(&self, p: Point) -> Point {
        Point::new(p.x * self.zoom + self.pan_x, p.y * self.zoom + self.pan_y)
    }

    /// Content-space point at the middle of the visible canvas. New shapes
    /// are dropped here.
    pub fn content_center(&self) -> Position {
        let c = self.screen_to_content(Point::new(self.width / 2.0, self.height / 2.0));
        Position::new(c.y, c.x)
    }

    /// CSS transform for the content layer.
    pub fn css_transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.pan_x, self.pan_y, self.zoom
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn zoom_keeps_cursor_point_fixed() {
        let mut vp = Viewport::new(800.0, 600.0);
        vp.pan_to(30.0, -20.0);
        let cursor = Point::new(200.0, 150.0);
        let before = vp.screen_to_content(cursor);

        vp.zoom_at(cursor.x, cursor.y, -1.0, &ZoomLimits::default());
        assert!((vp.zoom - 1.1).abs() < EPS);
        let after = vp.screen_to_content(cursor);
        assert!((before.x - after.x).abs() < EPS);
        assert!((before.y - after.y).abs() < EPS);
    }

    #[test]
    fn zoom_is_clamped() {
        let limits = ZoomLimits::default();
        let mut vp = Viewport::new(800.0, 600.0);
        for _ in 0..50 {
            vp.zoom_at(0.0, 0.0, -1.0, &limits);
        }
        assert!((vp.zoom - limits.max).abs() < EPS);
        for _ in 0..50 {
            vp.zoom_at(0.0, 0.0, 1.0, &limits);
        }
        assert!((vp.zoom - limits.min).abs() < EPS);

        let z = vp.zoom;
        vp.zoom_at(0.0, 0.0, 0.0, &limits);
        assert_eq!(vp.zoom, z);
    }

    #[test]
    fn content_center_accounts_for_pan_and_zoom() {
        let mut vp = Viewport::new(800.0, 600.0);
        assert_eq!(vp.content_center(), Position::new(300.0, 400.0));

        vp.pan_to(100.0, 50.0);
        vp.zoom = 2.0;
        assert_eq!(vp.content_center(), Position::new(125.0, 150.0));
    }

    #[test]
    fn screen_content_roundtrip() {
        let mut vp = Viewport::new(800.0, 600.0);
        vp.pan_to(12.0, 34.0);
        vp.zoom = 1.5;
        let p = Point::new(77.0, 88.0);
        let back = vp.content_to_screen(vp.screen_to_content(p));
        assert!((back.x - p.x).abs() < EPS && (back.y - p.y).abs() < EPS);
        assert_eq!(vp.css_transform(), "translate(12px, 34px) scale(1.5)");
    }
}
