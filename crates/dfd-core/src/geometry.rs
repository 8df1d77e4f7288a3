//! Arrow geometry for data flows.
//!
//! Flows are drawn as straight segments between the boundaries of their two
//! shapes. Processes are circles inscribed in their bounding box; entities
//! and data stores are rectangles. All math is in un-zoomed content space.

use crate::model::{Element, ElementKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box of a rendered shape.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

/// Boundary used when clipping an arrow against a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outline {
    /// Circle of diameter `width`, centered in the bounds.
    Circle,
    Rect,
}

impl Outline {
    pub const fn for_kind(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Process => Outline::Circle,
            ElementKind::DataStore | ElementKind::Entity => Outline::Rect,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    pub bounds: Bounds,
    pub outline: Outline,
}

/// Rendered size of each element kind. The registry stores positions only;
/// the drawing surface decides how large shapes are.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeMetrics {
    pub process_diameter: f32,
    pub entity_width: f32,
    pub entity_height: f32,
    pub data_store_width: f32,
    pub data_store_height: f32,
}

impl Default for ShapeMetrics {
    fn default() -> Self {
        Self {
            process_diameter: 100.0,
            entity_width: 120.0,
            entity_height: 60.0,
            data_store_width: 140.0,
            data_store_height: 50.0,
        }
    }
}

impl ShapeMetrics {
    pub fn size_of(&self, kind: ElementKind) -> (f32, f32) {
        match kind {
            ElementKind::Process => (self.process_diameter, self.process_diameter),
            ElementKind::Entity => (self.entity_width, self.entity_height),
            ElementKind::DataStore => (self.data_store_width, self.data_store_height),
        }
    }

    /// The clipping shape of an element at its current position.
    pub fn shape_of(&self, element: &Element) -> Shape {
        let (width, height) = self.size_of(element.kind);
        Shape {
            bounds: Bounds {
                x: element.position.left,
                y: element.position.top,
                width,
                height,
            },
            outline: Outline::for_kind(element.kind),
        }
    }
}

/// `Math.sign` semantics: zero stays zero.
fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Point where the ray from the shape's center toward `other_center` leaves
/// the shape's boundary. Coincident centers return the center itself.
pub fn intersection(shape: &Shape, other_center: Point) -> Point {
    let b = shape.bounds;
    let center = b.center();
    let dx = other_center.x - center.x;
    let dy = other_center.y - center.y;

    match shape.outline {
        Outline::Circle => {
            let radius = b.width / 2.0;
            let dist = dx.hypot(dy);
            if dist == 0.0 {
                return center;
            }
            Point::new(
                center.x + dx / dist * radius,
                center.y + dy / dist * radius,
            )
        }
        Outline::Rect => {
            let half_w = b.width / 2.0;
            let half_h = b.height / 2.0;
            if dx == 0.0 {
                return Point::new(center.x, center.y + sign(dy) * half_h);
            }
            if dy == 0.0 {
                return Point::new(center.x + sign(dx) * half_w, center.y);
            }
            let slope = dy / dx;
            let rect_slope = half_h / half_w;
            if slope.abs() < rect_slope {
                // Shallower than the diagonal: leave through a vertical side.
                let x = center.x + sign(dx) * half_w;
                Point::new(x, center.y + slope * (x - center.x))
            } else {
                let y = center.y + sign(dy) * half_h;
                Point::new(center.x + (y - center.y) / slope, y)
            }
        }
    }
}

/// Everything the renderer needs to draw one flow arrow and its label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrowGeometry {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub length: f32,
    /// Rotation of the segment, `atan2`-based, in degrees.
    pub angle_degrees: f32,
    /// Label anchor.
    pub midpoint: Point,
}

impl ArrowGeometry {
    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }
}

/// Clip the center-to-center segment between two shapes at both boundaries.
pub fn arrow_geometry(from: &Shape, to: &Shape) -> ArrowGeometry {
    let from_center = from.bounds.center();
    let to_center = to.bounds.center();
    let start = intersection(from, to_center);
    let end = intersection(to, from_center);

    let dx = end.x - start.x;
    let dy = end.y - start.y;
    ArrowGeometry {
        x1: start.x,
        y1: start.y,
        x2: end.x,
        y2: end.y,
        length: dx.hypot(dy),
        angle_degrees: dy.atan2(dx).to_degrees(),
        midpoint: Point::new(start.x + dx / 2.0, start.y + dy / 2.0),
    }
}
