//! Node outlines and where edges meet them.

use crate::canvas::{Canvas, Ellipse, Paint, Rectangle};
use crate::error::DiagramError;
use crate::geometry::{Bounds, Point};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeShape {
    #[default]
    Ellipse,
    Rectangle,
}

impl FromStr for NodeShape {
    type Err = DiagramError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ellipse" | "circle" => Ok(Self::Ellipse),
            "rectangle" | "rect" => Ok(Self::Rectangle),
            other => Err(DiagramError::invalid(
                "shape",
                format!("expected `ellipse` or `rectangle`, got {other:?}"),
            )),
        }
    }
}

/// A node outline resolved into plot space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub shape: NodeShape,
    pub center: Point,
    pub width: f64,
    pub height: f64,
}

impl Footprint {
    pub fn bounds(&self) -> Bounds {
        Bounds::centered(self.center, self.width, self.height)
    }

    /// Same centre, each axis grown (or shrunk, for negative `delta`) by
    /// `delta` plot units.
    pub fn grown(&self, delta: f64) -> Footprint {
        Footprint {
            width: self.width + delta,
            height: self.height + delta,
            ..*self
        }
    }

    pub fn draw(&self, canvas: &mut dyn Canvas, paint: Paint) {
        match self.shape {
            NodeShape::Ellipse => canvas.draw_ellipse(&Ellipse {
                center: self.center,
                width: self.width,
                height: self.height,
                paint,
            }),
            NodeShape::Rectangle => canvas.draw_rectangle(&Rectangle {
                corner: self.center - Point::new(0.5 * self.width, 0.5 * self.height),
                width: self.width,
                height: self.height,
                paint,
            }),
        }
    }

    /// Point where the ray from the centre towards `target` leaves the
    /// outline. `None` when `target` is the centre itself.
    pub fn frontier(&self, target: Point) -> Option<Point> {
        let delta = target - self.center;
        if delta.x == 0.0 && delta.y == 0.0 {
            return None;
        }
        let exit = match self.shape {
            NodeShape::Ellipse => ellipse_exit(delta, self.width, self.height),
            NodeShape::Rectangle => rectangle_exit(delta, 0.5 * self.width, 0.5 * self.height),
        };
        Some(self.center + exit)
    }
}

fn ellipse_exit(delta: Point, width: f64, height: f64) -> Point {
    let aspect = width / height;
    let dist = delta.y.hypot(delta.x / aspect);
    delta * (0.5 * height / dist)
}

fn sign_or_one(value: f64) -> f64 {
    if value < 0.0 { -1.0 } else { 1.0 }
}

// Exactly one of the side or top/bottom candidates lies on the outline; it
// is the one closer to the centre. Ties (a corner) go to top/bottom.
fn rectangle_exit(delta: Point, half_w: f64, half_h: f64) -> Point {
    let sx = sign_or_one(delta.x);
    let sy = sign_or_one(delta.y);

    let side = (delta.x != 0.0)
        .then(|| Point::new(half_w * sx, half_w * (delta.y / delta.x).abs() * sy));
    let cap = (delta.y != 0.0)
        .then(|| Point::new(half_h * (delta.x / delta.y).abs() * sx, half_h * sy));

    match (side, cap) {
        (Some(side), Some(cap)) if side.length() < cap.length() => side,
        (_, Some(cap)) => cap,
        (Some(side), None) => side,
        (None, None) => Point::ZERO,
    }
}
