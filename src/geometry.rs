use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// A 2D point or displacement. Model space, plot space and screen offsets
/// all use this type; the surrounding API says which space applies.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn min(self, other: Point) -> Point {
        Point::new(self.x.min(other.x), self.y.min(other.y))
    }

    pub fn max(self, other: Point) -> Point {
        Point::new(self.x.max(other.x), self.y.max(other.y))
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new(0.5 * (self.x + other.x), 0.5 * (self.y + other.y))
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Point::new(x, y)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Axis-aligned extent in plot space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn centered(center: Point, width: f64, height: f64) -> Self {
        let half = Point::new(0.5 * width.abs(), 0.5 * height.abs());
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        const EPS: f64 = 1e-9;
        other.min.x >= self.min.x - EPS
            && other.min.y >= self.min.y - EPS
            && other.max.x <= self.max.x + EPS
            && other.max.y <= self.max.y + EPS
    }
}

/// Maps model units onto plot units (centimetres).
///
/// This is the only place where model coordinates become canvas
/// coordinates; every component routes through [`Transform::convert`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub grid_unit: f64,
    pub origin: Point,
}

impl Transform {
    pub fn new(grid_unit: f64, origin: Point) -> Self {
        Self { grid_unit, origin }
    }

    pub fn convert(&self, model: Point) -> Point {
        (model - self.origin) * self.grid_unit
    }

    pub fn invert(&self, plot: Point) -> Point {
        plot * (1.0 / self.grid_unit) + self.origin
    }

    /// Scales a plot-space length back into grid units without the origin
    /// shift.
    pub fn to_grid(&self, plot: Point) -> Point {
        plot * (1.0 / self.grid_unit)
    }
}
