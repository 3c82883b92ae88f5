use crate::canvas::Viewport;
use crate::config::Style;
use crate::geometry::{Bounds, Point, Transform};

/// Centimetres per inch, for turning plot sizes into figure sizes.
const CM_PER_INCH: f64 = 2.54;

/// The canvas window: where it starts in model space and how many grid
/// units it spans. Recomputed by the auto-size passes on every render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub origin: Point,
    pub shape: Point,
}

impl Frame {
    pub fn transform(&self, grid_unit: f64) -> Transform {
        Transform::new(grid_unit, self.origin)
    }

    pub fn viewport(&self, grid_unit: f64, dpi: Option<u32>) -> Viewport {
        let transform = self.transform(grid_unit);
        Viewport {
            bounds: Bounds::from_corners(
                transform.convert(self.origin),
                transform.convert(self.origin + self.shape),
            ),
            size_in: self.shape * (grid_unit / CM_PER_INCH),
            dpi,
        }
    }
}

/// What an element needs to know while drawing itself: the immutable
/// style plus the coordinate transform of the current pass.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub style: &'a Style,
    pub transform: Transform,
    /// Extra vertical label offset, in points, for fixed nodes when the
    /// canvas height is inferred from content.
    pub fixed_label_nudge: f64,
}

impl<'a> RenderContext<'a> {
    pub fn new(style: &'a Style, frame: &Frame) -> Self {
        Self {
            style,
            transform: frame.transform(style.grid_unit),
            fixed_label_nudge: 0.0,
        }
    }

    pub fn convert(&self, model: Point) -> Point {
        self.transform.convert(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_spans_the_frame() {
        let frame = Frame {
            origin: Point::new(-1.0, 0.5),
            shape: Point::new(3.0, 2.0),
        };
        let viewport = frame.viewport(2.54, Some(150));
        assert_eq!(viewport.bounds.min, Point::ZERO);
        assert!((viewport.bounds.max.x - 7.62).abs() < 1e-12);
        assert!((viewport.bounds.max.y - 5.08).abs() < 1e-12);
        assert!((viewport.size_in.x - 3.0).abs() < 1e-12);
        assert_eq!(viewport.dpi, Some(150));
    }
}
