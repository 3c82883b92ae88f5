//! The seam between the diagram core and whatever draws it.
//!
//! Plot space is measured in centimetres with y pointing up. Text offsets
//! are given in typographic points relative to their plot-space anchor.
//! The core only ever talks to a [`Canvas`]; the bundled SVG writer in
//! [`crate::render`] is one implementation and [`Recorder`] is another.

use crate::geometry::{Bounds, Point};
use crate::style::{HAlign, LineStyle, VAlign};
use std::path::Path;
use tracing::debug;

/// Fill and stroke settings shared by every filled or stroked primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Paint {
    pub face: String,
    pub edge: String,
    pub line_width: f64,
    pub line_style: LineStyle,
    pub alpha: f64,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            face: "none".to_string(),
            edge: "#000000".to_string(),
            line_width: 1.0,
            line_style: LineStyle::Solid,
            alpha: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ellipse {
    pub center: Point,
    pub width: f64,
    pub height: f64,
    pub paint: Paint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    /// Lower-left corner.
    pub corner: Point,
    pub width: f64,
    pub height: f64,
    pub paint: Paint,
}

impl Rectangle {
    pub fn bounds(&self) -> Bounds {
        Bounds::from_corners(
            self.corner,
            self.corner + Point::new(self.width, self.height),
        )
    }
}

impl Ellipse {
    pub fn bounds(&self) -> Bounds {
        Bounds::centered(self.center, self.width, self.height)
    }
}

/// A straight arrow whose total length, head included, runs from `start`
/// to `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub start: Point,
    pub end: Point,
    pub head_length: f64,
    pub head_width: f64,
    pub paint: Paint,
}

impl Arrow {
    /// The three corners of the arrow head, tip first.
    pub fn head(&self) -> [Point; 3] {
        let delta = self.end - self.start;
        let length = delta.length();
        if length == 0.0 {
            return [self.end; 3];
        }
        let dir = delta * (1.0 / length);
        let normal = Point::new(-dir.y, dir.x);
        let head_length = self.head_length.min(length);
        let base = self.end - dir * head_length;
        let half = normal * (0.5 * self.head_width);
        [self.end, base + half, base - half]
    }

    /// Where the shaft meets the head.
    pub fn shaft_end(&self) -> Point {
        let delta = self.end - self.start;
        let length = delta.length();
        if length == 0.0 {
            return self.end;
        }
        self.end - delta * (self.head_length.min(length) / length)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub start: Point,
    pub end: Point,
    pub paint: Paint,
}

/// Optional box drawn behind a text label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelBox {
    pub face: String,
    pub edge: String,
    pub line_width: f64,
    /// Padding around the text, in points.
    pub pad: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub content: String,
    /// Plot-space anchor.
    pub anchor: Point,
    /// Screen-space displacement from the anchor, in points.
    pub offset: Point,
    pub font_size: f64,
    pub color: String,
    pub h_align: HAlign,
    pub v_align: VAlign,
    pub label_box: Option<LabelBox>,
}

/// A 2D drawing surface.
///
/// Every call is synchronous and either draws or does nothing; validation
/// happens before the core reaches the canvas.
pub trait Canvas {
    fn draw_ellipse(&mut self, ellipse: &Ellipse);
    fn draw_rectangle(&mut self, rect: &Rectangle);
    fn draw_arrow(&mut self, arrow: &Arrow);
    fn draw_line(&mut self, line: &Line);
    fn annotate(&mut self, text: &Text);
}

/// How a finished canvas is written to disk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaveOptions {
    /// Crop to the drawn content plus a small margin.
    pub tight: bool,
    /// Raster resolution; vector output ignores it.
    pub dpi: Option<u32>,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            tight: true,
            dpi: None,
        }
    }
}

/// A canvas that can leave the process: written to a file or displayed.
pub trait Export {
    fn save(&self, path: &Path, options: &SaveOptions) -> anyhow::Result<()>;
    fn show(&self) -> anyhow::Result<()>;
}

/// Physical layout of a canvas about to be opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Visible plot-space window.
    pub bounds: Bounds,
    /// Figure size in inches.
    pub size_in: Point,
    pub dpi: Option<u32>,
}

/// Creates canvases on demand.
pub trait Backend {
    type Canvas: Canvas;

    fn open(&mut self, viewport: &Viewport) -> Self::Canvas;
}

/// Holds at most one live canvas.
///
/// The canvas is installed after a successful draw and released before
/// every re-render, whenever the model changes, and when the owner is
/// dropped.
#[derive(Debug)]
pub struct CanvasSlot<C> {
    canvas: Option<C>,
}

impl<C> Default for CanvasSlot<C> {
    fn default() -> Self {
        Self { canvas: None }
    }
}

impl<C> CanvasSlot<C> {
    pub fn get(&self) -> Option<&C> {
        self.canvas.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.canvas.is_some()
    }

    /// Installs a freshly drawn canvas, dropping any previous one.
    pub fn replace(&mut self, canvas: C) -> &mut C {
        debug!("canvas installed");
        self.canvas.insert(canvas)
    }

    pub fn release(&mut self) -> Option<C> {
        let released = self.canvas.take();
        if released.is_some() {
            debug!("canvas released");
        }
        released
    }
}

/// One captured draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Ellipse(Ellipse),
    Rectangle(Rectangle),
    Arrow(Arrow),
    Line(Line),
    Text(Text),
}

impl DrawCall {
    /// Extent of filled shapes; lines and text have none.
    pub fn shape_bounds(&self) -> Option<Bounds> {
        match self {
            DrawCall::Ellipse(ellipse) => Some(ellipse.bounds()),
            DrawCall::Rectangle(rect) => Some(rect.bounds()),
            DrawCall::Arrow(_) | DrawCall::Line(_) | DrawCall::Text(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DrawCall::Ellipse(_) => "ellipse",
            DrawCall::Rectangle(_) => "rectangle",
            DrawCall::Arrow(_) => "arrow",
            DrawCall::Line(_) => "line",
            DrawCall::Text(_) => "text",
        }
    }
}

/// A canvas that only remembers what it was asked to draw.
///
/// Used for the auto-size discovery passes, and handy in tests to check
/// draw order and geometry.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub viewport: Option<Viewport>,
    calls: Vec<DrawCall>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn arrows(&self) -> impl Iterator<Item = &Arrow> {
        self.calls.iter().filter_map(|call| match call {
            DrawCall::Arrow(arrow) => Some(arrow),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &Text> {
        self.calls.iter().filter_map(|call| match call {
            DrawCall::Text(text) => Some(text),
            _ => None,
        })
    }

    pub fn shape_bounds(&self) -> impl Iterator<Item = Bounds> + '_ {
        self.calls.iter().filter_map(DrawCall::shape_bounds)
    }
}

impl Canvas for Recorder {
    fn draw_ellipse(&mut self, ellipse: &Ellipse) {
        self.calls.push(DrawCall::Ellipse(ellipse.clone()));
    }

    fn draw_rectangle(&mut self, rect: &Rectangle) {
        self.calls.push(DrawCall::Rectangle(rect.clone()));
    }

    fn draw_arrow(&mut self, arrow: &Arrow) {
        self.calls.push(DrawCall::Arrow(arrow.clone()));
    }

    fn draw_line(&mut self, line: &Line) {
        self.calls.push(DrawCall::Line(line.clone()));
    }

    fn annotate(&mut self, text: &Text) {
        self.calls.push(DrawCall::Text(text.clone()));
    }
}

/// Backend that hands out [`Recorder`] canvases.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordingBackend;

impl Backend for RecordingBackend {
    type Canvas = Recorder;

    fn open(&mut self, viewport: &Viewport) -> Recorder {
        Recorder {
            viewport: Some(*viewport),
            calls: Vec::new(),
        }
    }
}
