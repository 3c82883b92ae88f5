use crate::canvas::{
    Arrow, Backend, Canvas, Ellipse, Export, LabelBox, Line, Paint, Rectangle, SaveOptions, Text,
    Viewport,
};
use crate::error::DiagramError;
use crate::geometry::{Bounds, Point};
use crate::style::{HAlign, VAlign};
use crate::text_metrics::measure_text_width;
use crate::theme::Theme;
use anyhow::Result;
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

/// SVG user units are points.
const PT_PER_CM: f64 = 72.0 / 2.54;
/// Margin around a tight bounding box: a tenth of an inch.
const TIGHT_PAD: f64 = 7.2;
#[cfg(feature = "png")]
const DEFAULT_DPI: u32 = 100;
const LINE_HEIGHT: f64 = 1.2;

/// Opens [`SvgCanvas`]es styled with a fixed theme.
#[derive(Debug, Clone, Default)]
pub struct SvgBackend {
    theme: Theme,
}

impl SvgBackend {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }
}

impl Backend for SvgBackend {
    type Canvas = SvgCanvas;

    fn open(&mut self, viewport: &Viewport) -> SvgCanvas {
        debug!(
            width_in = viewport.size_in.x,
            height_in = viewport.size_in.y,
            "opening svg canvas"
        );
        SvgCanvas::new(*viewport, self.theme.clone())
    }
}

/// Accumulates SVG elements for one page.
///
/// Plot space (centimetres, y up) maps onto a page in points with y down;
/// the page spans exactly the viewport. Everything drawn also grows the
/// page-space extent used for tight output.
#[derive(Debug, Clone)]
pub struct SvgCanvas {
    viewport: Viewport,
    theme: Theme,
    body: String,
    extent: Option<Bounds>,
}

impl SvgCanvas {
    pub fn new(viewport: Viewport, theme: Theme) -> Self {
        Self {
            viewport,
            theme,
            body: String::new(),
            extent: None,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Page size in points.
    pub fn page_size(&self) -> Point {
        Point::new(
            self.viewport.bounds.width() * PT_PER_CM,
            self.viewport.bounds.height() * PT_PER_CM,
        )
    }

    /// Page-space extent of everything drawn so far.
    pub fn extent(&self) -> Option<Bounds> {
        self.extent
    }

    fn to_page(&self, plot: Point) -> Point {
        let min = self.viewport.bounds.min;
        Point::new(
            (plot.x - min.x) * PT_PER_CM,
            self.page_size().y - (plot.y - min.y) * PT_PER_CM,
        )
    }

    fn grow(&mut self, bounds: Bounds) {
        self.extent = Some(match self.extent {
            Some(extent) => extent.union(bounds),
            None => bounds,
        });
    }

    /// The full document. With `tight`, the view box hugs the drawn
    /// content plus a small margin instead of the whole page.
    pub fn to_svg(&self, tight: bool) -> String {
        let page = Bounds::from_corners(Point::ZERO, self.page_size());
        let view = match self.extent {
            Some(extent) if tight => {
                let pad = Point::new(TIGHT_PAD, TIGHT_PAD);
                Bounds::from_corners(extent.min - pad, extent.max + pad)
            }
            _ => page,
        };
        let (x, y, width, height) = (view.min.x, view.min.y, view.width(), view.height());

        let mut svg = String::new();
        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}pt\" height=\"{height:.2}pt\" viewBox=\"{x:.2} {y:.2} {width:.2} {height:.2}\">",
        ));
        svg.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" fill=\"{}\"/>",
            escape_xml(&self.theme.background)
        ));
        svg.push_str(&format!(
            "<g font-family=\"{}\">",
            escape_xml(&self.theme.font_family)
        ));
        svg.push_str(&self.body);
        svg.push_str("</g></svg>");
        svg
    }

    /// Page-space box of a text block whose reference point is `at`.
    fn text_box(&self, text: &Text, at: Point) -> Bounds {
        let lines = text.content.lines().count().max(1) as f64;
        let width = measure_text_width(&text.content, text.font_size, &self.theme.font_family);
        let height = text.font_size * (1.0 + LINE_HEIGHT * (lines - 1.0));
        let left = match text.h_align {
            HAlign::Left => at.x,
            HAlign::Center => at.x - 0.5 * width,
            HAlign::Right => at.x - width,
        };
        let top = match text.v_align {
            VAlign::Top => at.y,
            VAlign::Center => at.y - 0.5 * height,
            VAlign::Bottom => at.y - height,
            VAlign::Baseline => at.y - height + 0.2 * text.font_size,
        };
        Bounds::from_corners(
            Point::new(left, top),
            Point::new(left + width, top + height),
        )
    }

    fn label_box(&mut self, bounds: Bounds, label_box: &LabelBox) -> Bounds {
        let pad = Point::new(label_box.pad, label_box.pad);
        let padded = Bounds::from_corners(bounds.min - pad, bounds.max + pad);
        let _ = write!(
            self.body,
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{:.2}\"/>",
            padded.min.x,
            padded.min.y,
            padded.width(),
            padded.height(),
            escape_xml(&label_box.face),
            escape_xml(&label_box.edge),
            label_box.line_width
        );
        padded
    }
}

impl Canvas for SvgCanvas {
    fn draw_ellipse(&mut self, ellipse: &Ellipse) {
        let center = self.to_page(ellipse.center);
        let rx = 0.5 * ellipse.width * PT_PER_CM;
        let ry = 0.5 * ellipse.height * PT_PER_CM;
        let _ = write!(
            self.body,
            "<ellipse cx=\"{:.2}\" cy=\"{:.2}\" rx=\"{rx:.2}\" ry=\"{ry:.2}\" {}/>",
            center.x,
            center.y,
            paint_attrs(&ellipse.paint)
        );
        let half = 0.5 * ellipse.paint.line_width;
        self.grow(Bounds::centered(center, 2.0 * (rx + half), 2.0 * (ry + half)));
    }

    fn draw_rectangle(&mut self, rect: &Rectangle) {
        let bounds = rect.bounds();
        let page = Bounds::from_corners(self.to_page(bounds.min), self.to_page(bounds.max));
        let _ = write!(
            self.body,
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" {}/>",
            page.min.x,
            page.min.y,
            page.width(),
            page.height(),
            paint_attrs(&rect.paint)
        );
        if rect.paint.face != "none" || rect.paint.edge != "none" {
            self.grow(page);
        }
    }

    fn draw_arrow(&mut self, arrow: &Arrow) {
        let start = self.to_page(arrow.start);
        let shaft_end = self.to_page(arrow.shaft_end());
        if start != shaft_end {
            let _ = write!(
                self.body,
                "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" {}/>",
                start.x,
                start.y,
                shaft_end.x,
                shaft_end.y,
                stroke_attrs(&arrow.paint)
            );
        }
        let head = arrow.head().map(|corner| self.to_page(corner));
        let points = head
            .iter()
            .map(|p| format!("{:.2},{:.2}", p.x, p.y))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = write!(
            self.body,
            "<polygon points=\"{points}\" {}/>",
            paint_attrs(&arrow.paint)
        );
        let extent = head
            .iter()
            .fold(Bounds::from_corners(start, start), |acc, &p| {
                acc.union(Bounds::from_corners(p, p))
            });
        self.grow(extent);
    }

    fn draw_line(&mut self, line: &Line) {
        let start = self.to_page(line.start);
        let end = self.to_page(line.end);
        let _ = write!(
            self.body,
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" {}/>",
            start.x,
            start.y,
            end.x,
            end.y,
            stroke_attrs(&line.paint)
        );
        self.grow(Bounds::from_corners(start, end));
    }

    fn annotate(&mut self, text: &Text) {
        let anchor = self.to_page(text.anchor);
        let at = Point::new(anchor.x + text.offset.x, anchor.y - text.offset.y);
        let mut bounds = self.text_box(text, at);
        if let Some(label_box) = &text.label_box {
            bounds = self.label_box(bounds, label_box);
        }
        if text.content.is_empty() {
            return;
        }

        let lines: Vec<&str> = text.content.lines().collect();
        let line_height = LINE_HEIGHT * text.font_size;
        let extra = line_height * (lines.len().max(1) - 1) as f64;
        let first_y = match text.v_align {
            VAlign::Top => at.y,
            VAlign::Center => at.y - 0.5 * extra,
            VAlign::Bottom | VAlign::Baseline => at.y - extra,
        };
        let text_anchor = match text.h_align {
            HAlign::Left => "start",
            HAlign::Center => "middle",
            HAlign::Right => "end",
        };
        let baseline = match text.v_align {
            VAlign::Top => "hanging",
            VAlign::Center => "central",
            VAlign::Bottom => "text-after-edge",
            VAlign::Baseline => "alphabetic",
        };

        let _ = write!(
            self.body,
            "<text x=\"{:.2}\" y=\"{first_y:.2}\" text-anchor=\"{text_anchor}\" dominant-baseline=\"{baseline}\" font-size=\"{:.2}\" fill=\"{}\">",
            at.x,
            text.font_size,
            escape_xml(&text.color)
        );
        for (idx, line) in lines.iter().enumerate() {
            let dy = if idx == 0 { 0.0 } else { line_height };
            let _ = write!(
                self.body,
                "<tspan x=\"{:.2}\" dy=\"{dy:.2}\">{}</tspan>",
                at.x,
                escape_xml(line)
            );
        }
        self.body.push_str("</text>");
        self.grow(bounds);
    }
}

impl Export for SvgCanvas {
    fn save(&self, path: &Path, options: &SaveOptions) -> Result<()> {
        let svg = self.to_svg(options.tight);
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        debug!(path = %path.display(), tight = options.tight, "saving diagram");
        match extension.as_deref() {
            Some("svg") => write_output_svg(&svg, Some(path)),
            #[cfg(feature = "png")]
            Some("png") => {
                let dpi = options.dpi.or(self.viewport.dpi).unwrap_or(DEFAULT_DPI);
                write_output_png(&svg, path, dpi, &self.theme.font_family)
            }
            other => Err(DiagramError::Export(format!(
                "unsupported output format `{}`",
                other.unwrap_or("")
            ))
            .into()),
        }
    }

    fn show(&self) -> Result<()> {
        write_output_svg(&self.to_svg(true), None)
    }
}

fn paint_attrs(paint: &Paint) -> String {
    format!("fill=\"{}\" {}", escape_xml(&paint.face), stroke_attrs(paint))
}

fn stroke_attrs(paint: &Paint) -> String {
    let mut attrs = format!(
        "stroke=\"{}\" stroke-width=\"{:.2}\"",
        escape_xml(&paint.edge),
        paint.line_width
    );
    if let Some(dashes) = paint.line_style.dasharray(paint.line_width) {
        attrs.push_str(&format!(" stroke-dasharray=\"{dashes}\""));
    }
    if paint.alpha < 1.0 {
        attrs.push_str(&format!(" opacity=\"{:.3}\"", paint.alpha.max(0.0)));
    }
    attrs
}

/// Writes `svg` to `output`, or to stdout when no path is given.
pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

/// Rasterizes `svg` at `dpi` and writes a PNG.
#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, dpi: u32, font_family: &str) -> Result<()> {
    let mut opt = usvg::Options::default();
    // One user unit per pixel before scaling, so `dpi / 72` maps points to pixels.
    opt.dpi = 72.0;
    opt.font_family = font_family
        .split(',')
        .next()
        .map(|family| family.trim().to_string())
        .unwrap_or_default();
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let scale = dpi as f32 / 72.0;
    let size = tree.size();
    let width = (size.width() * scale).ceil().max(1.0) as u32;
    let height = (size.height() * scale).ceil().max(1.0) as u32;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap_mut,
    );
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::LineStyle;

    fn canvas() -> SvgCanvas {
        let viewport = Viewport {
            bounds: Bounds::from_corners(Point::ZERO, Point::new(2.54, 2.54)),
            size_in: Point::new(1.0, 1.0),
            dpi: None,
        };
        SvgBackend::default().open(&viewport)
    }

    #[test]
    fn plot_space_maps_to_points_with_y_down() {
        let canvas = canvas();
        let page = canvas.page_size();
        assert!((page.x - 72.0).abs() < 1e-9 && (page.y - 72.0).abs() < 1e-9);
        let corner = canvas.to_page(Point::ZERO);
        assert!((corner.y - 72.0).abs() < 1e-9);
        let top = canvas.to_page(Point::new(2.54, 2.54));
        assert!(top.x > 71.99 && top.y.abs() < 1e-9);
    }

    #[test]
    fn render_svg_basic() {
        let mut canvas = canvas();
        canvas.draw_ellipse(&Ellipse {
            center: Point::new(1.27, 1.27),
            width: 1.0,
            height: 1.0,
            paint: Paint {
                face: "#ffffff".into(),
                ..Paint::default()
            },
        });
        canvas.draw_line(&Line {
            start: Point::ZERO,
            end: Point::new(1.0, 1.0),
            paint: Paint {
                line_style: LineStyle::Dashed,
                ..Paint::default()
            },
        });
        canvas.annotate(&Text {
            content: "a < b".into(),
            anchor: Point::new(1.27, 1.27),
            offset: Point::ZERO,
            font_size: 10.0,
            color: "#000000".into(),
            h_align: HAlign::Center,
            v_align: VAlign::Center,
            label_box: None,
        });
        let svg = canvas.to_svg(false);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("<ellipse cx=\"36.00\" cy=\"36.00\""));
        assert!(svg.contains("stroke-dasharray"));
        assert!(svg.contains("a &lt; b"));
        assert!(svg.contains("viewBox=\"0.00 0.00 72.00 72.00\""));
    }

    #[test]
    fn tight_view_box_hugs_the_content() {
        let mut canvas = canvas();
        canvas.draw_rectangle(&Rectangle {
            corner: Point::new(1.0, 1.0),
            width: 0.5,
            height: 0.5,
            paint: Paint {
                line_width: 0.0,
                ..Paint::default()
            },
        });
        let extent = canvas.extent().unwrap();
        assert!(extent.width() < 72.0);
        let svg = canvas.to_svg(true);
        let expected = format!("width=\"{:.2}pt\"", extent.width() + 2.0 * TIGHT_PAD);
        assert!(svg.contains(&expected), "{svg}");
    }

    #[test]
    fn invisible_rectangles_do_not_grow_the_extent() {
        let mut canvas = canvas();
        canvas.draw_rectangle(&Rectangle {
            corner: Point::ZERO,
            width: 0.0,
            height: 0.0,
            paint: Paint {
                face: "none".into(),
                edge: "none".into(),
                ..Paint::default()
            },
        });
        assert!(canvas.extent().is_none());
    }

    #[test]
    fn arrow_draws_shaft_and_head() {
        let mut canvas = canvas();
        canvas.draw_arrow(&Arrow {
            start: Point::new(0.0, 1.0),
            end: Point::new(2.0, 1.0),
            head_length: 0.25,
            head_width: 0.1,
            paint: Paint {
                face: "#000000".into(),
                ..Paint::default()
            },
        });
        let svg = canvas.to_svg(false);
        assert!(svg.contains("<line "));
        assert!(svg.contains("<polygon points="));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let canvas = canvas();
        let path = std::env::temp_dir().join("pgm-diagram-unknown.xyz");
        let err = canvas.save(&path, &SaveOptions::default()).unwrap_err();
        assert!(err.to_string().contains("unsupported output format"));
    }

    #[test]
    fn attribute_values_are_escaped() {
        let mut canvas = canvas();
        canvas.draw_rectangle(&Rectangle {
            corner: Point::ZERO,
            width: 1.0,
            height: 1.0,
            paint: Paint {
                face: "red\" onload=\"x".into(),
                edge: "<b>".into(),
                ..Paint::default()
            },
        });
        let svg = canvas.to_svg(false);
        assert!(!svg.contains("onload=\"x\""));
        assert!(svg.contains("fill=\"red&quot; onload=&quot;x\""));
        assert!(svg.contains("stroke=\"&lt;b&gt;\""));
    }

    #[test]
    fn escape_xml_handles_markup() {
        assert_eq!(escape_xml("<a & 'b'>"), "&lt;a &amp; &apos;b&apos;&gt;");
    }
}
