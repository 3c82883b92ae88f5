use crate::canvas::{Canvas, LabelBox, Paint, Rectangle, Text};
use crate::context::RenderContext;
use crate::error::{DiagramError, Result};
use crate::geometry::Point;
use crate::style::{HAlign, LineStyle, Params, VAlign};
use std::str::FromStr;

/// Extra downward nudge, in points, for labels anchored to the top edge.
const TOP_LABEL_NUDGE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vertical {
    Bottom,
    Middle,
    Top,
}

/// Where a plate label is anchored: `"{vertical} {horizontal}"` with
/// vertical one of bottom/middle/top and horizontal one of
/// left/center/right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelPosition {
    pub vertical: Vertical,
    pub horizontal: HAlign,
}

impl FromStr for LabelPosition {
    type Err = DiagramError;

    fn from_str(value: &str) -> Result<Self> {
        let unknown = || DiagramError::UnknownPosition(value.to_string());
        let mut tokens = value.split_whitespace();
        let (Some(v), Some(h), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Err(unknown());
        };
        let vertical = match v {
            "bottom" => Vertical::Bottom,
            "middle" => Vertical::Middle,
            "top" => Vertical::Top,
            _ => return Err(unknown()),
        };
        let horizontal = match h {
            "left" => HAlign::Left,
            "center" => HAlign::Center,
            "right" => HAlign::Right,
            _ => return Err(unknown()),
        };
        Ok(Self {
            vertical,
            horizontal,
        })
    }
}

impl LabelPosition {
    /// Anchor point, label offset and alignment for a plate occupying
    /// `rect` in plot space. Labels on the right or top edge have their
    /// offset flipped so they read inward.
    pub fn place(&self, rect: &Rectangle, offset: Point) -> (Point, Point, HAlign, VAlign) {
        let mut anchor = rect.corner;
        let mut offset = offset;
        match self.horizontal {
            HAlign::Left => {}
            HAlign::Center => anchor.x += 0.5 * rect.width,
            HAlign::Right => {
                anchor.x += rect.width;
                offset.x = -offset.x;
            }
        }
        let v_align = match self.vertical {
            Vertical::Bottom => VAlign::Bottom,
            Vertical::Middle => {
                anchor.y += 0.5 * rect.height;
                VAlign::Center
            }
            Vertical::Top => {
                anchor.y += rect.height;
                offset.y = -offset.y - TOP_LABEL_NUDGE;
                VAlign::Top
            }
        };
        (anchor, offset, self.horizontal, v_align)
    }
}

/// A rectangle grouping repeated structure, optionally labelled.
///
/// `rect` is `[x, y, width, height]` in model units.
#[derive(Debug, Clone, PartialEq)]
pub struct Plate {
    rect: [f64; 4],
    label: Option<String>,
    label_offset: Point,
    shift: f64,
    position: String,
    font_size: Option<f64>,
    rect_params: Params,
    label_box: Option<Params>,
}

impl Plate {
    pub fn new(rect: [f64; 4]) -> Self {
        Self {
            rect,
            label: None,
            label_offset: Point::new(5.0, 5.0),
            shift: 0.0,
            position: "bottom left".to_string(),
            font_size: None,
            rect_params: Params::default(),
            label_box: None,
        }
    }

    /// An invisible zero-area plate that only places `label` at `(x, y)`.
    pub fn text(x: f64, y: f64, label: impl Into<String>, font_size: Option<f64>) -> Self {
        Self {
            label: Some(label.into()),
            label_offset: Point::ZERO,
            font_size,
            rect_params: Params::new().with("ec", "none").with("fc", "none"),
            label_box: Some(Params::new().with("fc", "none").with("ec", "none")),
            ..Self::new([x, y, 0.0, 0.0])
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label offset in points from the anchor.
    pub fn label_offset(mut self, dx: f64, dy: f64) -> Self {
        self.label_offset = Point::new(dx, dy);
        self
    }

    /// Moves the bottom edge by `shift` model units; the top stays put.
    pub fn shift(mut self, shift: f64) -> Self {
        self.shift = shift;
        self
    }

    /// Label anchor such as `"top right"`; checked when rendering.
    pub fn position(mut self, position: impl Into<String>) -> Self {
        self.position = position.into();
        self
    }

    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn rect_params(mut self, params: Params) -> Self {
        self.rect_params = params;
        self
    }

    /// Style of a box drawn behind the label; its face defaults to
    /// transparent.
    pub fn label_box(mut self, params: Params) -> Self {
        self.label_box = Some(params);
        self
    }

    pub fn rect(&self) -> [f64; 4] {
        self.rect
    }

    pub fn label_text(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The plate rectangle in plot space, after the bottom shift.
    pub fn plot_rect(&self, ctx: &RenderContext<'_>) -> (Point, Point) {
        let [x, y, w, h] = self.rect;
        let bottom_left = ctx.convert(Point::new(x, y + self.shift));
        let top_right = ctx.convert(Point::new(x + w, y + h));
        (bottom_left, top_right)
    }

    pub fn render(&self, ctx: &RenderContext<'_>, canvas: &mut dyn Canvas) -> Result<Rectangle> {
        let style = ctx.style;
        let params = &self.rect_params;
        let (bottom_left, top_right) = self.plot_rect(ctx);
        let size = top_right - bottom_left;

        let rectangle = Rectangle {
            corner: bottom_left,
            width: size.x,
            height: size.y,
            paint: Paint {
                face: params.color_or(&["fc", "facecolor"], &style.plate_fc)?,
                edge: params.color_or(&["ec", "edgecolor"], "k")?,
                line_width: params.number_or(&["lw", "linewidth"], style.line_width)?,
                line_style: params.string_or(&["ls", "linestyle"], "-")?.parse::<LineStyle>()?,
                alpha: params.number_or(&["alpha"], 1.0)?,
            },
        };
        canvas.draw_rectangle(&rectangle);

        if let Some(label) = &self.label {
            let position: LabelPosition = self.position.parse()?;
            let (anchor, offset, h_align, v_align) = position.place(&rectangle, self.label_offset);
            let font_size = self.font_size.unwrap_or(style.theme.font_size);
            let label_box = match &self.label_box {
                Some(bp) => Some(LabelBox {
                    face: bp.color_or(&["fc", "facecolor"], "none")?,
                    edge: bp.color_or(&["ec", "edgecolor"], "k")?,
                    line_width: bp.number_or(&["lw", "linewidth"], style.line_width)?,
                    pad: bp.number_or(&["pad"], 0.3 * font_size)?,
                }),
                None => None,
            };
            canvas.annotate(&Text {
                content: label.clone(),
                anchor,
                offset,
                font_size,
                color: style.theme.text_color.clone(),
                h_align,
                v_align,
                label_box,
            });
        }

        Ok(rectangle)
    }
}

impl From<[f64; 4]> for Plate {
    fn from(rect: [f64; 4]) -> Self {
        Plate::new(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawCall, Recorder};
    use crate::config::DiagramConfig;
    use crate::context::Frame;

    fn draw(plate: &Plate) -> Result<Recorder> {
        let style = DiagramConfig::default().validate().unwrap();
        let frame = Frame {
            origin: Point::ZERO,
            shape: Point::new(4.0, 4.0),
        };
        let ctx = RenderContext::new(&style, &frame);
        let mut recorder = Recorder::new();
        plate.render(&ctx, &mut recorder)?;
        Ok(recorder)
    }

    #[test]
    fn position_strings_parse_into_both_axes() {
        let pos: LabelPosition = "middle right".parse().unwrap();
        assert_eq!(pos.vertical, Vertical::Middle);
        assert_eq!(pos.horizontal, HAlign::Right);
        for bad in ["", "bottom", "left bottom", "top centre", "top left extra"] {
            assert!(
                matches!(bad.parse::<LabelPosition>(), Err(DiagramError::UnknownPosition(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn shift_moves_only_the_bottom_edge() {
        let recorder = draw(&Plate::new([0.0, 0.0, 2.0, 2.0]).shift(-0.5)).unwrap();
        let DrawCall::Rectangle(rect) = &recorder.calls()[0] else { panic!() };
        assert_eq!(rect.corner, Point::new(0.0, -1.0));
        assert_eq!((rect.width, rect.height), (4.0, 5.0));
    }

    #[test]
    fn bottom_left_label_sits_on_the_corner() {
        let recorder = draw(&Plate::new([0.0, 0.0, 2.0, 2.0]).label("N")).unwrap();
        let text = recorder.texts().next().unwrap();
        assert_eq!(text.anchor, Point::ZERO);
        assert_eq!(text.offset, Point::new(5.0, 5.0));
        assert_eq!((text.h_align, text.v_align), (HAlign::Left, VAlign::Bottom));
    }

    #[test]
    fn top_right_label_reads_inward() {
        let recorder = draw(
            &Plate::new([0.0, 0.0, 2.0, 2.0])
                .label("N")
                .position("top right"),
        )
        .unwrap();
        let text = recorder.texts().next().unwrap();
        assert_eq!(text.anchor, Point::new(4.0, 4.0));
        assert_eq!(text.offset, Point::new(-5.0, -5.1));
        assert_eq!((text.h_align, text.v_align), (HAlign::Right, VAlign::Top));
    }

    #[test]
    fn every_position_places_anchor_offset_and_alignment() {
        let rect = Rectangle {
            corner: Point::ZERO,
            width: 2.0,
            height: 2.0,
            paint: Paint::default(),
        };
        let cases = [
            ("bottom left", (0.0, 0.0), (5.0, 5.0), HAlign::Left, VAlign::Bottom),
            ("bottom center", (1.0, 0.0), (5.0, 5.0), HAlign::Center, VAlign::Bottom),
            ("bottom right", (2.0, 0.0), (-5.0, 5.0), HAlign::Right, VAlign::Bottom),
            ("middle left", (0.0, 1.0), (5.0, 5.0), HAlign::Left, VAlign::Center),
            ("middle center", (1.0, 1.0), (5.0, 5.0), HAlign::Center, VAlign::Center),
            ("middle right", (2.0, 1.0), (-5.0, 5.0), HAlign::Right, VAlign::Center),
            ("top left", (0.0, 2.0), (5.0, -5.1), HAlign::Left, VAlign::Top),
            ("top center", (1.0, 2.0), (5.0, -5.1), HAlign::Center, VAlign::Top),
            ("top right", (2.0, 2.0), (-5.0, -5.1), HAlign::Right, VAlign::Top),
        ];
        for (position, anchor, offset, h_align, v_align) in cases {
            let placed = position
                .parse::<LabelPosition>()
                .unwrap()
                .place(&rect, Point::new(5.0, 5.0));
            assert_eq!(
                placed,
                (Point::from(anchor), Point::from(offset), h_align, v_align),
                "{position}"
            );
        }
    }

    #[test]
    fn unknown_position_fails_at_render_time() {
        let plate = Plate::new([0.0, 0.0, 1.0, 1.0]).label("N").position("upper left");
        assert!(matches!(draw(&plate), Err(DiagramError::UnknownPosition(_))));
        // Without a label the position is never consulted.
        assert!(draw(&Plate::new([0.0, 0.0, 1.0, 1.0]).position("upper left")).is_ok());
    }

    #[test]
    fn text_is_an_invisible_zero_area_plate() {
        let recorder = draw(&Plate::text(1.0, 1.0, "hello", Some(14.0))).unwrap();
        let [DrawCall::Rectangle(rect), DrawCall::Text(text)] = recorder.calls() else {
            panic!("unexpected calls {:?}", recorder.calls());
        };
        assert_eq!((rect.width, rect.height), (0.0, 0.0));
        assert_eq!(rect.paint.face, "none");
        assert_eq!(rect.paint.edge, "none");
        assert_eq!(text.anchor, Point::new(2.0, 2.0));
        assert_eq!(text.offset, Point::ZERO);
        assert_eq!(text.font_size, 14.0);
        assert_eq!(text.label_box.as_ref().unwrap().face, "none");
    }
}
