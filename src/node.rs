use crate::canvas::{Canvas, Paint, Text};
use crate::context::RenderContext;
use crate::error::{DiagramError, Result};
use crate::geometry::Point;
use crate::shape::{Footprint, NodeShape};
use crate::style::{DecorationStyle, HAlign, LineStyle, Params, VAlign, normalize_color};

/// Fixed nodes are drawn this many times smaller than their nominal scale.
const FIXED_SCALE_DIVISOR: f64 = 6.0;
/// Upward label shift for fixed nodes, in points, so the baseline-aligned
/// label clears the dot.
const FIXED_LABEL_LIFT: f64 = 6.0;
/// Relative size change of the second outline drawn by `inner`/`outer`.
const DECORATION_RATIO: f64 = 0.1;
const SHADED_FACE: &str = "0.7";

/// The semantic category of a node, which decides its decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeStyle {
    #[default]
    Plain,
    /// A conditioned (observed) variable.
    Observed,
    /// A second decorated category, e.g. deterministic quantities.
    Alternate,
    /// A fixed parameter, drawn as a small filled dot.
    Fixed,
}

impl NodeStyle {
    /// Folds the three boolean flags into one style; more than one set is
    /// an error.
    pub fn from_flags(name: &str, observed: bool, fixed: bool, alternate: bool) -> Result<Self> {
        match (observed, fixed, alternate) {
            (false, false, false) => Ok(Self::Plain),
            (true, false, false) => Ok(Self::Observed),
            (false, true, false) => Ok(Self::Fixed),
            (false, false, true) => Ok(Self::Alternate),
            _ => Err(DiagramError::ConflictingNodeStyle {
                name: name.to_string(),
            }),
        }
    }
}

/// A random variable drawn at a fixed model-space position.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: String,
    content: String,
    position: Point,
    scale: f64,
    aspect: Option<f64>,
    shape: NodeShape,
    style: NodeStyle,
    offset: Point,
    font_size: Option<f64>,
    plot_params: Params,
    label_params: Option<Params>,
}

impl Node {
    /// A plain elliptical node; use [`NodeSpec`] for anything else.
    pub fn new(name: impl Into<String>, content: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            position: Point::new(x, y),
            scale: 1.0,
            aspect: None,
            shape: NodeShape::Ellipse,
            style: NodeStyle::Plain,
            offset: Point::ZERO,
            font_size: None,
            plot_params: Params::default(),
            label_params: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn style(&self) -> NodeStyle {
        self.style
    }

    pub fn shape(&self) -> NodeShape {
        self.shape
    }

    /// Label displacement in points, as given by the caller.
    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn aspect(&self) -> Option<f64> {
        self.aspect
    }

    /// Diameter (or height) in multiples of the node unit, after the
    /// fixed-node reduction.
    pub fn scale(&self) -> f64 {
        match self.style {
            NodeStyle::Fixed => self.scale / FIXED_SCALE_DIVISOR,
            _ => self.scale,
        }
    }

    /// The node outline in plot space.
    pub fn footprint(&self, ctx: &RenderContext<'_>) -> Footprint {
        let diameter = ctx.style.node_unit * self.scale();
        let aspect = self.aspect.unwrap_or(ctx.style.aspect);
        Footprint {
            shape: self.shape,
            center: ctx.convert(self.position),
            width: diameter * aspect,
            height: diameter,
        }
    }

    /// Where a ray from this node's centre towards the plot-space point
    /// `target` crosses its outline. `None` if `target` is the centre.
    pub fn frontier(&self, ctx: &RenderContext<'_>, target: Point) -> Option<Point> {
        self.footprint(ctx).frontier(target)
    }

    /// Draws the decoration (if any), the node outline and its label.
    /// Returns the foreground outline.
    pub fn render(&self, ctx: &RenderContext<'_>, canvas: &mut dyn Canvas) -> Result<Footprint> {
        let style = ctx.style;
        let params = &self.plot_params;

        let fc_is_set = params.has_any(&["fc", "facecolor"]);
        let mut face = params.color_or(&["fc", "facecolor"], &style.node_fc)?;
        let paint_base = Paint {
            face: String::new(),
            edge: params.color_or(&["ec", "edgecolor"], &style.node_ec)?,
            line_width: params.number_or(&["lw", "linewidth"], style.line_width)?,
            line_style: params.string_or(&["ls", "linestyle"], "-")?.parse::<LineStyle>()?,
            alpha: params.number_or(&["alpha"], 1.0)?,
        };

        let label = self.label_params.as_ref().unwrap_or(&style.label_params);
        let mut v_align: VAlign = label.string_or(&["va", "verticalalignment"], "center")?.parse()?;
        let h_align: HAlign = label.string_or(&["ha", "horizontalalignment"], "center")?.parse()?;
        let text_color = label.color_or(&["color", "c"], &style.theme.text_color)?;
        let font_size = label.number_or(
            &["fontsize", "size"],
            self.font_size.unwrap_or(style.theme.font_size),
        )?;

        let mut offset = self.offset;
        if self.style == NodeStyle::Fixed {
            offset.y += FIXED_LABEL_LIFT + ctx.fixed_label_nudge;
            v_align = VAlign::Baseline;
            if !fc_is_set {
                face = normalize_color("k")?;
            }
        }

        let footprint = self.footprint(ctx);
        let decoration = match self.style {
            NodeStyle::Observed => Some(style.observed_style),
            NodeStyle::Alternate => Some(style.alternate_style),
            NodeStyle::Plain | NodeStyle::Fixed => None,
        };

        if let Some(decoration) = decoration {
            let delta = DECORATION_RATIO * footprint.height;
            let (background, bg_face) = match decoration {
                DecorationStyle::Shaded => (footprint, normalize_color(SHADED_FACE)?),
                DecorationStyle::Outer => (footprint.grown(delta), face.clone()),
                DecorationStyle::Inner => (footprint.grown(-delta), face.clone()),
            };
            background.draw(
                canvas,
                Paint {
                    face: bg_face,
                    ..paint_base.clone()
                },
            );
        }

        // Decorated nodes are hollow on top so the background shows.
        let fg_face = if decoration.is_some() && !fc_is_set {
            "none".to_string()
        } else {
            face
        };
        footprint.draw(
            canvas,
            Paint {
                face: fg_face,
                ..paint_base
            },
        );

        if !self.content.is_empty() {
            canvas.annotate(&Text {
                content: self.content.clone(),
                anchor: footprint.center,
                offset,
                font_size,
                color: text_color,
                h_align,
                v_align,
                label_box: None,
            });
        }

        Ok(footprint)
    }
}

/// Builder for [`Node`]; [`NodeSpec::build`] enforces that at most one of
/// observed, fixed and alternate is set.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    name: String,
    content: String,
    position: Point,
    scale: f64,
    aspect: Option<f64>,
    observed: bool,
    fixed: bool,
    alternate: bool,
    offset: Point,
    font_size: Option<f64>,
    plot_params: Params,
    label_params: Option<Params>,
    shape: NodeShape,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: String::new(),
            position: Point::ZERO,
            scale: 1.0,
            aspect: None,
            observed: false,
            fixed: false,
            alternate: false,
            offset: Point::ZERO,
            font_size: None,
            plot_params: Params::default(),
            label_params: None,
            shape: NodeShape::Ellipse,
        }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Point::new(x, y);
        self
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn aspect(mut self, aspect: f64) -> Self {
        self.aspect = Some(aspect);
        self
    }

    pub fn observed(mut self, observed: bool) -> Self {
        self.observed = observed;
        self
    }

    pub fn fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }

    pub fn alternate(mut self, alternate: bool) -> Self {
        self.alternate = alternate;
        self
    }

    /// Label displacement in points.
    pub fn offset(mut self, dx: f64, dy: f64) -> Self {
        self.offset = Point::new(dx, dy);
        self
    }

    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn plot_params(mut self, params: Params) -> Self {
        self.plot_params = params;
        self
    }

    pub fn label_params(mut self, params: Params) -> Self {
        self.label_params = Some(params);
        self
    }

    pub fn shape(mut self, shape: NodeShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn build(self) -> Result<Node> {
        let style = NodeStyle::from_flags(&self.name, self.observed, self.fixed, self.alternate)?;
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(DiagramError::invalid("scale", format!("must be positive, got {}", self.scale)));
        }
        if let Some(aspect) = self.aspect
            && !(aspect.is_finite() && aspect > 0.0)
        {
            return Err(DiagramError::invalid("aspect", format!("must be positive, got {aspect}")));
        }
        Ok(Node {
            name: self.name,
            content: self.content,
            position: self.position,
            scale: self.scale,
            aspect: self.aspect,
            shape: self.shape,
            style,
            offset: self.offset,
            font_size: self.font_size,
            plot_params: self.plot_params,
            label_params: self.label_params,
        })
    }
}

/// Anything [`crate::Diagram::add_node`] accepts.
pub trait IntoNode {
    fn into_node(self) -> Result<Node>;
}

impl IntoNode for Node {
    fn into_node(self) -> Result<Node> {
        Ok(self)
    }
}

impl IntoNode for NodeSpec {
    fn into_node(self) -> Result<Node> {
        self.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawCall, Recorder};
    use crate::config::DiagramConfig;
    use crate::context::Frame;

    fn render(node: &Node, config: DiagramConfig) -> Vec<DrawCall> {
        let style = config.validate().unwrap();
        let frame = Frame {
            origin: Point::ZERO,
            shape: Point::new(4.0, 4.0),
        };
        let ctx = RenderContext::new(&style, &frame);
        let mut recorder = Recorder::new();
        node.render(&ctx, &mut recorder).unwrap();
        recorder.calls().to_vec()
    }

    #[test]
    fn at_most_one_style_flag() {
        for bits in 0u8..8 {
            let (observed, fixed, alternate) = (bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            let result = NodeSpec::new("n")
                .observed(observed)
                .fixed(fixed)
                .alternate(alternate)
                .build();
            if bits.count_ones() > 1 {
                assert!(
                    matches!(result, Err(DiagramError::ConflictingNodeStyle { .. })),
                    "flags {bits:03b} should conflict"
                );
            } else {
                assert!(result.is_ok(), "flags {bits:03b} should be accepted");
            }
        }
    }

    #[test]
    fn plain_node_draws_one_shape_and_label() {
        let node = NodeSpec::new("a").content("A").at(1.0, 1.0).build().unwrap();
        let calls = render(&node, DiagramConfig::default());
        assert_eq!(calls.len(), 2);
        let DrawCall::Ellipse(ellipse) = &calls[0] else {
            panic!("expected ellipse, got {:?}", calls[0]);
        };
        assert_eq!(ellipse.center, Point::new(2.0, 2.0));
        assert_eq!(ellipse.width, 1.0);
        assert_eq!(ellipse.paint.face, "#ffffff");
        assert!(matches!(&calls[1], DrawCall::Text(text) if text.content == "A"));
    }

    #[test]
    fn observed_shaded_draws_grey_background_then_hollow_outline() {
        let node = NodeSpec::new("x").observed(true).at(1.0, 1.0).build().unwrap();
        let calls = render(&node, DiagramConfig::default());
        let [DrawCall::Ellipse(bg), DrawCall::Ellipse(fg)] = calls.as_slice() else {
            panic!("unexpected calls {calls:?}");
        };
        assert_eq!(bg.paint.face, "#b3b3b3");
        assert_eq!(fg.paint.face, "none");
        assert_eq!(bg.width, fg.width);
    }

    #[test]
    fn outer_and_inner_resize_the_background() {
        let node = NodeSpec::new("x").observed(true).build().unwrap();
        let outer = render(
            &node,
            DiagramConfig {
                observed_style: "outer".into(),
                ..Default::default()
            },
        );
        let DrawCall::Ellipse(bg) = &outer[0] else { panic!() };
        assert!((bg.height - 1.1).abs() < 1e-12);

        let alt = NodeSpec::new("y").alternate(true).build().unwrap();
        let inner = render(&alt, DiagramConfig::default());
        let DrawCall::Ellipse(bg) = &inner[0] else { panic!() };
        assert!((bg.height - 0.9).abs() < 1e-12);
        assert_eq!(bg.paint.face, "#ffffff");
    }

    #[test]
    fn fixed_node_is_small_filled_and_baseline_labelled() {
        let node = NodeSpec::new("f")
            .content("f")
            .fixed(true)
            .offset(0.0, 5.0)
            .build()
            .unwrap();
        assert!((node.scale() - 1.0 / 6.0).abs() < 1e-12);
        let calls = render(&node, DiagramConfig::default());
        let [DrawCall::Ellipse(dot), DrawCall::Text(label)] = calls.as_slice() else {
            panic!("unexpected calls {calls:?}");
        };
        assert_eq!(dot.paint.face, "#000000");
        assert_eq!(label.v_align, VAlign::Baseline);
        assert_eq!(label.offset, Point::new(0.0, 11.0));
        // The stored offset is untouched, so rendering again is identical.
        assert_eq!(node.offset(), Point::new(0.0, 5.0));
        assert_eq!(render(&node, DiagramConfig::default()), calls);
    }

    #[test]
    fn explicit_face_colour_wins_for_fixed_nodes() {
        let node = NodeSpec::new("f")
            .fixed(true)
            .plot_params(Params::new().with("fc", "r"))
            .build()
            .unwrap();
        let calls = render(&node, DiagramConfig::default());
        let DrawCall::Ellipse(dot) = &calls[0] else { panic!() };
        assert_eq!(dot.paint.face, "#ff0000");
    }

    #[test]
    fn rectangle_nodes_draw_rectangles() {
        let node = NodeSpec::new("r")
            .shape(NodeShape::Rectangle)
            .aspect(2.0)
            .at(1.0, 1.0)
            .build()
            .unwrap();
        let calls = render(&node, DiagramConfig::default());
        let DrawCall::Rectangle(rect) = &calls[0] else { panic!() };
        assert_eq!(rect.corner, Point::new(1.0, 1.5));
        assert_eq!((rect.width, rect.height), (2.0, 1.0));
    }

    #[test]
    fn duplicate_colour_aliases_fail_at_render() {
        let node = NodeSpec::new("n")
            .plot_params(Params::new().with("ec", "k").with("edgecolor", "r"))
            .build()
            .unwrap();
        let style = DiagramConfig::default().validate().unwrap();
        let frame = Frame {
            origin: Point::ZERO,
            shape: Point::new(1.0, 1.0),
        };
        let ctx = RenderContext::new(&style, &frame);
        let err = node.render(&ctx, &mut Recorder::new()).unwrap_err();
        assert!(matches!(err, DiagramError::DuplicateAlias { .. }));
    }
}
