use crate::canvas::{Arrow, Canvas, Line, Paint, Text};
use crate::context::RenderContext;
use crate::error::{DiagramError, Result};
use crate::geometry::Point;
use crate::node::Node;
use crate::style::{HAlign, LineStyle, Params, VAlign};
use tracing::warn;

const HEAD_LENGTH: f64 = 0.25;
const HEAD_WIDTH: f64 = 0.1;
/// Points the edge label is lifted above its anchor.
const LABEL_LIFT: f64 = 3.0;

/// Stable handle of a node inside its diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// What an edge ended up drawing.
#[derive(Debug, Clone, PartialEq)]
pub enum Stroke {
    Arrow(Arrow),
    Line(Line),
    /// Directed edge whose frontier points coincide; nothing drawn.
    Skipped,
}

/// A connection between two nodes, drawn between their outlines.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub(crate) from: NodeId,
    pub(crate) to: NodeId,
    directed: bool,
    label: Option<String>,
    x_offset: f64,
    y_offset: f64,
    plot_params: Params,
    label_params: Params,
}

impl Edge {
    pub(crate) fn new(from: NodeId, to: NodeId, spec: EdgeSpec, default_directed: bool) -> Self {
        Self {
            from,
            to,
            directed: spec.directed.unwrap_or(default_directed),
            label: spec.label,
            x_offset: spec.x_offset,
            y_offset: spec.y_offset,
            plot_params: spec.plot_params,
            label_params: spec.label_params,
        }
    }

    pub fn source(&self) -> NodeId {
        self.from
    }

    pub fn target(&self) -> NodeId {
        self.to
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Frontier points of both ends, each node aiming at the other's
    /// centre.
    pub fn endpoints(&self, ctx: &RenderContext<'_>, source: &Node, target: &Node) -> Result<(Point, Point)> {
        let same_location = || DiagramError::SameLocation {
            from: source.name().to_string(),
            to: target.name().to_string(),
        };
        let source_center = ctx.convert(source.position());
        let target_center = ctx.convert(target.position());
        let start = source
            .frontier(ctx, target_center)
            .ok_or_else(same_location)?;
        let end = target
            .frontier(ctx, source_center)
            .ok_or_else(same_location)?;
        Ok((start, end))
    }

    pub fn render(
        &self,
        ctx: &RenderContext<'_>,
        source: &Node,
        target: &Node,
        canvas: &mut dyn Canvas,
    ) -> Result<Stroke> {
        let params = &self.plot_params;
        let line_width = params.number_or(&["lw", "linewidth"], ctx.style.line_width)?;
        let line_style: LineStyle = params.string_or(&["ls", "linestyle"], "-")?.parse()?;
        let alpha = params.number_or(&["alpha"], 1.0)?;
        let (start, end) = self.endpoints(ctx, source, target)?;

        if let Some(label) = &self.label {
            let anchor = start.midpoint(end) + Point::new(self.x_offset, self.y_offset);
            let lp = &self.label_params;
            canvas.annotate(&Text {
                content: label.clone(),
                anchor,
                offset: Point::new(0.0, LABEL_LIFT),
                font_size: lp.number_or(&["fontsize", "size"], ctx.style.theme.font_size)?,
                color: lp.color_or(&["color", "c"], &ctx.style.theme.text_color)?,
                h_align: lp.string_or(&["ha", "horizontalalignment"], "center")?.parse::<HAlign>()?,
                v_align: lp.string_or(&["va", "verticalalignment"], "center")?.parse::<VAlign>()?,
                label_box: None,
            });
        }

        if self.directed {
            if start == end {
                warn!(
                    from = source.name(),
                    to = target.name(),
                    "skipping zero-length arrow"
                );
                return Ok(Stroke::Skipped);
            }
            let arrow = Arrow {
                start,
                end,
                head_length: params.number_or(&["head_length"], HEAD_LENGTH)?,
                head_width: params.number_or(&["head_width"], HEAD_WIDTH)?,
                paint: Paint {
                    face: params.color_or(&["fc", "facecolor"], "k")?,
                    edge: params.color_or(&["ec", "edgecolor"], "k")?,
                    line_width,
                    line_style,
                    alpha,
                },
            };
            canvas.draw_arrow(&arrow);
            Ok(Stroke::Arrow(arrow))
        } else {
            let line = Line {
                start,
                end,
                paint: Paint {
                    face: "none".to_string(),
                    edge: params.color_or(&["color", "c"], "k")?,
                    line_width,
                    line_style,
                    alpha,
                },
            };
            canvas.draw_line(&line);
            Ok(Stroke::Line(line))
        }
    }
}

/// Optional attributes of an edge added through
/// [`crate::Diagram::add_edge`].
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSpec {
    directed: Option<bool>,
    label: Option<String>,
    x_offset: f64,
    y_offset: f64,
    plot_params: Params,
    label_params: Params,
}

impl Default for EdgeSpec {
    fn default() -> Self {
        Self {
            directed: None,
            label: None,
            x_offset: 0.0,
            y_offset: 0.1,
            plot_params: Params::default(),
            label_params: Params::default(),
        }
    }
}

impl EdgeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the diagram-wide directed default.
    pub fn directed(mut self, directed: bool) -> Self {
        self.directed = Some(directed);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label displacement from the edge midpoint, in plot units.
    pub fn label_offset(mut self, x: f64, y: f64) -> Self {
        self.x_offset = x;
        self.y_offset = y;
        self
    }

    pub fn plot_params(mut self, params: Params) -> Self {
        self.plot_params = params;
        self
    }

    pub fn label_params(mut self, params: Params) -> Self {
        self.label_params = params;
        self
    }
}
