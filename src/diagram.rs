//! The model object: owns nodes, edges and plates, infers the canvas frame
//! and drives rendering.

use crate::canvas::{Backend, Canvas, CanvasSlot, Export, Recorder, SaveOptions};
use crate::config::{DiagramConfig, Style};
use crate::context::{Frame, RenderContext};
use crate::edge::{Edge, EdgeSpec, NodeId};
use crate::error::{DiagramError, Result};
use crate::geometry::{Bounds, Point};
use crate::node::{IntoNode, Node};
use crate::plate::Plate;
use crate::render::SvgBackend;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Downward label nudge, in points, applied to fixed nodes whenever the
/// canvas shape is inferred, so their baseline labels are not clipped.
const FIXED_AUTOSIZE_NUDGE: f64 = 12.5;

/// A probabilistic graphical model laid out on a grid.
///
/// Nodes keep their insertion order; edges and plates are drawn in the
/// order they were added. Dropping the diagram releases its canvas.
#[derive(Debug)]
pub struct Diagram<B: Backend = SvgBackend> {
    config: DiagramConfig,
    style: Style,
    nodes: Vec<Node>,
    index: HashMap<String, NodeId>,
    edges: Vec<Edge>,
    plates: Vec<Plate>,
    frame: Option<Frame>,
    backend: B,
    canvas: CanvasSlot<B::Canvas>,
}

impl Diagram<SvgBackend> {
    /// Creates an empty diagram that writes SVG (and PNG) using the
    /// config's theme.
    pub fn new(config: DiagramConfig) -> Result<Self> {
        let backend = SvgBackend::new(config.validate()?.theme);
        Self::with_backend(config, backend)
    }
}

impl<B: Backend> Diagram<B> {
    /// Validates `config` and creates an empty diagram drawing through
    /// `backend`.
    pub fn with_backend(config: DiagramConfig, backend: B) -> Result<Self> {
        let style = config.validate()?;
        Ok(Self {
            config,
            style,
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            plates: Vec::new(),
            frame: None,
            backend,
            canvas: CanvasSlot::default(),
        })
    }

    pub fn config(&self) -> &DiagramConfig {
        &self.config
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Adds a node, or replaces the node of the same name in place.
    /// Returns the node's name.
    pub fn add_node(&mut self, node: impl IntoNode) -> Result<String> {
        let node = node.into_node()?;
        self.canvas.release();
        let name = node.name().to_string();
        match self.index.get(&name) {
            Some(id) => self.nodes[id.0] = node,
            None => {
                self.index.insert(name.clone(), NodeId(self.nodes.len()));
                self.nodes.push(node);
            }
        }
        Ok(name)
    }

    /// Connects two registered nodes. If directed, the arrow points at
    /// `target`.
    pub fn add_edge(&mut self, source: &str, target: &str, spec: EdgeSpec) -> Result<&Edge> {
        let from = self.node_id(source)?;
        let to = self.node_id(target)?;
        self.canvas.release();
        self.edges.push(Edge::new(from, to, spec, self.style.directed));
        let last = self.edges.len() - 1;
        Ok(&self.edges[last])
    }

    pub fn add_plate(&mut self, plate: impl Into<Plate>) {
        self.canvas.release();
        self.plates.push(plate.into());
    }

    /// Places free text at a model-space point.
    pub fn add_text(&mut self, x: f64, y: f64, label: impl Into<String>, font_size: Option<f64>) {
        self.canvas.release();
        self.plates.push(Plate::text(x, y, label, font_size));
    }

    pub fn node_id(&self, name: &str) -> Result<NodeId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| DiagramError::UnknownNode(name.to_string()))
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|id| &self.nodes[id.0])
    }

    pub fn node_by_id(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn plates(&self) -> &[Plate] {
        &self.plates
    }

    /// The frame used by the most recent successful render.
    pub fn frame(&self) -> Option<Frame> {
        self.frame
    }

    /// The live canvas, if a render has completed since the last close.
    pub fn canvas(&self) -> Option<&B::Canvas> {
        self.canvas.get()
    }

    /// Releases the canvas, if any.
    pub fn close(&mut self) {
        self.canvas.release();
    }

    /// Infers the frame where needed, then draws plates, edges and nodes,
    /// in that order, onto a fresh canvas.
    ///
    /// On failure no canvas is left open.
    pub fn render(&mut self, dpi: Option<u32>) -> Result<&B::Canvas> {
        self.canvas.release();
        let dpi = dpi.or(self.config.dpi);

        let frame = self.infer_frame()?;
        let mut ctx = RenderContext::new(&self.style, &frame);
        if self.config.shape.is_none() {
            ctx.fixed_label_nudge = -FIXED_AUTOSIZE_NUDGE;
        }

        let mut canvas = self.backend.open(&frame.viewport(self.style.grid_unit, dpi));
        draw_scene(&ctx, &self.nodes, &self.edges, &self.plates, &mut canvas)?;

        self.frame = Some(frame);
        Ok(self.canvas.replace(canvas))
    }

    /// Resolves shape and origin, running a discovery pass for each one
    /// the caller left unset.
    fn infer_frame(&self) -> Result<Frame> {
        let grid_unit = self.style.grid_unit;
        let padding = Point::new(self.style.padding, self.style.padding);
        let auto_shape = self.config.shape.is_none();
        let nudge = if auto_shape { -FIXED_AUTOSIZE_NUDGE } else { 0.0 };

        let mut frame = Frame {
            origin: self.config.fixed_origin().unwrap_or(Point::ZERO),
            shape: self.config.fixed_shape().unwrap_or(Point::new(1.0, 1.0)),
        };

        if auto_shape {
            let max = self
                .discover(&frame, nudge)?
                .map_or(Point::ZERO, |bounds| bounds.max.max(Point::ZERO));
            frame.shape = frame.transform(grid_unit).to_grid(max) + padding;
            debug!(shape = ?frame.shape, "inferred canvas shape");
        }

        if self.config.origin.is_none() {
            let far = frame.shape * grid_unit;
            let min = self
                .discover(&frame, nudge)?
                .map_or(far, |bounds| bounds.min.min(far));
            let origin = frame.origin + frame.transform(grid_unit).to_grid(min) - padding;
            if auto_shape {
                frame.shape = frame.shape - (origin - frame.origin);
            }
            frame.origin = origin;
            debug!(origin = ?frame.origin, "inferred canvas origin");
        }

        Ok(frame)
    }

    /// Draws plates and nodes into a scratch recorder and returns the
    /// plot-space extent of every shape drawn.
    fn discover(&self, frame: &Frame, nudge: f64) -> Result<Option<Bounds>> {
        let mut ctx = RenderContext::new(&self.style, frame);
        ctx.fixed_label_nudge = nudge;
        let mut scratch = Recorder::new();
        for plate in &self.plates {
            plate.render(&ctx, &mut scratch)?;
        }
        for node in &self.nodes {
            node.render(&ctx, &mut scratch)?;
        }
        Ok(scratch.shape_bounds().reduce(Bounds::union))
    }
}

impl<B: Backend> Diagram<B>
where
    B::Canvas: Export,
{
    /// Renders (if needed) and writes the diagram through the backend's
    /// exporter. The format follows the file extension.
    pub fn save(&mut self, path: impl AsRef<Path>, options: SaveOptions) -> anyhow::Result<()> {
        let options = SaveOptions {
            dpi: options.dpi.or(self.config.dpi),
            ..options
        };
        if !self.canvas.is_open() {
            self.render(options.dpi)?;
        }
        let canvas = self
            .canvas
            .get()
            .ok_or_else(|| anyhow::anyhow!("no canvas to save"))?;
        canvas.save(path.as_ref(), &options)
    }

    /// Renders and hands the result to the backend's viewer.
    pub fn show(&mut self, dpi: Option<u32>) -> anyhow::Result<()> {
        let canvas = self.render(dpi)?;
        canvas.show()
    }
}

impl<B: Backend> Drop for Diagram<B> {
    fn drop(&mut self) {
        self.canvas.release();
    }
}

fn draw_scene(
    ctx: &RenderContext<'_>,
    nodes: &[Node],
    edges: &[Edge],
    plates: &[Plate],
    canvas: &mut dyn Canvas,
) -> Result<()> {
    for plate in plates {
        plate.render(ctx, canvas)?;
    }
    for edge in edges {
        edge.render(ctx, &nodes[edge.from.0], &nodes[edge.to.0], canvas)?;
    }
    for node in nodes {
        node.render(ctx, canvas)?;
    }
    Ok(())
}
