//! Probabilistic graphical model diagrams: nodes on a grid, edges drawn
//! between their outlines, plates around repeated structure.
//!
//! ```no_run
//! use pgm_diagram::{Diagram, DiagramConfig, EdgeSpec, NodeSpec, SaveOptions};
//!
//! let mut pgm = Diagram::new(DiagramConfig::default())?;
//! pgm.add_node(NodeSpec::new("z").content("z").at(0.0, 0.0))?;
//! pgm.add_node(NodeSpec::new("x").content("x").at(1.0, 0.0).observed(true))?;
//! pgm.add_edge("z", "x", EdgeSpec::new())?;
//! pgm.add_plate([-0.5, -0.5, 2.0, 1.0]);
//! pgm.save("model.svg", SaveOptions::default())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod canvas;
pub mod config;
pub mod context;
pub mod diagram;
pub mod edge;
pub mod error;
pub mod geometry;
pub mod node;
pub mod plate;
pub mod render;
pub mod shape;
pub mod style;
pub mod text_metrics;
pub mod theme;

pub use canvas::{Backend, Canvas, Export, Recorder, RecordingBackend, SaveOptions};
pub use config::{DiagramConfig, Style, load_config};
pub use diagram::Diagram;
pub use edge::{Edge, EdgeSpec, NodeId};
pub use error::{DiagramError, Result};
pub use geometry::{Point, Transform};
pub use node::{IntoNode, Node, NodeSpec, NodeStyle};
pub use plate::{LabelPosition, Plate};
pub use render::{SvgBackend, SvgCanvas};
pub use shape::NodeShape;
pub use style::Params;
pub use theme::Theme;
