//! Layered graph layout.
//!
//! Classic Sugiyama pipeline over a compound multigraph: break cycles,
//! assign ranks by network simplex (clusters solved innermost first),
//! normalize long and labelled edges onto adjacent ranks, minimize
//! crossings, assign coordinates with a second simplex pass, then route
//! edges as splines or orthogonal paths. Everything runs in one
//! single-threaded call over one graph; results land back on the node and
//! edge labels.

pub use orca_graphlib as graphlib;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod acyclic;
pub mod error;
pub mod geom;
pub mod model;
pub mod normalize;
pub mod order;
pub mod pipeline;
pub mod position;
pub mod rank;
pub mod ranks;
pub mod route;

pub use error::{Error, Result};
pub use geom::{Bezier, Point, Rect};
pub use model::{
    Arrow, DummyKind, EdgeLabel, GraphConfig, LabelSize, LayoutGraph, NodeLabel, NodeShape, Port,
    PortSide, RectShape, RectShapes, RouteMode, ShapeRegistry, new_layout_graph,
};
pub use pipeline::{drawing_bounds, layout, layout_with_shapes};
pub use ranks::{Rank, RankId, RankSequence};
