//! Zoomable flame graphs for egui.
//!
//! A [`FlameGraph`] holds a tree of weighted frames, for example the call
//! stacks of a profiler or the parts of a frame-time budget. Each frame
//! covers a fraction of the total and is drawn as a bar whose width is that
//! fraction of the graph's width. [`FlameGraphView`] paints the tree and
//! lets the user click a bar to zoom into its subtree; the frames above it
//! stay visible as faded breadcrumbs.
//!
//! ```no_run
//! use gorbie_flamegraph::prelude::*;
//!
//! let mut graph = FlameGraph::new();
//! let root = graph.root();
//! let update = graph.append_child(root, Frame::new("update", 0.6));
//! graph.append_child(update, Frame::new("physics", 0.4));
//! graph.append_child(root, Frame::new("render", 0.3));
//!
//! # fn show(ui: &mut eframe::egui::Ui, graph: &mut FlameGraph) {
//! ui.add(FlameGraphView::new(graph).min_bar_width(4.0));
//! # }
//! ```
//!
//! Payloads other than [`Frame`] can be attached by implementing
//! [`FlameItem`] for them.

pub mod graph;
pub mod prelude;
pub mod themes;
pub mod tree;
pub mod widgets;

pub use graph::{FlameGraph, SharedFlameGraph};
pub use tree::{FlameItem, FlameNode, Frame, NodeId, Violation};
pub use widgets::{flame_graph, FlameGraphView};
