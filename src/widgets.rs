mod flame_graph;

pub use flame_graph::{flame_graph, FlameGraphView};
