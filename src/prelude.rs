// Preludes: re-export commonly used items for convenience
pub use crate::widgets;

pub use crate::graph::{FlameGraph, SharedFlameGraph};
pub use crate::themes::Styled;
pub use crate::tree::{FlameItem, FlameNode, Frame, NodeId, Violation};
pub use crate::widgets::{flame_graph, FlameGraphView};
