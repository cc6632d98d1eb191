//! The flame graph container: owns the tree, keeps its layout up to date and
//! walks the part of it that is visible under the current zoom.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::tree::{FlameItem, FlameNode, FlameTree, NodeId, Violation};

/// A flame graph that is filled from one thread and drawn from another.
pub type SharedFlameGraph = Arc<RwLock<FlameGraph>>;

/// A tree of weighted frames plus the navigation state used to draw it.
///
/// The root is a synthetic "All" frame with weight `1.0`. Frames are appended
/// below it, and [`FlameGraph::rebuild_if_dirty`] lays them out lazily before
/// the graph is drawn. The focus is the frame the view is zoomed into; it
/// lives here so that it survives from one frame to the next.
pub struct FlameGraph {
    tree: FlameTree,
    focus: NodeId,
    max_depth: usize,
    dirty: bool,
    violations: Vec<(NodeId, Violation)>,
}

impl Default for FlameGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl FlameGraph {
    pub fn new() -> Self {
        let tree = FlameTree::new();
        let focus = tree.root();
        Self {
            tree,
            focus,
            max_depth: 0,
            dirty: true,
            violations: Vec::new(),
        }
    }

    pub fn into_shared(self) -> SharedFlameGraph {
        Arc::new(RwLock::new(self))
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Number of frames including the root.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// True while nothing but the root exists.
    pub fn is_empty(&self) -> bool {
        self.tree.len() == 1
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.tree.contains(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&FlameNode> {
        self.tree.get(id)
    }

    /// Panics if `id` was issued by another graph.
    pub fn node(&self, id: NodeId) -> &FlameNode {
        self.tree.node(id)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &FlameNode> {
        self.tree.children(id)
    }

    /// Strict ancestors of `id`, nearest first and the root last.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &FlameNode> {
        self.tree.ancestors(id)
    }

    /// The first frame, in append order, reporting `identity`.
    pub fn find_identity(&self, identity: u64) -> Option<NodeId> {
        self.tree
            .nodes()
            .find(|node| node.identity() == identity)
            .map(FlameNode::id)
    }

    /// Append `item` as the last child of `parent`.
    pub fn append_child<T: FlameItem>(&mut self, parent: NodeId, item: T) -> NodeId {
        let id = self.tree.append_child(parent, Box::new(item));
        self.mark_dirty();
        id
    }

    /// Append `item` directly after `after`, which has to be the last of its
    /// siblings.
    ///
    /// # Panics
    ///
    /// If `after` already has a next sibling or is the root.
    pub fn append_sibling<T: FlameItem>(&mut self, after: NodeId, item: T) -> NodeId {
        let id = self.tree.append_sibling(after, Box::new(item));
        self.mark_dirty();
        id
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Validate and lay out every frame if the tree changed since the last
    /// pass. Returns whether a pass ran.
    ///
    /// The pass covers the whole tree regardless of focus. Frames with
    /// inconsistent weights are recorded in [`FlameGraph::violations`] and
    /// still laid out.
    pub fn rebuild_if_dirty(&mut self) -> bool {
        if !self.dirty {
            return false;
        }

        let _span = tracing::debug_span!("flamegraph_rebuild", nodes = self.tree.len()).entered();

        self.max_depth = 0;
        self.violations.clear();

        let root = self.tree.root();
        let mut cursor = Some(root);
        while let Some(id) = cursor {
            if let Err(violation) = self.tree.validate(id) {
                log::warn!(
                    "flame graph frame {:?} ({}) is malformed: {violation}",
                    id,
                    self.tree.node(id).label()
                );
                self.violations.push((id, violation));
            }
            self.tree.layout(id);
            self.max_depth = self.max_depth.max(self.tree.node(id).depth());
            cursor = self.tree.next_preorder(id, root);
        }

        self.dirty = false;
        log::debug!(
            "rebuilt flame graph: {} frames, max depth {}, {} malformed",
            self.tree.len(),
            self.max_depth,
            self.violations.len()
        );
        true
    }

    /// Deepest frame in the whole tree as of the last rebuild.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Frames whose weights failed validation during the last rebuild.
    pub fn violations(&self) -> &[(NodeId, Violation)] {
        &self.violations
    }

    /// The frame the graph is zoomed into. Falls back to the root if the
    /// stored focus does not resolve.
    pub fn focus(&self) -> NodeId {
        if self.tree.contains(self.focus) {
            self.focus
        } else {
            self.tree.root()
        }
    }

    pub fn focus_node(&self) -> &FlameNode {
        self.tree.node(self.focus())
    }

    /// Zoom into `id`. Handles from another graph are ignored and leave the
    /// focus unchanged; the return value tells whether the focus was taken.
    pub fn set_focus(&mut self, id: NodeId) -> bool {
        if !self.tree.contains(id) {
            log::warn!("ignoring focus on {id:?}, it belongs to another flame graph");
            return false;
        }
        if self.focus != id {
            log::debug!("flame graph focus -> {}", self.tree.node(id).label());
        }
        self.focus = id;
        true
    }

    /// Zoom into the first frame, in append order, reporting `identity`.
    ///
    /// `Frame` identities default to a hash of the label, so frames sharing a
    /// label resolve to the earliest one. Use [`FlameGraph::set_focus`] with
    /// the frame's `NodeId` to address one of them exactly.
    pub fn focus_identity(&mut self, identity: u64) -> bool {
        match self.find_identity(identity) {
            Some(id) => self.set_focus(id),
            None => false,
        }
    }

    /// Zoom out one level. Returns false when already at the root.
    pub fn focus_parent(&mut self) -> bool {
        match self.focus_node().parent() {
            Some(parent) => self.set_focus(parent),
            None => false,
        }
    }

    pub fn reset_focus(&mut self) {
        self.focus = self.tree.root();
    }

    /// Visit the frames that are visible under the current focus.
    ///
    /// First the focus and all of its descendants in pre-order (children
    /// before later siblings, siblings by index), flagged `true`. Then every
    /// strict ancestor of the focus, parent first and root last, flagged
    /// `false`. Nothing else is visited: siblings of the focus or of its
    /// ancestors are outside the zoomed view.
    pub fn traverse(&self, mut visit: impl FnMut(&FlameNode, bool)) {
        let focus = self.focus();

        let mut cursor = Some(focus);
        while let Some(id) = cursor {
            visit(self.tree.node(id), true);
            cursor = self.tree.next_preorder(id, focus);
        }

        for ancestor in self.tree.ancestors(focus) {
            visit(ancestor, false);
        }
    }
}
