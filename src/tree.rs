//! Arena-backed tree of weighted frames.
//!
//! Nodes are stored in a flat vector and link to each other through
//! [`NodeId`] handles. The tree only ever grows: frames are appended as the
//! last child of a node or as the next sibling of the current tail, and are
//! never removed or reparented afterwards.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::themes::colorhash::hash64;

/// Slack allowed when comparing accumulated weights, so that children which
/// sum to their parent's weight up to float rounding are not reported.
const WEIGHT_TOLERANCE: f32 = 1e-6;

/// Identity reported by the synthetic root.
pub const ROOT_IDENTITY: u64 = 0;

static NEXT_TREE_TAG: AtomicU32 = AtomicU32::new(1);

/// The data a payload has to provide so it can be shown as a bar.
///
/// Implement this for whatever your application measures (call stack frames,
/// budget entries, ...). The tree never looks at the payload beyond these
/// accessors.
pub trait FlameItem: Any {
    /// Text drawn inside the bar and in its tooltip.
    fn label(&self) -> &str;

    /// Fraction of the total measured quantity covered by this item, in
    /// `(0, 1]`.
    ///
    /// A child occupies `child / parent` of its parent's bar, so a child must
    /// not weigh more than its parent and siblings must not sum to more than
    /// their parent.
    fn weight_fraction(&self) -> f32;

    /// Stable token used to key interaction state for the bar.
    fn identity(&self) -> u64;
}

/// A plain labelled frame, the payload most applications need.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    label: String,
    weight: f32,
    identity: u64,
}

impl Frame {
    /// The identity defaults to a hash of the label.
    pub fn new(label: impl Into<String>, weight: f32) -> Self {
        let label = label.into();
        let identity = hash64(label.as_bytes());
        Self {
            label,
            weight,
            identity,
        }
    }

    pub fn with_identity(mut self, identity: u64) -> Self {
        self.identity = identity;
        self
    }
}

impl FlameItem for Frame {
    fn label(&self) -> &str {
        &self.label
    }

    fn weight_fraction(&self) -> f32 {
        self.weight
    }

    fn identity(&self) -> u64 {
        self.identity
    }
}

struct RootItem;

impl FlameItem for RootItem {
    fn label(&self) -> &str {
        "All"
    }

    fn weight_fraction(&self) -> f32 {
        1.0
    }

    fn identity(&self) -> u64 {
        ROOT_IDENTITY
    }
}

/// Handle to a node inside one particular tree.
///
/// Handles remember which tree issued them, so passing a handle to the wrong
/// graph is detected instead of silently addressing an unrelated node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    tree: u32,
    slot: u32,
}

impl NodeId {
    /// Position of the node in its tree's arena, in append order.
    pub fn slot(self) -> usize {
        self.slot as usize
    }
}

/// Weight relations a node is expected to satisfy but does not.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Violation {
    /// The node weighs more than its parent.
    ExceedsParent { weight: f32, parent: f32 },
    /// The node's children together weigh more than the node itself.
    ChildrenExceed { children: f32, weight: f32 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::ExceedsParent { weight, parent } => {
                write!(f, "weight {weight} exceeds parent weight {parent}")
            }
            Violation::ChildrenExceed { children, weight } => {
                write!(f, "children weigh {children} in total, more than own weight {weight}")
            }
        }
    }
}

impl std::error::Error for Violation {}

pub struct FlameNode {
    id: NodeId,
    item: Box<dyn FlameItem>,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    next: Option<NodeId>,
    prev: Option<NodeId>,
    depth: usize,
    index: usize,
    start: f32,
    end: f32,
}

impl FlameNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Distance from the root, which sits at depth `0`.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Position among the node's siblings.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Left edge of the bar in the normalized `[0, 1]` width of the graph.
    ///
    /// Only meaningful after a layout pass.
    pub fn start(&self) -> f32 {
        self.start
    }

    /// Right edge of the bar. Not clamped: a node that outweighs its parent
    /// extends past the parent's bar.
    pub fn end(&self) -> f32 {
        self.end
    }

    pub fn width(&self) -> f32 {
        self.end - self.start
    }

    pub fn label(&self) -> &str {
        self.item.label()
    }

    pub fn weight_fraction(&self) -> f32 {
        self.item.weight_fraction()
    }

    pub fn identity(&self) -> u64 {
        self.item.identity()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child
    }

    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next
    }

    pub fn prev_sibling(&self) -> Option<NodeId> {
        self.prev
    }

    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    pub fn item(&self) -> &dyn FlameItem {
        self.item.as_ref()
    }

    /// Downcast the payload to the concrete type it was appended with.
    pub fn item_as<T: FlameItem>(&self) -> Option<&T> {
        let item: &dyn Any = self.item.as_ref();
        item.downcast_ref::<T>()
    }
}

impl fmt::Debug for FlameNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlameNode")
            .field("id", &self.id)
            .field("label", &self.label())
            .field("weight_fraction", &self.weight_fraction())
            .field("depth", &self.depth)
            .field("index", &self.index)
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}

/// Node storage with the structural operations on it.
pub(crate) struct FlameTree {
    tag: u32,
    nodes: Vec<FlameNode>,
}

impl FlameTree {
    pub(crate) fn new() -> Self {
        let tag = NEXT_TREE_TAG.fetch_add(1, Ordering::Relaxed);
        let root = FlameNode {
            id: NodeId { tree: tag, slot: 0 },
            item: Box::new(RootItem),
            parent: None,
            first_child: None,
            last_child: None,
            next: None,
            prev: None,
            depth: 0,
            index: 0,
            start: 0.0,
            end: 1.0,
        };
        Self {
            tag,
            nodes: vec![root],
        }
    }

    pub(crate) fn root(&self) -> NodeId {
        NodeId {
            tree: self.tag,
            slot: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        id.tree == self.tag && id.slot() < self.nodes.len()
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&FlameNode> {
        if id.tree == self.tag {
            self.nodes.get(id.slot())
        } else {
            None
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> &FlameNode {
        self.get(id)
            .unwrap_or_else(|| panic!("node {id:?} does not belong to this flame graph"))
    }

    fn node_mut(&mut self, id: NodeId) -> &mut FlameNode {
        assert!(
            id.tree == self.tag,
            "node {id:?} does not belong to this flame graph"
        );
        &mut self.nodes[id.slot()]
    }

    pub(crate) fn nodes(&self) -> impl Iterator<Item = &FlameNode> {
        self.nodes.iter()
    }

    fn push(
        &mut self,
        item: Box<dyn FlameItem>,
        parent: NodeId,
        prev: Option<NodeId>,
        depth: usize,
        index: usize,
    ) -> NodeId {
        let slot = u32::try_from(self.nodes.len()).expect("flame graph exceeds u32::MAX nodes");
        let id = NodeId {
            tree: self.tag,
            slot,
        };
        self.nodes.push(FlameNode {
            id,
            item,
            parent: Some(parent),
            first_child: None,
            last_child: None,
            next: None,
            prev,
            depth,
            index,
            start: 0.0,
            end: 0.0,
        });
        id
    }

    /// Link `item` as the next sibling of `after`.
    ///
    /// Panics if `after` already has a next sibling or is the root; both mean
    /// the caller lost track of where the sibling chain ends.
    pub(crate) fn append_sibling(&mut self, after: NodeId, item: Box<dyn FlameItem>) -> NodeId {
        let this = self.node(after);
        assert!(
            this.next.is_none(),
            "node {after:?} ({}) already has a next sibling, siblings can only be appended at the tail",
            this.label()
        );
        let Some(parent) = this.parent else {
            panic!("the root of a flame graph cannot have siblings");
        };
        let (depth, index) = (this.depth, this.index + 1);

        let id = self.push(item, parent, Some(after), depth, index);
        self.node_mut(after).next = Some(id);
        self.node_mut(parent).last_child = Some(id);
        id
    }

    /// Link `item` as the last child of `parent`.
    pub(crate) fn append_child(&mut self, parent: NodeId, item: Box<dyn FlameItem>) -> NodeId {
        let this = self.node(parent);
        let (tail, depth) = (this.last_child, this.depth + 1);
        if let Some(tail) = tail {
            let id = self.append_sibling(tail, item);
            debug_assert_eq!(self.node(id).parent, Some(parent));
            return id;
        }

        let id = self.push(item, parent, None, depth, 0);
        let this = self.node_mut(parent);
        this.first_child = Some(id);
        this.last_child = Some(id);
        id
    }

    /// Place `id` inside its parent's bar.
    ///
    /// Reads the parent's and previous sibling's geometry, so nodes have to be
    /// laid out in pre-order.
    pub(crate) fn layout(&mut self, id: NodeId) {
        let node = self.node(id);
        let (start, end) = match node.parent {
            None => (0.0, 1.0),
            Some(parent) => {
                let parent = self.node(parent);
                let start = match node.prev {
                    Some(prev) => self.node(prev).end,
                    None => parent.start,
                };
                let share = node.weight_fraction() / parent.weight_fraction();
                (start, start + parent.width() * share)
            }
        };

        let node = self.node_mut(id);
        node.start = start;
        node.end = end;
    }

    /// Check the weight relations of a single node against its parent and
    /// its direct children.
    pub(crate) fn validate(&self, id: NodeId) -> Result<(), Violation> {
        let node = self.node(id);
        let weight = node.weight_fraction();

        if let Some(parent) = node.parent {
            let parent = self.node(parent).weight_fraction();
            if weight > parent + WEIGHT_TOLERANCE {
                return Err(Violation::ExceedsParent { weight, parent });
            }
        }

        let children: f32 = self.children(id).map(FlameNode::weight_fraction).sum();
        if children > weight + WEIGHT_TOLERANCE {
            return Err(Violation::ChildrenExceed { children, weight });
        }

        Ok(())
    }

    pub(crate) fn children(&self, id: NodeId) -> impl Iterator<Item = &FlameNode> {
        std::iter::successors(self.node(id).first_child, move |&child| self.node(child).next)
            .map(move |child| self.node(child))
    }

    /// Strict ancestors of `id`, nearest first.
    pub(crate) fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &FlameNode> {
        std::iter::successors(self.node(id).parent, move |&parent| self.node(parent).parent)
            .map(move |parent| self.node(parent))
    }

    /// The node after `id` in a pre-order walk of the subtree rooted at
    /// `bound`. `bound` must be `id` or one of its ancestors.
    pub(crate) fn next_preorder(&self, id: NodeId, bound: NodeId) -> Option<NodeId> {
        let node = self.node(id);
        if let Some(child) = node.first_child {
            return Some(child);
        }

        let mut current = id;
        loop {
            if current == bound {
                return None;
            }
            let node = self.node(current);
            if let Some(next) = node.next {
                return Some(next);
            }
            current = node.parent?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(label: &str, weight: f32) -> Box<dyn FlameItem> {
        Box::new(Frame::new(label, weight))
    }

    #[test]
    fn append_child_assigns_structure() {
        let mut tree = FlameTree::new();
        let root = tree.root();
        let a = tree.append_child(root, frame("a", 0.6));
        let b = tree.append_child(root, frame("b", 0.4));
        let a1 = tree.append_child(a, frame("a1", 0.3));

        let a = tree.node(a);
        assert_eq!((a.depth(), a.index(), a.parent()), (1, 0, Some(root)));
        let b = tree.node(b);
        assert_eq!((b.depth(), b.index(), b.parent()), (1, 1, Some(root)));
        assert_eq!(b.prev_sibling(), Some(a.id()));
        assert_eq!(a.next_sibling(), Some(b.id()));
        let a1 = tree.node(a1);
        assert_eq!((a1.depth(), a1.index(), a1.parent()), (2, 0, Some(a.id())));

        let labels: Vec<_> = tree.children(root).map(FlameNode::label).collect();
        assert_eq!(labels, ["a", "b"]);
    }

    #[test]
    fn append_sibling_at_tail_inherits_parent() {
        let mut tree = FlameTree::new();
        let root = tree.root();
        let a = tree.append_child(root, frame("a", 0.2));
        let b = tree.append_sibling(a, frame("b", 0.2));
        let c = tree.append_child(root, frame("c", 0.2));

        assert_eq!(tree.node(b).parent(), Some(root));
        assert_eq!(tree.node(b).index(), 1);
        assert_eq!(tree.node(c).prev_sibling(), Some(b));
        assert_eq!(tree.node(c).index(), 2);
    }

    #[test]
    #[should_panic(expected = "already has a next sibling")]
    fn append_sibling_in_the_middle_panics() {
        let mut tree = FlameTree::new();
        let root = tree.root();
        let a = tree.append_child(root, frame("a", 0.2));
        tree.append_child(root, frame("b", 0.2));
        tree.append_sibling(a, frame("c", 0.2));
    }

    #[test]
    #[should_panic(expected = "root of a flame graph cannot have siblings")]
    fn root_sibling_panics() {
        let mut tree = FlameTree::new();
        let root = tree.root();
        tree.append_sibling(root, frame("a", 0.2));
    }

    #[test]
    fn validate_reports_overweight_nodes() {
        let mut tree = FlameTree::new();
        let root = tree.root();
        let a = tree.append_child(root, frame("a", 0.5));
        let heavy = tree.append_child(a, frame("heavy", 0.7));

        assert_eq!(
            tree.validate(heavy),
            Err(Violation::ExceedsParent {
                weight: 0.7,
                parent: 0.5
            })
        );
        assert!(matches!(
            tree.validate(a),
            Err(Violation::ChildrenExceed { .. })
        ));
        assert_eq!(tree.validate(root), Ok(()));
    }

    #[test]
    fn children_summing_to_parent_are_valid() {
        let mut tree = FlameTree::new();
        let root = tree.root();
        for _ in 0..10 {
            tree.append_child(root, frame("tenth", 0.1));
        }
        assert_eq!(tree.validate(root), Ok(()));
    }

    #[test]
    fn layout_follows_previous_sibling() {
        let mut tree = FlameTree::new();
        let root = tree.root();
        let a = tree.append_child(root, frame("a", 0.5));
        let a1 = tree.append_child(a, frame("a1", 0.25));
        let a2 = tree.append_child(a, frame("a2", 0.25));
        for id in [root, a, a1, a2] {
            tree.layout(id);
        }

        assert_eq!(tree.node(a1).start(), 0.0);
        assert!((tree.node(a1).end() - 0.25).abs() < 1e-6);
        assert_eq!(tree.node(a2).start(), tree.node(a1).end());
        assert!((tree.node(a2).end() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn preorder_stays_inside_bound() {
        let mut tree = FlameTree::new();
        let root = tree.root();
        let a = tree.append_child(root, frame("a", 0.5));
        let a1 = tree.append_child(a, frame("a1", 0.2));
        tree.append_child(root, frame("b", 0.5));

        assert_eq!(tree.next_preorder(a, a), Some(a1));
        assert_eq!(tree.next_preorder(a1, a), None);
    }

    #[test]
    fn payload_downcast() {
        let mut tree = FlameTree::new();
        let root = tree.root();
        let a = tree.append_child(root, frame("a", 0.5));

        let payload = tree.node(a).item_as::<Frame>().expect("frame payload");
        assert_eq!(payload.label(), "a");
        assert!(tree.node(root).item_as::<Frame>().is_none());
    }

    #[test]
    fn frame_identity_defaults_to_label_hash() {
        assert_eq!(Frame::new("main", 1.0).identity(), hash64(b"main"));
        assert_eq!(Frame::new("main", 1.0).with_identity(7).identity(), 7);
    }

    #[test]
    fn handles_from_other_trees_are_rejected() {
        let first = FlameTree::new();
        let second = FlameTree::new();
        assert!(!first.contains(second.root()));
        assert!(first.get(second.root()).is_none());
    }
}
