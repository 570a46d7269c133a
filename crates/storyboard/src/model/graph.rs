//! Arena of nodes addressed by [`NodeIndex`].
//!
//! Nodes are never removed from the arena. A detached node stays addressable
//! but is not reachable from any screen, so it is never encoded.

use rustc_hash::FxHashMap;

use crate::error::GraphError;
use crate::model::node::{ComponentInstance, Node, NodeKind};
use crate::model::value::Action;
use crate::model::Id;

/// Dense index of a node in its [`NodeGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(u32);

impl NodeIndex {
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Indices past `u32::MAX` saturate to an index no node has.
    fn from_usize(index: usize) -> Self {
        let index = u32::try_from(index);
        debug_assert!(index.is_ok(), "node arena exceeds u32 indices");
        NodeIndex(index.unwrap_or(u32::MAX))
    }
}

/// Traversal order for [`NodeGraph::find_first`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintOrder {
    /// Painted first: flatten order.
    Bottom,
    /// Painted last: reverse flatten order.
    Top,
}

/// Node arena plus an index from [`Id`] to arena slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeGraph {
    nodes: Vec<Node>,
    index: FxHashMap<Id, NodeIndex>,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Creates a detached node with a freshly minted id.
    pub fn create(&mut self, kind: impl Into<NodeKind>) -> NodeIndex {
        let index = NodeIndex::from_usize(self.nodes.len());
        let node = Node::new(Id::mint(), kind);
        self.index.insert(node.id().clone(), index);
        self.nodes.push(node);
        index
    }

    /// Adds a node. Its parent and children links are cleared; use
    /// [`attach`](Self::attach) to place it in the tree.
    pub fn insert(&mut self, mut node: Node) -> Result<NodeIndex, GraphError> {
        if self.index.contains_key(node.id()) {
            return Err(GraphError::DuplicateId(node.id().clone()));
        }
        node.parent = None;
        node.children.clear();

        let index = NodeIndex::from_usize(self.nodes.len());
        self.index.insert(node.id().clone(), index);
        self.nodes.push(node);
        Ok(index)
    }

    pub fn get(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index.as_usize())
    }

    pub fn get_mut(&mut self, index: NodeIndex) -> Option<&mut Node> {
        self.nodes.get_mut(index.as_usize())
    }

    /// Finds a node by id.
    pub fn lookup(&self, id: &Id) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, index: NodeIndex) -> bool {
        index.as_usize() < self.nodes.len()
    }

    /// All nodes in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeIndex::from_usize(i), node))
    }

    /// Places `child` under `parent` at `position` (appended when `None`,
    /// clamped to the child count).
    pub fn attach(
        &mut self,
        parent: NodeIndex,
        child: NodeIndex,
        position: Option<usize>,
    ) -> Result<(), GraphError> {
        self.check(parent)?;
        self.check(child)?;
        if parent == child {
            return Err(GraphError::SelfAttach(child));
        }
        if let Some(existing) = self.nodes[child.as_usize()].parent {
            return Err(GraphError::AlreadyAttached {
                child,
                parent: existing,
            });
        }
        if self.ancestors(parent).any(|a| a == child) {
            return Err(GraphError::WouldCreateCycle { parent, child });
        }

        let children = &mut self.nodes[parent.as_usize()].children;
        let at = position.unwrap_or(children.len()).min(children.len());
        children.insert(at, child);
        self.nodes[child.as_usize()].parent = Some(parent);
        Ok(())
    }

    /// Removes `child` from its parent. Returns the former parent, or
    /// `None` if the node was already detached.
    pub fn detach(&mut self, child: NodeIndex) -> Result<Option<NodeIndex>, GraphError> {
        self.check(child)?;
        let Some(parent) = self.nodes[child.as_usize()].parent.take() else {
            return Ok(None);
        };
        self.nodes[parent.as_usize()].children.retain(|c| *c != child);
        Ok(Some(parent))
    }

    /// Parent chain of `index`, nearest first, excluding `index` itself.
    pub fn ancestors(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        std::iter::successors(self.get(index).and_then(Node::parent), move |current| {
            self.get(*current).and_then(Node::parent)
        })
    }

    /// Pre-order depth-first traversal of the subtree at `root`, children in
    /// order. Empty when `root` is out of bounds.
    pub fn flatten(&self, root: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        if !self.contains(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.nodes[current.as_usize()].children.iter().rev());
        }
        out
    }

    /// First node of the subtree at `root` matching `predicate`, searching
    /// from the bottom or the top of the paint order.
    pub fn find_first(
        &self,
        root: NodeIndex,
        order: PaintOrder,
        mut predicate: impl FnMut(&Node) -> bool,
    ) -> Option<NodeIndex> {
        let flat = self.flatten(root);
        let mut matches = |index: &NodeIndex| predicate(&self.nodes[index.as_usize()]);
        match order {
            PaintOrder::Bottom => flat.into_iter().find(|i| matches(i)),
            PaintOrder::Top => flat.into_iter().rev().find(|i| matches(i)),
        }
    }

    /// Visits every node of the subtree at `root` in flatten order.
    pub fn apply_to_all(&mut self, root: NodeIndex, mut f: impl FnMut(NodeIndex, &mut Node)) {
        for index in self.flatten(root) {
            f(index, &mut self.nodes[index.as_usize()]);
        }
    }

    /// Creates a detached instance of the main component at `main`.
    pub fn instantiate(&mut self, main: NodeIndex) -> Result<NodeIndex, GraphError> {
        self.check(main)?;
        if !matches!(self.nodes[main.as_usize()].kind, NodeKind::MainComponent(_)) {
            return Err(GraphError::NotAComponent(main));
        }
        let instance = self.create(ComponentInstance {
            component: Some(main),
            ..ComponentInstance::default()
        });
        if let NodeKind::MainComponent(component) = &mut self.nodes[main.as_usize()].kind {
            component.instances.push(instance);
        }
        Ok(instance)
    }

    /// Deep-copies the subtree at `root` and returns the detached copy.
    ///
    /// Every copy gets a new id. Links between nodes of the subtree point at
    /// the corresponding copies. Links leaving the subtree are dropped,
    /// except an instance's link to its main component, which is kept and
    /// registers the copy as a further instance.
    pub fn duplicate(&mut self, root: NodeIndex) -> Result<NodeIndex, GraphError> {
        self.check(root)?;
        let originals = self.flatten(root);

        let mut mapping: FxHashMap<NodeIndex, NodeIndex> = FxHashMap::default();
        for &original in &originals {
            let source = &self.nodes[original.as_usize()];
            let mut copy = Node::new(Id::mint(), source.kind.clone());
            copy.name = source.name.clone();
            copy.facets = source.facets.clone();

            let index = NodeIndex::from_usize(self.nodes.len());
            self.index.insert(copy.id().clone(), index);
            self.nodes.push(copy);
            mapping.insert(original, index);
        }

        let remap = |index: Option<NodeIndex>| index.and_then(|i| mapping.get(&i).copied());
        let mut new_instances: Vec<(NodeIndex, NodeIndex)> = Vec::new();

        for &original in &originals {
            let copy = mapping[&original];
            let children: Vec<NodeIndex> = self.nodes[original.as_usize()]
                .children
                .iter()
                .map(|c| mapping[c])
                .collect();
            for &child in &children {
                self.nodes[child.as_usize()].parent = Some(copy);
            }

            let node = &mut self.nodes[copy.as_usize()];
            node.children = children;

            let facets = &mut node.facets;
            facets.background = remap(facets.background);
            facets.overlay = remap(facets.overlay);
            facets.mask = remap(facets.mask);
            if let Some(Action::NavigateTo { screen: Some(target) }) = facets.action {
                facets.action = remap(Some(target)).map(|screen| Action::NavigateTo {
                    screen: Some(screen),
                });
            }

            match &mut node.kind {
                NodeKind::MainComponent(component) => {
                    component.instances = component
                        .instances
                        .iter()
                        .filter_map(|i| mapping.get(i).copied())
                        .collect();
                }
                NodeKind::ComponentInstance(instance) => {
                    if let Some(main) = instance.component {
                        match mapping.get(&main) {
                            Some(copied) => instance.component = Some(*copied),
                            None => new_instances.push((main, copy)),
                        }
                    }
                }
                _ => {}
            }
        }

        for (main, instance) in new_instances {
            if let NodeKind::MainComponent(component) = &mut self.nodes[main.as_usize()].kind {
                component.instances.push(instance);
            }
        }

        Ok(mapping[&root])
    }

    /// Appends a freshly created, detached node to `parent` without the
    /// checks of [`attach`](Self::attach).
    pub(crate) fn adopt(&mut self, parent: NodeIndex, child: NodeIndex) {
        self.nodes[child.as_usize()].parent = Some(parent);
        self.nodes[parent.as_usize()].children.push(child);
    }

    fn check(&self, index: NodeIndex) -> Result<(), GraphError> {
        if self.contains(index) {
            Ok(())
        } else {
            Err(GraphError::OutOfBounds(index))
        }
    }
}
