// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Arena tree: a flat node vector with parent links.
//!
//! Nodes are only ever appended below an existing parent, so a parent's
//! index is always smaller than any of its children's. Every traversal
//! below relies on that and runs as a single forward pass without
//! recursion.

use std::fmt;

/// Index of a node in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub label: Option<String>,
    /// Length of the edge to the parent.
    pub length: Option<f64>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// A tree holding only an unlabeled root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Append a new child under `parent`.
    pub fn add_child(&mut self, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            ..Node::default()
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in creation order. Parents precede their children.
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = NodeId> + ExactSizeIterator {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids().filter(move |id| self.node(*id).is_leaf())
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    pub fn leaf_by_label(&self, label: &str) -> Option<NodeId> {
        self.leaves()
            .find(|id| self.node(*id).label.as_deref() == Some(label))
    }

    /// Edge lengths of every non-root node, missing lengths skipped.
    fn edge_lengths(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.ids()
            .skip(1)
            .filter_map(move |id| self.node(id).length.map(|len| (id, len)))
    }

    /// Largest root-to-leaf path length.
    pub fn height(&self) -> f64 {
        let mut depth = vec![0.0; self.nodes.len()];
        let mut height: f64 = 0.0;
        for id in self.ids().skip(1) {
            let node = self.node(id);
            let parent = node.parent.map_or(0, |p| p.0);
            depth[id.0] = depth[parent] + node.length.unwrap_or(0.0);
            if node.is_leaf() {
                height = height.max(depth[id.0]);
            }
        }
        height
    }

    /// Mean length over all edges that carry one. Zero without any.
    pub fn average_branch_length(&self) -> f64 {
        let (sum, count) = self
            .edge_lengths()
            .fold((0.0, 0usize), |(sum, count), (_, len)| (sum + len, count + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    /// Internal edge length over total edge length. Zero when the total is.
    pub fn treeness(&self) -> f64 {
        let mut total = 0.0;
        let mut internal = 0.0;
        for (id, len) in self.edge_lengths() {
            total += len;
            if !self.node(id).is_leaf() {
                internal += len;
            }
        }
        if total == 0.0 {
            0.0
        } else {
            internal / total
        }
    }

    /// Number of edges between `id` and the root.
    fn level(&self, mut id: NodeId) -> usize {
        let mut level = 0;
        while let Some(parent) = self.node(id).parent {
            id = parent;
            level += 1;
        }
        level
    }

    /// Path length between two nodes, walking up to their lowest common ancestor.
    pub fn distance(&self, a: NodeId, b: NodeId) -> f64 {
        let (mut a, mut b) = (a, b);
        let (mut level_a, mut level_b) = (self.level(a), self.level(b));
        let mut distance = 0.0;

        let mut climb = |id: &mut NodeId| {
            let node = self.node(*id);
            distance += node.length.unwrap_or(0.0);
            *id = node.parent.unwrap_or(*id);
        };

        while level_a > level_b {
            climb(&mut a);
            level_a -= 1;
        }
        while level_b > level_a {
            climb(&mut b);
            level_b -= 1;
        }
        while a != b {
            climb(&mut a);
            climb(&mut b);
        }
        distance
    }
}
