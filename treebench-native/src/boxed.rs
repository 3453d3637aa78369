// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Boxed tree: every node owns its children, nothing points back up.
//!
//! Without parent links there is no cheap way to walk from a leaf to the
//! root, so this library does not offer pairwise leaf distances.

use crate::tree::Tree;

#[derive(Debug, Default, PartialEq)]
pub struct BoxedNode {
    pub label: Option<String>,
    pub length: Option<f64>,
    pub children: Vec<BoxedNode>,
}

impl BoxedNode {
    /// Convert from the arena representation.
    pub fn from_tree(tree: &Tree) -> Self {
        // Children come after their parent in the arena, so a backward
        // pass can always move finished subtrees into their parent.
        let mut built: Vec<Option<BoxedNode>> = tree.ids().map(|_| None).collect();
        for id in tree.ids().rev() {
            let node = tree.node(id);
            let children = node
                .children
                .iter()
                .filter_map(|child| built[child.index()].take())
                .collect();
            built[id.index()] = Some(BoxedNode {
                label: node.label.clone(),
                length: node.length,
                children,
            });
        }
        built
            .first_mut()
            .and_then(Option::take)
            .unwrap_or_default()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Largest root-to-leaf path length.
    pub fn height(&self) -> f64 {
        let mut height: f64 = 0.0;
        let mut stack: Vec<(&BoxedNode, f64)> =
            self.children.iter().map(|c| (c, 0.0)).collect();
        while let Some((node, above)) = stack.pop() {
            let depth = above + node.length.unwrap_or(0.0);
            if node.is_leaf() {
                height = height.max(depth);
            }
            stack.extend(node.children.iter().map(|c| (c, depth)));
        }
        height
    }

    /// Visit every non-root node.
    fn for_each_edge(&self, mut visit: impl FnMut(&BoxedNode)) {
        let mut stack: Vec<&BoxedNode> = self.children.iter().collect();
        while let Some(node) = stack.pop() {
            visit(node);
            stack.extend(node.children.iter());
        }
    }

    pub fn average_branch_length(&self) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        self.for_each_edge(|node| {
            if let Some(len) = node.length {
                sum += len;
                count += 1;
            }
        });
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    pub fn treeness(&self) -> f64 {
        let mut total = 0.0;
        let mut internal = 0.0;
        self.for_each_edge(|node| {
            if let Some(len) = node.length {
                total += len;
                if !node.is_leaf() {
                    internal += len;
                }
            }
        });
        if total == 0.0 {
            0.0
        } else {
            internal / total
        }
    }
}

impl Drop for BoxedNode {
    // The derived drop recurses once per level; unlink iteratively instead.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}
