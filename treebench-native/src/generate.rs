// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Random fixture trees.

use rand::Rng;

use crate::tree::{NodeId, Tree};

/// Random rooted binary tree with `leaves` leaves labelled `L1..Ln`.
///
/// Each internal node splits its leaf budget uniformly at random between
/// its two children. Every edge gets a length drawn uniformly from [0, 1).
pub fn random_tree<R: Rng + ?Sized>(leaves: u32, rng: &mut R) -> Tree {
    let mut tree = Tree::new();
    let mut next_label = 1u32;
    let mut pending: Vec<(NodeId, u32)> = vec![(tree.root(), leaves.max(1))];

    while let Some((id, budget)) = pending.pop() {
        if budget == 1 {
            tree.node_mut(id).label = Some(format!("L{next_label}"));
            next_label += 1;
            continue;
        }
        let split = rng.gen_range(1..budget);
        let left = tree.add_child(id);
        let right = tree.add_child(id);
        tree.node_mut(left).length = Some(rng.gen_range(0.0..1.0));
        tree.node_mut(right).length = Some(rng.gen_range(0.0..1.0));
        pending.push((right, budget - split));
        pending.push((left, split));
    }

    tree
}
