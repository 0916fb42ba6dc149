// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! BSP tree nodes
//!
//! Every tree walk here runs on an explicit stack so that deep trees built
//! from large meshes cannot exhaust the call stack. That includes dropping a
//! tree, see the `Drop` impl at the bottom.

use super::parallel;
use super::{Plane, Polygon};
use crate::config::{BuildLimitPolicy, CsgConfig};
use crate::error::{CsgError, CsgResult};
use rayon::prelude::*;
use std::fmt;
use tracing::warn;

/// One node of a BSP tree.
///
/// Holds the polygons lying in its partitioning plane and exclusively owns
/// its front and back subtrees. A node without a plane is an empty tree.
#[derive(Default)]
pub struct Node {
    polygons: Vec<Polygon>,
    plane: Option<Plane>,
    front: Option<Box<Node>>,
    back: Option<Box<Node>>,
}

/// Pending build work: polygons still to be filtered into a node.
type WorkItem<'a> = (&'a mut Node, Vec<Polygon>);

enum ClipFrame<'a> {
    Enter {
        node: &'a Node,
        polygons: Vec<Polygon>,
        slot: usize,
    },
    Exit {
        slot: usize,
        front: usize,
        back: usize,
    },
}

impl Node {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from `polygons`.
    ///
    /// Each node partitions along the plane of the first polygon it receives.
    /// Construction processes at most `config.max_build_steps` work items; what
    /// happens to the remainder is decided by `config.build_limit`.
    pub fn build(polygons: Vec<Polygon>, config: &CsgConfig) -> CsgResult<Self> {
        let mut root = Node::new();
        if polygons.is_empty() {
            return Ok(root);
        }

        let (pending, dropped) = {
            let mut stack: Vec<WorkItem<'_>> = vec![(&mut root, polygons)];
            let mut steps = 0usize;
            while steps < config.max_build_steps {
                let Some((node, polygons)) = stack.pop() else {
                    break;
                };
                steps += 1;
                stack.extend(Self::build_step(node, polygons, config).into_iter().flatten());
            }
            let dropped: usize = stack.iter().map(|(_, polygons)| polygons.len()).sum();
            (stack.len(), dropped)
        };

        if pending > 0 {
            match config.build_limit {
                BuildLimitPolicy::Truncate => {
                    warn!(
                        limit = config.max_build_steps,
                        pending,
                        dropped,
                        "BSP build step limit reached, tree is truncated"
                    );
                }
                BuildLimitPolicy::Fail => {
                    return Err(CsgError::BuildLimitExceeded {
                        limit: config.max_build_steps,
                        pending,
                    });
                }
            }
        }

        Ok(root)
    }

    /// Filter `polygons` into an existing tree.
    ///
    /// Used to merge the surviving polygons of one operand into the other
    /// operand's tree. Polygons coplanar with a node stay there, the rest
    /// descend, spanning ones are split, and new nodes are created at the
    /// leaves as needed. Unlike [`Node::build`] this never stops early.
    pub fn build_for_result(&mut self, polygons: Vec<Polygon>, config: &CsgConfig) {
        let mut stack: Vec<WorkItem<'_>> = vec![(self, polygons)];
        while let Some((node, polygons)) = stack.pop() {
            stack.extend(Self::build_step(node, polygons, config).into_iter().flatten());
        }
    }

    fn build_step<'a>(
        node: &'a mut Node,
        polygons: Vec<Polygon>,
        config: &CsgConfig,
    ) -> [Option<WorkItem<'a>>; 2] {
        let plane = match node.plane {
            Some(plane) => plane,
            None => {
                let Some(first) = polygons.first() else {
                    return [None, None];
                };
                node.plane = Some(first.plane);
                first.plane
            }
        };

        let classifications =
            parallel::classify_all(&plane, &polygons, config.epsilon, config.parallel);

        let mut front = Vec::new();
        let mut back = Vec::new();
        for (polygon, classification) in polygons.into_iter().zip(&classifications) {
            plane.split_for_build(
                polygon,
                classification,
                &mut node.polygons,
                &mut front,
                &mut back,
            );
        }

        let Node {
            front: front_child,
            back: back_child,
            ..
        } = node;
        let front_item = (!front.is_empty()).then(|| (child(front_child), front));
        let back_item = (!back.is_empty()).then(|| (child(back_child), back));
        [front_item, back_item]
    }

    /// Swap solid and empty space.
    ///
    /// Flips every polygon and plane and swaps front and back subtrees.
    /// Inverting twice restores the original tree.
    pub fn invert(&mut self) {
        let mut stack: Vec<&mut Node> = vec![self];
        while let Some(node) = stack.pop() {
            let Node {
                polygons,
                plane,
                front,
                back,
            } = node;

            if plane.is_none() {
                match polygons.first() {
                    Some(first) => *plane = Some(first.plane),
                    None => continue,
                }
            }

            for polygon in polygons.iter_mut() {
                polygon.flip();
            }
            if let Some(plane) = plane.as_mut() {
                plane.flip();
            }
            std::mem::swap(front, back);

            if let Some(back) = back.as_deref_mut() {
                stack.push(back);
            }
            if let Some(front) = front.as_deref_mut() {
                stack.push(front);
            }
        }
    }

    /// Remove the parts of `polygons` that lie inside this tree's solid.
    ///
    /// Spanning polygons are split. Fragments reaching the back of a node
    /// without a back subtree are inside and get discarded; an empty tree
    /// clips nothing.
    pub fn clip_polygons(&self, polygons: Vec<Polygon>, config: &CsgConfig) -> Vec<Polygon> {
        if self.plane.is_none() {
            return polygons;
        }

        // Slot 0 receives the final result; each entered node adds two slots
        // for its front and back survivors.
        let mut slots: Vec<Vec<Polygon>> = vec![Vec::new()];
        let mut stack = vec![ClipFrame::Enter {
            node: self,
            polygons,
            slot: 0,
        }];

        while let Some(frame) = stack.pop() {
            match frame {
                ClipFrame::Enter {
                    node,
                    polygons,
                    slot,
                } => {
                    let Some(plane) = node.plane else {
                        slots[slot] = polygons;
                        continue;
                    };

                    let classifications =
                        parallel::classify_all(&plane, &polygons, config.epsilon, config.parallel);
                    let mut front = Vec::new();
                    let mut back = Vec::new();
                    for (polygon, classification) in polygons.into_iter().zip(&classifications) {
                        plane.split_for_clip(polygon, classification, &mut front, &mut back);
                    }

                    let front_slot = slots.len();
                    let back_slot = front_slot + 1;
                    slots.push(Vec::new());
                    slots.push(Vec::new());
                    stack.push(ClipFrame::Exit {
                        slot,
                        front: front_slot,
                        back: back_slot,
                    });

                    match node.back.as_deref() {
                        Some(back_node) => stack.push(ClipFrame::Enter {
                            node: back_node,
                            polygons: back,
                            slot: back_slot,
                        }),
                        None => drop(back),
                    }
                    match node.front.as_deref() {
                        Some(front_node) => stack.push(ClipFrame::Enter {
                            node: front_node,
                            polygons: front,
                            slot: front_slot,
                        }),
                        None => slots[front_slot] = front,
                    }
                }
                ClipFrame::Exit { slot, front, back } => {
                    let mut survivors = std::mem::take(&mut slots[front]);
                    survivors.append(&mut slots[back]);
                    slots[slot] = survivors;
                }
            }
        }

        std::mem::take(&mut slots[0])
    }

    /// Remove every polygon of this tree that lies inside `bsp`.
    ///
    /// Nodes are visited in batches of `config.clip_batch`; the nodes of one
    /// batch are clipped concurrently. The batch size does not affect the
    /// result.
    pub fn clip_to(&mut self, bsp: &Node, config: &CsgConfig) {
        let batch_size = config.clip_batch.max(1);
        let mut stack: Vec<&mut Node> = vec![self];

        while !stack.is_empty() {
            let take = batch_size.min(stack.len());
            let mut batch = stack.split_off(stack.len() - take);

            let clip = |node: &mut &mut Node| {
                let polygons = std::mem::take(&mut node.polygons);
                node.polygons = bsp.clip_polygons(polygons, config);
            };
            if config.parallel && batch.len() > 1 {
                batch.par_iter_mut().for_each(clip);
            } else {
                batch.iter_mut().for_each(clip);
            }

            for node in batch {
                let Node { front, back, .. } = node;
                if let Some(back) = back.as_deref_mut() {
                    stack.push(back);
                }
                if let Some(front) = front.as_deref_mut() {
                    stack.push(front);
                }
            }
        }
    }

    /// Append clones of every polygon in the tree to `result`.
    ///
    /// Pre-order: a node's own polygons, then its front subtree, then its back
    /// subtree.
    pub fn all_polygons_into(&self, result: &mut Vec<Polygon>) {
        let mut stack: Vec<&Node> = vec![self];
        while let Some(node) = stack.pop() {
            result.extend(node.polygons.iter().cloned());
            if let Some(back) = node.back.as_deref() {
                stack.push(back);
            }
            if let Some(front) = node.front.as_deref() {
                stack.push(front);
            }
        }
    }

    pub fn all_polygons(&self) -> Vec<Polygon> {
        let mut result = Vec::new();
        self.all_polygons_into(&mut result);
        result
    }

    /// Consume the tree, moving its polygons into `result` in the same order
    /// as [`Node::all_polygons_into`].
    pub fn into_polygons_into(self, result: &mut Vec<Polygon>) {
        let mut stack: Vec<Node> = vec![self];
        while let Some(mut node) = stack.pop() {
            result.append(&mut node.polygons);
            if let Some(back) = node.back.take() {
                stack.push(*back);
            }
            if let Some(front) = node.front.take() {
                stack.push(*front);
            }
        }
    }

    pub fn into_polygons(self) -> Vec<Polygon> {
        let mut result = Vec::new();
        self.into_polygons_into(&mut result);
        result
    }

    pub fn plane(&self) -> Option<&Plane> {
        self.plane.as_ref()
    }

    /// Polygons stored in this node only.
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn front(&self) -> Option<&Node> {
        self.front.as_deref()
    }

    pub fn back(&self) -> Option<&Node> {
        self.back.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.plane.is_none() && self.polygons.is_empty()
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.fold(0, |count, _, _| count + 1)
    }

    /// Number of polygons stored anywhere in the tree.
    pub fn polygon_count(&self) -> usize {
        self.fold(0, |count, node, _| count + node.polygons.len())
    }

    /// Length of the longest root-to-leaf path, counting nodes.
    pub fn depth(&self) -> usize {
        self.fold(0, |deepest, _, depth| deepest.max(depth))
    }

    fn fold<T>(&self, init: T, mut f: impl FnMut(T, &Node, usize) -> T) -> T {
        let mut acc = init;
        let mut stack: Vec<(&Node, usize)> = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            acc = f(acc, node, depth);
            stack.extend(node.front.as_deref().map(|n| (n, depth + 1)));
            stack.extend(node.back.as_deref().map(|n| (n, depth + 1)));
        }
        acc
    }
}

fn child(slot: &mut Option<Box<Node>>) -> &mut Node {
    slot.get_or_insert_with(Box::default)
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("plane", &self.plane)
            .field("polygons", &self.polygons.len())
            .field("nodes", &self.node_count())
            .field("total_polygons", &self.polygon_count())
            .finish()
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        let mut stack: Vec<Box<Node>> = Vec::new();
        stack.extend(self.front.take());
        stack.extend(self.back.take());
        while let Some(mut node) = stack.pop() {
            stack.extend(node.front.take());
            stack.extend(node.back.take());
        }
    }
}
