//! Append-only search tree for RRT
//!
//! Nodes live in an arena and refer to each other by `NodeId`. A node owns the
//! ids of its children and holds a non-owning id of its parent, so walking
//! to the root is O(depth) and there are no reference cycles. Nodes are never
//! removed or moved, and ids are handed out in insertion order: a child's id
//! is always greater than its parent's.

use std::collections::VecDeque;

use ordered_float::OrderedFloat;

use crate::common::{Coordinate, PlannerError, PlannerResult, Point};

/// Index of a node in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct TreeNode<T> {
    point: Point<T>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl<T: Coordinate> TreeNode<T> {
    pub fn point(&self) -> Point<T> {
        self.point
    }

    /// `None` only for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone)]
pub struct SearchTree<T> {
    nodes: Vec<TreeNode<T>>,
}

impl<T: Coordinate> SearchTree<T> {
    pub fn new(root: Point<T>) -> Self {
        Self {
            nodes: vec![TreeNode {
                point: root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree is created with its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &TreeNode<T> {
        &self.nodes[id.0]
    }

    pub fn point(&self, id: NodeId) -> Point<T> {
        self.nodes[id.0].point
    }

    /// Appends `point` as a new child of `parent`.
    pub fn insert(&mut self, parent: NodeId, point: Point<T>) -> PlannerResult<NodeId> {
        if parent.0 >= self.nodes.len() {
            return Err(PlannerError::InvalidParameter(format!(
                "parent node {} does not exist in a tree of {} nodes",
                parent.0,
                self.nodes.len()
            )));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode {
            point,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Breadth-first order over owned children, starting at the root.
    pub fn bfs(&self) -> Bfs<'_, T> {
        Bfs {
            tree: self,
            queue: VecDeque::from([NodeId::ROOT]),
        }
    }

    /// Exhaustive nearest-node search.
    ///
    /// Visits every node in breadth-first order and returns the first one at
    /// the minimum Euclidean distance to `query`, together with that distance.
    pub fn nearest(&self, query: &Point<T>) -> (NodeId, f64) {
        self.bfs()
            .map(|id| (id, self.nodes[id.0].point.distance(query)))
            .min_by_key(|&(_, d)| OrderedFloat(d))
            .unwrap_or((NodeId::ROOT, self.nodes[0].point.distance(query)))
    }

    /// Ids from `id` up to and including the root.
    pub fn path_to_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut current = Some(id);
        while let Some(index) = current {
            ids.push(index);
            current = self.nodes[index.0].parent;
        }
        ids
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.path_to_root(id).len() - 1
    }

    /// Nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TreeNode<T>)> + '_ {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    /// `(parent, child)` point pairs for every edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point<T>, Point<T>)> + '_ {
        self.nodes
            .iter()
            .filter_map(move |node| node.parent.map(|p| (self.nodes[p.0].point, node.point)))
    }
}

/// Breadth-first traversal of a `SearchTree`.
pub struct Bfs<'a, T> {
    tree: &'a SearchTree<T>,
    queue: VecDeque<NodeId>,
}

impl<'a, T: Coordinate> Iterator for Bfs<'a, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.queue.pop_front()?;
        self.queue.extend(self.tree.nodes[id.0].children.iter().copied());
        Some(id)
    }
}
