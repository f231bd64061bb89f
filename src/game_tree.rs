//! Game Tree
//!
//! A branching move history. Node ids grow monotonically, so a parent always
//! has a smaller id than its children and "oldest" simply means "smallest id".
//! The first child of a node is its main line; the rest are variations.

use crate::engine::score::Score;
use crate::moves::Move;
use crate::position::Position;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

pub type NodeId = usize;

/// Default node ceiling before old branches are pruned
pub const DEFAULT_MAX_NODES: usize = 4096;

#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    /// Position after `mv` was played
    pub position: Position,
    /// Move that produced this node; `None` at the root
    pub mv: Option<Move>,
    pub notation: Option<String>,
    /// Engine evaluation from White's point of view
    pub evaluation: Option<Score>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub hash: u64,
}

impl Node {
    fn new(id: NodeId, position: Position, mv: Option<Move>, parent: Option<NodeId>) -> Self {
        let hash = position.zobrist();
        Node {
            id,
            position,
            mv,
            notation: None,
            evaluation: None,
            parent,
            children: Vec::new(),
            hash,
        }
    }
}

pub struct GameTree {
    nodes: BTreeMap<NodeId, Node>,
    root: NodeId,
    current: NodeId,
    next_id: NodeId,
    max_nodes: usize,
}

impl GameTree {
    pub fn new(start: Position) -> Self {
        Self::with_capacity(start, DEFAULT_MAX_NODES)
    }

    /// Tree that prunes old branches once it holds more than `max_nodes` nodes
    pub fn with_capacity(start: Position, max_nodes: usize) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(0, Node::new(0, start, None, None));
        GameTree {
            nodes,
            root: 0,
            current: 0,
            next_id: 1,
            max_nodes: max_nodes.max(1),
        }
    }

    /// Drop everything and start again from `start`
    pub fn clear(&mut self, start: Position) {
        *self = Self::with_capacity(start, self.max_nodes);
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn current_id(&self) -> NodeId {
        self.current
    }

    pub fn current(&self) -> &Node {
        // current is never pruned
        &self.nodes[&self.current]
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Record `mv` (which led to `position`) as a child of the current node
    /// and move there.
    ///
    /// If the current node already has a child for the same move it is
    /// re-entered instead of duplicated; a fresh evaluation replaces the old one.
    pub fn add_move(
        &mut self,
        position: Position,
        mv: Move,
        notation: Option<String>,
        evaluation: Option<Score>,
    ) -> NodeId {
        let existing = self.nodes[&self.current]
            .children
            .iter()
            .copied()
            .find(|id| self.nodes.get(id).and_then(|n| n.mv) == Some(mv));

        if let Some(id) = existing {
            if let Some(node) = self.nodes.get_mut(&id) {
                if evaluation.is_some() {
                    node.evaluation = evaluation;
                }
                if node.notation.is_none() {
                    node.notation = notation;
                }
            }
            self.current = id;
            return id;
        }

        let id = self.next_id;
        self.next_id += 1;

        let mut node = Node::new(id, position, Some(mv), Some(self.current));
        node.notation = notation;
        node.evaluation = evaluation;
        self.nodes.insert(id, node);
        if let Some(parent) = self.nodes.get_mut(&self.current) {
            parent.children.push(id);
        }
        self.current = id;

        self.prune();
        id
    }

    /// Step back to the parent. False at the root.
    pub fn undo(&mut self) -> bool {
        match self.nodes[&self.current].parent {
            Some(parent) => {
                self.current = parent;
                true
            }
            None => false,
        }
    }

    /// Follow the main line one step. False at a leaf.
    pub fn redo(&mut self) -> bool {
        self.go_to_variation(0)
    }

    /// Enter the `index`-th continuation of the current node
    pub fn go_to_variation(&mut self, index: usize) -> bool {
        match self.nodes[&self.current].children.get(index) {
            Some(&child) => {
                self.current = child;
                true
            }
            None => false,
        }
    }

    /// Jump to any node still in the tree
    pub fn go_to(&mut self, id: NodeId) -> bool {
        if self.nodes.contains_key(&id) {
            self.current = id;
            true
        } else {
            false
        }
    }

    /// Make the `index`-th continuation of the current node its main line
    pub fn promote_variation(&mut self, index: usize) -> bool {
        let Some(node) = self.nodes.get_mut(&self.current) else {
            return false;
        };
        if index >= node.children.len() {
            return false;
        }
        let child = node.children.remove(index);
        node.children.insert(0, child);
        true
    }

    pub fn set_evaluation(&mut self, id: NodeId, evaluation: Score) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.evaluation = Some(evaluation);
                true
            }
            None => false,
        }
    }

    /// Node ids from the root to the current node, inclusive
    pub fn path(&self) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut cursor = Some(self.current);
        while let Some(id) = cursor {
            path.push(id);
            cursor = self.nodes.get(&id).and_then(|n| n.parent);
        }
        path.reverse();
        path
    }

    /// Hashes along the root to current path, for repetition counting
    pub fn path_hashes(&self) -> Vec<u64> {
        self.path()
            .into_iter()
            .filter_map(|id| self.nodes.get(&id).map(|n| n.hash))
            .collect()
    }

    /// Root followed by first children down to a leaf
    pub fn main_line(&self) -> Vec<NodeId> {
        let mut line = vec![self.root];
        let mut cursor = self.root;
        while let Some(&next) = self.nodes.get(&cursor).and_then(|n| n.children.first()) {
            line.push(next);
            cursor = next;
        }
        line
    }

    /// Remove the oldest branches until the tree fits. Anything on the path
    /// to the current node is kept, even if that alone exceeds the limit.
    fn prune(&mut self) {
        if self.nodes.len() <= self.max_nodes {
            return;
        }
        let keep: HashSet<NodeId> = self.path().into_iter().collect();

        while self.nodes.len() > self.max_nodes {
            let victim = self.nodes.keys().copied().find(|id| !keep.contains(id));
            let Some(victim) = victim else {
                break;
            };
            let removed = self.remove_subtree(victim);
            debug!(node = victim, removed, "pruned game tree branch");
        }
    }

    fn remove_subtree(&mut self, id: NodeId) -> usize {
        if let Some(parent) = self.nodes.get(&id).and_then(|n| n.parent) {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.retain(|&c| c != id);
            }
        }
        let mut stack = vec![id];
        let mut removed = 0;
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children);
                removed += 1;
            }
        }
        removed
    }
}
