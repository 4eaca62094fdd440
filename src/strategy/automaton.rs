//! The strategy automaton store: nodes keyed by `(mode, state)`, held in an
//! arena so replacing a node in place never invalidates another node's
//! index, with an explicit in-edges list so replacement can rewrite every
//! incoming edge without an O(n) scan over the rest of the automaton.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};

use crate::variables::StateVector;

/// Index into the automaton's arena. Stable across node replacement:
/// [`StrategyAutomaton::delete`] tombstones the slot rather than
/// compacting the arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeIndex(usize);

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct StrategyNodeData {
    mode: usize,
    state: StateVector,
    out_edges: Vec<NodeIndex>,
    in_edges: Vec<NodeIndex>,
}

/// The strategy automaton: a store of `(mode, state)` nodes with outgoing
/// transition lists, built incrementally by the strategy builder.
///
/// At most one node exists per `(mode, state)` pair (the uniqueness
/// invariant); every edge endpoint always resolves to a live node.
#[derive(Debug, Default)]
pub struct StrategyAutomaton {
    nodes: Vec<Option<StrategyNodeData>>,
    index: HashMap<(usize, StateVector), NodeIndex>,
    initial: Vec<NodeIndex>,
}

impl StrategyAutomaton {
    /// Creates an empty automaton.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            initial: Vec::new(),
        }
    }

    /// Looks up the node for `(mode, state)`, if one has been inserted.
    pub fn find(&self, mode: usize, state: &StateVector) -> Option<NodeIndex> {
        self.index.get(&(mode, state.clone())).copied()
    }

    /// Inserts a fresh node for `(mode, state)` if absent, returning its
    /// index and whether it was newly created.
    pub fn get_or_insert(&mut self, mode: usize, state: &StateVector) -> (NodeIndex, bool) {
        if let Some(existing) = self.find(mode, state) {
            return (existing, false);
        }
        let idx = NodeIndex(self.nodes.len());
        self.nodes.push(Some(StrategyNodeData {
            mode,
            state: state.clone(),
            out_edges: Vec::new(),
            in_edges: Vec::new(),
        }));
        self.index.insert((mode, state.clone()), idx);
        (idx, true)
    }

    /// Marks `node` as one of the automaton's initial nodes.
    pub fn mark_initial(&mut self, node: NodeIndex) {
        if !self.initial.contains(&node) {
            self.initial.push(node);
        }
    }

    /// The automaton's initial nodes.
    pub fn initial_nodes(&self) -> &[NodeIndex] {
        &self.initial
    }

    fn node(&self, idx: NodeIndex) -> &StrategyNodeData {
        self.nodes[idx.0].as_ref().expect("dangling strategy node index")
    }

    fn node_mut(&mut self, idx: NodeIndex) -> &mut StrategyNodeData {
        self.nodes[idx.0].as_mut().expect("dangling strategy node index")
    }

    /// The `(mode, state)` key of a live node.
    pub fn key(&self, node: NodeIndex) -> (usize, &StateVector) {
        let data = self.node(node);
        (data.mode, &data.state)
    }

    /// The outgoing successors of `node`, in insertion order.
    pub fn successors(&self, node: NodeIndex) -> &[NodeIndex] {
        &self.node(node).out_edges
    }

    /// Appends an edge `from -> to`, recording the corresponding in-edge on
    /// `to`.
    pub fn append_edge(&mut self, from: NodeIndex, to: NodeIndex) {
        self.node_mut(from).out_edges.push(to);
        self.node_mut(to).in_edges.push(from);
    }

    /// Removes `node` from the store.
    ///
    /// If `replacement` is given, every edge that pointed at `node` is
    /// rewritten to point at `replacement` instead, and the corresponding
    /// in-edges are transferred. If `replacement` is `None`, `node`'s
    /// in-edges are simply abandoned (the caller is responsible for `node`
    /// having none, which is the case when deleting a node before it has
    /// been reached from anywhere).
    pub fn delete(&mut self, node: NodeIndex, replacement: Option<NodeIndex>) {
        let data = self.nodes[node.0].take().expect("dangling strategy node index");
        self.index.remove(&(data.mode, data.state.clone()));
        if let Some(replacement) = replacement {
            for &source in &data.in_edges {
                if source == node {
                    continue;
                }
                for edge in &mut self.node_mut(source).out_edges {
                    if *edge == node {
                        *edge = replacement;
                    }
                }
                self.node_mut(replacement).in_edges.push(source);
            }
        }
        self.initial.retain(|&i| i != node);
    }

    /// The number of live (non-tombstoned) nodes.
    pub fn size(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Writes the automaton in its textual node-list form: one line per
    /// live node, `(mode, state_vector, [successor_ids...])`.
    pub fn dump<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for slot in &self.nodes {
            if let Some(data) = slot {
                let successors: Vec<String> =
                    data.out_edges.iter().map(ToString::to_string).collect();
                writeln!(
                    writer,
                    "({}, {}, [{}])",
                    data.mode,
                    data.state,
                    successors.join(", ")
                )?;
            }
        }
        Ok(())
    }

    /// Drops every node, leaving the automaton empty.
    pub fn destroy(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.initial.clear();
    }
}
