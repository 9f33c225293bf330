//! Audio graph abstraction
//!
//! The chain manager, mono stage, and recorder never touch a real audio
//! backend directly. They perform all topology work through [`AudioGraph`],
//! a small trait over node construction and edge surgery. The real DSP
//! implementation lives in the `infra` crate; [`EdgeListGraph`] here is a
//! pure topology implementation used by unit, property, and integration
//! tests to verify graph invariants without an audio backend.

use crate::domain::audio::{AudioError, Result};
use crate::domain::filter::{FilterKind, FilterParams};
use std::fmt;
use tracing::trace;

/// Unique identifier for a node in an audio graph
///
/// Ids are handed out by the graph on `add_node` and stay valid for the
/// lifetime of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Id for the node stored at `index`. Graph implementations hand these
    /// out from `add_node`; there is no other way to mint a valid id.
    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of node to construct
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeSpec {
    /// Fixed upstream anchor fed by the capture stream
    Source,
    /// Gain stage (the session sink is one of these)
    Gain { gain: f32 },
    /// One biquad filter unit of a fixed kind
    Filter {
        kind: FilterKind,
        params: FilterParams,
    },
    /// Channel splitter (mono downmix scaffolding)
    Splitter,
    /// Channel merger summing both channels into both outputs
    Merger,
    /// Recording tap: observes a node without altering the primary path
    Tap,
}

/// Trait over live audio graph topology
///
/// `connect`/`disconnect` must reject operations whose preconditions do not
/// hold (duplicate edge, missing edge, unknown node) with
/// [`AudioError::GraphIntegrity`] / [`AudioError::UnknownNode`] so that the
/// chain manager can abort a mutation without guessing at graph state.
pub trait AudioGraph: Send {
    /// Construct a node and return its id
    fn add_node(&mut self, spec: NodeSpec) -> NodeId;

    /// Wire `from -> to`. Fails if the edge already exists.
    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()>;

    /// Remove the edge `from -> to`. Fails if it is not present.
    fn disconnect(&mut self, from: NodeId, to: NodeId) -> Result<()>;

    /// Update the gain of a `Gain` node
    fn set_gain(&mut self, node: NodeId, gain: f32) -> Result<()>;

    /// Update the parameters of a `Filter` node without resetting its state
    fn update_filter(&mut self, node: NodeId, params: FilterParams) -> Result<()>;
}

/// Ordered set of directed edges with integrity-checked mutation
///
/// Shared by [`EdgeListGraph`] and the infra processing graph so both
/// enforce identical connect/disconnect semantics.
#[derive(Debug, Clone, Default)]
pub struct EdgeList {
    edges: Vec<(NodeId, NodeId)>,
}

impl EdgeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        if self.contains(from, to) {
            return Err(AudioError::GraphIntegrity(format!(
                "edge {from} -> {to} already exists"
            )));
        }
        self.edges.push((from, to));
        trace!(%from, %to, "edge connected");
        Ok(())
    }

    pub fn disconnect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        let position = self
            .edges
            .iter()
            .position(|&(f, t)| f == from && t == to)
            .ok_or_else(|| {
                AudioError::GraphIntegrity(format!("edge {from} -> {to} is not connected"))
            })?;
        self.edges.remove(position);
        trace!(%from, %to, "edge disconnected");
        Ok(())
    }

    pub fn contains(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.iter().any(|&(f, t)| f == from && t == to)
    }

    pub fn successors(&self, from: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .filter(move |&&(f, _)| f == from)
            .map(|&(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.edges.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }
}

/// Pure topology implementation of [`AudioGraph`]
///
/// Records node specs and edges without any signal processing. Parameter
/// updates are written back into the stored spec so tests can observe them.
#[derive(Debug, Clone, Default)]
pub struct EdgeListGraph {
    nodes: Vec<NodeSpec>,
    edges: EdgeList,
}

impl EdgeListGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeSpec> {
        self.nodes.get(id.index())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> &EdgeList {
        &self.edges
    }

    /// Gain value of a `Gain` node, if `id` is one
    pub fn gain_of(&self, id: NodeId) -> Option<f32> {
        match self.node(id) {
            Some(NodeSpec::Gain { gain }) => Some(*gain),
            _ => None,
        }
    }

    /// Current parameters of a `Filter` node, if `id` is one
    pub fn filter_params(&self, id: NodeId) -> Option<FilterParams> {
        match self.node(id) {
            Some(NodeSpec::Filter { params, .. }) => Some(*params),
            _ => None,
        }
    }

    fn is_tap(&self, id: NodeId) -> bool {
        matches!(self.node(id), Some(NodeSpec::Tap))
    }

    /// Nodes observed by a tap hanging off `from`
    pub fn taps_of(&self, from: NodeId) -> Vec<NodeId> {
        self.edges
            .successors(from)
            .filter(|&n| self.is_tap(n))
            .collect()
    }

    /// Walk the unique signal path starting at `from`, ignoring tap edges.
    ///
    /// Returns every node on the path including `from` and the terminal.
    /// Fails if any node on the way has more than one non-tap successor or
    /// the walk revisits a node.
    pub fn path_from(&self, from: NodeId) -> Result<Vec<NodeId>> {
        let mut path = vec![from];
        let mut current = from;
        loop {
            let next: Vec<NodeId> = self
                .edges
                .successors(current)
                .filter(|&n| !self.is_tap(n))
                .collect();
            match next.as_slice() {
                [] => return Ok(path),
                [only] => {
                    if path.contains(only) {
                        return Err(AudioError::GraphIntegrity(format!(
                            "cycle through {only}"
                        )));
                    }
                    path.push(*only);
                    current = *only;
                }
                many => {
                    return Err(AudioError::GraphIntegrity(format!(
                        "{current} fans out to {} nodes",
                        many.len()
                    )))
                }
            }
        }
    }

    fn check_node(&self, id: NodeId) -> Result<()> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(AudioError::UnknownNode(id))
        }
    }
}

impl AudioGraph for EdgeListGraph {
    fn add_node(&mut self, spec: NodeSpec) -> NodeId {
        self.nodes.push(spec);
        NodeId((self.nodes.len() - 1) as u32)
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.check_node(from)?;
        self.check_node(to)?;
        self.edges.connect(from, to)
    }

    fn disconnect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.check_node(from)?;
        self.check_node(to)?;
        self.edges.disconnect(from, to)
    }

    fn set_gain(&mut self, node: NodeId, gain: f32) -> Result<()> {
        self.check_node(node)?;
        match &mut self.nodes[node.index()] {
            NodeSpec::Gain { gain: g } => {
                *g = gain;
                Ok(())
            }
            other => Err(AudioError::GraphIntegrity(format!(
                "{node} is not a gain node (got {other:?})"
            ))),
        }
    }

    fn update_filter(&mut self, node: NodeId, params: FilterParams) -> Result<()> {
        self.check_node(node)?;
        match &mut self.nodes[node.index()] {
            NodeSpec::Filter { params: p, .. } => {
                *p = params;
                Ok(())
            }
            other => Err(AudioError::GraphIntegrity(format!(
                "{node} is not a filter node (got {other:?})"
            ))),
        }
    }
}
