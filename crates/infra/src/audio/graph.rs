//! Real processing graph behind the core `AudioGraph` trait
//!
//! Nodes carry actual DSP state (stereo biquad pairs, gain factors); edges
//! reuse the core [`EdgeList`] so connect/disconnect semantics are
//! identical to the topology graph the tests run against. Rendering pulls
//! one interleaved stereo block along the single active path from the
//! source node to the terminal sink.

use busker_core::domain::audio::{AudioError, Result};
use busker_core::domain::filter::{BiquadCoeffs, BiquadFilter, FilterKind, FilterParams};
use busker_core::domain::graph::{AudioGraph, EdgeList, NodeId, NodeSpec};
use tracing::trace;

enum DspNode {
    Source,
    Gain {
        gain: f32,
    },
    Filter {
        kind: FilterKind,
        left: BiquadFilter,
        right: BiquadFilter,
    },
    Splitter,
    Merger,
    Tap,
}

/// DSP-backed audio graph processing interleaved stereo f32 blocks
pub struct ProcessGraph {
    nodes: Vec<DspNode>,
    edges: EdgeList,
    sample_rate: u32,
}

impl ProcessGraph {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            nodes: Vec::new(),
            edges: EdgeList::new(),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn check_node(&self, id: NodeId) -> Result<()> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(AudioError::UnknownNode(id))
        }
    }

    fn is_tap(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.index()], DspNode::Tap)
    }

    /// The session source node (exactly one exists per live session)
    fn source(&self) -> Result<NodeId> {
        self.nodes
            .iter()
            .position(|n| matches!(n, DspNode::Source))
            .map(NodeId::from_index)
            .ok_or_else(|| AudioError::GraphIntegrity("no source node".to_string()))
    }

    /// Apply one node's DSP to an interleaved stereo buffer in place
    fn apply(&mut self, id: NodeId, buffer: &mut [f32]) {
        match &mut self.nodes[id.index()] {
            DspNode::Source | DspNode::Splitter | DspNode::Tap => {}
            DspNode::Gain { gain } => {
                let gain = *gain;
                for sample in buffer.iter_mut() {
                    *sample *= gain;
                }
            }
            DspNode::Filter { left, right, .. } => {
                for frame in buffer.chunks_exact_mut(2) {
                    frame[0] = left.process_sample(frame[0]);
                    frame[1] = right.process_sample(frame[1]);
                }
            }
            DspNode::Merger => {
                // Both channels get the sum; the compensation gain stage
                // downstream restores unity level
                for frame in buffer.chunks_exact_mut(2) {
                    let sum = frame[0] + frame[1];
                    frame[0] = sum;
                    frame[1] = sum;
                }
            }
        }
    }

    /// Pull one block through the active path.
    ///
    /// Copies `input` into `output` and processes in place, following the
    /// unique non-tap successor from the source to the terminal node.
    /// Returns whether any node on the path feeds a tap (i.e. the rendered
    /// block should also go to the recorder).
    pub fn render(&mut self, input: &[f32], output: &mut [f32]) -> Result<bool> {
        let len = input.len().min(output.len());
        output[..len].copy_from_slice(&input[..len]);
        if len < output.len() {
            output[len..].fill(0.0);
        }

        let mut current = self.source()?;
        let mut hops = 0usize;
        let mut tapped = false;
        loop {
            self.apply(current, output);
            if self.edges.successors(current).any(|n| self.is_tap(n)) {
                tapped = true;
            }

            let mut on_path = self.edges.successors(current).filter(|&n| !self.is_tap(n));
            let next = on_path.next();
            if on_path.next().is_some() {
                return Err(AudioError::GraphIntegrity(format!(
                    "{current} fans out on the signal path"
                )));
            }
            drop(on_path);

            match next {
                Some(node) => {
                    hops += 1;
                    if hops > self.nodes.len() {
                        return Err(AudioError::GraphIntegrity(
                            "cycle on signal path".to_string(),
                        ));
                    }
                    current = node;
                }
                None => break,
            }
        }
        Ok(tapped)
    }
}

impl AudioGraph for ProcessGraph {
    fn add_node(&mut self, spec: NodeSpec) -> NodeId {
        let node = match spec {
            NodeSpec::Source => DspNode::Source,
            NodeSpec::Gain { gain } => DspNode::Gain { gain },
            NodeSpec::Filter { kind, params } => {
                let coeffs = BiquadCoeffs::for_kind(kind, self.sample_rate as f32, params);
                DspNode::Filter {
                    kind,
                    left: BiquadFilter::new(coeffs),
                    right: BiquadFilter::new(coeffs),
                }
            }
            NodeSpec::Splitter => DspNode::Splitter,
            NodeSpec::Merger => DspNode::Merger,
            NodeSpec::Tap => DspNode::Tap,
        };
        self.nodes.push(node);
        let id = NodeId::from_index(self.nodes.len() - 1);
        trace!(%id, "dsp node created");
        id
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
            DspNode::Gain { gain: g } => {
                *g = gain;
                Ok(())
            }
            _ => Err(AudioError::GraphIntegrity(format!(
                "{node} is not a gain node"
            ))),
        }
    }

    /// Recompute coefficients at the new parameters, keeping filter state
    /// so live changes do not click
    fn update_filter(&mut self, node: NodeId, params: FilterParams) -> Result<()> {
        self.check_node(node)?;
        let sample_rate = self.sample_rate as f32;
        match &mut self.nodes[node.index()] {
            DspNode::Filter { kind, left, right } => {
                let coeffs = BiquadCoeffs::for_kind(*kind, sample_rate, params);
                left.set_coeffs(coeffs);
                right.set_coeffs(coeffs);
                Ok(())
            }
            _ => Err(AudioError::GraphIntegrity(format!(
                "{node} is not a filter node"
            ))),
        }
    }
}
