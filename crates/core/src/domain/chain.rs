//! Live filter chain surgery
//!
//! [`ChainManager`] owns the ordered list of currently-active filter units
//! and splices them into or out of the signal path between a fixed source
//! and a fixed sink while audio may be flowing. Between any two mutations
//! the graph holds exactly one unbroken path
//! `source -> chain[0] -> ... -> chain[last] -> sink` (or `source -> sink`
//! when the chain is empty).
//!
//! Mutations are best-effort: if a connect/disconnect primitive fails the
//! mutation is aborted and the chain list is left unchanged, but edge edits
//! already applied are not rolled back. The underlying primitives have no
//! transaction support, so a snapshot/restore here would only pretend to
//! be one.

use crate::domain::audio::Result;
use crate::domain::filter::FilterKind;
use crate::domain::graph::{AudioGraph, NodeId, NodeSpec};
use tracing::{debug, trace, warn};

/// Position of a unit being removed from the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    /// The only element: restore the direct source -> sink path
    Only,
    /// First of several: the source adopts the second element
    Head,
    /// Last of several: the predecessor adopts the sink
    Tail,
    /// Somewhere inside: predecessor adopts successor
    Middle,
}

impl Removal {
    fn classify(index: usize, len: usize) -> Self {
        match (index, len) {
            (_, 1) => Removal::Only,
            (0, _) => Removal::Head,
            (i, n) if i == n - 1 => Removal::Tail,
            _ => Removal::Middle,
        }
    }
}

/// Ordered chain of active filter units between fixed anchors
#[derive(Debug)]
pub struct ChainManager {
    source: NodeId,
    /// Effective downstream anchor. Normally the master gain; retargeted to
    /// the downmix input while mono is active.
    sink: NodeId,
    /// Insertion order = activation order, not kind order
    active: Vec<(FilterKind, NodeId)>,
}

impl ChainManager {
    /// Create the manager and wire the initial direct `source -> sink` path
    pub fn new(graph: &mut dyn AudioGraph, source: NodeId, sink: NodeId) -> Result<Self> {
        graph.connect(source, sink)?;
        Ok(Self {
            source,
            sink,
            active: Vec::new(),
        })
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn sink(&self) -> NodeId {
        self.sink
    }

    /// The node currently feeding the sink: the last active unit, or the
    /// source when the chain is empty
    pub fn tail(&self) -> NodeId {
        self.active.last().map_or(self.source, |&(_, node)| node)
    }

    pub fn is_active(&self, kind: FilterKind) -> bool {
        self.active.iter().any(|&(k, _)| k == kind)
    }

    pub fn active_kinds(&self) -> Vec<FilterKind> {
        self.active.iter().map(|&(k, _)| k).collect()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Splice `node` in as the new tail.
    ///
    /// Returns `Ok(false)` without touching the graph when `kind` is
    /// already active.
    pub fn activate(
        &mut self,
        graph: &mut dyn AudioGraph,
        kind: FilterKind,
        node: NodeId,
    ) -> Result<bool> {
        if self.is_active(kind) {
            debug!(%kind, "activate ignored: already in chain");
            return Ok(false);
        }

        let tail = self.tail();
        let spliced = graph
            .disconnect(tail, self.sink)
            .and_then(|()| graph.connect(tail, node))
            .and_then(|()| graph.connect(node, self.sink));

        match spliced {
            Ok(()) => {
                self.active.push((kind, node));
                trace!(%kind, %node, len = self.active.len(), "filter activated");
                Ok(true)
            }
            Err(e) => {
                warn!(%kind, error = %e, "activate aborted, chain unchanged");
                Err(e)
            }
        }
    }

    /// Splice the unit for `kind` out of the chain.
    ///
    /// Returns `Ok(false)` without touching the graph when `kind` is not
    /// active. Every disconnect on the removed unit happens before the
    /// bypass edge is made, so the unit never stays wired into the live
    /// path.
    pub fn deactivate(&mut self, graph: &mut dyn AudioGraph, kind: FilterKind) -> Result<bool> {
        let Some(index) = self.active.iter().position(|&(k, _)| k == kind) else {
            debug!(%kind, "deactivate ignored: not in chain");
            return Ok(false);
        };
        let node = self.active[index].1;

        let spliced = match Removal::classify(index, self.active.len()) {
            Removal::Only => graph
                .disconnect(node, self.sink)
                .and_then(|()| graph.disconnect(self.source, node))
                .and_then(|()| graph.connect(self.source, self.sink)),
            Removal::Head => {
                let next = self.active[1].1;
                graph
                    .disconnect(node, next)
                    .and_then(|()| graph.disconnect(self.source, node))
                    .and_then(|()| graph.connect(self.source, next))
            }
            Removal::Tail => {
                let prev = self.active[index - 1].1;
                graph
                    .disconnect(prev, node)
                    .and_then(|()| graph.disconnect(node, self.sink))
                    .and_then(|()| graph.connect(prev, self.sink))
            }
            Removal::Middle => {
                let prev = self.active[index - 1].1;
                let next = self.active[index + 1].1;
                graph
                    .disconnect(prev, node)
                    .and_then(|()| graph.disconnect(node, next))
                    .and_then(|()| graph.connect(prev, next))
            }
        };

        match spliced {
            Ok(()) => {
                self.active.remove(index);
                trace!(%kind, %node, len = self.active.len(), "filter deactivated");
                Ok(true)
            }
            Err(e) => {
                warn!(%kind, error = %e, "deactivate aborted, chain unchanged");
                Err(e)
            }
        }
    }

    /// Move the downstream anchor: the tail is rewired from the current
    /// sink to `new_sink`. Used by the mono stage to splice itself in and
    /// out at the end of the chain.
    pub fn retarget_sink(&mut self, graph: &mut dyn AudioGraph, new_sink: NodeId) -> Result<()> {
        if new_sink == self.sink {
            return Ok(());
        }
        let tail = self.tail();
        graph
            .disconnect(tail, self.sink)
            .and_then(|()| graph.connect(tail, new_sink))?;
        trace!(old = %self.sink, new = %new_sink, "sink anchor retargeted");
        self.sink = new_sink;
        Ok(())
    }

    /// Deactivate everything: disconnect every chain edge and restore the
    /// direct source -> sink path
    pub fn clear(&mut self, graph: &mut dyn AudioGraph) -> Result<()> {
        while let Some(&(kind, _)) = self.active.last() {
            self.deactivate(graph, kind)?;
        }
        Ok(())
    }
}

/// Mono downmix scaffolding spliced between the chain tail and the sink
///
/// On enable the tail fans into a 2-channel split, the merge stage sums
/// both channels into both outputs, and a 0.5x compensation gain prevents
/// the +3 dB bump from summing two full-amplitude channels.
#[derive(Debug)]
pub struct MonoStage {
    splitter: NodeId,
    merger: NodeId,
    compensation: NodeId,
    /// The real sink (master gain) the scaffolding feeds into
    sink: NodeId,
    enabled: bool,
}

impl MonoStage {
    /// Construct the scaffolding nodes, unwired
    pub fn new(graph: &mut dyn AudioGraph, sink: NodeId) -> Self {
        Self {
            splitter: graph.add_node(NodeSpec::Splitter),
            merger: graph.add_node(NodeSpec::Merger),
            compensation: graph.add_node(NodeSpec::Gain { gain: 0.5 }),
            sink,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Node the chain should treat as its sink while mono is active
    pub fn input(&self) -> NodeId {
        self.splitter
    }

    /// Splice the downmix in at the tail. No-op when already enabled.
    pub fn enable(&mut self, graph: &mut dyn AudioGraph, chain: &mut ChainManager) -> Result<()> {
        if self.enabled {
            return Ok(());
        }
        chain.retarget_sink(graph, self.splitter)?;
        graph
            .connect(self.splitter, self.merger)
            .and_then(|()| graph.connect(self.merger, self.compensation))
            .and_then(|()| graph.connect(self.compensation, self.sink))?;
        self.enabled = true;
        debug!("mono downmix enabled");
        Ok(())
    }

    /// Tear the scaffolding down and reconnect the tail to the sink.
    /// No-op when already disabled.
    pub fn disable(&mut self, graph: &mut dyn AudioGraph, chain: &mut ChainManager) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        graph
            .disconnect(self.compensation, self.sink)
            .and_then(|()| graph.disconnect(self.merger, self.compensation))
            .and_then(|()| graph.disconnect(self.splitter, self.merger))?;
        chain.retarget_sink(graph, self.sink)?;
        self.enabled = false;
        debug!("mono downmix disabled");
        Ok(())
    }
}
