//! Capture session lifecycle
//!
//! A [`Session`] owns everything that exists for the duration of one
//! capture: the source and sink anchors, the filter pool, the active
//! chain, the mono stage, volume/mute state, and the recorder. All graph
//! mutations go through the session's single graph lock, serializing
//! topology edits even under reentrant callers.

use crate::domain::audio::SampleRate;
use crate::domain::chain::{ChainManager, MonoStage};
use crate::domain::filter::{FilterBank, FilterKind};
use crate::domain::graph::{AudioGraph, NodeId, NodeSpec};
use crate::domain::preset::EqPreset;
use crate::domain::recorder::{EncodedWav, Recorder, RecorderShared};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// One live capture session
pub struct Session<G: AudioGraph> {
    graph: Arc<Mutex<G>>,
    source: NodeId,
    /// Master gain stage; the chain's resting sink anchor
    sink: NodeId,
    preset: EqPreset,
    bank: FilterBank,
    chain: ChainManager,
    mono: MonoStage,
    recorder: Recorder,
    muted: bool,
    /// Volume remembered across mute so unmuting restores it exactly
    remembered_volume: f32,
    sample_rate: SampleRate,
}

impl<G: AudioGraph> Session<G> {
    /// Build the graph for `preset` and wire the initial path.
    ///
    /// Creates the fixed source and sink, one filter unit per preset kind,
    /// the mono scaffolding, and the recorder tap, then activates every
    /// filter the preset marks enabled, in preset declaration order.
    pub fn start(
        graph: Arc<Mutex<G>>,
        preset: EqPreset,
        sample_rate: SampleRate,
    ) -> crate::domain::audio::Result<Self> {
        let (source, sink, bank, chain, mono, recorder) = {
            let mut g = graph.lock().unwrap_or_else(PoisonError::into_inner);
            let source = g.add_node(NodeSpec::Source);
            let sink = g.add_node(NodeSpec::Gain {
                gain: preset.main_out.gain,
            });
            let chain = ChainManager::new(&mut *g, source, sink)?;
            let bank = FilterBank::build(&mut *g, &preset);
            let mono = MonoStage::new(&mut *g, sink);
            let recorder = Recorder::new(&mut *g, sink, sample_rate);
            (source, sink, bank, chain, mono, recorder)
        };

        let mut session = Self {
            graph,
            source,
            sink,
            preset: preset.clone(),
            bank,
            chain,
            mono,
            recorder,
            muted: preset.main_out.muted,
            remembered_volume: preset.main_out.gain,
            sample_rate,
        };

        session.apply_gain();
        for filter in &preset.filters {
            if filter.enabled {
                session.set_filter_enabled(filter.kind, true);
            }
        }

        info!(rate = sample_rate.hz(), "capture session started");
        Ok(session)
    }

    // Borrows only the graph field so chain/bank/mono can be mutated
    // while the guard is held. Poisoning only means a peer panicked
    // mid-block; the topology bookkeeping lives on this side.
    fn lock(graph: &Mutex<G>) -> MutexGuard<'_, G> {
        graph.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn sink(&self) -> NodeId {
        self.sink
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    pub fn preset(&self) -> &EqPreset {
        &self.preset
    }

    // -------------------------------------------------------------------------
    // Chain membership
    // -------------------------------------------------------------------------

    /// Toggle one filter in or out of the live chain. Returns whether the
    /// chain changed. A failed mutation is logged and reported as `false`;
    /// the chain keeps its last-known-good membership.
    pub fn set_filter_enabled(&mut self, kind: FilterKind, enabled: bool) -> bool {
        let Some(node) = self.bank.node(kind) else {
            debug!(%kind, "toggle ignored: no such filter unit");
            return false;
        };

        let mut g = Self::lock(&self.graph);
        let changed = if enabled {
            // Re-seed stored preset parameters when a filter comes back in
            if let Some(spec) = self.preset.filter(kind) {
                if let Err(e) = self.bank.reseed(&mut *g, kind, spec) {
                    warn!(%kind, error = %e, "parameter reseed failed");
                }
            }
            self.chain.activate(&mut *g, kind, node)
        } else {
            self.chain.deactivate(&mut *g, kind)
        };
        drop(g);

        match changed {
            Ok(changed) => {
                if changed {
                    if let Some(spec) = self.preset.filter_mut(kind) {
                        spec.enabled = enabled;
                    }
                }
                changed
            }
            Err(_) => false,
        }
    }

    pub fn is_filter_active(&self, kind: FilterKind) -> bool {
        self.chain.is_active(kind)
    }

    pub fn active_kinds(&self) -> Vec<FilterKind> {
        self.chain.active_kinds()
    }

    /// Deactivate everything and restore the direct source -> sink path
    pub fn reset(&mut self) {
        let mut g = Self::lock(&self.graph);
        if let Err(e) = self.chain.clear(&mut *g) {
            warn!(error = %e, "reset left stale edges behind");
        }
        drop(g);
        for filter in &mut self.preset.filters {
            filter.enabled = false;
        }
        debug!("chain reset to direct path");
    }

    // -------------------------------------------------------------------------
    // Parameters
    // -------------------------------------------------------------------------

    /// Live parameter update for one filter unit. `frequency` always sets
    /// the corner/center; `secondary` is bandwidth (bandpass), resonance
    /// (lowpass/highpass), or gain dB (shelf/peaking). Never changes chain
    /// membership; silently ignored for kinds without a unit.
    pub fn set_parameter(&mut self, kind: FilterKind, frequency: f32, secondary: Option<f32>) -> bool {
        let mut g = Self::lock(&self.graph);
        self.bank.set_parameter(&mut *g, kind, frequency, secondary)
    }

    pub fn filter_params(&self, kind: FilterKind) -> Option<crate::domain::filter::FilterParams> {
        self.bank.params(kind)
    }

    // -------------------------------------------------------------------------
    // Volume / mute
    // -------------------------------------------------------------------------

    /// Set the master volume. Always remembered; only applied to the sink
    /// gain while unmuted.
    pub fn set_volume(&mut self, volume: f32) {
        self.remembered_volume = volume;
        self.apply_gain();
    }

    /// Mute or unmute. Muting remembers `volume` and zeroes the sink gain;
    /// unmuting restores exactly the remembered volume.
    pub fn set_mute(&mut self, muted: bool, volume: f32) {
        if muted {
            self.remembered_volume = volume;
        }
        self.muted = muted;
        self.apply_gain();
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn volume(&self) -> f32 {
        self.remembered_volume
    }

    fn apply_gain(&mut self) {
        let gain = if self.muted {
            0.0
        } else {
            self.remembered_volume
        };
        let mut g = Self::lock(&self.graph);
        if let Err(e) = g.set_gain(self.sink, gain) {
            warn!(error = %e, "sink gain update failed");
        }
    }

    // -------------------------------------------------------------------------
    // Mono downmix
    // -------------------------------------------------------------------------

    /// Toggle the mono downmix stage at the tail of the chain, then
    /// reapply `current_volume` to the sink (the rewiring knows nothing of
    /// volume or mute). Returns the resulting mono state.
    pub fn set_mono(&mut self, enabled: bool, current_volume: f32) -> bool {
        {
            let mut g = Self::lock(&self.graph);
            let result = if enabled {
                self.mono.enable(&mut *g, &mut self.chain)
            } else {
                self.mono.disable(&mut *g, &mut self.chain)
            };
            if let Err(e) = result {
                warn!(enabled, error = %e, "mono toggle aborted");
            }
        }
        self.remembered_volume = current_volume;
        self.apply_gain();
        self.mono.is_enabled()
    }

    pub fn mono_enabled(&self) -> bool {
        self.mono.is_enabled()
    }

    // -------------------------------------------------------------------------
    // Recording
    // -------------------------------------------------------------------------

    /// Begin recording at the sink. Returns whether recording is running.
    pub fn start_recording(&mut self) -> bool {
        let mut g = Self::lock(&self.graph);
        match self.recorder.start(&mut *g) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "recording start failed");
                false
            }
        }
    }

    /// Stop recording and encode the take. Returns the encoded WAV, which
    /// is also retained for a later [`save_recording`](Self::save_recording).
    pub fn stop_recording(&mut self) -> Option<EncodedWav> {
        let mut g = Self::lock(&self.graph);
        self.recorder.stop(&mut *g).cloned()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn encoded_recording(&self) -> Option<&EncodedWav> {
        self.recorder.encoded()
    }

    /// Write the last take into `dir`. No-op when nothing was encoded.
    pub fn save_recording(&self, dir: &Path) -> Option<PathBuf> {
        self.recorder.save_to(dir)
    }

    /// Handle for the audio callback to append recorded blocks
    pub fn recorder_shared(&self) -> Arc<RecorderShared> {
        self.recorder.shared()
    }

    // -------------------------------------------------------------------------
    // Teardown
    // -------------------------------------------------------------------------

    /// Disconnect every owned node and end the session
    pub fn close(mut self) {
        {
            let mut g = Self::lock(&self.graph);
            self.recorder.cleanup(&mut *g);
        }
        if self.mono.is_enabled() {
            self.set_mono(false, self.remembered_volume);
        }
        let mut g = self.graph.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.chain.clear(&mut *g) {
            warn!(error = %e, "chain teardown left stale edges");
        }
        if let Err(e) = g.disconnect(self.source, self.sink) {
            warn!(error = %e, "source detach failed on close");
        }
        info!("capture session closed");
    }
}
