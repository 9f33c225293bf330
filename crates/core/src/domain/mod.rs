//! Domain entities and business rules

pub mod audio;
pub mod chain;
pub mod filter;
pub mod graph;
pub mod media;
pub mod preset;
pub mod recorder;
pub mod session;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{AudioError, CaptureSource, DeviceId, DeviceInfo, SampleRate};
pub use chain::{ChainManager, MonoStage};
pub use filter::{
    bandwidth_to_q, BiquadCoeffs, BiquadFilter, FilterBank, FilterHandle, FilterKind, FilterParams,
};
pub use graph::{AudioGraph, EdgeList, EdgeListGraph, NodeId, NodeSpec};
pub use media::{
    ActionStatus, CommandReply, MediaCommand, MediaController, MediaDeck, MediaStatus,
    MediaTransport, COMMAND_TIMEOUT, DEFAULT_SKIP_SECONDS,
};
pub use preset::{
    default_preset_dir, EqPreset, FilterSpec, MainOut, PresetError, PresetManager, PresetWatcher,
};
pub use recorder::{EncodedWav, Recorder, RecorderShared, RecorderState};
pub use session::Session;
