//! Audio domain primitives and the error taxonomy
//!
//! Everything here is platform-agnostic. The capture backend that produces
//! real audio lives in the `infra` crate and implements [`CaptureSource`].

use crate::domain::graph::NodeId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in the audio subsystem
#[derive(Debug, Error)]
pub enum AudioError {
    /// The host denied or failed to provide an audio stream.
    /// Fatal for session start; surfaced to callers as `None`.
    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// A connect/disconnect precondition did not hold on the live graph.
    /// Recovered locally: the offending mutation is aborted and logged.
    #[error("Graph integrity violation: {0}")]
    GraphIntegrity(String),

    /// A remote media command went unanswered within the deadline.
    #[error("Command timed out after {0} ms")]
    CommandTimeout(u64),

    /// A node id that the graph has never handed out
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Error in audio stream creation or processing
    #[error("Stream error: {0}")]
    StreamError(String),

    /// Input/Output error at the OS level
    #[error("OS error: {0}")]
    OsError(String),

    /// WAV container serialization failed
    #[error("Encoding error: {0}")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Unique identifier for a capture device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Audio sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleRate {
    Hz44100,
    Hz48000,
    Hz96000,
    Hz192000,
    Custom(u32),
}

impl SampleRate {
    pub fn hz(&self) -> u32 {
        match self {
            SampleRate::Hz44100 => 44100,
            SampleRate::Hz48000 => 48000,
            SampleRate::Hz96000 => 96000,
            SampleRate::Hz192000 => 192000,
            SampleRate::Custom(hz) => *hz,
        }
    }

    pub fn from_hz(hz: u32) -> Self {
        match hz {
            44100 => SampleRate::Hz44100,
            48000 => SampleRate::Hz48000,
            96000 => SampleRate::Hz96000,
            192000 => SampleRate::Hz192000,
            hz => SampleRate::Custom(hz),
        }
    }
}

/// Information about a capture device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: String,
    pub default_sample_rate: Option<SampleRate>,
}

/// Trait for enumerating devices that can feed a capture session
///
/// The infra crate implements this on top of the platform backend. Failure
/// to reach the host audio system surfaces as [`AudioError::CaptureUnavailable`].
pub trait CaptureSource: Send + Sync {
    /// List all devices usable as a capture input
    fn devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Get the default capture device
    fn default_device(&self) -> Result<DeviceInfo>;
}
