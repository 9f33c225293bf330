//! Busker infrastructure: platform audio backend
//!
//! Everything that talks to the host audio system lives here: cpal-based
//! capture, the real DSP processing graph, and the engine that drives
//! blocks from capture through the session's filter chain to playback.

pub mod audio;

pub use audio::*;
