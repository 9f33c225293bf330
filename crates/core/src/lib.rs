//! Busker core: domain logic for the live-capture equalizer
//!
//! This crate is platform-agnostic: everything that touches a real audio
//! backend lives in `busker-infra`. The core owns the filter chain state
//! machine, the session lifecycle, presets, the recorder, and the media
//! command interface.

pub mod domain;

pub use domain::*;
