//! Cross-crate integration tests for Busker
//!
//! These exercise the whole stack: sessions over the pure topology graph
//! for invariant checks, and over the real DSP graph for audible behavior.

#[cfg(test)]
mod chain_integration;
#[cfg(test)]
mod media_integration;
#[cfg(test)]
mod session_integration;
