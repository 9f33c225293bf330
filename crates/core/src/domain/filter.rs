//! Filter kinds, parameter policy, and biquad IIR math
//!
//! A capture session owns exactly one filter unit per kind. The unit's
//! parameters live here as [`FilterParams`]; the DSP state (one Direct
//! Form I biquad per channel) lives wherever the graph implementation puts
//! it. Coefficients follow the RBJ Audio-EQ-Cookbook formulas.

use crate::domain::audio::Result;
use crate::domain::graph::{AudioGraph, NodeId, NodeSpec};
use crate::domain::preset::{EqPreset, FilterSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Q floor for kinds where Q divides the transfer function
pub const MIN_Q: f32 = 0.1;

/// The six fixed filter kinds
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Highpass,
    Bandpass,
    Lowpass,
    Lowshelf,
    Highshelf,
    Peaking,
}

impl FilterKind {
    /// All kinds in preset declaration order
    pub const ALL: [FilterKind; 6] = [
        FilterKind::Highpass,
        FilterKind::Bandpass,
        FilterKind::Lowpass,
        FilterKind::Lowshelf,
        FilterKind::Highshelf,
        FilterKind::Peaking,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterKind::Highpass => "highpass",
            FilterKind::Bandpass => "bandpass",
            FilterKind::Lowpass => "lowpass",
            FilterKind::Lowshelf => "lowshelf",
            FilterKind::Highshelf => "highshelf",
            FilterKind::Peaking => "peaking",
        }
    }

    /// Only shelf and peaking kinds have a meaningful gain parameter
    pub fn supports_gain(self) -> bool {
        matches!(
            self,
            FilterKind::Lowshelf | FilterKind::Highshelf | FilterKind::Peaking
        )
    }
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a bandwidth control value (0-100) to Q (about 10.1 down to 0.1).
/// Higher bandwidth = lower Q, lower bandwidth = higher Q.
pub fn bandwidth_to_q(bandwidth: f32) -> f32 {
    10.1 - bandwidth / 10.0
}

/// Runtime parameters of one filter unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    pub frequency: f32,
    pub q: f32,
    pub gain_db: f32,
}

impl FilterParams {
    /// Seed parameters from a preset spec, applying the per-kind Q policy:
    /// bandpass keeps Q strictly positive, peaking defaults to 2.0,
    /// lowpass/highpass default to the Butterworth 0.707, everything else
    /// defaults to 1.0. Gain is honored only for shelf/peaking kinds.
    pub fn from_spec(kind: FilterKind, spec: &FilterSpec) -> Self {
        let q = match kind {
            FilterKind::Bandpass => spec.q.unwrap_or(1.0).max(MIN_Q),
            FilterKind::Peaking => spec.q.unwrap_or(2.0),
            FilterKind::Lowpass | FilterKind::Highpass => spec.q.unwrap_or(0.707),
            _ => spec.q.unwrap_or(1.0),
        };
        let gain_db = if kind.supports_gain() {
            spec.gain_db.unwrap_or(0.0)
        } else {
            0.0
        };
        Self {
            frequency: spec.frequency,
            q,
            gain_db,
        }
    }

    /// Apply a live secondary parameter. Interpretation is kind-dependent:
    /// bandwidth for bandpass, resonance for lowpass/highpass, gain in dB
    /// for shelf/peaking kinds.
    pub fn apply_secondary(&mut self, kind: FilterKind, secondary: f32) {
        match kind {
            FilterKind::Bandpass => self.q = bandwidth_to_q(secondary).max(MIN_Q),
            FilterKind::Lowpass | FilterKind::Highpass => self.q = secondary.max(MIN_Q),
            FilterKind::Peaking | FilterKind::Lowshelf | FilterKind::Highshelf => {
                self.gain_db = secondary
            }
        }
    }
}

// ============================================================================
// BIQUAD FILTER (Low-level IIR filter)
// ============================================================================

/// Biquad filter coefficients
///
/// Direct Form I implementation for numerical stability.
/// Coefficients are pre-computed to avoid per-sample calculations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoeffs {
    /// Numerator coefficients
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    /// Denominator coefficients (a0 is normalized to 1.0)
    pub a1: f32,
    pub a2: f32,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        // Unity gain (no filtering)
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

/// Intermediate cookbook terms shared by every kind
struct CookbookTerms {
    cos_w0: f32,
    alpha: f32,
}

fn terms(sample_rate: f32, freq: f32, q: f32) -> CookbookTerms {
    // Keep the corner below Nyquist; coefficients blow up past it
    let freq = freq.clamp(10.0, sample_rate * 0.45);
    let w0 = 2.0 * std::f32::consts::PI * freq / sample_rate;
    CookbookTerms {
        cos_w0: w0.cos(),
        alpha: w0.sin() / (2.0 * q.max(MIN_Q)),
    }
}

impl BiquadCoeffs {
    /// Coefficients for `kind` at the given sample rate and parameters
    #[must_use]
    pub fn for_kind(kind: FilterKind, sample_rate: f32, params: FilterParams) -> Self {
        match kind {
            FilterKind::Highpass => Self::highpass(sample_rate, params.frequency, params.q),
            FilterKind::Bandpass => Self::bandpass(sample_rate, params.frequency, params.q),
            FilterKind::Lowpass => Self::lowpass(sample_rate, params.frequency, params.q),
            FilterKind::Lowshelf => {
                Self::low_shelf(sample_rate, params.frequency, params.gain_db, params.q)
            }
            FilterKind::Highshelf => {
                Self::high_shelf(sample_rate, params.frequency, params.gain_db, params.q)
            }
            FilterKind::Peaking => {
                Self::peaking(sample_rate, params.frequency, params.gain_db, params.q)
            }
        }
    }

    /// Calculate coefficients for a low-pass filter
    #[must_use]
    pub fn lowpass(sample_rate: f32, freq: f32, q: f32) -> Self {
        let CookbookTerms { cos_w0, alpha } = terms(sample_rate, freq, q);

        let b1 = 1.0 - cos_w0;
        let b0 = b1 / 2.0;
        let b2 = b0;

        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Calculate coefficients for a high-pass filter
    #[must_use]
    pub fn highpass(sample_rate: f32, freq: f32, q: f32) -> Self {
        let CookbookTerms { cos_w0, alpha } = terms(sample_rate, freq, q);

        let b0 = (1.0 + cos_w0) / 2.0;
        let b1 = -(1.0 + cos_w0);
        let b2 = b0;

        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Calculate coefficients for a band-pass filter (0 dB peak gain)
    #[must_use]
    pub fn bandpass(sample_rate: f32, freq: f32, q: f32) -> Self {
        let CookbookTerms { cos_w0, alpha } = terms(sample_rate, freq, q);

        let b0 = alpha;
        let b1 = 0.0;
        let b2 = -alpha;

        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Calculate coefficients for a low shelf filter
    ///
    /// Boosts or cuts frequencies below the corner frequency.
    /// Gain is clamped to +/- 12 dB.
    #[must_use]
    pub fn low_shelf(sample_rate: f32, freq: f32, gain_db: f32, q: f32) -> Self {
        let gain_db = gain_db.clamp(-12.0, 12.0);
        let a = 10.0_f32.powf(gain_db / 40.0);
        let CookbookTerms { cos_w0, alpha } = terms(sample_rate, freq, q);

        let b0 = a * ((a + 1.0) - (a - 1.0) * cos_w0 + 2.0 * a.sqrt() * alpha);
        let b1 = 2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0);
        let b2 = a * ((a + 1.0) - (a - 1.0) * cos_w0 - 2.0 * a.sqrt() * alpha);

        let a0 = (a + 1.0) + (a - 1.0) * cos_w0 + 2.0 * a.sqrt() * alpha;
        let a1 = -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0);
        let a2 = (a + 1.0) + (a - 1.0) * cos_w0 - 2.0 * a.sqrt() * alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Calculate coefficients for a high shelf filter
    ///
    /// Boosts or cuts frequencies above the corner frequency.
    #[must_use]
    pub fn high_shelf(sample_rate: f32, freq: f32, gain_db: f32, q: f32) -> Self {
        let gain_db = gain_db.clamp(-12.0, 12.0);
        let a = 10.0_f32.powf(gain_db / 40.0);
        let CookbookTerms { cos_w0, alpha } = terms(sample_rate, freq, q);

        let b0 = a * ((a + 1.0) + (a - 1.0) * cos_w0 + 2.0 * a.sqrt() * alpha);
        let b1 = -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0);
        let b2 = a * ((a + 1.0) + (a - 1.0) * cos_w0 - 2.0 * a.sqrt() * alpha);

        let a0 = (a + 1.0) - (a - 1.0) * cos_w0 + 2.0 * a.sqrt() * alpha;
        let a1 = 2.0 * ((a - 1.0) - (a + 1.0) * cos_w0);
        let a2 = (a + 1.0) - (a - 1.0) * cos_w0 - 2.0 * a.sqrt() * alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Calculate coefficients for a peaking EQ filter
    ///
    /// Boosts or cuts frequencies around a center frequency.
    #[must_use]
    pub fn peaking(sample_rate: f32, freq: f32, gain_db: f32, q: f32) -> Self {
        let gain_db = gain_db.clamp(-12.0, 12.0);
        let a = 10.0_f32.powf(gain_db / 40.0);
        let CookbookTerms { cos_w0, alpha } = terms(sample_rate, freq, q);

        let b0 = 1.0 + alpha * a;
        let b1 = -2.0 * cos_w0;
        let b2 = 1.0 - alpha * a;

        let a0 = 1.0 + alpha / a;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha / a;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Stateful biquad filter using Direct Form I
///
/// Direct Form I is chosen over Transposed Direct Form II for:
/// - Better numerical stability with low-frequency filters
/// - Easier coefficient updates without artifacts
#[derive(Debug, Clone, PartialEq)]
pub struct BiquadFilter {
    coeffs: BiquadCoeffs,
    // Previous input samples (x[n-1], x[n-2])
    x1: f32,
    x2: f32,
    // Previous output samples (y[n-1], y[n-2])
    y1: f32,
    y2: f32,
}

impl BiquadFilter {
    /// Create a new biquad filter with given coefficients
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Create a bypass filter (unity gain)
    pub fn bypass() -> Self {
        Self::new(BiquadCoeffs::default())
    }

    /// Update filter coefficients, keeping state so live parameter changes
    /// do not click
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    /// Process a single sample
    #[inline]
    pub fn process_sample(&mut self, x: f32) -> f32 {
        // Direct Form I: y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
        //                        - a1*y[n-1] - a2*y[n-2]
        let y = self.coeffs.b0 * x
            + self.coeffs.b1 * self.x1
            + self.coeffs.b2 * self.x2
            - self.coeffs.a1 * self.y1
            - self.coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;

        y
    }

    /// Process a buffer of samples
    pub fn process(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

// ============================================================================
// FILTER POOL
// ============================================================================

/// One runtime filter unit: its graph node plus current parameters
#[derive(Debug, Clone, Copy)]
pub struct FilterHandle {
    pub kind: FilterKind,
    pub node: NodeId,
    pub params: FilterParams,
}

/// The pool of filter units built from a preset
///
/// Exactly one unit exists per kind for the lifetime of a capture session.
/// The pool never touches chain membership; it only owns parameters.
#[derive(Debug, Clone, Default)]
pub struct FilterBank {
    handles: BTreeMap<FilterKind, FilterHandle>,
}

impl FilterBank {
    /// Construct one filter node per kind in the preset, seeded with the
    /// preset's parameters under the per-kind Q/gain policy.
    pub fn build(graph: &mut dyn AudioGraph, preset: &EqPreset) -> Self {
        let mut handles = BTreeMap::new();
        for kind in FilterKind::ALL {
            let Some(spec) = preset.filter(kind) else {
                continue;
            };
            let params = FilterParams::from_spec(kind, spec);
            let node = graph.add_node(NodeSpec::Filter { kind, params });
            debug!(%kind, %node, ?params, "filter unit created");
            handles.insert(kind, FilterHandle { kind, node, params });
        }
        Self { handles }
    }

    pub fn handle(&self, kind: FilterKind) -> Option<&FilterHandle> {
        self.handles.get(&kind)
    }

    pub fn node(&self, kind: FilterKind) -> Option<NodeId> {
        self.handles.get(&kind).map(|h| h.node)
    }

    pub fn params(&self, kind: FilterKind) -> Option<FilterParams> {
        self.handles.get(&kind).map(|h| h.params)
    }

    pub fn kinds(&self) -> impl Iterator<Item = FilterKind> + '_ {
        self.handles.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Apply a live parameter change to one unit. `frequency` always sets
    /// the corner/center frequency; `secondary` is interpreted per kind.
    /// Silently ignored (returns false) when no unit exists for `kind`.
    pub fn set_parameter(
        &mut self,
        graph: &mut dyn AudioGraph,
        kind: FilterKind,
        frequency: f32,
        secondary: Option<f32>,
    ) -> bool {
        let Some(handle) = self.handles.get_mut(&kind) else {
            debug!(%kind, "parameter update ignored: no such filter unit");
            return false;
        };
        handle.params.frequency = frequency;
        if let Some(secondary) = secondary {
            handle.params.apply_secondary(kind, secondary);
        }
        if let Err(e) = graph.update_filter(handle.node, handle.params) {
            warn!(%kind, error = %e, "filter parameter update failed");
            return false;
        }
        true
    }

    /// Reseed a unit's parameters from a preset spec (used when a filter is
    /// re-enabled with stored settings)
    pub fn reseed(
        &mut self,
        graph: &mut dyn AudioGraph,
        kind: FilterKind,
        spec: &FilterSpec,
    ) -> Result<()> {
        if let Some(handle) = self.handles.get_mut(&kind) {
            handle.params = FilterParams::from_spec(kind, spec);
            graph.update_filter(handle.node, handle.params)?;
        }
        Ok(())
    }
}
