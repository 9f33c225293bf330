//! WAV recorder tapping the session sink
//!
//! The recorder owns a tap node wired from the sink gain while recording.
//! The audio callback appends interleaved blocks through [`RecorderShared`];
//! that path only reads the recording flag and pushes samples, never
//! touching graph topology. Stopping disconnects the tap and synchronously
//! encodes the accumulated channels into a 16-bit PCM stereo WAV container.

use crate::domain::audio::{AudioError, Result, SampleRate};
use crate::domain::graph::{AudioGraph, NodeId, NodeSpec};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// Recorder lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
}

#[derive(Debug, Default)]
struct ChannelBuffers {
    left: Vec<f32>,
    right: Vec<f32>,
}

/// State shared with the audio callback
///
/// The callback side calls [`append_interleaved`](Self::append_interleaved)
/// on every block; everything else happens on the control side.
#[derive(Debug, Default)]
pub struct RecorderShared {
    recording: AtomicBool,
    buffers: Mutex<ChannelBuffers>,
}

impl RecorderShared {
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Relaxed)
    }

    /// Append one interleaved stereo block. Ignored unless recording.
    pub fn append_interleaved(&self, block: &[f32]) {
        if !self.is_recording() {
            return;
        }
        let mut buffers = self.lock_buffers();
        for frame in block.chunks_exact(2) {
            buffers.left.push(frame[0]);
            buffers.right.push(frame[1]);
        }
    }

    /// Buffered frames so far
    pub fn frames(&self) -> usize {
        self.lock_buffers().left.len()
    }

    fn take(&self) -> (Vec<f32>, Vec<f32>) {
        let mut buffers = self.lock_buffers();
        (
            std::mem::take(&mut buffers.left),
            std::mem::take(&mut buffers.right),
        )
    }

    fn clear(&self) {
        let mut buffers = self.lock_buffers();
        buffers.left.clear();
        buffers.right.clear();
    }

    fn lock_buffers(&self) -> std::sync::MutexGuard<'_, ChannelBuffers> {
        // A poisoned lock still holds valid sample data
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An encoded recording ready to be written out
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedWav {
    pub bytes: Vec<u8>,
    pub sample_rate: u32,
    pub frames: usize,
}

impl EncodedWav {
    pub fn duration_secs(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    /// Decode back into per-channel f32 samples (normalized by i16::MAX)
    pub fn decode(&self) -> Result<(Vec<f32>, Vec<f32>)> {
        let reader = hound::WavReader::new(Cursor::new(&self.bytes[..]))
            .map_err(|e| AudioError::Encoding(e.to_string()))?;
        let mut left = Vec::new();
        let mut right = Vec::new();
        for (i, sample) in reader.into_samples::<i16>().enumerate() {
            let sample = sample.map_err(|e| AudioError::Encoding(e.to_string()))?;
            let value = sample as f32 / i16::MAX as f32;
            if i % 2 == 0 {
                left.push(value);
            } else {
                right.push(value);
            }
        }
        Ok((left, right))
    }
}

/// Clamp to [-1, 1] and scale to the signed 16-bit range
#[inline]
fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Encode stereo channels as a standard RIFF/WAVE 16-bit PCM container.
/// Zero frames produce a valid header-only file.
fn encode_wav(left: &[f32], right: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)
        .map_err(|e| AudioError::Encoding(e.to_string()))?;

    let frames = left.len().min(right.len());
    for i in 0..frames {
        writer
            .write_sample(to_i16(left[i]))
            .and_then(|()| writer.write_sample(to_i16(right[i])))
            .map_err(|e| AudioError::Encoding(e.to_string()))?;
    }
    writer
        .finalize()
        .map_err(|e| AudioError::Encoding(e.to_string()))?;

    Ok(cursor.into_inner())
}

/// Recorder over the session sink
#[derive(Debug)]
pub struct Recorder {
    state: RecorderState,
    /// Tap node observing the sink; wired only while recording
    tap: NodeId,
    sink: NodeId,
    shared: Arc<RecorderShared>,
    encoded: Option<EncodedWav>,
    sample_rate: u32,
}

impl Recorder {
    /// Construct the tap node. No edges are made until recording starts.
    pub fn new(graph: &mut dyn AudioGraph, sink: NodeId, sample_rate: SampleRate) -> Self {
        Self {
            state: RecorderState::Idle,
            tap: graph.add_node(NodeSpec::Tap),
            sink,
            shared: Arc::new(RecorderShared::default()),
            encoded: None,
            sample_rate: sample_rate.hz(),
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Handle for the audio callback
    pub fn shared(&self) -> Arc<RecorderShared> {
        Arc::clone(&self.shared)
    }

    pub fn tap(&self) -> NodeId {
        self.tap
    }

    /// Wire the tap and begin buffering. No-op while already recording.
    pub fn start(&mut self, graph: &mut dyn AudioGraph) -> Result<()> {
        if self.is_recording() {
            debug!("start ignored: already recording");
            return Ok(());
        }
        self.encoded = None;
        self.shared.clear();
        graph.connect(self.sink, self.tap)?;
        self.shared.recording.store(true, Ordering::Relaxed);
        self.state = RecorderState::Recording;
        info!("recording started");
        Ok(())
    }

    /// Disconnect the tap, transition to idle, and encode what was
    /// buffered. Returns `None` when not recording.
    pub fn stop(&mut self, graph: &mut dyn AudioGraph) -> Option<&EncodedWav> {
        if !self.is_recording() {
            return None;
        }
        self.shared.recording.store(false, Ordering::Relaxed);
        self.state = RecorderState::Idle;

        if let Err(e) = graph.disconnect(self.sink, self.tap) {
            // Best effort: the tap edge is already gone, keep the samples
            warn!(error = %e, "tap disconnect failed on stop");
        }

        let (left, right) = self.shared.take();
        let frames = left.len().min(right.len());
        match encode_wav(&left, &right, self.sample_rate) {
            Ok(bytes) => {
                info!(frames, "recording encoded");
                self.encoded = Some(EncodedWav {
                    bytes,
                    sample_rate: self.sample_rate,
                    frames,
                });
            }
            Err(e) => {
                error!(error = %e, "recording encode failed");
                self.encoded = None;
            }
        }
        self.encoded.as_ref()
    }

    pub fn encoded(&self) -> Option<&EncodedWav> {
        self.encoded.as_ref()
    }

    /// Write the encoded recording into `dir` with a timestamped filename.
    /// No-op (returns `None`) when nothing has been encoded.
    pub fn save_to(&self, dir: &Path) -> Option<PathBuf> {
        let encoded = self.encoded.as_ref()?;
        let stamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        let path = dir.join(format!("recording-{stamp}.wav"));
        match std::fs::write(&path, &encoded.bytes) {
            Ok(()) => {
                info!(path = %path.display(), "recording saved");
                Some(path)
            }
            Err(e) => {
                error!(error = %e, "failed to save recording");
                None
            }
        }
    }

    /// Release the encoded recording and force a stop if still recording
    pub fn cleanup(&mut self, graph: &mut dyn AudioGraph) {
        if self.is_recording() {
            let _ = self.stop(graph);
        }
        self.encoded = None;
        self.shared.clear();
    }
}
