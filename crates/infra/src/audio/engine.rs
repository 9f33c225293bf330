//! Real-time capture engine
//!
//! [`CaptureEngine`] wires the pieces together for one live session:
//! capture stream -> lock-free ring -> processing graph -> playback, with
//! the recorder fed from the rendered block whenever its tap is connected.
//! All control operations go through the owned [`Session`]; the audio
//! callbacks only pull blocks and never edit topology.

use crate::audio::capture::CaptureStream;
use crate::audio::graph::ProcessGraph;
use crate::audio::lockfree_buffer::SpscRing;
use busker_core::domain::audio::{AudioError, DeviceId, Result, SampleRate};
use busker_core::domain::preset::EqPreset;
use busker_core::domain::recorder::RecorderShared;
use busker_core::domain::session::Session;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig as CpalStreamConfig;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capture device to open (`None` = default input)
    pub device: Option<DeviceId>,
    /// Transport ring capacity in samples (rounded up to a power of two)
    pub ring_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device: None,
            // Half a second of stereo at 48 kHz; enough slack for a busy
            // render thread without noticeable capture latency
            ring_capacity: 1 << 15,
        }
    }
}

/// One live capture session wired to real audio streams
///
/// Dropping the engine stops both streams; [`stop`](Self::stop) performs
/// the orderly teardown that also disconnects every session-owned node.
pub struct CaptureEngine {
    session: Session<ProcessGraph>,
    _capture: CaptureStream,
    _output: cpal::Stream,
}

impl CaptureEngine {
    /// Acquire capture, build the session graph, and start playback.
    ///
    /// Returns `None` when the host cannot provide a capture stream or an
    /// output device; the cause is logged, never raised.
    pub fn start(preset: EqPreset, config: EngineConfig) -> Option<Self> {
        let ring = Arc::new(SpscRing::with_capacity(config.ring_capacity));

        let capture = match CaptureStream::open(config.device.as_ref(), Arc::clone(&ring)) {
            Ok(capture) => capture,
            Err(e) => {
                warn!(error = %e, "capture unavailable");
                return None;
            }
        };

        let sample_rate = capture.sample_rate();
        let graph = Arc::new(Mutex::new(ProcessGraph::new(sample_rate)));
        let session = match Session::start(
            Arc::clone(&graph),
            preset,
            SampleRate::from_hz(sample_rate),
        ) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "session start failed");
                return None;
            }
        };

        let recorder = session.recorder_shared();
        let output = match build_output_stream(sample_rate, ring, graph, recorder) {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "output unavailable");
                return None;
            }
        };

        info!(
            device = capture.device_name(),
            rate = sample_rate,
            "capture engine running"
        );
        Some(Self {
            session,
            _capture: capture,
            _output: output,
        })
    }

    pub fn session(&self) -> &Session<ProcessGraph> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<ProcessGraph> {
        &mut self.session
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.session.sample_rate()
    }

    /// Stop the streams and close the session, disconnecting every owned
    /// node before releasing it
    pub fn stop(self) {
        info!("Shutting down capture engine");
        let Self {
            session,
            _capture,
            _output,
        } = self;
        drop(_capture);
        drop(_output);
        session.close();
    }
}

/// Build the playback stream: pull captured blocks from the ring, render
/// them through the graph, and feed the recorder when its tap is live
fn build_output_stream(
    sample_rate: u32,
    ring: Arc<SpscRing>,
    graph: Arc<Mutex<ProcessGraph>>,
    recorder: Arc<RecorderShared>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::StreamError("no default output device".to_string()))?;

    let config = CpalStreamConfig {
        channels: 2,
        sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut input = vec![0.0; data.len()];
                // Underruns leave trailing zeros, which render as silence
                let _ = ring.read(&mut input);

                let mut g = graph.lock().unwrap_or_else(PoisonError::into_inner);
                match g.render(&input, data) {
                    Ok(tapped) => {
                        drop(g);
                        if tapped {
                            recorder.append_interleaved(data);
                        }
                    }
                    Err(e) => {
                        drop(g);
                        error!("render failed: {}", e);
                        data.fill(0.0);
                    }
                }
            },
            |err| error!("Output stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::StreamError(format!("failed to build output stream: {e}")))?;

    stream
        .play()
        .map_err(|e| AudioError::StreamError(format!("failed to start output stream: {e}")))?;

    Ok(stream)
}
