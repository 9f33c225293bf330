//! CPAL-based audio capture
//!
//! Provides device enumeration through the core [`CaptureSource`] trait and
//! [`CaptureStream`], which feeds captured audio into a lock-free ring as
//! interleaved stereo. Any failure to acquire the stream surfaces as
//! [`AudioError::CaptureUnavailable`]; callers starting a session convert
//! that into a `None` result rather than a fault.

use crate::audio::lockfree_buffer::SpscRing;
use busker_core::domain::audio::{
    AudioError, CaptureSource, DeviceId, DeviceInfo, Result, SampleRate,
};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig as CpalStreamConfig;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// CPAL-based capture device enumerator
pub struct CpalCapture {
    host: cpal::Host,
}

impl Default for CpalCapture {
    fn default() -> Self {
        info!("Initializing CPAL capture host");
        Self::new()
    }
}

impl CpalCapture {
    pub fn new() -> Self {
        let host = cpal::default_host();
        debug!("Using audio host: {:?}", host.id());
        Self { host }
    }

    fn describe(device: &cpal::Device) -> Option<DeviceInfo> {
        #[allow(deprecated)]
        let name = device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string());

        // Capture wants input-capable devices only
        if device.supported_input_configs().is_err() {
            return None;
        }

        let default_sample_rate = device
            .default_input_config()
            .ok()
            .map(|config| SampleRate::from_hz(config.sample_rate()));

        Some(DeviceInfo {
            id: DeviceId::new(name.clone()),
            name,
            default_sample_rate,
        })
    }
}

impl CaptureSource for CpalCapture {
    fn devices(&self) -> Result<Vec<DeviceInfo>> {
        let mut devices = Vec::new();

        let cpal_devices = self
            .host
            .devices()
            .map_err(|e| AudioError::CaptureUnavailable(e.to_string()))?;

        for device in cpal_devices {
            if let Some(info) = Self::describe(&device) {
                debug!("Found capture device: {}", info.name);
                devices.push(info);
            }
        }

        info!("Found {} capture devices", devices.len());
        Ok(devices)
    }

    fn default_device(&self) -> Result<DeviceInfo> {
        let device = self
            .host
            .default_input_device()
            .ok_or_else(|| AudioError::CaptureUnavailable("no default input device".to_string()))?;

        Self::describe(&device)
            .ok_or_else(|| AudioError::CaptureUnavailable("default device has no inputs".to_string()))
    }
}

/// Live capture stream writing interleaved stereo into a ring buffer
///
/// Mono inputs are duplicated to both channels; inputs with more than two
/// channels keep their first two. The stream stops when dropped.
pub struct CaptureStream {
    _stream: cpal::Stream,
    sample_rate: u32,
    channels: u16,
    device_name: String,
}

impl CaptureStream {
    /// Open a capture stream on `device` (or the default input device)
    pub fn open(device: Option<&DeviceId>, ring: Arc<SpscRing>) -> Result<Self> {
        let host = cpal::default_host();

        let cpal_device = match device {
            Some(id) => {
                #[allow(deprecated)]
                let found = host
                    .devices()
                    .map_err(|e| AudioError::CaptureUnavailable(e.to_string()))?
                    .find(|d| d.name().ok().as_deref() == Some(id.as_str()));
                found.ok_or_else(|| {
                    AudioError::CaptureUnavailable(format!(
                        "capture device {} not found",
                        id.as_str()
                    ))
                })?
            }
            None => host.default_input_device().ok_or_else(|| {
                AudioError::CaptureUnavailable("no default input device".to_string())
            })?,
        };

        #[allow(deprecated)]
        let device_name = cpal_device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string());

        let default_config = cpal_device
            .default_input_config()
            .map_err(|e| AudioError::CaptureUnavailable(e.to_string()))?;
        let sample_rate = default_config.sample_rate();
        let channels = default_config.channels();

        info!(
            device = %device_name,
            rate = sample_rate,
            channels,
            "Opening capture stream"
        );

        let cpal_config = CpalStreamConfig {
            channels,
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let ch = channels as usize;
        let stream = cpal_device
            .build_input_stream(
                &cpal_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mut stereo = Vec::with_capacity(data.len() / ch.max(1) * 2);
                    for frame in data.chunks_exact(ch.max(1)) {
                        let left = frame[0];
                        let right = if ch > 1 { frame[1] } else { frame[0] };
                        stereo.push(left);
                        stereo.push(right);
                    }
                    let written = ring.write(&stereo);
                    if written < stereo.len() {
                        // Consumer fell behind; the tail of this block is lost
                        warn!(dropped = stereo.len() - written, "capture overrun");
                    }
                },
                |err| error!("Capture stream error: {}", err),
                None,
            )
            .map_err(|e| {
                AudioError::CaptureUnavailable(format!("failed to build capture stream: {e}"))
            })?;

        stream.play().map_err(|e| {
            AudioError::CaptureUnavailable(format!("failed to start capture stream: {e}"))
        })?;

        Ok(Self {
            _stream: stream,
            sample_rate,
            channels,
            device_name,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}
