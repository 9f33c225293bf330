//! Helper utilities for benchmarks

/// Generate an interleaved stereo sine wave test signal
pub fn stereo_sine(freq: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
    let mut block = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let s = (2.0 * std::f32::consts::PI * freq * t).sin();
        block.push(s);
        block.push(s);
    }
    block
}

/// Generate silence
pub fn silence(samples: usize) -> Vec<f32> {
    vec![0.0; samples]
}

/// Calculate RMS level
pub fn rms(buffer: &[f32]) -> f32 {
    let sum_sq: f32 = buffer.iter().map(|&s| s * s).sum();
    (sum_sq / buffer.len() as f32).sqrt()
}

/// Calculate peak level
pub fn peak(buffer: &[f32]) -> f32 {
    buffer.iter().map(|&s| s.abs()).fold(0.0f32, f32::max)
}
