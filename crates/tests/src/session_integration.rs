//! End-to-end tests over the real DSP graph
//!
//! Simulates the engine's render loop by hand: blocks go through
//! `ProcessGraph::render` exactly the way the output callback drives it,
//! including the recorder feed, so these tests hear what a user would.

use busker_core::domain::audio::SampleRate;
use busker_core::domain::filter::FilterKind;
use busker_core::domain::preset::EqPreset;
use busker_core::domain::session::Session;
use busker_infra::audio::graph::ProcessGraph;
use std::sync::{Arc, Mutex};

const RATE: u32 = 48000;

fn start(preset: EqPreset) -> (Arc<Mutex<ProcessGraph>>, Session<ProcessGraph>) {
    let graph = Arc::new(Mutex::new(ProcessGraph::new(RATE)));
    let session = Session::start(Arc::clone(&graph), preset, SampleRate::from_hz(RATE))
        .expect("session start");
    (graph, session)
}

/// One render pass, feeding the recorder the way the engine does
fn render(
    graph: &Arc<Mutex<ProcessGraph>>,
    session: &Session<ProcessGraph>,
    input: &[f32],
) -> Vec<f32> {
    let mut output = vec![0.0; input.len()];
    let tapped = graph
        .lock()
        .unwrap()
        .render(input, &mut output)
        .expect("render");
    if tapped {
        session.recorder_shared().append_interleaved(&output);
    }
    output
}

fn stereo_tone(frequency: f32, frames: usize) -> Vec<f32> {
    let mut block = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let s = (2.0 * std::f32::consts::PI * frequency * i as f32 / RATE as f32).sin();
        block.push(s);
        block.push(s);
    }
    block
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}

#[test]
fn neutral_session_passes_audio_through() {
    let (graph, session) = start(EqPreset::neutral());
    let input = stereo_tone(440.0, 512);

    let output = render(&graph, &session, &input);

    for (a, b) in input.iter().zip(output.iter()) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn volume_scales_output() {
    let (graph, mut session) = start(EqPreset::neutral());
    session.set_volume(0.5);

    let input = stereo_tone(440.0, 256);
    let output = render(&graph, &session, &input);

    for (a, b) in input.iter().zip(output.iter()) {
        assert!((a * 0.5 - b).abs() < 1e-6);
    }
}

#[test]
fn mute_silences_and_unmute_restores() {
    let (graph, mut session) = start(EqPreset::neutral());
    let input = stereo_tone(440.0, 256);

    session.set_mute(true, 0.8);
    assert_eq!(peak(&render(&graph, &session, &input)), 0.0);

    session.set_mute(false, 0.0);
    let output = render(&graph, &session, &input);
    assert!((peak(&output) - peak(&input) * 0.8).abs() < 0.05);
}

#[test]
fn active_lowpass_attenuates_treble_but_not_bass() {
    let (graph, mut session) = start(EqPreset::neutral());
    session.set_filter_enabled(FilterKind::Lowpass, true);
    session.set_parameter(FilterKind::Lowpass, 500.0, Some(0.707));

    // Let the filter settle on a full second of each tone
    let treble = stereo_tone(10000.0, RATE as usize);
    let treble_out = render(&graph, &session, &treble);
    assert!(peak(&treble_out[RATE as usize..]) < 0.05);

    session.set_filter_enabled(FilterKind::Lowpass, false);
    session.set_filter_enabled(FilterKind::Lowpass, true); // fresh state
    let bass = stereo_tone(100.0, RATE as usize);
    let bass_out = render(&graph, &session, &bass);
    assert!(peak(&bass_out[RATE as usize..]) > 0.8);
}

#[test]
fn bass_boost_preset_lifts_lows() {
    let (graph, session) = start(EqPreset::bass_boost());

    let bass = stereo_tone(60.0, RATE as usize);
    let output = render(&graph, &session, &bass);

    // +6 dB low shelf is roughly a 2x amplitude lift
    assert!(peak(&output[RATE as usize..]) > 1.5);
}

#[test]
fn mono_downmix_equalizes_hard_panned_channels() {
    let (graph, mut session) = start(EqPreset::neutral());
    session.set_mono(true, 1.0);

    // Left-only content
    let mut input = Vec::new();
    for i in 0..256 {
        input.push((2.0 * std::f32::consts::PI * 440.0 * i as f32 / RATE as f32).sin());
        input.push(0.0);
    }
    let output = render(&graph, &session, &input);

    for (frame_in, frame_out) in input.chunks_exact(2).zip(output.chunks_exact(2)) {
        let expected = (frame_in[0] + frame_in[1]) * 0.5;
        assert!((frame_out[0] - expected).abs() < 1e-6);
        assert!((frame_out[1] - expected).abs() < 1e-6);
    }

    session.set_mono(false, 1.0);
    let output = render(&graph, &session, &input);
    assert!((output[0] - input[0]).abs() < 1e-6);
    assert_eq!(output[1], 0.0);
}

#[test]
fn recorder_captures_processed_audio() {
    let (graph, mut session) = start(EqPreset::neutral());
    session.set_volume(0.5);
    assert!(session.start_recording());

    let input = stereo_tone(440.0, 512);
    let output = render(&graph, &session, &input);
    let encoded = session.stop_recording().expect("encoded take");

    assert_eq!(encoded.frames, 512);
    assert_eq!(encoded.sample_rate, RATE);

    // The take holds the post-gain signal the listener heard
    let (left, _right) = encoded.decode().expect("decode");
    let lsb = 2.0 / i16::MAX as f32;
    for (recorded, heard) in left.iter().zip(output.chunks_exact(2).map(|f| f[0])) {
        assert!((recorded - heard).abs() <= lsb);
    }
}

#[test]
fn blocks_outside_recording_are_not_captured() {
    let (graph, mut session) = start(EqPreset::neutral());
    let input = stereo_tone(440.0, 128);

    render(&graph, &session, &input);
    assert!(session.start_recording());
    render(&graph, &session, &input);
    let encoded = session.stop_recording().unwrap();
    render(&graph, &session, &input);

    assert_eq!(encoded.frames, 128);
}

#[test]
fn preset_seeds_parameters_with_kind_policy() {
    let (_, session) = start(EqPreset::voice_clarity());

    let peaking = session.filter_params(FilterKind::Peaking).unwrap();
    assert_eq!(peaking.frequency, 2500.0);
    assert_eq!(peaking.q, 1.2);
    assert_eq!(peaking.gain_db, 5.0);

    let highpass = session.filter_params(FilterKind::Highpass).unwrap();
    assert_eq!(highpass.frequency, 120.0);
    assert_eq!(highpass.gain_db, 0.0);
}

#[test]
fn close_tears_down_cleanly_mid_everything() {
    let (graph, mut session) = start(EqPreset::voice_clarity());
    session.set_mono(true, 1.0);
    session.start_recording();
    render(&graph, &session, &stereo_tone(440.0, 64));

    session.close();

    // The source is fully detached: rendering still succeeds and the
    // detached path leaves the block untouched
    let mut output = vec![0.0; 64];
    assert!(graph.lock().unwrap().render(&[0.0; 64], &mut output).is_ok());
}
