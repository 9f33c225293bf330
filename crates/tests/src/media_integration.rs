//! Media command flow and recording container checks
//!
//! Drives the controller against the reference deck the way the popup
//! does, and verifies a session recording independently with the hound
//! reader rather than the recorder's own decode path.

use busker_core::domain::audio::SampleRate;
use busker_core::domain::media::{MediaController, MediaDeck, DEFAULT_SKIP_SECONDS};
use busker_core::domain::preset::EqPreset;
use busker_core::domain::session::Session;
use busker_core::domain::graph::EdgeListGraph;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn listening_session_command_flow() {
    let controller = MediaController::new(MediaDeck::new(300.0));

    // Skip an intro, realize it went too far, back up, then pause
    assert!(controller.forward(Some(45.0)).await);
    assert!(controller.rewind(None).await);
    assert!(controller.pause().await);

    let status = controller.status().await.expect("status");
    assert!(!status.playing);
    assert_eq!(status.current_time, 45.0 - DEFAULT_SKIP_SECONDS);
    assert_eq!(status.duration, 300.0);

    assert!(controller.restart().await);
    assert!(controller.resume().await);
    let status = controller.status().await.expect("status");
    assert!(status.playing);
    assert_eq!(status.current_time, 0.0);

    let last = controller.last_action().expect("tracked action");
    assert_eq!(last.action, "getMediaStatus");
    assert!(last.success);
}

#[test]
fn recording_container_reads_back_with_hound() {
    let graph = Arc::new(Mutex::new(EdgeListGraph::new()));
    let mut session =
        Session::start(Arc::clone(&graph), EqPreset::neutral(), SampleRate::Hz44100).unwrap();

    assert!(session.start_recording());
    session
        .recorder_shared()
        .append_interleaved(&[0.25, -0.25, 0.5, -0.5, 0.75, -0.75]);
    let encoded = session.stop_recording().expect("encoded take");

    let reader = hound::WavReader::new(Cursor::new(encoded.bytes)).expect("readable container");
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    assert_eq!(reader.len(), 6); // 3 frames x 2 channels

    let samples: Vec<i16> = reader
        .into_samples::<i16>()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(samples[0] > 0 && samples[1] < 0);
    assert_eq!(samples[0], -samples[1]);
}
