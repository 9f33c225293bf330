//! Integration tests for chain topology invariants
//!
//! Drives a full session over the edge-recording graph and verifies the
//! single-path invariant across every toggle pattern the popup can produce.

use busker_core::domain::audio::SampleRate;
use busker_core::domain::filter::FilterKind::{self, *};
use busker_core::domain::graph::{EdgeListGraph, NodeId};
use busker_core::domain::preset::EqPreset;
use busker_core::domain::session::Session;
use std::sync::{Arc, Mutex};

fn start_neutral() -> (Arc<Mutex<EdgeListGraph>>, Session<EdgeListGraph>) {
    let graph = Arc::new(Mutex::new(EdgeListGraph::new()));
    let session = Session::start(Arc::clone(&graph), EqPreset::neutral(), SampleRate::Hz48000)
        .expect("session start");
    (graph, session)
}

/// The signal path between the fixed anchors, filter nodes only
fn chain_path(graph: &Arc<Mutex<EdgeListGraph>>, session: &Session<EdgeListGraph>) -> Vec<NodeId> {
    let g = graph.lock().unwrap();
    let path = g.path_from(session.source()).expect("single unbroken path");
    assert_eq!(*path.first().unwrap(), session.source());
    assert_eq!(*path.last().unwrap(), session.sink());
    path[1..path.len() - 1].to_vec()
}

#[test]
fn toggle_storm_preserves_single_path() {
    let (graph, mut session) = start_neutral();

    // A scripted storm covering every removal position repeatedly
    let script: &[(FilterKind, bool)] = &[
        (Highpass, true),
        (Bandpass, true),
        (Lowpass, true),
        (Bandpass, false), // middle
        (Highpass, false), // head
        (Lowshelf, true),
        (Lowshelf, false), // tail
        (Lowpass, false),  // only
        (Peaking, true),
        (Highshelf, true),
        (Peaking, false), // head again
        (Highshelf, false),
    ];

    for &(kind, enabled) in script {
        session.set_filter_enabled(kind, enabled);
        let path = chain_path(&graph, &session);
        assert_eq!(path.len(), session.active_kinds().len());
    }
    assert!(session.active_kinds().is_empty());
}

#[test]
fn insertion_order_is_activation_order() {
    let (graph, mut session) = start_neutral();

    session.set_filter_enabled(Peaking, true);
    session.set_filter_enabled(Highpass, true);
    session.set_filter_enabled(Lowshelf, true);

    // Activation order, not kind order
    assert_eq!(session.active_kinds(), vec![Peaking, Highpass, Lowshelf]);
    assert_eq!(chain_path(&graph, &session).len(), 3);
}

#[test]
fn redundant_toggles_leave_chain_unchanged() {
    let (graph, mut session) = start_neutral();
    session.set_filter_enabled(Bandpass, true);
    let before = chain_path(&graph, &session);

    assert!(!session.set_filter_enabled(Bandpass, true));
    assert!(!session.set_filter_enabled(Highshelf, false));

    assert_eq!(chain_path(&graph, &session), before);
}

#[test]
fn removing_last_filter_restores_direct_connection() {
    let (graph, mut session) = start_neutral();

    session.set_filter_enabled(Lowpass, true);
    session.set_filter_enabled(Lowpass, false);

    assert!(chain_path(&graph, &session).is_empty());
    assert!(graph
        .lock()
        .unwrap()
        .edges()
        .contains(session.source(), session.sink()));
}

#[test]
fn parameter_updates_never_touch_topology() {
    let (graph, mut session) = start_neutral();
    session.set_filter_enabled(Bandpass, true);
    session.set_filter_enabled(Peaking, true);
    let before = chain_path(&graph, &session);

    session.set_parameter(Bandpass, 440.0, Some(35.0));
    session.set_parameter(Peaking, 3200.0, Some(-6.0));
    session.set_parameter(Lowpass, 900.0, Some(1.1)); // inactive unit
    session.set_parameter(Highshelf, 9000.0, None);

    assert_eq!(chain_path(&graph, &session), before);
}

#[test]
fn mono_round_trip_under_active_chain() {
    let (graph, mut session) = start_neutral();
    session.set_filter_enabled(Highpass, true);
    session.set_filter_enabled(Peaking, true);

    let before: Vec<NodeId> = graph
        .lock()
        .unwrap()
        .path_from(session.source())
        .unwrap();

    assert!(session.set_mono(true, 0.8));
    // Path grew by the three scaffolding nodes
    let with_mono = graph
        .lock()
        .unwrap()
        .path_from(session.source())
        .unwrap();
    assert_eq!(with_mono.len(), before.len() + 3);

    assert!(!session.set_mono(false, 0.8));
    let after = graph.lock().unwrap().path_from(session.source()).unwrap();
    assert_eq!(after, before);
}

#[test]
fn recording_tap_rides_along_with_surgery() {
    let (graph, mut session) = start_neutral();
    session.start_recording();

    session.set_filter_enabled(Lowshelf, true);
    session.set_filter_enabled(Highpass, true);
    session.set_filter_enabled(Lowshelf, false);

    // The tap stays on the sink and the main path stays whole
    let g = graph.lock().unwrap();
    assert_eq!(g.taps_of(session.sink()).len(), 1);
    let path = g.path_from(session.source()).unwrap();
    assert_eq!(path.len(), 3); // source, highpass, sink
    drop(g);

    session.stop_recording();
    assert!(graph.lock().unwrap().taps_of(session.sink()).is_empty());
}
