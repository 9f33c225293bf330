//! Example demonstrating presets and live chain surgery
//!
//! Run with: cargo run --package busker-core --example preset_demo

use busker_core::domain::audio::SampleRate;
use busker_core::domain::filter::FilterKind;
use busker_core::domain::graph::EdgeListGraph;
use busker_core::domain::media::{MediaController, MediaDeck};
use busker_core::domain::preset::{EqPreset, PresetManager};
use busker_core::domain::session::Session;
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("busker_core=debug,info")
        .init();

    println!("=== Busker Preset Demo ===\n");

    // 1. Factory presets
    println!("1. Factory presets:");
    for (name, preset) in EqPreset::factory() {
        let enabled = preset.filters.iter().filter(|f| f.enabled).count();
        println!(
            "   - {} (gain {:.1}, {} filters enabled)",
            name, preset.main_out.gain, enabled
        );
    }

    // 2. Save and reload a preset
    println!("\n2. Preset persistence:");
    let preset_dir = std::path::PathBuf::from("demo_presets");
    let manager = PresetManager::new(preset_dir.clone());
    manager
        .save_preset("my_podcast", &EqPreset::podcast())
        .await?;
    let loaded = manager.load_preset("my_podcast").await?;
    println!("   ✓ Round-tripped 'my_podcast' with {} filters", loaded.filters.len());

    // 3. Start a session on the topology graph and do some live surgery
    println!("\n3. Live chain surgery:");
    let graph = Arc::new(Mutex::new(EdgeListGraph::new()));
    let mut session = Session::start(Arc::clone(&graph), loaded, SampleRate::Hz48000)?;
    println!("   Active after start: {:?}", session.active_kinds());

    session.set_filter_enabled(FilterKind::Bandpass, true);
    session.set_filter_enabled(FilterKind::Highpass, false);
    println!("   After toggling:    {:?}", session.active_kinds());

    session.set_mono(true, 1.0);
    println!("   Mono enabled:      {}", session.mono_enabled());

    let path = graph.lock().unwrap().path_from(session.source())?;
    println!("   Signal path length: {} nodes", path.len());

    // 4. Drive the reference media deck
    println!("\n4. Media commands:");
    let controller = MediaController::new(MediaDeck::new(180.0));
    controller.pause().await;
    controller.forward(Some(30.0)).await;
    if let Some(status) = controller.status().await {
        println!(
            "   playing={} position={:.1}s of {:.0}s",
            status.playing, status.current_time, status.duration
        );
    }

    session.close();
    println!("\n=== Demo Complete ===");

    // Cleanup
    std::fs::remove_dir_all(preset_dir)?;

    Ok(())
}
