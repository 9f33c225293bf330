//! Busker CLI Application

use anyhow::{bail, Context};
use busker_core::domain::audio::{CaptureSource, DeviceId};
use busker_core::domain::filter::FilterKind;
use busker_core::domain::preset::EqPreset;
use busker_infra::audio::capture::CpalCapture;
use busker_infra::audio::engine::{CaptureEngine, EngineConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "busker")]
#[command(about = "A live-capture audio equalizer", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List capture devices
    Devices,
    /// List built-in presets
    Presets,
    /// Run a capture session
    Run {
        /// Factory preset name or path to a preset TOML file
        #[arg(short, long, default_value = "Neutral")]
        preset: String,

        /// Capture device name (default input device when omitted)
        #[arg(short, long)]
        device: Option<String>,

        /// Enable the mono downmix stage
        #[arg(long)]
        mono: bool,

        /// Record the session and save a WAV into this directory on exit
        #[arg(long)]
        record: Option<PathBuf>,

        /// Stop after this many seconds (runs until Ctrl-C when omitted)
        #[arg(long)]
        duration: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    match cli.command {
        Commands::Devices => list_devices(),
        Commands::Presets => {
            list_presets();
            Ok(())
        }
        Commands::Run {
            preset,
            device,
            mono,
            record,
            duration,
        } => run_session(preset, device, mono, record, duration).await,
    }
}

fn list_devices() -> anyhow::Result<()> {
    let capture = CpalCapture::new();
    let default = capture.default_device().ok();
    let devices = capture.devices().context("host audio system unavailable")?;

    if devices.is_empty() {
        println!("No capture devices found");
        return Ok(());
    }

    for device in devices {
        let marker = match &default {
            Some(d) if d.id == device.id => " (default)",
            _ => "",
        };
        let rate = device
            .default_sample_rate
            .map(|r| format!("{} Hz", r.hz()))
            .unwrap_or_else(|| "unknown rate".to_string());
        println!("{}{} - {}", device.name, marker, rate);
    }
    Ok(())
}

fn list_presets() {
    for (name, preset) in EqPreset::factory() {
        let enabled: Vec<&str> = preset
            .filters
            .iter()
            .filter(|f| f.enabled)
            .map(|f| f.kind.as_str())
            .collect();
        if enabled.is_empty() {
            println!("{name}: flat");
        } else {
            println!("{name}: {}", enabled.join(", "));
        }
    }
}

async fn resolve_preset(name_or_path: &str) -> anyhow::Result<EqPreset> {
    if let Some(preset) = EqPreset::by_name(name_or_path) {
        return Ok(preset);
    }
    let path = PathBuf::from(name_or_path);
    if path.exists() {
        return EqPreset::load_from_file(&path)
            .await
            .with_context(|| format!("failed to load preset from {}", path.display()));
    }
    bail!("unknown preset '{name_or_path}' (try `busker presets`)");
}

async fn run_session(
    preset: String,
    device: Option<String>,
    mono: bool,
    record: Option<PathBuf>,
    duration: Option<u64>,
) -> anyhow::Result<()> {
    let preset = resolve_preset(&preset).await?;

    let config = EngineConfig {
        device: device.map(DeviceId::new),
        ..EngineConfig::default()
    };

    let Some(mut engine) = CaptureEngine::start(preset, config) else {
        bail!("capture unavailable: no audio stream could be acquired");
    };

    println!(
        "Capturing at {} Hz, active filters: {:?}",
        engine.sample_rate().hz(),
        engine
            .session()
            .active_kinds()
            .into_iter()
            .map(FilterKind::as_str)
            .collect::<Vec<_>>()
    );

    if mono {
        let volume = engine.session().volume();
        engine.session_mut().set_mono(true, volume);
        println!("Mono downmix enabled");
    }

    if record.is_some() {
        if engine.session_mut().start_recording() {
            println!("Recording...");
        } else {
            bail!("failed to start recording");
        }
    }

    match duration {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => {
            println!("Press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
        }
    }

    if let Some(dir) = record {
        if let Some(encoded) = engine.session_mut().stop_recording() {
            tokio::fs::create_dir_all(&dir).await?;
            match engine.session().save_recording(&dir) {
                Some(path) => println!(
                    "Saved {:.1}s recording to {}",
                    encoded.duration_secs(),
                    path.display()
                ),
                None => bail!("failed to save recording"),
            }
        }
    }

    engine.stop();
    println!("Stopped");
    Ok(())
}
