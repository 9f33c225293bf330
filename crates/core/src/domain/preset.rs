//! Preset store and persistence
//!
//! A preset is pure data: master gain/mute plus one [`FilterSpec`] per
//! filter kind. Factory presets ship built in; user presets live as TOML
//! files under a preset directory managed by [`PresetManager`], with
//! [`PresetWatcher`] broadcasting hot-reload events when they change.

use crate::domain::filter::FilterKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument};

pub type Result<T> = std::result::Result<T, PresetError>;

/// Errors that can occur during preset operations
#[derive(Debug, Error)]
pub enum PresetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Preset not found: {0}")]
    NotFound(String),

    #[error("Invalid preset: {0}")]
    Invalid(String),
}

/// Master output settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MainOut {
    pub gain: f32,
    pub muted: bool,
}

impl Default for MainOut {
    fn default() -> Self {
        Self {
            gain: 1.0,
            muted: false,
        }
    }
}

/// Immutable template for one filter kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub name: String,
    pub kind: FilterKind,
    pub enabled: bool,
    pub frequency: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gain_db: Option<f32>,
}

/// A named equalizer configuration: master output plus one spec per kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqPreset {
    pub main_out: MainOut,
    pub filters: Vec<FilterSpec>,
}

fn spec(
    name: &str,
    kind: FilterKind,
    frequency: f32,
    q: Option<f32>,
    gain_db: Option<f32>,
) -> FilterSpec {
    FilterSpec {
        name: name.to_string(),
        kind,
        enabled: false,
        frequency,
        q,
        gain_db,
    }
}

impl EqPreset {
    /// Flat response with every filter disabled
    pub fn neutral() -> Self {
        Self {
            main_out: MainOut::default(),
            filters: vec![
                spec("High Pass", FilterKind::Highpass, 80.0, Some(0.7), None),
                spec("Band Pass", FilterKind::Bandpass, 1000.0, Some(1.0), None),
                spec("Low Pass", FilterKind::Lowpass, 1000.0, Some(0.7), None),
                spec("Low Shelf", FilterKind::Lowshelf, 250.0, None, Some(0.0)),
                spec("High Shelf", FilterKind::Highshelf, 6000.0, None, Some(0.0)),
                spec(
                    "Peaking",
                    FilterKind::Peaking,
                    3000.0,
                    Some(1.0),
                    Some(0.0),
                ),
            ],
        }
    }

    /// Enhances speech intelligibility
    pub fn voice_clarity() -> Self {
        let mut preset = Self::neutral();
        preset.main_out.gain = 1.1;
        preset.tune(FilterKind::Highpass, |f| {
            f.enabled = true;
            f.frequency = 120.0;
        });
        preset.tune(FilterKind::Lowpass, |f| {
            f.enabled = true;
            f.frequency = 8000.0;
        });
        preset.tune(FilterKind::Lowshelf, |f| {
            f.enabled = true;
            f.frequency = 200.0;
            f.gain_db = Some(-3.0);
        });
        preset.tune(FilterKind::Peaking, |f| {
            f.enabled = true;
            f.frequency = 2500.0;
            f.q = Some(1.2);
            f.gain_db = Some(5.0);
        });
        preset
    }

    /// Enhances low frequency response
    pub fn bass_boost() -> Self {
        let mut preset = Self::neutral();
        preset.tune(FilterKind::Lowshelf, |f| {
            f.enabled = true;
            f.frequency = 180.0;
            f.gain_db = Some(6.0);
        });
        preset.tune(FilterKind::Highshelf, |f| {
            f.enabled = true;
            f.frequency = 8000.0;
            f.gain_db = Some(1.5);
        });
        preset
    }

    /// Optimized for spoken word content
    pub fn podcast() -> Self {
        let mut preset = Self::neutral();
        preset.main_out.gain = 1.2;
        preset.tune(FilterKind::Highpass, |f| {
            f.enabled = true;
            f.frequency = 85.0;
            f.q = Some(0.6);
        });
        preset.tune(FilterKind::Lowshelf, |f| {
            f.enabled = true;
            f.gain_db = Some(-2.0);
        });
        preset.tune(FilterKind::Peaking, |f| {
            f.enabled = true;
            f.frequency = 2800.0;
            f.gain_db = Some(4.0);
        });
        preset
    }

    /// Gentler on the ears for long listening sessions
    pub fn reduced_fatigue() -> Self {
        let mut preset = Self::neutral();
        preset.main_out.gain = 0.9;
        preset.tune(FilterKind::Highpass, |f| {
            f.enabled = true;
            f.frequency = 40.0;
            f.q = Some(0.5);
        });
        preset.tune(FilterKind::Lowpass, |f| {
            f.enabled = true;
            f.frequency = 7500.0;
            f.q = Some(0.6);
        });
        preset.tune(FilterKind::Lowshelf, |f| {
            f.enabled = true;
            f.frequency = 200.0;
            f.gain_db = Some(-1.0);
        });
        preset.tune(FilterKind::Highshelf, |f| {
            f.enabled = true;
            f.gain_db = Some(-4.0);
        });
        preset
    }

    /// Helps when in noisy environments
    pub fn noise_reduction() -> Self {
        let mut preset = Self::neutral();
        preset.main_out.gain = 1.1;
        preset.tune(FilterKind::Highpass, |f| {
            f.enabled = true;
            f.frequency = 180.0;
            f.q = Some(0.8);
        });
        preset.tune(FilterKind::Lowpass, |f| {
            f.enabled = true;
            f.frequency = 6000.0;
        });
        preset.tune(FilterKind::Peaking, |f| {
            f.enabled = true;
            f.gain_db = Some(3.0);
        });
        preset
    }

    /// Simulates basic hearing aid behavior
    pub fn hearing_aid() -> Self {
        let mut preset = Self::neutral();
        preset.main_out.gain = 1.3;
        preset.tune(FilterKind::Highpass, |f| {
            f.enabled = true;
            f.frequency = 70.0;
            f.q = Some(0.5);
        });
        preset.tune(FilterKind::Highshelf, |f| {
            f.enabled = true;
            f.frequency = 4000.0;
            f.gain_db = Some(6.0);
        });
        preset.tune(FilterKind::Peaking, |f| {
            f.enabled = true;
            f.frequency = 1500.0;
            f.gain_db = Some(3.0);
        });
        preset
    }

    /// Optimized for classical recordings
    pub fn classical_music() -> Self {
        let mut preset = Self::neutral();
        preset.tune(FilterKind::Lowshelf, |f| {
            f.enabled = true;
            f.frequency = 120.0;
            f.gain_db = Some(1.5);
        });
        preset.tune(FilterKind::Highshelf, |f| {
            f.enabled = true;
            f.frequency = 8000.0;
            f.gain_db = Some(2.0);
        });
        preset.tune(FilterKind::Peaking, |f| {
            f.enabled = true;
            f.frequency = 1800.0;
            f.gain_db = Some(-1.0);
        });
        preset
    }

    /// Tames tape hiss and harsh treble
    pub fn hiss_reduction() -> Self {
        let mut preset = Self::neutral();
        preset.main_out.gain = 1.1;
        preset.tune(FilterKind::Lowpass, |f| {
            f.enabled = true;
            f.frequency = 12000.0;
        });
        preset.tune(FilterKind::Highshelf, |f| {
            f.enabled = true;
            f.gain_db = Some(-6.0);
        });
        preset
    }

    /// All built-in presets by name
    pub fn factory() -> Vec<(&'static str, EqPreset)> {
        vec![
            ("Neutral", Self::neutral()),
            ("VoiceClarity", Self::voice_clarity()),
            ("BassBoost", Self::bass_boost()),
            ("Podcast", Self::podcast()),
            ("ReducedFatigue", Self::reduced_fatigue()),
            ("NoiseReduction", Self::noise_reduction()),
            ("HearingAid", Self::hearing_aid()),
            ("ClassicalMusic", Self::classical_music()),
            ("HissReduction", Self::hiss_reduction()),
        ]
    }

    /// Look up a factory preset by name
    pub fn by_name(name: &str) -> Option<EqPreset> {
        Self::factory()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, p)| p)
    }

    /// The template for one filter kind, if the preset carries it
    pub fn filter(&self, kind: FilterKind) -> Option<&FilterSpec> {
        self.filters.iter().find(|f| f.kind == kind)
    }

    pub fn filter_mut(&mut self, kind: FilterKind) -> Option<&mut FilterSpec> {
        self.filters.iter_mut().find(|f| f.kind == kind)
    }

    fn tune(&mut self, kind: FilterKind, f: impl FnOnce(&mut FilterSpec)) {
        if let Some(filter) = self.filter_mut(kind) {
            f(filter);
        }
    }

    /// Load a preset from a TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading preset");

        let contents = fs::read_to_string(path).await?;
        let preset: Self = toml::from_str(&contents)?;
        Ok(preset)
    }

    /// Save a preset to a TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Saving preset");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str).await?;
        Ok(())
    }
}

impl Default for EqPreset {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Default user preset directory (`~/.config/busker/presets` on Linux/Mac,
/// `%APPDATA%\busker\presets` on Windows)
pub fn default_preset_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join("busker").join("presets"))
        .ok_or_else(|| PresetError::Invalid("Could not determine config directory".to_string()))
}

/// Preset manager over a directory of TOML preset files
pub struct PresetManager {
    preset_dir: PathBuf,
}

impl PresetManager {
    pub fn new(preset_dir: PathBuf) -> Self {
        Self { preset_dir }
    }

    /// List all available presets
    #[instrument(skip(self))]
    pub async fn list_presets(&self) -> Result<Vec<String>> {
        let mut presets = Vec::new();

        let mut entries = fs::read_dir(&self.preset_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "toml").unwrap_or(false) {
                if let Some(name) = path.file_stem() {
                    if let Some(name_str) = name.to_str() {
                        presets.push(name_str.to_string());
                    }
                }
            }
        }

        presets.sort();
        debug!(count = presets.len(), "Listed presets");
        Ok(presets)
    }

    /// Load a preset by name
    #[instrument(skip(self))]
    pub async fn load_preset(&self, name: &str) -> Result<EqPreset> {
        let path = self.preset_dir.join(format!("{}.toml", name));

        if !path.exists() {
            return Err(PresetError::NotFound(name.to_string()));
        }

        EqPreset::load_from_file(&path).await
    }

    /// Save a preset by name
    #[instrument(skip(self, preset))]
    pub async fn save_preset(&self, name: &str, preset: &EqPreset) -> Result<()> {
        let path = self.preset_dir.join(format!("{}.toml", name));
        preset.save_to_file(&path).await
    }

    /// Delete a preset by name
    #[instrument(skip(self))]
    pub async fn delete_preset(&self, name: &str) -> Result<()> {
        let path = self.preset_dir.join(format!("{}.toml", name));

        if !path.exists() {
            return Err(PresetError::NotFound(name.to_string()));
        }

        fs::remove_file(&path).await?;
        info!(name, "Preset deleted");
        Ok(())
    }

    /// Check if a preset exists
    pub async fn preset_exists(&self, name: &str) -> bool {
        let path = self.preset_dir.join(format!("{}.toml", name));
        path.exists()
    }
}

/// File system watcher broadcasting preset hot-reload events
pub struct PresetWatcher {
    _watcher: notify::RecommendedWatcher,
    reload_tx: broadcast::Sender<PathBuf>,
}

impl PresetWatcher {
    /// Watch `preset_dir` for created/modified TOML files
    pub async fn new(preset_dir: PathBuf) -> Result<Self> {
        use notify::Watcher;

        let (reload_tx, _reload_rx) = broadcast::channel(32);

        fs::create_dir_all(&preset_dir).await?;

        let tx_clone = reload_tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                if matches!(
                    event.kind,
                    notify::EventKind::Create(_) | notify::EventKind::Modify(_)
                ) {
                    for path in event.paths {
                        if path.extension().and_then(|e| e.to_str()) == Some("toml") {
                            if let Err(e) = tx_clone.send(path) {
                                error!("Failed to send preset change event: {}", e);
                            }
                        }
                    }
                }
            }
        })?;

        watcher.watch(&preset_dir, notify::RecursiveMode::Recursive)?;

        info!(path = %preset_dir.display(), "Preset watcher started");

        Ok(Self {
            _watcher: watcher,
            reload_tx,
        })
    }

    /// Subscribe to preset change events
    pub fn subscribe(&self) -> broadcast::Receiver<PathBuf> {
        self.reload_tx.subscribe()
    }
}
