use serde::Deserialize;
use std::path::{Path, PathBuf};

use corona::visualizer::VisualizerKind;

const CONFIG_FILE_NAME: &str = "corona.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub visualizer: VisualizerSection,
    #[serde(default)]
    pub background: BackgroundSection,
    #[serde(default)]
    pub player: PlayerSection,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
}

#[derive(Debug, Deserialize)]
pub struct VisualizerSection {
    #[serde(default)]
    pub kind: VisualizerKind,
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_smoothing")]
    pub smoothing_time_constant: f32,
    #[serde(default = "default_padding")]
    pub padding: f32,
    #[serde(default = "default_line_width")]
    pub line_width: f32,
    #[serde(default = "default_glow_blur")]
    pub glow_blur: f32,
}

#[derive(Debug, Deserialize)]
pub struct BackgroundSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_gap")]
    pub gap: u32,
    #[serde(default = "default_background_speed")]
    pub speed: f32,
    #[serde(default = "default_background_opacity")]
    pub opacity: f32,
    /// `#rrggbb` colours; empty keeps the built-in palette.
    #[serde(default)]
    pub palette: Vec<String>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PlayerSection {
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Size of the player card the corona surrounds.
    #[serde(default = "default_player_size")]
    pub width: f32,
    #[serde(default = "default_player_size")]
    pub height: f32,
    #[serde(default)]
    pub font: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            crf: default_crf(),
            codec: default_codec(),
        }
    }
}

impl Default for VisualizerSection {
    fn default() -> Self {
        Self {
            kind: VisualizerKind::default(),
            fft_size: default_fft_size(),
            smoothing_time_constant: default_smoothing(),
            padding: default_padding(),
            line_width: default_line_width(),
            glow_blur: default_glow_blur(),
        }
    }
}

impl Default for BackgroundSection {
    fn default() -> Self {
        Self {
            enabled: true,
            gap: default_gap(),
            speed: default_background_speed(),
            opacity: default_background_opacity(),
            palette: Vec::new(),
            seed: None,
        }
    }
}

impl Default for PlayerSection {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            volume: default_volume(),
            width: default_player_size(),
            height: default_player_size(),
            font: None,
        }
    }
}

fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 720 }
fn default_fps() -> u32 { 30 }
fn default_crf() -> u32 { 18 }
fn default_codec() -> String { "libx264".into() }
fn default_fft_size() -> usize { 1024 }
fn default_smoothing() -> f32 { 0.8 }
fn default_padding() -> f32 { 50.0 }
fn default_line_width() -> f32 { 3.0 }
fn default_glow_blur() -> f32 { 15.0 }
fn default_true() -> bool { true }
fn default_gap() -> u32 { 10 }
fn default_background_speed() -> f32 { 0.05 }
fn default_background_opacity() -> f32 { 0.7 }
fn default_manifest() -> PathBuf { PathBuf::from("tracks.json") }
fn default_volume() -> f32 { 1.0 }
fn default_player_size() -> f32 { 320.0 }

/// `--config` if given, else `./corona.toml`, else the user config directory.
pub fn find_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("corona").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("corona").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}
