use clap::{Parser, Subcommand};
use std::path::PathBuf;

use corona::visualizer::VisualizerKind;

#[derive(Parser, Debug)]
#[command(name = "corona", about = "MP3 player session with an audio-reactive corona visualizer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a directory for MP3 files and write the track manifest
    Manifest(ManifestArgs),
    /// Play the manifest headlessly and record the visualizer to a video
    Render(RenderArgs),
}

#[derive(clap::Args, Debug)]
pub struct ManifestArgs {
    /// Directory to scan recursively
    #[arg(long, default_value = "audio")]
    pub audio_dir: PathBuf,

    /// Manifest file to write
    #[arg(short, long, default_value = "tracks.json")]
    pub output: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    /// Track manifest produced by `corona manifest`
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Output video file
    #[arg(short, long, default_value = "corona.mp4")]
    pub output: PathBuf,

    /// Config file (defaults to ./corona.toml or the user config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Index of the track to start with
    #[arg(long, default_value_t = 0)]
    pub track: usize,

    /// Seconds of idle player before pressing play
    #[arg(long, default_value_t = 0.0)]
    pub start_delay: f64,

    /// Stop recording after this many seconds
    #[arg(long)]
    pub max_seconds: Option<f64>,

    /// Keep playing the next track when one ends (audio is not muxed)
    #[arg(long)]
    pub continuous: bool,

    /// Playback volume (0.0-1.0)
    #[arg(long, default_value_t = 1.0)]
    pub volume: f32,

    /// Visualizer mode
    #[arg(long, value_enum, default_value_t = VisualizerKind::Circle)]
    pub visualizer: VisualizerKind,

    /// TTF/OTF font used for the track caption
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Disable the shimmering background
    #[arg(long)]
    pub no_background: bool,

    /// Video width in pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Video height in pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Frames per second
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// H.264 CRF quality (0-51, lower = better). Ignored when --bitrate is set.
    #[arg(long, default_value_t = 18)]
    pub crf: u32,

    /// Video bitrate (e.g. 2400k, 5M). When set, uses -b:v instead of -crf.
    #[arg(short, long)]
    pub bitrate: Option<String>,

    /// FFmpeg video codec
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// FFmpeg pixel format
    #[arg(long, default_value = "yuv420p")]
    pub pix_fmt: String,
}
