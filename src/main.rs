mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use cli::{Cli, Command, ManifestArgs, RenderArgs};
use corona::audio::analyser::AnalyserOptions;
use corona::encode::ffmpeg::{AudioInput, EncoderSettings, FfmpegEncoder};
use corona::manifest;
use corona::player::{SymphoniaLoader, Transport};
use corona::render::background::BackgroundOptions;
use corona::render::radial::{PlayerLayout, RadialStyle};
use corona::render::surface::Rgba;
use corona::render::text::TextOverlay;
use corona::session::{self, PlayerSession, SessionOptions};
use corona::visualizer::{Visualizer, VisualizerConfig, VisualizerKind};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Manifest(args) => generate(args),
        Command::Render(args) => render(args),
    }
}

fn generate(args: ManifestArgs) -> Result<()> {
    let count = manifest::generate_manifest(&args.audio_dir, &args.output)
        .with_context(|| format!("Failed to generate {}", args.output.display()))?;
    println!("Generated {} with {} tracks", args.output.display(), count);
    Ok(())
}

fn render(mut args: RenderArgs) -> Result<()> {
    let config_path = config::find_config_path(args.config.as_deref());
    let cfg = match config_path {
        Some(ref path) => match config::load_config(path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                config::Config::default()
            }
        },
        None => config::Config::default(),
    };

    // Merge: config values apply only when CLI is at its default
    if args.width == 1280 { args.width = cfg.output.width; }
    if args.height == 720 { args.height = cfg.output.height; }
    if args.fps == 30 { args.fps = cfg.output.fps; }
    if args.crf == 18 { args.crf = cfg.output.crf; }
    if args.codec == "libx264" { args.codec = cfg.output.codec.clone(); }
    if args.volume == 1.0 { args.volume = cfg.player.volume; }
    if args.visualizer == VisualizerKind::Circle { args.visualizer = cfg.visualizer.kind; }
    if args.font.is_none() { args.font = cfg.player.font.clone(); }
    let manifest_path = args.manifest.clone().unwrap_or_else(|| cfg.player.manifest.clone());

    if args.continuous && args.max_seconds.is_none() {
        anyhow::bail!("--continuous plays forever; pass --max-seconds as well");
    }

    log::info!("corona - player session recorder");
    log::info!("Manifest: {}", manifest_path.display());
    log::info!("Output: {}", args.output.display());
    log::info!("Resolution: {}x{} @ {}fps", args.width, args.height, args.fps);

    // 1. Tracks and transport
    let playlist = manifest::load_manifest(&manifest_path);
    if args.track >= playlist.len().max(1) {
        anyhow::bail!("Track {} out of range ({} tracks)", args.track, playlist.len());
    }
    let transport = Transport::new(playlist, Box::new(SymphoniaLoader));

    // 2. Visualizer
    let visualizer_config = VisualizerConfig {
        kind: args.visualizer,
        analyser: AnalyserOptions {
            fft_size: cfg.visualizer.fft_size,
            smoothing_time_constant: cfg.visualizer.smoothing_time_constant,
            ..Default::default()
        },
        radial: RadialStyle {
            padding: cfg.visualizer.padding,
            line_width: cfg.visualizer.line_width,
            glow_blur: cfg.visualizer.glow_blur,
            ..Default::default()
        },
    };
    let layout = PlayerLayout::new(cfg.player.width, cfg.player.height);
    let visualizer = Visualizer::new(visualizer_config, layout)
        .context("Invalid visualizer configuration")?;

    // 3. Background and caption
    let background = (!args.no_background && cfg.background.enabled).then(|| {
        let mut options = BackgroundOptions {
            gap: cfg.background.gap,
            speed: cfg.background.speed,
            opacity: cfg.background.opacity,
            seed: cfg.background.seed,
            ..Default::default()
        };
        let palette: Vec<Rgba> = cfg
            .background
            .palette
            .iter()
            .filter_map(|hex| {
                let color = Rgba::from_hex(hex);
                if color.is_none() {
                    log::warn!("Ignoring invalid palette colour: {}", hex);
                }
                color
            })
            .collect();
        if !palette.is_empty() {
            options.palette = palette;
        }
        options
    });

    let caption = match args.font {
        Some(ref path) => {
            let font_size = (args.width.min(args.height) as f32 * 0.04).max(16.0);
            match TextOverlay::from_file(path, font_size) {
                Ok(overlay) => Some(overlay),
                Err(err) => {
                    log::warn!("Caption disabled: {:#}", err);
                    None
                }
            }
        }
        None => None,
    };

    let mut session = PlayerSession::new(
        SessionOptions {
            width: args.width,
            height: args.height,
            fps: args.fps,
            track: args.track,
            start_delay: args.start_delay.max(0.0),
            max_seconds: args.max_seconds,
            continuous: args.continuous,
            volume: args.volume,
            background,
        },
        transport,
        visualizer,
        caption,
    );

    if let Some(track) = session.transport().current_track() {
        log::info!("Track: {} - {}", track.artist, track.title);
    }

    // 4. Encoder
    let audio = session.soundtrack().map(|path| AudioInput {
        path,
        offset: args.start_delay.max(0.0),
    });
    let mut encoder = FfmpegEncoder::new(
        &args.output,
        audio.as_ref(),
        &EncoderSettings {
            width: args.width,
            height: args.height,
            fps: args.fps,
            codec: args.codec.clone(),
            pix_fmt: args.pix_fmt.clone(),
            crf: args.crf,
            bitrate: args.bitrate.clone(),
        },
    )?;

    // 5. Tick loop
    let total_frames = (session.expected_duration() * args.fps as f64).ceil() as u64;
    let pb = ProgressBar::new(total_frames);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );

    let stats = session::run_session(&mut session, &mut encoder, |frame| pb.set_position(frame))?;
    pb.finish_with_message("Rendering complete");

    // 6. Finish encoding
    log::info!("Finishing encoding...");
    encoder.finish()?;

    log::info!("Done! {} frames written to {}", stats.frames, args.output.display());
    Ok(())
}
