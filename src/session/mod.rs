//! Headless host: a fixed-rate tick loop that plays the manifest and records
//! the layered player frame.

pub mod frame_loop;

pub use frame_loop::{FrameLoop, Tick};

use anyhow::Result;
use std::ops::ControlFlow;
use std::path::PathBuf;

use crate::audio::tap::TapInit;
use crate::player::{format_time, PlayOutcome, Transport, TransportEvent};
use crate::render::background::{BackgroundAnimation, BackgroundOptions};
use crate::render::canvas::Canvas;
use crate::render::surface::Rgba;
use crate::render::text::TextOverlay;
use crate::visualizer::{TickOutcome, Visualizer};

/// Receives every finished frame as tightly packed RGBA.
pub trait FrameSink {
    fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()>;
}

/// Page colour behind every layer.
const PAGE_COLOR: Rgba = Rgba::new(0x12, 0x12, 0x12, 1.0);
const CAPTION_COLOR: Rgba = Rgba::new(255, 255, 255, 0.86);
const IDLE_SECONDS: f64 = 5.0;

#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub track: usize,
    pub start_delay: f64,
    pub max_seconds: Option<f64>,
    pub continuous: bool,
    pub volume: f32,
    pub background: Option<BackgroundOptions>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub drawn: u64,
    pub skipped: u64,
}

pub struct PlayerSession {
    options: SessionOptions,
    transport: Transport,
    visualizer: Visualizer,
    background: Option<BackgroundAnimation>,
    caption: Option<TextOverlay>,
    background_layer: Canvas,
    visualizer_layer: Canvas,
    frame: Canvas,
    play_attempted: bool,
    finished: bool,
    stats: SessionStats,
}

impl PlayerSession {
    pub fn new(
        options: SessionOptions,
        mut transport: Transport,
        visualizer: Visualizer,
        caption: Option<TextOverlay>,
    ) -> Self {
        let (width, height) = (options.width, options.height);
        let background = options
            .background
            .clone()
            .map(|bg| BackgroundAnimation::new(bg, width, height));

        transport.set_volume(options.volume);
        transport.load_track(options.track);

        Self {
            options,
            transport,
            visualizer,
            background,
            caption,
            background_layer: Canvas::new(width, height),
            visualizer_layer: Canvas::new(width, height),
            frame: Canvas::new(width, height),
            play_attempted: false,
            finished: false,
            stats: SessionStats::default(),
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn visualizer(&self) -> &Visualizer {
        &self.visualizer
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Estimated session length, used for progress reporting.
    pub fn expected_duration(&self) -> f64 {
        let natural = if self.transport.duration() > 0.0 {
            self.options.start_delay + self.transport.duration()
        } else {
            self.options.start_delay.max(IDLE_SECONDS)
        };
        self.options.max_seconds.unwrap_or(natural)
    }

    /// The track whose audio belongs under the recording, if there is exactly one.
    pub fn soundtrack(&self) -> Option<PathBuf> {
        if self.options.continuous || self.transport.duration() <= 0.0 {
            return None;
        }
        let track = self.transport.current_track()?;
        self.transport.playlist().resolve(track)
    }

    fn press_play(&mut self) {
        self.play_attempted = true;
        match self.transport.play() {
            PlayOutcome::Playing => {
                if self.visualizer.init(&self.transport) == TapInit::Deferred {
                    log::warn!("Playback started but no audio output to analyse");
                }
            }
            PlayOutcome::NoSource => log::info!("Nothing to play"),
            PlayOutcome::Failed => log::warn!("Current track could not be played"),
        }
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::TimeUpdate { .. } => {}
            TransportEvent::Ended { index } => {
                log::info!("Track {} ended", index);
                if self.options.continuous {
                    if self.transport.next_track() == PlayOutcome::Playing {
                        self.visualizer.init(&self.transport);
                    }
                } else {
                    self.finished = true;
                }
            }
        }
    }

    fn time_is_up(&self, time: f64) -> bool {
        match self.options.max_seconds {
            Some(max) => time >= max,
            // Without a playable track nothing would ever end the session.
            None => self.transport.duration() <= 0.0 && time >= self.expected_duration(),
        }
    }

    /// Run one tick and return the composed frame, or `None` once the session
    /// has ended.
    pub fn tick(&mut self, tick: Tick) -> Option<&[u8]> {
        if self.finished || self.time_is_up(tick.time) {
            return None;
        }

        if !self.play_attempted && tick.time >= self.options.start_delay {
            self.press_play();
        }

        if let Some(background) = self.background.as_mut() {
            background.tick(tick.time * 1000.0, &mut self.background_layer);
        }

        match self.visualizer.tick(&self.transport, &mut self.visualizer_layer) {
            TickOutcome::Drawn { .. } => self.stats.drawn += 1,
            TickOutcome::Skipped(_) => self.stats.skipped += 1,
        }

        self.compose();
        self.stats.frames += 1;

        // Move the playhead to where the next tick will find it.
        for event in self.transport.advance(tick.dt) {
            self.on_transport_event(event);
        }

        Some(self.frame.pixels())
    }

    fn compose(&mut self) {
        self.frame.fill(PAGE_COLOR);
        if let Some(background) = self.background.as_ref() {
            self.frame.composite(&self.background_layer, background.opacity());
        }
        self.frame.composite(&self.visualizer_layer, 1.0);

        let Some(caption) = self.caption.as_ref() else {
            return;
        };
        let Some(track) = self.transport.current_track() else {
            return;
        };

        let line = caption.line_height() as i32;
        let center_y = self.options.height as i32 / 2;
        caption.draw_centered(&mut self.frame, &track.title, center_y - line, CAPTION_COLOR);
        caption.draw_centered(&mut self.frame, &track.artist, center_y, CAPTION_COLOR.with_alpha(0.6));

        if track.has_source() {
            let time = format!(
                "{} / {}",
                format_time(self.transport.current_time()),
                format_time(self.transport.duration())
            );
            caption.draw_centered(&mut self.frame, &time, center_y + line, CAPTION_COLOR.with_alpha(0.6));
        }
    }
}

/// Drive `session` until it ends, handing every frame to `sink`.
pub fn run_session(
    session: &mut PlayerSession,
    sink: &mut dyn FrameSink,
    mut on_frame: impl FnMut(u64),
) -> Result<SessionStats> {
    let mut frame_loop = FrameLoop::new(session.options.fps);
    let mut result = Ok(());

    frame_loop.run(|tick| {
        let Some(frame) = session.tick(tick) else {
            return ControlFlow::Break(());
        };
        if let Err(err) = sink.write_frame(frame) {
            result = Err(err);
            return ControlFlow::Break(());
        }
        on_frame(tick.index + 1);
        ControlFlow::Continue(())
    });

    result?;
    let stats = session.stats();
    log::info!(
        "Session finished: {} frames ({} drawn, {} skipped)",
        stats.frames,
        stats.drawn,
        stats.skipped
    );
    Ok(stats)
}
