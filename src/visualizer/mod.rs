//! The audio-reactive visualizer: analysis tap, frequency shaping and the
//! selected renderer, owned by the host session.

use serde::Deserialize;

use crate::audio::analyser::{AnalyserError, AnalyserOptions};
use crate::audio::smoother::smooth_frequency_amplitudes;
use crate::audio::tap::{AnalysisSource, AudioSource, TapInit};
use crate::render::radial::{DrawOutcome, PlayerLayout, RadialRenderer, RadialStyle, SkipReason};
use crate::render::surface::Surface;

/// Rendering modes. Only the circle exists today.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum VisualizerKind {
    #[default]
    Circle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VisualizerConfig {
    pub kind: VisualizerKind,
    pub analyser: AnalyserOptions,
    pub radial: RadialStyle,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            kind: VisualizerKind::Circle,
            analyser: AnalyserOptions::default(),
            radial: RadialStyle::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisualizerState {
    /// No analysis tap yet; ticks draw nothing.
    Inactive,
    /// Tap attached; every tick captures and draws.
    Active,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Drawn { strokes: usize },
    /// Nothing was drawn; whatever the surface held before is kept.
    Skipped(SkipReason),
}

enum Renderer {
    Circle(RadialRenderer),
}

pub struct Visualizer {
    kind: VisualizerKind,
    source: AnalysisSource,
    renderer: Renderer,
    layout: PlayerLayout,
    state: VisualizerState,
}

impl Visualizer {
    pub fn new(config: VisualizerConfig, layout: PlayerLayout) -> Result<Self, AnalyserError> {
        let renderer = match config.kind {
            VisualizerKind::Circle => Renderer::Circle(RadialRenderer::new(config.radial)),
        };
        Ok(Self {
            kind: config.kind,
            source: AnalysisSource::new(config.analyser)?,
            renderer,
            layout,
            state: VisualizerState::Inactive,
        })
    }

    pub fn state(&self) -> VisualizerState {
        self.state
    }

    /// Attach to the playing transport. Safe to call on every play: after the
    /// first success it only makes sure the tap is running.
    pub fn init(&mut self, source: &dyn AudioSource) -> TapInit {
        let result = self.source.init(source);
        if result == TapInit::Created {
            log::info!("Visualizer active ({:?})", self.kind);
            self.state = VisualizerState::Active;
        }
        result
    }

    /// Pause analysis, e.g. while the host is hidden. The next `init` resumes.
    pub fn suspend(&mut self) {
        self.source.suspend();
    }

    /// Replace the cached player bounds after the host re-laid out.
    pub fn on_layout_change(&mut self, layout: PlayerLayout) {
        log::debug!("Player layout changed: {}x{}", layout.width, layout.height);
        self.layout = layout;
    }

    /// One frame: capture, shape, draw, in that order.
    pub fn tick(&mut self, source: &dyn AudioSource, surface: &mut dyn Surface) -> TickOutcome {
        let Some(snapshot) = self.source.capture(source) else {
            log::trace!("No analysis snapshot, skipping tick");
            return TickOutcome::Skipped(SkipReason::NoSnapshot);
        };

        let amplitudes = smooth_frequency_amplitudes(snapshot);

        let outcome = match &self.renderer {
            Renderer::Circle(radial) => radial.draw(surface, &amplitudes, &self.layout),
        };
        match outcome {
            DrawOutcome::Drawn { strokes } => TickOutcome::Drawn { strokes },
            DrawOutcome::Skipped(reason) => TickOutcome::Skipped(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tap::tests::FakeSource;
    use crate::render::radial::tests::{Call, RecordingSurface};

    fn visualizer() -> Visualizer {
        Visualizer::new(VisualizerConfig::default(), PlayerLayout::new(300.0, 300.0)).unwrap()
    }

    #[test]
    fn stays_inactive_until_playback_starts() {
        let mut vis = visualizer();
        let mut surface = RecordingSurface::default();
        let quiet = FakeSource::silent();

        assert_eq!(vis.init(&quiet), TapInit::Deferred);
        for _ in 0..10 {
            assert_eq!(
                vis.tick(&quiet, &mut surface),
                TickOutcome::Skipped(SkipReason::NoSnapshot)
            );
        }
        assert_eq!(vis.state(), VisualizerState::Inactive);
        assert!(surface.calls.is_empty());
    }

    #[test]
    fn second_init_keeps_single_tap() {
        let mut vis = visualizer();
        let fake = FakeSource::tone(20, 1024);
        assert_eq!(vis.init(&fake), TapInit::Created);
        assert_eq!(vis.init(&fake), TapInit::Resumed);
        assert_eq!(vis.state(), VisualizerState::Active);

        let mut surface = RecordingSurface::default();
        assert_eq!(vis.tick(&fake, &mut surface), TickOutcome::Drawn { strokes: 256 });
        // One clear per tick means one rendering pass.
        let clears = surface.calls.iter().filter(|c| **c == Call::Clear).count();
        assert_eq!(clears, 1);
    }

    #[test]
    fn never_returns_to_inactive() {
        let mut vis = visualizer();
        let fake = FakeSource::tone(20, 1024);
        vis.init(&fake);
        vis.suspend();
        vis.init(&FakeSource::silent());
        assert_eq!(vis.state(), VisualizerState::Active);
    }

    #[test]
    fn silence_draws_zero_length_strokes() {
        let mut vis = visualizer();
        let mut fake = FakeSource::tone(20, 1024);
        fake.gain = 0.0;
        vis.init(&fake);

        let mut surface = RecordingSurface::default();
        vis.tick(&fake, &mut surface);
        for call in &surface.calls {
            if let Call::Line { from, to, .. } = call {
                assert_eq!(from, to);
            }
        }
    }

    #[test]
    fn unlaid_out_player_skips_and_retains_surface() {
        let mut vis = visualizer();
        let fake = FakeSource::tone(20, 1024);
        vis.init(&fake);
        vis.on_layout_change(PlayerLayout::new(0.0, 0.0));

        let mut surface = RecordingSurface::default();
        assert_eq!(
            vis.tick(&fake, &mut surface),
            TickOutcome::Skipped(SkipReason::NoLayout)
        );
        assert!(surface.calls.is_empty());

        vis.on_layout_change(PlayerLayout::new(200.0, 120.0));
        assert!(matches!(vis.tick(&fake, &mut surface), TickOutcome::Drawn { .. }));
    }
}
