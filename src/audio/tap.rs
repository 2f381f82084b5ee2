use super::analyser::{Analyser, AnalyserError, AnalyserOptions};
use super::decode::AudioData;

/// What a playing transport currently feeds to its output.
#[derive(Clone, Copy, Debug)]
pub struct PlaybackOutput<'a> {
    pub audio: &'a AudioData,
    /// Sample index of the playhead.
    pub position: usize,
    /// Linear gain applied to the output (volume, zero when muted).
    pub gain: f32,
}

/// Anything whose audible output can be tapped for analysis.
pub trait AudioSource {
    /// `None` until the source has produced audio at least once.
    fn output(&self) -> Option<PlaybackOutput<'_>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapState {
    Running,
    Suspended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapInit {
    /// A tap was created by this call.
    Created,
    /// A tap already existed; it is now running.
    Resumed,
    /// The source has no output yet; try again later.
    Deferred,
}

/// The single analysis tap of a session.
#[derive(Debug)]
pub struct AnalysisTap {
    analyser: Analyser,
    snapshot: Vec<u8>,
    window: Vec<f32>,
    state: TapState,
}

impl AnalysisTap {
    fn new(options: AnalyserOptions) -> Result<Self, AnalyserError> {
        let analyser = Analyser::new(options)?;
        Ok(Self {
            snapshot: vec![0; analyser.frequency_bin_count()],
            window: vec![0.0; analyser.fft_size()],
            analyser,
            state: TapState::Running,
        })
    }

    pub fn state(&self) -> TapState {
        self.state
    }

    /// Refresh the snapshot in place from the source's current output.
    ///
    /// A suspended tap, or a source that went quiet, leaves the previous
    /// snapshot untouched.
    fn refresh(&mut self, source: &dyn AudioSource) {
        if self.state == TapState::Suspended {
            return;
        }
        let Some(output) = source.output() else {
            return;
        };
        output
            .audio
            .window_ending_at(output.position, output.gain, &mut self.window);
        self.analyser
            .byte_frequency_data(&self.window, &mut self.snapshot);
    }
}

/// Owner of the optional tap. Created empty; the tap appears on the first
/// successful [`AnalysisSource::init`] and lives for the rest of the session.
#[derive(Debug)]
pub struct AnalysisSource {
    options: AnalyserOptions,
    tap: Option<AnalysisTap>,
}

impl AnalysisSource {
    pub fn new(options: AnalyserOptions) -> Result<Self, AnalyserError> {
        options.validate()?;
        Ok(Self { options, tap: None })
    }

    pub fn is_attached(&self) -> bool {
        self.tap.is_some()
    }

    pub fn tap(&self) -> Option<&AnalysisTap> {
        self.tap.as_ref()
    }

    /// Attach to `source`. Idempotent: once a tap exists this only resumes it.
    pub fn init(&mut self, source: &dyn AudioSource) -> TapInit {
        if let Some(tap) = self.tap.as_mut() {
            if tap.state == TapState::Suspended {
                log::debug!("Resuming suspended analysis tap");
            }
            tap.state = TapState::Running;
            return TapInit::Resumed;
        }

        if source.output().is_none() {
            log::debug!("Audio output not available yet, deferring analysis tap");
            return TapInit::Deferred;
        }

        match AnalysisTap::new(self.options) {
            Ok(tap) => {
                log::info!(
                    "Analysis tap attached: fft_size={}, bins={}",
                    self.options.fft_size,
                    tap.snapshot.len()
                );
                self.tap = Some(tap);
                TapInit::Created
            }
            // Options were validated in `new`, so this only guards the invariant.
            Err(err) => {
                log::warn!("Failed to create analysis tap: {}", err);
                TapInit::Deferred
            }
        }
    }

    pub fn suspend(&mut self) {
        if let Some(tap) = self.tap.as_mut() {
            tap.state = TapState::Suspended;
        }
    }

    /// Capture a snapshot for this tick, or `None` when nothing is attached.
    pub fn capture(&mut self, source: &dyn AudioSource) -> Option<&[u8]> {
        let tap = self.tap.as_mut()?;
        tap.refresh(source);
        Some(&tap.snapshot)
    }
}
