use anyhow::Result;
use std::path::Path;

use crate::audio::decode::{decode_audio, AudioData};
use crate::audio::tap::{AudioSource, PlaybackOutput};
use crate::manifest::{Playlist, TrackDescriptor};

/// Slack for accumulated tick rounding when detecting the end of a track.
const END_EPSILON: f64 = 1e-6;

/// Turns a track path into PCM. The default decodes with symphonia.
pub trait TrackLoader {
    fn load(&self, path: &Path) -> Result<AudioData>;
}

pub struct SymphoniaLoader;

impl TrackLoader for SymphoniaLoader {
    fn load(&self, path: &Path) -> Result<AudioData> {
        decode_audio(path)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    TimeUpdate { current: f64, duration: f64 },
    Ended { index: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayOutcome {
    Playing,
    /// The current descriptor has nothing to play (empty playlist or placeholder).
    NoSource,
    /// The track could not be decoded.
    Failed,
}

struct LoadedTrack {
    index: usize,
    audio: Option<AudioData>,
}

/// A single media element driven by the session clock.
pub struct Transport {
    playlist: Playlist,
    loader: Box<dyn TrackLoader>,
    current_index: usize,
    loaded: Option<LoadedTrack>,
    position: f64,
    paused: bool,
    volume: f32,
    previous_volume: f32,
    started: bool,
}

impl Transport {
    pub fn new(playlist: Playlist, loader: Box<dyn TrackLoader>) -> Self {
        Self {
            playlist,
            loader,
            current_index: 0,
            loaded: None,
            position: 0.0,
            paused: true,
            volume: 1.0,
            previous_volume: 1.0,
            started: false,
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_track(&self) -> Option<&TrackDescriptor> {
        self.playlist.get(self.current_index)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn current_time(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.audio().map_or(0.0, AudioData::duration)
    }

    /// Fraction of the track played, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        let duration = self.duration();
        if duration > 0.0 {
            (self.position / duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.volume == 0.0
    }

    fn audio(&self) -> Option<&AudioData> {
        self.loaded.as_ref().and_then(|t| t.audio.as_ref())
    }

    /// Point the element at track `index` and rewind. Playback is paused
    /// until the next [`Transport::play`].
    pub fn load_track(&mut self, index: usize) {
        let Some(track) = self.playlist.get(index) else {
            return;
        };

        self.current_index = index;
        self.position = 0.0;
        self.paused = true;

        let audio = match self.playlist.resolve(track) {
            Some(path) => match self.loader.load(&path) {
                Ok(audio) => Some(audio),
                Err(err) => {
                    log::warn!("Failed to load track {} ({}): {:#}", index, track.src, err);
                    None
                }
            },
            None => None,
        };

        log::info!("Loaded track {}: {} - {}", index, track.artist, track.title);
        self.loaded = Some(LoadedTrack { index, audio });
    }

    pub fn play(&mut self) -> PlayOutcome {
        let has_source = self.current_track().map_or(false, TrackDescriptor::has_source);
        if !has_source {
            return PlayOutcome::NoSource;
        }
        if self.loaded.as_ref().map(|t| t.index) != Some(self.current_index) {
            self.load_track(self.current_index);
        }
        if self.audio().is_none() {
            return PlayOutcome::Failed;
        }
        // An ended track starts over.
        if self.position >= self.duration() - END_EPSILON {
            self.position = 0.0;
        }
        self.paused = false;
        self.started = true;
        PlayOutcome::Playing
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Play when paused, pause when playing. Returns `None` after pausing.
    pub fn toggle_play(&mut self) -> Option<PlayOutcome> {
        if self.paused {
            Some(self.play())
        } else {
            self.pause();
            None
        }
    }

    pub fn next_track(&mut self) -> PlayOutcome {
        if self.playlist.is_empty() {
            return PlayOutcome::NoSource;
        }
        let index = (self.current_index + 1) % self.playlist.len();
        self.load_track(index);
        self.play()
    }

    pub fn previous_track(&mut self) -> PlayOutcome {
        if self.playlist.is_empty() {
            return PlayOutcome::NoSource;
        }
        let len = self.playlist.len();
        let index = (self.current_index + len - 1) % len;
        self.load_track(index);
        self.play()
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn toggle_mute(&mut self) {
        if self.is_muted() {
            self.volume = self.previous_volume;
        } else {
            self.previous_volume = self.volume;
            self.volume = 0.0;
        }
    }

    /// Jump to `fraction` of the track, as a click on the progress bar does.
    pub fn seek_fraction(&mut self, fraction: f64) {
        self.position = fraction.clamp(0.0, 1.0) * self.duration();
    }

    /// Move the playhead forward by `dt` seconds of wall time.
    pub fn advance(&mut self, dt: f64) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        if self.paused {
            return events;
        }
        let duration = self.duration();

        self.position = (self.position + dt).min(duration);
        events.push(TransportEvent::TimeUpdate {
            current: self.position,
            duration,
        });

        if self.position >= duration - END_EPSILON {
            self.position = duration;
            self.paused = true;
            events.push(TransportEvent::Ended {
                index: self.current_index,
            });
        }
        events
    }
}

impl AudioSource for Transport {
    fn output(&self) -> Option<PlaybackOutput<'_>> {
        if !self.started {
            return None;
        }
        let audio = self.audio()?;
        Some(PlaybackOutput {
            audio,
            position: audio.sample_at(self.position),
            // A paused element outputs silence.
            gain: if self.paused { 0.0 } else { self.volume },
        })
    }
}

/// `m:ss`, as shown next to the progress bar.
pub fn format_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let minutes = (seconds / 60.0).floor() as u64;
    let remaining = (seconds % 60.0).floor() as u64;
    format!("{}:{:02}", minutes, remaining)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::bail;

    /// Decodes every path to one second of a quiet tone; paths containing
    /// "broken" fail.
    pub(crate) struct ToneLoader;

    impl TrackLoader for ToneLoader {
        fn load(&self, path: &Path) -> Result<AudioData> {
            if path.to_string_lossy().contains("broken") {
                bail!("cannot decode {}", path.display());
            }
            let sample_rate = 8000;
            let samples = (0..sample_rate)
                .map(|i| 0.5 * (i as f32 * 0.3).sin())
                .collect();
            Ok(AudioData {
                samples,
                sample_rate,
            })
        }
    }

    fn track(name: &str) -> TrackDescriptor {
        TrackDescriptor {
            title: name.into(),
            artist: "Artist".into(),
            src: format!("audio/{}.mp3", name),
        }
    }

    pub(crate) fn transport_with(names: &[&str]) -> Transport {
        let playlist = Playlist::new(names.iter().map(|n| track(n)).collect(), "/music");
        let mut transport = Transport::new(playlist, Box::new(ToneLoader));
        transport.load_track(0);
        transport
    }

    #[test]
    fn no_output_before_first_play() {
        let transport = transport_with(&["a"]);
        assert!(transport.output().is_none());
        assert!(transport.is_paused());
    }

    #[test]
    fn play_produces_output() {
        let mut transport = transport_with(&["a"]);
        assert_eq!(transport.play(), PlayOutcome::Playing);
        let output = transport.output().unwrap();
        assert_eq!(output.gain, 1.0);
        assert_eq!(output.position, 0);
    }

    #[test]
    fn paused_output_is_silent() {
        let mut transport = transport_with(&["a"]);
        transport.play();
        assert_eq!(transport.toggle_play(), None);
        assert_eq!(transport.output().unwrap().gain, 0.0);
    }

    #[test]
    fn next_and_previous_wrap() {
        let mut transport = transport_with(&["a", "b", "c"]);
        assert_eq!(transport.previous_track(), PlayOutcome::Playing);
        assert_eq!(transport.current_index(), 2);
        transport.next_track();
        assert_eq!(transport.current_index(), 0);
        assert!(!transport.is_paused());
    }

    #[test]
    fn placeholder_cannot_play() {
        let playlist = Playlist::new(vec![TrackDescriptor::placeholder()], "");
        let mut transport = Transport::new(playlist, Box::new(ToneLoader));
        transport.load_track(0);
        assert_eq!(transport.play(), PlayOutcome::NoSource);
        assert!(transport.output().is_none());
    }

    #[test]
    fn empty_playlist_cannot_play() {
        let mut transport = Transport::new(Playlist::new(Vec::new(), ""), Box::new(ToneLoader));
        transport.load_track(0);
        assert_eq!(transport.play(), PlayOutcome::NoSource);
        assert_eq!(transport.next_track(), PlayOutcome::NoSource);
    }

    #[test]
    fn undecodable_track_fails_to_play() {
        let mut transport = transport_with(&["broken"]);
        assert_eq!(transport.play(), PlayOutcome::Failed);
        assert!(transport.output().is_none());
    }

    #[test]
    fn mute_restores_previous_volume() {
        let mut transport = transport_with(&["a"]);
        transport.set_volume(0.6);
        transport.toggle_mute();
        assert!(transport.is_muted());
        transport.toggle_mute();
        assert_eq!(transport.volume(), 0.6);
        transport.set_volume(3.0);
        assert_eq!(transport.volume(), 1.0);
    }

    #[test]
    fn advance_reports_time_and_end() {
        let mut transport = transport_with(&["a", "b"]);
        transport.play();
        let events = transport.advance(0.25);
        assert_eq!(
            events,
            vec![TransportEvent::TimeUpdate {
                current: 0.25,
                duration: 1.0
            }]
        );
        assert_eq!(transport.progress(), 0.25);

        let events = transport.advance(2.0);
        assert_eq!(events.last(), Some(&TransportEvent::Ended { index: 0 }));
        assert!(transport.is_paused());
        assert!(transport.advance(0.1).is_empty());
    }

    #[test]
    fn play_after_end_starts_over() {
        let mut transport = transport_with(&["a"]);
        transport.play();
        transport.advance(2.0);
        assert_eq!(transport.current_time(), 1.0);

        assert_eq!(transport.play(), PlayOutcome::Playing);
        assert_eq!(transport.current_time(), 0.0);
        let events = transport.advance(0.25);
        assert!(!events.contains(&TransportEvent::Ended { index: 0 }));
    }

    #[test]
    fn seek_uses_fraction_of_duration() {
        let mut transport = transport_with(&["a"]);
        transport.seek_fraction(0.5);
        assert_eq!(transport.current_time(), 0.5);
        transport.seek_fraction(7.0);
        assert_eq!(transport.current_time(), 1.0);
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(600.0), "10:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }
}
