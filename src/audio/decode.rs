use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Mono PCM of one decoded track.
#[derive(Clone, Debug)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Sample index closest to `seconds`, clamped to the track length.
    pub fn sample_at(&self, seconds: f64) -> usize {
        let idx = (seconds.max(0.0) * self.sample_rate as f64) as usize;
        idx.min(self.samples.len())
    }

    /// Fill `out` with the samples that end at `end`, scaled by `gain`.
    /// Positions before the start of the track read as silence.
    pub fn window_ending_at(&self, end: usize, gain: f32, out: &mut [f32]) {
        let end = end.min(self.samples.len());
        let len = out.len();
        for (i, slot) in out.iter_mut().enumerate() {
            let back = len - i;
            *slot = match end.checked_sub(back) {
                Some(idx) => self.samples[idx] * gain,
                None => 0.0,
            };
        }
    }
}

pub fn decode_audio(path: &Path) -> Result<AudioData> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio format")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio tracks found")?;

    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // MP3 streams commonly carry a few corrupt frames; skip them.
            Err(symphonia::core::errors::Error::DecodeError(err)) => {
                log::debug!("Skipping undecodable packet: {}", err);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);

        if channels == 1 {
            samples.extend_from_slice(buf.samples());
        } else {
            samples.extend(
                buf.samples()
                    .chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        }
    }

    let audio = AudioData {
        samples,
        sample_rate,
    };

    log::info!(
        "Decoded {}: {} samples, {}Hz, {:.1}s",
        path.display(),
        audio.samples.len(),
        sample_rate,
        audio.duration()
    );

    Ok(audio)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> AudioData {
        AudioData {
            samples: (1..=8).map(|v| v as f32).collect(),
            sample_rate: 4,
        }
    }

    #[test]
    fn window_pads_before_track_start() {
        let mut out = [9.0f32; 4];
        ramp().window_ending_at(2, 1.0, &mut out);
        assert_eq!(out, [0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn window_applies_gain_and_clamps_end() {
        let mut out = [0.0f32; 3];
        ramp().window_ending_at(100, 0.5, &mut out);
        assert_eq!(out, [3.0, 3.5, 4.0]);
    }

    #[test]
    fn sample_at_clamps() {
        let audio = ramp();
        assert_eq!(audio.duration(), 2.0);
        assert_eq!(audio.sample_at(0.5), 2);
        assert_eq!(audio.sample_at(10.0), 8);
        assert_eq!(audio.sample_at(-1.0), 0);
    }
}
