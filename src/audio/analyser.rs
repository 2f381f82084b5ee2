use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_FFT_SIZE: usize = 1024;
pub const DEFAULT_SMOOTHING_TIME_CONSTANT: f32 = 0.8;
pub const DEFAULT_MIN_DECIBELS: f32 = -100.0;
pub const DEFAULT_MAX_DECIBELS: f32 = -30.0;

const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32768;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AnalyserError {
    #[error("fft size {0} must be a power of two between 32 and 32768")]
    InvalidFftSize(usize),
    #[error("smoothing time constant {0} must lie in [0, 1]")]
    InvalidSmoothing(f32),
    #[error("decibel range [{min}, {max}] is empty")]
    InvalidDecibelRange { min: f32, max: f32 },
}

/// Settings for an [`Analyser`]; defaults match a freshly created Web Audio
/// analyser node with the transform size the player uses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnalyserOptions {
    pub fft_size: usize,
    pub smoothing_time_constant: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AnalyserOptions {
    fn default() -> Self {
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            smoothing_time_constant: DEFAULT_SMOOTHING_TIME_CONSTANT,
            min_decibels: DEFAULT_MIN_DECIBELS,
            max_decibels: DEFAULT_MAX_DECIBELS,
        }
    }
}

impl AnalyserOptions {
    pub fn validate(&self) -> Result<(), AnalyserError> {
        if !self.fft_size.is_power_of_two()
            || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&self.fft_size)
        {
            return Err(AnalyserError::InvalidFftSize(self.fft_size));
        }
        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(AnalyserError::InvalidSmoothing(self.smoothing_time_constant));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(AnalyserError::InvalidDecibelRange {
                min: self.min_decibels,
                max: self.max_decibels,
            });
        }
        Ok(())
    }
}

/// Byte-scaled magnitude spectrum over a sliding window of samples.
///
/// Each snapshot is Blackman windowed, transformed, blended with the previous
/// snapshot by the smoothing time constant and mapped from decibels onto
/// `0..=255`.
pub struct Analyser {
    options: AnalyserOptions,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl fmt::Debug for Analyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyser")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Analyser {
    pub fn new(options: AnalyserOptions) -> Result<Self, AnalyserError> {
        options.validate()?;

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(options.fft_size);

        Ok(Self {
            options,
            fft,
            window: blackman_window(options.fft_size),
            scratch: vec![Complex::new(0.0, 0.0); options.fft_size],
            smoothed: vec![0.0; options.fft_size / 2],
        })
    }

    pub fn fft_size(&self) -> usize {
        self.options.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.options.fft_size / 2
    }

    /// Analyse `samples` (exactly `fft_size` long) into `out`.
    ///
    /// `out` may be shorter than the bin count; extra bins are dropped.
    pub fn byte_frequency_data(&mut self, samples: &[f32], out: &mut [u8]) {
        debug_assert_eq!(samples.len(), self.options.fft_size);

        for ((slot, &s), &w) in self.scratch.iter_mut().zip(samples).zip(&self.window) {
            *slot = Complex::new(s * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let scale = 1.0 / self.options.fft_size as f32;
        let tau = self.options.smoothing_time_constant;
        for (prev, bin) in self.smoothed.iter_mut().zip(&self.scratch) {
            let magnitude = bin.norm() * scale;
            let next = tau * *prev + (1.0 - tau) * magnitude;
            // Keep the history finite so one bad sample cannot poison it.
            *prev = if next.is_finite() { next } else { 0.0 };
        }

        let range = self.options.max_decibels - self.options.min_decibels;
        for (byte, &magnitude) in out.iter_mut().zip(&self.smoothed) {
            let db = if magnitude > 0.0 {
                20.0 * magnitude.log10()
            } else {
                f32::NEG_INFINITY
            };
            let scaled = 255.0 * (db - self.options.min_decibels) / range;
            *byte = scaled.clamp(0.0, 255.0) as u8;
        }
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    (0..size)
        .map(|i| {
            let x = i as f32 / size as f32;
            A0 - A1 * (2.0 * PI * x).cos() + A2 * (4.0 * PI * x).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_bin: usize, size: usize, amplitude: f32) -> Vec<f32> {
        (0..size)
            .map(|i| amplitude * (2.0 * PI * freq_bin as f32 * i as f32 / size as f32).sin())
            .collect()
    }

    #[test]
    fn rejects_bad_options() {
        let bad = AnalyserOptions {
            fft_size: 1000,
            ..Default::default()
        };
        assert_eq!(Analyser::new(bad).unwrap_err(), AnalyserError::InvalidFftSize(1000));

        let bad = AnalyserOptions {
            min_decibels: -30.0,
            max_decibels: -30.0,
            ..Default::default()
        };
        assert!(Analyser::new(bad).is_err());
    }

    #[test]
    fn silence_maps_to_zero_bytes() {
        let mut analyser = Analyser::new(AnalyserOptions::default()).unwrap();
        let mut out = vec![7u8; analyser.frequency_bin_count()];
        analyser.byte_frequency_data(&vec![0.0; 1024], &mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn tone_peaks_at_its_bin() {
        let options = AnalyserOptions {
            smoothing_time_constant: 0.0,
            ..Default::default()
        };
        let mut analyser = Analyser::new(options).unwrap();
        let mut out = vec![0u8; analyser.frequency_bin_count()];
        analyser.byte_frequency_data(&sine(40, 1024, 0.8), &mut out);

        assert_eq!(out[40], 255);
        assert!(out[300] < 128);
        assert!(out[40] > out[300]);
    }

    #[test]
    fn smoothing_carries_energy_into_silence() {
        let mut analyser = Analyser::new(AnalyserOptions::default()).unwrap();
        let mut out = vec![0u8; analyser.frequency_bin_count()];
        analyser.byte_frequency_data(&sine(40, 1024, 0.8), &mut out);
        analyser.byte_frequency_data(&vec![0.0; 1024], &mut out);
        assert!(out[40] > 0);
    }
}
