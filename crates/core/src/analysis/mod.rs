use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::{NoteOverlayError, Result, Sample};

/// Spectral peaks weaker than this (relative to the block length) are treated
/// as silence.
const MIN_PEAK_MAGNITUDE: f32 = 1e-4;

/// Search band and block settings for [`PitchTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub min_frequency: f32,
    pub max_frequency: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_frequency: 30.0,
            max_frequency: 4_000.0,
        }
    }
}

/// Block-based fundamental estimator. Produces the `(frequency, amplitude)`
/// samples consumed by the note classifier.
///
/// Frequency is the strongest Hann-windowed spectral peak inside the search
/// band, refined by parabolic interpolation over the neighbouring bins.
/// Amplitude is the RMS of the block.
pub struct PitchTracker {
    sample_rate: u32,
    config: TrackerConfig,
    fft_planner: RealFftPlanner<f32>,
    fft: Option<FftResources>,
}

impl PitchTracker {
    /// Creates a tracker using the default 48 kHz sample rate.
    pub fn new() -> Self {
        Self::with_sample_rate(48_000)
    }

    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self::with_config(sample_rate, TrackerConfig::default())
    }

    pub fn with_config(sample_rate: u32, config: TrackerConfig) -> Self {
        Self {
            sample_rate,
            config,
            fft_planner: RealFftPlanner::new(),
            fft: None,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Estimates the fundamental and level of one block of mono samples.
    ///
    /// Silent blocks report a frequency of `0.0`.
    pub fn estimate(&mut self, samples: &[f32]) -> Result<Sample> {
        if samples.len() < 2 {
            return Err(NoteOverlayError::InvalidInput(
                "pitch tracking requires blocks with at least two samples",
            ));
        }

        let amplitude = compute_rms(samples);
        let frequency = self.dominant_frequency(samples)?;
        Ok(Sample {
            frequency,
            amplitude,
        })
    }

    fn dominant_frequency(&mut self, samples: &[f32]) -> Result<f32> {
        let len = samples.len();
        let sample_rate = self.sample_rate as f32;
        let bin_hz = sample_rate / len as f32;
        let band = self.config;
        let fft = self.prepare_fft(len)?;

        for (index, value) in samples.iter().enumerate() {
            fft.input[index] = *value * hann_value(index, len);
        }

        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)?;

        let last_bin = fft.spectrum.len() - 1;
        let low = ((band.min_frequency / bin_hz).floor() as usize).max(1);
        let high = ((band.max_frequency / bin_hz).ceil() as usize).min(last_bin);
        if low > high {
            return Ok(0.0);
        }

        let mut peak = low;
        let mut peak_magnitude = 0.0;
        for bin in low..=high {
            let magnitude = fft.spectrum[bin].norm();
            if magnitude > peak_magnitude {
                peak = bin;
                peak_magnitude = magnitude;
            }
        }

        if peak_magnitude <= MIN_PEAK_MAGNITUDE * len as f32 {
            return Ok(0.0);
        }

        let offset = if peak > 0 && peak < last_bin {
            parabolic_offset(
                fft.spectrum[peak - 1].norm(),
                peak_magnitude,
                fft.spectrum[peak + 1].norm(),
            )
        } else {
            0.0
        };

        Ok((peak as f32 + offset) * bin_hz)
    }

    fn prepare_fft(&mut self, size: usize) -> Result<&mut FftResources> {
        let rebuild = self
            .fft
            .as_ref()
            .map(|fft| fft.size != size)
            .unwrap_or(true);

        if rebuild {
            let plan = self.fft_planner.plan_fft_forward(size);
            let scratch = plan.make_scratch_vec();
            let spectrum = plan.make_output_vec();
            let input = plan.make_input_vec();
            self.fft = Some(FftResources {
                size,
                plan,
                scratch,
                spectrum,
                input,
            });
        }

        self.fft
            .as_mut()
            .ok_or_else(|| NoteOverlayError::msg("fft resources were not prepared"))
    }
}

impl Default for PitchTracker {
    fn default() -> Self {
        Self::new()
    }
}

struct FftResources {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for PitchTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PitchTracker")
            .field("sample_rate", &self.sample_rate)
            .field("config", &self.config)
            .field("fft", &self.fft)
            .finish()
    }
}

impl fmt::Debug for FftResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftResources")
            .field("size", &self.size)
            .finish()
    }
}

fn compute_rms(samples: &[f32]) -> f32 {
    let sum: f32 = samples.iter().map(|sample| sample * sample).sum();
    (sum / samples.len() as f32).sqrt()
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}

/// Vertex of the parabola through three equally spaced magnitudes, relative to
/// the centre bin, in `[-0.5, 0.5]`.
fn parabolic_offset(left: f32, centre: f32, right: f32) -> f32 {
    let denominator = left - 2.0 * centre + right;
    if denominator.abs() <= f32::EPSILON {
        return 0.0;
    }
    (0.5 * (left - right) / denominator).clamp(-0.5, 0.5)
}

/// Generates `len` samples of a sine wave. Handy for demos and tests.
pub fn sine_block(frequency: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
    let step = 2.0 * PI * frequency / sample_rate as f32;
    (0..len)
        .map(|index| amplitude * (step * index as f32).sin())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify_note;

    #[test]
    fn rejects_short_blocks() {
        let mut tracker = PitchTracker::new();
        assert!(matches!(
            tracker.estimate(&[]),
            Err(NoteOverlayError::InvalidInput(_))
        ));
        assert!(tracker.estimate(&[0.5]).is_err());
    }

    #[test]
    fn silence_has_no_pitch() {
        let mut tracker = PitchTracker::new();
        let sample = tracker.estimate(&vec![0.0; 2048]).unwrap();

        assert_eq!(sample.frequency, 0.0);
        assert_eq!(sample.amplitude, 0.0);
        assert_eq!(classify_note(sample.frequency, sample.amplitude).to_string(), "N/A");
    }

    #[test]
    fn finds_sine_fundamentals() {
        let mut tracker = PitchTracker::with_sample_rate(48_000);

        let cases = [
            (440.0, "A4"),
            (261.63, "C4"),
            (110.0, "A2"),
            (1046.5, "C6"),
        ];
        for (frequency, expected) in cases {
            let block = sine_block(frequency, 0.5, 48_000, 4096);
            let sample = tracker.estimate(&block).unwrap();

            assert!(
                (sample.frequency - frequency).abs() < frequency * 0.02,
                "estimated {} for {frequency}",
                sample.frequency
            );
            assert!((sample.amplitude - 0.5 / 2.0_f32.sqrt()).abs() < 0.01);
            assert_eq!(classify_note(sample.frequency, sample.amplitude).to_string(), expected);
        }
    }

    #[test]
    fn ignores_peaks_outside_the_band() {
        let mut tracker = PitchTracker::with_config(
            48_000,
            TrackerConfig {
                min_frequency: 200.0,
                max_frequency: 2_000.0,
            },
        );
        let block = sine_block(60.0, 0.8, 48_000, 4096);
        let sample = tracker.estimate(&block).unwrap();

        assert!((sample.frequency - 60.0).abs() > 100.0);
    }

    #[test]
    fn rebuilds_plans_when_block_size_changes() {
        let mut tracker = PitchTracker::new();
        tracker.estimate(&sine_block(440.0, 0.5, 48_000, 1024)).unwrap();
        let sample = tracker.estimate(&sine_block(440.0, 0.5, 48_000, 4096)).unwrap();

        assert!((sample.frequency - 440.0).abs() < 5.0);
    }
}
