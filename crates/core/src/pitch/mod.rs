//! Monophonic frequency to note-name classification.
//!
//! Everything in here is pure and allocation-free so it can run inside a
//! real-time audio callback. The label type is `Copy` and only turns into a
//! `String` when the caller formats it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Amplitude at or below which a sample is treated as silence.
pub const DEFAULT_NOISE_FLOOR: f32 = 0.05;

/// Concert pitch used to derive the C0 reference.
pub const DEFAULT_REFERENCE_A4_HZ: f64 = 440.0;

/// A4 sits 4 octaves and 9 semitones (4.75 octaves) above C0.
const A4_OCTAVES_ABOVE_C0: f64 = 4.75;

const SEMITONES_PER_OCTAVE: i64 = 12;

/// One (frequency, amplitude) reading produced by a pitch estimator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    /// Estimated fundamental in Hz.
    pub frequency: f32,
    /// Linear magnitude of the analysed block.
    pub amplitude: f32,
}

impl Sample {
    pub fn new(frequency: f32, amplitude: f32) -> Self {
        Self {
            frequency,
            amplitude,
        }
    }
}

/// The twelve equal-tempered pitch classes, spelled with sharps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl PitchClass {
    /// All pitch classes in ascending order starting from C.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    /// Maps a semitone offset from C into a pitch class, wrapping in both
    /// directions.
    pub fn from_semitone(semitone: i64) -> Self {
        Self::ALL[semitone.rem_euclid(SEMITONES_PER_OCTAVE) as usize]
    }

    /// Semitone offset from C, in `0..12`.
    pub fn semitone(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pitch class in a specific octave, in scientific pitch notation
/// (A4 = 440 Hz, middle C = C4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    pub pitch_class: PitchClass,
    pub octave: i32,
}

impl Note {
    pub fn new(pitch_class: PitchClass, octave: i32) -> Self {
        Self {
            pitch_class,
            octave,
        }
    }

    /// Builds the note that lies `half_steps` semitones above C0. Negative
    /// offsets land in octave -1 and below.
    pub fn from_half_steps(half_steps: i64) -> Self {
        Self {
            pitch_class: PitchClass::from_semitone(half_steps),
            octave: half_steps.div_euclid(SEMITONES_PER_OCTAVE) as i32,
        }
    }

    /// Semitone distance from C0.
    pub fn half_steps(self) -> i64 {
        i64::from(self.octave) * SEMITONES_PER_OCTAVE + i64::from(self.pitch_class.semitone())
    }

    /// Equal-tempered frequency of the note for the given A4 reference.
    pub fn frequency(self, reference_a4_hz: f64) -> f64 {
        c0_frequency(reference_a4_hz) * 2.0_f64.powf(self.half_steps() as f64 / 12.0)
    }

    /// Deviation of `frequency` from this note in cents (positive = sharp).
    pub fn cents_from(self, frequency: f64, reference_a4_hz: f64) -> f64 {
        1200.0 * (frequency / self.frequency(reference_a4_hz)).log2()
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class, self.octave)
    }
}

/// Outcome of classifying a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "String")]
pub enum NoteLabel {
    Note(Note),
    /// Silence, a sub-noise-floor signal, or no usable pitch estimate.
    #[default]
    NotApplicable,
}

impl NoteLabel {
    /// Text shown for [`NoteLabel::NotApplicable`].
    pub const NOT_APPLICABLE: &'static str = "N/A";

}

impl fmt::Display for NoteLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteLabel::Note(note) => note.fmt(f),
            NoteLabel::NotApplicable => f.write_str(Self::NOT_APPLICABLE),
        }
    }
}

impl From<NoteLabel> for String {
    fn from(value: NoteLabel) -> Self {
        value.to_string()
    }
}

/// Tunables for [`NoteClassifier`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Samples with an amplitude at or below this value are not classified.
    pub noise_floor: f32,
    /// Frequency of A4 in Hz.
    pub reference_a4_hz: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            noise_floor: DEFAULT_NOISE_FLOOR,
            reference_a4_hz: DEFAULT_REFERENCE_A4_HZ,
        }
    }
}

/// Stateless classifier holding an immutable copy of its configuration.
///
/// `NoteClassifier` is `Copy + Send + Sync`; share it freely between the audio
/// thread and anything else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteClassifier {
    config: ClassifierConfig,
    c0_hz: f64,
}

impl NoteClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            c0_hz: c0_frequency(config.reference_a4_hz),
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Maps a sample to a note label.
    ///
    /// Non-positive (or NaN) frequencies and amplitudes at or below the noise
    /// floor yield [`NoteLabel::NotApplicable`]. Otherwise the frequency is
    /// snapped to the nearest equal-tempered semitone, with exact half-semitone
    /// ties rounded away from zero.
    pub fn classify(&self, sample: Sample) -> NoteLabel {
        if sample.frequency.is_nan() || sample.frequency <= 0.0 {
            return NoteLabel::NotApplicable;
        }
        if sample.amplitude.is_nan() || sample.amplitude <= self.config.noise_floor {
            return NoteLabel::NotApplicable;
        }

        let half_steps = (12.0 * (f64::from(sample.frequency) / self.c0_hz).log2()).round();
        if !half_steps.is_finite() {
            return NoteLabel::NotApplicable;
        }

        NoteLabel::Note(Note::from_half_steps(half_steps as i64))
    }
}

impl Default for NoteClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

/// Classifies a single reading with the default noise floor and A4 = 440 Hz.
pub fn classify_note(frequency: f32, amplitude: f32) -> NoteLabel {
    NoteClassifier::default().classify(Sample::new(frequency, amplitude))
}

/// Frequency of C0 for the given A4 reference.
pub fn c0_frequency(reference_a4_hz: f64) -> f64 {
    reference_a4_hz * 2.0_f64.powf(-A4_OCTAVES_ABOVE_C0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(frequency: f32, amplitude: f32) -> String {
        classify_note(frequency, amplitude).to_string()
    }

    #[test]
    fn silence_and_invalid_pitch_are_not_applicable() {
        assert_eq!(label(0.0, 1.0), "N/A");
        assert_eq!(label(-440.0, 1.0), "N/A");
        assert_eq!(label(f32::NAN, 1.0), "N/A");
        assert_eq!(label(f32::INFINITY, 1.0), "N/A");
    }

    #[test]
    fn noise_floor_gates_valid_frequencies() {
        assert_eq!(label(440.0, 0.05), "N/A");
        assert_eq!(label(440.0, 0.0), "N/A");
        assert_eq!(label(440.0, f32::NAN), "N/A");
        assert_eq!(label(440.0, 0.051), "A4");
    }

    #[test]
    fn names_reference_pitches() {
        assert_eq!(label(440.0, 1.0), "A4");
        assert_eq!(label(261.63, 1.0), "C4");
        assert_eq!(label(880.0, 1.0), "A5");
        assert_eq!(label(220.0, 1.0), "A3");
        assert_eq!(label(277.18, 1.0), "C#4");
        assert_eq!(label(466.16, 1.0), "A#4");
    }

    #[test]
    fn wraps_below_c_into_previous_octave() {
        // B3 and B-1 sit one semitone under C4 and C0 respectively.
        assert_eq!(label(246.94, 1.0), "B3");
        assert_eq!(label(15.43, 1.0), "B-1");

        let c0 = c0_frequency(DEFAULT_REFERENCE_A4_HZ) as f32;
        assert_eq!(label(c0, 1.0), "C0");
    }

    #[test]
    fn snaps_within_half_a_semitone() {
        let a4 = Note::new(PitchClass::A, 4);
        let sharp = a4.frequency(DEFAULT_REFERENCE_A4_HZ) * 2.0_f64.powf(0.4 / 12.0);
        let flat = a4.frequency(DEFAULT_REFERENCE_A4_HZ) * 2.0_f64.powf(-0.4 / 12.0);

        assert_eq!(label(sharp as f32, 1.0), "A4");
        assert_eq!(label(flat as f32, 1.0), "A4");
    }

    #[test]
    fn classifies_sample_stream() {
        let stream = [(0.0, 0.0), (440.0, 0.9), (440.0, 0.9), (220.0, 0.9)];
        let labels: Vec<String> = stream
            .iter()
            .map(|&(frequency, amplitude)| label(frequency, amplitude))
            .collect();

        assert_eq!(labels, ["N/A", "A4", "A4", "A3"]);
    }

    #[test]
    fn honours_custom_reference_pitch() {
        let classifier = NoteClassifier::new(ClassifierConfig {
            reference_a4_hz: 432.0,
            ..Default::default()
        });

        assert_eq!(classifier.classify(Sample::new(432.0, 1.0)).to_string(), "A4");
        assert_eq!(classifier.classify(Sample::new(864.0, 1.0)).to_string(), "A5");
    }

    #[test]
    fn half_steps_round_trip_through_notes() {
        for half_steps in -24..=120 {
            let note = Note::from_half_steps(half_steps);
            assert_eq!(note.half_steps(), half_steps);

            let frequency = note.frequency(DEFAULT_REFERENCE_A4_HZ) as f32;
            assert_eq!(
                classify_note(frequency, 1.0),
                NoteLabel::Note(note),
                "semitone {half_steps}"
            );
        }
    }

    #[test]
    fn measures_cents_deviation() {
        let a4 = Note::new(PitchClass::A, 4);
        assert!(a4.cents_from(440.0, DEFAULT_REFERENCE_A4_HZ).abs() < 1e-9);
        assert!((a4.cents_from(880.0, DEFAULT_REFERENCE_A4_HZ) - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn label_serializes_as_text() {
        let json = serde_json::to_string(&classify_note(440.0, 1.0)).unwrap();
        assert_eq!(json, "\"A4\"");
        let json = serde_json::to_string(&NoteLabel::NotApplicable).unwrap();
        assert_eq!(json, "\"N/A\"");
    }
}
