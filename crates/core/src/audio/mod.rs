use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::{
    AppConfig, NoteClassifier, NoteLabel, NoteOverlayError, ParameterBus, ParameterEvent,
    PitchTracker, Result, Sample,
};

/// Latest pitch information published by the [`PitchMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PitchReading {
    pub label: NoteLabel,
    pub frequency: f32,
    pub amplitude: f32,
}

/// Turns blocks of microphone samples into published note and amplitude
/// updates.
///
/// Each pushed block runs through the [`PitchTracker`] and the
/// [`NoteClassifier`]. Amplitude is published for every block; the note only
/// when its label changes, since every note change triggers a mesh rebuild
/// downstream.
#[derive(Debug, Clone)]
pub struct PitchMonitor {
    classifier: NoteClassifier,
    tracker: Arc<Mutex<PitchTracker>>,
    latest: Arc<Mutex<PitchReading>>,
    bus: ParameterBus,
}

impl PitchMonitor {
    pub fn new(config: &AppConfig, bus: ParameterBus) -> Self {
        let tracker = PitchTracker::with_config(config.audio.sample_rate, config.audio.tracker);
        Self {
            classifier: NoteClassifier::new(config.classifier),
            tracker: Arc::new(Mutex::new(tracker)),
            latest: Arc::new(Mutex::new(PitchReading::default())),
            bus,
        }
    }

    /// Bus the readings are published on. Other producers may share it.
    pub fn bus(&self) -> &ParameterBus {
        &self.bus
    }

    /// Analyses one block of mono samples and publishes the result.
    pub fn push_samples(&self, samples: &[f32]) -> Result<PitchReading> {
        let sample = {
            let mut tracker = self.lock_tracker()?;
            tracker.estimate(samples)?
        };
        self.push_sample(sample)
    }

    /// Publishes a reading from an external pitch estimator.
    pub fn push_sample(&self, sample: Sample) -> Result<PitchReading> {
        let reading = PitchReading {
            label: self.classifier.classify(sample),
            frequency: sample.frequency,
            amplitude: sample.amplitude,
        };

        let previous = {
            let mut latest = self.lock_latest()?;
            std::mem::replace(&mut *latest, reading)
        };

        if previous.label != reading.label {
            tracing::debug!(note = %reading.label, frequency = reading.frequency, "note changed");
            self.bus.publish(ParameterEvent::Note(reading.label))?;
        }
        self.bus.publish(ParameterEvent::Amplitude(reading.amplitude))?;

        Ok(reading)
    }

    /// Returns the most recent reading. Starts out as `N/A` with zero level.
    pub fn latest(&self) -> Result<PitchReading> {
        Ok(*self.lock_latest()?)
    }

    fn lock_tracker(&self) -> Result<MutexGuard<'_, PitchTracker>> {
        self.tracker
            .lock()
            .map_err(|_| NoteOverlayError::msg("pitch tracker has been poisoned"))
    }

    fn lock_latest(&self) -> Result<MutexGuard<'_, PitchReading>> {
        self.latest
            .lock()
            .map_err(|_| NoteOverlayError::msg("pitch reading has been poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::sine_block;

    fn monitor() -> (PitchMonitor, crossbeam_channel::Receiver<ParameterEvent>) {
        let bus = ParameterBus::new();
        let events = bus.subscribe().unwrap();
        (PitchMonitor::new(&AppConfig::default(), bus), events)
    }

    #[test]
    fn starts_without_a_note() {
        let (monitor, _events) = monitor();
        let reading = monitor.latest().unwrap();

        assert_eq!(reading.label, NoteLabel::NotApplicable);
        assert_eq!(reading.amplitude, 0.0);
    }

    #[test]
    fn publishes_note_changes_only() {
        let (monitor, events) = monitor();
        let stream = [(0.0, 0.0), (440.0, 0.9), (440.0, 0.9), (220.0, 0.9)];

        let labels: Vec<String> = stream
            .iter()
            .map(|&(frequency, amplitude)| {
                monitor
                    .push_sample(Sample::new(frequency, amplitude))
                    .unwrap()
                    .label
                    .to_string()
            })
            .collect();
        assert_eq!(labels, ["N/A", "A4", "A4", "A3"]);

        let notes: Vec<String> = events
            .try_iter()
            .filter_map(|event| match event {
                ParameterEvent::Note(label) => Some(label.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(notes, ["A4", "A3"]);
    }

    #[test]
    fn publishes_amplitude_for_every_block() {
        let (monitor, events) = monitor();
        monitor.push_sample(Sample::new(440.0, 0.3)).unwrap();
        monitor.push_sample(Sample::new(440.0, 0.4)).unwrap();

        let amplitudes: Vec<f32> = events
            .try_iter()
            .filter_map(|event| match event {
                ParameterEvent::Amplitude(amplitude) => Some(amplitude),
                _ => None,
            })
            .collect();
        assert_eq!(amplitudes, [0.3, 0.4]);
    }

    #[test]
    fn analyses_raw_sample_blocks() {
        let (monitor, _events) = monitor();
        let block = sine_block(440.0, 0.5, 48_000, 4096);

        let reading = monitor.push_samples(&block).unwrap();
        assert_eq!(reading.label.to_string(), "A4");
        assert_eq!(monitor.latest().unwrap(), reading);
    }

    #[test]
    fn surfaces_tracker_errors() {
        let (monitor, _events) = monitor();
        assert!(monitor.push_samples(&[]).is_err());
        assert_eq!(monitor.latest().unwrap().label, NoteLabel::NotApplicable);
    }

    #[test]
    fn clones_share_the_latest_reading() {
        let (monitor, _events) = monitor();
        let other = monitor.clone();

        other.push_sample(Sample::new(880.0, 0.6)).unwrap();

        assert_eq!(monitor.latest().unwrap().label.to_string(), "A5");
    }
}
