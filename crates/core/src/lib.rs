//! Core library for the Note Overlay application.
//!
//! The application floats the name of the note being sung above a tracked
//! face. Two pure numeric components carry the interesting logic:
//!
//! - [`pitch`] maps a `(frequency, amplitude)` reading to a note label such as
//!   `A4`, or `N/A` for silence.
//! - [`pose`] eases a followed pose toward a noisy tracked target, linearly for
//!   position and along the shortest arc for orientation.
//!
//! Around them sit the host-side pieces: an FFT pitch tracker, a pitch monitor
//! that publishes readings on a parameter bus, and the overlay state that
//! consumes those parameters and gesture input.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod mapping;
pub mod overlay;
pub mod pitch;
pub mod pose;

pub use glam;

pub use analysis::{PitchTracker, TrackerConfig};
pub use audio::{PitchMonitor, PitchReading};
pub use config::{AppConfig, AudioConfig};
pub use error::{NoteOverlayError, Result};
pub use events::{ControlChange, ParameterBus, ParameterEvent};
pub use mapping::{ExtrusionConfig, MaterialParams, Rgba};
pub use overlay::{GestureConfig, TextMesh, TextOverlay};
pub use pitch::{
    classify_note, ClassifierConfig, Note, NoteClassifier, NoteLabel, PitchClass, Sample,
};
pub use pose::{smooth_pose, Pose, PoseSmoother, SmoothingConfig, SmoothingFactor, SmoothingMode};
