use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::{mapping::Rgba, NoteLabel, NoteOverlayError, Result};

/// Parameter changes that drive the text overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "parameter", content = "value", rename_all = "snake_case")]
pub enum ParameterEvent {
    Note(NoteLabel),
    Amplitude(f32),
    Color(Rgba),
    FontSize(f32),
    Metallic(f32),
    Roughness(f32),
}

/// Fan-out channel between parameter producers (pitch monitor, UI controls)
/// and whoever rebuilds the overlay.
///
/// Clones share the same subscriber list. Subscribers that drop their
/// receiver are pruned on the next publish.
#[derive(Clone, Default)]
pub struct ParameterBus {
    subscribers: Arc<Mutex<Vec<Sender<ParameterEvent>>>>,
}

impl ParameterBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new observer. Every event published from now on is queued
    /// on the returned receiver.
    pub fn subscribe(&self) -> Result<Receiver<ParameterEvent>> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.lock()?.push(sender);
        Ok(receiver)
    }

    /// Delivers `event` to every live subscriber and returns how many received
    /// it.
    pub fn publish(&self, event: ParameterEvent) -> Result<usize> {
        let mut subscribers = self.lock()?;
        let before = subscribers.len();
        subscribers.retain(|sender| sender.send(event).is_ok());

        let dropped = before - subscribers.len();
        if dropped > 0 {
            tracing::debug!(dropped, "pruned disconnected parameter subscribers");
        }

        Ok(subscribers.len())
    }

    pub fn subscriber_count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Sender<ParameterEvent>>>> {
        self.subscribers
            .lock()
            .map_err(|_| NoteOverlayError::msg("parameter bus has been poisoned"))
    }
}

impl std::fmt::Debug for ParameterBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers = self.subscriber_count().unwrap_or_default();
        f.debug_struct("ParameterBus")
            .field("subscribers", &subscribers)
            .finish()
    }
}

/// Control values a UI would expose as sliders and pickers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "parameter", content = "value", rename_all = "snake_case")]
pub enum ControlChange {
    Color(Rgba),
    FontSize(f32),
    Metallic(f32),
    Roughness(f32),
}

impl From<ControlChange> for ParameterEvent {
    fn from(value: ControlChange) -> Self {
        match value {
            ControlChange::Color(color) => ParameterEvent::Color(color),
            ControlChange::FontSize(size) => ParameterEvent::FontSize(size),
            ControlChange::Metallic(metallic) => ParameterEvent::Metallic(metallic),
            ControlChange::Roughness(roughness) => ParameterEvent::Roughness(roughness),
        }
    }
}
