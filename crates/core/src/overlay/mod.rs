//! State of the 3D text that follows the tracked face.
//!
//! The overlay owns everything the renderer needs to draw the label: the
//! smoothed pose, the user's gesture offsets, the text, its extrusion depth
//! and its material. Parameter events come in through [`TextOverlay::apply`],
//! tracked transforms through [`TextOverlay::follow`].

use std::time::Duration;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::{
    AppConfig, ExtrusionConfig, MaterialParams, NoteLabel, ParameterEvent, Pose, PoseSmoother,
};

/// Gesture sensitivities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// World units per screen point of two-finger pan.
    pub pan_scale: f32,
    /// Depth change per unit of pinch scale.
    pub pinch_scale: f32,
    /// Distance of the anchor from the tracked origin along z.
    pub initial_z_distance: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pan_scale: 0.001,
            pinch_scale: 0.1,
            initial_z_distance: 0.0,
        }
    }
}

/// Text mesh parameters. A change to any of these means the mesh has to be
/// regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextMesh {
    pub text: NoteLabel,
    pub font_size: f32,
    pub extrusion_depth: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextOverlay {
    pose: Pose,
    /// Accumulated pan, added to every tracked target position.
    offset: Vec3,
    z_distance: f32,
    mesh: TextMesh,
    material: MaterialParams,
    #[serde(skip)]
    smoother: PoseSmoother,
    #[serde(skip)]
    extrusion: ExtrusionConfig,
    #[serde(skip)]
    gestures: GestureConfig,
}

impl TextOverlay {
    pub const DEFAULT_FONT_SIZE: f32 = 0.1;

    pub fn new(config: &AppConfig) -> Self {
        Self {
            pose: Pose::IDENTITY,
            offset: Vec3::ZERO,
            z_distance: config.gestures.initial_z_distance,
            mesh: TextMesh {
                text: NoteLabel::NotApplicable,
                font_size: Self::DEFAULT_FONT_SIZE,
                extrusion_depth: config.extrusion.initial_depth,
            },
            material: MaterialParams::default(),
            smoother: PoseSmoother::new(config.smoothing),
            extrusion: config.extrusion,
            gestures: config.gestures,
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn mesh(&self) -> &TextMesh {
        &self.mesh
    }

    pub fn material(&self) -> &MaterialParams {
        &self.material
    }

    /// Position of the anchor the text hangs from: the pan offset in x/y and
    /// the pinch distance in z.
    pub fn anchor_position(&self) -> Vec3 {
        Vec3::new(self.offset.x, self.offset.y, self.z_distance)
    }

    /// Applies a parameter change. Returns `true` when the text mesh has to
    /// be rebuilt.
    pub fn apply(&mut self, event: ParameterEvent) -> bool {
        let previous = self.mesh;
        match event {
            ParameterEvent::Note(label) => self.mesh.text = label,
            ParameterEvent::Amplitude(amplitude) => {
                self.mesh.extrusion_depth = self.extrusion.extrusion_depth(amplitude)
            }
            ParameterEvent::FontSize(size) => {
                if size.is_finite() && size > 0.0 {
                    self.mesh.font_size = size;
                } else {
                    tracing::warn!(size, "ignoring invalid font size");
                }
            }
            ParameterEvent::Color(color) => {
                self.material = self.material.with_color(color);
                return false;
            }
            // Material changes regenerate the mesh together with the material.
            ParameterEvent::Metallic(metallic) => {
                let updated = self.material.with_metallic(metallic);
                let changed = updated != self.material;
                self.material = updated;
                return changed;
            }
            ParameterEvent::Roughness(roughness) => {
                let updated = self.material.with_roughness(roughness);
                let changed = updated != self.material;
                self.material = updated;
                return changed;
            }
        }

        let rebuild = self.mesh != previous;
        if rebuild {
            tracing::trace!(
                text = %self.mesh.text,
                depth = self.mesh.extrusion_depth,
                "text mesh changed"
            );
        }
        rebuild
    }

    /// Moves the text toward a freshly tracked world transform.
    pub fn follow(&mut self, transform: Mat4, elapsed: Duration) -> Pose {
        let mut target = Pose::from_transform(transform);
        target.position += self.offset;
        self.pose = self.smoother.smooth(self.pose, target, elapsed);
        self.pose
    }

    /// Two-finger pan by `(dx, dy)` screen points. Screen y grows downward.
    pub fn pan(&mut self, dx: f32, dy: f32) -> Vec3 {
        let translation = Vec3::new(dx, -dy, 0.0) * self.gestures.pan_scale;
        self.offset += translation;
        translation
    }

    /// Incremental pinch with the recognizer's scale since the last event.
    /// Spreading the fingers (`scale > 1`) pulls the text closer.
    pub fn pinch(&mut self, scale: f32) -> f32 {
        if scale.is_finite() {
            self.z_distance += self.gestures.pinch_scale * (1.0 - scale);
        }
        self.z_distance
    }
}
