//! Exponential pose smoothing for followed entities.
//!
//! Each call moves the current pose a fixed fraction `t` of the way toward the
//! target: positions are interpolated linearly, orientations along the shorter
//! great-circle arc. With [`SmoothingMode::PerCall`] the effective time
//! constant depends on how often the tracker delivers a new target; at 60
//! updates per second and `t = 0.1` roughly 99.8% of a step change is
//! absorbed within one second. [`SmoothingMode::TimeScaled`] removes that
//! coupling.

use std::time::Duration;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Fraction of the remaining distance covered per update.
pub const DEFAULT_SMOOTHING_FACTOR: f32 = 0.1;

/// Quaternions whose length differs from one by less than this are used as-is.
const UNIT_TOLERANCE: f32 = 1e-6;

/// Position and orientation of a tracked or followed entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Splits an affine world transform into translation and rotation.
    /// Any scale carried by the matrix is discarded.
    pub fn from_transform(transform: Mat4) -> Self {
        let (_scale, rotation, translation) = transform.to_scale_rotation_translation();
        Self {
            position: translation,
            orientation: normalize_orientation(rotation),
        }
    }

    /// Euclidean distance between the two positions.
    pub fn distance(&self, other: &Pose) -> f32 {
        self.position.distance(other.position)
    }

    /// Rotation angle in radians needed to go from one orientation to the
    /// other, in `[0, π]`.
    pub fn angular_distance(&self, other: &Pose) -> f32 {
        // atan2 keeps precision for small angles where acos(dot) flattens out.
        let delta = self.orientation.conjugate() * other.orientation;
        2.0 * delta.xyz().length().atan2(delta.w.abs())
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Interpolation weight toward the target, always within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct SmoothingFactor(f32);

impl SmoothingFactor {
    pub const FROZEN: SmoothingFactor = SmoothingFactor(0.0);
    pub const SNAP: SmoothingFactor = SmoothingFactor(1.0);

    /// Clamps `value` into `[0, 1]`. NaN freezes the pose.
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::FROZEN;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn get(self) -> f32 {
        self.0
    }

    /// Factor that yields the same decay over `elapsed` as this factor does
    /// over one update at `reference_rate_hz`.
    pub fn scaled_for(self, elapsed: Duration, reference_rate_hz: f32) -> Self {
        if self.0 >= 1.0 {
            return Self::SNAP;
        }
        let updates = elapsed.as_secs_f32() * reference_rate_hz;
        Self::new(1.0 - (1.0 - self.0).powf(updates))
    }
}

impl Default for SmoothingFactor {
    fn default() -> Self {
        Self(DEFAULT_SMOOTHING_FACTOR)
    }
}

impl From<f32> for SmoothingFactor {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<SmoothingFactor> for f32 {
    fn from(value: SmoothingFactor) -> Self {
        value.0
    }
}

/// How the smoothing factor relates to the update cadence.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SmoothingMode {
    /// The factor is applied as-is on every update, whatever the elapsed time.
    #[default]
    PerCall,
    /// The factor describes one update at `reference_rate_hz` and is rescaled
    /// for the actual time between updates.
    TimeScaled { reference_rate_hz: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub factor: SmoothingFactor,
    pub mode: SmoothingMode,
}

/// Applies [`smooth_pose`] with a fixed configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseSmoother {
    config: SmoothingConfig,
}

impl PoseSmoother {
    pub fn new(config: SmoothingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SmoothingConfig {
        &self.config
    }

    /// Factor used for an update that arrives `elapsed` after the previous one.
    pub fn factor_for(&self, elapsed: Duration) -> SmoothingFactor {
        match self.config.mode {
            SmoothingMode::PerCall => self.config.factor,
            SmoothingMode::TimeScaled { reference_rate_hz } => {
                self.config.factor.scaled_for(elapsed, reference_rate_hz)
            }
        }
    }

    pub fn smooth(&self, current: Pose, target: Pose, elapsed: Duration) -> Pose {
        smooth_pose(current, target, self.factor_for(elapsed).get())
    }
}

/// Moves `current` toward `target` by the fraction `t`.
///
/// `t` is clamped into `[0, 1]`. `t = 0` returns `current` and `t = 1` returns
/// `target` untouched. Orientations that are not unit length are normalized
/// first.
pub fn smooth_pose(current: Pose, target: Pose, t: f32) -> Pose {
    let t = SmoothingFactor::new(t).get();
    let current = Pose::new(current.position, normalize_orientation(current.orientation));
    let target = Pose::new(target.position, normalize_orientation(target.orientation));

    if t <= 0.0 {
        return current;
    }
    if t >= 1.0 {
        return target;
    }

    Pose {
        position: lerp(current.position, target.position, t),
        orientation: slerp(current.orientation, target.orientation, t),
    }
}

/// Component-wise linear interpolation.
pub fn lerp(start: Vec3, end: Vec3, t: f32) -> Vec3 {
    start + (end - start) * t
}

/// Shortest-arc spherical interpolation between unit quaternions.
///
/// The result is always renormalized.
pub fn slerp(start: Quat, end: Quat, t: f32) -> Quat {
    start.slerp(end, t).normalize()
}

fn normalize_orientation(orientation: Quat) -> Quat {
    let length = orientation.length();
    if !length.is_finite() || length <= f32::EPSILON {
        return Quat::IDENTITY;
    }
    if (length - 1.0).abs() <= UNIT_TOLERANCE {
        orientation
    } else {
        orientation / length
    }
}
