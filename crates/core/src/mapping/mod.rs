use serde::{Deserialize, Serialize};

/// Alpha written to the material is scaled by this so the text never renders
/// fully opaque.
const ALPHA_SCALE: f32 = 0.99;

/// Describes how microphone amplitude is routed to the text extrusion depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtrusionConfig {
    /// Depth gained per unit of amplitude.
    pub sensitivity: f32,
    pub min_depth: f32,
    pub max_depth: f32,
    /// Depth used before the first amplitude reading arrives.
    pub initial_depth: f32,
}

impl Default for ExtrusionConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.5,
            min_depth: 0.005,
            max_depth: 0.25,
            initial_depth: 0.02,
        }
    }
}

impl ExtrusionConfig {
    /// Maps an amplitude reading to an extrusion depth within
    /// `[min_depth, max_depth]`. Non-finite or negative readings give the
    /// minimum depth.
    pub fn extrusion_depth(&self, amplitude: f32) -> f32 {
        if !amplitude.is_finite() || amplitude <= 0.0 {
            return self.min_depth;
        }
        (amplitude * self.sensitivity).clamp(self.min_depth, self.max_depth.max(self.min_depth))
    }
}

/// Straight RGBA colour with every channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl Rgba {
    /// Builds a colour, clamping each channel into `[0, 1]`. NaN becomes 0.
    pub fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red: unit(red),
            green: unit(green),
            blue: unit(blue),
            alpha: unit(alpha),
        }
    }

    pub fn clamped(self) -> Self {
        Self::new(self.red, self.green, self.blue, self.alpha)
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.5)
    }
}

/// Surface parameters of the text material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialParams {
    pub base_color: Rgba,
    pub metallic: f32,
    pub roughness: f32,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            base_color: Rgba::default(),
            metallic: 0.0,
            roughness: 0.5,
        }
    }
}

impl MaterialParams {
    /// Applies a picked colour. The alpha channel is scaled below one.
    pub fn with_color(self, color: Rgba) -> Self {
        let color = color.clamped();
        Self {
            base_color: Rgba {
                alpha: color.alpha * ALPHA_SCALE,
                ..color
            },
            ..self
        }
    }

    pub fn with_metallic(self, metallic: f32) -> Self {
        Self {
            metallic: unit(metallic),
            ..self
        }
    }

    pub fn with_roughness(self, roughness: f32) -> Self {
        Self {
            roughness: unit(roughness),
            ..self
        }
    }
}

fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
