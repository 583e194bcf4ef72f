//! Parameter types for rasterization.
//!
//! These structs describe *what* to render, not *how*. They are the interface
//! between [`operations`](super::operations) (which decides what to render
//! from the edit controls) and the [`backend`](super::backend) (which does the
//! pixel work), so a mock backend can stand in during tests.

use super::calculations::clamp_zoom;
use super::expression::EffectExpression;

/// MIME type of every rasterized post image.
pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";

/// File extension matching [`OUTPUT_CONTENT_TYPE`].
pub const OUTPUT_EXTENSION: &str = "jpg";

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(92)
    }
}

/// Everything needed for one rasterization.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterParams {
    /// Combined filter + adjustment expression, applied before drawing.
    pub effect: EffectExpression,
    /// Centered zoom in `[1, 2]`.
    pub zoom: f64,
    /// Vignette overlay opacity; `0` skips the overlay.
    pub vignette_opacity: f64,
    pub quality: Quality,
}

impl RasterParams {
    pub fn new(effect: EffectExpression, zoom: f64, vignette_opacity: f64) -> Self {
        Self {
            effect,
            zoom: clamp_zoom(zoom),
            vignette_opacity,
            quality: Quality::default(),
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Overlay opacity clamped to `[0, 1]`; non-finite means no overlay.
    pub fn overlay_alpha(&self) -> f64 {
        if self.vignette_opacity.is_finite() {
            self.vignette_opacity.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
