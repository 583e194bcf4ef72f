//! Pure calculation functions for effect values and draw geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// Strength used when none (or a non-finite one) is supplied.
pub const FULL_STRENGTH: f64 = 100.0;

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 2.0;

/// Round to `decimals` places, with halves rounding toward positive infinity.
///
/// ```
/// # use shutterpost::imaging::calculations::round_half_up;
/// assert_eq!(round_half_up(0.125, 2), 0.13);
/// assert_eq!(round_half_up(-0.5, 0), 0.0);
/// ```
pub fn round_half_up(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor + 0.5).floor() / factor;
    // Keep -0.0 out of serialized expressions.
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Clamp a strength to `[0, 100]`; non-finite input means full strength.
pub fn normalize_strength(strength: f64) -> f64 {
    if strength.is_finite() {
        strength.clamp(0.0, 100.0)
    } else {
        FULL_STRENGTH
    }
}

/// Move `value` toward `neutral` by `1 - ratio`.
///
/// `ratio = 1` returns `value`, `ratio = 0` returns `neutral`.
pub fn attenuate(value: f64, neutral: f64, ratio: f64) -> f64 {
    neutral + (value - neutral) * ratio
}

/// Clamp a zoom factor to `[1, 2]`; non-finite input means no zoom.
pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        MIN_ZOOM
    }
}

/// Where the scaled source lands on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Canvas placement of a source drawn at `zoom`, centered.
///
/// The offset is `(d - d * zoom) / 2` on both axes, so any zoom above 1 crops
/// inward symmetrically and never letterboxes.
pub fn draw_rect(canvas: (u32, u32), zoom: f64) -> DrawRect {
    let zoom = clamp_zoom(zoom);
    let (w, h) = (canvas.0 as f64, canvas.1 as f64);
    let width = w * zoom;
    let height = h * zoom;
    DrawRect {
        x: (w - width) / 2.0,
        y: (h - height) / 2.0,
        width,
        height,
    }
}

/// Integer source region that stays visible after a centered zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropWindow {
    /// True when the window is the whole source (no resampling needed).
    pub fn covers(&self, dims: (u32, u32)) -> bool {
        self.x == 0 && self.y == 0 && self.width == dims.0 && self.height == dims.1
    }
}

/// The part of the source that [`draw_rect`] leaves on the canvas.
///
/// Each visible extent is `d / zoom`, centered.
pub fn source_window(source: (u32, u32), zoom: f64) -> CropWindow {
    let zoom = clamp_zoom(zoom);
    let (w, h) = source;
    let width = ((w as f64 / zoom).round() as u32).clamp(1.min(w), w);
    let height = ((h as f64 / zoom).round() as u32).clamp(1.min(h), h);
    CropWindow {
        x: (w - width) / 2,
        y: (h - height) / 2,
        width,
        height,
    }
}

/// Radial darkening falloff for the vignette overlay.
///
/// Transparent inside `inner` (45% of the short side), reaching full coverage
/// at `outer` (the long side), linear in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialFalloff {
    pub cx: f64,
    pub cy: f64,
    pub inner: f64,
    pub outer: f64,
}

impl RadialFalloff {
    pub fn for_canvas(width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        Self {
            cx: w / 2.0,
            cy: h / 2.0,
            inner: w.min(h) * 0.45,
            outer: w.max(h),
        }
    }

    /// Coverage in `[0, 1]` at a canvas point.
    pub fn coverage(&self, x: f64, y: f64) -> f64 {
        let d = (x - self.cx).hypot(y - self.cy);
        if self.outer <= self.inner {
            return if d >= self.outer { 1.0 } else { 0.0 };
        }
        ((d - self.inner) / (self.outer - self.inner)).clamp(0.0, 1.0)
    }
}

/// Convert an angle argument to degrees. Unitless is only valid for zero.
pub fn angle_degrees(value: f64, unit: &str) -> Option<f64> {
    match unit {
        "deg" => Some(value),
        "rad" => Some(value.to_degrees()),
        "grad" => Some(value * 0.9),
        "turn" => Some(value * 360.0),
        "" if value == 0.0 => Some(0.0),
        _ => None,
    }
}

/// Resolve a filter amount: plain number or percentage.
pub fn amount(value: f64, unit: &str) -> Option<f64> {
    match unit {
        "" => Some(value),
        "%" => Some(value / 100.0),
        _ => None,
    }
}

/// A 3x3 RGB color matrix as used by the CSS filter functions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix(pub [[f32; 3]; 3]);

impl ColorMatrix {
    pub fn saturate(s: f32) -> Self {
        Self([
            [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
            [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
            [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
        ])
    }

    pub fn grayscale(amount: f32) -> Self {
        let k = 1.0 - amount.clamp(0.0, 1.0);
        Self([
            [0.2126 + 0.7874 * k, 0.7152 - 0.7152 * k, 0.0722 - 0.0722 * k],
            [0.2126 - 0.2126 * k, 0.7152 + 0.2848 * k, 0.0722 - 0.0722 * k],
            [0.2126 - 0.2126 * k, 0.7152 - 0.7152 * k, 0.0722 + 0.9278 * k],
        ])
    }

    pub fn sepia(amount: f32) -> Self {
        let k = 1.0 - amount.clamp(0.0, 1.0);
        Self([
            [0.393 + 0.607 * k, 0.769 - 0.769 * k, 0.189 - 0.189 * k],
            [0.349 - 0.349 * k, 0.686 + 0.314 * k, 0.168 - 0.168 * k],
            [0.272 - 0.272 * k, 0.534 - 0.534 * k, 0.131 + 0.869 * k],
        ])
    }

    pub fn hue_rotate(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self([
            [
                0.213 + cos * 0.787 - sin * 0.213,
                0.715 - cos * 0.715 - sin * 0.715,
                0.072 - cos * 0.072 + sin * 0.928,
            ],
            [
                0.213 - cos * 0.213 + sin * 0.143,
                0.715 + cos * 0.285 + sin * 0.140,
                0.072 - cos * 0.072 - sin * 0.283,
            ],
            [
                0.213 - cos * 0.213 - sin * 0.787,
                0.715 - cos * 0.715 + sin * 0.715,
                0.072 + cos * 0.928 + sin * 0.072,
            ],
        ])
    }

    /// Transform one RGB triple, clamping each channel to `[0, 1]`.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let m = &self.0;
        let mut out = [0.0; 3];
        for (row, slot) in m.iter().zip(out.iter_mut()) {
            *slot = (row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2]).clamp(0.0, 1.0);
        }
        out
    }
}
