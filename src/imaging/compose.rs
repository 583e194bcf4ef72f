//! Effect composition: filter strength, manual adjustments, and the preview.
//!
//! Three compositors feed the rasterizer:
//!
//! | Function | Input | Output |
//! |---|---|---|
//! | [`apply_strength`] | preset expression + 0–100 strength | attenuated expression |
//! | [`build_adjustments`] | [`AdjustmentState`] | adjustment expression |
//! | [`compose_preview`] | both of the above | combined expression, filter first |
//!
//! The vignette slider is not an expression term: it becomes a separate
//! overlay opacity ([`vignette_opacity`]) because it darkens by compositing a
//! radial gradient, not by filtering pixels.

use super::calculations::{attenuate, normalize_strength, round_half_up};
use super::expression::{Argument, EffectExpression, EffectTerm, neutral_value};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Maximum vignette overlay opacity (slider at 100).
pub const MAX_VIGNETTE_OPACITY: f64 = 0.6;

/// Attenuate a preset toward neutral.
///
/// Each recognized numeric term becomes `neutral + (value - neutral) * s/100`,
/// rounded to 3 decimals. Unrecognized names and raw arguments pass through.
/// Strength 0 yields `none`; non-finite strength means full strength.
pub fn apply_strength(base: &EffectExpression, strength: f64) -> EffectExpression {
    if base.is_none() {
        return EffectExpression::none();
    }
    let strength = normalize_strength(strength);
    if strength == 0.0 {
        return EffectExpression::none();
    }
    let ratio = strength / 100.0;

    let terms = base
        .terms()
        .iter()
        .map(|term| match (&term.argument, neutral_value(&term.name)) {
            (Argument::Number { value, unit }, Some(neutral)) => EffectTerm::number(
                term.name.clone(),
                round_half_up(attenuate(*value, neutral, ratio), 3),
                unit.clone(),
            ),
            _ => term.clone(),
        })
        .collect();
    EffectExpression::new(terms)
}

/// One of the manual adjustment sliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Adjustment {
    Brightness,
    Contrast,
    Blur,
    Saturate,
    Temperature,
    Vignette,
}

impl Adjustment {
    pub const ALL: [Adjustment; 6] = [
        Adjustment::Brightness,
        Adjustment::Contrast,
        Adjustment::Blur,
        Adjustment::Saturate,
        Adjustment::Temperature,
        Adjustment::Vignette,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Adjustment::Brightness => "brightness",
            Adjustment::Contrast => "contrast",
            Adjustment::Blur => "blur",
            Adjustment::Saturate => "saturate",
            Adjustment::Temperature => "temperature",
            Adjustment::Vignette => "vignette",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Adjustment::Brightness => "Brightness",
            Adjustment::Contrast => "Contrast",
            Adjustment::Blur => "Blur",
            Adjustment::Saturate => "Saturation",
            Adjustment::Temperature => "Temperature",
            Adjustment::Vignette => "Vignette",
        }
    }

    /// Slider bounds.
    pub fn range(self) -> RangeInclusive<i32> {
        match self {
            Adjustment::Vignette => 0..=100,
            _ => -100..=100,
        }
    }
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Adjustment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Adjustment::ALL
            .into_iter()
            .find(|a| a.id() == s)
            .ok_or_else(|| {
                let ids: Vec<&str> = Adjustment::ALL.iter().map(|a| a.id()).collect();
                format!("unknown adjustment '{s}' (expected one of: {})", ids.join(", "))
            })
    }
}

/// Slider positions for every [`Adjustment`]. All zero by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdjustmentState {
    brightness: i32,
    contrast: i32,
    blur: i32,
    saturate: i32,
    temperature: i32,
    vignette: i32,
}

impl AdjustmentState {
    pub fn get(&self, adjustment: Adjustment) -> i32 {
        match adjustment {
            Adjustment::Brightness => self.brightness,
            Adjustment::Contrast => self.contrast,
            Adjustment::Blur => self.blur,
            Adjustment::Saturate => self.saturate,
            Adjustment::Temperature => self.temperature,
            Adjustment::Vignette => self.vignette,
        }
    }

    /// Set a slider, clamped to its range.
    pub fn set(&mut self, adjustment: Adjustment, value: i32) {
        let range = adjustment.range();
        let value = value.clamp(*range.start(), *range.end());
        let slot = match adjustment {
            Adjustment::Brightness => &mut self.brightness,
            Adjustment::Contrast => &mut self.contrast,
            Adjustment::Blur => &mut self.blur,
            Adjustment::Saturate => &mut self.saturate,
            Adjustment::Temperature => &mut self.temperature,
            Adjustment::Vignette => &mut self.vignette,
        };
        *slot = value;
    }

    pub fn reset(&mut self, adjustment: Adjustment) {
        self.set(adjustment, 0);
    }

    pub fn with(mut self, adjustment: Adjustment, value: i32) -> Self {
        self.set(adjustment, value);
        self
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }

    pub fn vignette_opacity(&self) -> f64 {
        vignette_opacity(self.vignette)
    }
}

fn factor(value: i32) -> f64 {
    (1.0 + value as f64 / 100.0).clamp(0.0, 2.0)
}

/// Build the adjustment expression, leaving out every slider at zero.
///
/// Term order is fixed: brightness, contrast, blur, saturate, hue-rotate.
pub fn build_adjustments(state: &AdjustmentState) -> EffectExpression {
    let mut expr = EffectExpression::none();

    if state.brightness != 0 {
        expr.push(EffectTerm::number("brightness", factor(state.brightness), ""));
    }
    if state.contrast != 0 {
        expr.push(EffectTerm::number("contrast", factor(state.contrast), ""));
    }
    if state.blur > 0 {
        expr.push(EffectTerm::number("blur", state.blur as f64 / 10.0, "px"));
    }
    if state.saturate != 0 {
        expr.push(EffectTerm::number("saturate", factor(state.saturate), ""));
    }
    if state.temperature != 0 {
        // Hue rotation stands in for a white-balance shift.
        let degrees = round_half_up(state.temperature as f64 * 0.5, 0);
        expr.push(EffectTerm::number("hue-rotate", degrees, "deg"));
    }

    expr
}

/// Overlay opacity for a vignette slider value: `clamp(v, 0, 100) / 100 * 0.6`.
pub fn vignette_opacity(value: i32) -> f64 {
    value.clamp(0, 100) as f64 / 100.0 * MAX_VIGNETTE_OPACITY
}

/// Preview expression: filter terms first, then adjustment terms.
pub fn compose_preview(filter: &EffectExpression, adjustments: &EffectExpression) -> EffectExpression {
    filter.clone().then(adjustments.clone())
}

/// Everything the rasterizer needs from the edit controls.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedEffect {
    pub filter: EffectExpression,
    pub adjustments: EffectExpression,
    pub combined: EffectExpression,
    pub vignette_opacity: f64,
}

impl ComposedEffect {
    pub fn new(base: &EffectExpression, strength: f64, state: &AdjustmentState) -> Self {
        let filter = apply_strength(base, strength);
        let adjustments = build_adjustments(state);
        let combined = compose_preview(&filter, &adjustments);
        Self {
            filter,
            adjustments,
            combined,
            vignette_opacity: state.vignette_opacity(),
        }
    }
}
