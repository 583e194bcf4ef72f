//! Built-in filter presets.
//!
//! Each preset pairs a stable id with a display label and the base effect
//! expression applied at full strength. The table is fixed at compile time;
//! ids are what gets stored in strength maps and passed on the command line.

use super::expression::EffectExpression;
use std::sync::LazyLock;

/// Id of the pass-through preset every session starts on.
pub const DEFAULT_FILTER_ID: &str = "normal";

/// A named filter preset.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDefinition {
    pub id: &'static str,
    pub label: &'static str,
    pub base_effect: EffectExpression,
}

const PRESETS: &[(&str, &str, &str)] = &[
    ("normal", "Normal", "none"),
    ("aden", "Aden", "brightness(1.05) contrast(0.9) saturate(1.2)"),
    ("clarendon", "Clarendon", "contrast(1.2) saturate(1.35)"),
    ("crema", "Crema", "sepia(0.2) contrast(0.95) saturate(1.1)"),
    ("gingham", "Gingham", "contrast(0.9) brightness(1.05) sepia(0.15)"),
    ("juno", "Juno", "saturate(1.3) contrast(1.1)"),
    ("lark", "Lark", "contrast(1.1) saturate(1.2)"),
    ("ludwig", "Ludwig", "contrast(1.1) saturate(1.1)"),
    ("moon", "Moon", "grayscale(1) contrast(1.1) brightness(1.1)"),
    ("valen", "Valen", "sepia(0.25) saturate(1.2) brightness(1.05)"),
    ("perpetua", "Perpetua", "contrast(0.95) saturate(1.1)"),
    ("reyes", "Reyes", "sepia(0.2) contrast(0.85) brightness(1.1)"),
    ("slumber", "Slumber", "saturate(0.8) contrast(1.05)"),
];

static CATALOG: LazyLock<Vec<FilterDefinition>> = LazyLock::new(|| {
    PRESETS
        .iter()
        .map(|&(id, label, effect)| FilterDefinition {
            id,
            label,
            base_effect: EffectExpression::parse(effect)
                .expect("built-in filter expressions must parse"),
        })
        .collect()
});

/// All presets in display order.
pub fn filters() -> &'static [FilterDefinition] {
    &CATALOG
}

pub fn find_filter(id: &str) -> Option<&'static FilterDefinition> {
    CATALOG.iter().find(|f| f.id == id)
}

/// Look up a preset, falling back to [`DEFAULT_FILTER_ID`] for unknown ids.
pub fn filter_or_default(id: &str) -> &'static FilterDefinition {
    find_filter(id).unwrap_or(&CATALOG[0])
}
