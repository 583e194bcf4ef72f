//! Image effects and rasterization, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Zoom** | `crop_imm` + Lanczos3 `resize` |
//! | **Effect terms** | color matrices over `Rgba32FImage`, `rayon` rows |
//! | **Vignette** | radial source-over overlay |
//! | **Encode → JPEG** | `JpegEncoder`, quality 92 |
//!
//! The module is split into:
//! - **Expression**: [`EffectExpression`], parsed and serialized at the boundary
//! - **Catalog**: the compiled-in filter presets
//! - **Compose**: strength, adjustment and preview compositors
//! - **Calculations**: Pure functions for effect values and geometry (unit testable)
//! - **Parameters**: Data structures describing a rasterization
//! - **Backend**: [`RasterBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining compositors + backend

pub mod backend;
pub mod calculations;
pub mod catalog;
pub mod compose;
pub mod expression;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{Dimensions, RasterBackend, RasterError};
pub use catalog::{DEFAULT_FILTER_ID, FilterDefinition, filter_or_default, filters, find_filter};
pub use compose::{
    Adjustment, AdjustmentState, ComposedEffect, apply_strength, build_adjustments,
    compose_preview,
};
pub use expression::{EffectExpression, EffectTerm, ExpressionError};
pub use operations::{RenderedImage, get_dimensions, plan_render, render};
pub use params::{OUTPUT_CONTENT_TYPE, OUTPUT_EXTENSION, Quality, RasterParams};
pub use rust_backend::RustBackend;
