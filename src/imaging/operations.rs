//! High-level image operations.
//!
//! These functions combine the compositors with backend execution. They take
//! the edit controls, compute parameters, and call the backend.

use super::backend::{RasterBackend, RasterError};
use super::compose::ComposedEffect;
use super::params::{OUTPUT_CONTENT_TYPE, OUTPUT_EXTENSION, Quality, RasterParams};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, RasterError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl RasterBackend, source: &[u8]) -> Result<(u32, u32)> {
    let dims = backend.identify(source)?;
    Ok((dims.width, dims.height))
}

/// An encoded post image ready to upload.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub extension: &'static str,
}

/// Plan a rasterization without executing it.
///
/// The combined expression carries the filter first and the adjustments
/// second; the vignette travels separately as an overlay opacity.
pub fn plan_render(composed: &ComposedEffect, zoom: f64, quality: Quality) -> RasterParams {
    RasterParams::new(composed.combined.clone(), zoom, composed.vignette_opacity)
        .with_quality(quality)
}

/// Rasterize a source image into the upload format.
pub fn render(
    backend: &impl RasterBackend,
    source: &[u8],
    params: &RasterParams,
) -> Result<RenderedImage> {
    let bytes = backend.rasterize(source, params)?;
    if bytes.is_empty() {
        return Err(RasterError::EmptyOutput);
    }
    Ok(RenderedImage {
        bytes,
        content_type: OUTPUT_CONTENT_TYPE,
        extension: OUTPUT_EXTENSION,
    })
}
