//! Rasterization backend trait and shared types.
//!
//! The [`RasterBackend`] trait defines the two operations every backend must
//! support: identify (read natural dimensions) and rasterize (zoom, filter,
//! vignette, encode).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests swap in the recording mock below.

use super::params::RasterParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("Failed to decode source image: {0}")]
    Decode(String),
    #[error("Source image has no pixels")]
    EmptyImage,
    #[error("Failed to encode image: {0}")]
    Encode(String),
    #[error("Encoder returned no data")]
    EmptyOutput,
}

/// Natural pixel dimensions of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for rasterization backends.
pub trait RasterBackend: Sync {
    /// Read the natural dimensions of an encoded image.
    fn identify(&self, source: &[u8]) -> Result<Dimensions, RasterError>;

    /// Produce the flattened, encoded output image at the source's dimensions.
    fn rasterize(&self, source: &[u8], params: &RasterParams) -> Result<Vec<u8>, RasterError>;
}

impl<T: RasterBackend + ?Sized> RasterBackend for &T {
    fn identify(&self, source: &[u8]) -> Result<Dimensions, RasterError> {
        (**self).identify(source)
    }

    fn rasterize(&self, source: &[u8], params: &RasterParams) -> Result<Vec<u8>, RasterError> {
        (**self).rasterize(source, params)
    }
}
