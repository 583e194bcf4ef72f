//! Pure Rust rasterization backend.
//!
//! ## Crate mapping
//!
//! | Step | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::load_from_memory` |
//! | Centered zoom | `image::imageops::crop_imm` + `resize` with `Lanczos3`, premultiplied |
//! | Color terms | 3x3 matrices / linear transfers, row-parallel via `rayon` |
//! | `blur(Npx)` | `image::imageops::blur` (gaussian, sigma = N), premultiplied |
//! | Vignette | radial source-over black, row-parallel via `rayon` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//!
//! Pixels are processed as straight-alpha `f32` RGBA so chained terms do not
//! accumulate 8-bit rounding; the canvas is flattened over black only at
//! encode time.

use super::backend::{Dimensions, RasterBackend, RasterError};
use super::calculations::{ColorMatrix, RadialFalloff, amount, angle_degrees, source_window};
use super::expression::{EffectExpression, EffectTerm};
use super::params::{Quality, RasterParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, Rgb, RgbImage, Rgba32FImage, RgbaImage};
use rayon::prelude::*;
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-step mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode source bytes into an 8-bit RGBA surface.
fn decode(source: &[u8]) -> Result<RgbaImage, RasterError> {
    let img = image::load_from_memory(source).map_err(|e| RasterError::Decode(e.to_string()))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(RasterError::EmptyImage);
    }
    Ok(img.to_rgba8())
}

/// Scale RGB by alpha so neighbourhood filters weight colour by coverage.
fn premultiply(canvas: &mut Rgba32FImage) {
    canvas.par_chunks_mut(4).for_each(|px| {
        let a = px[3];
        for c in &mut px[..3] {
            *c *= a;
        }
    });
}

/// Inverse of [`premultiply`]. Fully transparent pixels come back black.
fn unpremultiply(canvas: &mut Rgba32FImage) {
    canvas.par_chunks_mut(4).for_each(|px| {
        let a = px[3].clamp(0.0, 1.0);
        px[3] = a;
        for c in &mut px[..3] {
            *c = if a > 0.0 { (*c / a).clamp(0.0, 1.0) } else { 0.0 };
        }
    });
}

/// Draw the source scaled by `zoom` and centered on an equal-sized canvas.
///
/// Resampling runs on premultiplied pixels.
fn draw_zoomed(mut source: Rgba32FImage, zoom: f64) -> Rgba32FImage {
    let dims = source.dimensions();
    let window = source_window(dims, zoom);
    if window.covers(dims) {
        return source;
    }
    premultiply(&mut source);
    let visible =
        imageops::crop_imm(&source, window.x, window.y, window.width, window.height).to_image();
    let mut drawn = imageops::resize(&visible, dims.0, dims.1, FilterType::Lanczos3);
    unpremultiply(&mut drawn);
    drawn
}

/// Gaussian blur on premultiplied pixels.
fn blur(mut canvas: Rgba32FImage, sigma: f32) -> Rgba32FImage {
    premultiply(&mut canvas);
    let mut blurred = imageops::blur(&canvas, sigma);
    unpremultiply(&mut blurred);
    blurred
}

/// A single effect term resolved to pixel math.
#[derive(Debug, Clone, Copy, PartialEq)]
enum PixelOp {
    /// `c' = c * slope + intercept` on each color channel.
    Linear { slope: f32, intercept: f32 },
    Matrix(ColorMatrix),
    Opacity(f32),
    Blur(f32),
}

fn pixel_op(term: &EffectTerm) -> Option<PixelOp> {
    let value = term.value()?;
    let unit = term.unit().unwrap_or("");
    match term.name.as_str() {
        "brightness" => amount(value, unit).map(|a| PixelOp::Linear {
            slope: a.max(0.0) as f32,
            intercept: 0.0,
        }),
        "contrast" => amount(value, unit).map(|a| {
            let a = a.max(0.0) as f32;
            PixelOp::Linear {
                slope: a,
                intercept: 0.5 - 0.5 * a,
            }
        }),
        "invert" => amount(value, unit).map(|a| {
            let a = a.clamp(0.0, 1.0) as f32;
            PixelOp::Linear {
                slope: 1.0 - 2.0 * a,
                intercept: a,
            }
        }),
        "saturate" => {
            amount(value, unit).map(|a| PixelOp::Matrix(ColorMatrix::saturate(a.max(0.0) as f32)))
        }
        "grayscale" => amount(value, unit).map(|a| PixelOp::Matrix(ColorMatrix::grayscale(a as f32))),
        "sepia" => amount(value, unit).map(|a| PixelOp::Matrix(ColorMatrix::sepia(a as f32))),
        "hue-rotate" => {
            angle_degrees(value, unit).map(|d| PixelOp::Matrix(ColorMatrix::hue_rotate(d as f32)))
        }
        "opacity" => amount(value, unit).map(|a| PixelOp::Opacity(a.clamp(0.0, 1.0) as f32)),
        "blur" => match unit {
            "px" => Some(PixelOp::Blur(value.max(0.0) as f32)),
            "" if value == 0.0 => Some(PixelOp::Blur(0.0)),
            _ => None,
        },
        _ => None,
    }
}

fn apply_pixel_op(canvas: &mut Rgba32FImage, op: PixelOp) {
    canvas.par_chunks_mut(4).for_each(|px| match op {
        PixelOp::Linear { slope, intercept } => {
            for c in &mut px[..3] {
                *c = (*c * slope + intercept).clamp(0.0, 1.0);
            }
        }
        PixelOp::Matrix(matrix) => {
            let [r, g, b] = matrix.apply([px[0], px[1], px[2]]);
            px[0] = r;
            px[1] = g;
            px[2] = b;
        }
        PixelOp::Opacity(alpha) => px[3] *= alpha,
        PixelOp::Blur(_) => {}
    });
}

/// Apply every term in order. Unsupported terms are skipped.
fn apply_effects(mut canvas: Rgba32FImage, effect: &EffectExpression) -> Rgba32FImage {
    for term in effect.terms() {
        match pixel_op(term) {
            Some(PixelOp::Blur(sigma)) => {
                if sigma > 0.0 {
                    canvas = blur(canvas, sigma);
                }
            }
            Some(op) => apply_pixel_op(&mut canvas, op),
            None => tracing::debug!(term = %term, "skipping unsupported effect term"),
        }
    }
    canvas
}

/// Composite the black radial vignette over the canvas (source-over).
fn apply_vignette(canvas: &mut Rgba32FImage, opacity: f32) {
    let (width, height) = canvas.dimensions();
    let falloff = RadialFalloff::for_canvas(width, height);
    let row_len = width as usize * 4;

    canvas
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let coverage = falloff.coverage(x as f64 + 0.5, y as f64 + 0.5) as f32 * opacity;
                if coverage <= 0.0 {
                    continue;
                }
                let dst_alpha = px[3];
                let out_alpha = coverage + dst_alpha * (1.0 - coverage);
                if out_alpha > 0.0 {
                    let keep = dst_alpha * (1.0 - coverage) / out_alpha;
                    for c in &mut px[..3] {
                        *c *= keep;
                    }
                }
                px[3] = out_alpha;
            }
        });
}

fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Flatten over black and encode as JPEG.
fn encode_jpeg(canvas: &Rgba32FImage, quality: Quality) -> Result<Vec<u8>, RasterError> {
    let (width, height) = canvas.dimensions();
    let flattened = RgbImage::from_fn(width, height, |x, y| {
        let p = canvas.get_pixel(x, y);
        let a = p[3].clamp(0.0, 1.0);
        Rgb([to_u8(p[0] * a), to_u8(p[1] * a), to_u8(p[2] * a)])
    });

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality.value() as u8);
    DynamicImage::ImageRgb8(flattened)
        .write_with_encoder(encoder)
        .map_err(|e| RasterError::Encode(e.to_string()))?;

    if out.is_empty() {
        return Err(RasterError::EmptyOutput);
    }
    Ok(out)
}

impl RasterBackend for RustBackend {
    fn identify(&self, source: &[u8]) -> Result<Dimensions, RasterError> {
        let (width, height) = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| RasterError::Decode(e.to_string()))?
            .into_dimensions()
            .map_err(|e| RasterError::Decode(e.to_string()))?;
        Ok(Dimensions { width, height })
    }

    fn rasterize(&self, source: &[u8], params: &RasterParams) -> Result<Vec<u8>, RasterError> {
        let decoded = decode(source)?;
        let (width, height) = decoded.dimensions();
        tracing::debug!(width, height, zoom = params.zoom, effect = %params.effect, "rasterizing");

        let drawn = draw_zoomed(DynamicImage::ImageRgba8(decoded).to_rgba32f(), params.zoom);
        let mut canvas = apply_effects(drawn, &params.effect);

        // The filter state ends here; the overlay is drawn unfiltered.
        let overlay = params.overlay_alpha();
        if overlay > 0.0 {
            apply_vignette(&mut canvas, overlay as f32);
        }

        let encoded = encode_jpeg(&canvas, params.quality)?;
        tracing::debug!(bytes = encoded.len(), "encoded output");
        Ok(encoded)
    }
}
