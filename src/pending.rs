//! The post being created: source image, edit controls, and details.
//!
//! A [`PendingPost`] walks three steps (`Select → Edit → Details`). Choosing
//! an image replaces the previous one and resets every edit control; the
//! filter, strength, adjustment and zoom setters clamp their input so the
//! session never holds an out-of-range value.
//!
//! The session owns one live [`PreviewUrl`] for the current image and a
//! [`CancelToken`] the upload workflow checks between stages.
//!
//! A [`DirectPost`] is the shortcut path: several original files plus a
//! caption and location, shared as-is.

use crate::imaging::calculations::{FULL_STRENGTH, MIN_ZOOM, clamp_zoom, normalize_strength};
use crate::imaging::{
    Adjustment, AdjustmentState, ComposedEffect, DEFAULT_FILTER_ID, EffectExpression,
    FilterDefinition, Quality, RasterParams, filter_or_default, filters, plan_render,
};
use crate::preview::{PreviewRegistry, PreviewUrl};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SelectError {
    #[error("{file_name} is not an image (content type {content_type:?})")]
    NotAnImage {
        file_name: String,
        content_type: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file chosen by the user, before any editing.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl SourceImage {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing the content type from its extension.
    pub fn from_path(path: &Path) -> Result<Self, SelectError> {
        let bytes = std::fs::read(path)?;
        let content_type = image::ImageFormat::from_path(path)
            .map(|f| f.to_mime_type())
            .unwrap_or("application/octet-stream");
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, content_type, bytes))
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Where the user is in the create flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CreateStep {
    Select,
    Edit,
    Details,
}

impl CreateStep {
    fn next(self) -> Self {
        match self {
            CreateStep::Select => CreateStep::Edit,
            CreateStep::Edit | CreateStep::Details => CreateStep::Details,
        }
    }

    fn prev(self) -> Self {
        match self {
            CreateStep::Details => CreateStep::Edit,
            CreateStep::Edit | CreateStep::Select => CreateStep::Select,
        }
    }
}

/// Per-filter strength, 0–100. Every filter starts at full strength.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStrengthMap {
    strengths: BTreeMap<&'static str, f64>,
}

impl Default for FilterStrengthMap {
    fn default() -> Self {
        Self {
            strengths: filters().iter().map(|f| (f.id, FULL_STRENGTH)).collect(),
        }
    }
}

impl FilterStrengthMap {
    pub fn get(&self, filter_id: &str) -> f64 {
        self.strengths
            .get(filter_id)
            .copied()
            .unwrap_or(FULL_STRENGTH)
    }

    /// Set a strength for a catalog filter, clamped to `[0, 100]`.
    pub fn set(&mut self, filter: &FilterDefinition, strength: f64) {
        self.strengths.insert(filter.id, normalize_strength(strength));
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Caption and sharing options entered on the last step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDetails {
    pub caption: String,
    pub location: String,
    pub alt_text: String,
    pub hide_metrics: bool,
    pub disable_comments: bool,
    pub share_to_threads: bool,
}

impl Default for PostDetails {
    fn default() -> Self {
        Self {
            caption: String::new(),
            location: String::new(),
            alt_text: String::new(),
            hide_metrics: false,
            disable_comments: false,
            share_to_threads: true,
        }
    }
}

/// An in-progress post.
#[derive(Debug)]
pub struct PendingPost {
    registry: PreviewRegistry,
    source: Option<SourceImage>,
    preview: Option<PreviewUrl>,
    step: CreateStep,
    filter: &'static FilterDefinition,
    strengths: FilterStrengthMap,
    adjustments: AdjustmentState,
    zoom: f64,
    details: PostDetails,
    cancel: CancelToken,
}

impl Default for PendingPost {
    fn default() -> Self {
        Self::new(PreviewRegistry::new())
    }
}

impl PendingPost {
    pub fn new(registry: PreviewRegistry) -> Self {
        Self {
            registry,
            source: None,
            preview: None,
            step: CreateStep::Select,
            filter: filter_or_default(DEFAULT_FILTER_ID),
            strengths: FilterStrengthMap::default(),
            adjustments: AdjustmentState::default(),
            zoom: MIN_ZOOM,
            details: PostDetails::default(),
            cancel: CancelToken::new(),
        }
    }

    // =========================================================================
    // Source image
    // =========================================================================

    /// Replace the source image and reset every edit control.
    ///
    /// Non-image files are rejected and leave the session untouched.
    pub fn select_image(&mut self, image: SourceImage) -> Result<(), SelectError> {
        if !image.is_image() {
            return Err(SelectError::NotAnImage {
                file_name: image.file_name,
                content_type: image.content_type,
            });
        }

        // Release the old reference before issuing the new one.
        self.preview = None;
        self.preview = Some(self.registry.create(&image.file_name));
        tracing::debug!(file = %image.file_name, bytes = image.bytes.len(), "selected image");

        self.source = Some(image);
        self.zoom = MIN_ZOOM;
        self.filter = filter_or_default(DEFAULT_FILTER_ID);
        self.strengths = FilterStrengthMap::default();
        self.adjustments = AdjustmentState::default();
        Ok(())
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn preview_url(&self) -> Option<&PreviewUrl> {
        self.preview.as_ref()
    }

    // =========================================================================
    // Steps
    // =========================================================================

    pub fn step(&self) -> CreateStep {
        self.step
    }

    /// The first step needs an image; later steps can always advance.
    pub fn can_next(&self) -> bool {
        self.step != CreateStep::Select || self.source.is_some()
    }

    /// Advance one step if allowed. Returns whether the step changed.
    pub fn next(&mut self) -> bool {
        if !self.can_next() {
            return false;
        }
        let before = self.step;
        self.step = self.step.next();
        before != self.step
    }

    /// Go back one step. Returns whether the step changed.
    pub fn prev(&mut self) -> bool {
        let before = self.step;
        self.step = self.step.prev();
        before != self.step
    }

    pub fn is_final_step(&self) -> bool {
        self.step == CreateStep::Details
    }

    // =========================================================================
    // Filter and adjustments
    // =========================================================================

    pub fn filter(&self) -> &'static FilterDefinition {
        self.filter
    }

    /// Switch the active filter. Unknown ids select `normal`.
    pub fn select_filter(&mut self, filter_id: &str) {
        self.filter = filter_or_default(filter_id);
    }

    pub fn reset_filter(&mut self) {
        self.filter = filter_or_default(DEFAULT_FILTER_ID);
    }

    /// Strength of the active filter.
    pub fn filter_strength(&self) -> f64 {
        self.strengths.get(self.filter.id)
    }

    /// Set the strength of the active filter only.
    pub fn set_filter_strength(&mut self, strength: f64) {
        self.strengths.set(self.filter, strength);
    }

    pub fn strengths(&self) -> &FilterStrengthMap {
        &self.strengths
    }

    pub fn adjustments(&self) -> &AdjustmentState {
        &self.adjustments
    }

    pub fn set_adjustment(&mut self, adjustment: Adjustment, value: i32) {
        self.adjustments.set(adjustment, value);
    }

    pub fn reset_adjustment(&mut self, adjustment: Adjustment) {
        self.adjustments.reset(adjustment);
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set the zoom, clamped to `[1, 2]`.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = clamp_zoom(zoom);
    }

    /// Filter at its strength, then adjustments, plus the vignette opacity.
    pub fn composed(&self) -> ComposedEffect {
        ComposedEffect::new(
            &self.filter.base_effect,
            self.filter_strength(),
            &self.adjustments,
        )
    }

    pub fn preview_expression(&self) -> EffectExpression {
        self.composed().combined
    }

    pub fn vignette_opacity(&self) -> f64 {
        self.adjustments.vignette_opacity()
    }

    /// Everything the rasterizer needs for this post.
    pub fn raster_params(&self, quality: Quality) -> RasterParams {
        plan_render(&self.composed(), self.zoom, quality)
    }

    // =========================================================================
    // Details and lifecycle
    // =========================================================================

    pub fn details(&self) -> &PostDetails {
        &self.details
    }

    pub fn details_mut(&mut self) -> &mut PostDetails {
        &mut self.details
    }

    pub fn set_caption(&mut self, caption: impl Into<String>) {
        self.details.caption = caption.into();
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.details.location = location.into();
    }

    pub fn set_alt_text(&mut self, alt_text: impl Into<String>) {
        self.details.alt_text = alt_text.into();
    }

    /// A handle that cancels any upload of this post, usable from other threads.
    pub fn cancellation(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Abandon the post: cancel any upload in progress, release the preview,
    /// and start over from an empty session.
    pub fn discard(&mut self) {
        self.cancel.cancel();
        let registry = self.registry.clone();
        *self = Self::new(registry);
        tracing::debug!("discarded pending post");
    }
}

// =========================================================================
// Direct upload
// =========================================================================

/// Several original files shared as one post, without the edit steps.
///
/// Each selected file holds its own [`PreviewUrl`]; choosing a new set or
/// resetting releases all of them.
#[derive(Debug)]
pub struct DirectPost {
    registry: PreviewRegistry,
    files: Vec<(SourceImage, PreviewUrl)>,
    caption: String,
    location: String,
    cancel: CancelToken,
}

impl Default for DirectPost {
    fn default() -> Self {
        Self::new(PreviewRegistry::new())
    }
}

impl DirectPost {
    pub fn new(registry: PreviewRegistry) -> Self {
        Self {
            registry,
            files: Vec::new(),
            caption: String::new(),
            location: String::new(),
            cancel: CancelToken::new(),
        }
    }

    /// Replace the selection. An empty list clears it.
    ///
    /// If any file is not an image the whole selection is rejected and the
    /// previous one is kept.
    pub fn select_files(&mut self, files: Vec<SourceImage>) -> Result<(), SelectError> {
        if let Some(bad) = files.iter().find(|f| !f.is_image()) {
            return Err(SelectError::NotAnImage {
                file_name: bad.file_name.clone(),
                content_type: bad.content_type.clone(),
            });
        }

        self.files.clear();
        self.files = files
            .into_iter()
            .map(|file| {
                let preview = self.registry.create(&file.file_name);
                (file, preview)
            })
            .collect();
        tracing::debug!(count = self.files.len(), "selected files");
        Ok(())
    }

    /// Selected files in selection order.
    pub fn sources(&self) -> impl Iterator<Item = &SourceImage> {
        self.files.iter().map(|(file, _)| file)
    }

    pub fn preview_urls(&self) -> impl Iterator<Item = &PreviewUrl> {
        self.files.iter().map(|(_, preview)| preview)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn set_caption(&mut self, caption: impl Into<String>) {
        self.caption = caption.into();
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = location.into();
    }

    pub fn cancellation(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Clear files, caption and location. Any upload in progress is cancelled.
    pub fn reset(&mut self) {
        self.cancel.cancel();
        let registry = self.registry.clone();
        *self = Self::new(registry);
    }
}
