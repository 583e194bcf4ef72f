//! # Shutterpost
//!
//! The post-creation core of a photo-sharing client: pick an image, apply a
//! filter preset at a strength plus manual adjustments and a centered zoom,
//! rasterize the result to JPEG, and publish it as a post through pluggable
//! blob and document stores.
//!
//! # Architecture: Expressions In, Pixels Out
//!
//! Every edit control reduces to data before any pixel is touched:
//!
//! ```text
//! filter preset ─┐
//!   × strength   ├─→ EffectExpression ─┐
//! adjustments  ──┘   (filter, then     ├─→ RasterParams ─→ RasterBackend ─→ JPEG
//!                     adjustments)     │
//! vignette slider ──→ overlay opacity ─┘
//! zoom ─────────────────────────────────┘
//! ```
//!
//! The compositors are pure functions over [`imaging::EffectExpression`], so
//! they are tested without images. The backend is a trait, so the upload
//! workflow is tested with a recording mock and no decoding.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Effect expressions, filter catalog, compositors, pure-Rust rasterizer |
//! | [`pending`] | The post being edited, and direct multi-file posts |
//! | [`preview`] | Live preview references, released on drop |
//! | [`session`] | Read-only snapshot of the signed-in user |
//! | [`upload`] | The share state machine: validate → rasterize → upload → record |
//! | [`store`] | Blob and document store traits with local filesystem implementations |
//! | [`feed`] | Newest-first listing of shared posts |
//! | [`naming`] | Blob path convention for uploaded images |
//! | [`types`] | Post records as written and as read |
//! | [`config`] | `shutterpost.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Structured Effect Expressions
//!
//! Filter effects are a list of `name(value unit)` terms, parsed once at the
//! boundary and serialized back for display. Strength attenuation and
//! adjustment building operate on numbers, never on strings, and a term the
//! crate does not understand is carried through untouched.
//!
//! ## Explicit Session, Injected Stores
//!
//! The upload workflow owns no global state. The caller passes the session at
//! share time and the stores at construction, which keeps every failure path
//! reachable from a unit test.
//!
//! ## Blob Before Record
//!
//! The image is uploaded before the post record is inserted. A failed insert
//! leaves the uploaded image in place; nothing deletes it afterwards.

pub mod config;
pub mod feed;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod pending;
pub mod preview;
pub mod session;
pub mod store;
pub mod types;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
