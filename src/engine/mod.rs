//! Template-driven compositing engine
//!
//! This module contains the core compositing logic including:
//! - Hole extraction and layout inference for templates
//! - Per-photo filters and placement geometry
//! - Alpha compositing of photos, stickers and text
//! - Template generation and the on-disk template library

pub mod assets;
pub mod compose;
pub mod compositor;
pub mod filters;
pub mod generator;
pub mod geometry;
pub mod holes;
pub mod layout;
pub mod raster;
pub mod template;
pub mod text;

pub use assets::{FontLibrary, StickerLibrary};
pub use compose::{compose, ComposeError, CompositionRequest, CompositionResult, PhotoInput};
pub use compositor::{
    composite, composite_overlay, composite_photo, flatten_onto_color, merge_template, AlphaMode, OverlayError,
};
pub use filters::{apply_filters, apply_filters_with_rng};
pub use generator::{generate_template, render_layout_thumbnail, GeneratorError, StylePreset, TemplateStyle};
pub use geometry::Placed;
pub use holes::{extract_holes, HoleError};
pub use layout::infer_layout;
pub use raster::Raster;
pub use template::{Template, TemplateError, TemplateLibrary, TemplateMetadata};
pub use text::{layout_text, TextError, TextLayer};
