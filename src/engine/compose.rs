//! Full composition: photos into holes, template on top, then stickers and
//! text.
//!
//! Per-element preparation runs on rayon's pool; blending is sequential in
//! request order so later elements always land on top of earlier ones.

use bytes::Bytes;
use image::{ImageError, Rgb, RgbaImage};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::assets::{FontLibrary, StickerLibrary};
use super::compositor::{self, composite, merge_template, AlphaMode, OverlayError};
use super::filters::{apply_filters, apply_filters_with_rng};
use super::geometry::Placed;
use super::raster::Raster;
use super::template::{Template, TemplateError};
use super::text::{layout_text, TextError};
use crate::domain::{FilterSettings, StickerPlacement, TextBlock, Transform};

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Got {photos} photos for a template with {holes} holes")]
    SizeMismatch { photos: usize, holes: usize },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Failed to decode image: {0}")]
    Decode(#[from] ImageError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ComposeError {
    pub fn is_client_error(&self) -> bool {
        match self {
            ComposeError::SizeMismatch { .. } | ComposeError::InvalidInput(_) | ComposeError::Decode(_) => true,
            ComposeError::Template(e) => e.is_client_error(),
            ComposeError::Internal(_) => false,
        }
    }
}

/// One decoded photo with its per-photo settings
#[derive(Debug, Clone)]
pub struct PhotoInput {
    pub image: Raster,
    /// Solid colour to flatten a background-removed photo onto
    pub background_color: Option<Rgb<u8>>,
    pub filters: FilterSettings,
}

impl PhotoInput {
    pub fn new(image: Raster) -> Self {
        PhotoInput {
            image,
            background_color: None,
            filters: FilterSettings::default(),
        }
    }
}

/// Everything needed to compose one output image
#[derive(Debug, Clone, Default)]
pub struct CompositionRequest {
    /// One photo per template hole, in hole order
    pub photos: Vec<PhotoInput>,
    /// Per-hole transformations; missing entries use the template's defaults
    pub transformations: Vec<Transform>,
    pub stickers: Vec<StickerPlacement>,
    pub texts: Vec<TextBlock>,
    /// Fixed seed for film grain, for reproducible output
    pub grain_seed: Option<u64>,
}

/// Composed image and what had to be left out
#[derive(Debug)]
pub struct CompositionResult {
    pub image: RgbaImage,
    pub photos_drawn: usize,
    pub overlays_skipped: usize,
}

impl CompositionResult {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn encode_png(&self) -> Result<Bytes, ImageError> {
        Raster::Rgba(self.image.clone()).encode_png().map(Bytes::from)
    }
}

/// Compose photos, stickers and text onto a template.
///
/// A photo count that differs from the hole count fails the whole request.
/// Stickers and text blocks that cannot be drawn are skipped.
pub fn compose(
    template: &Template,
    request: CompositionRequest,
    fonts: &FontLibrary,
    stickers: &StickerLibrary,
) -> Result<CompositionResult, ComposeError> {
    let holes = template.holes();
    if request.photos.len() != holes.len() {
        return Err(ComposeError::SizeMismatch {
            photos: request.photos.len(),
            holes: holes.len(),
        });
    }

    let transforms: Vec<Transform> = (0..holes.len())
        .map(|i| {
            request
                .transformations
                .get(i)
                .or_else(|| template.metadata.transformations.get(i))
                .copied()
                .unwrap_or_default()
        })
        .collect();

    for (index, (photo, transform)) in request.photos.iter().zip(&transforms).enumerate() {
        photo
            .filters
            .validate()
            .map_err(|e| ComposeError::InvalidInput(format!("photo {}: {}", index, e)))?;
        transform
            .validate()
            .map_err(|e| ComposeError::InvalidInput(format!("transformation {}: {}", index, e)))?;
    }

    debug!(
        template_id = %template.metadata.id,
        photos = request.photos.len(),
        stickers = request.stickers.len(),
        texts = request.texts.len(),
        "Starting composition"
    );

    // 1. Prepare photos in parallel, keeping hole order
    let grain_seed = request.grain_seed;
    let prepared: Vec<Option<Placed>> = request
        .photos
        .into_par_iter()
        .zip(holes.par_iter())
        .zip(transforms.par_iter())
        .enumerate()
        .map(|(index, ((photo, hole), transform))| {
            let image = match photo.background_color {
                Some(color) => compositor::flatten_onto_color(photo.image, color),
                None => photo.image,
            };
            let filtered = match grain_seed {
                Some(seed) => {
                    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
                    apply_filters_with_rng(image, &photo.filters, &mut rng)
                }
                None => apply_filters(image, &photo.filters),
            };
            compositor::prepare_photo(filtered, hole, transform)
        })
        .collect();

    // 2. Blend photos onto a white canvas
    let (width, height) = template.image.dimensions();
    let mut canvas = Raster::filled_rgb(width, height, Rgb([255, 255, 255]));
    let mut photos_drawn = 0;
    for (index, placed) in prepared.iter().enumerate() {
        match placed {
            Some(placed) if composite(&mut canvas, placed, AlphaMode::Straight) => photos_drawn += 1,
            _ => debug!(index, "Photo left empty"),
        }
    }

    // 3. Template foreground over the photos
    let mut canvas = Raster::Rgba(merge_template(&canvas.into_rgb(), &template.image));

    // 4. Stickers, then text
    let mut overlays_skipped = 0;

    let sticker_layers: Vec<Result<Placed, OverlayError>> = request
        .stickers
        .par_iter()
        .map(|sticker| {
            compositor::validate_overlay(&sticker.placement())?;
            let raster = stickers.load(&sticker.path)?;
            compositor::prepare_overlay(raster, &sticker.placement())
        })
        .collect();
    for (sticker, layer) in request.stickers.iter().zip(sticker_layers) {
        match layer {
            Ok(layer) => {
                if !composite(&mut canvas, &layer, AlphaMode::Straight) {
                    debug!(path = %sticker.path, "Sticker is outside the canvas");
                    overlays_skipped += 1;
                }
            }
            Err(e) => {
                warn!(path = %sticker.path, error = %e, "Skipping sticker");
                overlays_skipped += 1;
            }
        }
    }

    let text_layers: Vec<Result<Placed, TextError>> = request
        .texts
        .par_iter()
        .map(|block| {
            let font = fonts.load(&block.font)?;
            layout_text(&font, block)
        })
        .collect();
    for (block, layer) in request.texts.iter().zip(text_layers) {
        match layer {
            Ok(layer) => {
                if !composite(&mut canvas, &layer, AlphaMode::Premultiplied) {
                    debug!(font = %block.font, "Text block is outside the canvas");
                    overlays_skipped += 1;
                }
            }
            Err(e) => {
                warn!(font = %block.font, error = %e, "Skipping text block");
                overlays_skipped += 1;
            }
        }
    }

    info!(
        template_id = %template.metadata.id,
        width,
        height,
        photos_drawn,
        overlays_skipped,
        "Composition complete"
    );

    Ok(CompositionResult {
        image: canvas.into_rgba(),
        photos_drawn,
        overlays_skipped,
    })
}
