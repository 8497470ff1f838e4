//! Alpha compositing of placed layers onto a canvas
//!
//! Layers are clipped against the canvas, then blended row-parallel with the
//! "over" operator in floating point and quantized once per layer.

use image::{ImageError, Rgb, RgbImage, RgbaImage};
use rayon::prelude::*;
use thiserror::Error;

use super::geometry::{self, Placed};
use super::raster::{quantize, Raster};
use crate::domain::{Hole, Placement, PlacementError, Transform};

const WHITE: [u8; 3] = [255, 255, 255];

/// Errors for a single sticker or text overlay; the composition skips the
/// offending element and carries on.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Overlay dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
    #[error("Invalid overlay placement: {0}")]
    InvalidPlacement(#[from] PlacementError),
    #[error("Sticker not found: {0}")]
    StickerNotFound(String),
    #[error("Failed to decode sticker: {0}")]
    Decode(#[from] ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a layer's colour channels relate to its alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    /// Colour is independent of alpha: `dst * (1 - a) + src * a`
    #[default]
    Straight,
    /// Colour is already scaled by alpha: `dst * (1 - a) + src`
    Premultiplied,
}

/// Intersection of a layer with the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRect {
    pub canvas_x: usize,
    pub canvas_y: usize,
    pub src_x: usize,
    pub src_y: usize,
    pub width: usize,
    pub height: usize,
}

/// Clip a `source` sized layer at `pos` against a `canvas` sized target.
/// Returns `None` when they do not overlap.
pub fn clip_to_canvas(canvas: (u32, u32), source: (u32, u32), pos: (i64, i64)) -> Option<ClipRect> {
    let x1 = pos.0.max(0);
    let y1 = pos.1.max(0);
    let x2 = (pos.0 + source.0 as i64).min(canvas.0 as i64);
    let y2 = (pos.1 + source.1 as i64).min(canvas.1 as i64);

    let width = x2 - x1;
    let height = y2 - y1;
    if width <= 0 || height <= 0 {
        return None;
    }

    Some(ClipRect {
        canvas_x: x1 as usize,
        canvas_y: y1 as usize,
        src_x: (x1 - pos.0) as usize,
        src_y: (y1 - pos.1) as usize,
        width: width as usize,
        height: height as usize,
    })
}

/// Blend a placed layer onto the canvas.
///
/// Layers without alpha overwrite the covered region. Returns `false` (and
/// leaves the canvas untouched) when the layer lies entirely off-canvas.
pub fn composite(canvas: &mut Raster, layer: &Placed, mode: AlphaMode) -> bool {
    let Some(clip) = clip_to_canvas(
        canvas.dimensions(),
        layer.raster.dimensions(),
        (layer.x, layer.y),
    ) else {
        return false;
    };

    let dst_channels = canvas.channels();
    let src_channels = layer.raster.channels();
    let dst_stride = canvas.width() as usize * dst_channels;
    let src_stride = layer.raster.width() as usize * src_channels;
    let src = layer.raster.as_bytes();

    canvas
        .as_bytes_mut()
        .par_chunks_mut(dst_stride)
        .skip(clip.canvas_y)
        .take(clip.height)
        .enumerate()
        .for_each(|(row, dst_row)| {
            let src_start = (clip.src_y + row) * src_stride;
            let src_row = &src[src_start..src_start + src_stride];

            for dx in 0..clip.width {
                let d = (clip.canvas_x + dx) * dst_channels;
                let s = (clip.src_x + dx) * src_channels;
                blend_pixel(
                    &mut dst_row[d..d + dst_channels],
                    &src_row[s..s + src_channels],
                    mode,
                );
            }
        });

    true
}

#[inline]
fn blend_pixel(dst: &mut [u8], src: &[u8], mode: AlphaMode) {
    if src.len() == 3 {
        dst[..3].copy_from_slice(src);
        if dst.len() == 4 {
            dst[3] = 255;
        }
        return;
    }

    let alpha = src[3] as f32 / 255.0;
    let inv_alpha = 1.0 - alpha;

    for c in 0..3 {
        let foreground = match mode {
            AlphaMode::Straight => src[c] as f32 * alpha,
            AlphaMode::Premultiplied => src[c] as f32,
        };
        dst[c] = quantize(dst[c] as f32 * inv_alpha + foreground);
    }
    if dst.len() == 4 {
        dst[3] = quantize(src[3] as f32 + dst[3] as f32 * inv_alpha);
    }
}

/// Lay the template over the assembled photo layer.
///
/// The template's alpha is the blend factor: opaque template pixels win,
/// transparent holes show the photos. The result is fully opaque.
pub fn merge_template(photo_layer: &RgbImage, template: &RgbaImage) -> RgbaImage {
    let (width, height) = template.dimensions();
    let mut merged = RgbaImage::new(width, height);
    if width == 0 || height == 0 {
        return merged;
    }

    let (photo_w, photo_h) = photo_layer.dimensions();
    merged
        .par_chunks_mut(width as usize * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as u32;
            for x in 0..width {
                let t = template.get_pixel(x, y).0;
                let background = if x < photo_w && y < photo_h {
                    photo_layer.get_pixel(x, y).0
                } else {
                    WHITE
                };

                let alpha = t[3] as f32 / 255.0;
                let out = &mut row[x as usize * 4..x as usize * 4 + 4];
                for c in 0..3 {
                    out[c] = quantize(t[c] as f32 * alpha + background[c] as f32 * (1.0 - alpha));
                }
                out[3] = 255;
            }
        });

    merged
}

/// Flatten a background-removed photo onto a solid colour.
/// Photos without alpha are returned unchanged.
pub fn flatten_onto_color(photo: Raster, color: Rgb<u8>) -> Raster {
    let mut flat = match &photo {
        Raster::Rgb(_) => return photo,
        Raster::Rgba(img) => Raster::filled_rgb(img.width(), img.height(), color),
    };
    let layer = Placed {
        raster: photo,
        x: 0,
        y: 0,
    };
    composite(&mut flat, &layer, AlphaMode::Straight);
    flat
}

/// Scale, rotate and centre a photo on its hole. `None` when the scale
/// collapses the photo to nothing.
pub fn prepare_photo(photo: Raster, hole: &Hole, transform: &Transform) -> Option<Placed> {
    let (width, height) = geometry::scaled_size(hole.w, hole.h, transform.scale);
    let raster = geometry::transform(photo, width, height, transform.rotation)?;
    let (x, y) = geometry::centered_origin((hole.x as i64, hole.y as i64), (hole.w, hole.h), raster.dimensions());
    Some(Placed { raster, x, y })
}

/// Check a sticker box before anything is decoded or resized for it.
pub fn validate_overlay(placement: &Placement) -> Result<(), OverlayError> {
    if !placement.has_area() {
        return Err(OverlayError::InvalidDimensions {
            width: placement.width,
            height: placement.height,
        });
    }
    placement.validate()?;
    Ok(())
}

/// Resize a sticker to its box, rotate it and centre it on the box.
pub fn prepare_overlay(overlay: Raster, placement: &Placement) -> Result<Placed, OverlayError> {
    validate_overlay(placement)?;

    let (width, height) = (placement.width as u32, placement.height as u32);
    let raster = geometry::transform(overlay, width, height, placement.rotation).ok_or(
        OverlayError::InvalidDimensions {
            width: placement.width,
            height: placement.height,
        },
    )?;
    let (x, y) = geometry::overhang_origin(
        (placement.x as i64, placement.y as i64),
        (width, height),
        raster.dimensions(),
    );
    Ok(Placed { raster, x, y })
}

/// Place a photo into a hole on the canvas. Returns whether anything was drawn.
pub fn composite_photo(canvas: &mut Raster, photo: Raster, hole: &Hole, transform: &Transform) -> bool {
    match prepare_photo(photo, hole, transform) {
        Some(placed) => composite(canvas, &placed, AlphaMode::Straight),
        None => false,
    }
}

/// Place a sticker (or any overlay) on the canvas. `Ok(false)` when it ended
/// up fully off-canvas.
pub fn composite_overlay(
    canvas: &mut Raster,
    overlay: Raster,
    placement: &Placement,
    mode: AlphaMode,
) -> Result<bool, OverlayError> {
    let placed = prepare_overlay(overlay, placement)?;
    Ok(composite(canvas, &placed, mode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn pattern(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x * 3) as u8, (y * 5) as u8, ((x + y) % 251) as u8]))
    }

    fn assert_region(canvas: &Raster, hole: &Hole, photo: &RgbImage, background: Rgb<u8>) {
        let Raster::Rgb(canvas) = canvas else {
            panic!("expected an RGB canvas");
        };
        for (x, y, pixel) in canvas.enumerate_pixels() {
            let inside = x >= hole.x && x < hole.x + hole.w && y >= hole.y && y < hole.y + hole.h;
            if inside {
                assert_eq!(pixel, photo.get_pixel(x - hole.x, y - hole.y), "at {x},{y}");
            } else {
                assert_eq!(*pixel, background, "at {x},{y}");
            }
        }
    }

    #[test]
    fn test_hole_sized_photo_round_trips() {
        let background = Rgb([255, 255, 255]);
        let mut canvas = Raster::filled_rgb(200, 150, background);
        let hole = Hole::new(30, 20, 50, 40);
        let photo = pattern(50, 40);

        assert!(composite_photo(&mut canvas, Raster::Rgb(photo.clone()), &hole, &Transform::default()));
        assert_region(&canvas, &hole, &photo, background);
    }

    #[test]
    fn test_opaque_rgba_photo_round_trips() {
        let background = Rgb([9, 9, 9]);
        let mut canvas = Raster::filled_rgb(120, 120, background);
        let hole = Hole::new(10, 70, 60, 30);
        let photo = pattern(60, 30);
        let rgba = Raster::Rgb(photo.clone()).into_rgba();

        assert!(composite_photo(&mut canvas, Raster::Rgba(rgba), &hole, &Transform::default()));
        assert_region(&canvas, &hole, &photo, background);
    }

    #[test]
    fn test_zero_scale_draws_nothing() {
        let mut canvas = Raster::filled_rgb(50, 50, Rgb([1, 1, 1]));
        let before = canvas.clone();
        let drawn = composite_photo(
            &mut canvas,
            Raster::Rgb(pattern(20, 20)),
            &Hole::new(5, 5, 20, 20),
            &Transform::new(0.0, 0.0),
        );
        assert!(!drawn);
        assert_eq!(canvas, before);
    }

    #[test]
    fn test_off_canvas_overlay_is_noop() {
        let mut canvas = Raster::filled_rgba(100, 100, Rgba([50, 50, 50, 255]));
        let before = canvas.clone();
        let sticker = Raster::filled_rgba(20, 20, Rgba([255, 0, 0, 255]));

        for placement in [
            Placement::new(150, 10, 20, 20, 0.0),
            Placement::new(-40, 10, 20, 20, 0.0),
            Placement::new(10, 100, 20, 20, 0.0),
            Placement::new(10, -20, 20, 20, 0.0),
        ] {
            let drawn = composite_overlay(&mut canvas, sticker.clone(), &placement, AlphaMode::Straight).unwrap();
            assert!(!drawn);
        }
        assert_eq!(canvas, before);
    }

    #[test]
    fn test_straddling_overlay_only_touches_intersection() {
        let mut canvas = Raster::filled_rgba(100, 100, Rgba([50, 50, 50, 255]));
        let sticker = Raster::filled_rgba(20, 20, Rgba([255, 0, 0, 255]));
        let placement = Placement::new(-10, -10, 20, 20, 0.0);

        assert!(composite_overlay(&mut canvas, sticker, &placement, AlphaMode::Straight).unwrap());

        let Raster::Rgba(canvas) = canvas else {
            panic!("expected an RGBA canvas");
        };
        for (x, y, pixel) in canvas.enumerate_pixels() {
            if x < 10 && y < 10 {
                assert_eq!(*pixel, Rgba([255, 0, 0, 255]));
            } else {
                assert_eq!(*pixel, Rgba([50, 50, 50, 255]));
            }
        }
    }

    #[test]
    fn test_invalid_overlay_dimensions() {
        let mut canvas = Raster::filled_rgba(10, 10, Rgba([0, 0, 0, 255]));
        let sticker = Raster::filled_rgba(4, 4, Rgba([255, 0, 0, 255]));
        let result = composite_overlay(&mut canvas, sticker, &Placement::new(0, 0, 0, 5, 0.0), AlphaMode::Straight);
        assert!(matches!(result, Err(OverlayError::InvalidDimensions { width: 0, height: 5 })));

        let placement = Placement::new(0, 0, 50_000, 5, 0.0);
        let result = validate_overlay(&placement);
        assert!(matches!(result, Err(OverlayError::InvalidPlacement(PlacementError::OversizedOverlay { .. }))));
    }

    #[test]
    fn test_rotated_sticker_overhang_favours_bottom_right() {
        // 10x5 box turned 90 degrees becomes 5x10: 5 px of overhang vertically
        let sticker = Raster::filled_rgba(10, 5, Rgba([0, 255, 0, 255]));
        let placed = prepare_overlay(sticker, &Placement::new(20, 20, 10, 5, 90.0)).unwrap();
        assert_eq!(placed.raster.dimensions(), (5, 10));
        assert_eq!((placed.x, placed.y), (23, 18));

        // Photos split the same overhang the other way
        let photo = Raster::filled_rgb(10, 5, Rgb([0, 255, 0]));
        let hole = Hole::new(20, 20, 10, 5);
        let placed = prepare_photo(photo, &hole, &Transform::new(1.0, 90.0)).unwrap();
        assert_eq!((placed.x, placed.y), (22, 17));
    }

    #[test]
    fn test_straight_and_premultiplied_blending() {
        let layer = |color: [u8; 4]| Placed {
            raster: Raster::filled_rgba(1, 1, Rgba(color)),
            x: 0,
            y: 0,
        };

        let mut canvas = Raster::filled_rgb(1, 1, Rgb([100, 100, 100]));
        composite(&mut canvas, &layer([200, 0, 255, 128]), AlphaMode::Straight);
        assert_eq!(canvas.as_bytes(), &[150, 50, 178]);

        let mut canvas = Raster::filled_rgb(1, 1, Rgb([100, 100, 100]));
        composite(&mut canvas, &layer([100, 0, 128, 128]), AlphaMode::Premultiplied);
        assert_eq!(canvas.as_bytes(), &[150, 50, 178]);

        let mut canvas = Raster::filled_rgba(1, 1, Rgba([0, 0, 0, 0]));
        composite(&mut canvas, &layer([255, 255, 255, 51]), AlphaMode::Straight);
        assert_eq!(canvas.as_bytes(), &[51, 51, 51, 51]);
    }

    #[test]
    fn test_template_covers_photos_outside_holes() {
        let photos = RgbImage::from_pixel(4, 1, Rgb([10, 20, 30]));
        let template = RgbaImage::from_fn(4, 1, |x, _| match x {
            0 => Rgba([200, 0, 0, 255]),
            1 => Rgba([200, 0, 0, 0]),
            _ => Rgba([255, 255, 255, 51]),
        });

        let merged = merge_template(&photos, &template);
        assert_eq!(merged.get_pixel(0, 0), &Rgba([200, 0, 0, 255]));
        assert_eq!(merged.get_pixel(1, 0), &Rgba([10, 20, 30, 255]));
        assert_eq!(merged.get_pixel(2, 0), &Rgba([59, 67, 75, 255]));
    }

    #[test]
    fn test_flatten_onto_color() {
        let cutout = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([10, 10, 10, 255])
            } else {
                Rgba([10, 10, 10, 0])
            }
        });
        let flat = flatten_onto_color(Raster::Rgba(cutout), Rgb([0, 128, 255]));
        assert_eq!(flat.as_bytes(), &[10, 10, 10, 0, 128, 255]);
    }

    #[test]
    fn test_clip_rect_offsets() {
        let clip = clip_to_canvas((100, 80), (30, 30), (-5, 60)).unwrap();
        assert_eq!(
            clip,
            ClipRect {
                canvas_x: 0,
                canvas_y: 60,
                src_x: 5,
                src_y: 0,
                width: 25,
                height: 20,
            }
        );
        assert!(clip_to_canvas((100, 80), (30, 30), (100, 0)).is_none());
    }
}
