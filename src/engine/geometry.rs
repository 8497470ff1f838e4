//! Geometry shared by photos, stickers and text blocks: resize, rotate and
//! centre the rotated result on its original placement box.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Pixel, Rgba, RgbaImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

use super::raster::Raster;

/// Angles closer than this to a multiple of 90 degrees use exact quarter turns
const ANGLE_EPSILON: f32 = 1e-3;

/// A raster positioned on the canvas by its top-left corner; may lie partly
/// or entirely outside the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub raster: Raster,
    pub x: i64,
    pub y: i64,
}

/// Target size for a box scaled by `scale`, rounded to whole pixels
pub fn scaled_size(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let scale = scale.max(0.0) as f64;
    (
        (width as f64 * scale).round() as u32,
        (height as f64 * scale).round() as u32,
    )
}

/// Resize to exactly `width` x `height`.
///
/// Shrinking uses area averaging (falling back to a support-scaled triangle
/// filter when only one axis shrinks), enlarging uses Lanczos3. Returns `None`
/// for a zero-sized target.
pub fn resize(raster: Raster, width: u32, height: u32) -> Option<Raster> {
    if width == 0 || height == 0 || raster.is_empty() {
        return None;
    }
    if raster.dimensions() == (width, height) {
        return Some(raster);
    }

    Some(match raster {
        Raster::Rgb(img) => Raster::Rgb(resize_buffer(&img, width, height)),
        Raster::Rgba(img) => Raster::Rgba(resize_buffer(&img, width, height)),
    })
}

fn resize_buffer<P>(img: &ImageBuffer<P, Vec<u8>>, width: u32, height: u32) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let no_growth = width <= img.width() && height <= img.height();
    let any_shrink = width < img.width() || height < img.height();

    if no_growth {
        imageops::thumbnail(img, width, height)
    } else if any_shrink {
        imageops::resize(img, width, height, FilterType::Triangle)
    } else {
        imageops::resize(img, width, height, FilterType::Lanczos3)
    }
}

/// Canvas size after rotating a `width` x `height` image by `degrees`
pub fn rotated_size(width: u32, height: u32, degrees: f32) -> (u32, u32) {
    let radians = (degrees as f64).to_radians();
    let cos = radians.cos().abs();
    let sin = radians.sin().abs();
    let (w, h) = (width as f64, height as f64);

    let new_w = (h * sin + w * cos + 1e-6).floor() as u32;
    let new_h = (h * cos + w * sin + 1e-6).floor() as u32;
    (new_w.max(1), new_h.max(1))
}

/// Rotate counter-clockwise by `degrees` about the image centre.
///
/// The canvas grows so no corner is cropped. Exact quarter turns are lossless
/// and keep the channel layout; any other angle yields RGBA with transparent
/// corners.
pub fn rotate_ccw(raster: Raster, degrees: f32) -> Raster {
    let turn = degrees.rem_euclid(360.0);
    let near = |target: f32| (turn - target).abs() < ANGLE_EPSILON;

    if near(0.0) || near(360.0) || raster.is_empty() {
        return raster;
    }
    if near(90.0) {
        return quarter_turn(raster, QuarterTurn::CounterClockwise);
    }
    if near(180.0) {
        return quarter_turn(raster, QuarterTurn::Half);
    }
    if near(270.0) {
        return quarter_turn(raster, QuarterTurn::Clockwise);
    }

    let source = raster.into_rgba();
    let (width, height) = source.dimensions();
    let (new_w, new_h) = rotated_size(width, height, degrees);

    // Projection::rotate turns clockwise for positive angles
    let projection = Projection::translate(new_w as f32 / 2.0, new_h as f32 / 2.0)
        * Projection::rotate(-degrees.to_radians())
        * Projection::translate(-(width as f32) / 2.0, -(height as f32) / 2.0);

    let mut rotated = RgbaImage::new(new_w, new_h);
    warp_into(
        &source,
        &projection,
        Interpolation::Bilinear,
        Rgba([0, 0, 0, 0]),
        &mut rotated,
    );

    Raster::Rgba(rotated)
}

/// Rotate clockwise by `degrees`, the convention used by all placements.
pub fn rotate(raster: Raster, degrees: f32) -> Raster {
    rotate_ccw(raster, -degrees)
}

enum QuarterTurn {
    Clockwise,
    Half,
    CounterClockwise,
}

fn quarter_turn(raster: Raster, turn: QuarterTurn) -> Raster {
    match (raster, turn) {
        (Raster::Rgb(img), QuarterTurn::Clockwise) => Raster::Rgb(imageops::rotate90(&img)),
        (Raster::Rgb(img), QuarterTurn::Half) => Raster::Rgb(imageops::rotate180(&img)),
        (Raster::Rgb(img), QuarterTurn::CounterClockwise) => Raster::Rgb(imageops::rotate270(&img)),
        (Raster::Rgba(img), QuarterTurn::Clockwise) => Raster::Rgba(imageops::rotate90(&img)),
        (Raster::Rgba(img), QuarterTurn::Half) => Raster::Rgba(imageops::rotate180(&img)),
        (Raster::Rgba(img), QuarterTurn::CounterClockwise) => Raster::Rgba(imageops::rotate270(&img)),
    }
}

/// Resize to the target box, then rotate clockwise by `rotation` degrees.
/// `None` when the target box is empty.
pub fn transform(raster: Raster, width: u32, height: u32, rotation: f32) -> Option<Raster> {
    resize(raster, width, height).map(|resized| rotate(resized, rotation))
}

/// Top-left origin that centres a `rotated` sized raster on a box of
/// `box_size` anchored at `anchor`.
pub fn centered_origin(anchor: (i64, i64), box_size: (u32, u32), rotated: (u32, u32)) -> (i64, i64) {
    let dx = (box_size.0 as i64 - rotated.0 as i64).div_euclid(2);
    let dy = (box_size.1 as i64 - rotated.1 as i64).div_euclid(2);
    (anchor.0 + dx, anchor.1 + dy)
}

/// Like [`centered_origin`], but an odd pixel of overhang lands on the
/// bottom-right instead of the top-left. Stickers are placed this way.
pub fn overhang_origin(anchor: (i64, i64), box_size: (u32, u32), rotated: (u32, u32)) -> (i64, i64) {
    let dx = (rotated.0 as i64 - box_size.0 as i64).div_euclid(2);
    let dy = (rotated.1 as i64 - box_size.1 as i64).div_euclid(2);
    (anchor.0 - dx, anchor.1 - dy)
}

/// Rotate clockwise about the box centre and position the result so it stays
/// centred on the original box.
pub fn place(raster: Raster, anchor: (i64, i64), box_size: (u32, u32), rotation: f32) -> Placed {
    let rotated = rotate(raster, rotation);
    let (x, y) = centered_origin(anchor, box_size, rotated.dimensions());
    Placed {
        raster: rotated,
        x,
        y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn pattern() -> RgbImage {
        // Non-symmetric: every pixel distinct
        RgbImage::from_fn(4, 3, |x, y| Rgb([(x * 60) as u8, (y * 100) as u8, 7]))
    }

    #[test]
    fn test_scaled_size_rounds() {
        assert_eq!(scaled_size(480, 360, 0.5), (240, 180));
        assert_eq!(scaled_size(101, 33, 0.5), (51, 17));
        assert_eq!(scaled_size(100, 100, 0.0), (0, 0));
    }

    #[test]
    fn test_resize_to_same_size_is_identity() {
        let raster = Raster::Rgb(pattern());
        assert_eq!(resize(raster.clone(), 4, 3), Some(raster));
    }

    #[test]
    fn test_resize_dimensions_and_zero_target() {
        let raster = Raster::Rgb(RgbImage::from_pixel(40, 30, Rgb([9, 9, 9])));
        assert_eq!(resize(raster.clone(), 20, 15).unwrap().dimensions(), (20, 15));
        assert_eq!(resize(raster.clone(), 80, 60).unwrap().dimensions(), (80, 60));
        assert_eq!(resize(raster.clone(), 20, 60).unwrap().dimensions(), (20, 60));
        assert!(resize(raster, 0, 10).is_none());
    }

    #[test]
    fn test_area_downscale_averages() {
        let img = RgbImage::from_fn(2, 2, |x, _| if x == 0 { Rgb([0, 0, 0]) } else { Rgb([200, 200, 200]) });
        let out = resize(Raster::Rgb(img), 1, 1).unwrap();
        assert_eq!(out.as_bytes(), &[100, 100, 100]);
    }

    #[test]
    fn test_rotated_size() {
        assert_eq!(rotated_size(100, 50, 90.0), (50, 100));
        assert_eq!(rotated_size(100, 50, 0.0), (100, 50));
        assert_eq!(rotated_size(100, 100, 45.0), (141, 141));
    }

    #[test]
    fn test_positive_rotation_is_clockwise() {
        let img = pattern();
        let expected = Raster::Rgb(imageops::rotate90(&img));
        assert_eq!(rotate(Raster::Rgb(img.clone()), 90.0), expected);

        // -90 public is a counter-clockwise quarter turn
        let expected = Raster::Rgb(imageops::rotate270(&img));
        assert_eq!(rotate(Raster::Rgb(img), -90.0), expected);
    }

    #[test]
    fn test_arbitrary_rotation_expands_with_transparent_corners() {
        let img = RgbImage::from_pixel(40, 20, Rgb([255, 0, 0]));
        let rotated = rotate(Raster::Rgb(img), 30.0);
        assert_eq!(rotated.dimensions(), rotated_size(40, 20, 30.0));

        let Raster::Rgba(rotated) = rotated else {
            panic!("arbitrary rotation should carry alpha");
        };
        assert_eq!(rotated.get_pixel(0, 0).0[3], 0);
        let (w, h) = rotated.dimensions();
        assert_eq!(rotated.get_pixel(w / 2, h / 2), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_transform_resizes_then_rotates() {
        let img = RgbImage::from_pixel(10, 10, Rgb([5, 5, 5]));
        let out = transform(Raster::Rgb(img.clone()), 40, 20, 90.0).unwrap();
        assert_eq!(out.dimensions(), (20, 40));
        assert!(transform(Raster::Rgb(img), 0, 20, 0.0).is_none());
    }

    #[test]
    fn test_centered_origin() {
        assert_eq!(centered_origin((10, 10), (100, 50), (100, 50)), (10, 10));
        assert_eq!(centered_origin((10, 10), (100, 50), (112, 100)), (4, -15));
        assert_eq!(centered_origin((0, 0), (100, 100), (51, 51)), (24, 24));
    }

    #[test]
    fn test_overhang_origin_rounds_toward_box() {
        assert_eq!(overhang_origin((10, 10), (100, 50), (100, 50)), (10, 10));
        assert_eq!(overhang_origin((10, 10), (100, 50), (113, 101)), (4, -15));
        assert_eq!(centered_origin((10, 10), (100, 50), (113, 101)), (3, -16));
        assert_eq!(overhang_origin((0, 0), (100, 100), (51, 51)), (25, 25));
    }

    #[test]
    fn test_place_keeps_box_centre() {
        let img = RgbImage::from_pixel(60, 20, Rgb([1, 2, 3]));
        let placed = place(Raster::Rgb(img), (100, 200), (60, 20), 90.0);
        assert_eq!(placed.raster.dimensions(), (20, 60));
        assert_eq!((placed.x, placed.y), (120, 180));
    }
}
