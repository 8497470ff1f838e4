//! Per-photo tone and detail filters
//!
//! Stages run in a fixed order and each one is skipped at its neutral value,
//! so neutral settings leave the photo byte-identical. Every stage works in
//! float and truncates back to 8 bits, and every later stage starts from that
//! 8-bit result. Saturation round-trips through OpenCV's 8-bit HSV layout
//! (hue in `0..180`), quantization error included. Only colour channels are
//! touched, alpha is preserved.

use image::imageops;
use rand::Rng;
use rayon::prelude::*;

use super::raster::{truncate, Raster};
use crate::domain::{FilterSettings, NEUTRAL_PERCENT};

const MID_GRAY: f32 = 128.0;

/// Fixed-point precision of the RGB to HSV conversion
const HSV_SHIFT: i32 = 12;
const HSV_ROUND: i32 = 1 << (HSV_SHIFT - 1);

/// Hue steps in 8-bit HSV, two degrees each
const HUE_RANGE: i32 = 180;

/// Indices into `[v, p, q, t]` for (blue, green, red) per hue sector
const HUE_SECTORS: [[usize; 3]; 6] = [[1, 3, 0], [1, 0, 2], [3, 0, 1], [0, 2, 1], [0, 1, 3], [2, 1, 0]];

/// Apply the filter chain, drawing grain noise from the thread-local RNG.
pub fn apply_filters(photo: Raster, settings: &FilterSettings) -> Raster {
    apply_filters_with_rng(photo, settings, &mut rand::thread_rng())
}

/// Apply the filter chain with an explicit noise source.
pub fn apply_filters_with_rng<R: Rng + ?Sized>(
    photo: Raster,
    settings: &FilterSettings,
    rng: &mut R,
) -> Raster {
    if photo.is_empty() {
        return photo;
    }

    let mut photo = photo;

    if settings.brightness != NEUTRAL_PERCENT || settings.contrast != NEUTRAL_PERCENT {
        brightness_contrast(&mut photo, settings.brightness, settings.contrast);
    }
    if settings.saturate != NEUTRAL_PERCENT {
        saturate(&mut photo, settings.saturate);
    }
    if settings.warmth != NEUTRAL_PERCENT {
        warm(&mut photo, settings.warmth);
    }
    if settings.sharpness > 0.0 {
        photo = sharpen(&photo, settings.sharpness);
    }
    if settings.blur > 0.0 {
        photo = gaussian_blur(photo, settings.blur);
    }
    if settings.grain > 0.0 {
        add_grain(&mut photo, settings.grain, rng);
    }

    photo
}

/// Run `f` on the colour channels of every pixel, rows in parallel.
fn for_each_color<F>(photo: &mut Raster, f: F)
where
    F: Fn(&mut [u8]) + Send + Sync,
{
    let channels = photo.channels();
    photo
        .as_bytes_mut()
        .par_chunks_mut(channels)
        .for_each(|pixel| f(&mut pixel[..3]));
}

fn brightness_contrast(photo: &mut Raster, brightness: f32, contrast: f32) {
    let gain = brightness / 100.0;
    let stretch = contrast / 100.0;
    let adjust_contrast = contrast != NEUTRAL_PERCENT;

    for_each_color(photo, |rgb| {
        for value in rgb.iter_mut() {
            let mut v = *value as f32 * gain;
            if adjust_contrast {
                v = MID_GRAY + stretch * (v - MID_GRAY);
            }
            *value = truncate(v);
        }
    });
}

fn saturate(photo: &mut Raster, saturate: f32) {
    let factor = saturate / 100.0;

    for_each_color(photo, |rgb| {
        let (h, s, v) = rgb_to_hsv(rgb[0], rgb[1], rgb[2]);
        let s = truncate(s as f32 * factor);
        rgb.copy_from_slice(&hsv_to_rgb(h, s, v));
    });
}

fn warm(photo: &mut Raster, warmth: f32) {
    // Slider 0..=200 maps to -50..=+50
    let shift = (warmth - NEUTRAL_PERCENT) / 2.0;

    for_each_color(photo, |rgb| {
        rgb[0] = truncate(rgb[0] as f32 + shift);
        rgb[2] = truncate(rgb[2] as f32 - shift);
    });
}

fn sharpen(photo: &Raster, sharpness: f32) -> Raster {
    let a = sharpness / 100.0;
    let kernel = [[0.0, -a, 0.0], [-a, 1.0 + 4.0 * a, -a], [0.0, -a, 0.0]];

    let (width, height) = photo.dimensions();
    let channels = photo.channels();
    let row_len = width as usize * channels;
    let src = photo.as_bytes();

    let mut output = photo.clone();
    output
        .as_bytes_mut()
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width as usize {
                for c in 0..3 {
                    let mut sum = 0.0f32;
                    for (ky, kernel_row) in kernel.iter().enumerate() {
                        let sy = reflect(y as i64 + ky as i64 - 1, height as i64);
                        for (kx, weight) in kernel_row.iter().enumerate() {
                            if *weight == 0.0 {
                                continue;
                            }
                            let sx = reflect(x as i64 + kx as i64 - 1, width as i64);
                            sum += weight * src[sy * row_len + sx * channels + c] as f32;
                        }
                    }
                    row[x * channels + c] = truncate(sum);
                }
            }
        });

    output
}

/// Mirror an out-of-range index back inside `0..len` without repeating the edge.
fn reflect(index: i64, len: i64) -> usize {
    if len <= 1 {
        return 0;
    }
    let mirrored = if index < 0 {
        -index
    } else if index >= len {
        2 * len - 2 - index
    } else {
        index
    };
    mirrored.clamp(0, len - 1) as usize
}

fn gaussian_blur(photo: Raster, sigma: f32) -> Raster {
    match photo {
        Raster::Rgb(img) => Raster::Rgb(imageops::blur(&img, sigma)),
        Raster::Rgba(img) => {
            let mut blurred = imageops::blur(&img, sigma);
            for (dst, src) in blurred.pixels_mut().zip(img.pixels()) {
                dst.0[3] = src.0[3];
            }
            Raster::Rgba(blurred)
        }
    }
}

fn add_grain<R: Rng + ?Sized>(photo: &mut Raster, std_dev: f32, rng: &mut R) {
    let channels = photo.channels();
    for pixel in photo.as_bytes_mut().chunks_mut(channels) {
        for value in pixel[..3].iter_mut() {
            let noise = (standard_normal(rng) * std_dev) as i16;
            *value = (*value as i32 + noise as i32).clamp(0, 255) as u8;
        }
    }
}

/// Box-Muller sample from N(0, 1)
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen::<f32>().max(1e-10);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}

/// RGB bytes to 8-bit (hue `0..180`, saturation, value), in fixed point.
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let v = r.max(g).max(b);
    let diff = v - r.min(g).min(b);

    let s_div = if v == 0 { 0 } else { fixed_reciprocal(255, v as f64) };
    let h_div = if diff == 0 {
        0
    } else {
        fixed_reciprocal(HUE_RANGE, 6.0 * diff as f64)
    };
    let s = (diff * s_div + HSV_ROUND) >> HSV_SHIFT;

    let h = if v == r {
        g - b
    } else if v == g {
        b - r + 2 * diff
    } else {
        r - g + 4 * diff
    };
    let mut h = (h * h_div + HSV_ROUND) >> HSV_SHIFT;
    if h < 0 {
        h += HUE_RANGE;
    }

    (h as u8, s as u8, v as u8)
}

/// `(scale << HSV_SHIFT) / divisor`, rounded half to even
fn fixed_reciprocal(scale: i32, divisor: f64) -> i32 {
    ((scale << HSV_SHIFT) as f64 / divisor).round_ties_even() as i32
}

/// 8-bit HSV back to RGB bytes, in single precision.
fn hsv_to_rgb(h: u8, s: u8, v: u8) -> [u8; 3] {
    let s = s as f32 * (1.0 / 255.0);
    let v = v as f32 * (1.0 / 255.0);

    let (r, g, b) = if s == 0.0 {
        (v, v, v)
    } else {
        let mut h = (h as f32 * (6.0 / HUE_RANGE as f32)) % 6.0;
        let mut sector = h.floor() as usize;
        h -= sector as f32;
        if sector >= HUE_SECTORS.len() {
            sector = 0;
            h = 0.0;
        }
        let tab = [v, v * (1.0 - s), v * (1.0 - s * h), v * (1.0 - s * (1.0 - h))];
        let [bi, gi, ri] = HUE_SECTORS[sector];
        (tab[ri], tab[gi], tab[bi])
    };

    let byte = |x: f32| (x * 255.0).round_ties_even().clamp(0.0, 255.0) as u8;
    [byte(r), byte(g), byte(b)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn gradient() -> RgbImage {
        RgbImage::from_fn(16, 8, |x, y| Rgb([(x * 15) as u8, (y * 30) as u8, ((x + y) * 7) as u8]))
    }

    fn with(update: impl FnOnce(&mut FilterSettings)) -> FilterSettings {
        let mut settings = FilterSettings::default();
        update(&mut settings);
        settings
    }

    #[test]
    fn test_neutral_settings_are_identity() {
        let rgb = Raster::Rgb(gradient());
        assert_eq!(apply_filters(rgb.clone(), &FilterSettings::default()), rgb);

        let rgba = Raster::Rgba(RgbaImage::from_fn(9, 9, |x, y| Rgba([x as u8, y as u8, 7, 99])));
        assert_eq!(apply_filters(rgba.clone(), &FilterSettings::default()), rgba);
    }

    #[test]
    fn test_brightness_scales_channels() {
        let photo = Raster::filled_rgb(2, 2, Rgb([200, 100, 10]));
        let out = apply_filters(photo, &with(|s| s.brightness = 50.0));
        assert_eq!(out.as_bytes()[..3], [100, 50, 5]);

        // Halves are truncated, not rounded
        let photo = Raster::filled_rgb(2, 2, Rgb([101, 99, 3]));
        let out = apply_filters(photo, &with(|s| s.brightness = 50.0));
        assert_eq!(out.as_bytes()[..3], [50, 49, 1]);
    }

    #[test]
    fn test_contrast_pushes_away_from_mid_gray() {
        let photo = Raster::filled_rgb(2, 2, Rgb([100, 128, 150]));
        let out = apply_filters(photo, &with(|s| s.contrast = 200.0));
        assert_eq!(out.as_bytes()[..3], [72, 128, 172]);
    }

    #[test]
    fn test_zero_saturation_is_gray() {
        let photo = Raster::filled_rgb(2, 2, Rgb([200, 100, 50]));
        let out = apply_filters(photo, &with(|s| s.saturate = 0.0));
        assert_eq!(out.as_bytes()[..3], [200, 200, 200]);
    }

    #[test]
    fn test_saturation_uses_8bit_hsv() {
        let photo = Raster::filled_rgb(2, 2, Rgb([200, 100, 50]));
        let out = apply_filters(photo, &with(|s| s.saturate = 50.0));
        assert_eq!(out.as_bytes()[..3], [200, 150, 125]);

        // s = 238 scaled to 166.6 truncates to 166, hue 12 steps of 2 degrees
        let photo = Raster::filled_rgb(2, 2, Rgb([201, 90, 13]));
        let out = apply_filters(photo, &with(|s| s.saturate = 70.0));
        assert_eq!(out.as_bytes()[..3], [201, 122, 70]);

        // Oversaturation clips at full saturation
        let photo = Raster::filled_rgb(2, 2, Rgb([12, 200, 99]));
        let out = apply_filters(photo, &with(|s| s.saturate = 150.0));
        assert_eq!(out.as_bytes()[..3], [0, 200, 93]);
    }

    #[test]
    fn test_warmth_shifts_red_and_blue() {
        let photo = Raster::filled_rgb(2, 2, Rgb([100, 100, 100]));
        let out = apply_filters(photo, &with(|s| s.warmth = 200.0));
        assert_eq!(out.as_bytes()[..3], [150, 100, 50]);

        let photo = Raster::filled_rgb(2, 2, Rgb([10, 100, 240]));
        let out = apply_filters(photo, &with(|s| s.warmth = 0.0));
        assert_eq!(out.as_bytes()[..3], [0, 100, 255]);

        let photo = Raster::filled_rgb(2, 2, Rgb([100, 100, 100]));
        let out = apply_filters(photo, &with(|s| s.warmth = 101.0));
        assert_eq!(out.as_bytes()[..3], [100, 100, 99]);
    }

    #[test]
    fn test_sharpen_keeps_flat_regions() {
        let photo = Raster::filled_rgb(6, 6, Rgb([120, 60, 30]));
        let out = apply_filters(photo.clone(), &with(|s| s.sharpness = 80.0));
        assert_eq!(out, photo);
    }

    #[test]
    fn test_sharpen_boosts_edges() {
        let mut img = RgbImage::from_pixel(5, 5, Rgb([100, 100, 100]));
        img.put_pixel(2, 2, Rgb([150, 150, 150]));
        let out = apply_filters(Raster::Rgb(img), &with(|s| s.sharpness = 100.0));
        // centre: 5*150 - 4*100 = 350 -> 255, neighbours: 2*100 - 150 = 50
        assert_eq!(out.as_bytes()[(2 * 5 + 2) * 3], 255);
        assert_eq!(out.as_bytes()[(2 * 5 + 1) * 3], 50);

        let mut img = RgbImage::from_pixel(5, 5, Rgb([100, 100, 100]));
        img.put_pixel(2, 2, Rgb([151, 151, 151]));
        let out = apply_filters(Raster::Rgb(img), &with(|s| s.sharpness = 30.0));
        // centre: 2.2*151 - 1.2*100 = 212.2, neighbours: 2.2*100 - 0.3*451 = 84.7
        assert_eq!(out.as_bytes()[(2 * 5 + 2) * 3], 212);
        assert_eq!(out.as_bytes()[(2 * 5 + 1) * 3], 84);
    }

    #[test]
    fn test_blur_preserves_alpha() {
        let img = RgbaImage::from_fn(12, 12, |x, _| {
            if x < 6 {
                Rgba([0, 0, 0, 40])
            } else {
                Rgba([255, 255, 255, 200])
            }
        });
        let out = apply_filters(Raster::Rgba(img.clone()), &with(|s| s.blur = 2.0));
        let Raster::Rgba(out) = out else {
            panic!("blur changed the channel layout");
        };
        for (a, b) in out.pixels().zip(img.pixels()) {
            assert_eq!(a.0[3], b.0[3]);
        }
        assert!(out.get_pixel(5, 6).0[0] > 0);
    }

    #[test]
    fn test_grain_is_seeded_and_alpha_safe() {
        let img = RgbaImage::from_pixel(20, 20, Rgba([128, 128, 128, 77]));
        let settings = with(|s| s.grain = 25.0);

        let a = apply_filters_with_rng(Raster::Rgba(img.clone()), &settings, &mut StdRng::seed_from_u64(7));
        let b = apply_filters_with_rng(Raster::Rgba(img.clone()), &settings, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert_ne!(a, Raster::Rgba(img));
        assert!(a.as_bytes().chunks(4).all(|px| px[3] == 77));
    }

    #[test]
    fn test_hsv_conversion() {
        assert_eq!(rgb_to_hsv(255, 0, 0), (0, 255, 255));
        assert_eq!(rgb_to_hsv(0, 0, 0), (0, 0, 0));
        assert_eq!(rgb_to_hsv(201, 90, 13), (12, 238, 201));
        assert_eq!(rgb_to_hsv(250, 250, 10), (30, 245, 250));
        assert_eq!(hsv_to_rgb(0, 255, 255), [255, 0, 0]);
        assert_eq!(hsv_to_rgb(30, 245, 250), [250, 250, 10]);

        // 8-bit hue is lossy
        let (h, s, v) = rgb_to_hsv(12, 200, 99);
        assert_eq!((h, s, v), (74, 240, 200));
        assert_eq!(hsv_to_rgb(h, s, v), [12, 200, 100]);
    }
}
