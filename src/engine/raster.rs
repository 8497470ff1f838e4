//! In-memory 8-bit raster buffers
//!
//! Every pipeline stage takes a `Raster` by value and hands a new one to the
//! next stage, so a buffer is only ever owned by one stage at a time.

use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, ImageError, Rgb, RgbImage, Rgba, RgbaImage};

/// Decoded 8-bit image with either 3 (RGB) or 4 (RGBA) channels
#[derive(Debug, Clone, PartialEq)]
pub enum Raster {
    Rgb(RgbImage),
    Rgba(RgbaImage),
}

impl Raster {
    /// Opaque raster filled with one colour
    pub fn filled_rgb(width: u32, height: u32, color: Rgb<u8>) -> Self {
        Raster::Rgb(RgbImage::from_pixel(width, height, color))
    }

    /// Raster with alpha filled with one colour
    pub fn filled_rgba(width: u32, height: u32, color: Rgba<u8>) -> Self {
        Raster::Rgba(RgbaImage::from_pixel(width, height, color))
    }

    /// Convert any decoded image, keeping alpha only when the source has it.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageRgb8(img) => Raster::Rgb(img),
            DynamicImage::ImageRgba8(img) => Raster::Rgba(img),
            other if other.color().has_alpha() => Raster::Rgba(other.to_rgba8()),
            other => Raster::Rgb(other.to_rgb8()),
        }
    }

    /// Decode encoded bytes (PNG, JPEG, ...) into a raster.
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        image::load_from_memory(bytes).map(Raster::from_dynamic)
    }

    pub fn width(&self) -> u32 {
        match self {
            Raster::Rgb(img) => img.width(),
            Raster::Rgba(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Raster::Rgb(img) => img.height(),
            Raster::Rgba(img) => img.height(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Number of interleaved channels per pixel (3 or 4)
    pub fn channels(&self) -> usize {
        match self {
            Raster::Rgb(_) => 3,
            Raster::Rgba(_) => 4,
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, Raster::Rgba(_))
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Row-major pixel data, `height * width * channels` bytes
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Raster::Rgb(img) => img.as_raw(),
            Raster::Rgba(img) => img.as_raw(),
        }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Raster::Rgb(img) => &mut **img,
            Raster::Rgba(img) => &mut **img,
        }
    }

    /// Add an opaque alpha channel if there is none.
    pub fn into_rgba(self) -> RgbaImage {
        match self {
            Raster::Rgb(img) => DynamicImage::ImageRgb8(img).to_rgba8(),
            Raster::Rgba(img) => img,
        }
    }

    /// Drop the alpha channel if there is one.
    pub fn into_rgb(self) -> RgbImage {
        match self {
            Raster::Rgb(img) => img,
            Raster::Rgba(img) => DynamicImage::ImageRgba8(img).to_rgb8(),
        }
    }

    /// Encode to PNG bytes (preserves RGBA transparency)
    pub fn encode_png(&self) -> Result<Vec<u8>, ImageError> {
        let color = match self {
            Raster::Rgb(_) => ColorType::Rgb8,
            Raster::Rgba(_) => ColorType::Rgba8,
        };
        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer).write_image(self.as_bytes(), self.width(), self.height(), color)?;
        Ok(buffer)
    }
}

impl From<RgbImage> for Raster {
    fn from(img: RgbImage) -> Self {
        Raster::Rgb(img)
    }
}

impl From<RgbaImage> for Raster {
    fn from(img: RgbaImage) -> Self {
        Raster::Rgba(img)
    }
}

/// Clamp to `[0, 255]` and round to the nearest 8-bit value.
#[inline]
pub fn quantize(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Clamp to `[0, 255]` and drop the fraction.
#[inline]
pub fn truncate(value: f32) -> u8 {
    value.clamp(0.0, 255.0) as u8
}
