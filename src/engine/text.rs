//! Text block rasterization
//!
//! A block is measured with the font's own metrics, drawn as premultiplied
//! RGBA on a canvas at least as large as the caller's box, then rotated and
//! centred on the caller's box, so text wider than its box spills evenly
//! past both edges.

use rusttype::{point, Font, PositionedGlyph, Scale, VMetrics};
use thiserror::Error;

use super::geometry::{self, Placed};
use super::raster::{quantize, Raster};
use crate::domain::{parse_hex_color, ColorError, Justify, PlacementError, TextBlock};

/// Line height multiplier applied to the font size
pub const LINE_HEIGHT_FACTOR: f32 = 1.3;

/// Largest text canvas, in pixels
pub const MAX_TEXT_PIXELS: u64 = 16_777_216;

/// A rasterized text block ready for premultiplied compositing
pub type TextLayer = Placed;

#[derive(Debug, Error)]
pub enum TextError {
    #[error("Font not found: {0}")]
    FontNotFound(String),
    #[error("Failed to load font {path}: {reason}")]
    FontLoadError { path: String, reason: String },
    #[error("Text block has nothing to draw")]
    EmptyText,
    #[error("Invalid text block: {0}")]
    InvalidBlock(#[from] PlacementError),
    #[error("Invalid text colour: {0}")]
    Color(#[from] ColorError),
    #[error("Text block too large: {width}x{height}")]
    TooLarge { width: i32, height: i32 },
}

struct Line {
    glyphs: Vec<PositionedGlyph<'static>>,
    /// Horizontal ink extent, `None` for blank lines
    ink: Option<(i32, i32)>,
}

/// Distance between consecutive baselines: the font's line height
/// `ascent - descent` plus spacing `round(size * LINE_HEIGHT_FACTOR) - ascent`.
fn line_advance(metrics: VMetrics, size: f32) -> f32 {
    let spacing = (size * LINE_HEIGHT_FACTOR).round() - metrics.ascent;
    metrics.ascent - metrics.descent + spacing
}

/// Horizontal offset of a line `slack` pixels narrower than the widest line
fn justify_offset(justify: Justify, slack: i32) -> i32 {
    match justify {
        Justify::Left => 0,
        Justify::Center => slack / 2,
        Justify::Right => slack,
    }
}

/// Measure, draw and rotate a text block.
pub fn layout_text(font: &Font<'static>, block: &TextBlock) -> Result<TextLayer, TextError> {
    if block.text.trim().is_empty() {
        return Err(TextError::EmptyText);
    }
    block.validate()?;
    let color = parse_hex_color(&block.color)?;

    let scale = Scale::uniform(block.font_size);
    let metrics = font.v_metrics(scale);
    let line_advance = line_advance(metrics, block.font_size);

    let lines: Vec<Line> = block
        .text
        .split('\n')
        .enumerate()
        .map(|(index, text)| {
            let baseline = metrics.ascent + index as f32 * line_advance;
            let glyphs: Vec<_> = font
                .layout(text.trim_end_matches('\r'), scale, point(0.0, baseline))
                .collect();
            let ink = glyphs
                .iter()
                .filter_map(|glyph| glyph.pixel_bounding_box())
                .fold(None, |extent: Option<(i32, i32)>, bb| match extent {
                    Some((min, max)) => Some((min.min(bb.min.x), max.max(bb.max.x))),
                    None => Some((bb.min.x, bb.max.x)),
                });
            Line { glyphs, ink }
        })
        .collect();

    let (top, bottom) = lines
        .iter()
        .flat_map(|line| line.glyphs.iter())
        .filter_map(|glyph| glyph.pixel_bounding_box())
        .fold(None, |extent: Option<(i32, i32)>, bb| match extent {
            Some((min, max)) => Some((min.min(bb.min.y), max.max(bb.max.y))),
            None => Some((bb.min.y, bb.max.y)),
        })
        .ok_or(TextError::EmptyText)?;

    let measured_w = lines
        .iter()
        .filter_map(|line| line.ink.map(|(min, max)| max - min))
        .max()
        .unwrap_or(0);
    let measured_h = bottom - top;

    let canvas_w = block.width.max(measured_w).max(1);
    let canvas_h = block.height.max(measured_h).max(1);
    if canvas_w as u64 * canvas_h as u64 > MAX_TEXT_PIXELS {
        return Err(TextError::TooLarge {
            width: canvas_w,
            height: canvas_h,
        });
    }
    let offset_x = (canvas_w - measured_w) / 2;
    let offset_y = (canvas_h - measured_h) / 2;

    let mut coverage = vec![0.0f32; canvas_w as usize * canvas_h as usize];
    for line in &lines {
        let Some((ink_min, ink_max)) = line.ink else {
            continue;
        };
        let justify = justify_offset(block.justify, measured_w - (ink_max - ink_min));
        let shift_x = offset_x + justify - ink_min;
        let shift_y = offset_y - top;

        for glyph in &line.glyphs {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, value| {
                let px = bb.min.x + gx as i32 + shift_x;
                let py = bb.min.y + gy as i32 + shift_y;
                if px < 0 || py < 0 || px >= canvas_w || py >= canvas_h {
                    return;
                }
                let cell = &mut coverage[py as usize * canvas_w as usize + px as usize];
                *cell = cell.max(value);
            });
        }
    }

    let (canvas_w, canvas_h) = (canvas_w as u32, canvas_h as u32);
    let image = image::RgbaImage::from_fn(canvas_w, canvas_h, |x, y| {
        let alpha = coverage[y as usize * canvas_w as usize + x as usize].clamp(0.0, 1.0);
        image::Rgba([
            quantize(color[0] as f32 * alpha),
            quantize(color[1] as f32 * alpha),
            quantize(color[2] as f32 * alpha),
            quantize(alpha * 255.0),
        ])
    });

    // Validation guarantees a non-negative box
    Ok(geometry::place(
        Raster::Rgba(image),
        (block.x as i64, block.y as i64),
        (block.width as u32, block.height as u32),
        block.rotation,
    ))
}
