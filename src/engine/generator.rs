//! Blank template and layout thumbnail generation

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::raster::Raster;
use crate::domain::{AspectRatio, CellLayout, Hole};

/// Width of every generated cell; the height follows the aspect ratio
pub const BASE_CELL_WIDTH: u32 = 480;

/// Largest generated template, in pixels
pub const MAX_TEMPLATE_PIXELS: u64 = 25_000_000;

/// Largest layout thumbnail, in pixels
pub const MAX_THUMBNAIL_PIXELS: u64 = 4_000_000;

const THUMBNAIL_CELL_WIDTH: u32 = 100;
const THUMBNAIL_GAP: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("{layout} leaves cells with no height")]
    EmptyCells { layout: String },
    #[error("{layout} needs {width}x{height} pixels, more than {max}")]
    TooLarge {
        layout: String,
        width: u64,
        height: u64,
        max: u64,
    },
}

const PASTELS: [Rgb<u8>; 6] = [
    Rgb([255, 204, 204]),
    Rgb([204, 229, 255]),
    Rgb([204, 255, 204]),
    Rgb([255, 229, 204]),
    Rgb([229, 204, 255]),
    Rgb([255, 255, 204]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Margins {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Gaps {
    pub row: u32,
    pub col: u32,
}

/// Frame geometry of a generated template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TemplateStyle {
    pub margins: Margins,
    pub gaps: Gaps,
}

/// Built-in frame styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
pub enum StylePreset {
    /// Caption strip along the bottom
    #[default]
    #[serde(rename = "typeA")]
    A,
    /// Tight frame with wide column gutters
    #[serde(rename = "typeB")]
    B,
    /// Caption strip along the top
    #[serde(rename = "typeC")]
    C,
}

impl StylePreset {
    pub fn style(self) -> TemplateStyle {
        let (margins, gaps) = match self {
            StylePreset::A => (
                Margins { top: 30, bottom: 180, left: 30, right: 30 },
                Gaps { row: 30, col: 30 },
            ),
            StylePreset::B => (
                Margins { top: 20, bottom: 20, left: 20, right: 20 },
                Gaps { row: 10, col: 40 },
            ),
            StylePreset::C => (
                Margins { top: 180, bottom: 30, left: 30, right: 30 },
                Gaps { row: 30, col: 30 },
            ),
        };
        TemplateStyle { margins, gaps }
    }

    /// File name suffix; the default style has none
    pub fn suffix(self) -> &'static str {
        match self {
            StylePreset::A => "",
            StylePreset::B => "_typeB",
            StylePreset::C => "_typeC",
        }
    }
}

/// Layouts generated on first start: (aspect ratio, cell layout, styles)
pub const DEFAULT_LAYOUTS: &[(&str, &str, &[StylePreset])] = &[
    ("2:3", "1x1", &[StylePreset::A]),
    ("3:4", "1x3", &[StylePreset::A]),
    ("4:3", "1x4", &[StylePreset::A, StylePreset::C]),
    ("4:3", "2x4", &[StylePreset::B]),
    ("4:5", "2x2", &[StylePreset::A]),
    ("1:1", "3x2", &[StylePreset::A]),
];

/// `template_4_3_1x4_typeC.png` style name for a generated template
pub fn default_template_file_name(aspect_ratio: &AspectRatio, cell_layout: &CellLayout, preset: StylePreset) -> String {
    format!(
        "template_{}_{}_{}{}.png",
        aspect_ratio.width(),
        aspect_ratio.height(),
        cell_layout,
        preset.suffix()
    )
}

fn cell_height(aspect_ratio: &AspectRatio, cell_width: u32) -> u64 {
    cell_width as u64 * aspect_ratio.height() as u64 / aspect_ratio.width() as u64
}

/// `cells` cells with a gap between neighbours plus fixed borders
fn extent(cells: u32, cell: u64, gap: u32, border: u32) -> u64 {
    let cells = cells as u64;
    cells
        .saturating_mul(cell)
        .saturating_add((cells - 1).saturating_mul(gap as u64))
        .saturating_add(border as u64)
}

/// Canvas size for a grid of `cell_w` x `cell_h` cells, refused past `max_pixels`.
fn grid_size(
    aspect_ratio: &AspectRatio,
    cell_layout: &CellLayout,
    (cell_w, cell_h): (u64, u64),
    gaps: (u32, u32),
    borders: (u32, u32),
    max_pixels: u64,
) -> Result<(u32, u32), GeneratorError> {
    let layout = || format!("{} at {}", cell_layout, aspect_ratio);
    if cell_h == 0 {
        return Err(GeneratorError::EmptyCells { layout: layout() });
    }

    let width = extent(cell_layout.cols(), cell_w, gaps.0, borders.0);
    let height = extent(cell_layout.rows(), cell_h, gaps.1, borders.1);
    if width.saturating_mul(height) > max_pixels {
        return Err(GeneratorError::TooLarge {
            layout: layout(),
            width,
            height,
            max: max_pixels,
        });
    }
    // Both sides are at most max_pixels
    Ok((width as u32, height as u32))
}

/// Build an opaque white template with one transparent hole per cell.
/// Holes come back row-major, matching hole extraction order.
///
/// Layouts whose cells collapse to nothing, or whose canvas would exceed
/// [`MAX_TEMPLATE_PIXELS`], are refused before anything is allocated.
pub fn generate_template(
    aspect_ratio: &AspectRatio,
    cell_layout: &CellLayout,
    style: &TemplateStyle,
) -> Result<(Raster, Vec<Hole>), GeneratorError> {
    let (cols, rows) = (cell_layout.cols(), cell_layout.rows());
    let TemplateStyle { margins, gaps } = style;
    let (width, height) = grid_size(
        aspect_ratio,
        cell_layout,
        (BASE_CELL_WIDTH as u64, cell_height(aspect_ratio, BASE_CELL_WIDTH)),
        (gaps.col, gaps.row),
        (
            margins.left.saturating_add(margins.right),
            margins.top.saturating_add(margins.bottom),
        ),
        MAX_TEMPLATE_PIXELS,
    )?;
    let cell_w = BASE_CELL_WIDTH;
    // Bounded by the canvas height
    let cell_h = cell_height(aspect_ratio, cell_w) as u32;

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    let mut holes = Vec::with_capacity(cell_layout.cell_count() as usize);

    for r in 0..rows {
        for c in 0..cols {
            let hole = Hole::new(
                margins.left + c * (cell_w + gaps.col),
                margins.top + r * (cell_h + gaps.row),
                cell_w,
                cell_h,
            );
            for y in hole.y..hole.y + hole.h {
                for x in hole.x..hole.x + hole.w {
                    canvas.get_pixel_mut(x, y).0[3] = 0;
                }
            }
            holes.push(hole);
        }
    }

    Ok((Raster::Rgba(canvas), holes))
}

/// Small pastel preview of a layout for pickers
pub fn render_layout_thumbnail(
    aspect_ratio: &AspectRatio,
    cell_layout: &CellLayout,
    color_offset: usize,
) -> Result<RgbImage, GeneratorError> {
    let (cols, rows) = (cell_layout.cols(), cell_layout.rows());
    let cell_w = THUMBNAIL_CELL_WIDTH;
    let cell_h = cell_height(aspect_ratio, cell_w).max(1);
    let (width, height) = grid_size(
        aspect_ratio,
        cell_layout,
        (cell_w as u64, cell_h),
        (THUMBNAIL_GAP, THUMBNAIL_GAP),
        (2 * THUMBNAIL_GAP, 2 * THUMBNAIL_GAP),
        MAX_THUMBNAIL_PIXELS,
    )?;
    let cell_h = cell_h as u32;
    let mut thumbnail = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

    for r in 0..rows {
        for c in 0..cols {
            let color = PASTELS[((r * cols + c) as usize + color_offset) % PASTELS.len()];
            let x0 = THUMBNAIL_GAP + c * (cell_w + THUMBNAIL_GAP);
            let y0 = THUMBNAIL_GAP + r * (cell_h + THUMBNAIL_GAP);
            for y in y0..y0 + cell_h {
                for x in x0..x0 + cell_w {
                    thumbnail.put_pixel(x, y, color);
                }
            }
        }
    }

    Ok(thumbnail)
}
