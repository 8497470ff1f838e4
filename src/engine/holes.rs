//! Hole extraction from a template's alpha channel
//!
//! A hole is any 8-connected region of (nearly) fully transparent pixels that
//! is not itself enclosed by another hole, reduced to its bounding rectangle.
//! Opaque regions are labelled with 4-connectivity, which is the dual of the
//! 8-connected hole labelling, so "enclosed" has the usual topological meaning.

use std::collections::{HashMap, HashSet};

use image::{GrayImage, Luma, RgbaImage};
use imageproc::region_labelling::{connected_components, Connectivity};
use thiserror::Error;

use super::raster::Raster;
use crate::domain::Hole;

/// Pixels with alpha at or below this value count as transparent
pub const HOLE_ALPHA_THRESHOLD: u8 = 1;
/// Regions narrower or shorter than this are treated as noise
pub const MIN_HOLE_SIZE: u32 = 5;

const HOLE: u8 = 255;
const OPAQUE: u8 = 0;

/// Hole extraction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HoleError {
    #[error("Template has no alpha channel")]
    MissingAlphaChannel,
    #[error("No holes found in the template")]
    NoHolesFound,
}

#[derive(Debug)]
struct Region {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    external: bool,
}

impl Region {
    fn at(x: u32, y: u32) -> Self {
        Region {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            external: false,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn bounding_hole(&self) -> Hole {
        Hole::new(
            self.min_x,
            self.min_y,
            self.max_x - self.min_x + 1,
            self.max_y - self.min_y + 1,
        )
    }
}

/// Find the transparent placement regions of a template.
///
/// Holes are returned in discovery order: raster order of each region's
/// first pixel (top-to-bottom, then left-to-right).
pub fn extract_holes(template: &Raster) -> Result<Vec<Hole>, HoleError> {
    let rgba = match template {
        Raster::Rgba(img) => img,
        Raster::Rgb(_) => return Err(HoleError::MissingAlphaChannel),
    };

    let holes = external_regions(rgba)
        .into_iter()
        .filter(|hole| hole.w >= MIN_HOLE_SIZE && hole.h >= MIN_HOLE_SIZE)
        .collect::<Vec<_>>();

    if holes.is_empty() {
        return Err(HoleError::NoHolesFound);
    }

    Ok(holes)
}

/// Binary mask with holes as foreground (255) and opaque pixels as 0
fn hole_mask(template: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(template.width(), template.height(), |x, y| {
        if template.get_pixel(x, y).0[3] <= HOLE_ALPHA_THRESHOLD {
            Luma([HOLE])
        } else {
            Luma([OPAQUE])
        }
    })
}

fn external_regions(template: &RgbaImage) -> Vec<Hole> {
    let (width, height) = template.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mask = hole_mask(template);
    let hole_labels = connected_components(&mask, Connectivity::Eight, Luma([OPAQUE]));

    let inverted = GrayImage::from_fn(width, height, |x, y| Luma([HOLE - mask.get_pixel(x, y).0[0]]));
    let opaque_labels = connected_components(&inverted, Connectivity::Four, Luma([OPAQUE]));

    // Opaque regions reachable from the image frame
    let mut outer = HashSet::new();
    for x in 0..width {
        outer.insert(opaque_labels.get_pixel(x, 0).0[0]);
        outer.insert(opaque_labels.get_pixel(x, height - 1).0[0]);
    }
    for y in 0..height {
        outer.insert(opaque_labels.get_pixel(0, y).0[0]);
        outer.insert(opaque_labels.get_pixel(width - 1, y).0[0]);
    }
    outer.remove(&0);

    let touches_outer = |x: u32, y: u32| -> bool {
        if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
            return true;
        }
        [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)]
            .iter()
            .any(|&(nx, ny)| outer.contains(&opaque_labels.get_pixel(nx, ny).0[0]))
    };

    let mut order: Vec<u32> = Vec::new();
    let mut regions: HashMap<u32, Region> = HashMap::new();

    for y in 0..height {
        for x in 0..width {
            let label = hole_labels.get_pixel(x, y).0[0];
            if label == 0 {
                continue;
            }

            let region = regions.entry(label).or_insert_with(|| {
                order.push(label);
                Region::at(x, y)
            });
            region.include(x, y);
            if !region.external && touches_outer(x, y) {
                region.external = true;
            }
        }
    }

    order
        .into_iter()
        .filter_map(|label| regions.get(&label))
        .filter(|region| region.external)
        .map(Region::bounding_hole)
        .collect()
}
