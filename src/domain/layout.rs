//! Template geometry: holes, aspect ratios and grid layouts
//!
//! Aspect ratios and cell layouts travel over the wire as the compact strings
//! `"W:H"` and `"COLSxROWS"`; both types reject zero components so every
//! constructed value describes a real grid.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Layout string parsing errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutParseError {
    #[error("Invalid aspect ratio '{0}', expected W:H with positive integers")]
    AspectRatio(String),
    #[error("Invalid cell layout '{0}', expected COLSxROWS with positive integers")]
    CellLayout(String),
}

/// Transparent rectangular region of a template where a photo is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Hole {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Hole {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Hole { x, y, w, h }
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
}

/// Width-to-height ratio in lowest terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    w: u32,
    h: u32,
}

impl AspectRatio {
    /// Build a ratio, reducing it by the greatest common divisor.
    pub fn reduced(w: u32, h: u32) -> Option<Self> {
        if w == 0 || h == 0 {
            return None;
        }
        let g = gcd(w, h);
        Some(AspectRatio { w: w / g, h: h / g })
    }

    pub fn width(&self) -> u32 {
        self.w
    }

    pub fn height(&self) -> u32 {
        self.h
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.w, self.h)
    }
}

impl FromStr for AspectRatio {
    type Err = LayoutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || LayoutParseError::AspectRatio(s.to_string());
        let (w, h) = s.trim().split_once(':').ok_or_else(err)?;
        let w: u32 = w.trim().parse().map_err(|_| err())?;
        let h: u32 = h.trim().parse().map_err(|_| err())?;
        AspectRatio::reduced(w, h).ok_or_else(err)
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = LayoutParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(value: AspectRatio) -> Self {
        value.to_string()
    }
}

/// Grid shape of a template, `cols` across and `rows` down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellLayout {
    cols: u32,
    rows: u32,
}

impl CellLayout {
    pub fn new(cols: u32, rows: u32) -> Option<Self> {
        if cols == 0 || rows == 0 {
            return None;
        }
        Some(CellLayout { cols, rows })
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cell_count(&self) -> u64 {
        self.cols as u64 * self.rows as u64
    }
}

impl fmt::Display for CellLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

impl FromStr for CellLayout {
    type Err = LayoutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || LayoutParseError::CellLayout(s.to_string());
        let (cols, rows) = s.trim().split_once('x').ok_or_else(err)?;
        let cols: u32 = cols.trim().parse().map_err(|_| err())?;
        let rows: u32 = rows.trim().parse().map_err(|_| err())?;
        CellLayout::new(cols, rows).ok_or_else(err)
    }
}

impl TryFrom<String> for CellLayout {
    type Error = LayoutParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CellLayout> for String {
    fn from(value: CellLayout) -> Self {
        value.to_string()
    }
}

/// Aspect ratio and grid shape inferred from (or used to generate) a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct LayoutDescriptor {
    /// Reduced aspect ratio of the largest hole, e.g. "4:3"
    #[schema(value_type = String, example = "4:3")]
    pub aspect_ratio: AspectRatio,
    /// Grid shape as COLSxROWS, e.g. "1x4"
    #[schema(value_type = String, example = "1x4")]
    pub cell_layout: CellLayout,
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}
