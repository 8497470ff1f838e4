//! Placement specifications for photos, stickers and text blocks
//!
//! Rotations are in degrees, clockwise-positive, matching what the booth UI
//! shows. Overlay positions are the top-left corner of the unrotated box;
//! rotation always happens about the box's own centre.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::color::{parse_hex_color, ColorError};

/// Default text size when a block does not specify one
pub const DEFAULT_FONT_SIZE: f32 = 40.0;

/// Largest photo scale relative to its hole
pub const MAX_SCALE: f32 = 10.0;

/// Largest overlay box side, in pixels
pub const MAX_OVERLAY_SIDE: i32 = 4096;

/// Largest text size, in pixels
pub const MAX_FONT_SIZE: f32 = 1000.0;

/// Placement errors
#[derive(Debug, Error, PartialEq)]
pub enum PlacementError {
    #[error("Scale must be between 0 and {}, got {0}", MAX_SCALE)]
    InvalidScale(f32),
    #[error("Rotation must be finite, got {0}")]
    InvalidRotation(f32),
    #[error("Overlay dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
    #[error("Overlay larger than {}x{}, got {width}x{height}", MAX_OVERLAY_SIDE, MAX_OVERLAY_SIDE)]
    OversizedOverlay { width: i32, height: i32 },
    #[error("Font size must be between 0 and {}, got {0}", MAX_FONT_SIZE)]
    InvalidFontSize(f32),
    #[error(transparent)]
    Color(#[from] ColorError),
}

/// Per-hole photo transformation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transform {
    /// Scale relative to the hole size (1.0 fills the hole exactly)
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Clockwise rotation in degrees
    #[serde(default)]
    pub rotation: f32,
}

fn default_scale() -> f32 {
    1.0
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

impl Transform {
    pub fn new(scale: f32, rotation: f32) -> Self {
        Transform { scale, rotation }
    }

    pub fn validate(&self) -> Result<(), PlacementError> {
        if !(0.0..=MAX_SCALE).contains(&self.scale) {
            return Err(PlacementError::InvalidScale(self.scale));
        }
        if !self.rotation.is_finite() {
            return Err(PlacementError::InvalidRotation(self.rotation));
        }
        Ok(())
    }
}

fn check_overlay_side(width: i32, height: i32) -> Result<(), PlacementError> {
    if width > MAX_OVERLAY_SIDE || height > MAX_OVERLAY_SIDE {
        return Err(PlacementError::OversizedOverlay { width, height });
    }
    Ok(())
}

/// Unrotated box of an overlay on the final canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Clockwise rotation in degrees about the box centre
    #[serde(default)]
    pub rotation: f32,
}

impl Placement {
    pub fn new(x: i32, y: i32, width: i32, height: i32, rotation: f32) -> Self {
        Placement {
            x,
            y,
            width,
            height,
            rotation,
        }
    }

    /// Both dimensions strictly positive
    pub fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn validate(&self) -> Result<(), PlacementError> {
        if !self.has_area() {
            return Err(PlacementError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        check_overlay_side(self.width, self.height)?;
        if !self.rotation.is_finite() {
            return Err(PlacementError::InvalidRotation(self.rotation));
        }
        Ok(())
    }
}

/// A sticker image placed on top of the composed template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StickerPlacement {
    /// Sticker path relative to the sticker library root
    pub path: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub rotation: f32,
}

impl StickerPlacement {
    pub fn placement(&self) -> Placement {
        Placement::new(self.x, self.y, self.width, self.height, self.rotation)
    }
}

/// Horizontal alignment of lines inside a text block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Justify {
    #[default]
    Left,
    Center,
    Right,
}

/// A text block placed on top of the composed template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    pub text: String,
    /// Font name as registered in the font library
    pub font: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    /// Caller's estimate of the box width; 0 lets the text decide
    #[serde(default)]
    pub width: i32,
    /// Caller's estimate of the box height; 0 lets the text decide
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub justify: Justify,
    /// Fill colour as #RRGGBB
    #[serde(default = "default_text_color")]
    pub color: String,
    #[serde(default)]
    pub rotation: f32,
}

fn default_font_size() -> f32 {
    DEFAULT_FONT_SIZE
}

fn default_text_color() -> String {
    "#000000".to_string()
}

impl TextBlock {
    pub fn new(text: &str, font: &str, font_size: f32) -> Self {
        TextBlock {
            text: text.to_string(),
            font: font.to_string(),
            font_size,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            justify: Justify::Left,
            color: default_text_color(),
            rotation: 0.0,
        }
    }

    /// Caller box; width/height may be zero for text blocks
    pub fn placement(&self) -> Placement {
        Placement::new(self.x, self.y, self.width, self.height, self.rotation)
    }

    pub fn validate(&self) -> Result<(), PlacementError> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 || self.font_size > MAX_FONT_SIZE {
            return Err(PlacementError::InvalidFontSize(self.font_size));
        }
        if self.width < 0 || self.height < 0 {
            return Err(PlacementError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        check_overlay_side(self.width, self.height)?;
        if !self.rotation.is_finite() {
            return Err(PlacementError::InvalidRotation(self.rotation));
        }
        parse_hex_color(&self.color)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_transform() {
        let transform = Transform::default();
        assert_eq!(transform.scale, 1.0);
        assert_eq!(transform.rotation, 0.0);
        assert!(transform.validate().is_ok());
    }

    #[test]
    fn test_negative_scale_rejected() {
        let transform = Transform::new(-0.5, 0.0);
        assert!(matches!(transform.validate(), Err(PlacementError::InvalidScale(_))));
    }

    #[test]
    fn test_scale_is_capped() {
        assert!(Transform::new(MAX_SCALE, 0.0).validate().is_ok());
        for scale in [1000.0, f32::INFINITY, f32::NAN] {
            let transform = Transform::new(scale, 0.0);
            assert!(matches!(transform.validate(), Err(PlacementError::InvalidScale(_))));
        }
    }

    #[test]
    fn test_overlay_size_is_capped() {
        let placement = Placement::new(0, 0, MAX_OVERLAY_SIDE, 10, 0.0);
        assert!(placement.validate().is_ok());
        let placement = Placement::new(0, 0, 100_000, 10, 0.0);
        assert!(matches!(
            placement.validate(),
            Err(PlacementError::OversizedOverlay { width: 100_000, height: 10 })
        ));

        let mut block = TextBlock::new("hi", "Lobster", 30.0);
        block.height = 5000;
        assert!(matches!(block.validate(), Err(PlacementError::OversizedOverlay { .. })));
        block.height = 0;
        block.font_size = 5000.0;
        assert!(matches!(block.validate(), Err(PlacementError::InvalidFontSize(_))));
    }

    #[test]
    fn test_zero_sized_placement_rejected() {
        let placement = Placement::new(10, 10, 0, 40, 0.0);
        assert!(matches!(
            placement.validate(),
            Err(PlacementError::InvalidDimensions { width: 0, height: 40 })
        ));
    }

    #[test]
    fn test_text_block_defaults_from_json() {
        let block: TextBlock =
            serde_json::from_str(r#"{"text": "hi", "font": "Lobster"}"#).unwrap();
        assert_eq!(block.font_size, DEFAULT_FONT_SIZE);
        assert_eq!(block.justify, Justify::Left);
        assert_eq!(block.color, "#000000");
        assert!(block.validate().is_ok());
    }

    #[test]
    fn test_text_block_rejects_bad_color() {
        let mut block = TextBlock::new("hi", "Lobster", 30.0);
        block.color = "#12345".to_string();
        assert!(matches!(block.validate(), Err(PlacementError::Color(_))));
    }
}
