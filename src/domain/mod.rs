//! Domain types and models

mod color;
mod filters;
mod layout;
mod placement;

pub use color::{parse_hex_color, ColorError};
pub use filters::{FilterError, FilterSettings, MAX_PERCENT, NEUTRAL_PERCENT};
pub use layout::{AspectRatio, CellLayout, Hole, LayoutDescriptor, LayoutParseError};
pub use placement::{
    Justify, Placement, PlacementError, StickerPlacement, TextBlock, Transform, DEFAULT_FONT_SIZE,
};
