//! Hex colour parsing for text fills and photo backgrounds

use image::Rgb;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("Invalid hex color '{0}': expected 6 hex digits")]
    InvalidHex(String),
}

/// Parse `#RRGGBB` (leading `#` optional) into an RGB triple.
pub fn parse_hex_color(value: &str) -> Result<Rgb<u8>, ColorError> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(ColorError::InvalidHex(value.to_string()));
    }

    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ColorError::InvalidHex(value.to_string()))
    };

    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}
