//! Photo filter settings as sent by the booth's filter sliders

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Neutral value of the percentage sliders
pub const NEUTRAL_PERCENT: f32 = 100.0;
/// Upper bound of the percentage sliders
pub const MAX_PERCENT: f32 = 200.0;

#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("{name} must be within 0..=200, got {value}")]
    OutOfRange { name: &'static str, value: f32 },
    #[error("{name} must be a finite non-negative number, got {value}")]
    Negative { name: &'static str, value: f32 },
}

/// Tone and detail adjustments applied to each photo before placement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct FilterSettings {
    /// Percentage, 100 = unchanged
    pub brightness: f32,
    /// Percentage, 100 = unchanged
    pub contrast: f32,
    /// Percentage, 100 = unchanged
    pub saturate: f32,
    /// Percentage, 100 = neutral; higher is warmer
    pub warmth: f32,
    /// Sharpen amount in percent, 0 = off
    pub sharpness: f32,
    /// Gaussian sigma in pixels, 0 = off
    pub blur: f32,
    /// Noise standard deviation, 0 = off
    pub grain: f32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        FilterSettings {
            brightness: NEUTRAL_PERCENT,
            contrast: NEUTRAL_PERCENT,
            saturate: NEUTRAL_PERCENT,
            warmth: NEUTRAL_PERCENT,
            sharpness: 0.0,
            blur: 0.0,
            grain: 0.0,
        }
    }
}

impl FilterSettings {
    /// True when every stage would be skipped
    pub fn is_neutral(&self) -> bool {
        *self == FilterSettings::default()
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        for (name, value) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturate", self.saturate),
            ("warmth", self.warmth),
        ] {
            if !value.is_finite() || !(0.0..=MAX_PERCENT).contains(&value) {
                return Err(FilterError::OutOfRange { name, value });
            }
        }

        for (name, value) in [
            ("sharpness", self.sharpness),
            ("blur", self.blur),
            ("grain", self.grain),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(FilterError::Negative { name, value });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: FilterSettings = serde_json::from_str(r#"{"warmth": 140}"#).unwrap();
        assert_eq!(settings.warmth, 140.0);
        assert_eq!(settings.brightness, NEUTRAL_PERCENT);
        assert_eq!(settings.blur, 0.0);
        assert!(!settings.is_neutral());
        assert!(FilterSettings::default().is_neutral());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let settings = FilterSettings {
            contrast: 250.0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(FilterError::OutOfRange { name: "contrast", .. })
        ));

        let settings = FilterSettings {
            grain: -1.0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(FilterError::Negative { name: "grain", .. })));
    }
}
