//! Configuration for the photobooth service

use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};
use std::path::PathBuf;

/// Main application settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub templates: TemplateSettings,
    pub assets: AssetSettings,
    #[serde(default)]
    pub engine: EngineSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Largest accepted JSON body; photos arrive base64-encoded
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

/// Template directories
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateSettings {
    /// Uploaded templates and their sidecars
    pub path: PathBuf,
    /// Generated default templates
    pub generated_path: PathBuf,
}

/// Sticker and font directories
#[derive(Debug, Clone, Deserialize)]
pub struct AssetSettings {
    pub stickers_path: PathBuf,
    pub fonts_path: PathBuf,
}

/// Compositing limits
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_max_photos")]
    pub max_photos: usize,
    /// Fixed seed for film grain; random when unset
    pub random_grain_seed: Option<u64>,
}

fn default_max_payload_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_max_photos() -> usize {
    16
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            max_photos: default_max_photos(),
            random_grain_seed: None,
        }
    }
}

impl Settings {
    /// Load configuration from files and environment variables
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables (prefixed with PHOTOBOOTH_)
    /// 2. config/local.toml (gitignored)
    /// 3. config/default.toml
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));

        Self::load_from(&config_dir)
    }

    /// Load configuration rooted at an explicit directory
    pub fn load_from(config_dir: &std::path::Path) -> Result<Self, ConfigError> {
        let defaults = Settings::default();

        let builder = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("templates.path", defaults.templates.path.to_string_lossy().into_owned())?
            .set_default(
                "templates.generated_path",
                defaults.templates.generated_path.to_string_lossy().into_owned(),
            )?
            .set_default("assets.stickers_path", defaults.assets.stickers_path.to_string_lossy().into_owned())?
            .set_default("assets.fonts_path", defaults.assets.fonts_path.to_string_lossy().into_owned())?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local overrides (gitignored)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Add environment variables (PHOTOBOOTH_SERVER__PORT, etc.)
            .add_source(
                Environment::with_prefix("PHOTOBOOTH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 8080,
                workers: None,
                max_payload_bytes: default_max_payload_bytes(),
            },
            templates: TemplateSettings {
                path: PathBuf::from("static/templates"),
                generated_path: PathBuf::from("static/generated_templates"),
            },
            assets: AssetSettings {
                stickers_path: PathBuf::from("static/stickers"),
                fonts_path: PathBuf::from("static/fonts"),
            },
            engine: EngineSettings::default(),
        }
    }
}
