//! Font and sticker lookup
//!
//! Both libraries are rooted at a configured directory. Fonts are parsed once
//! and cached; stickers are decoded per composition since each one is
//! resized to its own box anyway.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rusttype::Font;
use tracing::debug;

use super::compositor::OverlayError;
use super::raster::Raster;
use super::text::TextError;

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// Named fonts under a directory, parsed on first use
pub struct FontLibrary {
    root: PathBuf,
    cache: RwLock<HashMap<String, Arc<Font<'static>>>>,
}

impl FontLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FontLibrary {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File names of every font in the library, sorted
    pub fn names(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_font_file(path))
            .filter_map(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        names
    }

    /// Map a font name to a file in the library.
    ///
    /// Only the final path component is used, so `"/static/fonts/Foo.ttf"`,
    /// `"Foo.ttf"` and `"Foo"` all resolve to `<root>/Foo.ttf`.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let file_name = Path::new(name.trim()).file_name()?;
        let candidate = self.root.join(file_name);
        if candidate.is_file() && is_font_file(&candidate) {
            return Some(candidate);
        }

        FONT_EXTENSIONS
            .iter()
            .map(|ext| candidate.with_extension(ext))
            .find(|path| path.is_file())
    }

    /// Load (or fetch from cache) a parsed font
    pub fn load(&self, name: &str) -> Result<Arc<Font<'static>>, TextError> {
        if let Some(font) = self.cache.read().get(name) {
            return Ok(font.clone());
        }

        let path = self
            .resolve(name)
            .ok_or_else(|| TextError::FontNotFound(name.to_string()))?;
        let load_error = |reason: String| TextError::FontLoadError {
            path: path.display().to_string(),
            reason,
        };

        let data = std::fs::read(&path).map_err(|e| load_error(e.to_string()))?;
        let font = Font::try_from_vec(data).ok_or_else(|| load_error("not a valid font file".to_string()))?;
        let font = Arc::new(font);

        debug!(name = %name, path = %path.display(), "Loaded font");
        self.cache.write().insert(name.to_string(), font.clone());
        Ok(font)
    }
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FONT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Sticker images under a directory
pub struct StickerLibrary {
    root: PathBuf,
}

impl StickerLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StickerLibrary { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a sticker path relative to the library root.
    /// Paths that try to leave the root are reported as not found.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, OverlayError> {
        let not_found = || OverlayError::StickerNotFound(path.to_string());
        let normalized = path.replace('\\', "/");

        let mut resolved = self.root.clone();
        let mut depth = 0;
        for part in normalized.split('/') {
            match part {
                "" | "." => continue,
                ".." => return Err(not_found()),
                part => {
                    resolved.push(part);
                    depth += 1;
                }
            }
        }

        if depth == 0 {
            return Err(not_found());
        }
        Ok(resolved)
    }

    /// Read and decode a sticker
    pub fn load(&self, path: &str) -> Result<Raster, OverlayError> {
        let resolved = self.resolve(path)?;
        let bytes = std::fs::read(&resolved).map_err(|e| match e.kind() {
            ErrorKind::NotFound => OverlayError::StickerNotFound(path.to_string()),
            _ => OverlayError::Io(e),
        })?;
        Ok(Raster::decode(&bytes)?)
    }
}
