//! Template library: loading, ingestion and default generation
//!
//! Every template is a PNG with a JSON sidecar of the same stem holding its
//! holes and inferred layout. User uploads live in the templates directory,
//! generated defaults in their own directory; both are cached in memory.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{ImageError, ImageFormat, RgbaImage};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::generator::{default_template_file_name, generate_template, StylePreset, DEFAULT_LAYOUTS};
use super::holes::{extract_holes, HoleError};
use super::layout::infer_layout;
use super::raster::Raster;
use crate::domain::{AspectRatio, CellLayout, Hole, LayoutDescriptor, Transform};

/// Template-related errors
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Holes(#[from] HoleError),
    #[error("Only PNG templates are supported")]
    InvalidFormat,
    #[error("Failed to decode template: {0}")]
    Decode(ImageError),
    #[error("Could not infer a layout: {0}")]
    InvalidLayout(String),
    #[error("Failed to load template image: {0}")]
    ImageLoad(#[from] ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TemplateError {
    /// Whether the caller is at fault (4xx) rather than the server (5xx)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TemplateError::NotFound(_)
                | TemplateError::Holes(_)
                | TemplateError::InvalidFormat
                | TemplateError::Decode(_)
                | TemplateError::InvalidLayout(_)
        )
    }
}

/// Sidecar metadata stored next to each template PNG
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TemplateMetadata {
    pub id: String,
    pub file_name: String,
    #[schema(value_type = String, example = "4:3")]
    pub aspect_ratio: AspectRatio,
    #[schema(value_type = String, example = "1x4")]
    pub cell_layout: CellLayout,
    pub holes: Vec<Hole>,
    /// Default per-hole transformation, one per hole
    pub transformations: Vec<Transform>,
    #[serde(default)]
    pub is_default: bool,
    /// Preset used when the template was generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StylePreset>,
}

impl TemplateMetadata {
    pub fn layout(&self) -> LayoutDescriptor {
        LayoutDescriptor {
            aspect_ratio: self.aspect_ratio,
            cell_layout: self.cell_layout,
        }
    }
}

/// A loaded template with its image in memory
#[derive(Debug)]
pub struct Template {
    pub metadata: TemplateMetadata,
    pub image: RgbaImage,
}

impl Template {
    /// Load a template from its sidecar path
    pub fn load(sidecar: &Path) -> Result<Self, TemplateError> {
        let content = std::fs::read_to_string(sidecar)?;
        let metadata: TemplateMetadata = serde_json::from_str(&content)?;

        let image_path = sidecar.with_file_name(&metadata.file_name);
        let image = image::open(&image_path)?.to_rgba8();

        info!(
            id = %metadata.id,
            layout = %metadata.cell_layout,
            aspect_ratio = %metadata.aspect_ratio,
            holes = metadata.holes.len(),
            "Loaded template"
        );

        Ok(Template { metadata, image })
    }

    pub fn holes(&self) -> &[Hole] {
        &self.metadata.holes
    }
}

/// Manages all templates in memory
pub struct TemplateLibrary {
    templates: RwLock<HashMap<String, Arc<Template>>>,
    uploads_path: PathBuf,
    generated_path: PathBuf,
}

impl TemplateLibrary {
    pub fn new(uploads_path: impl Into<PathBuf>, generated_path: impl Into<PathBuf>) -> Self {
        TemplateLibrary {
            templates: RwLock::new(HashMap::new()),
            uploads_path: uploads_path.into(),
            generated_path: generated_path.into(),
        }
    }

    /// Load all templates from both directories, replacing the cache
    pub async fn load_all(&self) -> Result<usize, TemplateError> {
        let dirs = [self.uploads_path.clone(), self.generated_path.clone()];

        let templates = tokio::task::spawn_blocking(move || {
            let mut loaded = HashMap::new();
            for dir in &dirs {
                load_dir(dir, &mut loaded)?;
            }
            Ok::<_, TemplateError>(loaded)
        })
        .await
        .map_err(|e| TemplateError::Internal(format!("Task join error: {}", e)))??;

        let count = templates.len();
        *self.templates.write() = templates;
        Ok(count)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Template>> {
        self.templates.read().get(id).cloned()
    }

    pub fn template_count(&self) -> usize {
        self.templates.read().len()
    }

    /// All templates, defaults first, then by id
    pub fn list(&self) -> Vec<Arc<Template>> {
        let mut templates: Vec<_> = self.templates.read().values().cloned().collect();
        templates.sort_by(|a, b| {
            b.metadata
                .is_default
                .cmp(&a.metadata.is_default)
                .then_with(|| a.metadata.id.cmp(&b.metadata.id))
        });
        templates
    }

    pub fn by_layout(&self, aspect_ratio: &AspectRatio, cell_layout: &CellLayout) -> Vec<Arc<Template>> {
        self.list()
            .into_iter()
            .filter(|t| t.metadata.aspect_ratio == *aspect_ratio && t.metadata.cell_layout == *cell_layout)
            .collect()
    }

    /// Distinct layouts across the library, sorted by name
    pub fn layouts(&self) -> Vec<LayoutDescriptor> {
        let distinct: HashSet<LayoutDescriptor> = self
            .templates
            .read()
            .values()
            .map(|t| t.metadata.layout())
            .collect();

        let mut layouts: Vec<_> = distinct.into_iter().collect();
        layouts.sort_by_key(|l| (l.aspect_ratio.to_string(), l.cell_layout.to_string()));
        layouts
    }

    /// Store an uploaded PNG as a new template.
    ///
    /// Holes and layout are derived from the image. Nothing is left on disk
    /// when any step fails. The default template for the inferred layout is
    /// generated if it does not exist yet.
    pub fn ingest(&self, bytes: &[u8]) -> Result<Arc<Template>, TemplateError> {
        if image::guess_format(bytes).ok() != Some(ImageFormat::Png) {
            return Err(TemplateError::InvalidFormat);
        }

        std::fs::create_dir_all(&self.uploads_path)?;
        let id = Uuid::new_v4().simple().to_string();
        let image_path = self.uploads_path.join(format!("{}.png", id));
        let sidecar_path = image_path.with_extension("json");

        std::fs::write(&image_path, bytes)?;
        let template = match build_uploaded(&id, bytes, &sidecar_path) {
            Ok(template) => Arc::new(template),
            Err(e) => {
                for path in [&image_path, &sidecar_path] {
                    if path.exists() {
                        if let Err(remove_err) = std::fs::remove_file(path) {
                            warn!(path = %path.display(), error = %remove_err, "Failed to clean up rejected template");
                        }
                    }
                }
                return Err(e);
            }
        };

        info!(
            id = %id,
            layout = %template.metadata.cell_layout,
            holes = template.metadata.holes.len(),
            "Ingested template"
        );
        self.templates.write().insert(id, template.clone());

        let layout = template.metadata.layout();
        if let Err(e) = self.ensure_layout_default(&layout.aspect_ratio, &layout.cell_layout) {
            warn!(error = %e, "Failed to generate default template for uploaded layout");
        }

        Ok(template)
    }

    /// Generate every built-in default template that is missing on disk.
    /// Returns how many were generated.
    pub fn ensure_defaults(&self) -> Result<usize, TemplateError> {
        let mut generated = 0;
        for (aspect, layout, presets) in DEFAULT_LAYOUTS {
            let aspect = aspect
                .parse::<AspectRatio>()
                .map_err(|e| TemplateError::InvalidLayout(format!("{}", e)))?;
            let layout = layout
                .parse::<CellLayout>()
                .map_err(|e| TemplateError::InvalidLayout(format!("{}", e)))?;

            for preset in *presets {
                let (_, created) = self.generate(&aspect, &layout, *preset)?;
                if created {
                    generated += 1;
                }
            }
        }
        Ok(generated)
    }

    /// Generate a default template for one layout and style, or return the
    /// existing one. The flag reports whether a new file was written.
    pub fn generate(
        &self,
        aspect_ratio: &AspectRatio,
        cell_layout: &CellLayout,
        preset: StylePreset,
    ) -> Result<(Arc<Template>, bool), TemplateError> {
        let file_name = default_template_file_name(aspect_ratio, cell_layout, preset);
        let image_path = self.generated_path.join(&file_name);
        let sidecar_path = image_path.with_extension("json");
        let id = sidecar_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.clone());

        if let Some(existing) = self.get(&id) {
            return Ok((existing, false));
        }
        if sidecar_path.exists() && image_path.exists() {
            let template = Arc::new(Template::load(&sidecar_path)?);
            self.templates.write().insert(id, template.clone());
            return Ok((template, false));
        }

        let (raster, holes) = generate_template(aspect_ratio, cell_layout, &preset.style())
            .map_err(|e| TemplateError::InvalidLayout(e.to_string()))?;
        let metadata = TemplateMetadata {
            id: id.clone(),
            file_name,
            aspect_ratio: *aspect_ratio,
            cell_layout: *cell_layout,
            transformations: vec![Transform::default(); holes.len()],
            holes,
            is_default: true,
            style: Some(preset),
        };

        std::fs::create_dir_all(&self.generated_path)?;
        let image = raster.into_rgba();
        image.save_with_format(&image_path, ImageFormat::Png)?;
        std::fs::write(&sidecar_path, serde_json::to_vec_pretty(&metadata)?)?;

        info!(id = %id, layout = %cell_layout, aspect_ratio = %aspect_ratio, "Generated default template");

        let template = Arc::new(Template { metadata, image });
        self.templates.write().insert(id, template.clone());
        Ok((template, true))
    }

    /// Make sure the layout has a default template, generating a typeA one
    /// if none is loaded.
    fn ensure_layout_default(&self, aspect_ratio: &AspectRatio, cell_layout: &CellLayout) -> Result<(), TemplateError> {
        let has_default = self
            .by_layout(aspect_ratio, cell_layout)
            .iter()
            .any(|t| t.metadata.is_default);
        if !has_default {
            self.generate(aspect_ratio, cell_layout, StylePreset::A)?;
        }
        Ok(())
    }
}

fn build_uploaded(id: &str, bytes: &[u8], sidecar_path: &Path) -> Result<Template, TemplateError> {
    let raster = Raster::decode(bytes).map_err(TemplateError::Decode)?;
    let mut holes = extract_holes(&raster)?;
    holes.sort_by_key(|hole| (hole.y, hole.x));
    let layout = infer_layout(&holes)
        .ok_or_else(|| TemplateError::InvalidLayout("template has no usable holes".to_string()))?;

    let metadata = TemplateMetadata {
        id: id.to_string(),
        file_name: format!("{}.png", id),
        aspect_ratio: layout.aspect_ratio,
        cell_layout: layout.cell_layout,
        transformations: vec![Transform::default(); holes.len()],
        holes,
        is_default: false,
        style: None,
    };
    std::fs::write(sidecar_path, serde_json::to_vec_pretty(&metadata)?)?;

    Ok(Template {
        metadata,
        image: raster.into_rgba(),
    })
}

fn load_dir(dir: &Path, loaded: &mut HashMap<String, Arc<Template>>) -> Result<(), TemplateError> {
    if !dir.exists() {
        warn!("Templates directory does not exist: {}", dir.display());
        return Ok(());
    }

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }

        match Template::load(&path) {
            Ok(template) => {
                loaded.insert(template.metadata.id.clone(), Arc::new(template));
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load template"
                );
            }
        }
    }
    Ok(())
}
