use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::soil::SoilCatalog;

/// Layers thinner than this (mm) are merged away after classification.
pub const DEFAULT_MIN_LAYER_THICKNESS: i64 = 200;

/// Phreatic level below ground (m) when the CPT does not record one.
pub const DEFAULT_PHREATIC_OFFSET: f64 = 1.0;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Process-wide settings, read once at start-up.
///
/// ```json
/// { "min_layer_thickness": 250, "catalog_path": "soils.json" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub min_layer_thickness: i64,
    pub default_phreatic_offset: f64,
    /// JSON soil catalog replacing the built-in Robertson table.
    pub catalog_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            min_layer_thickness: DEFAULT_MIN_LAYER_THICKNESS,
            default_phreatic_offset: DEFAULT_PHREATIC_OFFSET,
            catalog_path: None,
        }
    }
}

impl Settings {
    /// Read settings from a JSON file, or use the defaults without one.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Settings::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&text).context("parsing settings")?;
        log::debug!("settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Build the soil catalog these settings point at.
    pub fn catalog(&self) -> Result<SoilCatalog> {
        match &self.catalog_path {
            Some(path) => {
                let catalog = SoilCatalog::from_path(path)?;
                log::info!("using soil catalog {} ({} soils)", path.display(), catalog.len());
                Ok(catalog)
            }
            None => Ok(SoilCatalog::robertson()),
        }
    }
}
