use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::color::{SoilColor, generate_palette};

// ---------------------------------------------------------------------------
// ClassificationRule – where a soil type sits on the Robertson chart
// ---------------------------------------------------------------------------

/// Region of the cone-resistance / friction-ratio chart assigned to one
/// soil type. `qn` is `qc / pa` with `pa = 0.1 MPa`, `rf` is in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassificationRule {
    /// Sensitive fine grained soils: `qn < coefficient * exp(-decay * rf)`.
    Sensitive { coefficient: f64, decay: f64 },
    /// Very stiff soils: `qn >= min_qn` and `min_rf <= rf < max_rf`.
    Stiff {
        min_qn: f64,
        min_rf: f64,
        max_rf: Option<f64>,
    },
    /// Soil behaviour type index in `[min, max)`; open ends are unbounded.
    IndexRange { min: Option<f64>, max: Option<f64> },
}

impl ClassificationRule {
    /// Region rules carve pieces out of the index bands and are tried first.
    pub fn is_region(&self) -> bool {
        !matches!(self, ClassificationRule::IndexRange { .. })
    }
}

// ---------------------------------------------------------------------------
// SoilType – one immutable catalog entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilType {
    pub name: String,
    /// Name shown in the layout table; unique within a catalog.
    pub ui_name: String,
    pub color: SoilColor,
    /// Friction angle in degrees.
    pub phi: f64,
    /// Unit weights in kN/m³.
    pub gamma_dry: f64,
    pub gamma_wet: f64,
    /// `None` marks the fallback entry for samples no rule accepts.
    #[serde(default)]
    pub rule: Option<ClassificationRule>,
}

// ---------------------------------------------------------------------------
// SoilCatalog – ordered, read-only table
// ---------------------------------------------------------------------------

/// Shape of an entry in a user supplied catalog file. The colour may be left
/// out, in which case one is picked from an evenly spaced palette.
#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,
    ui_name: String,
    color: Option<SoilColor>,
    phi: f64,
    gamma_dry: f64,
    gamma_wet: f64,
    #[serde(default)]
    rule: Option<ClassificationRule>,
}

/// The soil types available for classification and table editing. Built once
/// at start-up and shared; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SoilCatalog {
    soils: Vec<Arc<SoilType>>,
}

impl SoilCatalog {
    pub fn new(soils: Vec<SoilType>) -> Result<Self> {
        if soils.is_empty() {
            bail!("soil catalog is empty");
        }
        let mut seen = BTreeSet::new();
        for soil in &soils {
            if !seen.insert(soil.ui_name.as_str()) {
                bail!("soil '{}' appears more than once in the catalog", soil.ui_name);
            }
        }
        if soils.iter().filter(|s| s.rule.is_none()).count() > 1 {
            bail!("soil catalog declares more than one fallback entry");
        }
        Ok(SoilCatalog {
            soils: soils.into_iter().map(Arc::new).collect(),
        })
    }

    /// Parse a catalog from a JSON array of entries.
    pub fn from_json(text: &str) -> Result<Self> {
        let entries: Vec<CatalogEntry> =
            serde_json::from_str(text).context("parsing soil catalog")?;
        let mut palette = generate_palette(entries.len()).into_iter();
        let soils = entries
            .into_iter()
            .map(|e| {
                let generated = palette.next();
                SoilType {
                    name: e.name,
                    ui_name: e.ui_name,
                    color: e
                        .color
                        .or(generated)
                        .unwrap_or(SoilColor::new(128, 128, 128)),
                    phi: e.phi,
                    gamma_dry: e.gamma_dry,
                    gamma_wet: e.gamma_wet,
                    rule: e.rule,
                }
            })
            .collect();
        Self::new(soils)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading soil catalog {}", path.display()))?;
        Self::from_json(&text)
    }

    /// The default Robertson table: an unknown-material fallback followed by
    /// the nine soil behaviour type zones.
    pub fn robertson() -> Self {
        use ClassificationRule::*;

        fn entry(
            zone: &str,
            ui_name: &str,
            color: (u8, u8, u8),
            gamma: (f64, f64),
            phi: f64,
            rule: Option<ClassificationRule>,
        ) -> SoilType {
            SoilType {
                name: format!("Robertson zone {zone}"),
                ui_name: ui_name.to_string(),
                color: color.into(),
                phi,
                gamma_dry: gamma.0,
                gamma_wet: gamma.1,
                rule,
            }
        }
        let band = |min: Option<f64>, max: Option<f64>| Some(IndexRange { min, max });

        let soils = vec![
            entry("unknown", "Onbekend materiaal", (255, 0, 0), (0.0, 0.0), 0.0, None),
            entry(
                "1",
                "Grond, fijn korrelig",
                (200, 25, 0),
                (10.0, 10.0),
                15.0,
                Some(Sensitive { coefficient: 12.0, decay: 1.4 }),
            ),
            entry(
                "2",
                "Veen, organisch materiaal",
                (188, 104, 67),
                (12.0, 12.0),
                15.0,
                band(Some(3.60), None),
            ),
            entry(
                "3",
                "Klei, zwak siltig tot siltig",
                (29, 118, 29),
                (15.5, 15.5),
                17.5,
                band(Some(2.95), Some(3.60)),
            ),
            entry(
                "4",
                "Klei, siltig / leem",
                (213, 252, 181),
                (18.0, 18.0),
                22.5,
                band(Some(2.60), Some(2.95)),
            ),
            entry(
                "5",
                "Zand, siltig tot leem",
                (213, 252, 155),
                (18.0, 20.0),
                25.0,
                band(Some(2.05), Some(2.60)),
            ),
            entry(
                "6",
                "Zand, zwak siltig tot siltig",
                (255, 225, 178),
                (18.0, 20.0),
                27.0,
                band(Some(1.31), Some(2.05)),
            ),
            entry(
                "7",
                "Zand tot zand, grindig",
                (255, 183, 42),
                (17.0, 19.0),
                32.5,
                band(None, Some(1.31)),
            ),
            entry(
                "8",
                "Zand, vast - zand, kleiig",
                (200, 190, 200),
                (18.0, 20.0),
                32.5,
                Some(Stiff { min_qn: 200.0, min_rf: 1.5, max_rf: Some(4.5) }),
            ),
            entry(
                "9",
                "Grond, zeer stijf, fijnkorrelig",
                (186, 205, 224),
                (20.0, 22.0),
                40.0,
                Some(Stiff { min_qn: 100.0, min_rf: 4.5, max_rf: None }),
            ),
        ];
        SoilCatalog {
            soils: soils.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SoilType>> {
        self.soils.iter()
    }

    pub fn len(&self) -> usize {
        self.soils.len()
    }

    pub fn is_empty(&self) -> bool {
        self.soils.is_empty()
    }

    /// Look up a soil type by the name shown in the layout table.
    pub fn get(&self, ui_name: &str) -> Option<&Arc<SoilType>> {
        self.soils.iter().find(|s| s.ui_name == ui_name)
    }

    pub fn fallback(&self) -> Option<&Arc<SoilType>> {
        self.soils.iter().find(|s| s.rule.is_none())
    }

    /// Table options, in catalog order.
    pub fn ui_names(&self) -> Vec<&str> {
        self.soils.iter().map(|s| s.ui_name.as_str()).collect()
    }
}

impl Default for SoilCatalog {
    fn default() -> Self {
        SoilCatalog::robertson()
    }
}
