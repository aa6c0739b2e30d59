use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::convert::{MeterLayout, check_mm, m_to_mm};
use crate::error::LayoutError;
use crate::soil::{SoilCatalog, SoilType};

// ---------------------------------------------------------------------------
// SoilLayer – one interval of the stratigraphy
// ---------------------------------------------------------------------------

/// A soil interval in millimetres with respect to the height system.
/// `top_of_layer` lies above `bottom_of_layer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilLayer {
    pub soil: Arc<SoilType>,
    pub top_of_layer: i64,
    pub bottom_of_layer: i64,
}

impl SoilLayer {
    pub fn new(soil: Arc<SoilType>, top_of_layer: i64, bottom_of_layer: i64) -> Self {
        SoilLayer {
            soil,
            top_of_layer,
            bottom_of_layer,
        }
    }

    pub fn thickness(&self) -> i64 {
        self.top_of_layer - self.bottom_of_layer
    }
}

/// Checks a top-to-bottom layer sequence for range, positive thickness and
/// contiguity.
fn validate_layers(layers: &[SoilLayer]) -> Result<(), LayoutError> {
    if layers.is_empty() {
        return Err(LayoutError::Empty);
    }
    let mut above: Option<i64> = None;
    for (index, layer) in layers.iter().enumerate() {
        let top = check_mm(layer.top_of_layer)?;
        let bottom = check_mm(layer.bottom_of_layer)?;
        if top <= bottom {
            return Err(LayoutError::NonPositiveThickness {
                index,
                top: top as f64,
                bottom: bottom as f64,
            });
        }
        if let Some(above) = above {
            if above != top {
                return Err(LayoutError::NotContiguous {
                    index,
                    above: above as f64,
                    top: top as f64,
                });
            }
        }
        above = Some(bottom);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// TableRow – editable projection of a layer
// ---------------------------------------------------------------------------

/// One row of the editable layout table: a soil name and the top of its
/// layer in metres. The bottom is implied by the next row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub name: String,
    pub top_of_layer: f64,
}

// ---------------------------------------------------------------------------
// SoilLayout – ordered, contiguous layer sequence
// ---------------------------------------------------------------------------

/// Ordered top-to-bottom sequence of contiguous layers in millimetres.
///
/// Every constructor validates the layout, and every operation returns a
/// new value, so a layout that exists is always non-empty, gap-free and
/// ordered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoilLayout {
    layers: Vec<SoilLayer>,
}

#[derive(Deserialize)]
struct LayoutDocument {
    layers: Vec<SoilLayer>,
}

impl SoilLayout {
    pub fn new(layers: Vec<SoilLayer>) -> Result<Self, LayoutError> {
        validate_layers(&layers)?;
        Ok(SoilLayout { layers })
    }

    pub fn layers(&self) -> &[SoilLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn top(&self) -> i64 {
        self.layers[0].top_of_layer
    }

    pub fn bottom(&self) -> i64 {
        self.layers[self.layers.len() - 1].bottom_of_layer
    }

    pub fn thickness(&self) -> i64 {
        self.top() - self.bottom()
    }

    // -- Thickness filter --

    /// Remove layers thinner than `min_thickness` (mm) by merging them into
    /// a neighbour.
    ///
    /// The thinnest offending layer goes first, the topmost one on equal
    /// thickness. It is absorbed by the thicker of its two neighbours, the
    /// upper one when both are equally thick, or by its only neighbour at
    /// either end of the layout. With `merge_adjacent_same_soil` set,
    /// neighbouring layers of the same soil are joined before the scan and
    /// after every merge. The covered interval never changes.
    pub fn filter_on_thickness(
        &self,
        min_thickness: i64,
        merge_adjacent_same_soil: bool,
    ) -> SoilLayout {
        let mut layers = self.layers.clone();
        if merge_adjacent_same_soil {
            layers = coalesce(layers);
        }

        while layers.len() > 1 {
            let thinnest = layers
                .iter()
                .enumerate()
                .filter(|(_, l)| l.thickness() < min_thickness)
                .min_by_key(|(_, l)| l.thickness())
                .map(|(idx, _)| idx);
            let Some(idx) = thinnest else { break };

            let last = layers.len() - 1;
            let into_upper = if idx == 0 {
                false
            } else if idx == last {
                true
            } else {
                layers[idx - 1].thickness() >= layers[idx + 1].thickness()
            };

            let thin = layers.remove(idx);
            if into_upper {
                layers[idx - 1].bottom_of_layer = thin.bottom_of_layer;
            } else {
                layers[idx].top_of_layer = thin.top_of_layer;
            }
            log::trace!(
                "merged {} mm of '{}' into the layer {}",
                thin.thickness(),
                thin.soil.ui_name,
                if into_upper { "above" } else { "below" }
            );

            if merge_adjacent_same_soil {
                layers = coalesce(layers);
            }
        }

        log::debug!(
            "thickness filter ({min_thickness} mm): {} -> {} layers",
            self.layers.len(),
            layers.len()
        );
        SoilLayout { layers }
    }

    /// Join directly adjacent layers that share a soil type.
    pub fn merge_adjacent_same_soil(&self) -> SoilLayout {
        SoilLayout {
            layers: coalesce(self.layers.clone()),
        }
    }

    // -- Unit conversion --

    pub fn to_meters(&self) -> MeterLayout {
        MeterLayout::from_millimeters(self)
    }

    // -- Table rows --

    /// One editable row per layer, top to bottom, in metres.
    pub fn to_table_rows(&self) -> Vec<TableRow> {
        self.to_meters().to_table_rows()
    }

    /// Rebuild a layout from editable rows and the bottom of the layout, all
    /// in metres. Each row ends where the next one starts and the last row
    /// ends at `bottom_of_layout`.
    pub fn from_table_rows(
        catalog: &SoilCatalog,
        bottom_of_layout: f64,
        rows: &[TableRow],
    ) -> Result<SoilLayout, LayoutError> {
        if rows.is_empty() {
            return Err(LayoutError::Empty);
        }
        for (index, pair) in rows.windows(2).enumerate() {
            let (previous, top) = (pair[0].top_of_layer, pair[1].top_of_layer);
            if !(top < previous) {
                return Err(LayoutError::NotDescending {
                    index: index + 1,
                    top,
                    previous,
                });
            }
        }

        let mut layers = Vec::with_capacity(rows.len());
        let mut bottom = m_to_mm(bottom_of_layout)?;
        for row in rows.iter().rev() {
            let soil = catalog
                .get(&row.name)
                .ok_or_else(|| LayoutError::UnknownSoil(row.name.clone()))?;
            let top = m_to_mm(row.top_of_layer)?;
            layers.push(SoilLayer::new(Arc::clone(soil), top, bottom));
            bottom = top;
        }
        layers.reverse();
        SoilLayout::new(layers)
    }

    // -- Full-fidelity serialization --

    /// Every layer with its bounds and complete soil type, for storing the
    /// original classification result.
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "layers": self
                .layers
                .iter()
                .map(|l| {
                    serde_json::json!({
                        "soil": l.soil.as_ref(),
                        "top_of_layer": l.top_of_layer,
                        "bottom_of_layer": l.bottom_of_layer,
                    })
                })
                .collect::<Vec<_>>(),
        })
    }

    pub fn from_dict(value: &serde_json::Value) -> Result<SoilLayout, LayoutError> {
        let document = LayoutDocument::deserialize(value)
            .map_err(|e| LayoutError::Document(e.to_string()))?;
        SoilLayout::new(document.layers)
    }
}

fn coalesce(layers: Vec<SoilLayer>) -> Vec<SoilLayer> {
    let mut merged: Vec<SoilLayer> = Vec::with_capacity(layers.len());
    for layer in layers {
        match merged.last_mut() {
            Some(previous) if previous.soil == layer.soil => {
                previous.bottom_of_layer = layer.bottom_of_layer;
            }
            _ => merged.push(layer),
        }
    }
    merged
}
