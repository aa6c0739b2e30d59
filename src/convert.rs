//! Millimetre ↔ metre conversion of layouts.
//!
//! Classification and storage keep depths as whole millimetres so repeated
//! edits never accumulate floating-point drift; the table and plots work in
//! metres. Going mm → m → mm gives back the same integers.

use std::sync::Arc;

use crate::error::LayoutError;
use crate::layout::{SoilLayer, SoilLayout, TableRow};
use crate::soil::SoilType;

/// Millimetres per metre.
pub const MM_PER_M: f64 = 1000.0;

/// Largest level magnitude (mm) a layout may hold, 10^9 m. Keeps every
/// thickness and elevation difference well inside `i64`.
pub const MAX_ABS_MM: i64 = 1_000_000_000_000;

pub fn mm_to_m(value: i64) -> f64 {
    value as f64 / MM_PER_M
}

/// Metres → millimetres, rounded to the nearest millimetre.
pub fn m_to_mm(value: f64) -> Result<i64, LayoutError> {
    if !value.is_finite() {
        return Err(LayoutError::NonFinite(value));
    }
    let mm = (value * MM_PER_M).round();
    if mm.abs() > MAX_ABS_MM as f64 {
        return Err(LayoutError::OutOfRange(value));
    }
    Ok(mm as i64)
}

/// Rejects millimetre levels beyond [`MAX_ABS_MM`].
pub fn check_mm(value: i64) -> Result<i64, LayoutError> {
    if value.checked_abs().map_or(true, |abs| abs > MAX_ABS_MM) {
        return Err(LayoutError::OutOfRange(value as f64));
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// MeterLayout – display representation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MeterLayer {
    pub soil: Arc<SoilType>,
    pub top_of_layer: f64,
    pub bottom_of_layer: f64,
}

impl MeterLayer {
    pub fn thickness(&self) -> f64 {
        self.top_of_layer - self.bottom_of_layer
    }
}

/// The same stratigraphy as a [`SoilLayout`], with every bound in metres.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterLayout {
    layers: Vec<MeterLayer>,
}

impl MeterLayout {
    pub fn new(layers: Vec<MeterLayer>) -> Result<Self, LayoutError> {
        let mut above: Option<f64> = None;
        for (index, layer) in layers.iter().enumerate() {
            let (top, bottom) = (layer.top_of_layer, layer.bottom_of_layer);
            for value in [top, bottom] {
                if !value.is_finite() {
                    return Err(LayoutError::NonFinite(value));
                }
            }
            if top <= bottom {
                return Err(LayoutError::NonPositiveThickness { index, top, bottom });
            }
            if let Some(above) = above {
                if above != top {
                    return Err(LayoutError::NotContiguous { index, above, top });
                }
            }
            above = Some(bottom);
        }
        if layers.is_empty() {
            return Err(LayoutError::Empty);
        }
        Ok(MeterLayout { layers })
    }

    pub(crate) fn from_millimeters(layout: &SoilLayout) -> Self {
        MeterLayout {
            layers: layout
                .layers()
                .iter()
                .map(|l| MeterLayer {
                    soil: Arc::clone(&l.soil),
                    top_of_layer: mm_to_m(l.top_of_layer),
                    bottom_of_layer: mm_to_m(l.bottom_of_layer),
                })
                .collect(),
        }
    }

    pub fn layers(&self) -> &[MeterLayer] {
        &self.layers
    }

    pub fn top(&self) -> f64 {
        self.layers[0].top_of_layer
    }

    pub fn bottom(&self) -> f64 {
        self.layers[self.layers.len() - 1].bottom_of_layer
    }

    pub fn to_millimeters(&self) -> Result<SoilLayout, LayoutError> {
        let layers = self
            .layers
            .iter()
            .map(|l| {
                Ok(SoilLayer::new(
                    Arc::clone(&l.soil),
                    m_to_mm(l.top_of_layer)?,
                    m_to_mm(l.bottom_of_layer)?,
                ))
            })
            .collect::<Result<Vec<_>, LayoutError>>()?;
        SoilLayout::new(layers)
    }

    pub fn to_table_rows(&self) -> Vec<TableRow> {
        self.layers
            .iter()
            .map(|l| TableRow {
                name: l.soil.ui_name.clone(),
                top_of_layer: l.top_of_layer,
            })
            .collect()
    }
}
