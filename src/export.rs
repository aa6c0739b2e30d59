//! Projections of a finalized CPT record for the downstream solvers.
//!
//! The pile-bearing solver wants named materials with top levels, the
//! phreatic level and the raw cone readings; the structural model wants the
//! layer colours and levels. Neither is run from here.

use serde::Serialize;

use crate::color::SoilColor;
use crate::convert::{m_to_mm, mm_to_m};
use crate::error::{ExportError, LayoutError, Result};
use crate::record::CptRecord;
use crate::soil::{SoilCatalog, SoilType};

/// Undrained shear strength (kPa) given to every solver soil.
pub const UNDRAINED_SHEAR_STRENGTH: f64 = 20.0;

// ---------------------------------------------------------------------------
// Solver soils
// ---------------------------------------------------------------------------

/// Soil family the bearing solver distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SoilFamily {
    Clay,
    Gravel,
    Loam,
    Peat,
    Sand,
}

impl SoilFamily {
    /// Family from the leading word of a (Dutch) soil name.
    pub fn from_name(name: &str) -> std::result::Result<Self, ExportError> {
        let family = match name.split([',', ' ', '-']).next().unwrap_or("") {
            "Klei" => SoilFamily::Clay,
            "Grond" => SoilFamily::Gravel,
            "Leem" => SoilFamily::Loam,
            "Veen" => SoilFamily::Peat,
            "Zand" => SoilFamily::Sand,
            _ => return Err(ExportError::UnknownFamily(name.to_string())),
        };
        Ok(family)
    }
}

/// Material name as the bearing solver accepts it.
pub fn solver_material_name(ui_name: &str) -> String {
    ui_name.replace(" tot ", "-").replace("fijnkorrelig", "fijn")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverSoil {
    pub name: String,
    pub family: SoilFamily,
    pub friction_angle: f64,
    pub unsaturated_weight: f64,
    pub saturated_weight: f64,
    pub undrained_shear_strength: f64,
}

impl SolverSoil {
    pub fn from_soil(soil: &SoilType) -> std::result::Result<Self, ExportError> {
        Ok(SolverSoil {
            name: solver_material_name(&soil.ui_name),
            family: SoilFamily::from_name(&soil.ui_name)?,
            friction_angle: soil.phi,
            unsaturated_weight: soil.gamma_dry,
            saturated_weight: soil.gamma_wet,
            undrained_shear_strength: UNDRAINED_SHEAR_STRENGTH,
        })
    }
}

// ---------------------------------------------------------------------------
// PileProfile – input for the bearing solver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileLayer {
    pub material: String,
    pub top_level: f64,
}

/// One cone reading in solver units: level in metres, `qc` in MPa, `Rf` in
/// percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasuredPoint {
    pub z: f64,
    pub qc: f64,
    pub rf: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PileProfile {
    pub name: String,
    /// RD location of the CPT.
    pub location: (f64, f64),
    pub ground_level: f64,
    /// Top of the first table row.
    pub surface_level: f64,
    pub phreatic_level: f64,
    pub layers: Vec<ProfileLayer>,
    /// Readings strictly below the surface level.
    pub measured_data: Vec<MeasuredPoint>,
    /// Every classifiable soil of the catalog.
    pub soils: Vec<SolverSoil>,
}

impl PileProfile {
    pub fn from_record(record: &CptRecord, catalog: &SoilCatalog) -> Result<Self> {
        let first = record.soil_layout.first().ok_or(ExportError::EmptyTable)?;
        let surface_level = first.top_of_layer;
        let location = record.coordinates()?;
        let layout = record.user_layout(catalog)?;

        let soils = catalog
            .iter()
            .filter(|s| s.rule.is_some())
            .map(|s| SolverSoil::from_soil(s))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let layers = layout
            .to_meters()
            .layers()
            .iter()
            .map(|l| {
                SoilFamily::from_name(&l.soil.ui_name)?;
                Ok(ProfileLayer {
                    material: solver_material_name(&l.soil.ui_name),
                    top_level: l.top_of_layer,
                })
            })
            .collect::<std::result::Result<Vec<_>, ExportError>>()?;

        let surface_mm = m_to_mm(surface_level)?;
        let measured_data = record
            .samples()?
            .into_iter()
            .filter(|s| s.elevation < surface_mm)
            .map(|s| MeasuredPoint {
                z: mm_to_m(s.elevation),
                qc: s.qc,
                rf: s.rf,
            })
            .collect();

        Ok(PileProfile {
            name: record.cpt_name.clone(),
            location,
            ground_level: mm_to_m(record.headers.ground_level_mm()?),
            surface_level,
            phreatic_level: record.ground_water_level,
            layers,
            measured_data,
            soils,
        })
    }
}

// ---------------------------------------------------------------------------
// SoilColumn – input for the structural model
// ---------------------------------------------------------------------------

/// Layer colours and levels for drawing the soil around the foundation.
/// `top_levels` starts with `0` followed by the top of every layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoilColumn {
    pub colors: Vec<SoilColor>,
    pub top_levels: Vec<f64>,
    pub surface_level: f64,
    pub top_elevation: f64,
    pub bottom_elevation: f64,
}

impl SoilColumn {
    pub fn from_record(record: &CptRecord, catalog: &SoilCatalog) -> Result<Self> {
        let first = record.soil_layout.first().ok_or(ExportError::EmptyTable)?;
        let mut colors = Vec::with_capacity(record.soil_layout.len());
        let mut top_levels = vec![0.0];
        for row in &record.soil_layout {
            let soil = catalog
                .get(&row.name)
                .ok_or_else(|| LayoutError::UnknownSoil(row.name.clone()))?;
            colors.push(soil.color);
            top_levels.push(row.top_of_layer);
        }

        let samples = record.samples()?;
        let (top_elevation, bottom_elevation) = match (samples.first(), samples.last()) {
            (Some(top), Some(bottom)) => (mm_to_m(top.elevation), mm_to_m(bottom.elevation)),
            _ => (first.top_of_layer, record.bottom_of_soil_layout_user),
        };

        Ok(SoilColumn {
            colors,
            top_levels,
            surface_level: first.top_of_layer,
            top_elevation,
            bottom_elevation,
        })
    }

    /// Longest pile that still fits inside the sounded interval.
    pub fn maximum_pile_length(&self) -> f64 {
        self.top_elevation - self.bottom_elevation
    }
}

// ---------------------------------------------------------------------------
// Bearing curve
// ---------------------------------------------------------------------------

/// Bearing strength against level, as returned by the bearing solver.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BearingCurve {
    pub depths: Vec<f64>,
    pub strengths: Vec<f64>,
}

impl BearingCurve {
    /// Level whose bearing strength is closest to `reaction`. The first such
    /// level wins on ties.
    pub fn required_pile_tip_level(&self, reaction: f64) -> std::result::Result<f64, ExportError> {
        self.strengths
            .iter()
            .zip(&self.depths)
            .min_by(|(a, _), (b, _)| (*a - reaction).abs().total_cmp(&(*b - reaction).abs()))
            .map(|(_, depth)| *depth)
            .ok_or(ExportError::EmptyCurve)
    }
}
