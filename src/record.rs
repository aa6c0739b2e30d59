use serde::{Deserialize, Serialize};

use crate::classify::classify;
use crate::config::Settings;
use crate::convert::{m_to_mm, mm_to_m};
use crate::data::filter::drop_incomplete_rows;
use crate::data::loader::{RawCpt, parse_gef};
use crate::data::model::{GefHeaders, HeightSystem, MeasurementTable, Sample};
use crate::error::{CoordinateError, InputError, LayoutError, Result};
use crate::layout::{SoilLayout, TableRow};
use crate::soil::SoilCatalog;

// ---------------------------------------------------------------------------
// CptRecord – persisted state of one CPT
// ---------------------------------------------------------------------------

/// Everything stored for one CPT.
///
/// `soil_layout_original` is the classification result in full-fidelity
/// dict form and is never rewritten. `soil_layout` and
/// `bottom_of_soil_layout_user` hold the user's current edit in metres. Both
/// can be turned back into a [`SoilLayout`] at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CptRecord {
    pub cpt_name: String,
    pub headers: GefHeaders,
    /// Cleaned measurement signals.
    pub measurement_data: MeasurementTable,
    pub soil_layout_original: serde_json::Value,
    pub soil_layout: Vec<TableRow>,
    /// Metres.
    pub bottom_of_soil_layout_user: f64,
    /// Phreatic level in metres.
    pub ground_water_level: f64,
    pub x_rd: f64,
    pub y_rd: f64,
}

/// Key figures of a CPT, as shown next to its plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CptSummary {
    pub ground_level_wrt_reference_m: Option<f64>,
    pub ground_water_level: f64,
    pub height_system: Option<HeightSystem>,
    pub x_coordinate: f64,
    pub y_coordinate: f64,
}

/// Parse and classify the text of a GEF file.
pub fn classify_cpt_file(
    text: &str,
    name: &str,
    catalog: &SoilCatalog,
    settings: &Settings,
) -> Result<CptRecord> {
    let raw = parse_gef(text)?;
    classify_cpt(raw, name, catalog, settings)
}

/// Clean, classify and filter a freshly loaded CPT.
///
/// The unfiltered classification becomes the original layout; the table
/// rows start out as that layout filtered on
/// `settings.min_layer_thickness` with same-soil neighbours joined.
pub fn classify_cpt(
    raw: RawCpt,
    name: &str,
    catalog: &SoilCatalog,
    settings: &Settings,
) -> Result<CptRecord> {
    let measurements = drop_incomplete_rows(&raw.measurements)?;
    let ground_level_mm = raw.headers.ground_level_mm()?;
    let samples = measurements.samples(ground_level_mm)?;
    let original = classify(&samples, catalog)?;

    let filtered = original.filter_on_thickness(settings.min_layer_thickness, true);
    let ground_level = mm_to_m(ground_level_mm);
    let ground_water_level =
        ((ground_level - settings.default_phreatic_offset) * 100.0).round() / 100.0;
    log::warn!(
        "{name}: no phreatic level recorded, assuming {} m below ground level",
        settings.default_phreatic_offset
    );
    log::info!(
        "{name}: {} samples, {} layers ({} after filtering), phreatic level {ground_water_level} m",
        samples.len(),
        original.len(),
        filtered.len()
    );

    let (x_rd, y_rd) = raw.headers.x_y_coordinates.unwrap_or((0.0, 0.0));
    Ok(CptRecord {
        cpt_name: name.to_string(),
        bottom_of_soil_layout_user: mm_to_m(original.bottom()),
        soil_layout_original: original.to_dict(),
        soil_layout: filtered.to_table_rows(),
        headers: raw.headers,
        measurement_data: measurements,
        ground_water_level,
        x_rd,
        y_rd,
    })
}

impl CptRecord {
    /// The classification result as it was stored.
    pub fn original_layout(&self) -> std::result::Result<SoilLayout, LayoutError> {
        SoilLayout::from_dict(&self.soil_layout_original)
    }

    /// The layout described by the current table rows.
    pub fn user_layout(
        &self,
        catalog: &SoilCatalog,
    ) -> std::result::Result<SoilLayout, LayoutError> {
        SoilLayout::from_table_rows(catalog, self.bottom_of_soil_layout_user, &self.soil_layout)
    }

    pub fn samples(&self) -> std::result::Result<Vec<Sample>, InputError> {
        self.measurement_data.samples(self.headers.ground_level_mm()?)
    }

    /// A copy holding an edited table, validated before it is accepted.
    pub fn with_table(
        &self,
        catalog: &SoilCatalog,
        bottom_of_soil_layout_user: f64,
        rows: Vec<TableRow>,
    ) -> std::result::Result<CptRecord, LayoutError> {
        SoilLayout::from_table_rows(catalog, bottom_of_soil_layout_user, &rows)?;
        Ok(CptRecord {
            soil_layout: rows,
            bottom_of_soil_layout_user,
            ..self.clone()
        })
    }

    /// A copy whose table has every layer thinner than `min_thickness` (mm)
    /// merged away.
    pub fn filter_user_layout(
        &self,
        catalog: &SoilCatalog,
        min_thickness: i64,
    ) -> std::result::Result<CptRecord, LayoutError> {
        let filtered = self
            .user_layout(catalog)?
            .filter_on_thickness(min_thickness, true);
        log::info!(
            "{}: filtered soil layout on {min_thickness} mm, {} -> {} layers",
            self.cpt_name,
            self.soil_layout.len(),
            filtered.len()
        );
        Ok(CptRecord {
            soil_layout: filtered.to_table_rows(),
            ..self.clone()
        })
    }

    /// A copy whose table shows the original, unfiltered classification.
    ///
    /// The user bottom is kept when it still lies below the top of the last
    /// original layer; otherwise the original bottom is restored with it.
    pub fn reset_user_layout(
        &self,
        catalog: &SoilCatalog,
    ) -> std::result::Result<CptRecord, LayoutError> {
        let original = self.original_layout()?;
        let rows = original.to_table_rows();
        let last_top = original.layers()[original.len() - 1].top_of_layer;

        let mut bottom = self.bottom_of_soil_layout_user;
        if !m_to_mm(bottom).is_ok_and(|mm| mm < last_top) {
            bottom = mm_to_m(original.bottom());
            log::warn!(
                "{}: user bottom {} m lies above the last original layer, using {bottom} m",
                self.cpt_name,
                self.bottom_of_soil_layout_user
            );
        }
        SoilLayout::from_table_rows(catalog, bottom, &rows)?;

        log::info!("{}: soil layout reset to the original classification", self.cpt_name);
        Ok(CptRecord {
            soil_layout: rows,
            bottom_of_soil_layout_user: bottom,
            ..self.clone()
        })
    }

    /// RD coordinates as declared in the GEF headers.
    pub fn coordinates(&self) -> std::result::Result<(f64, f64), CoordinateError> {
        self.headers
            .x_y_coordinates
            .ok_or_else(|| CoordinateError {
                cpt_name: self.cpt_name.clone(),
            })
    }

    pub fn summary(&self) -> CptSummary {
        CptSummary {
            ground_level_wrt_reference_m: self.headers.ground_level_wrt_reference_m,
            ground_water_level: self.ground_water_level,
            height_system: self.headers.height_system,
            x_coordinate: self.x_rd,
            y_coordinate: self.y_rd,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::error::Error;

    const GEF: &str = "#GEFID= 1, 1, 0
#TESTID= DKM014
#COLUMNINFO= 1, m, penetration length, 1
#COLUMNINFO= 2, MPa, cone resistance, 2
#COLUMNINFO= 3, %, friction ratio, 4
#COLUMNVOID= 2, -9999
#XYID= 31000, 132000.00, 457000.00, 0.01, 0.01
#ZID= 31000, 0.45, 0.01
#EOH=
0.00 10.0 0.8
0.10 10.5 0.7
0.20 -9999 0.7
0.30 0.6 4.0
0.40 0.5 4.2
0.50 12.0 0.6
0.60 11.0 0.8
0.70 12.5 0.7
";

    fn record() -> CptRecord {
        classify_cpt_file(GEF, "DKM014", &SoilCatalog::robertson(), &Settings::default()).unwrap()
    }

    #[test]
    fn test_classify_builds_both_layouts() {
        let r = record();
        assert_eq!(r.measurement_data.row_count().unwrap(), 7);
        let original = r.original_layout().unwrap();
        // sand 450..150, clay 150..-50, sand -50..-350
        assert_eq!(original.len(), 3);
        assert_eq!(original.top(), 450);
        assert_eq!(original.bottom(), -350);
        assert_relative_eq!(r.bottom_of_soil_layout_user, -0.35, epsilon = 1e-12);
        assert_relative_eq!(r.ground_water_level, -0.55, epsilon = 1e-12);
        assert_eq!((r.x_rd, r.y_rd), (132000.0, 457000.0));

        // 200 mm of clay is not thinner than the default minimum
        let user = r.user_layout(&SoilCatalog::robertson()).unwrap();
        assert_eq!(user, original);
    }

    #[test]
    fn test_filter_then_reset() {
        let catalog = SoilCatalog::robertson();
        let r = record();
        let filtered = r.filter_user_layout(&catalog, 300).unwrap();
        assert_eq!(filtered.soil_layout.len(), 1);
        assert_eq!(filtered.soil_layout_original, r.soil_layout_original);

        let reset = filtered.reset_user_layout(&catalog).unwrap();
        assert_eq!(reset.soil_layout, r.soil_layout);
        assert_eq!(reset.bottom_of_soil_layout_user, filtered.bottom_of_soil_layout_user);
    }

    #[test]
    fn test_with_table_validates_edit() {
        let catalog = SoilCatalog::robertson();
        let r = record();
        let rows = vec![
            TableRow { name: "Zand tot zand, grindig".into(), top_of_layer: -1.0 },
            TableRow { name: "Klei, siltig / leem".into(), top_of_layer: 0.0 },
        ];
        assert!(matches!(
            r.with_table(&catalog, -2.0, rows),
            Err(LayoutError::NotDescending { .. })
        ));
        let rows = vec![TableRow { name: "Klei, siltig / leem".into(), top_of_layer: 0.45 }];
        let edited = r.with_table(&catalog, -2.0, rows).unwrap();
        assert_eq!(edited.user_layout(&catalog).unwrap().bottom(), -2000);
    }

    #[test]
    fn test_reset_restores_bottom_raised_above_original_layers() {
        let catalog = SoilCatalog::robertson();
        let r = record();
        // original rows start at 0.45, 0.15 and -0.05; bottom -0.35
        let rows = vec![TableRow { name: "Klei, siltig / leem".into(), top_of_layer: 0.45 }];
        let edited = r.with_table(&catalog, 0.0, rows).unwrap();

        let reset = edited.reset_user_layout(&catalog).unwrap();
        assert_eq!(reset.soil_layout, r.soil_layout);
        assert_relative_eq!(reset.bottom_of_soil_layout_user, -0.35, epsilon = 1e-12);
        assert_eq!(reset.user_layout(&catalog).unwrap(), r.original_layout().unwrap());

        // a bottom below the original is kept
        let deeper = r
            .with_table(&catalog, -2.0, r.soil_layout.clone())
            .unwrap()
            .reset_user_layout(&catalog)
            .unwrap();
        assert_relative_eq!(deeper.bottom_of_soil_layout_user, -2.0);
        assert_eq!(deeper.user_layout(&catalog).unwrap().bottom(), -2000);
    }

    #[test]
    fn test_coordinates() {
        let mut r = record();
        assert_eq!(r.coordinates().unwrap(), (132000.0, 457000.0));
        r.headers.x_y_coordinates = None;
        let err = r.coordinates().unwrap_err();
        assert_eq!(err.to_string(), "CPT DKM014 has no coordinates: please check the GEF file");
    }

    #[test]
    fn test_unparseable_file_is_input_error() {
        let catalog = SoilCatalog::robertson();
        let err = classify_cpt_file("no headers", "x", &catalog, &Settings::default()).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn test_record_json_round_trip() {
        let r = record();
        let text = serde_json::to_string(&r).unwrap();
        let back: CptRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back.original_layout().unwrap(), r.original_layout().unwrap());
        assert_eq!(back.summary(), r.summary());
    }
}
