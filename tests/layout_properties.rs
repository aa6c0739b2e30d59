use std::sync::Arc;

use approx::assert_relative_eq;
use proptest::prelude::*;

use rusty_cpt::classify::classify;
use rusty_cpt::convert::{MAX_ABS_MM, m_to_mm, mm_to_m};
use rusty_cpt::data::model::Sample;
use rusty_cpt::error::LayoutError;
use rusty_cpt::{SoilCatalog, SoilLayer, SoilLayout, TableRow};

fn catalog() -> SoilCatalog {
    SoilCatalog::from_json(
        r#"[
        {"name": "unknown", "ui_name": "Unknown", "phi": 0, "gamma_dry": 10, "gamma_wet": 10},
        {"name": "sand", "ui_name": "Sand", "phi": 30, "gamma_dry": 18, "gamma_wet": 20,
         "rule": {"kind": "index_range", "min": null, "max": 2.6}},
        {"name": "clay", "ui_name": "Clay", "phi": 17.5, "gamma_dry": 15, "gamma_wet": 15,
         "rule": {"kind": "index_range", "min": 2.6, "max": null}}
    ]"#,
    )
    .unwrap()
}

fn sample(depth: i64, qc: f64, rf: f64) -> Sample {
    Sample {
        depth,
        elevation: -depth,
        qc,
        rf,
        u2: None,
    }
}

fn layout(catalog: &SoilCatalog, spec: &[(&str, i64, i64)]) -> SoilLayout {
    let layers = spec
        .iter()
        .map(|&(name, top, bottom)| {
            SoilLayer::new(Arc::clone(catalog.get(name).unwrap()), top, bottom)
        })
        .collect();
    SoilLayout::new(layers).unwrap()
}

fn summary(layout: &SoilLayout) -> Vec<(&str, i64, i64)> {
    layout
        .layers()
        .iter()
        .map(|l| (l.soil.ui_name.as_str(), l.top_of_layer, l.bottom_of_layer))
        .collect()
}

#[test]
fn classification_groups_consecutive_samples() {
    let catalog = catalog();
    let samples = [
        sample(0, 10.0, 0.5),
        sample(100, 10.0, 0.5),
        sample(200, 0.5, 4.0),
        sample(300, 0.5, 4.0),
        sample(400, 0.5, 4.0),
    ];
    let layout = classify(&samples, &catalog).unwrap();
    assert_eq!(summary(&layout), vec![("Sand", 0, -200), ("Clay", -200, -500)]);
}

#[test]
fn thin_layer_is_absorbed_by_its_only_neighbour() {
    let catalog = catalog();
    let layout = layout(&catalog, &[("Sand", 0, -50), ("Clay", -50, -1000)]);
    let filtered = layout.filter_on_thickness(100, true);
    assert_eq!(summary(&filtered), vec![("Clay", 0, -1000)]);
}

#[test]
fn table_rows_build_a_layout() {
    let catalog = catalog();
    let rows = vec![
        TableRow { name: "Sand".into(), top_of_layer: 0.0 },
        TableRow { name: "Clay".into(), top_of_layer: -2.0 },
    ];
    let layout = SoilLayout::from_table_rows(&catalog, -5.0, &rows).unwrap();
    assert_eq!(summary(&layout), vec![("Sand", 0, -2000), ("Clay", -2000, -5000)]);
}

#[test]
fn ascending_rows_are_rejected() {
    let catalog = catalog();
    let rows = vec![
        TableRow { name: "Sand".into(), top_of_layer: -2.0 },
        TableRow { name: "Clay".into(), top_of_layer: 0.0 },
    ];
    assert!(matches!(
        SoilLayout::from_table_rows(&catalog, -5.0, &rows),
        Err(LayoutError::NotDescending { index: 1, .. })
    ));
}

#[test]
fn unknown_row_name_is_rejected() {
    let catalog = catalog();
    let rows = vec![TableRow { name: "Gravel".into(), top_of_layer: 0.0 }];
    assert_eq!(
        SoilLayout::from_table_rows(&catalog, -1.0, &rows),
        Err(LayoutError::UnknownSoil("Gravel".into()))
    );
}

#[test]
fn millimetres_survive_a_trip_through_metres() {
    for mm in [-23459_i64, -2001, -1, 0, 1, 450, 999, 1_000_001] {
        assert_eq!(m_to_mm(mm_to_m(mm)).unwrap(), mm);
    }
    assert_relative_eq!(mm_to_m(-1987), -1.987, epsilon = 1e-12);
}

/// Top level plus `(thickness, is_sand)` per layer, stacked downwards.
fn stack() -> impl Strategy<Value = (i64, Vec<(i64, bool)>)> {
    (-2000i64..2000, prop::collection::vec((20i64..800, any::<bool>()), 1..12))
}

fn stacked(catalog: &SoilCatalog, top: i64, parts: &[(i64, bool)]) -> SoilLayout {
    let mut level = top;
    let spec: Vec<(&str, i64, i64)> = parts
        .iter()
        .map(|&(thickness, is_sand)| {
            let name = if is_sand { "Sand" } else { "Clay" };
            let layer = (name, level, level - thickness);
            level -= thickness;
            layer
        })
        .collect();
    layout(catalog, &spec)
}

proptest! {
    #[test]
    fn filter_leaves_no_thin_layers_and_keeps_the_interval(
        (top, parts) in stack(),
        min_thickness in 0i64..600,
        merge in any::<bool>(),
    ) {
        let catalog = catalog();
        let original = stacked(&catalog, top, &parts);
        let filtered = original.filter_on_thickness(min_thickness, merge);

        prop_assert_eq!(filtered.top(), original.top());
        prop_assert_eq!(filtered.bottom(), original.bottom());
        if filtered.len() > 1 {
            prop_assert!(filtered.layers().iter().all(|l| l.thickness() >= min_thickness));
        }
        if merge {
            prop_assert!(filtered.layers().windows(2).all(|w| w[0].soil != w[1].soil));
        }
        prop_assert!(SoilLayout::new(filtered.layers().to_vec()).is_ok());
    }

    #[test]
    fn table_rows_round_trip((top, parts) in stack()) {
        let catalog = catalog();
        let original = stacked(&catalog, top, &parts);
        let rows = original.to_table_rows();
        let back = SoilLayout::from_table_rows(&catalog, mm_to_m(original.bottom()), &rows);
        prop_assert_eq!(back, Ok(original));
    }

    #[test]
    fn dict_form_round_trips((top, parts) in stack()) {
        let catalog = catalog();
        let original = stacked(&catalog, top, &parts);
        prop_assert_eq!(SoilLayout::from_dict(&original.to_dict()), Ok(original));
    }

    #[test]
    fn any_level_in_range_survives_metres(mm in -MAX_ABS_MM..=MAX_ABS_MM) {
        prop_assert_eq!(m_to_mm(mm_to_m(mm)), Ok(mm));
    }
}
