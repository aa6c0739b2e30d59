use std::path::{Path, PathBuf};

use approx::assert_relative_eq;

use rusty_cpt::data::loader::{load_file, parse_gef};
use rusty_cpt::data::model::HeightSystem;
use rusty_cpt::error::{Error, ExportError};
use rusty_cpt::export::{PileProfile, SoilColumn};
use rusty_cpt::memo::{AnalysisEngine, Memoized};
use rusty_cpt::{Settings, SoilCatalog, classify_cpt, classify_cpt_file};
use tempfile::TempDir;

/// Sand over clay, sleeve friction only: the friction ratio is derived.
const GEF: &str = "#GEFID= 1, 1, 0
#TESTID= CPT-07
#COLUMNINFO= 1, m, penetration length, 1
#COLUMNINFO= 2, MPa, cone resistance, 2
#COLUMNINFO= 3, MPa, sleeve friction, 3
#COLUMNINFO= 4, -, temperature, 99
#XYID= 31000, 120500.00, 487250.00, 0.01, 0.01
#ZID= 31000, 1.00, 0.01
#EOH=
0.00 10.0 0.080 12
0.10 10.0 0.080 12
0.20 10.0 0.080 12
0.30 10.0 0.080 12
0.40 10.0 0.080 12
0.50 0.6 0.024 12
0.60 0.6 0.024 12
0.70 0.6 0.024 12
0.80 0.6 0.024 12
0.90 0.6 0.024 12
1.00 0.6 0.024 12
";

const SAND: &str = "Zand, zwak siltig tot siltig";
const CLAY: &str = "Klei, zwak siltig tot siltig";

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn gef_file_classifies_into_sand_over_clay() {
    let record =
        classify_cpt_file(GEF, "CPT-07", &SoilCatalog::robertson(), &Settings::default()).unwrap();

    assert_eq!(record.headers.test_id.as_deref(), Some("CPT-07"));
    assert_eq!(record.headers.height_system, Some(HeightSystem::Nap));
    let names: Vec<&str> = record.soil_layout.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec![SAND, CLAY]);
    assert_relative_eq!(record.soil_layout[0].top_of_layer, 1.0);
    assert_relative_eq!(record.soil_layout[1].top_of_layer, 0.5);
    assert_relative_eq!(record.bottom_of_soil_layout_user, -0.1, epsilon = 1e-12);
    assert_relative_eq!(record.ground_water_level, 0.0);
}

#[test]
fn exports_follow_the_user_table() {
    let catalog = SoilCatalog::robertson();
    let record = classify_cpt_file(GEF, "CPT-07", &catalog, &Settings::default()).unwrap();

    let profile = PileProfile::from_record(&record, &catalog).unwrap();
    assert_eq!(profile.location, (120500.0, 487250.0));
    assert_relative_eq!(profile.surface_level, 1.0);
    assert_eq!(profile.layers.len(), 2);
    assert_eq!(profile.layers[0].material, "Zand, zwak siltig-siltig");
    assert_eq!(profile.layers[1].material, "Klei, zwak siltig-siltig");
    // the reading at the surface itself is left out
    assert_eq!(profile.measured_data.len(), 10);
    assert_relative_eq!(profile.measured_data[0].z, 0.9, epsilon = 1e-12);
    assert_relative_eq!(profile.measured_data[0].rf, 0.8, epsilon = 1e-9);
    assert_eq!(profile.soils.len(), 9);

    let column = SoilColumn::from_record(&record, &catalog).unwrap();
    assert_eq!(column.top_levels, vec![0.0, 1.0, 0.5]);
    assert_eq!(column.colors[0], catalog.get(SAND).unwrap().color);
    assert_relative_eq!(column.maximum_pile_length(), 1.0, epsilon = 1e-12);
}

#[test]
fn export_needs_coordinates_and_known_families() {
    let catalog = SoilCatalog::robertson();
    let mut record = classify_cpt_file(GEF, "CPT-07", &catalog, &Settings::default()).unwrap();

    record.soil_layout[1].name = "Onbekend materiaal".into();
    assert!(matches!(
        PileProfile::from_record(&record, &catalog),
        Err(Error::Export(ExportError::UnknownFamily(_)))
    ));

    record.headers.x_y_coordinates = None;
    let err = PileProfile::from_record(&record, &catalog).unwrap_err();
    assert_eq!(err.to_string(), "CPT CPT-07 has no coordinates: please check the GEF file");
}

#[test]
fn loader_dispatches_on_extension() {
    let dir = TempDir::new().unwrap();

    let gef = write_file(dir.path(), "sounding.gef", GEF);
    let raw = load_file(&gef).unwrap();
    assert_eq!(raw, parse_gef(GEF).unwrap());

    let csv = write_file(
        dir.path(),
        "sounding.csv",
        "penetration_length,qc,Rf\n0.0,10.0,0.8\n0.1,,0.8\n0.2,0.6,4.0\n0.3,0.6,4.0\n",
    );
    let raw = load_file(&csv).unwrap();
    let record = classify_cpt(raw, "csv", &SoilCatalog::robertson(), &Settings::default()).unwrap();
    // the row without qc is dropped before classification
    assert_eq!(record.measurement_data.row_count().unwrap(), 3);

    let txt = write_file(dir.path(), "sounding.txt", "");
    assert!(load_file(&txt).is_err());
}

struct Echo;

impl AnalysisEngine for Echo {
    fn run(&self, input: &str) -> anyhow::Result<String> {
        Ok(format!("{{\"length\": {}}}", input.len()))
    }
}

#[test]
fn memoized_engine_replays_profile_results() {
    let catalog = SoilCatalog::robertson();
    let record = classify_cpt_file(GEF, "CPT-07", &catalog, &Settings::default()).unwrap();
    let profile = PileProfile::from_record(&record, &catalog).unwrap();
    let input = serde_json::to_string(&profile).unwrap();

    let engine = Memoized::new(Echo);
    let first = engine.run(&input).unwrap();
    assert_eq!(engine.run(&input).unwrap(), first);
    assert_eq!(engine.len(), 1);
}
