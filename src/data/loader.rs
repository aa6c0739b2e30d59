use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};

use super::model::{
    self, ColumnInfo, GefHeaders, HeightSystem, MeasurementTable,
};
use crate::error::InputError;

/// Headers and measurement columns of one CPT, before any cleaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCpt {
    pub headers: GefHeaders,
    pub measurements: MeasurementTable,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a raw CPT from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.gef`  – GEF-CPT text file (ISO-8859-1)
/// * `.json` – `{ "qc": [...], "Rf": [...], ... }` with `null` for gaps
/// * `.csv`  – one column per signal, empty cells are gaps
pub fn load_file(path: &Path) -> Result<RawCpt> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "gef" => {
            let bytes = std::fs::read(path).context("reading GEF file")?;
            Ok(parse_gef(&decode_latin1(&bytes))?)
        }
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!(InputError::UnsupportedFormat(other.to_string())),
    }
}

/// ISO-8859-1 maps every byte onto the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// GEF parser
// ---------------------------------------------------------------------------

/// Signal name for a GEF-CPT quantity number, if the engine uses it.
fn signal_for_quantity(quantity: u32) -> Option<&'static str> {
    match quantity {
        1 => Some(model::PENETRATION_LENGTH),
        2 => Some(model::QC),
        3 => Some(model::FS),
        4 => Some(model::RF),
        6 => Some(model::U2),
        8 => Some(model::INCLINATION),
        9 => Some(model::INCLINATION_N_S),
        10 => Some(model::INCLINATION_E_W),
        11 => Some(model::CORRECTED_DEPTH),
        _ => None,
    }
}

fn parse_err(line: usize, message: impl Into<String>) -> InputError {
    InputError::Parse {
        line,
        message: message.into(),
    }
}

fn header_fields(value: &str) -> Vec<&str> {
    value.split(',').map(str::trim).collect()
}

fn header_number<T: std::str::FromStr>(
    fields: &[&str],
    idx: usize,
    line: usize,
    key: &str,
) -> Result<T, InputError> {
    fields
        .get(idx)
        .and_then(|f| f.parse::<T>().ok())
        .ok_or_else(|| parse_err(line, format!("#{key} field {} is not a number", idx + 1)))
}

/// Parse the text of a GEF-CPT file.
///
/// ```text
/// #GEFID= 1, 1, 0
/// #COLUMN= 3
/// #COLUMNINFO= 1, m, penetration length, 1
/// #COLUMNINFO= 2, MPa, cone resistance, 2
/// #COLUMNINFO= 3, %, friction ratio, 4
/// #COLUMNVOID= 2, -9999
/// #ZID= 31000, 1.25, 0.01
/// #EOH=
/// 0.00 1.20 0.8
/// 0.02 -9999 0.9
/// ```
pub fn parse_gef(text: &str) -> Result<RawCpt, InputError> {
    let mut headers = GefHeaders::default();
    let mut voids: BTreeMap<usize, f64> = BTreeMap::new();
    let mut column_separator: Option<String> = None;
    let mut record_separator: Option<String> = None;
    let mut data_start = None;
    let lines: Vec<&str> = text.lines().collect();

    for (idx, raw) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let Some(rest) = line.strip_prefix('#') else {
            return Err(parse_err(line_no, "data before #EOH="));
        };
        let (key, value) = rest.split_once('=').unwrap_or((rest, ""));
        let key = key.trim().to_ascii_uppercase();
        let value = value.trim();
        let fields = header_fields(value);

        match key.as_str() {
            "EOH" => {
                data_start = Some(idx + 1);
                break;
            }
            "TESTID" => headers.test_id = Some(value.to_string()),
            "COLUMNINFO" => {
                let number: usize = header_number(&fields, 0, line_no, &key)?;
                if number == 0 {
                    return Err(parse_err(line_no, "column numbers start at 1"));
                }
                let quantity: u32 = header_number(&fields, 3, line_no, &key)?;
                headers.columns.push(ColumnInfo {
                    number,
                    unit: fields.get(1).unwrap_or(&"").to_string(),
                    description: fields.get(2).unwrap_or(&"").to_string(),
                    quantity,
                    void: None,
                });
            }
            "COLUMNVOID" => {
                let number: usize = header_number(&fields, 0, line_no, &key)?;
                let void: f64 = header_number(&fields, 1, line_no, &key)?;
                voids.insert(number, void);
            }
            "COLUMNSEPARATOR" => column_separator = Some(value.to_string()),
            "RECORDSEPARATOR" => record_separator = Some(value.to_string()),
            "XYID" => {
                let x: f64 = header_number(&fields, 1, line_no, &key)?;
                let y: f64 = header_number(&fields, 2, line_no, &key)?;
                headers.x_y_coordinates = Some((x, y));
            }
            "ZID" => {
                let code: u32 = header_number(&fields, 0, line_no, &key)?;
                let level: f64 = header_number(&fields, 1, line_no, &key)?;
                headers.height_system = Some(HeightSystem::from_code(code));
                headers.ground_level_wrt_reference_m = Some(level);
            }
            _ => {}
        }
    }

    let data_start = data_start.ok_or(InputError::NoHeaders)?;
    for column in &mut headers.columns {
        column.void = voids.get(&column.number).copied();
    }

    // Column number → signal name for the columns we keep.
    let mut wanted: Vec<(usize, &'static str, Option<f64>)> = Vec::new();
    for column in &headers.columns {
        match signal_for_quantity(column.quantity) {
            Some(name) if !wanted.iter().any(|(_, n, _)| *n == name) => {
                wanted.push((column.number, name, column.void));
            }
            Some(_) => {}
            None => log::warn!(
                "ignoring GEF column {} ({}, quantity {})",
                column.number,
                column.description,
                column.quantity
            ),
        }
    }
    if !wanted.iter().any(|(_, n, _)| *n == model::PENETRATION_LENGTH) {
        return Err(InputError::MissingSignal(model::PENETRATION_LENGTH.into()));
    }

    let mut signals: BTreeMap<String, Vec<Option<f64>>> = wanted
        .iter()
        .map(|(_, name, _)| (name.to_string(), Vec::new()))
        .collect();

    for (idx, raw) in lines.iter().enumerate().skip(data_start) {
        let line_no = idx + 1;
        let mut line = raw.trim();
        if let Some(sep) = record_separator.as_deref() {
            line = line.trim_end_matches(sep).trim();
        }
        if line.is_empty() {
            continue;
        }
        let cells: Vec<&str> = match column_separator.as_deref() {
            Some(sep) if !sep.is_empty() => line.split(sep).map(str::trim).collect(),
            _ => line.split_whitespace().collect(),
        };
        for (number, name, void) in &wanted {
            let cell = cells
                .get(number - 1)
                .ok_or_else(|| parse_err(line_no, format!("missing column {number}")))?;
            let value: f64 = cell
                .parse()
                .map_err(|_| parse_err(line_no, format!("'{cell}' is not a number")))?;
            let value = match void {
                Some(v) if (value - v).abs() < 1e-9 => None,
                _ => Some(value),
            };
            if let Some(values) = signals.get_mut(*name) {
                values.push(value);
            }
        }
    }

    derive_friction_ratio(&mut signals);
    if !signals.contains_key(model::QC) {
        return Err(InputError::MissingSignal(model::QC.into()));
    }
    if !signals.contains_key(model::RF) {
        return Err(InputError::MissingSignal(model::RF.into()));
    }

    Ok(RawCpt {
        headers,
        measurements: MeasurementTable::new(signals),
    })
}

/// Many probes log sleeve friction but no ratio; derive `Rf = fs / qc` in
/// percent when that is the case.
fn derive_friction_ratio(signals: &mut BTreeMap<String, Vec<Option<f64>>>) {
    if signals.contains_key(model::RF) {
        return;
    }
    let (Some(qc), Some(fs)) = (signals.get(model::QC), signals.get(model::FS)) else {
        return;
    };
    let rf: Vec<Option<f64>> = qc
        .iter()
        .zip(fs)
        .map(|(qc, fs)| match (qc, fs) {
            (Some(qc), Some(fs)) if *qc > 0.0 => Some(fs / qc * 100.0),
            _ => None,
        })
        .collect();
    log::info!("friction ratio derived from sleeve friction");
    signals.insert(model::RF.to_string(), rf);
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (column-oriented):
///
/// ```json
/// { "penetration_length": [0.0, 0.02], "qc": [1.2, null], "Rf": [0.8, 0.9] }
/// ```
fn load_json(path: &Path) -> Result<RawCpt> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let signals: BTreeMap<String, Vec<Option<f64>>> =
        serde_json::from_str(&text).context("parsing JSON measurement data")?;
    let measurements = MeasurementTable::new(signals);
    measurements.row_count()?;
    Ok(RawCpt {
        headers: GefHeaders::default(),
        measurements,
    })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with signal names, one row per depth step.
fn load_csv(path: &Path) -> Result<RawCpt> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); headers.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for (col_idx, column) in columns.iter_mut().enumerate() {
            let cell = record.get(col_idx).unwrap_or("").trim();
            let value = if cell.is_empty() {
                None
            } else {
                Some(cell.parse::<f64>().with_context(|| {
                    format!("Row {row_no}, {}: '{cell}' is not a number", headers[col_idx])
                })?)
            };
            column.push(value);
        }
    }

    Ok(RawCpt {
        headers: GefHeaders::default(),
        measurements: MeasurementTable::new(headers.into_iter().zip(columns).collect()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEF: &str = "#GEFID= 1, 1, 0
#TESTID= DKM014
#COLUMN= 4
#COLUMNINFO= 1, m, penetration length, 1
#COLUMNINFO= 2, MPa, cone resistance, 2
#COLUMNINFO= 3, %, friction ratio, 4
#COLUMNINFO= 4, -, time, 12
#COLUMNVOID= 2, -9999.0
#COLUMNSEPARATOR= ;
#RECORDSEPARATOR= !
#XYID= 31000, 132000.00, 457000.50, 0.01, 0.01
#ZID= 31000, 1.25, 0.01
#EOH=
0.00;1.20;0.80;0!
0.02;-9999.0;0.90;1!
0.04;2.50;1.10;2!
";

    #[test]
    fn test_parse_headers() {
        let raw = parse_gef(GEF).unwrap();
        assert_eq!(raw.headers.test_id.as_deref(), Some("DKM014"));
        assert_eq!(raw.headers.x_y_coordinates, Some((132000.0, 457000.5)));
        assert_eq!(raw.headers.height_system, Some(HeightSystem::Nap));
        assert_eq!(raw.headers.ground_level_mm().unwrap(), 1250);
        assert_eq!(raw.headers.columns.len(), 4);
        assert_eq!(raw.headers.columns[1].void, Some(-9999.0));
    }

    #[test]
    fn test_void_becomes_missing_and_unknown_columns_skipped() {
        let raw = parse_gef(GEF).unwrap();
        let qc = raw.measurements.signal(model::QC).unwrap();
        assert_eq!(qc, &[Some(1.2), None, Some(2.5)]);
        assert_eq!(raw.measurements.signals.len(), 3);
    }

    #[test]
    fn test_whitespace_separated_rows() {
        let text = "#COLUMNINFO= 1, m, length, 1\n#COLUMNINFO= 2, MPa, qc, 2\n\
                    #COLUMNINFO= 3, MPa, fs, 3\n#EOH=\n0.0  2.0  0.02\n0.1  4.0  0.08\n";
        let raw = parse_gef(text).unwrap();
        let rf = raw.measurements.signal(model::RF).unwrap();
        assert!((rf[0].unwrap() - 1.0).abs() < 1e-9);
        assert!((rf[1].unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_end_of_header() {
        let text = "#COLUMNINFO= 1, m, length, 1\n";
        assert_eq!(parse_gef(text), Err(InputError::NoHeaders));
    }

    #[test]
    fn test_non_numeric_cell() {
        let text = "#COLUMNINFO= 1, m, length, 1\n#COLUMNINFO= 2, MPa, qc, 2\n\
                    #COLUMNINFO= 3, %, rf, 4\n#EOH=\n0.0 abc 1.0\n";
        assert!(matches!(
            parse_gef(text),
            Err(InputError::Parse { line: 5, .. })
        ));
    }

    #[test]
    fn test_missing_penetration_length() {
        let text = "#COLUMNINFO= 1, MPa, qc, 2\n#EOH=\n";
        assert_eq!(
            parse_gef(text),
            Err(InputError::MissingSignal(model::PENETRATION_LENGTH.into()))
        );
    }

    #[test]
    fn test_latin1_decoding() {
        assert_eq!(decode_latin1(&[0x23, 0xE9]), "#é");
    }
}
