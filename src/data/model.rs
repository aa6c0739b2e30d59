use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::convert::{check_mm, m_to_mm};
use crate::error::InputError;

// ---------------------------------------------------------------------------
// Signal names
// ---------------------------------------------------------------------------

pub const PENETRATION_LENGTH: &str = "penetration_length";
pub const CORRECTED_DEPTH: &str = "corrected_depth";
pub const QC: &str = "qc";
pub const FS: &str = "fs";
pub const RF: &str = "Rf";
pub const U2: &str = "u2";
pub const INCLINATION: &str = "inclination";
pub const INCLINATION_N_S: &str = "inclination_n_s";
pub const INCLINATION_E_W: &str = "inclination_e_w";

/// A level in metres as whole millimetres, or `InvalidLevel` naming the
/// signal it came from.
fn level_mm(signal: &str, value: f64) -> Result<i64, InputError> {
    m_to_mm(value).map_err(|_| InputError::InvalidLevel {
        signal: signal.to_string(),
        value,
    })
}

// ---------------------------------------------------------------------------
// HeightSystem – vertical reference of the ground level
// ---------------------------------------------------------------------------

/// Vertical datum declared by the `#ZID` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeightSystem {
    Nap,
    Taw,
    Dhhn,
    Other(u32),
}

impl HeightSystem {
    pub fn from_code(code: u32) -> Self {
        match code {
            31000 => HeightSystem::Nap,
            32000 => HeightSystem::Taw,
            49000 => HeightSystem::Dhhn,
            other => HeightSystem::Other(other),
        }
    }
}

impl fmt::Display for HeightSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeightSystem::Nap => write!(f, "NAP"),
            HeightSystem::Taw => write!(f, "TAW"),
            HeightSystem::Dhhn => write!(f, "DHHN"),
            HeightSystem::Other(code) => write!(f, "{code}"),
        }
    }
}

// ---------------------------------------------------------------------------
// GefHeaders – the part of the header block the engine cares about
// ---------------------------------------------------------------------------

/// Description of one data column as declared by `#COLUMNINFO`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// 1-based column number in the data block.
    pub number: usize,
    pub unit: String,
    pub description: String,
    /// GEF quantity number (1 = penetration length, 2 = qc, ...).
    pub quantity: u32,
    /// Sentinel written by the probe when no value was recorded.
    pub void: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GefHeaders {
    pub test_id: Option<String>,
    /// RD (x, y) in metres.
    pub x_y_coordinates: Option<(f64, f64)>,
    /// Ground level with respect to the height system, in metres.
    pub ground_level_wrt_reference_m: Option<f64>,
    pub height_system: Option<HeightSystem>,
    pub columns: Vec<ColumnInfo>,
}

impl GefHeaders {
    /// Ground level in millimetres, `0` when the header is absent.
    pub fn ground_level_mm(&self) -> Result<i64, InputError> {
        match self.ground_level_wrt_reference_m {
            Some(level) => level_mm("ground level", level),
            None => Ok(0),
        }
    }
}

// ---------------------------------------------------------------------------
// Sample – one cleaned row
// ---------------------------------------------------------------------------

/// A single depth-indexed measurement ready for classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Millimetres below ground level.
    pub depth: i64,
    /// Millimetres with respect to the height system.
    pub elevation: i64,
    /// Cone resistance in MPa.
    pub qc: f64,
    /// Friction ratio in percent.
    pub rf: f64,
    /// Pore pressure behind the cone in MPa.
    pub u2: Option<f64>,
}

// ---------------------------------------------------------------------------
// MeasurementTable – parallel signal arrays
// ---------------------------------------------------------------------------

/// Parallel arrays keyed by signal name. `None` marks a missing reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurementTable {
    pub signals: BTreeMap<String, Vec<Option<f64>>>,
}

impl MeasurementTable {
    pub fn new(signals: BTreeMap<String, Vec<Option<f64>>>) -> Self {
        MeasurementTable { signals }
    }

    /// Number of rows, or an error when the signals disagree on it.
    pub fn row_count(&self) -> Result<usize, InputError> {
        let mut iter = self.signals.iter();
        let (_, first) = iter.next().ok_or(InputError::NoSignals)?;
        let expected = first.len();
        for (name, values) in iter {
            if values.len() != expected {
                return Err(InputError::LengthMismatch {
                    signal: name.clone(),
                    expected,
                    found: values.len(),
                });
            }
        }
        Ok(expected)
    }

    pub fn signal(&self, name: &str) -> Option<&[Option<f64>]> {
        self.signals.get(name).map(Vec::as_slice)
    }

    fn required(&self, name: &str) -> Result<&[Option<f64>], InputError> {
        self.signal(name)
            .ok_or_else(|| InputError::MissingSignal(name.to_string()))
    }

    /// Convert a cleaned table into depth-ordered samples.
    ///
    /// Depth is taken from `corrected_depth` when the probe recorded it and
    /// from `penetration_length` otherwise. Both are in metres.
    pub fn samples(&self, ground_level_mm: i64) -> Result<Vec<Sample>, InputError> {
        let ground_level_mm = check_mm(ground_level_mm).map_err(|_| InputError::InvalidLevel {
            signal: "ground level".to_string(),
            value: ground_level_mm as f64 / 1000.0,
        })?;
        let rows = self.row_count()?;
        let (depth_name, depth) = match self.signal(CORRECTED_DEPTH) {
            Some(values) => (CORRECTED_DEPTH, values),
            None => (PENETRATION_LENGTH, self.required(PENETRATION_LENGTH)?),
        };
        let qc = self.required(QC)?;
        let rf = self.required(RF)?;
        let u2 = self.signal(U2);

        let value = |name: &str, values: &[Option<f64>], row: usize| {
            values[row].ok_or_else(|| InputError::MissingValue {
                signal: name.to_string(),
                row,
            })
        };

        let mut samples: Vec<Sample> = Vec::with_capacity(rows);
        for row in 0..rows {
            let depth_mm = level_mm(depth_name, value(depth_name, depth, row)?)?;
            if let Some(previous) = samples.last() {
                if depth_mm <= previous.depth {
                    return Err(InputError::NonMonotonicDepth {
                        row,
                        previous: previous.depth,
                        depth: depth_mm,
                    });
                }
            }
            samples.push(Sample {
                depth: depth_mm,
                elevation: ground_level_mm - depth_mm,
                qc: value(QC, qc, row)?,
                rf: value(RF, rf, row)?,
                u2: u2.and_then(|values| values[row]),
            });
        }
        Ok(samples)
    }
}
