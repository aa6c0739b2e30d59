use thiserror::Error;

// ---------------------------------------------------------------------------
// Error kinds
// ---------------------------------------------------------------------------

/// Malformed or missing raw measurement data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    #[error("measurement data contains no signals")]
    NoSignals,
    #[error("signal '{signal}' has {found} rows, expected {expected}")]
    LengthMismatch {
        signal: String,
        expected: usize,
        found: usize,
    },
    #[error("required signal '{0}' is missing")]
    MissingSignal(String),
    #[error("signal '{signal}' has no value at row {row}")]
    MissingValue { signal: String, row: usize },
    #[error("depth is not increasing at row {row} ({previous} mm -> {depth} mm)")]
    NonMonotonicDepth { row: usize, previous: i64, depth: i64 },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("{signal} value {value} m is not a usable level")]
    InvalidLevel { signal: String, value: f64 },
    #[error("file has no headers")]
    NoHeaders,
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),
}

/// A sample set could not be mapped onto the soil catalog.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassificationError {
    #[error("no samples left to classify")]
    NoSamples,
    #[error("no soil type matches qc = {qc} MPa, Rf = {rf} % at depth {depth} mm")]
    NoMatchingSoil { depth: i64, qc: f64, rf: f64 },
    #[error("sample {index} is not below the previous one ({previous} mm -> {depth} mm)")]
    UnorderedSamples { index: usize, previous: i64, depth: i64 },
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// A layer sequence violates the ordering or contiguity invariants.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("a soil layout needs at least one layer")]
    Empty,
    #[error("layer {index} is not below the previous layer (top {top}, previous top {previous})")]
    NotDescending { index: usize, top: f64, previous: f64 },
    #[error("layer {index} has non-positive thickness (top {top}, bottom {bottom})")]
    NonPositiveThickness { index: usize, top: f64, bottom: f64 },
    #[error("gap or overlap between layer {index} and the one above it ({above} vs {top})")]
    NotContiguous { index: usize, above: f64, top: f64 },
    #[error("{0} is not available in the selected classification table")]
    UnknownSoil(String),
    #[error("depth value {0} is not a finite number")]
    NonFinite(f64),
    #[error("depth value {0} lies outside the supported range")]
    OutOfRange(f64),
    #[error("invalid layout document: {0}")]
    Document(String),
}

/// Coordinate-dependent features were requested for a CPT without coordinates.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("CPT {cpt_name} has no coordinates: please check the GEF file")]
pub struct CoordinateError {
    pub cpt_name: String,
}

/// The finalized layout cannot be expressed in a solver's terms.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExportError {
    #[error("unidentifiable soil type '{0}' included in CPT")]
    UnknownFamily(String),
    #[error("soil layout table is empty")]
    EmptyTable,
    #[error("bearing curve is empty")]
    EmptyCurve,
}

// ---------------------------------------------------------------------------
// Crate error
// ---------------------------------------------------------------------------

/// Tagged union of every error kind so callers can tell recoverable input
/// problems apart from invariant violations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("CPT parsing: {0}")]
    Input(#[from] InputError),
    #[error("CPT classification: {0}")]
    Classification(#[from] ClassificationError),
    #[error("soil layout: {0}")]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Coordinate(#[from] CoordinateError),
    #[error("export: {0}")]
    Export(#[from] ExportError),
}

pub type Result<T> = std::result::Result<T, Error>;
