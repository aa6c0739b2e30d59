/// Data layer: raw measurement tables, loading, and row filtering.
///
/// Architecture:
/// ```text
///  .gef / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → (GefHeaders, MeasurementTable)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  drop rows with a missing value in any signal
///   └──────────┘
///        │
///        ▼
///   ┌──────────────────┐
///   │ MeasurementTable │  samples() → Vec<Sample>, depth ordered
///   └──────────────────┘
/// ```

pub mod loader;
pub mod model;
pub mod filter;
