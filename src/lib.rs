//! Soil-layout classification and layout algebra for cone penetration tests.
//!
//! ```text
//!   GEF file ─▶ data::loader ─▶ data::filter ─▶ classify ─▶ SoilLayout (mm)
//!                                                               │
//!                       export ◀─ CptRecord ◀─ table rows (m) ◀─┘
//! ```

pub mod classify;
pub mod color;
pub mod config;
pub mod convert;
pub mod data;
pub mod error;
pub mod export;
pub mod layout;
pub mod memo;
pub mod record;
pub mod soil;

pub use config::Settings;
pub use convert::{MeterLayer, MeterLayout};
pub use error::{Error, Result};
pub use layout::{SoilLayer, SoilLayout, TableRow};
pub use record::{CptRecord, classify_cpt, classify_cpt_file};
pub use soil::{ClassificationRule, SoilCatalog, SoilType};
