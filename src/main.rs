use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use rusty_cpt::data::loader::load_file;
use rusty_cpt::export::{PileProfile, SoilColumn};
use rusty_cpt::{CptRecord, Settings, SoilCatalog, classify_cpt};

// ============================================================================
// CLI DEFINITION
// ============================================================================

#[derive(Parser)]
#[command(name = "rusty-cpt", version, about = "CPT soil layout classification")]
struct Cli {
    /// JSON settings file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimum layer thickness in mm, overriding the settings file.
    #[arg(long, global = true)]
    min_thickness: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a raw CPT file (.gef, .json or .csv) into a new record.
    Classify {
        file: PathBuf,

        /// CPT name, defaults to the file stem.
        #[arg(long)]
        name: Option<String>,

        /// Where to write the record; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Merge away layers thinner than the minimum thickness.
    Filter {
        record: PathBuf,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Restore the table to the original classification.
    Reset {
        record: PathBuf,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the editable soil layout table of a record.
    Table { record: PathBuf },

    /// Print the solver input built from a record.
    Export {
        record: PathBuf,

        #[arg(long, value_enum, default_value_t = ExportKind::Pile)]
        kind: ExportKind,
    },

    /// List the soil catalog in classification order.
    Catalog,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportKind {
    Pile,
    Column,
}

// ============================================================================
// RECORD I/O
// ============================================================================

fn read_record(path: &Path) -> Result<CptRecord> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading record {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing record {}", path.display()))
}

fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            log::info!("wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn print_table(record: &CptRecord) {
    println!("{}", record.cpt_name);
    println!("{:>10}  {}", "top [m]", "soil");
    for row in &record.soil_layout {
        println!("{:>10.3}  {}", row.top_of_layer, row.name);
    }
    println!("{:>10.3}  (bottom)", record.bottom_of_soil_layout_user);
}

fn print_catalog(catalog: &SoilCatalog) {
    for soil in catalog.iter() {
        let rule = match &soil.rule {
            Some(rule) => format!("{rule:?}"),
            None => "fallback".to_string(),
        };
        println!("{}  {:<34} {}", soil.color.hex(), soil.ui_name, rule);
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(min) = cli.min_thickness {
        settings.min_layer_thickness = min;
    }
    let catalog = settings.catalog()?;

    match cli.command {
        Commands::Classify { file, name, out } => {
            let name = match name {
                Some(name) => name,
                None => file
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("cpt")
                    .to_string(),
            };
            let raw = load_file(&file).with_context(|| format!("loading {}", file.display()))?;
            let record = classify_cpt(raw, &name, &catalog, &settings)?;
            write_json(&record, out.as_deref())?;
        }
        Commands::Filter { record, out } => {
            let filtered = read_record(&record)?
                .filter_user_layout(&catalog, settings.min_layer_thickness)?;
            write_json(&filtered, out.as_deref())?;
        }
        Commands::Reset { record, out } => {
            let reset = read_record(&record)?.reset_user_layout(&catalog)?;
            write_json(&reset, out.as_deref())?;
        }
        Commands::Table { record } => print_table(&read_record(&record)?),
        Commands::Export { record, kind } => {
            let record = read_record(&record)?;
            match kind {
                ExportKind::Pile => {
                    write_json(&PileProfile::from_record(&record, &catalog)?, None)?
                }
                ExportKind::Column => {
                    write_json(&SoilColumn::from_record(&record, &catalog)?, None)?
                }
            }
        }
        Commands::Catalog => print_catalog(&catalog),
    }
    Ok(())
}
