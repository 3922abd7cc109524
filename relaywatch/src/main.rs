//! Thin command-line front-end for the relay scan results store.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod config;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ExportTable {
    Descriptors,
    ScanResults,
}

impl ExportTable {
    fn table_name(self) -> &'static str {
        match self {
            ExportTable::Descriptors => "descriptors",
            ExportTable::ScanResults => "scan_results",
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "relaywatch", version, about = "Relay scan results store")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./relaywatch.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Create the results database and its schema (idempotent)
    Init {
        /// Database path (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Export a table to a Parquet file
    Export {
        /// Database path (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Table to export
        #[arg(long, value_enum)]
        table: ExportTable,
        /// Output file (overwrites)
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref());

    match cli.command {
        Commands::Version => {
            println!("relaywatch {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Init { db } => {
            let path = db_path(db, cfg.as_ref())?;
            relay_store::Db::open_or_create(&path)?;
            println!("schema ready at {}", path.display());
        }
        Commands::Export { db, table, out } => {
            let path = db_path(db, cfg.as_ref())?;
            let store = relay_store::Db::open_or_create(&path)?;
            relay_store::export_table_to_parquet(&store, table.table_name(), &out)?;
            println!("wrote {}", out.display());
        }
    }
    Ok(())
}

fn db_path(flag: Option<PathBuf>, cfg: Option<&config::Config>) -> Result<PathBuf> {
    if let Some(p) = flag {
        return Ok(p);
    }
    if let Some(p) = cfg
        .and_then(|c| c.database.as_ref())
        .and_then(|d| d.path.as_ref())
    {
        return Ok(PathBuf::from(p));
    }
    anyhow::bail!("no database path given: pass --db or set database.path in the config file")
}
