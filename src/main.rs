//! Pricepipe CLI - price list import/export pipeline

use clap::{Parser, Subcommand};
use indicatif::HumanBytes;
use std::path::PathBuf;
use std::time::Instant;
use pricepipe::config::{self, PricepipeConfig};
use pricepipe::ui::{self, Icons, Spinner};
use pricepipe::{ImportResult, PriceService};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pricepipe")]
#[command(version)]
#[command(about = "Price list import/export pipeline")]
#[command(long_about = r#"
Pricepipe loads price lists shipped as zip or tar(.gz) archives into a
SQLite store and exports the stored rows back as a zip archive.

Example usage:
  pricepipe serve --port 8080
  pricepipe import --file prices.tar.gz --type tar
  pricepipe export --out prices.zip
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,
    },

    /// Import a price archive into the store
    Import {
        /// Archive to import
        #[arg(short, long)]
        file: PathBuf,

        /// Archive type: zip or tar (tar may be gzip-compressed)
        #[arg(short = 't', long = "type", default_value = "zip")]
        archive_type: String,
    },

    /// Export the stored prices as a zip archive
    Export {
        /// Output path
        #[arg(short, long, default_value = "prices.zip")]
        out: PathBuf,
    },

    /// Show store-wide totals
    Stats,

    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match &cli.command {
        Commands::Init { force } => {
            let path = cli.config.clone().unwrap_or_else(config::default_config_path);
            config::write_config(&path, &PricepipeConfig::default(), *force)?;
            ui::success(&format!("Wrote {}", path.display()));
        }

        Commands::Serve { port, host } => {
            let mut cfg = resolve(&cli)?;
            if let Some(port) = *port {
                cfg.port = port;
            }
            if let Some(host) = host {
                cfg.host = host.clone();
            }

            ui::header("Starting price server");
            ui::status(Icons::DATABASE, "Database", &cfg.database);
            ui::status(Icons::GLOBE, "Address", &cfg.bind_addr());

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(pricepipe::server::start_server(&cfg))?;
        }

        Commands::Import { file, archive_type } => {
            let cfg = resolve(&cli)?;
            let service = PriceService::from_config(&cfg);
            tracing::info!("Importing {} ({}) into {}", file.display(), archive_type, cfg.database);
            let started = Instant::now();
            let raw = std::fs::read(file)?;

            let spinner = Spinner::new(&format!("Importing {}", file.display()));
            let totals = match service.import(archive_type, &raw) {
                Ok(totals) => totals,
                Err(e) => {
                    spinner.finish_with_message("Import failed");
                    ui::error(&e.to_string());
                    return Err(e.into());
                }
            };
            spinner.finish_with_message("Import complete");

            print_totals(&totals);
            ui::timing(&format!("{:.2?}", started.elapsed()));
        }

        Commands::Export { out } => {
            let service = PriceService::from_config(&resolve(&cli)?);
            let archive = service.export()?;
            std::fs::write(out, &archive)?;
            ui::success(&format!(
                "Exported {} to {}",
                HumanBytes(archive.len() as u64),
                out.display()
            ));
        }

        Commands::Stats => {
            let cfg = resolve(&cli)?;
            let totals = PriceService::from_config(&cfg).totals()?;
            ui::section(&format!("Price store ({})", cfg.database));
            print_totals(&totals);
        }
    }

    Ok(())
}

/// Config file and environment, with `--database` applied on top.
fn resolve(cli: &Cli) -> anyhow::Result<PricepipeConfig> {
    let mut cfg = config::resolve_config(cli.config.as_deref())?;
    if let Some(db) = &cli.database {
        cfg.database = db.to_string_lossy().into_owned();
    }
    config::ensure_db_dir(&cfg.database_path())?;
    Ok(cfg)
}

fn print_totals(totals: &ImportResult) {
    println!("{}", ui::totals_table(totals));
}
