// Warehouse CLI entry point.
//
// `hoopvault import` runs the full ingestion pipeline against the
// configured CSV directory; `hoopvault wipe --confirm` deletes every
// imported row. Logs go to stderr so the stdout report stays clean.

use hoopvault::config;
use hoopvault::db::Warehouse;
use hoopvault::import;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "hoopvault", about = "NBA statistics warehouse importer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import all configured CSV sources into the warehouse.
    Import,
    /// Delete every imported row, fact tables first.
    Wipe {
        /// Required; without it the command is a no-op.
        #[arg(long)]
        confirm: bool,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        csv_dir = %config.import.csv_dir.display(),
        db_path = %config.import.db_path,
        batch_size = config.import.batch_size,
        "configuration loaded"
    );

    let db = Warehouse::open(&config.import.db_path).context("failed to open database")?;

    match cli.command {
        Command::Import => {
            let importer = import::Importer::new(&db, &config);
            let report = importer.run().context("import run failed")?;
            report.print();
            if !report.clean() {
                std::process::exit(1);
            }
        }
        Command::Wipe { confirm } => {
            import::wipe(&db, confirm)?;
        }
    }

    Ok(())
}

/// Initialize tracing to stderr, filtered by RUST_LOG when set.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hoopvault=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
