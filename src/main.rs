use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::BufReader;
use tracing::{error, info};

use catalog_matcher_lib::application::{ReviewServices, ReviewSession};
use catalog_matcher_lib::commands::Console;
use catalog_matcher_lib::domain::{ColumnSelection, SourceTable};
use catalog_matcher_lib::infrastructure::config::AppConfig;
use catalog_matcher_lib::infrastructure::errors::TableError;
use catalog_matcher_lib::infrastructure::logging::{init_logging_with_config, log_system_info};
use catalog_matcher_lib::infrastructure::table_io::load_table;

#[derive(Parser)]
#[command(name = "catalog-matcher")]
#[command(about = "Review product images side by side and mark matches", long_about = None)]
struct Cli {
    /// Optional TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the columns of a CSV file
    Columns {
        /// Input CSV (comma or semicolon separated)
        csv: PathBuf,
    },
    /// Open an interactive review session
    Review {
        /// Input CSV (comma or semicolon separated)
        csv: PathBuf,
        /// Column holding the primary product page URL
        #[arg(long)]
        primary_url_col: String,
        /// Column holding the secondary image URL
        #[arg(long)]
        secondary_image_col: String,
        /// Column holding a direct primary image URL
        #[arg(long)]
        primary_image_col: Option<String>,
        /// Extra columns shown next to each row (repeatable)
        #[arg(long = "detail-col")]
        detail_cols: Vec<String>,
        /// Rows per page: 10, 20, 50 or 100
        #[arg(long)]
        page_size: Option<usize>,
        /// Pause after each row in milliseconds, 0-500
        #[arg(long)]
        pacing_ms: Option<u64>,
        /// Directory for image previews
        #[arg(long)]
        preview_dir: Option<PathBuf>,
        /// Default export path
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging_with_config(&config.logging).context("Failed to initialize logging")?;
    log_system_info();

    match cli.command {
        Commands::Columns { csv } => columns(&csv),
        Commands::Review {
            csv,
            primary_url_col,
            secondary_image_col,
            primary_image_col,
            detail_cols,
            page_size,
            pacing_ms,
            preview_dir,
            output,
        } => {
            let selection = ColumnSelection::new(primary_url_col, secondary_image_col)
                .with_primary_image(primary_image_col)
                .with_details(detail_cols);
            review(
                &config,
                &csv,
                selection,
                page_size,
                pacing_ms,
                preview_dir,
                output,
            )
            .await
        }
    }
}

fn load(csv: &Path) -> Result<SourceTable> {
    load_table(csv).map_err(|e| {
        if let TableError::UnparseableTable { .. } = e {
            error!("❌ Input table rejected: {}", e);
        }
        anyhow::Error::new(e).context(format!("Cannot read {}", csv.display()))
    })
}

fn columns(csv: &Path) -> Result<()> {
    let table = load(csv)?;
    println!("{} rows, {} columns", table.row_count(), table.column_count());
    for (index, header) in table.headers().iter().enumerate() {
        println!("{index:>3}  {header}");
    }
    Ok(())
}

async fn review(
    config: &AppConfig,
    csv: &Path,
    selection: ColumnSelection,
    page_size: Option<usize>,
    pacing_ms: Option<u64>,
    preview_dir: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let table = load(csv)?;
    let services = ReviewServices::from_config(config).context("Failed to build network client")?;
    let session = ReviewSession::new(
        table,
        selection,
        services,
        page_size.unwrap_or(config.review.page_size),
        pacing_ms.unwrap_or(config.review.pacing_ms),
    )?;

    info!("🚀 Review session ready ({} rows)", session.session().table().row_count());

    let mut console = Console::new(
        session,
        preview_dir.unwrap_or_else(|| config.review.preview_dir.clone()),
        output.unwrap_or_else(|| PathBuf::from(&config.review.output_file)),
        tokio::io::stdout(),
    );
    console.run(BufReader::new(tokio::io::stdin())).await
}
