use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ranking_sync::config::{DashboardArgs, ReportArgs, SheetsArgs};
use ranking_sync::pipeline::{self, Phases};
use ranking_sync::report::{
    ColumnLayout, find_latest_report, rows_to_json, serialize_to_json, write_json_to_file,
    write_xlsx,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download the ranking report, clean it and append it to the sheet
    Run {
        /// Use the newest report already in the downloads folder
        #[arg(long)]
        skip_download: bool,

        /// Stop after cleaning the report
        #[arg(long)]
        skip_upload: bool,

        #[command(flatten)]
        dashboard: DashboardArgs,

        #[command(flatten)]
        report: ReportArgs,

        #[command(flatten)]
        sheets: SheetsArgs,
    },

    /// Only download the ranking report
    Download {
        #[command(flatten)]
        dashboard: DashboardArgs,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Clean a report and write the result locally
    Clean {
        /// Report file [default: the newest report in the downloads folder]
        file: Option<PathBuf>,

        /// Write the cleaned rows to this .xlsx file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the cleaned rows as JSON (to stdout, or next to --output)
        #[arg(long, short = 'j')]
        json: bool,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Append a report to the sheet
    Upload {
        /// Report file [default: the newest report in the downloads folder]
        file: Option<PathBuf>,

        #[command(flatten)]
        report: ReportArgs,

        #[command(flatten)]
        sheets: SheetsArgs,
    },

    /// Check the Google credentials and the sheet URL
    Verify {
        #[command(flatten)]
        sheets: SheetsArgs,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "ranking_sync=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn report_file(file: Option<PathBuf>, report: &ReportArgs) -> Result<PathBuf> {
    match file {
        Some(file) => Ok(file),
        None => find_latest_report(&report.downloads_dir()?, &report.needle),
    }
}

fn clean(file: &Path, output: Option<&Path>, json: bool, first_row: usize) -> Result<()> {
    let layout = ColumnLayout::ranking();
    let prepared = pipeline::prepare(file, first_row, &layout)?;

    // Save the cleaned workbook
    if let Some(output) = output {
        write_xlsx(&prepared.rows, &layout, &prepared.report.sheet_name, output)?;
        info!(file = %output.display(), "cleaned workbook written");
    }

    // Export to JSON
    if json {
        let objects = rows_to_json(&prepared.rows, prepared.report.first_row);
        match output {
            Some(output) => {
                let path = output.with_extension("json");
                write_json_to_file(&objects, &path)?;
                info!(file = %path.display(), "cleaned rows written as JSON");
            }
            None => println!("{}", serialize_to_json(&objects)?),
        }
    }

    if output.is_none() && !json {
        info!(
            rows = prepared.rows.len(),
            cells_changed = prepared.summary.cells_changed,
            "report cleaned; use --output or --json to keep the result"
        );
    }

    Ok(())
}

async fn execute(command: Command) -> Result<()> {
    match command {
        Command::Run {
            skip_download,
            skip_upload,
            dashboard,
            report,
            sheets,
        } => {
            // Settings only for the phases that run
            let report = report.settings()?;
            let dashboard = if skip_download {
                None
            } else {
                Some(dashboard.settings(report.downloads_dir.clone())?)
            };
            let sheets = if skip_upload {
                None
            } else {
                Some(sheets.settings()?)
            };

            let phases = Phases {
                download: !skip_download,
                upload: !skip_upload,
            };
            let outcome =
                pipeline::run(dashboard.as_ref(), &report, sheets.as_ref(), phases).await?;

            // Print summary
            info!(
                file = %outcome.report.display(),
                rows = outcome.rows,
                "run finished"
            );
            if let Some(appended) = outcome.appended {
                if !appended.formatted {
                    info!("rows were appended without number formats");
                }
                println!(
                    "{} rows appended to '{}' ({})",
                    appended.rows, appended.sheet, appended.range
                );
            }
        }

        Command::Download { dashboard, report } => {
            let report = report.settings()?;
            let dashboard = dashboard.settings(report.downloads_dir.clone())?;
            let path = pipeline::fetch_report(&dashboard, &report).await?;
            println!("{}", path.display());
        }

        Command::Clean {
            file,
            output,
            json,
            report,
        } => {
            let file = report_file(file, &report)?;
            clean(&file, output.as_deref(), json, report.first_row)?;
        }

        Command::Upload {
            file,
            report,
            sheets,
        } => {
            // Resolve the file, clean it, then append
            let file = report_file(file, &report)?;
            let settings = sheets.settings()?;
            let layout = ColumnLayout::ranking();
            let prepared = pipeline::prepare(&file, report.first_row, &layout)?;
            let appended = pipeline::upload(&settings, &prepared.rows, &layout).await?;
            println!(
                "{} rows appended to '{}' ({})",
                appended.rows, appended.sheet, appended.range
            );
        }

        Command::Verify { sheets } => {
            let verification = ranking_sync::sheets::verify(&sheets.settings()?).await?;
            if let Some(email) = &verification.client_email {
                println!("Service account: {email}");
            }
            println!("Spreadsheet id:  {}", verification.spreadsheet_id);
            println!("Spreadsheet:     {}", verification.spreadsheet);
            println!("Sheet:           {}", verification.sheet);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = execute(cli.command).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}
