//! The end-to-end run: dashboard → downloaded report → cleaned rows →
//! Google Sheet.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

use crate::browser::{BrowserSession, LaunchOptions, PageDriver};
use crate::dashboard::{
    Credentials, Period, Timing, download, list_ranking, login, open_ranking, select_period,
};
use crate::report::{
    CellValue, CleanSummary, ColumnLayout, Report, clean_rows, find_latest_report, read_report,
    wait_for_report,
};
use crate::sheets::{AppendSummary, SheetsSettings, connect};

const DOWNLOAD_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub login_url: String,
    pub credentials: Credentials,
    pub period: Period,
    pub timing: Timing,
    pub launch: LaunchOptions,
    pub keep_open: bool,
}

#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub downloads_dir: PathBuf,
    pub needle: String,
    pub first_row: usize,
    pub download_timeout: Duration,
}

/// Which halves of a run to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phases {
    pub download: bool,
    pub upload: bool,
}

impl Default for Phases {
    fn default() -> Self {
        Self {
            download: true,
            upload: true,
        }
    }
}

/// A report read from disk and cleaned.
#[derive(Debug)]
pub struct Prepared {
    pub report: Report,
    pub rows: Vec<Vec<CellValue>>,
    pub summary: CleanSummary,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: PathBuf,
    pub rows: usize,
    pub appended: Option<AppendSummary>,
}

/// Drives the dashboard from the login page to the download click.
pub async fn drive_dashboard(
    page: &dyn PageDriver,
    settings: &DashboardSettings,
    today: NaiveDate,
) -> Result<()> {
    let timing = settings.timing;

    login(page, &settings.login_url, &settings.credentials, timing).await?;
    open_ranking(page, timing).await?;
    select_period(page, &settings.period, today, timing).await?;
    list_ranking(page, timing).await?;

    if !download(page, timing).await? {
        info!("waiting for the file to confirm the download");
    }
    Ok(())
}

/// Launches Chrome, downloads a fresh report and returns its path. The
/// browser is closed whether or not the download worked.
pub async fn fetch_report(dashboard: &DashboardSettings, report: &ReportSettings) -> Result<PathBuf> {
    let since = SystemTime::now();
    let session = BrowserSession::launch(&dashboard.launch).await?;

    let result = async {
        drive_dashboard(&session, dashboard, Local::now().date_naive()).await?;
        wait_for_report(
            &report.downloads_dir,
            &report.needle,
            since,
            report.download_timeout,
            DOWNLOAD_POLL,
        )
        .await
    }
    .await;

    if dashboard.keep_open {
        wait_for_enter().await;
    }
    if let Err(e) = session.close().await {
        warn!(error = %e, "failed to close Chrome cleanly");
    }

    result
}

async fn wait_for_enter() {
    info!("browser kept open; press Enter to close it");
    let read = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)
    })
    .await;

    if !matches!(read, Ok(Ok(_))) {
        warn!("could not read from stdin, closing the browser");
    }
}

/// Reads and cleans the report at `path`.
pub fn prepare(path: &Path, first_row: usize, layout: &ColumnLayout) -> Result<Prepared> {
    let report = read_report(path, first_row)?;
    let (rows, summary) = clean_rows(&report.rows, layout, report.first_row);
    Ok(Prepared {
        report,
        rows,
        summary,
    })
}

pub async fn upload(
    sheets: &SheetsSettings,
    rows: &[Vec<CellValue>],
    layout: &ColumnLayout,
) -> Result<AppendSummary> {
    let (client, id) = connect(sheets).await?;
    let summary = client
        .append_report(&id, sheets.worksheet.as_deref(), rows, layout)
        .await
        .context("Failed to append the report to Google Sheets")?;

    info!(
        spreadsheet = %summary.spreadsheet,
        sheet = %summary.sheet,
        range = %summary.range,
        rows = summary.rows,
        "report appended"
    );
    Ok(summary)
}

/// Runs the selected phases. Without the download phase the newest report
/// already in the downloads folder is used.
pub async fn run(
    dashboard: Option<&DashboardSettings>,
    report: &ReportSettings,
    sheets: Option<&SheetsSettings>,
    phases: Phases,
) -> Result<RunOutcome> {
    let path = match (phases.download, dashboard) {
        (true, Some(dashboard)) => fetch_report(dashboard, report).await?,
        (true, None) => anyhow::bail!("the download phase needs the dashboard settings"),
        (false, _) => find_latest_report(&report.downloads_dir, &report.needle)?,
    };

    let layout = ColumnLayout::ranking();
    let prepared = prepare(&path, report.first_row, &layout)?;

    let appended = match (phases.upload, sheets) {
        (true, Some(sheets)) => Some(upload(sheets, &prepared.rows, &layout).await?),
        (true, None) => anyhow::bail!("the upload phase needs the Google Sheets settings"),
        (false, _) => {
            info!("upload skipped");
            None
        }
    };

    Ok(RunOutcome {
        report: path,
        rows: prepared.rows.len(),
        appended,
    })
}
