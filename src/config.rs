//! Command-line and environment settings. Every option can also come from
//! the environment or a `.env` file in the working directory.

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::browser::{LaunchOptions, Wait};
use crate::dashboard::{Credentials, DEFAULT_LOGIN_URL, DateRange, Period, Timing};
use crate::pipeline::{DashboardSettings, ReportSettings};
use crate::sheets::{SHEETS_API, SheetsAuth, SheetsSettings};

pub const DEFAULT_NEEDLE: &str = "Report";
pub const DEFAULT_FIRST_ROW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeriodArg {
    /// Mês atual
    CurrentMonth,
    /// Semana atual
    CurrentWeek,
    /// Mês anterior
    LastMonth,
    /// Custom range, needs --from and --to
    Date,
}

#[derive(Debug, Clone, Args)]
pub struct DashboardArgs {
    /// Dashboard login page
    #[arg(long, env = "CLINICORP_LOGIN_URL", default_value = DEFAULT_LOGIN_URL)]
    pub login_url: String,

    /// Dashboard user name
    #[arg(long, env = "CLINICORP_USER")]
    pub user: Option<String>,

    /// Dashboard password
    #[arg(long, env = "CLINICORP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Ranking period
    #[arg(long, value_enum, env = "RANKING_PERIOD", default_value_t = PeriodArg::CurrentMonth)]
    pub period: PeriodArg,

    /// First day of a custom range (YYYY-MM-DD or DD/MM/YYYY)
    #[arg(long, value_parser = parse_date, requires = "to")]
    pub from: Option<NaiveDate>,

    /// Last day of a custom range (YYYY-MM-DD or DD/MM/YYYY)
    #[arg(long, value_parser = parse_date, requires = "from")]
    pub to: Option<NaiveDate>,

    /// Run Chrome without a window
    #[arg(long, env = "HEADLESS")]
    pub headless: bool,

    /// Chrome executable, if not on PATH
    #[arg(long, env = "CHROME_PATH")]
    pub chrome: Option<PathBuf>,

    /// Keep the browser open until Enter is pressed
    #[arg(long)]
    pub keep_open: bool,

    /// Seconds to wait for each locator
    #[arg(long, env = "STEP_WAIT_SECS", default_value_t = 15)]
    pub wait_secs: u64,

    /// Pause before each click, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub before_click_ms: u64,

    /// Pause after each click, in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub after_click_ms: u64,
}

impl DashboardArgs {
    pub fn credentials(&self) -> Result<Credentials> {
        let user = self
            .user
            .clone()
            .ok_or_else(|| anyhow!("No dashboard user: set --user or CLINICORP_USER"))?;
        let password = self
            .password
            .clone()
            .ok_or_else(|| anyhow!("No dashboard password: set --password or CLINICORP_PASSWORD"))?;

        Ok(Credentials { user, password })
    }

    /// `--from`/`--to` select a custom range regardless of `--period`.
    pub fn period(&self) -> Result<Period> {
        match (self.from, self.to) {
            (Some(from), Some(to)) => Ok(Period::Custom(DateRange::new(from, to)?)),
            _ => match self.period {
                PeriodArg::CurrentMonth => Ok(Period::CurrentMonth),
                PeriodArg::CurrentWeek => Ok(Period::CurrentWeek),
                PeriodArg::LastMonth => Ok(Period::LastMonth),
                PeriodArg::Date => bail!("--period date needs --from and --to"),
            },
        }
    }

    pub fn timing(&self) -> Timing {
        Timing {
            wait: Wait::new(Duration::from_secs(self.wait_secs)),
            before_click: Duration::from_millis(self.before_click_ms),
            after_click: Duration::from_millis(self.after_click_ms),
        }
    }

    pub fn settings(&self, download_dir: PathBuf) -> Result<DashboardSettings> {
        Ok(DashboardSettings {
            login_url: self.login_url.clone(),
            credentials: self.credentials()?,
            period: self.period()?,
            timing: self.timing(),
            launch: LaunchOptions {
                headless: self.headless,
                chrome_executable: self.chrome.clone(),
                download_dir,
                ..LaunchOptions::default()
            },
            keep_open: self.keep_open,
        })
    }
}

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    /// Where the browser saves the report [default: the user's Downloads folder]
    #[arg(long, env = "DOWNLOADS_DIR")]
    pub downloads_dir: Option<PathBuf>,

    /// Text the report file name contains
    #[arg(long, env = "REPORT_NEEDLE", default_value = DEFAULT_NEEDLE)]
    pub needle: String,

    /// First data row of the report (1-based)
    #[arg(long, env = "REPORT_FIRST_ROW", default_value_t = DEFAULT_FIRST_ROW)]
    pub first_row: usize,

    /// Seconds to wait for the downloaded file
    #[arg(long, default_value_t = 120)]
    pub download_timeout_secs: u64,
}

impl ReportArgs {
    pub fn downloads_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.downloads_dir {
            return Ok(dir.clone());
        }

        dirs::download_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
            .context("Could not determine the Downloads folder; set --downloads-dir")
    }

    pub fn settings(&self) -> Result<ReportSettings> {
        if self.first_row == 0 {
            bail!("--first-row is 1-based");
        }

        Ok(ReportSettings {
            downloads_dir: self.downloads_dir()?,
            needle: self.needle.clone(),
            first_row: self.first_row,
            download_timeout: Duration::from_secs(self.download_timeout_secs),
        })
    }
}

#[derive(Debug, Clone, Args)]
pub struct SheetsArgs {
    /// Google Sheets URL to append to
    #[arg(long, env = "GOOGLE_SHEETS_URL")]
    pub sheet_url: Option<String>,

    /// Service-account JSON key
    #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
    pub credentials: Option<PathBuf>,

    /// Pre-issued OAuth access token, used instead of a key file
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Sheet (tab) to append to [default: the first one]
    #[arg(long, env = "GOOGLE_WORKSHEET")]
    pub worksheet: Option<String>,

    #[arg(long, env = "SHEETS_API_URL", default_value = SHEETS_API, hide = true)]
    pub api_base: String,
}

impl SheetsArgs {
    pub fn settings(&self) -> Result<SheetsSettings> {
        let sheet_url = self
            .sheet_url
            .clone()
            .ok_or_else(|| anyhow!("No Google Sheets URL: set --sheet-url or GOOGLE_SHEETS_URL"))?;

        let auth = match (&self.access_token, &self.credentials) {
            (Some(token), _) => SheetsAuth::Token(token.clone()),
            (None, Some(path)) => SheetsAuth::ServiceAccount(path.clone()),
            (None, None) => bail!(
                "No Google credentials: set --credentials (GOOGLE_CREDENTIALS_FILE) or GOOGLE_ACCESS_TOKEN"
            ),
        };

        Ok(SheetsSettings {
            sheet_url,
            auth,
            worksheet: self.worksheet.clone(),
            api_base: self.api_base.clone(),
        })
    }
}

/// Accepts `2025-06-30` and `30/06/2025`.
pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .map_err(|_| format!("invalid date '{value}', expected YYYY-MM-DD or DD/MM/YYYY"))
}
