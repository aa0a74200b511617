//! Google Sheets v4 over REST: authentication, appending rows and
//! formatting them.

mod auth;
mod client;
mod format;

pub use auth::{AccessToken, REQUIRED_FIELDS, SCOPES, ServiceAccountKey, SheetsAuth, missing_fields};
pub use client::{
    AppendSummary, SHEETS_API, SheetInfo, SheetsClient, Spreadsheet, first_blank_row,
    spreadsheet_id_from_url,
};
pub use format::{format_requests, number_format};

use anyhow::{Context, Result};
use tracing::info;

#[derive(Debug, Clone)]
pub struct SheetsSettings {
    pub sheet_url: String,
    pub auth: SheetsAuth,
    /// Sheet to append to; the first sheet when unset.
    pub worksheet: Option<String>,
    pub api_base: String,
}

/// Authenticates and returns a client with the spreadsheet id of the
/// configured URL.
pub async fn connect(settings: &SheetsSettings) -> Result<(SheetsClient, String)> {
    let id = spreadsheet_id_from_url(&settings.sheet_url)?;
    let http = SheetsClient::http_client()?;
    let token = settings
        .auth
        .access_token(&http)
        .await
        .context("Google Sheets authentication failed")?;

    Ok((SheetsClient::new(http, &settings.api_base, token)?, id))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub client_email: Option<String>,
    pub spreadsheet_id: String,
    pub spreadsheet: String,
    pub sheet: String,
}

/// Checks the credentials and the sheet URL, then opens the spreadsheet.
pub async fn verify(settings: &SheetsSettings) -> Result<Verification> {
    let client_email = match &settings.auth {
        SheetsAuth::ServiceAccount(path) => {
            let key = ServiceAccountKey::load(path)?;
            info!(file = %path.display(), client_email = %key.client_email, "credentials file is valid");
            Some(key.client_email)
        }
        SheetsAuth::Token(_) => {
            info!("using a pre-issued access token");
            None
        }
    };

    let spreadsheet_id = spreadsheet_id_from_url(&settings.sheet_url)?;
    info!(spreadsheet_id = %spreadsheet_id, "sheet URL is valid");

    info!("testing the connection to Google Sheets");
    let (client, id) = connect(settings).await?;
    let spreadsheet = client.spreadsheet(&id).await?;
    let sheet = spreadsheet.sheet(settings.worksheet.as_deref())?.title.clone();
    info!(spreadsheet = %spreadsheet.title, sheet = %sheet, "connected");

    Ok(Verification {
        client_email,
        spreadsheet_id,
        spreadsheet: spreadsheet.title,
        sheet,
    })
}
