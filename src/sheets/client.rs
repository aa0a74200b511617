use anyhow::{Context, Result, anyhow, bail};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::report::{CellValue, ColumnLayout};
use crate::sheets::format::format_requests;
use crate::utils::helpers::{block_range, qualified_range};

pub const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

const SPREADSHEET_FIELDS: &str = "properties.title,sheets.properties(sheetId,title)";
const SCAN_COLUMNS: &str = "A:ZZ";

/// Extracts the spreadsheet id from a Google Sheets URL: the path segment
/// after `/d/`.
pub fn spreadsheet_id_from_url(url: &str) -> Result<String> {
    let (_, rest) = url
        .split_once("/d/")
        .ok_or_else(|| anyhow!("Invalid Google Sheets URL (no /d/ segment): {url}"))?;

    let id = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if id.is_empty() {
        bail!("Invalid Google Sheets URL (empty spreadsheet id): {url}");
    }
    Ok(id.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInfo {
    pub sheet_id: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spreadsheet {
    pub id: String,
    pub title: String,
    pub sheets: Vec<SheetInfo>,
}

impl Spreadsheet {
    /// The sheet named `title`, or the first sheet when no name is given.
    pub fn sheet(&self, title: Option<&str>) -> Result<&SheetInfo> {
        match title {
            Some(title) => self
                .sheets
                .iter()
                .find(|sheet| sheet.title == title)
                .ok_or_else(|| anyhow!("Sheet '{}' not found in '{}'", title, self.title)),
            None => self
                .sheets
                .first()
                .ok_or_else(|| anyhow!("Spreadsheet '{}' has no sheets", self.title)),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetResponse {
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SpreadsheetProperties {
    title: String,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    updated_range: Option<String>,
    updated_rows: Option<usize>,
}

/// What an append wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendSummary {
    pub spreadsheet: String,
    pub sheet: String,
    pub range: String,
    pub rows: usize,
    pub columns: usize,
    pub formatted: bool,
}

/// 1-based row of the first row whose cells are all blank, or the row
/// after the last one returned.
pub fn first_blank_row(values: &[Vec<Value>]) -> usize {
    values
        .iter()
        .position(|row| row.iter().all(is_blank))
        .unwrap_or(values.len())
        + 1
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

pub struct SheetsClient {
    http: Client,
    base: Url,
    token: String,
}

impl SheetsClient {
    pub fn new(http: Client, base: &str, token: impl Into<String>) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("Invalid Sheets API URL: {base}"))?;
        Ok(Self {
            http,
            base,
            token: token.into(),
        })
    }

    pub fn http_client() -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build the HTTP client")
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Sheets API URL cannot be a base: {}", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn check(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        bail!("{what} failed: HTTP {status}: {body}")
    }

    pub async fn spreadsheet(&self, id: &str) -> Result<Spreadsheet> {
        let mut url = self.url(&[id])?;
        url.query_pairs_mut().append_pair("fields", SPREADSHEET_FIELDS);

        debug!(%url, "fetching spreadsheet metadata");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Failed to reach the Sheets API")?;
        let response = Self::check(response, "opening the spreadsheet").await?;

        let body: SpreadsheetResponse = response
            .json()
            .await
            .context("Failed to parse the spreadsheet metadata")?;

        Ok(Spreadsheet {
            id: id.to_string(),
            title: body.properties.title,
            sheets: body
                .sheets
                .into_iter()
                .map(|entry| SheetInfo {
                    sheet_id: entry.properties.sheet_id,
                    title: entry.properties.title,
                })
                .collect(),
        })
    }

    pub async fn values(&self, id: &str, range: &str) -> Result<Vec<Vec<Value>>> {
        let url = self.url(&[id, "values", range])?;

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("Failed to reach the Sheets API")?;
        let response = Self::check(response, "reading values").await?;

        let body: ValueRange = response
            .json()
            .await
            .context("Failed to parse the values response")?;
        Ok(body.values)
    }

    pub async fn first_empty_row(&self, id: &str, sheet: &str) -> Result<usize> {
        let values = self
            .values(id, &qualified_range(sheet, SCAN_COLUMNS))
            .await?;
        let row = first_blank_row(&values);
        info!(sheet, row, "first empty row");
        Ok(row)
    }

    /// Writes `rows` as a block starting at column A of `start_row`, letting
    /// Sheets parse the values as if typed. Returns the updated range.
    pub async fn write_rows(
        &self,
        id: &str,
        sheet: &str,
        start_row: usize,
        rows: &[Vec<CellValue>],
    ) -> Result<String> {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if rows.is_empty() || width == 0 {
            bail!("No data to write");
        }

        let range = qualified_range(sheet, &block_range(start_row, rows.len(), width));
        let mut url = self.url(&[id, "values", &range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");

        info!(%range, rows = rows.len(), columns = width, "writing rows");
        let response = self
            .http
            .put(url)
            .bearer_auth(&self.token)
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": rows,
            }))
            .send()
            .await
            .context("Failed to reach the Sheets API")?;
        let response = Self::check(response, "writing rows").await?;

        let body: UpdateResponse = response
            .json()
            .await
            .context("Failed to parse the update response")?;
        debug!(updated_rows = ?body.updated_rows, "rows written");

        Ok(body.updated_range.unwrap_or(range))
    }

    /// Applies the currency, percent and number formats to the typed columns
    /// of a written block in a single batch update.
    pub async fn format_columns(
        &self,
        id: &str,
        sheet_id: i64,
        start_row: usize,
        rows: &[Vec<CellValue>],
        layout: &ColumnLayout,
    ) -> Result<usize> {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let requests = format_requests(sheet_id, start_row, rows.len(), width, layout);
        if requests.is_empty() {
            return Ok(0);
        }

        let url = self.url(&[&format!("{id}:batchUpdate")])?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .context("Failed to reach the Sheets API")?;
        Self::check(response, "formatting columns").await?;

        info!(columns = requests.len(), "columns formatted");
        Ok(requests.len())
    }

    /// Appends `rows` below the data already in the sheet and formats them.
    /// A formatting failure is logged and reported in the summary only.
    pub async fn append_report(
        &self,
        id: &str,
        sheet: Option<&str>,
        rows: &[Vec<CellValue>],
        layout: &ColumnLayout,
    ) -> Result<AppendSummary> {
        let spreadsheet = self.spreadsheet(id).await?;
        let target = spreadsheet.sheet(sheet)?;
        info!(spreadsheet = %spreadsheet.title, sheet = %target.title, "spreadsheet opened");

        let start_row = self.first_empty_row(id, &target.title).await?;
        let range = self.write_rows(id, &target.title, start_row, rows).await?;

        let formatted = match self
            .format_columns(id, target.sheet_id, start_row, rows, layout)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "data written but formatting failed");
                false
            }
        };

        Ok(AppendSummary {
            spreadsheet: spreadsheet.title.clone(),
            sheet: target.title.clone(),
            range,
            rows: rows.len(),
            columns: rows.iter().map(Vec::len).max().unwrap_or(0),
            formatted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn spreadsheet_id_is_the_segment_after_d() {
        assert_eq!(
            spreadsheet_id_from_url("https://docs.google.com/spreadsheets/d/1AbC-x_9/edit#gid=0")
                .unwrap(),
            "1AbC-x_9"
        );
        assert_eq!(
            spreadsheet_id_from_url("https://docs.google.com/spreadsheets/d/xyz").unwrap(),
            "xyz"
        );
        assert!(spreadsheet_id_from_url("https://docs.google.com/spreadsheets/").is_err());
        assert!(spreadsheet_id_from_url("https://docs.google.com/spreadsheets/d/").is_err());
    }

    #[test]
    fn first_blank_row_skips_filled_rows() {
        assert_eq!(first_blank_row(&[]), 1);

        let values = vec![
            vec![json!("Ranking")],
            vec![json!("Recife"), json!(10)],
            vec![json!(""), json!("  ")],
            vec![json!("Natal")],
        ];
        assert_eq!(first_blank_row(&values), 3);

        let full = vec![vec![json!("a")], vec![json!("b")]];
        assert_eq!(first_blank_row(&full), 3);
    }

    #[test]
    fn sheet_lookup_defaults_to_the_first() {
        let spreadsheet = Spreadsheet {
            id: "id".into(),
            title: "Ranking".into(),
            sheets: vec![
                SheetInfo {
                    sheet_id: 0,
                    title: "2025".into(),
                },
                SheetInfo {
                    sheet_id: 9,
                    title: "2024".into(),
                },
            ],
        };

        assert_eq!(spreadsheet.sheet(None).unwrap().sheet_id, 0);
        assert_eq!(spreadsheet.sheet(Some("2024")).unwrap().sheet_id, 9);
        assert!(spreadsheet.sheet(Some("2023")).is_err());
    }

    #[test]
    fn urls_keep_the_range_in_one_segment() {
        let client = SheetsClient::new(Client::new(), SHEETS_API, "t").unwrap();
        let url = client.url(&["abc", "values", "'Página 1'!A1:B2"]).unwrap();
        assert!(url.path().starts_with("/v4/spreadsheets/abc/values/"));
        assert!(url.path().contains("P%C3%A1gina%201"));

        let url = client.url(&["abc:batchUpdate"]).unwrap();
        assert_eq!(url.path(), "/v4/spreadsheets/abc:batchUpdate");
    }
}
