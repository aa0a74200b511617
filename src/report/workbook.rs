use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, open_workbook_auto};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::report::cell::{Cell, CellValue};
use crate::report::layout::{ColumnKind, ColumnLayout};
use crate::utils::helpers::index_to_col_name;

/// Data rows of an exported ranking report.
#[derive(Debug, Clone)]
pub struct Report {
    pub path: PathBuf,
    pub sheet_name: String,
    /// Sheet row number (1-based) of `rows[0]`.
    pub first_row: usize,
    pub rows: Vec<Vec<Cell>>,
}

impl Report {
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// A1 notation of the block that was read, for logging.
    pub fn source_range(&self) -> String {
        let last_row = self.first_row + self.rows.len().saturating_sub(1);
        format!(
            "A{}:{}{}",
            self.first_row,
            index_to_col_name(self.width().max(1)),
            last_row
        )
    }
}

/// Reads rows `first_row..=last used row` of the first worksheet, from column
/// A to the last used column.
pub fn read_report<P: AsRef<Path>>(path: P, first_row: usize) -> Result<Report> {
    let path = path.as_ref();

    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Unable to parse Excel file: {}", path.display()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .context("No worksheets found in file")?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Unable to read worksheet: {}", sheet_name))?;

    let report = Report {
        path: path.to_path_buf(),
        sheet_name,
        first_row: first_row.max(1),
        rows: rows_from_range(&range, first_row.max(1)),
    };

    info!(
        file = %path.display(),
        sheet = %report.sheet_name,
        range = %report.source_range(),
        rows = report.rows.len(),
        "report loaded"
    );

    Ok(report)
}

fn rows_from_range(range: &Range<Data>, first_row: usize) -> Vec<Vec<Cell>> {
    let (Some(start), Some(end)) = (range.start(), range.end()) else {
        return Vec::new();
    };

    // calamine ranges begin at the first used cell, not at A1
    let last_row = end.0 as usize + 1;
    let width = end.1 as usize + 1;

    if first_row > last_row {
        return Vec::new();
    }

    // Pad every row to the full width so offsets line up with columns
    let mut rows = vec![vec![Cell::empty(); width]; last_row + 1 - first_row];

    for (row_idx, col_idx, data) in range.used_cells() {
        let sheet_row = start.0 as usize + row_idx + 1;
        if sheet_row < first_row {
            continue;
        }

        // Back to absolute sheet coordinates
        let col = start.1 as usize + col_idx;
        rows[sheet_row - first_row][col] = cell_from_data(data);
    }

    rows
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::empty(),
        Data::String(s) => Cell::text(s.clone()),
        Data::Float(f) => Cell::number(*f),
        Data::Int(i) => Cell::number(*i as f64),
        Data::Bool(b) => Cell::boolean(*b),
        Data::Error(e) => Cell::text(format!("Error: {:?}", e)),
        Data::DateTime(dt) => Cell::date(dt.to_string(), Some(dt.as_f64())),
        Data::DateTimeIso(s) => Cell::date(s.clone(), None),
        Data::DurationIso(s) => Cell::text(s.clone()),
    }
}

/// Writes cleaned rows to a new workbook, formatting numeric cells by the
/// kind of their column.
pub fn write_xlsx(
    rows: &[Vec<CellValue>],
    layout: &ColumnLayout,
    sheet_name: &str,
    path: &Path,
) -> Result<()> {
    let mut workbook = XlsxWorkbook::new();

    // Number formats per column kind
    let currency_format = Format::new().set_num_format("\"R$\"#,##0.00");
    let percent_format = Format::new().set_num_format("0.00%");
    let number_format = Format::new().set_num_format("#,##0.00");

    let worksheet = workbook.add_worksheet().set_name(sheet_name)?;

    // Set column widths
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for col in 0..width {
        worksheet.set_column_width(col as u16, 15)?;
    }

    // Write cells
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            let (row_idx, col) = (row_idx as u32, col_idx as u16);

            match value {
                CellValue::Empty => {}
                CellValue::Text(text) => {
                    worksheet.write_string(row_idx, col, text)?;
                }
                CellValue::Number(number) => match layout.kind_of(col_idx) {
                    ColumnKind::Currency => {
                        worksheet.write_number_with_format(
                            row_idx,
                            col,
                            *number,
                            &currency_format,
                        )?;
                    }
                    ColumnKind::Percent => {
                        worksheet.write_number_with_format(
                            row_idx,
                            col,
                            *number,
                            &percent_format,
                        )?;
                    }
                    ColumnKind::Number => {
                        worksheet.write_number_with_format(
                            row_idx,
                            col,
                            *number,
                            &number_format,
                        )?;
                    }
                    ColumnKind::Plain => {
                        worksheet.write_number(row_idx, col, *number)?;
                    }
                },
            }
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to write workbook: {}", path.display()))?;

    info!(file = %path.display(), rows = rows.len(), "cleaned workbook written");

    Ok(())
}
