use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Value, json};

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::report::cell::CellValue;
use crate::utils::helpers::offset_to_col_name;

pub type OrderedRows = Vec<IndexMap<String, Value>>;

pub fn serialize_to_json<T: Serialize>(data: &T) -> Result<String> {
    serde_json::to_string_pretty(data).context("Failed to serialize data to JSON")
}

pub fn write_json_to_file<T: Serialize>(data: &T, path: &Path) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;

    let json_string = serialize_to_json(data)?;

    file.write_all(json_string.as_bytes())
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    Ok(())
}

/// One object per row, keyed by column letter, skipping empty cells.
/// `first_row` is the sheet row of `rows[0]` and is emitted as `_row`.
pub fn rows_to_json(rows: &[Vec<CellValue>], first_row: usize) -> OrderedRows {
    rows.iter()
        .enumerate()
        .map(|(row_idx, row)| {
            let mut object = IndexMap::with_capacity(row.len() + 1);
            object.insert("_row".to_string(), json!(first_row + row_idx));

            for (col_idx, value) in row.iter().enumerate() {
                let json_value = match value {
                    CellValue::Empty => continue,
                    CellValue::Text(s) => json!(s),
                    CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                        json!(n.trunc() as i64)
                    }
                    CellValue::Number(n) => json!(n),
                };
                object.insert(offset_to_col_name(col_idx), json_value);
            }

            object
        })
        .collect()
}
