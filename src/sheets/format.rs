use serde_json::{Value, json};

use crate::report::{ColumnKind, ColumnLayout};

/// Sheets number format for a column kind, as `(type, pattern)`.
pub fn number_format(kind: ColumnKind) -> Option<(&'static str, &'static str)> {
    match kind {
        ColumnKind::Currency => Some(("CURRENCY", "\"R$\"#,##0.00")),
        ColumnKind::Percent => Some(("PERCENT", "0.00%")),
        ColumnKind::Number => Some(("NUMBER", "#,##0.00")),
        ColumnKind::Plain => None,
    }
}

/// `repeatCell` requests formatting the rows just written, one per typed
/// column inside `width`. `start_row` is 1-based.
pub fn format_requests(
    sheet_id: i64,
    start_row: usize,
    height: usize,
    width: usize,
    layout: &ColumnLayout,
) -> Vec<Value> {
    let start = start_row.saturating_sub(1);
    let end = start + height;

    let mut columns: Vec<usize> = layout
        .currency
        .iter()
        .chain(&layout.percent)
        .chain(&layout.number)
        .copied()
        .filter(|&col| col < width)
        .collect();
    columns.sort_unstable();

    columns
        .into_iter()
        .filter_map(|col| {
            let (kind, pattern) = number_format(layout.kind_of(col))?;
            Some(json!({
                "repeatCell": {
                    "range": {
                        "sheetId": sheet_id,
                        "startRowIndex": start,
                        "endRowIndex": end,
                        "startColumnIndex": col,
                        "endColumnIndex": col + 1,
                    },
                    "cell": {
                        "userEnteredFormat": {
                            "numberFormat": { "type": kind, "pattern": pattern }
                        }
                    },
                    "fields": "userEnteredFormat.numberFormat",
                }
            }))
        })
        .collect()
}
