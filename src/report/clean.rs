use tracing::{debug, info};

use crate::report::cell::{Cell, CellType, CellValue};
use crate::report::layout::{ColumnKind, ColumnLayout};
use crate::report::units::{Unit, unit_by_code};
use crate::utils::helpers::offset_to_col_name;

/// Markers the dashboard leaves behind from its row action buttons.
const ACTION_MARKERS: &[&str] = &["edit", "Edit", "EDIT", "add", "Add", "ADD"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanSummary {
    pub rows_changed: usize,
    pub cells_changed: usize,
}

/// Cleans every row of the report. `first_row` is the sheet row number of
/// `rows[0]` and is only used in log lines.
pub fn clean_rows(
    rows: &[Vec<Cell>],
    layout: &ColumnLayout,
    first_row: usize,
) -> (Vec<Vec<CellValue>>, CleanSummary) {
    let mut summary = CleanSummary::default();
    let mut cleaned = Vec::with_capacity(rows.len());

    for (row_idx, row) in rows.iter().enumerate() {
        let sheet_row = first_row + row_idx;
        let (values, changed) = clean_row(row, layout, sheet_row);

        if changed > 0 {
            summary.rows_changed += 1;
            summary.cells_changed += changed;
        }
        cleaned.push(values);
    }

    info!(
        rows = rows.len(),
        rows_changed = summary.rows_changed,
        cells_changed = summary.cells_changed,
        "report cleaned"
    );

    (cleaned, summary)
}

fn clean_row(row: &[Cell], layout: &ColumnLayout, sheet_row: usize) -> (Vec<CellValue>, usize) {
    let mut unit: Option<&'static Unit> = None;
    let mut changed = 0;
    let mut values = Vec::with_capacity(row.len());

    for (offset, cell) in row.iter().enumerate() {
        let original = CellValue::from(cell);

        let value = if cell.cell_type == CellType::Text {
            let mut text = cell.value.clone();

            if offset == 0 {
                if let Some(found) = unit_by_code(text.trim()) {
                    unit = Some(found);
                    text = found.city.to_string();
                }
            }

            clean_text(&text, layout.kind_of(offset))
        } else {
            clean_native(&original, layout.kind_of(offset))
        };

        if value != original {
            changed += 1;
            debug!(
                row = sheet_row,
                column = %offset_to_col_name(offset),
                from = %cell.value,
                to = %value,
                "cell rewritten"
            );
        }

        values.push(value);
    }

    if let (Some(unit), Some(column)) = (unit, layout.postal_code) {
        if column < values.len() {
            values[column] = CellValue::Text(unit.postal_code.to_string());
            changed += 1;
            debug!(
                row = sheet_row,
                column = %offset_to_col_name(column),
                city = unit.city,
                postal_code = unit.postal_code,
                "postal code filled"
            );
        }
    }

    (values, changed)
}

/// Applies the cleaning rules for one column kind to a text cell.
pub fn clean_text(raw: &str, kind: ColumnKind) -> CellValue {
    let stripped = strip_action_markers(raw);

    match kind {
        ColumnKind::Currency => {
            let without_symbol = strip_currency_prefix(&stripped);
            parse_brazilian_number(without_symbol.trim())
        }
        ColumnKind::Number => parse_brazilian_number(stripped.trim()),
        ColumnKind::Percent => parse_percent(stripped.trim()),
        ColumnKind::Plain => text_value(stripped.trim()),
    }
}

/// Native numbers are already parsed; only the whole-percentage rule applies.
fn clean_native(value: &CellValue, kind: ColumnKind) -> CellValue {
    match (kind, value) {
        (ColumnKind::Percent, CellValue::Number(n)) => CellValue::Number(scale_percent(*n)),
        _ => value.clone(),
    }
}

fn scale_percent(number: f64) -> f64 {
    if number > 1.0 { number / 100.0 } else { number }
}

fn strip_action_markers(raw: &str) -> String {
    ACTION_MARKERS
        .iter()
        .fold(raw.to_string(), |text, marker| text.replace(marker, ""))
}

fn strip_currency_prefix(value: &str) -> &str {
    value
        .strip_prefix("'R$")
        .or_else(|| value.strip_prefix('\''))
        .or_else(|| value.strip_prefix("R$"))
        .unwrap_or(value)
}

/// `480.040,00` -> 480040.0. Dots are thousands separators, a single comma
/// marks the decimals.
fn parse_brazilian_number(value: &str) -> CellValue {
    if value.is_empty() || is_alphabetic(value) {
        return text_value(value);
    }

    let rewritten = match value.split_once(',') {
        Some((integer, decimals)) if !decimals.contains(',') => {
            format!("{},{}", integer.replace('.', ""), decimals)
        }
        _ => value.replace('.', ""),
    };

    match parse_finite(&rewritten.replace(',', ".")) {
        Some(number) => CellValue::Number(number),
        None => text_value(rewritten.trim()),
    }
}

/// `15%` -> 0.15. Values above 1 are taken as whole percentages.
fn parse_percent(value: &str) -> CellValue {
    let value = value
        .strip_suffix('%')
        .map(str::trim)
        .unwrap_or(value);

    if value.is_empty() || is_alphabetic(value) {
        return text_value(value);
    }

    match parse_finite(&value.replace(',', ".")) {
        Some(number) => CellValue::Number(scale_percent(number)),
        None => text_value(value),
    }
}

fn parse_finite(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn is_alphabetic(value: &str) -> bool {
    value.chars().all(char::is_alphabetic)
}

fn text_value(value: &str) -> CellValue {
    if value.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::helpers::col_offset;

    fn approx(value: &CellValue, expected: f64) {
        let number = value.as_number().expect("numeric cell");
        assert!(
            (number - expected).abs() < 1e-9,
            "expected {expected}, got {number}"
        );
    }

    #[test]
    fn currency_with_quote_and_symbol() {
        approx(&clean_text("'R$480.040,00", ColumnKind::Currency), 480040.00);
    }

    #[test]
    fn currency_prefix_variants() {
        approx(&clean_text("R$ 1.234,56", ColumnKind::Currency), 1234.56);
        approx(&clean_text("'99,90", ColumnKind::Currency), 99.90);
        approx(&clean_text("1.500", ColumnKind::Currency), 1500.0);
    }

    #[test]
    fn currency_keeps_unparseable_text() {
        assert_eq!(
            clean_text("R$ abc", ColumnKind::Currency),
            CellValue::Text("abc".into())
        );
        assert_eq!(
            clean_text("1,2,3", ColumnKind::Currency),
            CellValue::Text("1,2,3".into())
        );
    }

    #[test]
    fn percent_is_scaled_when_above_one() {
        approx(&clean_text("15%", ColumnKind::Percent), 0.15);
        approx(&clean_text("12,5 %", ColumnKind::Percent), 0.125);
        approx(&clean_text("0,5", ColumnKind::Percent), 0.5);
        approx(&clean_text("1", ColumnKind::Percent), 1.0);
    }

    #[test]
    fn number_columns_use_brazilian_separators() {
        approx(&clean_text("1.234,5", ColumnKind::Number), 1234.5);
        approx(&clean_text(" 42 ", ColumnKind::Number), 42.0);
    }

    #[test]
    fn action_markers_leave_an_empty_plain_cell() {
        let value = clean_text("edit add", ColumnKind::Plain);
        assert_eq!(value, CellValue::Empty);
        assert_eq!(value.to_string(), "");
    }

    #[test]
    fn action_markers_are_removed_before_parsing() {
        approx(&clean_text("R$10,00edit", ColumnKind::Currency), 10.0);
        assert_eq!(
            clean_text("  Addition ", ColumnKind::Plain),
            CellValue::Text("ition".into())
        );
    }

    #[test]
    fn row_maps_unit_and_fills_postal_code() {
        let layout = ColumnLayout::ranking();
        let postal = col_offset("AV").unwrap();
        let mut row = vec![Cell::empty(); postal + 1];
        row[0] = Cell::text("9odontorecife ");
        row[2] = Cell::text("'R$480.040,00");
        row[4] = Cell::text("15%");

        let (cleaned, summary) = clean_rows(&[row], &layout, 3);

        assert_eq!(cleaned[0][0], CellValue::Text("Recife".into()));
        approx(&cleaned[0][2], 480040.0);
        approx(&cleaned[0][4], 0.15);
        assert_eq!(cleaned[0][postal], CellValue::Text("50010-000".into()));
        assert_eq!(summary.rows_changed, 1);
        assert_eq!(summary.cells_changed, 4);
    }

    #[test]
    fn short_rows_get_no_postal_code() {
        let layout = ColumnLayout::ranking();
        let row = vec![Cell::text("1odontologiasa"), Cell::text("x")];

        let (cleaned, _) = clean_rows(&[row], &layout, 3);

        assert_eq!(cleaned[0].len(), 2);
        assert_eq!(cleaned[0][0], CellValue::Text("Santo Antônio".into()));
    }

    #[test]
    fn native_numbers_pass_through() {
        let layout = ColumnLayout::ranking();
        let row = vec![Cell::text("Total"), Cell::empty(), Cell::number(480040.0)];

        let (cleaned, summary) = clean_rows(&[row], &layout, 3);

        assert_eq!(cleaned[0][2], CellValue::Number(480040.0));
        assert_eq!(cleaned[0][1], CellValue::Empty);
        assert_eq!(summary, CleanSummary::default());
    }

    #[test]
    fn native_percentages_are_scaled() {
        let layout = ColumnLayout::ranking();
        let percent = col_offset("E").unwrap();
        let mut row = vec![Cell::empty(); percent + 1];
        row[0] = Cell::text("Total");
        row[2] = Cell::number(15.0);
        row[percent] = Cell::number(15.0);

        let (cleaned, summary) = clean_rows(&[row.clone()], &layout, 3);

        assert_eq!(cleaned[0][2], CellValue::Number(15.0));
        approx(&cleaned[0][percent], 0.15);
        assert_eq!(summary.cells_changed, 1);

        // already a fraction
        row[percent] = Cell::number(0.42);
        let (cleaned, summary) = clean_rows(&[row], &layout, 3);
        assert_eq!(cleaned[0][percent], CellValue::Number(0.42));
        assert_eq!(summary, CleanSummary::default());
    }

    #[test]
    fn non_finite_text_is_not_a_number() {
        assert_eq!(
            clean_text("inf", ColumnKind::Currency),
            CellValue::Text("inf".into())
        );
        assert_eq!(
            clean_text("+inf", ColumnKind::Currency),
            CellValue::Text("+inf".into())
        );
        assert_eq!(
            clean_text("NaN", ColumnKind::Number),
            CellValue::Text("NaN".into())
        );
        assert_eq!(
            clean_text("-inf%", ColumnKind::Percent),
            CellValue::Text("-inf".into())
        );
    }
}
