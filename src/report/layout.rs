use crate::utils::helpers::col_offset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Currency,
    Percent,
    Number,
    Plain,
}

const CURRENCY_COLUMNS: &[&str] = &[
    "C", "D", "F", "G", "L", "M", "O", "P", "R", "S", "U", "V", "X", "Y", "AP", "AQ", "AS", "AT",
];
const PERCENT_COLUMNS: &[&str] = &[
    "E", "H", "I", "J", "K", "N", "Q", "T", "W", "Z", "AC", "AF", "AI", "AL", "AO", "AR", "AU",
];
const NUMBER_COLUMNS: &[&str] = &["AA", "AB", "AD", "AE", "AG", "AH", "AJ", "AK", "AM", "AN"];
const POSTAL_CODE_COLUMN: &str = "AV";

/// Which report columns hold which kind of value. Offsets are 0-based
/// positions in a row buffer that starts at column A.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub currency: Vec<usize>,
    pub percent: Vec<usize>,
    pub number: Vec<usize>,
    pub postal_code: Option<usize>,
}

impl ColumnLayout {
    /// Layout of the "Ranking de Unidades" export.
    pub fn ranking() -> Self {
        Self {
            currency: offsets(CURRENCY_COLUMNS),
            percent: offsets(PERCENT_COLUMNS),
            number: offsets(NUMBER_COLUMNS),
            postal_code: col_offset(POSTAL_CODE_COLUMN),
        }
    }

    pub fn kind_of(&self, offset: usize) -> ColumnKind {
        if self.currency.contains(&offset) {
            ColumnKind::Currency
        } else if self.percent.contains(&offset) {
            ColumnKind::Percent
        } else if self.number.contains(&offset) {
            ColumnKind::Number
        } else {
            ColumnKind::Plain
        }
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self::ranking()
    }
}

fn offsets(names: &[&str]) -> Vec<usize> {
    names.iter().filter_map(|name| col_offset(name)).collect()
}
