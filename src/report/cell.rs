use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CellType {
    Text,
    Number,
    Date,
    Boolean,
    Empty,
}

/// A cell as read from the exported report, before any cleaning.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub value: String,
    pub cell_type: CellType,
    pub number: Option<f64>,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            return Self::empty();
        }

        Self {
            value,
            cell_type: CellType::Text,
            number: None,
        }
    }

    pub fn number(number: f64) -> Self {
        let value = if number == (number as i64) as f64 && number.abs() < 1e10 {
            (number as i64).to_string()
        } else {
            number.to_string()
        };

        Self {
            value,
            cell_type: CellType::Number,
            number: Some(number),
        }
    }

    pub fn boolean(flag: bool) -> Self {
        Self {
            value: if flag { "TRUE" } else { "FALSE" }.to_string(),
            cell_type: CellType::Boolean,
            number: None,
        }
    }

    pub fn date(display: String, serial: Option<f64>) -> Self {
        Self {
            value: display,
            cell_type: CellType::Date,
            number: serial,
        }
    }

    pub fn empty() -> Self {
        Self {
            value: String::new(),
            cell_type: CellType::Empty,
            number: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cell_type == CellType::Empty
    }
}

/// A cleaned cell, ready to be written to a spreadsheet.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&Cell> for CellValue {
    fn from(cell: &Cell) -> Self {
        match (cell.cell_type, cell.number) {
            (CellType::Empty, _) => CellValue::Empty,
            (CellType::Number, Some(n)) => CellValue::Number(n),
            _ => CellValue::Text(cell.value.clone()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{n}"),
        }
    }
}

// Sheets takes "" to mean an empty cell; null is rejected in value ranges.
impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Empty => serializer.serialize_str(""),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Number(n) => serializer.serialize_f64(*n),
        }
    }
}
