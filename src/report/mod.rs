mod cell;
mod clean;
mod export;
mod files;
mod layout;
mod units;
mod workbook;

pub use cell::{Cell, CellType, CellValue};
pub use clean::{CleanSummary, clean_rows, clean_text};
pub use export::{OrderedRows, rows_to_json, serialize_to_json, write_json_to_file};
pub use files::{find_latest_report, wait_for_report};
pub use layout::{ColumnKind, ColumnLayout};
pub use units::{UNITS, Unit, unit_by_code};
pub use workbook::{Report, read_report, write_xlsx};
