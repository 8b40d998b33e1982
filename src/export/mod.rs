pub mod bcf;
pub mod csv;
pub mod json;

pub use crate::error::ExportError;
pub use self::csv::{export_csv, rows_to_csv, CsvOptions};
