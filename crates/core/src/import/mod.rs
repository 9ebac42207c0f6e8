//! Import module - CSV import of applications and export of board rows.

mod csv_export;
mod csv_import;

pub use csv_export::write_rows_csv;
pub use csv_import::{parse_applications_csv, ImportOutcome, ImportRowError};
