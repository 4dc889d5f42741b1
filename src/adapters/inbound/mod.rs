pub mod row_file;

pub use row_file::{read_rows, write_json, write_unresolved_report, Row, RowFileError, UnresolvedRow};
