//! Row File Adapter
//!
//! Reads the caller's tabular rows from a JSON array, feeds their addresses
//! to the resolver and writes the rows back with the geocoding column
//! filled in. Auxiliary columns are carried through untouched.

use crate::domain::services::{Projection, ResultProjector};
use crate::domain::value_objects::Address;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One input row.
///
/// Only `address` and `geocoding` are interpreted. Every other column
/// (category, date, note, anything else) is kept verbatim in `extra`,
/// explicit nulls included. A null or missing `address`/`geocoding` is
/// written back as a missing column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geocoding: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Row {
    pub fn category(&self) -> Option<&serde_json::Value> {
        self.column("category")
    }

    pub fn date(&self) -> Option<&serde_json::Value> {
        self.column("date")
    }

    pub fn note(&self) -> Option<&serde_json::Value> {
        self.column("note")
    }

    fn column(&self, name: &str) -> Option<&serde_json::Value> {
        self.extra.get(name).filter(|v| !v.is_null())
    }

    fn has_coordinates(&self) -> bool {
        self.geocoding
            .as_deref()
            .map(|g| !g.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Entry of the "needs manual correction" report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedRow {
    /// 1-based row position
    pub row: usize,
    pub category: Option<serde_json::Value>,
    pub address: String,
    pub date: Option<serde_json::Value>,
}

/// Errors reading or writing row files.
#[derive(Debug, thiserror::Error)]
pub enum RowFileError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read rows from a JSON array file.
pub fn read_rows(path: impl AsRef<Path>) -> Result<Vec<Row>, RowFileError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| RowFileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| RowFileError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Write any serializable value as pretty JSON.
pub fn write_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<(), RowFileError> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(value).map_err(|source| RowFileError::Json {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, text).map_err(|source| RowFileError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Addresses to submit, one per row.
///
/// With `skip_prefilled`, rows that already carry coordinates are submitted
/// as blank so the resolver skips them and their value is preserved.
pub fn addresses(rows: &[Row], skip_prefilled: bool) -> Vec<Address> {
    rows.iter()
        .map(|row| {
            if skip_prefilled && row.has_coordinates() {
                Address::default()
            } else {
                Address::from(row.address.clone())
            }
        })
        .collect()
}

/// The current geocoding column.
pub fn existing_fields(rows: &[Row]) -> Vec<Option<String>> {
    rows.iter().map(|row| row.geocoding.clone()).collect()
}

/// Write a projection's fields back into the rows.
pub fn apply_projection(rows: &mut [Row], projection: &Projection) {
    for (row, field) in rows.iter_mut().zip(projection.fields.iter()) {
        row.geocoding = field.clone();
    }
}

/// Rows with an address but no coordinates, after projection.
pub fn unresolved_report(rows: &[Row]) -> Vec<UnresolvedRow> {
    let addresses: Vec<Address> = rows
        .iter()
        .map(|row| Address::from(row.address.clone()))
        .collect();
    let fields = existing_fields(rows);

    ResultProjector::unresolved_rows(&addresses, &fields)
        .into_iter()
        .map(|n| {
            let row = &rows[n - 1];
            UnresolvedRow {
                row: n,
                category: row.category().cloned(),
                address: row.address.clone().unwrap_or_default(),
                date: row.date().cloned(),
            }
        })
        .collect()
}

/// Write the unresolved-row report for `rows` to `path`.
///
/// The file is always rewritten, as `[]` when nothing is left, so a report
/// from an earlier run never outlives the rows it described.
pub fn write_unresolved_report(
    path: impl AsRef<Path>,
    rows: &[Row],
) -> Result<Vec<UnresolvedRow>, RowFileError> {
    let report = unresolved_report(rows);
    write_json(path, &report)?;
    Ok(report)
}
