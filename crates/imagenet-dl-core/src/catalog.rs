//! Input CSV loading: one class identifier per row from the `wnid` column.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use crate::class_id::ClassId;
use crate::config::ConfigError;

/// Name of the required identifier column.
pub const WNID_COLUMN: &str = "wnid";

/// Loads class identifiers from `path` in file order.
///
/// Other columns are ignored, rows with an empty `wnid` are skipped, and
/// repeated identifiers are kept only once (first occurrence).
pub fn load_class_ids(path: &Path) -> Result<Vec<ClassId>, ConfigError> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::CsvMissing {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let csv_err = |source| ConfigError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers().map_err(csv_err)?.clone();
    let column = headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}') == WNID_COLUMN)
        .ok_or_else(|| ConfigError::MissingColumn {
            path: path.to_path_buf(),
            found: headers.iter().map(str::to_string).collect(),
        })?;

    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let raw = record.get(column).unwrap_or("");
        if raw.trim().is_empty() {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let id = ClassId::parse(raw)
            .map_err(|source| ConfigError::InvalidIdentifier { line, source })?;
        if seen.insert(id.clone()) {
            ids.push(id);
        } else {
            tracing::warn!(line, wnid = %id, "duplicate identifier in CSV, keeping first occurrence");
        }
    }

    if ids.is_empty() {
        return Err(ConfigError::NoIdentifiers {
            path: path.to_path_buf(),
        });
    }
    Ok(ids)
}
