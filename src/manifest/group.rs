use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::ManifestError;

/// One per-group manifest written by [`split_by_column`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFile {
    /// Sanitized group key used in the file name
    pub key: String,
    /// Path of the written TSV
    pub path: PathBuf,
    /// Number of data rows in the group
    pub rows: usize,
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`
pub fn sanitize_group_key(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Split a TSV into `group_<value>.tsv` files, one per distinct value of `column`
///
/// Every output keeps the input header and the input row order. Rows with an
/// empty value in `column` belong to no group and are skipped. Values that
/// sanitize to the same key share one file. Groups are returned in key order.
pub fn split_by_column<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    column: &str,
    out_dir: Q,
) -> Result<Vec<GroupFile>, ManifestError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .has_headers(true)
        .from_path(input.as_ref())?;

    let headers = reader.headers()?.clone();
    let column_index = headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| ManifestError::MissingColumn(column.to_string()))?;

    let mut groups: BTreeMap<String, Vec<csv::StringRecord>> = BTreeMap::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record?;
        match record.get(column_index).map(str::trim) {
            Some(value) if !value.is_empty() => {
                groups
                    .entry(sanitize_group_key(value))
                    .or_default()
                    .push(record);
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("Skipped {skipped} rows with no value in column '{column}'");
    }

    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)?;

    let mut written = Vec::with_capacity(groups.len());
    for (key, records) in groups {
        let path = out_dir.join(format!("group_{key}.tsv"));
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_writer(File::create(&path)?);
        writer.write_record(&headers)?;
        for record in &records {
            writer.write_record(record)?;
        }
        writer.flush()?;

        written.push(GroupFile {
            key,
            path,
            rows: records.len(),
        });
    }

    info!(
        "Split {} into {} groups by '{column}'",
        input.as_ref().display(),
        written.len()
    );
    Ok(written)
}
