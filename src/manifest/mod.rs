//! Tab-separated manifests of requested scans
//!
//! A manifest lists the scans to extract from one spectrum file:
//!
//! ```text
//! filename                            scan   annotation   charge
//! MSV000080000/ccms_peak/run1.mzML    5      PEPTIDE      2
//! MSV000080000/ccms_peak/run1.mzML    9      PEPTIDEK
//! ```
//!
//! `charge` is optional and may be empty; extra columns are ignored.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::warn;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

pub use error::ManifestError;
pub use group::{sanitize_group_key, split_by_column, GroupFile};

mod error;
mod group;

/// Columns every manifest must carry
pub const REQUIRED_COLUMNS: [&str; 3] = ["filename", "scan", "annotation"];

/// One requested scan
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestRow {
    /// Logical archive path of the spectrum file
    pub filename: String,

    /// Scan number
    #[serde(deserialize_with = "deserialize_scan")]
    pub scan: u64,

    /// Peptide annotation, written as `SEQ`
    pub annotation: String,

    /// Charge to use when the spectrum does not carry one
    #[serde(default, deserialize_with = "deserialize_charge")]
    pub charge: Option<i32>,
}

/// All rows of one manifest, in file order
#[derive(Debug, Clone)]
pub struct Manifest {
    rows: Vec<ManifestRow>,
}

impl Manifest {
    /// Parse a manifest from a TSV file
    pub fn from_tsv_file<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse a manifest from a reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ManifestError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(ManifestError::MissingColumn(column.to_string()));
            }
        }

        let rows = csv_reader
            .deserialize::<ManifestRow>()
            .collect::<Result<Vec<_>, _>>()?;

        let Some(first) = rows.first() else {
            return Err(ManifestError::Empty);
        };
        let stray = rows.iter().filter(|r| r.filename != first.filename).count();
        if stray > 0 {
            warn!(
                "{stray} manifest rows name a file other than {}; only {} is fetched",
                first.filename, first.filename
            );
        }

        Ok(Self { rows })
    }

    /// The spectrum file shared by the rows (the first row's filename)
    pub fn filename(&self) -> &str {
        // Non-empty by construction
        self.rows.first().map(|r| r.filename.as_str()).unwrap_or_default()
    }

    /// Rows in file order
    pub fn rows(&self) -> &[ManifestRow] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false for a parsed manifest
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse an integer written either plainly or as an integral float (`"5.0"`)
fn parse_integral(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(v) = text.parse::<i64>() {
        return Some(v);
    }
    let v: f64 = text.parse().ok()?;
    (v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64).then_some(v as i64)
}

fn deserialize_scan<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_integral(&text)
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| D::Error::custom(format!("invalid scan number '{text}'")))
}

fn deserialize_charge<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    let Some(text) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let text = text.trim();
    // Missing values as written by dataframe tools
    if text.is_empty() || text.eq_ignore_ascii_case("nan") || text.eq_ignore_ascii_case("na") {
        return Ok(None);
    }
    parse_integral(text)
        .and_then(|v| i32::try_from(v).ok())
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("invalid charge '{text}'")))
}
