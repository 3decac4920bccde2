//! Failure records for manifest groups that could not be converted
//!
//! Each failed group leaves one CSV row in
//! `<pipeline dir>/failed_logs_<task id>/<manifest name>.csv`:
//!
//! ```text
//! "MSV000080000/ccms_peak/run1.mzML","Unsupported file type: run1.raw",12
//! ```

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

/// Errors writing a failure record
#[derive(Debug, thiserror::Error)]
pub enum FailureLogError {
    /// Could not create the directory or file
    #[error("Failed to write failure log: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV serialization error
    #[error("Failed to write failure log: {0}")]
    CsvError(#[from] csv::Error),
}

/// Why one manifest group failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    /// Spectrum file the group refers to
    pub filename: String,
    /// Human-readable failure description
    pub error_message: String,
    /// Number of spectra requested by the group
    pub spectra_count: usize,
}

impl FailureRecord {
    /// Create a failure record
    pub fn new(
        filename: impl Into<String>,
        error_message: impl Into<String>,
        spectra_count: usize,
    ) -> Self {
        Self {
            filename: filename.into(),
            error_message: error_message.into(),
            spectra_count,
        }
    }
}

/// Directory of per-manifest failure files
#[derive(Debug, Clone)]
pub struct FailureLog {
    dir: PathBuf,
}

impl FailureLog {
    /// Failure directory under `pipeline_dir`, scoped to `task_id` when given
    pub fn new<P: AsRef<Path>>(pipeline_dir: P, task_id: Option<&str>) -> Self {
        let name = match task_id {
            Some(id) if !id.is_empty() => format!("failed_logs_{id}"),
            _ => "failed_logs".to_string(),
        };
        Self {
            dir: pipeline_dir.as_ref().join(name),
        }
    }

    /// Directory failure files are written to
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Failure file for a manifest: its file name with `.csv` appended
    pub fn path_for<P: AsRef<Path>>(&self, manifest_path: P) -> PathBuf {
        let manifest_path = manifest_path.as_ref();
        let name = manifest_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown_file".to_string());
        self.dir.join(format!("{name}.csv"))
    }

    /// Write `record` for `manifest_path`, replacing any earlier record
    pub fn write<P: AsRef<Path>>(
        &self,
        manifest_path: P,
        record: &FailureRecord,
    ) -> Result<PathBuf, FailureLogError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(manifest_path);

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::NonNumeric)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(File::create(&path)?);
        writer.serialize(record)?;
        writer.flush()?;

        info!("Wrote {}", path.display());
        Ok(path)
    }
}
