//! Conversion of one manifest group to MGF
//!
//! ```text
//! manifest -> RemoteLocator -> local file -> resolver -> MGF
//!                  |                             |
//!                  +-------> FailureLog <--------+
//! ```
//!
//! Every failure after the manifest is read ends in exactly one failure
//! record; the downloaded file is removed on every exit path.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::{error, info};

use crate::failure::{FailureLog, FailureLogError, FailureRecord};
use crate::manifest::Manifest;
use crate::mgf::write_mgf_file;
use crate::remote::{FetchError, RemoteLocator, Transport};
use crate::resolver::{ResolveError, SpectrumSource};

/// Spectrum file name recorded when the manifest itself is unreadable
pub const UNKNOWN_SOURCE_FILE: &str = "unknown_mzml_file";

/// Result of processing one manifest group
#[derive(Debug, Clone, PartialEq)]
pub enum GroupOutcome {
    /// MGF file written
    Converted {
        /// Path of the MGF file
        output: PathBuf,
        /// Number of spectra written
        spectra: usize,
    },
    /// Failure record written
    Failed {
        /// What was recorded
        record: FailureRecord,
        /// Path of the failure file
        log_path: PathBuf,
    },
}

/// A failure that could not be written to the failure log
#[derive(Debug, thiserror::Error)]
#[error("{source}; original error: {}", record.error_message)]
pub struct UnrecordedFailure {
    /// Record that was meant to be written
    pub record: FailureRecord,
    /// Why writing it failed
    #[source]
    pub source: FailureLogError,
}

impl GroupOutcome {
    /// Whether the group was converted
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Converted { .. })
    }
}

/// MGF output path for a manifest: its path with `.mgf` appended
pub fn output_path_for<P: AsRef<Path>>(manifest_path: P) -> PathBuf {
    let mut name = OsString::from(manifest_path.as_ref().as_os_str());
    name.push(".mgf");
    PathBuf::from(name)
}

/// Converts manifest groups, recording failures
pub struct GroupProcessor<T: Transport> {
    locator: RemoteLocator<T>,
    failure_log: FailureLog,
}

impl<T: Transport> GroupProcessor<T> {
    /// Create a processor
    pub fn new(locator: RemoteLocator<T>, failure_log: FailureLog) -> Self {
        Self {
            locator,
            failure_log,
        }
    }

    /// Convert the group described by `manifest_path`
    ///
    /// Only a failure to write the failure record is returned as an error.
    pub fn process<P: AsRef<Path>>(
        &mut self,
        manifest_path: P,
    ) -> Result<GroupOutcome, UnrecordedFailure> {
        let manifest_path = manifest_path.as_ref();

        let manifest = match Manifest::from_tsv_file(manifest_path) {
            Ok(manifest) => manifest,
            Err(e) => {
                let message = format!(
                    "Failed to read manifest {}: {e}",
                    manifest_path.display()
                );
                let record = FailureRecord::new(UNKNOWN_SOURCE_FILE, message, 0);
                return self.fail(manifest_path, record);
            }
        };

        let logical_path = manifest.filename().to_string();
        let spectra_count = manifest.len();
        info!("Processing {spectra_count} spectra from {logical_path}");

        let fetched = match self.locator.locate_and_fetch(&logical_path) {
            Ok(fetched) => fetched,
            Err(e) => {
                let message = fetch_failure_message(&logical_path, &e);
                return self.fail(
                    manifest_path,
                    FailureRecord::new(logical_path, message, spectra_count),
                );
            }
        };

        let remote_path = fetched.remote_path().to_string();
        let converted = convert(fetched.local_path(), manifest_path, &manifest);
        drop(fetched);

        match converted {
            Ok((output, spectra)) => {
                info!("Wrote {spectra} spectra to {}", output.display());
                Ok(GroupOutcome::Converted { output, spectra })
            }
            Err(e) => {
                let message = conversion_failure_message(&remote_path, &e);
                self.fail(
                    manifest_path,
                    FailureRecord::new(remote_path, message, spectra_count),
                )
            }
        }
    }

    fn fail(
        &self,
        manifest_path: &Path,
        record: FailureRecord,
    ) -> Result<GroupOutcome, UnrecordedFailure> {
        error!("{}", record.error_message);
        match self.failure_log.write(manifest_path, &record) {
            Ok(log_path) => Ok(GroupOutcome::Failed { record, log_path }),
            Err(source) => Err(UnrecordedFailure { record, source }),
        }
    }
}

/// Why a fetched group could not be converted
#[derive(Debug, thiserror::Error)]
enum ConversionError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Failed to write MGF: {0}")]
    Write(#[from] std::io::Error),
}

fn convert(
    local_path: &Path,
    manifest_path: &Path,
    manifest: &Manifest,
) -> Result<(PathBuf, usize), ConversionError> {
    let source_name = local_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| local_path.display().to_string());

    let records = SpectrumSource::open(local_path)?.resolve(&source_name, manifest.rows())?;

    let output = output_path_for(manifest_path);
    let spectra = write_mgf_file(&output, &records)?;
    Ok((output, spectra))
}

fn fetch_failure_message(logical_path: &str, err: &FetchError) -> String {
    match err {
        FetchError::Exhausted { .. } => err.to_string(),
        other => format!("Error processing {logical_path}: {other}"),
    }
}

fn conversion_failure_message(remote_path: &str, err: &ConversionError) -> String {
    match err {
        ConversionError::Resolve(ResolveError::UnsupportedFormat(_)) => {
            format!("Unsupported file type: {remote_path}")
        }
        ConversionError::Resolve(ResolveError::NoMatchingTemplate { templates, .. }) => format!(
            "Tried to get scans with [{}] from {remote_path} but no template matched",
            templates.join(", ")
        ),
        other => format!("Error processing {remote_path}: {other}"),
    }
}
