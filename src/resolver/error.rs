use std::path::PathBuf;

use crate::mzml::MzMLError;
use crate::mzxml::MzXMLError;

/// Errors from a bulk spectrum lookup
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// At least one requested id is absent from the file
    #[error("No spectrum with id '{0}'")]
    NotFound(String),

    /// mzML reader failure
    #[error(transparent)]
    MzML(MzMLError),

    /// mzXML reader failure
    #[error(transparent)]
    MzXML(MzXMLError),
}

impl From<MzMLError> for LookupError {
    fn from(err: MzMLError) -> Self {
        match err {
            MzMLError::SpectrumNotFound(id) => Self::NotFound(id),
            other => Self::MzML(other),
        }
    }
}

impl From<MzXMLError> for LookupError {
    fn from(err: MzXMLError) -> Self {
        match err {
            MzXMLError::ScanNotFound(id) => Self::NotFound(id),
            other => Self::MzXML(other),
        }
    }
}

/// Errors from resolving manifest rows to annotated spectra
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The file extension is neither `.mzML` nor `.mzXML`
    #[error("Unsupported file type: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Every id template failed to find the requested scans
    #[error("Tried to get scans with [{}] from {file} but no template matched", .templates.join(", "))]
    NoMatchingTemplate {
        /// Templates attempted, in order
        templates: Vec<String>,
        /// File searched
        file: String,
    },

    /// A spectrum carries no precursor m/z
    #[error("Spectrum for scan {scan} in {file} has no precursor m/z")]
    MissingPrecursor {
        /// Requested scan number
        scan: u64,
        /// File searched
        file: String,
    },

    /// The lookup returned a different number of spectra than ids requested
    #[error("Requested {requested} scans from {file} but the reader returned {returned}")]
    CountMismatch {
        /// Number of ids requested
        requested: usize,
        /// Number of spectra returned
        returned: usize,
        /// File searched
        file: String,
    },

    /// Reader failure other than a missing id
    #[error(transparent)]
    Lookup(#[from] LookupError),
}
