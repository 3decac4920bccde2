/// Errors that can occur while reading or splitting manifests
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// I/O error reading or writing a manifest
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// TSV parsing or deserialization error
    #[error("TSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    /// Required column absent from the header
    #[error("Missing required manifest column: {0}")]
    MissingColumn(String),

    /// Header present but no data rows
    #[error("Manifest has no rows")]
    Empty,
}
