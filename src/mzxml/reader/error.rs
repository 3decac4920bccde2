/// Errors that can occur during mzXML parsing
#[derive(Debug, thiserror::Error)]
pub enum MzXMLError {
    /// Error parsing XML
    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error decoding the peak list
    #[error("Binary decode error: {0}")]
    BinaryError(#[from] crate::mzml::binary::BinaryDecodeError),

    /// Invalid mzXML document structure
    #[error("Invalid mzXML structure: {0}")]
    InvalidStructure(String),

    /// UTF-8 encoding error in attribute values
    #[error("UTF-8 encoding error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    /// No scan with the requested number exists in the file
    #[error("Scan not found: {0}")]
    ScanNotFound(String),
}
