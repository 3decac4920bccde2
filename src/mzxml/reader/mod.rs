//! Random-access mzXML reader using quick-xml

use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::Path;

use log::{debug, warn};

use crate::mzml::{OffsetIndex, DEFAULT_INPUT_BUFFER_SIZE};

use super::models::MzXMLScan;

pub use error::MzXMLError;

mod error;
mod helpers;
mod index;
mod scan;


/// Reader for mzXML files addressed by scan number
pub struct MzXMLReader<R: BufRead + Seek> {
    handle: R,
    offsets: OffsetIndex,
    from_embedded_index: bool,
}

impl MzXMLReader<BufReader<File>> {
    /// Open an mzXML file and load its scan index
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MzXMLError> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::with_capacity(DEFAULT_INPUT_BUFFER_SIZE, file))
    }
}

impl<R: BufRead + Seek> MzXMLReader<R> {
    /// Create a reader over a seekable source
    ///
    /// The embedded `<index name="scan">` is used when the file declares one;
    /// otherwise every `<scan>` start tag is located by scanning the file.
    pub fn new(mut handle: R) -> Result<Self, MzXMLError> {
        let embedded = index::read_index_from_tail(&mut handle)?;
        let mut reader = Self {
            handle,
            offsets: OffsetIndex::new("scan"),
            from_embedded_index: false,
        };

        match embedded {
            Some(offsets) if !offsets.is_empty() => {
                debug!("Using embedded mzXML index with {} scans", offsets.len());
                reader.offsets = offsets;
                reader.from_embedded_index = true;
            }
            _ => {
                reader.build_index()?;
            }
        }

        Ok(reader)
    }

    /// Number of indexed scans
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether the file contains no scans
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Scan numbers in document order
    pub fn scan_ids(&self) -> impl Iterator<Item = &str> {
        self.offsets.iter().map(|(id, _)| id.as_ref())
    }

    /// Rebuild the scan index by scanning the whole file
    ///
    /// Returns the number of scans found.
    pub fn build_index(&mut self) -> Result<usize, MzXMLError> {
        self.offsets = index::scan_offsets(&mut self.handle)?;
        self.from_embedded_index = false;
        debug!("Indexed {} mzXML scans by scanning", self.offsets.len());
        Ok(self.offsets.len())
    }

    /// Read the scan with the given `num`
    ///
    /// A stale or incomplete embedded index is rebuilt once by scanning.
    pub fn scan_by_id(&mut self, id: &str) -> Result<MzXMLScan, MzXMLError> {
        let embedded = self.from_embedded_index;
        match self.read_indexed(id) {
            Ok(Some(scan)) => return Ok(scan),
            Ok(None) => {}
            Err(MzXMLError::ScanNotFound(_)) if embedded => {}
            Err(e) => return Err(e),
        }

        if embedded {
            warn!("Embedded mzXML index is stale at scan '{id}', rebuilding by scanning");
            self.build_index()?;
            if let Some(scan) = self.read_indexed(id)? {
                return Ok(scan);
            }
        }

        Err(MzXMLError::InvalidStructure(format!(
            "No scan with num '{id}' at its indexed offset"
        )))
    }

    /// Read several scans by number, in the order requested
    ///
    /// Fails with [`MzXMLError::ScanNotFound`] on the first number absent
    /// from the file.
    pub fn scans_by_ids<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<Vec<MzXMLScan>, MzXMLError> {
        ids.iter().map(|id| self.scan_by_id(id.as_ref())).collect()
    }

    fn read_indexed(&mut self, id: &str) -> Result<Option<MzXMLScan>, MzXMLError> {
        let offset = self
            .offsets
            .get(id)
            .ok_or_else(|| MzXMLError::ScanNotFound(id.to_string()))?;
        let scan = scan::read_scan_at(&mut self.handle, offset)?;
        Ok(scan.filter(|s| s.num == id))
    }
}
