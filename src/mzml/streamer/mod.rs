//! Streaming mzML parser using quick-xml
//!
//! This module provides a pull-based parser for mzML files. Spectra can be
//! read in document order, or, when the underlying source is seekable, looked
//! up by native id through the file's embedded offset index (or one built by
//! scanning the file when the embedded index is absent or stale).

use std::io::BufRead;

use quick_xml::Reader;

use super::models::{MzMLIndex, OffsetIndex};

pub use error::MzMLError;
pub use index::DEFAULT_INPUT_BUFFER_SIZE;
pub use iterators::SpectrumIterator;

mod error;
mod helpers;
mod index;
mod iterators;
mod spectrum;


/// Where the current offset table came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OffsetSource {
    /// Nothing loaded yet
    None,
    /// Read from the `<indexList>` at the end of the file
    Embedded,
    /// Built by scanning every `<spectrum>` start tag
    Scanned,
}

/// Streaming parser for mzML files
pub struct MzMLStreamer<R: BufRead> {
    reader: Reader<R>,
    index: MzMLIndex,
    offsets: OffsetIndex,
    offset_source: OffsetSource,
    in_spectrum_list: bool,
    spectrum_count: Option<usize>,
    current_spectrum_index: i64,
}

impl<R: BufRead> MzMLStreamer<R> {
    /// Create a new streamer from a BufRead source
    pub fn new(reader: R) -> Result<Self, MzMLError> {
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.config_mut().trim_text(true);

        Ok(Self {
            reader: xml_reader,
            index: MzMLIndex::default(),
            offsets: OffsetIndex::new("spectrum"),
            offset_source: OffsetSource::None,
            in_spectrum_list: false,
            spectrum_count: None,
            current_spectrum_index: 0,
        })
    }

    /// Get the index if available
    pub fn index(&self) -> &MzMLIndex {
        &self.index
    }

    /// Get expected spectrum count
    pub fn spectrum_count(&self) -> Option<usize> {
        if self.index.is_indexed() {
            Some(self.index.spectrum_count())
        } else {
            self.spectrum_count
        }
    }

    /// Iterate over all spectra
    pub fn spectra(self) -> SpectrumIterator<R> {
        SpectrumIterator { streamer: self }
    }
}
