use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use log::{debug, warn};
use quick_xml::events::Event;
use quick_xml::Reader;

use super::helpers::get_attribute;
use super::spectrum::parse_spectrum;
use super::{MzMLError, MzMLStreamer, OffsetSource};
use crate::mzml::models::{IndexEntry, MzMLIndex, MzMLSpectrum, OffsetIndex};

/// Default input buffer size for mzML parsing (64KB)
pub const DEFAULT_INPUT_BUFFER_SIZE: usize = 64 * 1024;

/// Bytes read from the end of the file when looking for `<indexListOffset>`
const INDEX_TAIL_SIZE: u64 = 1024;

impl MzMLStreamer<BufReader<File>> {
    /// Open an mzML file for streaming with default buffer size (64KB)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MzMLError> {
        Self::open_with_buffer_size(path, DEFAULT_INPUT_BUFFER_SIZE)
    }

    /// Open an mzML file for streaming with custom buffer size
    ///
    /// # Arguments
    /// * `path` - Path to the mzML file
    /// * `buffer_size` - Size of the input buffer in bytes
    pub fn open_with_buffer_size<P: AsRef<Path>>(
        path: P,
        buffer_size: usize,
    ) -> Result<Self, MzMLError> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::with_capacity(buffer_size, file);
        Self::new(reader)
    }

    /// Open an indexed mzML file and read the index first
    pub fn open_indexed<P: AsRef<Path>>(path: P) -> Result<Self, MzMLError> {
        Self::open_indexed_with_buffer_size(path, DEFAULT_INPUT_BUFFER_SIZE)
    }

    /// Open an indexed mzML file with custom buffer size
    pub fn open_indexed_with_buffer_size<P: AsRef<Path>>(
        path: P,
        buffer_size: usize,
    ) -> Result<Self, MzMLError> {
        let mut file = File::open(path.as_ref())?;

        // Try to read the index from the end of the file
        let index = read_index_from_tail(&mut file)?;

        // Reset to beginning
        file.seek(SeekFrom::Start(0))?;

        let reader = BufReader::with_capacity(buffer_size, file);
        let mut streamer = Self::new(reader)?;
        streamer.index = index;

        Ok(streamer)
    }
}

/// Random access by native spectrum id.
///
/// These methods reposition the underlying source, so they must not be
/// interleaved with [`MzMLStreamer::next_spectrum`] on the same streamer.
impl<R: BufRead + Seek> MzMLStreamer<R> {
    /// Build the id-to-offset table by scanning every `<spectrum>` start tag
    ///
    /// Returns the number of spectra found.
    pub fn build_index(&mut self) -> Result<usize, MzMLError> {
        let handle = self.reader.get_mut();
        handle.seek(SeekFrom::Start(0))?;

        let mut xml = Reader::from_reader(handle);
        xml.config_mut().trim_text(true);

        let mut offsets = OffsetIndex::new("spectrum");
        let mut buf = Vec::new();
        loop {
            let position = xml.buffer_position();
            match xml.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.name().as_ref() == b"spectrum" => {
                    match get_attribute(e, "id")? {
                        Some(id) => {
                            offsets.insert(id, position);
                        }
                        None => warn!("Skipping spectrum without an id at byte {position}"),
                    }
                }
                Ok(Event::End(ref e)) if e.name().as_ref() == b"spectrumList" => break,
                Ok(Event::Eof) => break,
                Err(e) => return Err(MzMLError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }

        offsets.init = true;
        let count = offsets.len();
        debug!("Indexed {count} mzML spectra by scanning");
        self.offsets = offsets;
        self.offset_source = OffsetSource::Scanned;
        Ok(count)
    }

    /// Read the spectrum with the given native id
    ///
    /// Offsets taken from the embedded index are checked against the id found
    /// at that position. When they disagree, or the embedded index has no entry
    /// for `id`, the index is rebuilt once by scanning.
    pub fn spectrum_by_id(&mut self, id: &str) -> Result<MzMLSpectrum, MzMLError> {
        self.ensure_offsets()?;

        let embedded = self.offset_source == OffsetSource::Embedded;
        match self.read_indexed(id) {
            Ok(Some(spectrum)) => return Ok(spectrum),
            Ok(None) => {}
            // The embedded index may omit spectra the file contains
            Err(MzMLError::SpectrumNotFound(_)) if embedded => {}
            Err(e) => return Err(e),
        }

        if embedded {
            warn!("Embedded mzML index is stale at spectrum '{id}', rebuilding by scanning");
            self.build_index()?;
            if let Some(spectrum) = self.read_indexed(id)? {
                return Ok(spectrum);
            }
        }

        Err(MzMLError::InvalidStructure(format!(
            "No spectrum with id '{id}' at its indexed offset"
        )))
    }

    /// Read several spectra by native id, in the order requested
    ///
    /// Fails with [`MzMLError::SpectrumNotFound`] on the first id absent
    /// from the file.
    pub fn spectra_by_ids<S: AsRef<str>>(
        &mut self,
        ids: &[S],
    ) -> Result<Vec<MzMLSpectrum>, MzMLError> {
        ids.iter()
            .map(|id| self.spectrum_by_id(id.as_ref()))
            .collect()
    }

    /// Load offsets from the embedded index, falling back to a scan
    fn ensure_offsets(&mut self) -> Result<(), MzMLError> {
        if self.offsets.init {
            return Ok(());
        }

        if !self.index.is_indexed() {
            self.index = read_index_from_tail(self.reader.get_mut())?;
        }

        if self.index.spectrum_count() > 0 {
            self.offsets = self.index.to_offset_index();
            self.offset_source = OffsetSource::Embedded;
            debug!(
                "Using embedded mzML index with {} spectra",
                self.offsets.len()
            );
            Ok(())
        } else {
            self.build_index().map(|_| ())
        }
    }

    /// Parse the spectrum at the offset recorded for `id`, if its id matches
    fn read_indexed(&mut self, id: &str) -> Result<Option<MzMLSpectrum>, MzMLError> {
        let offset = self
            .offsets
            .get(id)
            .ok_or_else(|| MzMLError::SpectrumNotFound(id.to_string()))?;
        let spectrum = self.read_spectrum_at(offset)?;
        Ok(spectrum.filter(|s| s.id == id))
    }

    /// Parse the first element at `offset` if it is a `<spectrum>`
    fn read_spectrum_at(&mut self, offset: u64) -> Result<Option<MzMLSpectrum>, MzMLError> {
        let handle = self.reader.get_mut();
        handle.seek(SeekFrom::Start(offset))?;

        let mut xml = Reader::from_reader(handle);
        xml.config_mut().trim_text(true);
        xml.config_mut().check_end_names = false;

        let mut buf = Vec::new();
        loop {
            match xml.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.name().as_ref() == b"spectrum" => {
                    return parse_spectrum(&mut xml, e, -1).map(Some);
                }
                Ok(Event::Start(_)) | Ok(Event::Empty(_)) | Ok(Event::End(_)) | Ok(Event::Eof) => {
                    return Ok(None);
                }
                Err(e) => return Err(MzMLError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }
    }
}

/// Read the index from the end of an indexed mzML file
fn read_index_from_tail<S: Read + Seek>(source: &mut S) -> Result<MzMLIndex, MzMLError> {
    let file_size = source.seek(SeekFrom::End(0))?;

    // Read the tail to find indexListOffset
    let read_size = std::cmp::min(INDEX_TAIL_SIZE, file_size);
    source.seek(SeekFrom::Start(file_size - read_size))?;

    let mut tail = vec![0u8; read_size as usize];
    source.read_exact(&mut tail)?;

    let tail_str = String::from_utf8_lossy(&tail);

    let mut index = MzMLIndex::default();
    if let Some(pos) = tail_str.find("<indexListOffset>") {
        let start = pos + "<indexListOffset>".len();
        if let Some(end) = tail_str[start..].find("</indexListOffset>") {
            if let Ok(offset) = tail_str[start..start + end].trim().parse::<u64>() {
                if offset < file_size {
                    // Seek to index and parse it
                    source.seek(SeekFrom::Start(offset))?;
                    let mut index_data = Vec::new();
                    source.read_to_end(&mut index_data)?;

                    index = parse_index_data(&index_data, offset)?;
                } else {
                    warn!("indexListOffset {offset} lies beyond the end of the file");
                }
            }
        }
    }

    Ok(index)
}

/// Parse the indexList from raw XML data
fn parse_index_data(data: &[u8], offset: u64) -> Result<MzMLIndex, MzMLError> {
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);
    // The slice starts mid-document, so closing tags of outer elements are unmatched
    reader.config_mut().check_end_names = false;

    let mut buf = Vec::new();
    let mut index = MzMLIndex {
        index_list_offset: Some(offset),
        ..Default::default()
    };

    let mut current_index_name: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"index" => {
                    current_index_name = get_attribute(e, "name")?;
                }
                b"offset" => {
                    let id = get_attribute(e, "idRef")?;
                    // Read the offset value
                    let mut offset_buf = Vec::new();
                    let offset_val = match reader.read_event_into(&mut offset_buf) {
                        Ok(Event::Text(t)) => t.unescape()?.trim().parse::<u64>().ok(),
                        _ => None,
                    };

                    if current_index_name.as_deref() == Some("spectrum") {
                        match (id, offset_val) {
                            (Some(id), Some(offset)) => {
                                index.spectrum_index.push(IndexEntry { id, offset })
                            }
                            (id, _) => warn!("Ignoring malformed index entry for {id:?}"),
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"index" => current_index_name = None,
                b"indexList" => break,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(MzMLError::XmlError(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(index)
}
