use std::io::{BufRead, Read, Seek, SeekFrom};

use log::warn;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::helpers::get_attribute;
use super::MzXMLError;
use crate::mzml::OffsetIndex;

/// Bytes read from the end of the file when looking for `<indexOffset>`
const INDEX_TAIL_SIZE: u64 = 1024;

/// Read the `<index name="scan">` declared by `<indexOffset>`, if any
pub(super) fn read_index_from_tail<S: Read + Seek>(
    source: &mut S,
) -> Result<Option<OffsetIndex>, MzXMLError> {
    let file_size = source.seek(SeekFrom::End(0))?;
    let read_size = std::cmp::min(INDEX_TAIL_SIZE, file_size);
    source.seek(SeekFrom::Start(file_size - read_size))?;

    let mut tail = vec![0u8; read_size as usize];
    source.read_exact(&mut tail)?;
    let tail_str = String::from_utf8_lossy(&tail);

    let Some(pos) = tail_str.find("<indexOffset>") else {
        return Ok(None);
    };
    let start = pos + "<indexOffset>".len();
    let Some(end) = tail_str[start..].find("</indexOffset>") else {
        return Ok(None);
    };
    let offset = match tail_str[start..start + end].trim().parse::<u64>() {
        // Writers without an index emit an offset of 0
        Ok(offset) if offset > 0 && offset < file_size => offset,
        _ => return Ok(None),
    };

    source.seek(SeekFrom::Start(offset))?;
    let mut index_data = Vec::new();
    source.read_to_end(&mut index_data)?;

    parse_index_data(&index_data).map(Some)
}

/// Parse `<index name="scan">` entries from raw XML data
fn parse_index_data(data: &[u8]) -> Result<OffsetIndex, MzXMLError> {
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);
    // The slice starts mid-document, so the closing </mzXML> is unmatched
    reader.config_mut().check_end_names = false;

    let mut offsets = OffsetIndex::new("scan");
    let mut in_scan_index = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"index" => {
                    in_scan_index = get_attribute(e, "name")?.as_deref() == Some("scan");
                }
                b"offset" if in_scan_index => {
                    let id = get_attribute(e, "id")?;
                    let mut offset_buf = Vec::new();
                    let value = match reader.read_event_into(&mut offset_buf) {
                        Ok(Event::Text(t)) => t.unescape()?.trim().parse::<u64>().ok(),
                        _ => None,
                    };
                    match (id, value) {
                        (Some(id), Some(value)) => {
                            offsets.insert(id, value);
                        }
                        (id, _) => warn!("Ignoring malformed mzXML index entry for {id:?}"),
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"index" => {
                if in_scan_index {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(MzXMLError::XmlError(e)),
            _ => {}
        }
        buf.clear();
    }

    offsets.init = true;
    Ok(offsets)
}

/// Locate every `<scan>` start tag, nested or not
pub(super) fn scan_offsets<R: BufRead + Seek>(handle: &mut R) -> Result<OffsetIndex, MzXMLError> {
    handle.seek(SeekFrom::Start(0))?;
    let mut xml = Reader::from_reader(handle);
    xml.config_mut().trim_text(true);

    let mut offsets = OffsetIndex::new("scan");
    let mut buf = Vec::new();
    loop {
        let position = xml.buffer_position();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"scan" => {
                match get_attribute(e, "num")? {
                    Some(num) => {
                        offsets.insert(num, position);
                    }
                    None => warn!("Skipping scan without a num attribute at byte {position}"),
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"msRun" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(MzXMLError::XmlError(e)),
            _ => {}
        }
        buf.clear();
    }

    offsets.init = true;
    Ok(offsets)
}
