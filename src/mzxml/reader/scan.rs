use std::io::{BufRead, Seek, SeekFrom};

use log::warn;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::helpers::{get_attribute, parse_attribute};
use super::MzXMLError;
use crate::mzml::binary::{BinaryDecoder, BinaryEncoding, CompressionType};
use crate::mzxml::models::{parse_iso8601_duration, MzXMLPrecursor, MzXMLScan};

/// Parse the first element at `offset` if it is a `<scan>`
pub(super) fn read_scan_at<R: BufRead + Seek>(
    handle: &mut R,
    offset: u64,
) -> Result<Option<MzXMLScan>, MzXMLError> {
    handle.seek(SeekFrom::Start(offset))?;
    let mut xml = Reader::from_reader(handle);
    xml.config_mut().trim_text(true);
    xml.config_mut().check_end_names = false;

    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"scan" => {
                let mut scan = scan_from_attributes(e)?;
                parse_scan_body(&mut xml, &mut scan)?;
                return Ok(Some(scan));
            }
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"scan" => {
                return scan_from_attributes(e).map(Some);
            }
            Ok(Event::Start(_)) | Ok(Event::Empty(_)) | Ok(Event::End(_)) | Ok(Event::Eof) => {
                return Ok(None);
            }
            Err(e) => return Err(MzXMLError::XmlError(e)),
            _ => {}
        }
        buf.clear();
    }
}

/// Read the attributes of a `<scan>` start tag
fn scan_from_attributes(e: &BytesStart) -> Result<MzXMLScan, MzXMLError> {
    let mut scan = MzXMLScan {
        num: get_attribute(e, "num")?.unwrap_or_default(),
        ms_level: parse_attribute(e, "msLevel")?.unwrap_or(1),
        peaks_count: parse_attribute(e, "peaksCount")?.unwrap_or(0),
        ..Default::default()
    };

    scan.polarity = match get_attribute(e, "polarity")?.as_deref() {
        Some("+") => 1,
        Some("-") => -1,
        _ => 0,
    };
    scan.centroided = matches!(
        get_attribute(e, "centroided")?.as_deref(),
        Some("1") | Some("true")
    );
    if let Some(rt) = get_attribute(e, "retentionTime")? {
        scan.retention_time = parse_iso8601_duration(&rt);
        if scan.retention_time.is_none() {
            warn!("Unparsable retentionTime '{rt}' on scan {}", scan.num);
        }
    }

    Ok(scan)
}

/// Encoding attributes of a `<peaks>` element
#[derive(Debug)]
struct PeaksContext {
    encoding: BinaryEncoding,
    compression: CompressionType,
    base64_data: String,
}

impl PeaksContext {
    fn from_attributes(e: &BytesStart) -> Result<Self, MzXMLError> {
        let precision = get_attribute(e, "precision")?.unwrap_or_else(|| "32".to_string());
        let encoding = BinaryEncoding::from_precision_bits(precision.trim()).ok_or_else(|| {
            MzXMLError::InvalidStructure(format!("Unsupported peaks precision: {precision}"))
        })?;

        let compression_attr = get_attribute(e, "compressionType")?.unwrap_or_default();
        let compression =
            CompressionType::from_mzxml_attribute(&compression_attr).ok_or_else(|| {
                MzXMLError::InvalidStructure(format!(
                    "Unsupported peaks compression: {compression_attr}"
                ))
            })?;

        if let Some(order) = get_attribute(e, "byteOrder")? {
            if order != "network" {
                return Err(MzXMLError::InvalidStructure(format!(
                    "Unsupported peaks byte order: {order}"
                )));
            }
        }

        // mzXML 3 uses contentType, earlier versions pairOrder
        let content = match get_attribute(e, "contentType")? {
            Some(content) => Some(content),
            None => get_attribute(e, "pairOrder")?,
        };
        if let Some(content) = content {
            if content != "m/z-int" && content != "mz-int" {
                return Err(MzXMLError::InvalidStructure(format!(
                    "Unsupported peaks content type: {content}"
                )));
            }
        }

        Ok(Self {
            encoding,
            compression,
            base64_data: String::new(),
        })
    }
}

/// Parse the children of a scan up to its closing tag, skipping nested scans
fn parse_scan_body<B: BufRead>(
    reader: &mut Reader<B>,
    scan: &mut MzXMLScan,
) -> Result<(), MzXMLError> {
    let mut nested_depth = 0usize;
    let mut current_precursor: Option<MzXMLPrecursor> = None;
    let mut current_peaks: Option<PeaksContext> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"scan" => nested_depth += 1,
                _ if nested_depth > 0 => {}
                b"precursorMz" => current_precursor = Some(precursor_from_attributes(e)?),
                b"peaks" => current_peaks = Some(PeaksContext::from_attributes(e)?),
                _ => {}
            },
            Ok(Event::Empty(ref e)) if nested_depth == 0 => match e.name().as_ref() {
                b"precursorMz" => scan.precursors.push(precursor_from_attributes(e)?),
                b"peaks" => {
                    PeaksContext::from_attributes(e)?;
                }
                _ => {}
            },
            Ok(Event::Text(ref t)) if nested_depth == 0 => {
                let text = t.unescape()?;
                if let Some(ref mut precursor) = current_precursor {
                    precursor.mz = text.trim().parse().ok();
                } else if let Some(ref mut peaks) = current_peaks {
                    peaks.base64_data.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"scan" if nested_depth == 0 => return Ok(()),
                b"scan" => nested_depth -= 1,
                _ if nested_depth > 0 => {}
                b"precursorMz" => {
                    if let Some(precursor) = current_precursor.take() {
                        scan.precursors.push(precursor);
                    }
                }
                b"peaks" => {
                    if let Some(peaks) = current_peaks.take() {
                        decode_peaks(scan, peaks)?;
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => {
                return Err(MzXMLError::InvalidStructure(
                    "Unexpected EOF in scan".to_string(),
                ));
            }
            Err(e) => return Err(MzXMLError::XmlError(e)),
            _ => {}
        }
        buf.clear();
    }
}

fn precursor_from_attributes(e: &BytesStart) -> Result<MzXMLPrecursor, MzXMLError> {
    Ok(MzXMLPrecursor {
        mz: None,
        charge: get_attribute(e, "precursorCharge")?.and_then(|z| parse_charge(&z)),
        intensity: parse_attribute(e, "precursorIntensity")?,
        activation_method: get_attribute(e, "activationMethod")?,
        precursor_scan_num: get_attribute(e, "precursorScanNum")?,
    })
}

/// Parse a charge, tolerating integral floats such as `"2.0"`
fn parse_charge(text: &str) -> Option<i32> {
    let text = text.trim();
    if let Ok(z) = text.parse::<i32>() {
        return Some(z);
    }
    let z: f64 = text.parse().ok()?;
    (z.fract() == 0.0 && z.abs() <= i32::MAX as f64).then_some(z as i32)
}

fn decode_peaks(scan: &mut MzXMLScan, peaks: PeaksContext) -> Result<(), MzXMLError> {
    if peaks.base64_data.trim().is_empty() {
        return Ok(());
    }

    let (mzs, intensities) = BinaryDecoder::decode_interleaved_pairs(
        &peaks.base64_data,
        peaks.encoding,
        peaks.compression,
        None,
    )?;

    if mzs.len() != scan.peaks_count {
        warn!(
            "Scan {} declares {} peaks but contains {}",
            scan.num,
            scan.peaks_count,
            mzs.len()
        );
    }

    scan.mz_array = mzs;
    scan.intensity_array = intensities;
    Ok(())
}
