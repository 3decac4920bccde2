use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::helpers::{get_attribute, parse_cv_param};
use super::{MzMLError, MzMLStreamer};
use crate::mzml::binary::{BinaryDecoder, BinaryEncoding, CompressionType};
use crate::mzml::cv_params::{normalize_retention_time, CvParam, MS_CV_ACCESSIONS};
use crate::mzml::models::{MzMLSpectrum, Precursor, SelectedIon};

impl<R: BufRead> MzMLStreamer<R> {
    /// Read the next spectrum from the stream
    pub fn next_spectrum(&mut self) -> Result<Option<MzMLSpectrum>, MzMLError> {
        if !self.in_spectrum_list {
            self.seek_spectrum_list()?;
            if !self.in_spectrum_list {
                return Ok(None);
            }
        }

        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    if e.name().as_ref() == b"spectrum" {
                        let spectrum =
                            parse_spectrum(&mut self.reader, &e, self.current_spectrum_index)?;
                        self.current_spectrum_index += 1;
                        return Ok(Some(spectrum));
                    }
                }
                Ok(Event::End(ref e)) => {
                    if e.name().as_ref() == b"spectrumList" {
                        self.in_spectrum_list = false;
                        return Ok(None);
                    }
                }
                Ok(Event::Eof) => return Ok(None),
                Err(e) => return Err(MzMLError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }
    }

    /// Advance to the opening `<spectrumList>` tag
    fn seek_spectrum_list(&mut self) -> Result<(), MzMLError> {
        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.name().as_ref() == b"spectrumList" => {
                    self.spectrum_count = get_attribute(e, "count")?.and_then(|c| c.parse().ok());
                    self.in_spectrum_list = true;
                    return Ok(());
                }
                Ok(Event::Eof) => return Ok(()),
                Err(e) => return Err(MzMLError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }
    }
}

/// Parse a single spectrum element whose start tag has just been read
pub(super) fn parse_spectrum<B: BufRead>(
    reader: &mut Reader<B>,
    start_event: &BytesStart,
    fallback_index: i64,
) -> Result<MzMLSpectrum, MzMLError> {
    let mut ctx = SpectrumContext::default();

    // Get attributes from spectrum element
    ctx.spectrum.index = get_attribute(start_event, "index")?
        .and_then(|s| s.parse().ok())
        .unwrap_or(fallback_index);
    ctx.spectrum.id = get_attribute(start_event, "id")?.unwrap_or_default();
    ctx.spectrum.default_array_length = get_attribute(start_event, "defaultArrayLength")?
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let mut depth = 1;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                depth += 1;
                match e.name().as_ref() {
                    b"cvParam" => ctx.accept_cv_param(parse_cv_param(e)?),
                    b"binaryDataArray" => {
                        ctx.current_binary_array = Some(BinaryArrayContext {
                            array_length: get_attribute(e, "arrayLength")?
                                .and_then(|s| s.parse().ok()),
                            ..Default::default()
                        });
                    }
                    name => ctx.open_element(name, e)?,
                }
            }
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"cvParam" => ctx.accept_cv_param(parse_cv_param(e)?),
                b"selectedIon" | b"scan" | b"precursor" => {
                    ctx.open_element(e.name().as_ref(), e)?;
                    ctx.close_element(e.name().as_ref())?;
                }
                _ => {}
            },
            Ok(Event::Text(ref t)) => {
                if let Some(ref mut array) = ctx.current_binary_array {
                    array.base64_data.push_str(&t.unescape()?);
                }
            }
            Ok(Event::End(ref e)) => {
                depth -= 1;
                if e.name().as_ref() == b"spectrum" && depth == 0 {
                    break;
                }
                ctx.close_element(e.name().as_ref())?;
            }
            Ok(Event::Eof) => {
                return Err(MzMLError::InvalidStructure(
                    "Unexpected EOF in spectrum".to_string(),
                ));
            }
            Err(e) => return Err(MzMLError::XmlError(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(ctx.spectrum)
}

/// Parser state for one `<spectrum>` element
#[derive(Debug, Default)]
struct SpectrumContext {
    spectrum: MzMLSpectrum,
    in_scan_list: bool,
    scans_seen: usize,
    in_precursor_list: bool,
    in_selected_ion: bool,
    current_precursor: Option<Precursor>,
    current_binary_array: Option<BinaryArrayContext>,
}

impl SpectrumContext {
    fn open_element(&mut self, name: &[u8], e: &BytesStart) -> Result<(), MzMLError> {
        match name {
            b"scanList" => self.in_scan_list = true,
            b"scan" => {
                if self.in_scan_list {
                    self.scans_seen += 1;
                }
            }
            b"precursorList" => self.in_precursor_list = true,
            b"precursor" => {
                self.current_precursor = Some(Precursor {
                    spectrum_ref: get_attribute(e, "spectrumRef")?,
                    ..Default::default()
                });
            }
            b"selectedIon" => {
                if let Some(ref mut prec) = self.current_precursor {
                    prec.selected_ions.push(SelectedIon::default());
                    self.in_selected_ion = true;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close_element(&mut self, name: &[u8]) -> Result<(), MzMLError> {
        match name {
            b"scanList" => self.in_scan_list = false,
            b"precursorList" => self.in_precursor_list = false,
            b"precursor" => {
                if let Some(prec) = self.current_precursor.take() {
                    self.spectrum.precursors.push(prec);
                }
            }
            b"selectedIon" => self.in_selected_ion = false,
            b"binaryDataArray" => {
                if let Some(array) = self.current_binary_array.take() {
                    decode_binary_array(&mut self.spectrum, array)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Route a cvParam to the element currently open
    fn accept_cv_param(&mut self, cv_param: CvParam) {
        if let Some(ref mut array) = self.current_binary_array {
            array.cv_params.push(cv_param);
        } else if self.in_precursor_list {
            if let Some(ref mut prec) = self.current_precursor {
                if self.in_selected_ion {
                    if let Some(ion) = prec.selected_ions.last_mut() {
                        apply_selected_ion_cv_param(ion, &cv_param);
                    }
                } else {
                    apply_precursor_cv_param(prec, &cv_param);
                }
                prec.cv_params.push(cv_param);
            }
        } else if self.in_scan_list {
            // Only the first scan contributes timing
            if self.scans_seen <= 1 {
                apply_scan_cv_param(&mut self.spectrum, &cv_param);
            }
            self.spectrum.cv_params.push(cv_param);
        } else {
            apply_spectrum_cv_param(&mut self.spectrum, &cv_param);
            self.spectrum.cv_params.push(cv_param);
        }
    }
}

/// Apply CV param to spectrum-level properties
fn apply_spectrum_cv_param(spectrum: &mut MzMLSpectrum, cv: &CvParam) {
    match cv.accession.as_str() {
        MS_CV_ACCESSIONS::MS_LEVEL => {
            spectrum.ms_level = cv.value_as_i64().unwrap_or(1) as i16;
        }
        MS_CV_ACCESSIONS::CENTROID_SPECTRUM => {
            spectrum.centroided = true;
        }
        MS_CV_ACCESSIONS::PROFILE_SPECTRUM => {
            spectrum.centroided = false;
        }
        MS_CV_ACCESSIONS::POSITIVE_SCAN => {
            spectrum.polarity = 1;
        }
        MS_CV_ACCESSIONS::NEGATIVE_SCAN => {
            spectrum.polarity = -1;
        }
        _ => {}
    }
}

/// Apply CV param to scan properties
fn apply_scan_cv_param(spectrum: &mut MzMLSpectrum, cv: &CvParam) {
    match cv.accession.as_str() {
        MS_CV_ACCESSIONS::SCAN_START_TIME => {
            if let Some(val) = cv.value_as_f64() {
                spectrum.retention_time =
                    Some(normalize_retention_time(val, cv.unit_accession.as_deref()));
            }
        }
        _ => apply_spectrum_cv_param(spectrum, cv),
    }
}

/// Apply CV param to precursor properties
fn apply_precursor_cv_param(precursor: &mut Precursor, cv: &CvParam) {
    match cv.accession.as_str() {
        MS_CV_ACCESSIONS::ISOLATION_WINDOW_TARGET_MZ => {
            precursor.isolation_window_target = cv.value_as_f64();
        }
        MS_CV_ACCESSIONS::ISOLATION_WINDOW_LOWER_OFFSET => {
            precursor.isolation_window_lower = cv.value_as_f64();
        }
        MS_CV_ACCESSIONS::ISOLATION_WINDOW_UPPER_OFFSET => {
            precursor.isolation_window_upper = cv.value_as_f64();
        }
        MS_CV_ACCESSIONS::COLLISION_ENERGY => {
            precursor.collision_energy = cv.value_as_f64();
        }
        MS_CV_ACCESSIONS::CID
        | MS_CV_ACCESSIONS::HCD
        | MS_CV_ACCESSIONS::ETD
        | MS_CV_ACCESSIONS::ECD => {
            precursor.activation_method = Some(cv.name.clone());
        }
        _ => {}
    }
}

/// Apply CV param to a selected ion
fn apply_selected_ion_cv_param(ion: &mut SelectedIon, cv: &CvParam) {
    match cv.accession.as_str() {
        MS_CV_ACCESSIONS::SELECTED_ION_MZ => {
            ion.mz = cv.value_as_f64();
        }
        MS_CV_ACCESSIONS::PEAK_INTENSITY => {
            ion.intensity = cv.value_as_f64();
        }
        MS_CV_ACCESSIONS::CHARGE_STATE => {
            ion.charge = cv.value_as_charge();
        }
        MS_CV_ACCESSIONS::POSSIBLE_CHARGE_STATE => {
            if let Some(z) = cv.value_as_charge() {
                ion.possible_charges.push(z);
            }
        }
        _ => {}
    }
}

/// Decode binary array and add to spectrum
fn decode_binary_array(
    spectrum: &mut MzMLSpectrum,
    ctx: BinaryArrayContext,
) -> Result<(), MzMLError> {
    let mut encoding = BinaryEncoding::Float64;
    let mut compression = CompressionType::None;
    let mut is_mz = false;
    let mut is_intensity = false;

    for cv in &ctx.cv_params {
        match cv.accession.as_str() {
            MS_CV_ACCESSIONS::FLOAT_32_BIT => encoding = BinaryEncoding::Float32,
            MS_CV_ACCESSIONS::FLOAT_64_BIT => encoding = BinaryEncoding::Float64,
            MS_CV_ACCESSIONS::ZLIB_COMPRESSION => compression = CompressionType::Zlib,
            MS_CV_ACCESSIONS::NO_COMPRESSION => compression = CompressionType::None,
            MS_CV_ACCESSIONS::MZ_ARRAY => is_mz = true,
            MS_CV_ACCESSIONS::INTENSITY_ARRAY => is_intensity = true,
            other => {
                if let Some(c) = CompressionType::from_cv_accession(other) {
                    compression = c;
                }
            }
        }
    }

    // Auxiliary arrays (charge, noise, ...) may use integer encodings
    if !(is_mz || is_intensity) || ctx.base64_data.trim().is_empty() {
        return Ok(());
    }

    let expected = ctx.array_length.unwrap_or(spectrum.default_array_length);
    let values = BinaryDecoder::decode(&ctx.base64_data, encoding, compression, Some(expected))?;

    if is_mz {
        spectrum.mz_array = values;
    } else {
        spectrum.intensity_array = values;
    }

    Ok(())
}

/// Context for parsing binary data arrays
#[derive(Debug, Default)]
struct BinaryArrayContext {
    cv_params: Vec<CvParam>,
    array_length: Option<usize>,
    base64_data: String,
}
