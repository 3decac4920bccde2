//! Resolving manifest rows to annotated spectra
//!
//! Files written by different converters use different native id formats for
//! the same scan number. Each format carries an ordered list of id templates;
//! all requested scans are looked up with the first template, then the next
//! one if any scan is missing, and so on. The first template that finds every
//! scan is used for the whole file.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::{debug, info};

use crate::manifest::ManifestRow;
use crate::mgf::MgfSpectrum;
use crate::mzml::{MzMLSpectrum, MzMLStreamer};
use crate::mzxml::{MzXMLReader, MzXMLScan};

pub use error::{LookupError, ResolveError};
pub use extract::SpectrumRecord;

mod error;
mod extract;

#[cfg(test)]
mod tests;

/// A native id format with a single `%d` placeholder for the scan number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanIdTemplate(&'static str);

impl ScanIdTemplate {
    /// Template from a pattern containing `%d`
    pub const fn new(pattern: &'static str) -> Self {
        Self(pattern)
    }

    /// The raw pattern
    pub fn pattern(&self) -> &'static str {
        self.0
    }

    /// Native id for a scan number
    pub fn render(&self, scan: u64) -> String {
        self.0.replacen("%d", &scan.to_string(), 1)
    }
}

impl std::fmt::Display for ScanIdTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

const MZML_TEMPLATES: &[ScanIdTemplate] = &[
    ScanIdTemplate::new("controllerType=0 controllerNumber=1 scan=%d"),
    ScanIdTemplate::new("scan=%d"),
];

const MZXML_TEMPLATES: &[ScanIdTemplate] = &[ScanIdTemplate::new("%d")];

/// Spectrum file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// HUPO-PSI mzML
    MzML,
    /// ISB mzXML
    MzXML,
}

impl SourceFormat {
    /// Format from a file name; extensions are case-sensitive
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let name = path.as_ref().file_name()?.to_str()?;
        if name.ends_with(".mzML") {
            Some(Self::MzML)
        } else if name.ends_with(".mzXML") {
            Some(Self::MzXML)
        } else {
            None
        }
    }

    /// Id templates to try, in order
    pub fn id_templates(&self) -> &'static [ScanIdTemplate] {
        match self {
            Self::MzML => MZML_TEMPLATES,
            Self::MzXML => MZXML_TEMPLATES,
        }
    }
}

/// Bulk lookup of spectra by native id
pub trait SpectrumLookup {
    /// Record type produced by the lookup
    type Spectrum: SpectrumRecord;

    /// Fetch every id, in order
    ///
    /// Fails with [`LookupError::NotFound`] if any id is absent.
    fn get_by_ids(&mut self, ids: &[String]) -> Result<Vec<Self::Spectrum>, LookupError>;
}

impl<R: std::io::BufRead + std::io::Seek> SpectrumLookup for MzMLStreamer<R> {
    type Spectrum = MzMLSpectrum;

    fn get_by_ids(&mut self, ids: &[String]) -> Result<Vec<MzMLSpectrum>, LookupError> {
        Ok(self.spectra_by_ids(ids)?)
    }
}

impl<R: std::io::BufRead + std::io::Seek> SpectrumLookup for MzXMLReader<R> {
    type Spectrum = MzXMLScan;

    fn get_by_ids(&mut self, ids: &[String]) -> Result<Vec<MzXMLScan>, LookupError> {
        Ok(self.scans_by_ids(ids)?)
    }
}

/// An opened spectrum file of either format
pub enum SpectrumSource {
    /// mzML file
    MzML(MzMLStreamer<BufReader<File>>),
    /// mzXML file
    MzXML(MzXMLReader<BufReader<File>>),
}

impl SpectrumSource {
    /// Open a local file, choosing the reader by extension
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ResolveError> {
        let path = path.as_ref();
        let format = SourceFormat::from_path(path)
            .ok_or_else(|| ResolveError::UnsupportedFormat(path.to_path_buf()))?;

        let source = match format {
            SourceFormat::MzML => {
                Self::MzML(MzMLStreamer::open_indexed(path).map_err(LookupError::from)?)
            }
            SourceFormat::MzXML => {
                Self::MzXML(MzXMLReader::open(path).map_err(LookupError::from)?)
            }
        };
        debug!("Opened {} as {:?}", path.display(), format);
        Ok(source)
    }

    /// Format of the opened file
    pub fn format(&self) -> SourceFormat {
        match self {
            Self::MzML(_) => SourceFormat::MzML,
            Self::MzXML(_) => SourceFormat::MzXML,
        }
    }

    /// Resolve rows against this file
    pub fn resolve(
        &mut self,
        source_name: &str,
        rows: &[ManifestRow],
    ) -> Result<Vec<MgfSpectrum>, ResolveError> {
        let templates = self.format().id_templates();
        match self {
            Self::MzML(streamer) => resolve_with(streamer, templates, source_name, rows),
            Self::MzXML(reader) => resolve_with(reader, templates, source_name, rows),
        }
    }
}

/// Resolve rows against a local spectrum file
///
/// The file name of `local_path` is used in each record's `TITLE`.
pub fn resolve<P: AsRef<Path>>(
    local_path: P,
    rows: &[ManifestRow],
) -> Result<Vec<MgfSpectrum>, ResolveError> {
    let local_path = local_path.as_ref();
    let source_name = local_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| local_path.display().to_string());

    SpectrumSource::open(local_path)?.resolve(&source_name, rows)
}

/// Resolve rows through any [`SpectrumLookup`], trying `templates` in order
pub fn resolve_with<L: SpectrumLookup>(
    lookup: &mut L,
    templates: &[ScanIdTemplate],
    source_name: &str,
    rows: &[ManifestRow],
) -> Result<Vec<MgfSpectrum>, ResolveError> {
    let mut found = None;
    for template in templates {
        let ids: Vec<String> = rows.iter().map(|row| template.render(row.scan)).collect();
        match lookup.get_by_ids(&ids) {
            Ok(spectra) => {
                debug!(
                    "Template '{template}' matched {} scans in {source_name}",
                    spectra.len()
                );
                found = Some(spectra);
                break;
            }
            Err(LookupError::NotFound(id)) => {
                debug!("Template '{template}' missed id '{id}' in {source_name}");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let spectra = found.ok_or_else(|| ResolveError::NoMatchingTemplate {
        templates: templates.iter().map(|t| t.pattern().to_string()).collect(),
        file: source_name.to_string(),
    })?;
    if spectra.len() != rows.len() {
        return Err(ResolveError::CountMismatch {
            requested: rows.len(),
            returned: spectra.len(),
            file: source_name.to_string(),
        });
    }

    let records = rows
        .iter()
        .zip(spectra)
        .map(|(row, spectrum)| to_mgf(spectrum, row, source_name))
        .collect::<Result<Vec<_>, _>>()?;

    info!("Resolved {} spectra from {source_name}", records.len());
    Ok(records)
}

fn to_mgf<S: SpectrumRecord>(
    spectrum: S,
    row: &ManifestRow,
    source_name: &str,
) -> Result<MgfSpectrum, ResolveError> {
    let pepmass = spectrum
        .precursor_mz()
        .ok_or_else(|| ResolveError::MissingPrecursor {
            scan: row.scan,
            file: source_name.to_string(),
        })?;
    let charge = spectrum.precursor_charge().or(row.charge);
    let rt_seconds = spectrum.retention_time();
    let (mz_array, intensity_array) = spectrum.into_peaks();

    Ok(MgfSpectrum {
        mz_array,
        intensity_array,
        title: format!("{source_name}:scan:{}", row.scan),
        pepmass,
        rt_seconds,
        charge,
        seq: row.annotation.clone(),
    })
}
