//! MGF (Mascot Generic Format) output
//!
//! Each spectrum becomes one `BEGIN IONS` / `END IONS` block:
//!
//! ```text
//! BEGIN IONS
//! TITLE=run.mzML:scan:5
//! PEPMASS=445.12
//! RTINSECONDS=60.5
//! CHARGE=2+
//! SEQ=PEPTIDE
//! 150.50000 1000.0
//! END IONS
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::debug;
use tempfile::NamedTempFile;

/// Default number of decimals written for fragment m/z values
pub const DEFAULT_MZ_DECIMALS: usize = 5;

/// Default number of decimals written for fragment intensities
pub const DEFAULT_INTENSITY_DECIMALS: usize = 1;

/// One annotated spectrum ready for MGF output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MgfSpectrum {
    /// Fragment m/z values
    pub mz_array: Vec<f64>,
    /// Fragment intensities, parallel to `mz_array`
    pub intensity_array: Vec<f64>,
    /// `TITLE`, `<file>:scan:<scan>`
    pub title: String,
    /// `PEPMASS`, the precursor m/z
    pub pepmass: f64,
    /// `RTINSECONDS`; written as `-1` when unknown
    pub rt_seconds: Option<f64>,
    /// `CHARGE`; omitted when unknown
    pub charge: Option<i32>,
    /// `SEQ`, the peptide annotation
    pub seq: String,
}

/// Writes [`MgfSpectrum`] blocks to any byte sink
pub struct MgfWriter<W: Write> {
    handle: BufWriter<W>,
    mz_decimals: usize,
    intensity_decimals: usize,
    written: usize,
}

impl<W: Write> MgfWriter<W> {
    /// Create a writer with the default fragment precision
    pub fn new(sink: W) -> Self {
        Self {
            handle: BufWriter::new(sink),
            mz_decimals: DEFAULT_MZ_DECIMALS,
            intensity_decimals: DEFAULT_INTENSITY_DECIMALS,
            written: 0,
        }
    }

    /// Set the decimals written for fragment m/z and intensity
    pub fn with_precision(mut self, mz_decimals: usize, intensity_decimals: usize) -> Self {
        self.mz_decimals = mz_decimals;
        self.intensity_decimals = intensity_decimals;
        self
    }

    /// Number of spectra written so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Write a header `KEY=value`
    pub fn write_kv(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.handle.write_all(key.as_bytes())?;
        self.handle.write_all(b"=")?;
        self.handle.write_all(value.as_bytes())?;
        self.handle.write_all(b"\n")?;
        Ok(())
    }

    /// Write one spectrum from `BEGIN IONS` to the blank line after `END IONS`
    pub fn write(&mut self, spectrum: &MgfSpectrum) -> io::Result<()> {
        if spectrum.mz_array.len() != spectrum.intensity_array.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Spectrum {} has {} m/z values but {} intensities",
                    spectrum.title,
                    spectrum.mz_array.len(),
                    spectrum.intensity_array.len()
                ),
            ));
        }

        self.handle.write_all(b"BEGIN IONS\n")?;
        self.write_kv("TITLE", &spectrum.title)?;
        self.write_kv("PEPMASS", &format_float(spectrum.pepmass))?;
        let rt = spectrum
            .rt_seconds
            .map(format_float)
            .unwrap_or_else(|| "-1".to_string());
        self.write_kv("RTINSECONDS", &rt)?;
        if let Some(charge) = spectrum.charge {
            self.write_kv("CHARGE", &format_charge(charge))?;
        }
        self.write_kv("SEQ", &spectrum.seq)?;

        for (mz, intensity) in spectrum.mz_array.iter().zip(&spectrum.intensity_array) {
            writeln!(
                self.handle,
                "{:.mz_prec$} {:.int_prec$}",
                mz,
                intensity,
                mz_prec = self.mz_decimals,
                int_prec = self.intensity_decimals
            )?;
        }

        self.handle.write_all(b"END IONS\n\n")?;
        self.written += 1;
        Ok(())
    }

    /// Flush buffered output and return the sink
    pub fn into_inner(self) -> io::Result<W> {
        self.handle.into_inner().map_err(|e| e.into_error())
    }
}

/// Shortest round-trip representation, always with a decimal point
fn format_float(value: f64) -> String {
    format!("{value:?}")
}

/// `2` becomes `2+`, `-1` becomes `1-`
fn format_charge(charge: i32) -> String {
    if charge < 0 {
        format!("{}-", charge.unsigned_abs())
    } else {
        format!("{charge}+")
    }
}

/// Write `spectra` to `path` atomically
///
/// Output goes to a temporary file in the destination directory which is
/// renamed over `path` only after everything has been written, so a failure
/// never leaves a partial file behind.
pub fn write_mgf_file<P: AsRef<Path>>(path: P, spectra: &[MgfSpectrum]) -> io::Result<usize> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let temp = NamedTempFile::new_in(dir)?;
    let mut writer = MgfWriter::new(temp.as_file());
    for spectrum in spectra {
        writer.write(spectrum)?;
    }
    let written = writer.written();
    let file: &File = writer.into_inner()?;
    file.sync_all()?;

    temp.persist(path).map_err(|e| e.error)?;
    debug!("Wrote {} spectra to {}", written, path.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> MgfSpectrum {
        MgfSpectrum {
            mz_array: vec![150.5, 250.123456],
            intensity_array: vec![1000.0, 20.06],
            title: "file.mzML:scan:5".to_string(),
            pepmass: 445.12,
            rt_seconds: Some(60.5),
            charge: Some(2),
            seq: "PEPTIDE".to_string(),
        }
    }

    fn render(spectra: &[MgfSpectrum]) -> String {
        let mut writer = MgfWriter::new(Vec::new());
        for s in spectra {
            writer.write(s).unwrap();
        }
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_block_layout() {
        let text = render(&[example()]);
        assert_eq!(
            text,
            "BEGIN IONS\n\
             TITLE=file.mzML:scan:5\n\
             PEPMASS=445.12\n\
             RTINSECONDS=60.5\n\
             CHARGE=2+\n\
             SEQ=PEPTIDE\n\
             150.50000 1000.0\n\
             250.12346 20.1\n\
             END IONS\n\n"
        );
    }

    #[test]
    fn test_missing_rt_and_charge() {
        let spectrum = MgfSpectrum {
            rt_seconds: None,
            charge: None,
            pepmass: 500.0,
            ..example()
        };
        let text = render(&[spectrum]);
        assert!(text.contains("PEPMASS=500.0\n"));
        assert!(text.contains("RTINSECONDS=-1\n"));
        assert!(!text.contains("CHARGE="));
    }

    #[test]
    fn test_negative_charge() {
        assert_eq!(format_charge(-3), "3-");
        assert_eq!(format_charge(1), "1+");
    }

    #[test]
    fn test_custom_precision() {
        let mut writer = MgfWriter::new(Vec::new()).with_precision(2, 0);
        writer.write(&example()).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert!(text.contains("150.50 1000\n"));
    }

    #[test]
    fn test_mismatched_arrays_rejected() {
        let spectrum = MgfSpectrum {
            intensity_array: vec![1.0],
            ..example()
        };
        let mut writer = MgfWriter::new(Vec::new());
        let err = writer.write(&spectrum).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_write_mgf_file_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group.tsv.mgf");
        std::fs::write(&path, "stale").unwrap();

        let written = write_mgf_file(&path, &[example(), example()]).unwrap();
        assert_eq!(written, 2);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("BEGIN IONS").count(), 2);
        assert!(!text.contains("stale"));
        // Only the target remains in the directory
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
