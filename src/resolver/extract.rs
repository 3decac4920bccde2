//! Field extraction from format-specific spectrum records

use crate::mzml::MzMLSpectrum;
use crate::mzxml::MzXMLScan;

/// Fields every supported spectrum shape provides for MGF output
pub trait SpectrumRecord {
    /// m/z of the first selected precursor ion
    fn precursor_mz(&self) -> Option<f64>;

    /// Charge recorded in the file for the first precursor
    fn precursor_charge(&self) -> Option<i32>;

    /// Retention time in seconds
    ///
    /// Values recorded in minutes or milliseconds are converted, so
    /// `RTINSECONDS` always holds seconds rather than the value as written.
    fn retention_time(&self) -> Option<f64>;

    /// Consume the record, returning its m/z and intensity arrays
    fn into_peaks(self) -> (Vec<f64>, Vec<f64>);
}

impl SpectrumRecord for MzMLSpectrum {
    fn precursor_mz(&self) -> Option<f64> {
        self.first_selected_ion()?.mz
    }

    /// `charge state`, else the first `possible charge state`
    fn precursor_charge(&self) -> Option<i32> {
        let ion = self.first_selected_ion()?;
        ion.charge.or_else(|| ion.possible_charges.first().copied())
    }

    fn retention_time(&self) -> Option<f64> {
        self.retention_time
    }

    fn into_peaks(self) -> (Vec<f64>, Vec<f64>) {
        (self.mz_array, self.intensity_array)
    }
}

impl SpectrumRecord for MzXMLScan {
    fn precursor_mz(&self) -> Option<f64> {
        self.precursors.first()?.mz
    }

    fn precursor_charge(&self) -> Option<i32> {
        self.precursors.first()?.charge
    }

    fn retention_time(&self) -> Option<f64> {
        self.retention_time
    }

    fn into_peaks(self) -> (Vec<f64>, Vec<f64>) {
        (self.mz_array, self.intensity_array)
    }
}
