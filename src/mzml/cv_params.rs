//! Controlled Vocabulary (CV) parameter handling for mzML
//!
//! mzML describes spectra with CV terms from the PSI-MS ontology. Only the
//! terms needed to pull precursor, scan and binary array information out of a
//! spectrum are mapped here.

/// A controlled vocabulary parameter from mzML
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CvParam {
    /// CV reference (e.g., "MS" for PSI-MS)
    pub cv_ref: String,

    /// Accession number (e.g., "MS:1000511")
    pub accession: String,

    /// Human-readable name
    pub name: String,

    /// Optional value
    pub value: Option<String>,

    /// Unit accession
    pub unit_accession: Option<String>,

    /// Unit name
    pub unit_name: Option<String>,
}

impl CvParam {
    /// Get the value as f64 if possible
    pub fn value_as_f64(&self) -> Option<f64> {
        self.value.as_ref()?.trim().parse().ok()
    }

    /// Get the value as i64 if possible
    pub fn value_as_i64(&self) -> Option<i64> {
        self.value.as_ref()?.trim().parse().ok()
    }

    /// Get an integral value, tolerating writers that emit charges as `"2.0"`
    pub fn value_as_charge(&self) -> Option<i32> {
        if let Some(v) = self.value_as_i64() {
            return i32::try_from(v).ok();
        }
        let v = self.value_as_f64()?;
        if v.fract() == 0.0 && v.abs() <= i32::MAX as f64 {
            Some(v as i32)
        } else {
            None
        }
    }
}

/// MS CV accessions read by the spectrum parser
#[allow(non_snake_case)]
pub mod MS_CV_ACCESSIONS {
    // =========================================================================
    // Spectrum type
    // =========================================================================

    /// MS level
    pub const MS_LEVEL: &str = "MS:1000511";

    /// Centroid spectrum
    pub const CENTROID_SPECTRUM: &str = "MS:1000127";

    /// Profile spectrum
    pub const PROFILE_SPECTRUM: &str = "MS:1000128";

    /// Positive scan
    pub const POSITIVE_SCAN: &str = "MS:1000130";

    /// Negative scan
    pub const NEGATIVE_SCAN: &str = "MS:1000129";

    // =========================================================================
    // Scan properties
    // =========================================================================

    /// Scan start time (retention time)
    pub const SCAN_START_TIME: &str = "MS:1000016";

    // =========================================================================
    // Precursor/isolation
    // =========================================================================

    /// Selected ion m/z
    pub const SELECTED_ION_MZ: &str = "MS:1000744";

    /// Peak intensity (for selected ion)
    pub const PEAK_INTENSITY: &str = "MS:1000042";

    /// Charge state
    pub const CHARGE_STATE: &str = "MS:1000041";

    /// Possible charge state, written when the instrument could not decide
    pub const POSSIBLE_CHARGE_STATE: &str = "MS:1000633";

    /// Isolation window target m/z
    pub const ISOLATION_WINDOW_TARGET_MZ: &str = "MS:1000827";

    /// Isolation window lower offset
    pub const ISOLATION_WINDOW_LOWER_OFFSET: &str = "MS:1000828";

    /// Isolation window upper offset
    pub const ISOLATION_WINDOW_UPPER_OFFSET: &str = "MS:1000829";

    // =========================================================================
    // Activation/fragmentation
    // =========================================================================

    /// Collision energy
    pub const COLLISION_ENERGY: &str = "MS:1000045";

    /// Collision-induced dissociation (CID)
    pub const CID: &str = "MS:1000133";

    /// Beam-type CID (HCD)
    pub const HCD: &str = "MS:1000422";

    /// Electron transfer dissociation (ETD)
    pub const ETD: &str = "MS:1000598";

    /// Electron capture dissociation (ECD)
    pub const ECD: &str = "MS:1000250";

    // =========================================================================
    // Binary data encoding
    // =========================================================================

    /// 32-bit float
    pub const FLOAT_32_BIT: &str = "MS:1000521";

    /// 64-bit float
    pub const FLOAT_64_BIT: &str = "MS:1000523";

    /// zlib compression
    pub const ZLIB_COMPRESSION: &str = "MS:1000574";

    /// No compression
    pub const NO_COMPRESSION: &str = "MS:1000576";

    // =========================================================================
    // Binary array types
    // =========================================================================

    /// m/z array
    pub const MZ_ARRAY: &str = "MS:1000514";

    /// Intensity array
    pub const INTENSITY_ARRAY: &str = "MS:1000515";

    // =========================================================================
    // Time units
    // =========================================================================

    /// Minute (UO)
    pub const UNIT_MINUTE: &str = "UO:0000031";

    /// Millisecond (UO)
    pub const UNIT_MILLISECOND: &str = "UO:0000028";
}

/// Extract a CV parameter value from a list by accession
pub fn extract_cv_value(cv_params: &[CvParam], accession: &str) -> Option<String> {
    cv_params
        .iter()
        .find(|p| p.accession == accession)
        .and_then(|p| p.value.clone())
}

/// Convert retention time to seconds based on unit
///
/// `scan start time` is usually written in minutes; the raw value is never
/// passed through.
pub fn normalize_retention_time(value: f64, unit_accession: Option<&str>) -> f64 {
    match unit_accession {
        Some(MS_CV_ACCESSIONS::UNIT_MINUTE) => value * 60.0,
        Some(MS_CV_ACCESSIONS::UNIT_MILLISECOND) => value / 1000.0,
        _ => value, // Default to seconds
    }
}
