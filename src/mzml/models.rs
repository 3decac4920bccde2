//! Data models for mzML structures
//!
//! These models carry the parts of an mzML spectrum needed to build MGF
//! records: identity, scan timing, precursor ions and the peak arrays.

use indexmap::IndexMap;

use super::cv_params::CvParam;

/// Represents a single spectrum from an mzML file
#[derive(Debug, Clone, Default)]
pub struct MzMLSpectrum {
    /// Spectrum index (0-based)
    pub index: i64,

    /// Native spectrum ID from the file
    pub id: String,

    /// Default array length (number of peaks)
    pub default_array_length: usize,

    /// MS level (1 for MS1, 2 for MS2, etc.)
    pub ms_level: i16,

    /// Whether this is a centroid (true) or profile (false) spectrum
    pub centroided: bool,

    /// Polarity: 1 for positive, -1 for negative, 0 for unknown
    pub polarity: i8,

    /// Scan start time of the first scan, in seconds
    pub retention_time: Option<f64>,

    /// Precursor information (for MS2+ spectra)
    pub precursors: Vec<Precursor>,

    /// m/z array (decoded)
    pub mz_array: Vec<f64>,

    /// Intensity array (decoded)
    pub intensity_array: Vec<f64>,

    /// Spectrum-level and scan-level CV parameters
    pub cv_params: Vec<CvParam>,
}

impl MzMLSpectrum {
    /// The first selected ion of the first precursor, if any
    pub fn first_selected_ion(&self) -> Option<&SelectedIon> {
        self.precursors.first()?.selected_ions.first()
    }
}

/// Precursor ion information for MS2+ spectra
#[derive(Debug, Clone, Default)]
pub struct Precursor {
    /// Reference to the precursor spectrum ID
    pub spectrum_ref: Option<String>,

    /// Isolation window target m/z
    pub isolation_window_target: Option<f64>,

    /// Isolation window lower offset
    pub isolation_window_lower: Option<f64>,

    /// Isolation window upper offset
    pub isolation_window_upper: Option<f64>,

    /// Selected ions, in document order
    pub selected_ions: Vec<SelectedIon>,

    /// Activation method (CID, HCD, ETD, etc.)
    pub activation_method: Option<String>,

    /// Collision energy
    pub collision_energy: Option<f64>,

    /// CV parameters for this precursor
    pub cv_params: Vec<CvParam>,
}

/// A selected ion inside a precursor's `selectedIonList`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectedIon {
    /// Selected ion m/z
    pub mz: Option<f64>,

    /// Peak intensity
    pub intensity: Option<f64>,

    /// Charge state, when the instrument determined one
    pub charge: Option<i32>,

    /// Candidate charge states, when it did not
    pub possible_charges: Vec<i32>,
}

/// Index entry for indexed mzML files
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// Referenced element id
    pub id: String,
    /// Byte offset of the element start
    pub offset: u64,
}

/// Complete spectrum index from indexedmzML
#[derive(Debug, Clone, Default)]
pub struct MzMLIndex {
    /// Entries of `<index name="spectrum">`
    pub spectrum_index: Vec<IndexEntry>,
    /// Offset of `<indexList>` when the file declares one
    pub index_list_offset: Option<u64>,
}

impl MzMLIndex {
    /// Check if this is an indexed file
    pub fn is_indexed(&self) -> bool {
        self.index_list_offset.is_some()
    }

    /// Get spectrum count
    pub fn spectrum_count(&self) -> usize {
        self.spectrum_index.len()
    }

    /// Convert the spectrum entries into a lookup table
    pub fn to_offset_index(&self) -> OffsetIndex {
        let mut offsets = OffsetIndex::new("spectrum");
        for entry in &self.spectrum_index {
            offsets.insert(entry.id.as_str(), entry.offset);
        }
        offsets.init = true;
        offsets
    }
}

/// An ordered mapping from native id to byte offset
#[derive(Debug, Clone, Default)]
pub struct OffsetIndex {
    /// Element name the offsets point at
    pub name: String,

    /// Offsets in document order
    pub offsets: IndexMap<Box<str>, u64>,

    /// Whether the index has been populated, possibly with zero entries
    pub init: bool,
}

impl OffsetIndex {
    /// Create an empty, uninitialized index
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get the offset of the specified id
    #[inline]
    pub fn get(&self, key: &str) -> Option<u64> {
        self.offsets.get(key).copied()
    }

    /// Insert `key`; a duplicate id keeps its first position and takes the new offset
    #[inline]
    pub fn insert<T: Into<Box<str>>>(&mut self, key: T, offset: u64) -> Option<u64> {
        self.offsets.insert(key.into(), offset)
    }

    /// Number of indexed ids
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether no ids are indexed
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Iterate over ids and offsets in document order
    pub fn iter(&self) -> indexmap::map::Iter<'_, Box<str>, u64> {
        self.offsets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_index_preserves_order() {
        let mut index = OffsetIndex::new("spectrum");
        index.insert("scan=3", 300);
        index.insert("scan=1", 100);
        index.insert("scan=2", 200);

        let ids: Vec<&str> = index.iter().map(|(k, _)| k.as_ref()).collect();
        assert_eq!(ids, vec!["scan=3", "scan=1", "scan=2"]);
        assert_eq!(index.get("scan=1"), Some(100));
        assert_eq!(index.get("scan=9"), None);
    }

    #[test]
    fn test_first_selected_ion() {
        let spectrum = MzMLSpectrum {
            precursors: vec![Precursor {
                selected_ions: vec![
                    SelectedIon {
                        mz: Some(500.25),
                        ..Default::default()
                    },
                    SelectedIon {
                        mz: Some(600.0),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(spectrum.first_selected_ion().and_then(|i| i.mz), Some(500.25));
        assert!(MzMLSpectrum::default().first_selected_ion().is_none());
    }
}
