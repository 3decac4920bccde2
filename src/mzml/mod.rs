//! # mzML Parser Module
//!
//! This module provides pull parsing of mzML files, the XML-based community
//! standard for mass spectrometry data defined by HUPO-PSI, with random
//! access to spectra by native id.
//!
//! Native ids depend on the converter that produced the file, e.g.
//! `controllerType=0 controllerNumber=1 scan=42` for Thermo-derived files
//! or `scan=42` for most others.
//!
//! ## mzML Structure
//!
//! ```text
//! indexedmzML (optional wrapper)
//! └── mzML
//!     ├── cvList (controlled vocabularies)
//!     ├── fileDescription
//!     │   ├── fileContent
//!     │   └── sourceFileList
//!     ├── softwareList
//!     ├── instrumentConfigurationList
//!     ├── dataProcessingList
//!     └── run
//!         ├── spectrumList
//!         │   └── spectrum* (many)
//!         │       ├── cvParam*
//!         │       ├── scanList
//!         │       ├── precursorList (for MS2+)
//!         │       └── binaryDataArrayList
//!         │           └── binaryDataArray*
//!         │               ├── cvParam* (encoding info)
//!         │               └── binary (base64 data)
//!         └── chromatogramList (optional)
//! indexList (indexedmzML only, offsets of each spectrum)
//! ```

pub mod binary;
pub mod cv_params;
mod models;
mod streamer;

pub use binary::{BinaryDecoder, BinaryEncoding, ByteOrder, CompressionType};
pub use cv_params::{extract_cv_value, CvParam, MS_CV_ACCESSIONS};
pub use models::*;
pub use streamer::{MzMLError, MzMLStreamer, SpectrumIterator, DEFAULT_INPUT_BUFFER_SIZE};
