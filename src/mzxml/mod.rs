//! # mzXML Reader Module
//!
//! Random-access parsing of mzXML files, the older ISB/SPC format still
//! common in public proteomics archives.
//!
//! ## mzXML Structure
//!
//! ```text
//! mzXML
//! ├── msRun
//! │   ├── parentFile*, msInstrument*, dataProcessing*
//! │   └── scan* (may nest: MS2 scans inside their MS1 survey scan)
//! │       ├── precursorMz* (text: m/z; attrs: precursorCharge, ...)
//! │       └── peaks (base64, network byte order, m/z-int pairs)
//! ├── index name="scan"
//! │   └── offset id="<num>"*
//! ├── indexOffset
//! └── sha1
//! ```
//!
//! Scans are addressed by their `num` attribute.

mod models;
mod reader;

pub use models::{parse_iso8601_duration, MzXMLPrecursor, MzXMLScan};
pub use reader::{MzXMLError, MzXMLReader};
