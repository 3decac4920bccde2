//! # mzgroup - Annotated spectra from the MassIVE archive as MGF
//!
//! `mzgroup` is one stage of a proteomics identification pipeline. For one
//! manifest group (a TSV listing scans of a single spectrum file together with
//! their peptide annotations) it fetches the mzML/mzXML file from the MassIVE
//! FTP archive, looks up the requested scans and writes them as an annotated
//! MGF file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mzgroup::failure::FailureLog;
//! use mzgroup::pipeline::{GroupOutcome, GroupProcessor};
//! use mzgroup::remote::{ArchiveLayout, FtpTransport, RemoteLocator};
//!
//! let layout = ArchiveLayout::default();
//! let transport = FtpTransport::new(layout.host.clone(), layout.port);
//! let locator = RemoteLocator::new(transport, layout);
//! let mut processor = GroupProcessor::new(locator, FailureLog::new(".", Some("1")));
//!
//! match processor.process("group_run1.tsv")? {
//!     GroupOutcome::Converted { output, spectra } => {
//!         println!("Wrote {spectra} spectra to {}", output.display())
//!     }
//!     GroupOutcome::Failed { log_path, .. } => println!("Wrote {}", log_path.display()),
//! }
//! # Ok::<(), mzgroup::pipeline::UnrecordedFailure>(())
//! ```
//!
//! ## Resolving Local Files
//!
//! ```rust,no_run
//! use mzgroup::manifest::Manifest;
//! use mzgroup::mgf::write_mgf_file;
//! use mzgroup::resolver::resolve;
//!
//! let manifest = Manifest::from_tsv_file("group_run1.tsv")?;
//! let spectra = resolve("run1.mzML", manifest.rows())?;
//! write_mgf_file("group_run1.tsv.mgf", &spectra)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`manifest`]: TSV manifests and grouping of large TSVs
//! - [`remote`]: path rewrites, prefix fallback and FTP transport
//! - [`mzml`]: streaming and random-access mzML reader
//! - [`mzxml`]: random-access mzXML reader
//! - [`resolver`]: scan id templates and precursor field extraction
//! - [`mgf`]: MGF writer
//! - [`failure`]: per-group failure records
//! - [`pipeline`]: one manifest group from download to MGF

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod failure;
pub mod manifest;
pub mod mgf;
pub mod mzml;
pub mod mzxml;
pub mod pipeline;
pub mod remote;
pub mod resolver;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::failure::{FailureLog, FailureRecord};
    pub use crate::manifest::{Manifest, ManifestRow};
    pub use crate::mgf::{write_mgf_file, MgfSpectrum, MgfWriter};
    pub use crate::mzml::{MzMLSpectrum, MzMLStreamer};
    pub use crate::mzxml::{MzXMLReader, MzXMLScan};
    pub use crate::pipeline::{GroupOutcome, GroupProcessor};
    pub use crate::remote::{ArchiveLayout, FetchedFile, FtpTransport, RemoteLocator, Transport};
    pub use crate::resolver::{resolve, resolve_with, SourceFormat, SpectrumLookup, SpectrumRecord};
}
