use std::io::BufRead;

use super::{MzMLError, MzMLStreamer};
use crate::mzml::models::MzMLSpectrum;

/// Iterator over spectra in an mzML file
pub struct SpectrumIterator<R: BufRead> {
    pub(super) streamer: MzMLStreamer<R>,
}

impl<R: BufRead> Iterator for SpectrumIterator<R> {
    type Item = Result<MzMLSpectrum, MzMLError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.streamer.next_spectrum() {
            Ok(Some(spectrum)) => Some(Ok(spectrum)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
