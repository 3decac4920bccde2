//! Locating and fetching spectrum files from the MassIVE archive
//!
//! A logical path such as `MSV000080000/ccms_peak/run1.mzML` is stored on the
//! FTP server under one of several top-level prefixes:
//!
//! ```text
//! z01/<path>   files under a `ccms_peak` directory
//! v01/<path>   everything else
//! x01/<path>   fallback when the first choice is refused
//! ```
//!
//! [`RemoteLocator::locate_and_fetch`] rewrites the path, picks the first
//! prefix, and retries under the fallback only when the server answers with a
//! permanent (5xx) reply.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub use error::{FetchError, RewriteError, TransportError};
pub use rewrite::{apply_replacements, default_replacements, relocate, rewrite_path, PathReplacement};
pub use transport::{FtpTransport, Transport};

mod error;
mod rewrite;
mod transport;


/// Default archive host
pub const DEFAULT_HOST: &str = "massive-ftp.ucsd.edu";

/// Default FTP control port
pub const DEFAULT_PORT: u16 = 21;

/// Where files live on the archive server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveLayout {
    /// FTP host name
    pub host: String,
    /// FTP control port
    pub port: u16,
    /// Path substring that selects the peak namespace
    pub peak_marker: String,
    /// First prefix for paths in the peak namespace
    pub peak_prefix: String,
    /// First prefix for all other paths
    pub default_prefix: String,
    /// Prefix tried after a permission-denied reply
    pub fallback_prefix: String,
    /// Literal replacements, first match wins
    pub replacements: Vec<PathReplacement>,
}

impl Default for ArchiveLayout {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            peak_marker: "ccms_peak".to_string(),
            peak_prefix: "z01".to_string(),
            default_prefix: "v01".to_string(),
            fallback_prefix: "x01".to_string(),
            replacements: default_replacements(),
        }
    }
}

/// Namespace a rewritten path belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceTier {
    /// Converted peak files
    Peak,
    /// Everything else
    Default,
}

impl ArchiveLayout {
    /// Apply the relocation rule and the replacement table
    pub fn rewrite(&self, logical_path: &str) -> Result<String, RewriteError> {
        rewrite_path(logical_path, &self.replacements)
    }

    /// Namespace tier of a (rewritten) path
    pub fn classify(&self, path: &str) -> NamespaceTier {
        if !self.peak_marker.is_empty() && path.contains(&self.peak_marker) {
            NamespaceTier::Peak
        } else {
            NamespaceTier::Default
        }
    }

    /// First prefix to try for a tier
    pub fn primary_prefix(&self, tier: NamespaceTier) -> &str {
        match tier {
            NamespaceTier::Peak => &self.peak_prefix,
            NamespaceTier::Default => &self.default_prefix,
        }
    }

    /// Ordered prefixes to try for a path
    pub fn candidate_prefixes(&self, path: &str) -> [&str; 2] {
        [
            self.primary_prefix(self.classify(path)),
            self.fallback_prefix.as_str(),
        ]
    }
}

/// A downloaded file, deleted when dropped
#[derive(Debug)]
pub struct FetchedFile {
    local_path: PathBuf,
    remote_path: String,
    prefix: String,
}

impl FetchedFile {
    /// Local copy of the file
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Rewritten archive path, without prefix
    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }

    /// Prefix the file was retrieved from
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Drop for FetchedFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.local_path) {
            Ok(()) => debug!("Removed {}", self.local_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {e}", self.local_path.display()),
        }
    }
}

/// Fetches logical archive paths through a [`Transport`]
pub struct RemoteLocator<T: Transport> {
    transport: T,
    layout: ArchiveLayout,
    download_dir: PathBuf,
}

impl<T: Transport> RemoteLocator<T> {
    /// Locator downloading into the current directory
    pub fn new(transport: T, layout: ArchiveLayout) -> Self {
        Self {
            transport,
            layout,
            download_dir: PathBuf::from("."),
        }
    }

    /// Download into `dir` instead of the current directory
    pub fn with_download_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Rewrite `logical_path`, then fetch it under the first prefix that
    /// accepts it
    pub fn locate_and_fetch(&mut self, logical_path: &str) -> Result<FetchedFile, FetchError> {
        let remote_path = self.layout.rewrite(logical_path)?;
        if remote_path != logical_path {
            info!("Rewrote {logical_path} to {remote_path}");
        }

        let file_name = Path::new(&remote_path)
            .file_name()
            .ok_or_else(|| RewriteError::NoFileName(remote_path.clone()))?;
        let local_path = self.download_dir.join(file_name);

        let [primary, fallback] = self.layout.candidate_prefixes(&remote_path);
        let (primary, fallback) = (primary.to_string(), fallback.to_string());

        let err = match self.fetch_under(&primary, &remote_path, &local_path) {
            Ok(fetched) => return Ok(fetched),
            Err(FetchError::Transport { source, .. }) if source.is_permission_denied() => source,
            Err(e) => return Err(e),
        };

        warn!("{primary}/{remote_path} refused ({err}), trying {fallback}");

        match self.fetch_under(&fallback, &remote_path, &local_path) {
            Ok(fetched) => Ok(fetched),
            Err(FetchError::Transport { source, .. }) => Err(FetchError::Exhausted {
                path: logical_path.to_string(),
                primary,
                fallback,
                source,
            }),
            Err(e) => Err(e),
        }
    }

    fn fetch_under(
        &mut self,
        prefix: &str,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<FetchedFile, FetchError> {
        let fetched = FetchedFile {
            local_path: local_path.to_path_buf(),
            remote_path: remote_path.to_string(),
            prefix: prefix.to_string(),
        };

        let file = File::create(local_path).map_err(|source| FetchError::LocalFile {
            path: local_path.to_path_buf(),
            source,
        })?;
        let mut sink = BufWriter::new(file);

        let full_path = format!("{prefix}/{remote_path}");
        let transport_err = |source| FetchError::Transport {
            path: remote_path.to_string(),
            prefix: prefix.to_string(),
            source,
        };

        let bytes = self
            .transport
            .retrieve(&full_path, &mut sink)
            .map_err(transport_err)?;
        sink.flush()
            .map_err(|e| transport_err(TransportError::Io(e)))?;

        info!(
            "Fetched {full_path} to {} ({bytes} bytes)",
            local_path.display()
        );
        Ok(fetched)
    }
}
