use std::path::PathBuf;

/// Errors from rewriting a logical archive path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewriteError {
    /// The relocation rule matched but the path does not have the expected shape
    #[error("Cannot relocate {path}: {reason}")]
    MalformedRelocation {
        /// Path the rule was applied to
        path: String,
        /// What was wrong with it
        reason: String,
    },

    /// The path has no final component to use as a local file name
    #[error("Archive path has no file name: {0}")]
    NoFileName(String),
}

/// Errors reported by a [`Transport`](super::Transport)
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server refused the request with a permanent (5xx) reply
    #[error("{code} {message}")]
    PermissionDenied {
        /// FTP reply code
        code: u32,
        /// Reply text
        message: String,
    },

    /// Could not reach or talk to the server
    #[error("Connection error: {0}")]
    Connection(std::io::Error),

    /// Any other unexpected protocol reply
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Error writing the retrieved bytes locally
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether this outcome allows a retry under the fallback prefix
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

/// Errors from locating and fetching an archive file
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The logical path could not be rewritten
    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    /// Both the primary and the fallback prefix were refused
    #[error("Tried getting {path} from {primary} and {fallback} failed. Error: {source}")]
    Exhausted {
        /// Logical path requested
        path: String,
        /// First prefix attempted
        primary: String,
        /// Fallback prefix attempted
        fallback: String,
        /// Error from the last attempt
        source: TransportError,
    },

    /// A non-retryable transport failure
    #[error("Failed to get {path} from {prefix}: {source}")]
    Transport {
        /// Rewritten archive path requested
        path: String,
        /// Prefix of the failed attempt
        prefix: String,
        /// Underlying transport error
        source: TransportError,
    },

    /// The local download file could not be created
    #[error("Cannot create {}: {source}", path.display())]
    LocalFile {
        /// Local path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl FetchError {
    /// Prefixes attempted before giving up, in order
    pub fn attempted_prefixes(&self) -> Vec<&str> {
        match self {
            Self::Exhausted {
                primary, fallback, ..
            } => vec![primary.as_str(), fallback.as_str()],
            Self::Transport { prefix, .. } => vec![prefix.as_str()],
            Self::Rewrite(_) | Self::LocalFile { .. } => Vec::new(),
        }
    }
}
