//! Byte transport for archive retrieval

use std::io::{self, Write};

use log::{debug, warn};
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};

use super::TransportError;

/// Retrieves a remote file into a local sink
pub trait Transport {
    /// Copy the file at `remote_path` into `sink`, returning the bytes written
    fn retrieve(&mut self, remote_path: &str, sink: &mut dyn Write) -> Result<u64, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn retrieve(&mut self, remote_path: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        (**self).retrieve(remote_path, sink)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn retrieve(&mut self, remote_path: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        (**self).retrieve(remote_path, sink)
    }
}

const ANONYMOUS_USER: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "anonymous@";

/// Anonymous FTP transport
///
/// The control connection is opened on the first retrieval and reused for
/// later ones.
pub struct FtpTransport {
    host: String,
    port: u16,
    stream: Option<FtpStream>,
}

impl FtpTransport {
    /// Transport for `host:port` using anonymous credentials
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            stream: None,
        }
    }

    /// Server address as `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn connection(&mut self) -> Result<&mut FtpStream, TransportError> {
        if self.stream.is_none() {
            let address = self.address();
            debug!("Connecting to {address}");
            let mut stream = FtpStream::connect(address.as_str())?;
            stream.login(ANONYMOUS_USER, ANONYMOUS_PASSWORD)?;
            stream.transfer_type(FileType::Binary)?;
            self.stream = Some(stream);
        }

        self.stream
            .as_mut()
            .ok_or_else(|| TransportError::Protocol("FTP connection not established".to_string()))
    }
}

impl Transport for FtpTransport {
    fn retrieve(&mut self, remote_path: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        let stream = self.connection()?;
        debug!("RETR {remote_path}");

        let mut data = match stream.retr_as_stream(remote_path) {
            Ok(data) => data,
            Err(e) => {
                let err = TransportError::from(e);
                if !err.is_permission_denied() {
                    self.stream = None;
                }
                return Err(err);
            }
        };

        match io::copy(&mut data, sink) {
            Ok(bytes) => {
                stream.finalize_retr_stream(data)?;
                Ok(bytes)
            }
            Err(e) => {
                drop(data);
                self.stream = None;
                Err(TransportError::Io(e))
            }
        }
    }
}

impl Drop for FtpTransport {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.quit() {
                warn!("Failed to close FTP session with {}: {e}", self.address());
            }
        }
    }
}

impl From<FtpError> for TransportError {
    fn from(err: FtpError) -> Self {
        match err {
            FtpError::UnexpectedResponse(response) => {
                let code = response.status.code();
                let message = String::from_utf8_lossy(&response.body).trim().to_string();
                if (500..600).contains(&code) {
                    TransportError::PermissionDenied { code, message }
                } else {
                    TransportError::Protocol(format!("{code} {message}"))
                }
            }
            FtpError::ConnectionError(e) => TransportError::Connection(e),
            other => TransportError::Protocol(other.to_string()),
        }
    }
}
