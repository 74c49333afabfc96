//! Error types for the cam-dl library.

use thiserror::Error;

/// Errors that can occur while talking to the camera or writing files.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport error (connection refused, timeout, broken stream).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The device answered a Browse request with a non-success status.
    ///
    /// On the push root this is the normal "camera is in pull mode" signal
    /// and triggers the fallback to the photo root.
    #[error("browse of {object_id} failed with status {status}")]
    Protocol {
        /// Object id of the directory that was being browsed.
        object_id: String,
        /// HTTP status the device returned.
        status: reqwest::StatusCode,
    },

    /// A SOAP or DIDL-Lite document could not be parsed.
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// A required element was missing from a device response.
    #[error("device response is missing {0}")]
    MissingElement(&'static str),

    /// Configuration file could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true for errors that mean the camera is unreachable rather
    /// than misbehaving. The daemon loop treats these as "try again later".
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_connect() || e.is_timeout() || e.is_request())
    }

    /// Returns true if this is a browse-level protocol error.
    #[must_use]
    pub const fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }
}

/// A specialized `Result` type for cam-dl operations.
pub type Result<T> = std::result::Result<T, Error>;
