//! Error types for wkpdf library.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for wkpdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while producing a PDF.
#[derive(Error, Debug)]
pub enum Error {
    /// Temp directory or temp page file could not be prepared.
    ///
    /// Raised before any process is launched; no fallback is attempted.
    #[error("Error writing temp files: {context}: {source}")]
    Setup {
        /// What was being prepared
        context: String,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The renderer could not be launched or exited unsuccessfully.
    #[error("Error running {program}: {stderr}")]
    Render {
        /// Program that was launched (renderer or display wrapper)
        program: String,
        /// Captured standard error, or the launch failure description
        stderr: String,
        /// Messages from earlier attempts that this failure superseded
        superseded: Vec<String>,
    },

    /// The renderer did not finish before the configured deadline.
    #[error("Error running {program}: timed out after {after:?}")]
    Timeout {
        /// Program that was killed
        program: String,
        /// Configured deadline
        after: Duration,
    },

    /// The temp directory could not be removed after a successful render.
    ///
    /// The produced PDF is kept in `output`; see [`Error::into_output`].
    #[error("Error removing temp directory {}: {source}", path.display())]
    Cleanup {
        /// Directory that may have leaked
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
        /// PDF bytes produced before cleanup failed
        output: Vec<u8>,
    },

    /// The rendered PDF could not be written to the requested file.
    #[error("Error creating file {}: {source}", path.display())]
    CreateFile {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The rendered PDF could not be copied to the output stream.
    #[error("Error writing to writer: {0}")]
    WriteOutput(#[source] io::Error),

    /// I/O error while buffering page content.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid renderer configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Temp directory or temp file preparation failed
    Setup,
    /// Renderer launch failure or non-zero exit
    Render,
    /// Renderer exceeded its deadline
    Timeout,
    /// Temp directory removal failed
    Cleanup,
    /// Output file or stream could not be written
    Delivery,
    /// Page content could not be buffered
    Io,
    /// Configuration could not be loaded
    Config,
    /// Anything else
    Other,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Setup { .. } => ErrorKind::Setup,
            Error::Render { .. } => ErrorKind::Render,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Cleanup { .. } => ErrorKind::Cleanup,
            Error::CreateFile { .. } | Error::WriteOutput(_) => ErrorKind::Delivery,
            Error::Io(_) => ErrorKind::Io,
            Error::Config(_) => ErrorKind::Config,
            Error::Other(_) => ErrorKind::Other,
        }
    }

    /// PDF bytes that were produced despite this error, if any.
    pub fn output(&self) -> Option<&[u8]> {
        match self {
            Error::Cleanup { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Take the PDF bytes carried by a cleanup error.
    pub fn into_output(self) -> Option<Vec<u8>> {
        match self {
            Error::Cleanup { output, .. } => Some(output),
            _ => None,
        }
    }

    pub(crate) fn setup(context: impl Into<String>, source: io::Error) -> Self {
        Error::Setup {
            context: context.into(),
            source,
        }
    }
}
