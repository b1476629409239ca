//! Error types for the analyzer

use crate::capture::PixelLayout;
use std::collections::TryReserveError;
use std::fmt;

/// Analyzer errors
#[derive(Debug)]
pub enum AnalyzerError {
    /// Frame pixel layout cannot be sampled for luma
    UnsupportedLayout(PixelLayout),
    /// Frame buffer is smaller than its geometry claims
    FrameTooShort { needed: usize, actual: usize },
    /// Scratch or ROI buffer could not be grown
    Allocation(usize),
    /// Filesystem error from a sink or frame source
    Io(std::io::Error),
    /// Invalid or unreadable configuration
    Config(String),
    /// Metrics registry or exposition error
    Metrics(String),
}

impl fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzerError::UnsupportedLayout(layout) => {
                write!(f, "Unsupported pixel layout for luma sampling: {}", layout)
            }
            AnalyzerError::FrameTooShort { needed, actual } => {
                write!(f, "Frame buffer too short: need {} bytes, got {}", needed, actual)
            }
            AnalyzerError::Allocation(bytes) => {
                write!(f, "Failed to reserve {} bytes for frame sample", bytes)
            }
            AnalyzerError::Io(err) => write!(f, "I/O error: {}", err),
            AnalyzerError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AnalyzerError::Metrics(msg) => write!(f, "Metrics error: {}", msg),
        }
    }
}

impl std::error::Error for AnalyzerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalyzerError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AnalyzerError {
    fn from(err: std::io::Error) -> Self {
        AnalyzerError::Io(err)
    }
}

impl From<prometheus::Error> for AnalyzerError {
    fn from(err: prometheus::Error) -> Self {
        AnalyzerError::Metrics(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Reserve room for `additional` more bytes, reporting failure instead of aborting.
pub(crate) fn try_reserve(buf: &mut Vec<u8>, additional: usize) -> Result<()> {
    buf.try_reserve(additional)
        .map_err(|_: TryReserveError| AnalyzerError::Allocation(buf.len().saturating_add(additional)))
}
