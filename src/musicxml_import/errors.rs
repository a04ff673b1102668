//! Error types for the MusicXML first pass
//!
//! Only an unreadable document is fatal. Everything the scan can work
//! around is reported through [`crate::diagnostics::Diagnostics`] instead.

use thiserror::Error;

/// Fatal first pass errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FirstPassError {
    /// XML is malformed (not well-formed)
    #[error("Invalid XML: {0}")]
    InvalidXml(String),

    /// MusicXML format not supported (e.g., timewise instead of partwise)
    #[error("Unsupported MusicXML format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, FirstPassError>;
