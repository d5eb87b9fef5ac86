//! Error types.

use std::array::TryFromSliceError;
use std::num::{ParseIntError, TryFromIntError};
use std::str::Utf8Error;
use std::{error, fmt, io};

/// Unified error type for everything in the crate
#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// Malformed tar archive
    Archive(&'static str),
    /// Inconsistent transition history
    History(&'static str),
    /// Unparseable source line or field
    InvalidLine(String),
    /// I/O error
    Io(io::Error),
    /// Unsupported leap-second line
    LeapLine(String),
    /// Link alias without a canonical target
    LinkTarget(String),
    /// Missing input data
    NotFound(String),
    /// Out of range error
    OutOfRange(&'static str),
    /// Integer parsing error
    ParseInt(ParseIntError),
    /// Malformed repository blob
    Repository(&'static str),
    /// Zone line referencing an unknown rule family
    RuleFamily(String),
    /// UTF-8 error
    Utf8(Utf8Error),
    /// Malformed version designation
    Version(String),
    /// Failure while processing a zone, carrying the zone ID
    Zone(String, Box<Error>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Archive(error) => write!(f, "invalid tar archive: {}", error),
            Self::History(error) => write!(f, "inconsistent transition history: {}", error),
            Self::InvalidLine(error) => write!(f, "invalid line: {}", error),
            Self::Io(error) => error.fmt(f),
            Self::LeapLine(error) => write!(f, "unsupported leap line: {}", error),
            Self::LinkTarget(error) => write!(f, "link target not found: {}", error),
            Self::NotFound(error) => error.fmt(f),
            Self::OutOfRange(error) => error.fmt(f),
            Self::ParseInt(error) => error.fmt(f),
            Self::Repository(error) => write!(f, "invalid repository data: {}", error),
            Self::RuleFamily(error) => write!(f, "unknown rule family: {}", error),
            Self::Utf8(error) => error.fmt(f),
            Self::Version(error) => write!(f, "invalid version designation: {}", error),
            Self::Zone(id, error) => write!(f, "inconsistent data found for {}: {}", id, error),
        }
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<ParseIntError> for Error {
    fn from(error: ParseIntError) -> Self {
        Self::ParseInt(error)
    }
}

impl From<TryFromIntError> for Error {
    fn from(_: TryFromIntError) -> Self {
        Self::OutOfRange("out of range integer conversion")
    }
}

impl From<TryFromSliceError> for Error {
    fn from(_: TryFromSliceError) -> Self {
        Self::OutOfRange("invalid slice length")
    }
}

impl From<Utf8Error> for Error {
    fn from(error: Utf8Error) -> Self {
        Self::Utf8(error)
    }
}
