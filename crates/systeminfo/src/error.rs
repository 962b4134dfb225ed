use core::fmt;
use std::io;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    path: Option<PathBuf>,
    source: ErrorSource,
    kind: ErrorKind,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, source: ErrorSource, path: Option<PathBuf>) -> Self {
        Self { kind, source, path }
    }

    pub(crate) fn with_path(
        kind: ErrorKind,
        source: impl Into<ErrorSource>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self::new(kind, source.into(), Some(path.into()))
    }

    pub(crate) fn unreadable(error: io::Error, path: &Path) -> Self {
        Self::with_path(ErrorKind::Unreadable, error, path)
    }

    pub(crate) fn unparseable(error: impl Into<ErrorSource>, path: &Path) -> Self {
        Self::with_path(ErrorKind::Unparseable, error, path)
    }

    /// The file or directory this error relates to, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// True when the underlying cause is a missing file or directory.
    pub fn is_not_found(&self) -> bool {
        matches!(&self.source, ErrorSource::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

#[derive(Debug)]
pub(crate) enum ErrorSource {
    Io(io::Error),
    ParseInt(ParseIntError),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum ErrorKind {
    Unreadable,
    Unparseable,
}

impl From<io::Error> for ErrorSource {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ParseIntError> for ErrorSource {
    fn from(value: ParseIntError) -> Self {
        Self::ParseInt(value)
    }
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => e.fmt(f),
            Self::ParseInt(e) => e.fmt(f),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self
            .path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());

        match self.kind {
            ErrorKind::Unreadable => write!(f, "could not read {path}: {}", self.source),
            ErrorKind::Unparseable => write!(f, "could not parse {path}: {}", self.source),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.source {
            ErrorSource::Io(e) => Some(e),
            ErrorSource::ParseInt(e) => Some(e),
        }
    }
}
