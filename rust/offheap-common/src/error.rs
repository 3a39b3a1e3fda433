use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_range(name: impl Into<String>, from: u64, to: u64) -> Error {
        Error(
            ErrorKind::InvalidRange {
                name: name.into(),
                from,
                to,
            }
            .into(),
        )
    }

    pub fn size_too_large(name: impl Into<String>, size: u64, limit: u64) -> Error {
        Error(
            ErrorKind::SizeTooLarge {
                name: name.into(),
                size,
                limit,
            }
            .into(),
        )
    }

    pub fn allocation_failure(size: u64) -> Error {
        Error(ErrorKind::AllocationFailure { size }.into())
    }

    pub fn mapping(path: impl Into<PathBuf>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Mapping {
                path: path.into(),
                source,
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid range for {name}: {from}..{to}")]
    InvalidRange { name: String, from: u64, to: u64 },

    #[error("{name}: size {size} exceeds the supported limit of {limit} bytes")]
    SizeTooLarge { name: String, size: u64, limit: u64 },

    #[error("failed to allocate {size} bytes of off-heap memory")]
    AllocationFailure { size: u64 },

    #[error("failed to map '{path}': {source}")]
    Mapping {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}
