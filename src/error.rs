use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by readers, writers and the sort.
#[derive(Debug, Error)]
pub enum Error {
    /// The path is missing or cannot be opened for reading.
    #[error("source unavailable: {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        source: io::Error,
    },

    /// A row whose field count or encoding does not match the source.
    #[error("malformed record in {} at line {line}: {reason}", .path.display())]
    MalformedRecord {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// No more records. Not a failure.
    #[error("end of input")]
    EndOfInput,

    #[error("invalid sort column {index}, the source has {columns} columns")]
    InvalidSortColumn {
        index: usize,
        columns: usize,
    },

    #[error("failed to write chunk {}: {source}", .path.display())]
    ChunkWrite {
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to read chunk {}: {source}", .path.display())]
    ChunkRead {
        path: PathBuf,
        source: io::Error,
    },

    /// Never returned from a sort, only logged.
    #[error("failed to remove temporary file {}: {source}", .path.display())]
    Cleanup {
        path: PathBuf,
        source: io::Error,
    },

    #[error("header of {} does not match the header of the first input", .path.display())]
    HeaderMismatch {
        path: PathBuf,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: io::Error,
    },

    #[error("sorting pool: {0}")]
    WorkerPool(String),
}

impl Error {
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, Error::EndOfInput)
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Error {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn into_chunk_write(self) -> Error {
        match self {
            Error::Io { path, source } => Error::ChunkWrite { path, source },
            error => error,
        }
    }

    pub(crate) fn into_chunk_read(self) -> Error {
        match self {
            Error::Io { path, source } | Error::SourceUnavailable { path, source } => Error::ChunkRead { path, source },
            error => error,
        }
    }

    pub(crate) fn from_csv(path: &Path, error: csv::Error) -> Error {
        let line = error.position().map(|position| position.line()).unwrap_or(0);
        match error.into_kind() {
            csv::ErrorKind::Io(source) => Error::io(path, source),
            csv::ErrorKind::UnequalLengths { expected_len, len, .. } => Error::MalformedRecord {
                path: path.to_path_buf(),
                line,
                reason: format!("expected {} fields, found {}", expected_len, len),
            },
            kind => Error::MalformedRecord {
                path: path.to_path_buf(),
                line,
                reason: format!("{:?}", kind),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::PathBuf;

    use crate::error::Error;

    #[test]
    fn test_phase_mapping() {
        let path = PathBuf::from("chunk-1.csv");
        let error = Error::io(&path, io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(matches!(error.into_chunk_write(), Error::ChunkWrite { .. }));

        let error = Error::io(&path, io::Error::new(io::ErrorKind::Other, "disk gone"));
        assert!(matches!(error.into_chunk_read(), Error::ChunkRead { .. }));

        let error = Error::InvalidSortColumn { index: 3, columns: 2 };
        assert!(matches!(error.into_chunk_read(), Error::InvalidSortColumn { index: 3, columns: 2 }));
    }

    #[test]
    fn test_messages() {
        let error = Error::InvalidSortColumn { index: 7, columns: 5 };
        assert_eq!(error.to_string(), "invalid sort column 7, the source has 5 columns");
        assert!(Error::EndOfInput.is_end_of_input());
    }
}
