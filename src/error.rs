use std::io;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("stored file already exists: {0}")]
    Conflict(String),

    #[error("stored file not found: {0}")]
    NotFound(String),

    #[error("invalid stored name: {0:?}")]
    InvalidName(String),

    #[error("io failure on {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(name: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            name: name.into(),
            source,
        }
    }

    pub(crate) fn from_io(name: &str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(name.to_string()),
            io::ErrorKind::AlreadyExists => Self::Conflict(name.to_string()),
            _ => Self::io(name, source),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("decode failed: {0}")]
    Decode(String),

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("transcoder failed: {0}")]
    Subprocess(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Preview(#[from] PreviewError),

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Storage(StorageError::NotFound(_)))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
