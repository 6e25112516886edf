pub mod config;
pub mod error;
pub mod ingest;
pub mod preview;
pub mod storage;
pub mod web;

pub use config::ServiceConfig;
pub use error::{Error, PreviewError, Result, StorageError};
pub use ingest::{ContentService, SaveResult, StoredFile};
