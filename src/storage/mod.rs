pub mod blob_store;
pub mod classifier;
pub mod naming;

pub use blob_store::{BlobStore, WriteFence};
pub use classifier::{Category, classify, content_type_for};
pub use naming::{extension_of, new_name};
