pub mod file;

pub use file::{FileIndexStore, DEFAULT_INDEX_PATH, DEFAULT_METADATA_PATH, METADATA_SCHEMA_VERSION};
