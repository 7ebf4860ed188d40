#![forbid(unsafe_code)]

pub mod file;
pub mod kv;
pub mod progress;

pub use file::{FileStore, FileStoreInitError};
pub use kv::{InMemoryStore, KeyValueStore, StorageError};
pub use progress::{ProgressStore, SubjectStats};
