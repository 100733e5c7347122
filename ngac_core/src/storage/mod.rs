//! Namespaced record storage.
//!
//! A [`RecordStore`] is the key-value boundary the policy stores are written
//! to. Every call names its namespace; a backend never assumes a default one.
//! Two backends are provided:
//! - [`InMemoryRecords`]: a shared in-process map, for tests and embedding
//! - [`FileRecords`]: one directory per namespace, one JSON file per record

mod error;
mod file;
mod memory;

pub use error::RecordError;
pub use file::FileRecords;
pub use memory::InMemoryRecords;

/// A namespaced key-value store of opaque record blobs.
pub trait RecordStore {
    /// Read a record. `Ok(None)` means the key is absent, which is distinct
    /// from a present but empty value.
    fn get_record(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, RecordError>;

    /// Write a record, replacing any previous value.
    fn put_record(&self, namespace: &str, key: &str, value: &[u8]) -> Result<(), RecordError>;
}

impl<T: RecordStore + ?Sized> RecordStore for &T {
    fn get_record(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, RecordError> {
        (**self).get_record(namespace, key)
    }

    fn put_record(&self, namespace: &str, key: &str, value: &[u8]) -> Result<(), RecordError> {
        (**self).put_record(namespace, key, value)
    }
}
