use super::{RecordError, RecordStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// In-process record store. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecords {
    records: Arc<Mutex<HashMap<(String, String), Vec<u8>>>>,
}

impl InMemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records across all namespaces.
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for InMemoryRecords {
    fn get_record(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, RecordError> {
        let records = self
            .records
            .lock()
            .map_err(|e| RecordError::LockError(e.to_string()))?;
        Ok(records
            .get(&(namespace.to_string(), key.to_string()))
            .cloned())
    }

    fn put_record(&self, namespace: &str, key: &str, value: &[u8]) -> Result<(), RecordError> {
        debug!("Writing record {}/{} ({} bytes)", namespace, key, value.len());
        let mut records = self
            .records
            .lock()
            .map_err(|e| RecordError::LockError(e.to_string()))?;
        records.insert((namespace.to_string(), key.to_string()), value.to_vec());
        Ok(())
    }
}
