//! Loading and saving policy stores in a [`RecordStore`].
//!
//! A store occupies three records under its namespace: `graph`,
//! `prohibitions` and `obligations`. An absent record loads as the empty
//! default for that part; a record that is present but does not parse fails
//! the whole load. Saving writes the three records one after another with no
//! atomicity across them; the enclosing unit of work is responsible for that.

use crate::error::{require_non_empty, NgacError, Result};
use crate::storage::RecordStore;
use crate::store::PolicyStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

pub const GRAPH_KEY: &str = "graph";
pub const PROHIBITIONS_KEY: &str = "prohibitions";
pub const OBLIGATIONS_KEY: &str = "obligations";

#[derive(Debug, Clone)]
pub struct PolicyStoreAdapter<R> {
    records: R,
}

impl<R: RecordStore> PolicyStoreAdapter<R> {
    pub fn new(records: R) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &R {
        &self.records
    }

    pub fn load(&self, namespace: &str) -> Result<PolicyStore> {
        require_non_empty("namespace", namespace)?;
        debug!("Loading policy store for namespace {}", namespace);

        let graph = self.read(namespace, GRAPH_KEY)?;
        let prohibitions = self.read(namespace, PROHIBITIONS_KEY)?;
        let obligations = self.read(namespace, OBLIGATIONS_KEY)?;
        Ok(PolicyStore::from_parts(graph, prohibitions, obligations))
    }

    pub fn save(&self, namespace: &str, store: &PolicyStore) -> Result<()> {
        require_non_empty("namespace", namespace)?;
        debug!("Saving policy store for namespace {}", namespace);

        self.write(namespace, GRAPH_KEY, store.graph())?;
        self.write(namespace, PROHIBITIONS_KEY, store.prohibitions())?;
        self.write(namespace, OBLIGATIONS_KEY, store.obligations())?;
        Ok(())
    }

    fn read<T: DeserializeOwned + Default>(&self, namespace: &str, record: &str) -> Result<T> {
        let bytes = self
            .records
            .get_record(namespace, record)
            .map_err(|source| NgacError::StorageError {
                namespace: namespace.to_string(),
                record: record.to_string(),
                source,
            })?;

        match bytes {
            None => {
                debug!("No {} record in namespace {}, using default", record, namespace);
                Ok(T::default())
            }
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| NgacError::UnmarshalError {
                    namespace: namespace.to_string(),
                    record: record.to_string(),
                    source,
                })
            }
        }
    }

    fn write<T: Serialize>(&self, namespace: &str, record: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value).map_err(|source| NgacError::MarshalError {
            namespace: namespace.to_string(),
            record: record.to_string(),
            source,
        })?;

        self.records
            .put_record(namespace, record, &bytes)
            .map_err(|source| NgacError::StorageError {
                namespace: namespace.to_string(),
                record: record.to_string(),
                source,
            })
    }
}
