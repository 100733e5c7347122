use super::{RecordError, RecordStore};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Record store backed by the filesystem: `<base>/<namespace>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileRecords {
    base_path: PathBuf,
}

impl FileRecords {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        let base_path = base_path.as_ref().to_path_buf();
        debug!("Creating FileRecords with base path: {:?}", base_path);
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn record_path(&self, namespace: &str, key: &str) -> Result<PathBuf, RecordError> {
        for part in [namespace, key] {
            if part.is_empty() || part.contains(['/', '\\']) || part == "." || part == ".." {
                return Err(RecordError::InvalidLocation(format!(
                    "{:?} is not a valid path component",
                    part
                )));
            }
        }
        Ok(self.base_path.join(namespace).join(format!("{}.json", key)))
    }
}

impl RecordStore for FileRecords {
    fn get_record(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, RecordError> {
        let path = self.record_path(namespace, key)?;
        debug!("Reading record file: {:?}", path);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Record file does not exist: {:?}", path);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn put_record(&self, namespace: &str, key: &str, value: &[u8]) -> Result<(), RecordError> {
        let path = self.record_path(namespace, key)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        debug!("Writing record file: {:?}", path);
        fs::write(&path, value)?;
        Ok(())
    }
}
