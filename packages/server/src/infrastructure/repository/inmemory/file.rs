//! インメモリ実装の FileStore

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{FileId, FileProjection, FileStore, RepositoryError};

/// インメモリ実装の FileStore
pub struct InMemoryFileStore {
    files: Arc<Mutex<HashMap<FileId, FileProjection>>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Seed one file record (startup wiring and tests).
    pub async fn insert_file(&self, id: FileId, projection: FileProjection) {
        let mut files = self.files.lock().await;
        files.insert(id, projection);
    }
}

impl Default for InMemoryFileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn get_file(&self, file: &FileId) -> Result<Option<FileProjection>, RepositoryError> {
        let files = self.files.lock().await;
        Ok(files.get(file).cloned())
    }
}
