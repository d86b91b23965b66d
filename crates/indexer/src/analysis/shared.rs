//! Coarse-lock wrapper for hosting the index behind a concurrent front end.
//!
//! A rebuild holds the write lock for the whole document replacement, so a
//! reader never observes a document whose partitions are half built. The
//! engine itself stays single-threaded; this only serialises callers.

use super::document::DocumentState;
use super::types::{DocumentUri, IndexPartition};
use super::workspace::WorkspaceIndex;
use crate::error::Result;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
pub struct SharedWorkspaceIndex {
    inner: Arc<RwLock<WorkspaceIndex>>,
}

impl SharedWorkspaceIndex {
    pub fn new(index: WorkspaceIndex) -> Self {
        Self {
            inner: Arc::new(RwLock::new(index)),
        }
    }

    /// A poisoned lock only means a panic happened mid-query elsewhere; the
    /// index itself is replaced per document and stays usable.
    pub fn read(&self) -> RwLockReadGuard<'_, WorkspaceIndex> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, WorkspaceIndex> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn rebuild(&self, uri: &DocumentUri, text: Option<&str>) -> Result<DocumentState> {
        self.write().build_or_refresh_document(uri, text)
    }

    pub fn rebuild_in(
        &self,
        partition: IndexPartition,
        uri: &DocumentUri,
        text: Option<&str>,
    ) -> Result<DocumentState> {
        self.write().build_or_refresh_in(partition, uri, text)
    }

    /// Runs `query` under the read lock.
    pub fn with_index<T>(&self, query: impl FnOnce(&WorkspaceIndex) -> T) -> T {
        query(&self.read())
    }
}
