//! Local file system record store.
//!
//! Wraps [`InMemoryStore`] and keeps one JSON file per interface under the
//! store directory, next to a small allocator file. A mutation rewrites only
//! the file of the record it touches.
//!
//! Call-count increments are not written per call. The ids they touch are
//! remembered and their files rewritten on the next mutation of that record
//! or an explicit [`InterfaceStore::flush`].

use async_trait::async_trait;
use dashmap::DashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::files::{RecordDir, detached};
use super::in_memory::InMemoryStore;
use super::{InterfaceStore, StoreError, StoreResult};
use crate::locks::RecordLocks;
use crate::model::{InterfaceFields, InterfaceId, InterfaceInfo, InterfaceStatus};
use crate::query::{InterfaceFilter, SortSpec};

/// File-backed interface store.
///
/// # Thread Safety
///
/// Reads and call-count increments go straight to the in-memory map. A
/// mutation holds the lock of its own record while it updates memory and
/// writes that record's file; mutations of different records run in
/// parallel.
///
/// # Error Handling
///
/// A failed write rolls the in-memory change back and surfaces
/// [`StoreError::Unavailable`]. Mutations run as detached tasks, so a caller
/// that stops waiting cannot leave memory and disk out of step.
#[derive(Clone)]
pub struct LocalFsStore {
    inner: InMemoryStore,
    files: RecordDir,
    locks: RecordLocks,
    /// Ids whose call count changed since their file was last written.
    dirty: Arc<DashSet<InterfaceId>>,
}

impl LocalFsStore {
    /// Opens the store rooted at directory `path`, loading every record
    /// found there.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let files = RecordDir::open(path).await?;
        let (records, next_id) = files.load(|info: &InterfaceInfo| info.id).await?;
        Ok(Self {
            inner: InMemoryStore::from_records(records, next_id),
            files,
            locks: RecordLocks::default(),
            dirty: Arc::new(DashSet::new()),
        })
    }

    pub fn path(&self) -> &Path {
        self.files.dir()
    }

    /// Writes the current image of `id`. Must be called with its record
    /// lock held.
    async fn persist(&self, info: &InterfaceInfo) -> StoreResult<()> {
        self.dirty.remove(&info.id);
        if let Err(err) = self.files.write(info.id, info).await {
            self.dirty.insert(info.id);
            return Err(err);
        }
        Ok(())
    }
}

#[async_trait]
impl InterfaceStore for LocalFsStore {
    async fn insert(&self, fields: InterfaceFields) -> StoreResult<InterfaceInfo> {
        let store = self.clone();
        detached(async move {
            let info = store.inner.insert(fields).await?;
            let _guard = store.locks.acquire(info.id).await;
            let persisted = match store.files.advance_allocator(info.id + 1).await {
                Ok(()) => store.persist(&info).await,
                Err(err) => Err(err),
            };
            if let Err(err) = persisted {
                warn!(id = info.id, error = %err, "Rolling back insert");
                store.inner.discard(info.id);
                store.dirty.remove(&info.id);
                return Err(err);
            }
            Ok(info)
        })
        .await
    }

    async fn get(&self, id: InterfaceId) -> StoreResult<InterfaceInfo> {
        self.inner.get(id).await
    }

    async fn replace(
        &self,
        id: InterfaceId,
        fields: InterfaceFields,
    ) -> StoreResult<InterfaceInfo> {
        let store = self.clone();
        detached(async move {
            let _guard = store.locks.acquire(id).await;
            let previous = store.inner.get(id).await?;
            let info = store.inner.replace(id, fields).await?;
            if let Err(err) = store.persist(&info).await {
                warn!(id, error = %err, "Rolling back replace");
                store.inner.restore(previous);
                return Err(err);
            }
            Ok(info)
        })
        .await
    }

    async fn set_status(
        &self,
        id: InterfaceId,
        status: InterfaceStatus,
    ) -> StoreResult<InterfaceStatus> {
        let store = self.clone();
        detached(async move {
            let _guard = store.locks.acquire(id).await;
            let before = store.inner.get(id).await?;
            if before.status == status {
                return Ok(status);
            }
            let previous = store.inner.set_status(id, status).await?;
            let info = store.inner.get(id).await?;
            if let Err(err) = store.persist(&info).await {
                warn!(id, error = %err, "Rolling back status change");
                store.inner.restore(before);
                return Err(err);
            }
            Ok(previous)
        })
        .await
    }

    async fn delete(&self, id: InterfaceId) -> StoreResult<InterfaceInfo> {
        let store = self.clone();
        detached(async move {
            let _guard = store.locks.acquire(id).await;
            let removed = store.inner.delete(id).await?;
            if let Err(err) = store.files.remove(id).await {
                warn!(id, error = %err, "Rolling back delete");
                store.inner.restore(removed);
                return Err(err);
            }
            store.dirty.remove(&id);
            Ok(removed)
        })
        .await
    }

    async fn scan(
        &self,
        filter: &InterfaceFilter,
        sort: &SortSpec,
        offset: usize,
        limit: usize,
    ) -> StoreResult<(Vec<InterfaceInfo>, usize)> {
        self.inner.scan(filter, sort, offset, limit).await
    }

    async fn increment_call_count(&self, id: InterfaceId, delta: u64) -> StoreResult<u64> {
        let total = self.inner.increment_call_count(id, delta).await?;
        self.dirty.insert(id);
        Ok(total)
    }

    async fn reset_call_count(&self, id: InterfaceId) -> StoreResult<()> {
        let store = self.clone();
        detached(async move {
            let _guard = store.locks.acquire(id).await;
            let previous = store.inner.get(id).await?.call_no;
            store.inner.reset_call_count(id).await?;
            let info = store.inner.get(id).await?;
            if let Err(err) = store.persist(&info).await {
                warn!(id, error = %err, "Rolling back call count reset");
                store.inner.increment_call_count(id, previous).await?;
                return Err(err);
            }
            Ok(())
        })
        .await
    }

    /// Writes the records whose call counts changed since their last write.
    async fn flush(&self) -> StoreResult<()> {
        let store = self.clone();
        detached(async move {
            let pending: Vec<InterfaceId> = store.dirty.iter().map(|id| *id).collect();
            for id in &pending {
                let _guard = store.locks.acquire(*id).await;
                match store.inner.get(*id).await {
                    Ok(info) => store.persist(&info).await?,
                    Err(StoreError::NotFound { .. }) => {
                        store.dirty.remove(id);
                    }
                    Err(err) => return Err(err),
                }
            }
            debug!(records = pending.len(), "Flushed call counts");
            Ok(())
        })
        .await
    }

    async fn is_available(&self) -> bool {
        self.files.is_available().await
    }
}
