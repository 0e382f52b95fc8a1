//! Storage of user interface grants.

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use super::{
    AddUserInterfaceRequest, GrantId, GrantStatus, UserId, UserInterfaceFilter, UserInterfaceInfo,
    UserInterfacePatch,
};
use crate::error::{RegistryError, RegistryResult};
use crate::locks::RecordLocks;
use crate::model::InterfaceId;
use crate::query::window;
use crate::store::files::{RecordDir, detached};

/// Number of grants examined between cooperative yields during a scan.
const SCAN_CHUNK: usize = 256;

/// Outcome of charging one call against a grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Consumption {
    Consumed(UserInterfaceInfo),
    Banned,
    Exhausted,
}

/// Grants keyed by id, with a unique index on `(user, interface)`.
///
/// Optionally backed by a record directory, one JSON file per grant.
/// Counter changes from [`GrantStore::consume`] are written on the next
/// mutation of that grant or on [`GrantStore::flush`].
#[derive(Clone)]
pub struct GrantStore {
    grants: Arc<DashMap<GrantId, UserInterfaceInfo>>,
    pairs: Arc<DashMap<(UserId, InterfaceId), GrantId>>,
    next_id: Arc<AtomicU64>,
    files: Option<RecordDir>,
    locks: RecordLocks,
    dirty: Arc<DashSet<GrantId>>,
}

impl Default for GrantStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl GrantStore {
    pub fn in_memory() -> Self {
        Self::from_records(Vec::new(), 1, None)
    }

    /// Opens the grant directory at `path`, loading every grant found there.
    pub async fn open(path: impl Into<PathBuf>) -> RegistryResult<Self> {
        let files = RecordDir::open(path).await?;
        let (records, next_id) = files.load(|grant: &UserInterfaceInfo| grant.id).await?;
        Ok(Self::from_records(records, next_id, Some(files)))
    }

    fn from_records(
        records: Vec<UserInterfaceInfo>,
        next_id: GrantId,
        files: Option<RecordDir>,
    ) -> Self {
        let grants = DashMap::with_capacity(records.len());
        let pairs = DashMap::with_capacity(records.len());
        for record in records {
            pairs.insert((record.user_id, record.interface_info_id), record.id);
            grants.insert(record.id, record);
        }
        Self {
            grants: Arc::new(grants),
            pairs: Arc::new(pairs),
            next_id: Arc::new(AtomicU64::new(next_id.max(1))),
            files,
            locks: RecordLocks::default(),
            dirty: Arc::new(DashSet::new()),
        }
    }

    /// Writes the current image of a grant. Must be called with its record
    /// lock held.
    async fn persist(&self, grant: &UserInterfaceInfo) -> RegistryResult<()> {
        let Some(files) = &self.files else {
            return Ok(());
        };
        self.dirty.remove(&grant.id);
        if let Err(err) = files.write(grant.id, grant).await {
            self.dirty.insert(grant.id);
            return Err(err.into());
        }
        Ok(())
    }

    pub async fn insert(
        &self,
        request: AddUserInterfaceRequest,
    ) -> RegistryResult<UserInterfaceInfo> {
        let store = self.clone();
        detached(async move {
            let key = (request.user_id, request.interface_info_id);
            let id = match store.pairs.entry(key) {
                Entry::Occupied(existing) => {
                    return Err(RegistryError::DuplicateKey(format!(
                        "user {} already holds grant {} for interface {}",
                        request.user_id,
                        existing.get(),
                        request.interface_info_id
                    )));
                }
                Entry::Vacant(vacant) => {
                    let id = store.next_id.fetch_add(1, Ordering::AcqRel);
                    vacant.insert(id);
                    id
                }
            };
            let now = Utc::now();
            let grant = UserInterfaceInfo {
                id,
                user_id: request.user_id,
                interface_info_id: request.interface_info_id,
                total_num: 0,
                left_num: request.left_num,
                status: GrantStatus::Normal,
                create_time: now,
                update_time: now,
            };
            store.grants.insert(id, grant.clone());

            let _guard = store.locks.acquire(id).await;
            let persisted = match &store.files {
                Some(files) => match files.advance_allocator(id + 1).await {
                    Ok(()) => store.persist(&grant).await,
                    Err(err) => Err(err.into()),
                },
                None => Ok(()),
            };
            if let Err(err) = persisted {
                warn!(id, error = %err, "Rolling back grant insert");
                store.grants.remove(&id);
                store.pairs.remove_if(&key, |_, owner| *owner == id);
                store.dirty.remove(&id);
                return Err(err);
            }
            Ok(grant)
        })
        .await
    }

    pub fn get(&self, id: GrantId) -> RegistryResult<UserInterfaceInfo> {
        self.grants
            .get(&id)
            .map(|grant| grant.clone())
            .ok_or(RegistryError::GrantNotFound { id })
    }

    /// Id of the grant `user_id` holds for `interface_id`, if any.
    pub fn find(&self, user_id: UserId, interface_id: InterfaceId) -> Option<GrantId> {
        self.pairs.get(&(user_id, interface_id)).map(|id| *id)
    }

    pub async fn update(
        &self,
        id: GrantId,
        patch: UserInterfacePatch,
    ) -> RegistryResult<UserInterfaceInfo> {
        let store = self.clone();
        detached(async move {
            let _guard = store.locks.acquire(id).await;
            let (previous, updated) = {
                let mut grant = store
                    .grants
                    .get_mut(&id)
                    .ok_or(RegistryError::GrantNotFound { id })?;
                let previous = grant.clone();
                if let Some(left_num) = patch.left_num {
                    grant.left_num = left_num;
                }
                if let Some(status) = patch.status {
                    grant.status = status;
                }
                grant.update_time = Utc::now().max(grant.create_time);
                (previous, grant.clone())
            };
            if let Err(err) = store.persist(&updated).await {
                warn!(id, error = %err, "Rolling back grant update");
                store.grants.insert(id, previous);
                return Err(err);
            }
            Ok(updated)
        })
        .await
    }

    pub async fn delete(&self, id: GrantId) -> RegistryResult<UserInterfaceInfo> {
        let store = self.clone();
        detached(async move {
            let _guard = store.locks.acquire(id).await;
            let (_, removed) = store
                .grants
                .remove(&id)
                .ok_or(RegistryError::GrantNotFound { id })?;
            let key = (removed.user_id, removed.interface_info_id);
            store.pairs.remove_if(&key, |_, owner| *owner == id);
            if let Some(files) = &store.files {
                if let Err(err) = files.remove(id).await {
                    warn!(id, error = %err, "Rolling back grant delete");
                    store.pairs.insert(key, id);
                    store.grants.insert(id, removed);
                    return Err(err.into());
                }
            }
            store.dirty.remove(&id);
            Ok(removed)
        })
        .await
    }

    /// Grants matching `filter` in ascending id order, windowed, plus the
    /// number of matches.
    pub async fn scan(
        &self,
        filter: &UserInterfaceFilter,
        offset: usize,
        limit: usize,
    ) -> (Vec<UserInterfaceInfo>, usize) {
        let ids: Vec<GrantId> = self.grants.iter().map(|entry| *entry.key()).collect();
        let mut matched = Vec::new();
        for chunk in ids.chunks(SCAN_CHUNK) {
            for id in chunk {
                if let Some(grant) = self.grants.get(id) {
                    if filter.matches(&grant) {
                        matched.push(grant.clone());
                    }
                }
            }
            tokio::task::yield_now().await;
        }
        matched.sort_by_key(|grant| grant.id);
        let total = matched.len();
        (window(matched, offset, limit), total)
    }

    /// Charges one call against grant `id`.
    ///
    /// The check and both counter updates happen under the grant's map
    /// entry, so concurrent calls never drive `left_num` below zero.
    pub fn consume(&self, id: GrantId) -> RegistryResult<Consumption> {
        let mut grant = self
            .grants
            .get_mut(&id)
            .ok_or(RegistryError::GrantNotFound { id })?;
        if grant.status == GrantStatus::Banned {
            return Ok(Consumption::Banned);
        }
        if grant.left_num == 0 {
            return Ok(Consumption::Exhausted);
        }
        grant.left_num -= 1;
        grant.total_num = grant.total_num.saturating_add(1);
        grant.update_time = Utc::now().max(grant.create_time);
        let consumed = grant.clone();
        drop(grant);
        if self.files.is_some() {
            self.dirty.insert(id);
        }
        Ok(Consumption::Consumed(consumed))
    }

    /// Writes grants whose counters changed since their last write.
    pub async fn flush(&self) -> RegistryResult<()> {
        if self.files.is_none() {
            return Ok(());
        }
        let store = self.clone();
        detached(async move {
            let pending: Vec<GrantId> = store.dirty.iter().map(|id| *id).collect();
            for id in &pending {
                let _guard = store.locks.acquire(*id).await;
                match store.get(*id) {
                    Ok(grant) => store.persist(&grant).await?,
                    Err(_) => {
                        store.dirty.remove(id);
                    }
                }
            }
            debug!(grants = pending.len(), "Flushed grant counters");
            Ok::<_, RegistryError>(())
        })
        .await
    }

    pub async fn is_available(&self) -> bool {
        match &self.files {
            Some(files) => files.is_available().await,
            None => true,
        }
    }
}
