//! In-memory record store.
//!
//! Records live in a `DashMap`, so mutations lock a single shard and never
//! the whole store. The call count of each record sits in its own
//! `AtomicU64`: increments only take a shared shard lock and cannot lose
//! updates under contention.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{InterfaceStore, StoreError, StoreResult};
use crate::model::{InterfaceFields, InterfaceId, InterfaceInfo, InterfaceStatus};
use crate::query::{InterfaceFilter, SortSpec, window};

/// Number of records examined between cooperative yields during a scan.
const SCAN_CHUNK: usize = 256;

#[derive(Debug)]
struct StoredInterface {
    /// Canonical fields. `info.call_no` is stale; `call_no` is authoritative.
    info: InterfaceInfo,
    call_no: AtomicU64,
}

impl StoredInterface {
    fn new(info: InterfaceInfo) -> Self {
        let call_no = AtomicU64::new(info.call_no);
        Self { info, call_no }
    }

    fn snapshot(&self) -> InterfaceInfo {
        InterfaceInfo {
            call_no: self.call_no.load(Ordering::Acquire),
            ..self.info.clone()
        }
    }
}

/// Update time for a mutation, never earlier than the creation time.
fn touch(create_time: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(create_time)
}

#[derive(Clone)]
pub struct InMemoryStore {
    records: Arc<DashMap<InterfaceId, StoredInterface>>,
    next_id: Arc<AtomicU64>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Rebuilds a store from persisted records. The allocator resumes at
    /// `next_id` or past the largest stored id, whichever is higher.
    pub fn from_records(records: Vec<InterfaceInfo>, next_id: InterfaceId) -> Self {
        let max_id = records.iter().map(|r| r.id).max().unwrap_or(0);
        let next_id = next_id.max(max_id + 1).max(1);
        let map = DashMap::with_capacity(records.len());
        for record in records {
            map.insert(record.id, StoredInterface::new(record));
        }
        Self {
            records: Arc::new(map),
            next_id: Arc::new(AtomicU64::new(next_id)),
        }
    }

    /// Puts a previous image of a record back after a failed persist.
    ///
    /// An existing record keeps its live call count; a re-inserted one gets
    /// the count it had when it was removed.
    pub(crate) fn restore(&self, info: InterfaceInfo) {
        match self.records.entry(info.id) {
            Entry::Occupied(mut occupied) => {
                let stored = occupied.get_mut();
                stored.info = InterfaceInfo {
                    call_no: stored.info.call_no,
                    ..info
                };
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredInterface::new(info));
            }
        }
    }

    /// Drops a record without going through the trait's not-found check.
    pub(crate) fn discard(&self, id: InterfaceId) {
        self.records.remove(&id);
    }
}

#[async_trait]
impl InterfaceStore for InMemoryStore {
    async fn insert(&self, fields: InterfaceFields) -> StoreResult<InterfaceInfo> {
        let id = self.next_id.fetch_add(1, Ordering::AcqRel);
        let now = Utc::now();
        let info = InterfaceInfo {
            id,
            name: fields.name,
            description: fields.description,
            method: fields.method,
            url: fields.url,
            request_header: fields.request_header,
            response_header: fields.response_header,
            request_params: fields.request_params,
            status: InterfaceStatus::Disabled,
            call_no: 0,
            create_time: now,
            update_time: now,
        };
        match self.records.entry(id) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey { id }),
            Entry::Vacant(vacant) => {
                vacant.insert(StoredInterface::new(info.clone()));
                Ok(info)
            }
        }
    }

    async fn get(&self, id: InterfaceId) -> StoreResult<InterfaceInfo> {
        self.records
            .get(&id)
            .map(|entry| entry.snapshot())
            .ok_or(StoreError::NotFound { id })
    }

    async fn replace(
        &self,
        id: InterfaceId,
        fields: InterfaceFields,
    ) -> StoreResult<InterfaceInfo> {
        let mut entry = self
            .records
            .get_mut(&id)
            .ok_or(StoreError::NotFound { id })?;
        let info = &mut entry.info;
        info.name = fields.name;
        info.description = fields.description;
        info.method = fields.method;
        info.url = fields.url;
        info.request_header = fields.request_header;
        info.response_header = fields.response_header;
        info.request_params = fields.request_params;
        info.update_time = touch(info.create_time);
        Ok(entry.snapshot())
    }

    async fn set_status(
        &self,
        id: InterfaceId,
        status: InterfaceStatus,
    ) -> StoreResult<InterfaceStatus> {
        let mut entry = self
            .records
            .get_mut(&id)
            .ok_or(StoreError::NotFound { id })?;
        let previous = entry.info.status;
        if previous != status {
            entry.info.status = status;
            entry.info.update_time = touch(entry.info.create_time);
        }
        Ok(previous)
    }

    async fn delete(&self, id: InterfaceId) -> StoreResult<InterfaceInfo> {
        self.records
            .remove(&id)
            .map(|(_, stored)| stored.snapshot())
            .ok_or(StoreError::NotFound { id })
    }

    async fn scan(
        &self,
        filter: &InterfaceFilter,
        sort: &SortSpec,
        offset: usize,
        limit: usize,
    ) -> StoreResult<(Vec<InterfaceInfo>, usize)> {
        let ids: Vec<InterfaceId> = self.records.iter().map(|entry| *entry.key()).collect();
        let mut matched = Vec::new();
        for chunk in ids.chunks(SCAN_CHUNK) {
            for id in chunk {
                if let Some(entry) = self.records.get(id) {
                    let info = entry.snapshot();
                    if filter.matches(&info) {
                        matched.push(info);
                    }
                }
            }
            // Lets a dropped (cancelled) scan stop between chunks.
            tokio::task::yield_now().await;
        }
        matched.sort_by(|a, b| sort.compare(a, b));
        let total = matched.len();
        Ok((window(matched, offset, limit), total))
    }

    async fn increment_call_count(&self, id: InterfaceId, delta: u64) -> StoreResult<u64> {
        let entry = self.records.get(&id).ok_or(StoreError::NotFound { id })?;
        let previous = entry
            .call_no
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_add(delta))
            })
            .unwrap_or_else(|n| n);
        Ok(previous.saturating_add(delta))
    }

    async fn reset_call_count(&self, id: InterfaceId) -> StoreResult<()> {
        let entry = self.records.get(&id).ok_or(StoreError::NotFound { id })?;
        entry.call_no.store(0, Ordering::Release);
        Ok(())
    }

    async fn is_available(&self) -> bool {
        true
    }
}
