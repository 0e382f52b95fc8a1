//! Record store for interface entities.
//!
//! The [`InterfaceStore`] trait is the only path to the canonical copy of a
//! record. Everything handed out by a store is a snapshot; callers never hold
//! references into it across requests.
//!
//! # Implementations
//!
//! - [`InMemoryStore`]: sharded concurrent map, call counts as atomics.
//! - [`LocalFsStore`]: the in-memory store plus one JSON file per record that
//!   survives restarts.

pub(crate) mod files;
pub mod in_memory;
pub mod local_fs;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{InterfaceFields, InterfaceId, InterfaceInfo, InterfaceStatus};
use crate::query::{InterfaceFilter, SortSpec};

pub use in_memory::InMemoryStore;
pub use local_fs::LocalFsStore;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Record not found: {id}")]
    NotFound { id: InterfaceId },
    #[error("Record already exists: {id}")]
    DuplicateKey { id: InterfaceId },
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable keyed storage for interface records.
///
/// # Thread Safety
///
/// Implementations are shared across request tasks and must tolerate
/// concurrent calls. A single call is atomic with respect to the record it
/// touches: a concurrent reader sees either the old or the new record.
#[async_trait]
pub trait InterfaceStore: Send + Sync {
    /// Stores a new record under a freshly allocated id.
    ///
    /// The record starts `Disabled` with a zero call count. Ids are never
    /// reused, including ids of deleted records.
    async fn insert(&self, fields: InterfaceFields) -> StoreResult<InterfaceInfo>;

    async fn get(&self, id: InterfaceId) -> StoreResult<InterfaceInfo>;

    /// Overwrites the mutable fields, keeping id, creation time, status and
    /// call count.
    async fn replace(&self, id: InterfaceId, fields: InterfaceFields)
    -> StoreResult<InterfaceInfo>;

    /// Writes the lifecycle state and returns the previous one. The update
    /// time only moves when the state actually changes.
    async fn set_status(
        &self,
        id: InterfaceId,
        status: InterfaceStatus,
    ) -> StoreResult<InterfaceStatus>;

    async fn delete(&self, id: InterfaceId) -> StoreResult<InterfaceInfo>;

    /// Returns the `[offset, offset + limit)` window of the matching records
    /// in `sort` order, along with the number of all matching records.
    async fn scan(
        &self,
        filter: &InterfaceFilter,
        sort: &SortSpec,
        offset: usize,
        limit: usize,
    ) -> StoreResult<(Vec<InterfaceInfo>, usize)>;

    /// Atomically adds `delta` to the call count and returns the new value.
    async fn increment_call_count(&self, id: InterfaceId, delta: u64) -> StoreResult<u64>;

    async fn reset_call_count(&self, id: InterfaceId) -> StoreResult<()>;

    async fn is_available(&self) -> bool;

    /// Forces buffered state to durable storage. Stores without buffering
    /// have nothing to do.
    async fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}
