//! Interface registry façade.
//!
//! [`InterfaceRegistry`] is the single entry point the transport layer talks
//! to. It validates input, serializes mutations per record, bounds every
//! store call with a timeout, and composes the lifecycle, analytics, bulk,
//! idempotency and grant components over one shared store.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::analytics::InvocationAnalytics;
use crate::bulk::{BulkCoordinator, BulkDeleteResult};
use crate::config::{RegistryConfig, StorageConfig};
use crate::error::{RegistryError, RegistryResult};
use crate::idempotency::IdempotencyCache;
use crate::lifecycle::{LifecycleManager, Transition};
use crate::locks::{RecordGuard, RecordLocks};
use crate::model::{
    AddInterfaceRequest, InterfaceFields, InterfaceId, InterfaceInfo, InterfacePatch,
    InvocationRank,
};
use crate::query::{InterfaceQuery, Page};
use crate::store::{InMemoryStore, InterfaceStore, LocalFsStore};
use crate::user_interface::{
    AddUserInterfaceRequest, GrantId, GrantStore, UserId, UserInterfaceInfo, UserInterfaceLedger,
    UserInterfacePatch, UserInterfaceQuery,
};

/// Registry of managed HTTP interfaces.
///
/// # Thread Safety
///
/// Cheap to clone; clones share the store and all coordination state.
/// Mutations of the same record are applied one at a time, mutations of
/// different records run in parallel. Call-count increments bypass the
/// record lock and rely on the store's atomic counter.
///
/// # Error Handling
///
/// Every store call is bounded by the configured timeout. A call that runs
/// out of time fails with [`RegistryError::Timeout`]; its effect on the store
/// is then unknown and the operation is safe to retry.
#[derive(Clone)]
pub struct InterfaceRegistry {
    store: Arc<dyn InterfaceStore>,
    lifecycle: LifecycleManager,
    analytics: InvocationAnalytics,
    bulk: BulkCoordinator,
    tokens: IdempotencyCache,
    grants: UserInterfaceLedger,
    locks: RecordLocks,
    config: Arc<RegistryConfig>,
    timeout: Duration,
}

impl InterfaceRegistry {
    /// A registry over `store` whose grants are kept in memory.
    pub fn new(config: RegistryConfig, store: Arc<dyn InterfaceStore>) -> Self {
        Self::with_grant_store(config, store, GrantStore::in_memory())
    }

    pub fn with_grant_store(
        config: RegistryConfig,
        store: Arc<dyn InterfaceStore>,
        grants: GrantStore,
    ) -> Self {
        Self {
            lifecycle: LifecycleManager::new(Arc::clone(&store)),
            analytics: InvocationAnalytics::new(Arc::clone(&store)),
            bulk: BulkCoordinator::new(config.bulk_concurrency),
            tokens: IdempotencyCache::new(config.idempotency_window),
            grants: UserInterfaceLedger::new(grants, Arc::clone(&store)),
            locks: RecordLocks::default(),
            timeout: config.store_timeout,
            config: Arc::new(config),
            store,
        }
    }

    /// Validates `config` and opens the stores it names.
    ///
    /// A local data directory holds interfaces under `interfaces/` and
    /// grants under `user_interfaces/`.
    pub async fn open(config: RegistryConfig) -> RegistryResult<Self> {
        config.validate()?;
        let (store, grants): (Arc<dyn InterfaceStore>, GrantStore) = match &config.storage {
            StorageConfig::InMemory => (Arc::new(InMemoryStore::new()), GrantStore::in_memory()),
            StorageConfig::LocalFs { path } => {
                let root = Path::new(path);
                (
                    Arc::new(LocalFsStore::open(root.join("interfaces")).await?),
                    GrantStore::open(root.join("user_interfaces")).await?,
                )
            }
        };
        info!(storage = ?config.storage, "Interface registry opened");
        Ok(Self::with_grant_store(config, store, grants))
    }

    /// A handle sharing this registry's state whose store calls are bounded
    /// by `timeout` instead of the configured default.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    async fn bounded<T, E, F>(&self, operation: &'static str, fut: F) -> RegistryResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<RegistryError>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Store call timed out"
                );
                Err(RegistryError::Timeout {
                    operation,
                    timeout: self.timeout,
                })
            }
        }
    }

    async fn lock_record(
        &self,
        operation: &'static str,
        id: InterfaceId,
    ) -> RegistryResult<RecordGuard> {
        self.bounded(operation, async {
            Ok::<_, RegistryError>(self.locks.acquire(id).await)
        })
        .await
    }

    /// Registers a new interface and returns its id.
    ///
    /// With a request token, a retry inside the idempotency window returns
    /// the id from the first attempt instead of creating a second record.
    #[tracing::instrument(skip(self, request), level = "debug")]
    pub async fn add(&self, request: AddInterfaceRequest) -> RegistryResult<InterfaceId> {
        let fields = request.fields.validated()?;
        let token = request
            .request_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty());
        match token {
            Some(token) => {
                self.tokens
                    .resolve(token, &fields, || self.insert(fields.clone()))
                    .await
            }
            None => self.insert(fields).await,
        }
    }

    async fn insert(&self, fields: InterfaceFields) -> RegistryResult<InterfaceId> {
        let info = self.bounded("insert", self.store.insert(fields)).await?;
        info!(id = info.id, name = %info.name, "Interface registered");
        Ok(info.id)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn get(&self, id: InterfaceId) -> RegistryResult<InterfaceInfo> {
        self.bounded("get", self.store.get(id)).await
    }

    /// Applies a partial update. The lifecycle state cannot be changed here;
    /// a patch asking for a different status fails with `InvalidTransition`.
    #[tracing::instrument(skip(self, patch), level = "debug")]
    pub async fn update(
        &self,
        id: InterfaceId,
        patch: InterfacePatch,
    ) -> RegistryResult<InterfaceInfo> {
        let _guard = self.lock_record("update", id).await?;
        let current = self.bounded("get", self.store.get(id)).await?;
        LifecycleManager::check_update(id, current.status, patch.status)?;
        let fields = patch.apply_to(current.fields())?;
        let updated = self.bounded("replace", self.store.replace(id, fields)).await?;
        info!(id, "Interface updated");
        Ok(updated)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn delete(&self, id: InterfaceId) -> RegistryResult<()> {
        let _guard = self.lock_record("delete", id).await?;
        let removed = self.bounded("delete", self.store.delete(id)).await?;
        info!(id, name = %removed.name, "Interface deleted");
        Ok(())
    }

    pub async fn online(&self, id: InterfaceId) -> RegistryResult<Transition> {
        let _guard = self.lock_record("online", id).await?;
        self.bounded("online", self.lifecycle.online(id)).await
    }

    pub async fn offline(&self, id: InterfaceId) -> RegistryResult<Transition> {
        let _guard = self.lock_record("offline", id).await?;
        self.bounded("offline", self.lifecycle.offline(id)).await
    }

    /// One page of interfaces matching the query, plus the total match count.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn list_by_page(&self, query: InterfaceQuery) -> RegistryResult<Page<InterfaceInfo>> {
        query.page.validate(self.config.max_page_size)?;
        query.filter.validate()?;
        let (records, total) = self
            .bounded(
                "scan",
                self.store.scan(
                    &query.filter,
                    &query.sort,
                    query.page.offset(),
                    query.page.limit(),
                ),
            )
            .await?;
        debug!(returned = records.len(), total, "Listed interfaces");
        Ok(Page {
            records,
            total: total as u64,
            page_size: query.page.page_size,
            page_number: query.page.page_number,
        })
    }

    /// Up to `n` interfaces by call count, highest first. `n <= 0` yields an
    /// empty list.
    pub async fn top_invocations(&self, n: i64) -> RegistryResult<Vec<InvocationRank>> {
        self.bounded("top_n", self.analytics.top_n(n)).await
    }

    /// Deletes every listed id independently and reports each outcome.
    #[tracing::instrument(skip(self, ids), level = "debug")]
    pub async fn bulk_delete(
        &self,
        ids: impl IntoIterator<Item = InterfaceId>,
    ) -> BulkDeleteResult {
        self.bulk.delete_all(ids, |id| self.delete(id)).await
    }

    /// Records `delta` invocations. Never fails the caller: unknown ids,
    /// store errors and timeouts are logged and dropped.
    pub async fn increment_call_count(&self, id: InterfaceId, delta: u64) {
        let recorded =
            tokio::time::timeout(self.timeout, self.analytics.increment_call_count(id, delta))
                .await;
        if recorded.is_err() {
            warn!(id, delta, "Call count increment timed out");
        }
    }

    pub async fn reset_call_count(&self, id: InterfaceId) -> RegistryResult<()> {
        let _guard = self.lock_record("reset_call_count", id).await?;
        self.bounded("reset_call_count", self.analytics.reset_call_count(id))
            .await
    }

    /// Sum of call counts over `ids`; unknown ids contribute zero.
    pub async fn total_call_count(
        &self,
        ids: impl IntoIterator<Item = InterfaceId>,
    ) -> RegistryResult<u64> {
        let ids: BTreeSet<InterfaceId> = ids.into_iter().collect();
        self.bounded("total_calls", self.analytics.total_calls(&ids))
            .await
    }

    /// Creates a grant letting `request.user_id` call an existing interface.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn add_user_interface(
        &self,
        request: AddUserInterfaceRequest,
    ) -> RegistryResult<GrantId> {
        let grant = self.bounded("add_grant", self.grants.add(request)).await?;
        Ok(grant.id)
    }

    pub async fn get_user_interface(&self, id: GrantId) -> RegistryResult<UserInterfaceInfo> {
        self.grants.get(id)
    }

    /// Changes the remaining calls or the status of a grant.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn update_user_interface(
        &self,
        id: GrantId,
        patch: UserInterfacePatch,
    ) -> RegistryResult<UserInterfaceInfo> {
        self.bounded("update_grant", self.grants.update(id, patch))
            .await
    }

    pub async fn delete_user_interface(&self, id: GrantId) -> RegistryResult<()> {
        self.bounded("delete_grant", self.grants.delete(id))
            .await
            .map(|_| ())
    }

    /// One page of grants in ascending id order, plus the total match count.
    pub async fn list_user_interfaces(
        &self,
        query: UserInterfaceQuery,
    ) -> RegistryResult<Page<UserInterfaceInfo>> {
        query.page.validate(self.config.max_page_size)?;
        self.bounded("scan_grants", async {
            Ok::<_, RegistryError>(self.grants.list(&query).await)
        })
        .await
    }

    /// Records one call of `user_id` to `interface_id` through its grant.
    ///
    /// The grant is charged first; only a successful charge counts towards
    /// the interface's call count.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn invoke_as(
        &self,
        user_id: UserId,
        interface_id: InterfaceId,
    ) -> RegistryResult<UserInterfaceInfo> {
        let grant = self
            .bounded("charge_grant", self.grants.charge(user_id, interface_id))
            .await?;
        self.increment_call_count(interface_id, 1).await;
        Ok(grant)
    }

    pub async fn is_available(&self) -> bool {
        let available =
            async { self.store.is_available().await && self.grants.is_available().await };
        matches!(tokio::time::timeout(self.timeout, available).await, Ok(true))
    }

    /// Writes buffered store state to durable storage.
    pub async fn flush(&self) -> RegistryResult<()> {
        self.bounded("flush", self.store.flush()).await?;
        self.bounded("flush_grants", self.grants.flush()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::InterfaceStatus;
    use crate::query::{InterfaceFilter, SortField, SortOrder, SortSpec};
    use crate::store::{StoreError, StoreResult};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    fn registry() -> InterfaceRegistry {
        InterfaceRegistry::new(RegistryConfig::default(), Arc::new(InMemoryStore::new()))
    }

    fn request(name: &str) -> AddInterfaceRequest {
        AddInterfaceRequest {
            fields: InterfaceFields {
                name: name.to_string(),
                description: Some(format!("{} endpoint", name)),
                method: "get".to_string(),
                url: format!("https://api.example.com/{}", name),
                ..Default::default()
            },
            request_token: None,
        }
    }

    /// Store that sleeps before delegating every call.
    struct SlowStore {
        inner: InMemoryStore,
        delay: Duration,
    }

    #[async_trait]
    impl InterfaceStore for SlowStore {
        async fn insert(&self, fields: InterfaceFields) -> StoreResult<InterfaceInfo> {
            tokio::time::sleep(self.delay).await;
            self.inner.insert(fields).await
        }
        async fn get(&self, id: InterfaceId) -> StoreResult<InterfaceInfo> {
            tokio::time::sleep(self.delay).await;
            self.inner.get(id).await
        }
        async fn replace(
            &self,
            id: InterfaceId,
            fields: InterfaceFields,
        ) -> StoreResult<InterfaceInfo> {
            tokio::time::sleep(self.delay).await;
            self.inner.replace(id, fields).await
        }
        async fn set_status(
            &self,
            id: InterfaceId,
            status: InterfaceStatus,
        ) -> StoreResult<InterfaceStatus> {
            tokio::time::sleep(self.delay).await;
            self.inner.set_status(id, status).await
        }
        async fn delete(&self, id: InterfaceId) -> StoreResult<InterfaceInfo> {
            tokio::time::sleep(self.delay).await;
            self.inner.delete(id).await
        }
        async fn scan(
            &self,
            filter: &InterfaceFilter,
            sort: &SortSpec,
            offset: usize,
            limit: usize,
        ) -> StoreResult<(Vec<InterfaceInfo>, usize)> {
            tokio::time::sleep(self.delay).await;
            self.inner.scan(filter, sort, offset, limit).await
        }
        async fn increment_call_count(&self, id: InterfaceId, delta: u64) -> StoreResult<u64> {
            tokio::time::sleep(self.delay).await;
            self.inner.increment_call_count(id, delta).await
        }
        async fn reset_call_count(&self, id: InterfaceId) -> StoreResult<()> {
            tokio::time::sleep(self.delay).await;
            self.inner.reset_call_count(id).await
        }
        async fn is_available(&self) -> bool {
            tokio::time::sleep(self.delay).await;
            true
        }
    }

    #[tokio::test]
    async fn test_add_assigns_fresh_disabled_records() {
        let registry = registry();
        let a = registry.add(request("users")).await.unwrap();
        let b = registry.add(request("orders")).await.unwrap();
        assert_ne!(a, b);

        let info = registry.get(a).await.unwrap();
        assert_eq!(info.status, InterfaceStatus::Disabled);
        assert_eq!(info.call_no, 0);
        assert_eq!(info.method, "GET");
        assert_eq!(info.create_time, info.update_time);
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_fields() {
        let registry = registry();
        let mut missing_name = request("x");
        missing_name.fields.name = "  ".to_string();
        assert_eq!(
            registry.add(missing_name).await.unwrap_err().kind(),
            ErrorKind::ValidationError
        );

        let mut bad_method = request("x");
        bad_method.fields.method = "FETCH".to_string();
        assert_eq!(
            registry.add(bad_method).await.unwrap_err().kind(),
            ErrorKind::ValidationError
        );
    }

    #[tokio::test]
    async fn test_online_offline_are_idempotent() {
        let registry = registry();
        let id = registry.add(request("users")).await.unwrap();

        let first = registry.online(id).await.unwrap();
        assert!(first.is_changed());
        let second = registry.online(id).await.unwrap();
        assert_eq!(second, Transition::Unchanged(InterfaceStatus::Online));
        assert_eq!(registry.get(id).await.unwrap().status, InterfaceStatus::Online);

        registry.offline(id).await.unwrap();
        registry.offline(id).await.unwrap();
        assert_eq!(
            registry.get(id).await.unwrap().status,
            InterfaceStatus::Disabled
        );

        assert_eq!(
            registry.online(999).await,
            Err(RegistryError::NotFound { id: 999 })
        );
    }

    #[tokio::test]
    async fn test_update_never_moves_status() {
        let registry = registry();
        let id = registry.add(request("users")).await.unwrap();
        registry.increment_call_count(id, 3).await;

        let patch = InterfacePatch {
            status: Some(InterfaceStatus::Online),
            ..Default::default()
        };
        let err = registry.update(id, patch).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);

        let patch = InterfacePatch {
            name: Some("members".to_string()),
            description: Some(String::new()),
            status: Some(InterfaceStatus::Disabled),
            ..Default::default()
        };
        let updated = registry.update(id, patch).await.unwrap();
        assert_eq!(updated.name, "members");
        assert_eq!(updated.description, None);
        assert_eq!(updated.status, InterfaceStatus::Disabled);
        assert_eq!(updated.call_no, 3);
        assert!(updated.update_time >= updated.create_time);
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let registry = registry();
        assert_eq!(
            registry.update(42, InterfacePatch::default()).await,
            Err(RegistryError::NotFound { id: 42 })
        );
    }

    #[tokio::test]
    async fn test_list_second_page() {
        let registry = registry();
        let mut ids = Vec::new();
        for i in 0..25 {
            ids.push(registry.add(request(&format!("api-{:02}", i))).await.unwrap());
        }

        let page = registry
            .list_by_page(InterfaceQuery::page(10, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages(), 3);
        let returned: Vec<InterfaceId> = page.records.iter().map(|r| r.id).collect();
        assert_eq!(returned, ids[10..20].to_vec());

        let past_end = registry
            .list_by_page(InterfaceQuery::page(10, 9))
            .await
            .unwrap();
        assert!(past_end.records.is_empty());
        assert_eq!(past_end.total, 25);
    }

    #[tokio::test]
    async fn test_list_filter_and_sort() {
        let registry = registry();
        registry.add(request("alpha")).await.unwrap();
        let beta = registry.add(request("beta")).await.unwrap();
        let alphabet = registry.add(request("alphabet")).await.unwrap();
        registry.online(beta).await.unwrap();
        registry.online(alphabet).await.unwrap();

        let query = InterfaceQuery::page(10, 1)
            .with_filter(InterfaceFilter {
                status: Some(InterfaceStatus::Online),
                ..Default::default()
            })
            .with_sort(SortSpec::new(SortField::Name, SortOrder::Desc));
        let page = registry.list_by_page(query).await.unwrap();
        let names: Vec<&str> = page.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["beta", "alphabet"]);
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_list_rejects_bad_page() {
        let registry = registry();
        for query in [
            InterfaceQuery::page(0, 1),
            InterfaceQuery::page(10, 0),
            InterfaceQuery::page(101, 1),
        ] {
            assert_eq!(
                registry.list_by_page(query).await.unwrap_err().kind(),
                ErrorKind::ValidationError
            );
        }
    }

    #[tokio::test]
    async fn test_top_invocations() {
        let registry = registry();
        let mut ids = Vec::new();
        for (name, calls) in [("a", 5), ("b", 5), ("c", 3), ("d", 1)] {
            let id = registry.add(request(name)).await.unwrap();
            registry.increment_call_count(id, calls).await;
            ids.push(id);
        }

        let top = registry.top_invocations(3).await.unwrap();
        let ranked: Vec<(InterfaceId, u64)> = top.iter().map(|r| (r.id, r.call_no)).collect();
        assert_eq!(ranked, vec![(ids[0], 5), (ids[1], 5), (ids[2], 3)]);

        assert!(registry.top_invocations(0).await.unwrap().is_empty());
        assert!(registry.top_invocations(-1).await.unwrap().is_empty());
        assert_eq!(registry.top_invocations(50).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_bulk_delete_reports_missing_ids() {
        let registry = registry();
        let a = registry.add(request("a")).await.unwrap();
        let b = registry.add(request("b")).await.unwrap();
        let c = registry.add(request("c")).await.unwrap();
        registry.delete(b).await.unwrap();

        let result = registry.bulk_delete([a, b, c]).await;
        assert_eq!(result.succeeded, BTreeSet::from([a, c]));
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[&b].kind, ErrorKind::NotFound);
        assert_eq!(
            registry.get(a).await,
            Err(RegistryError::NotFound { id: a })
        );
        assert_eq!(
            registry.get(c).await,
            Err(RegistryError::NotFound { id: c })
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let registry = registry();
        let id = registry.add(request("hot")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..200 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.increment_call_count(id, 1).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(registry.get(id).await.unwrap().call_no, 200);
        assert_eq!(registry.total_call_count([id, 12345]).await.unwrap(), 200);

        registry.reset_call_count(id).await.unwrap();
        assert_eq!(registry.get(id).await.unwrap().call_no, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutations_of_one_record() {
        let registry = registry();
        let id = registry.add(request("shared")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    registry.online(id).await.map(|_| ())
                } else {
                    let patch = InterfacePatch {
                        description: Some(format!("rev {}", i)),
                        ..Default::default()
                    };
                    registry.update(id, patch).await.map(|_| ())
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        let info = registry.get(id).await.unwrap();
        assert_eq!(info.status, InterfaceStatus::Online);
        assert!(info.description.unwrap().starts_with("rev "));
        assert_eq!(registry.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_locked_record_does_not_block_others() {
        let registry = registry();
        let a = registry.add(request("a")).await.unwrap();
        let b = registry.add(request("b")).await.unwrap();

        let held = registry.locks.acquire(a).await;
        let other = tokio::time::timeout(Duration::from_secs(5), async {
            registry.online(b).await?;
            let patch = InterfacePatch {
                url: Some("https://api.example.com/v2/b".to_string()),
                ..Default::default()
            };
            registry.update(b, patch).await
        })
        .await
        .expect("mutations of another record must not wait");
        let updated = other.unwrap();
        assert_eq!(updated.status, InterfaceStatus::Online);
        assert_eq!(updated.url, "https://api.example.com/v2/b");

        // The held record itself stays blocked until its lock is released.
        let blocked = registry
            .with_timeout(Duration::from_millis(50))
            .online(a)
            .await
            .unwrap_err();
        assert_eq!(blocked.kind(), ErrorKind::Timeout);
        drop(held);
        assert!(registry.online(a).await.unwrap().is_changed());
    }

    #[tokio::test]
    async fn test_deleted_ids_are_not_reused() {
        let registry = registry();
        let a = registry.add(request("a")).await.unwrap();
        registry.delete(a).await.unwrap();
        assert_eq!(
            registry.get(a).await,
            Err(RegistryError::NotFound { id: a })
        );
        assert_eq!(
            registry.delete(a).await,
            Err(RegistryError::NotFound { id: a })
        );

        let b = registry.add(request("a")).await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_increment_unknown_id_is_swallowed() {
        let registry = registry();
        registry.increment_call_count(77, 1).await;
        assert_eq!(
            registry.get(77).await,
            Err(RegistryError::NotFound { id: 77 })
        );
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let store = Arc::new(SlowStore {
            inner: InMemoryStore::new(),
            delay: Duration::from_millis(200),
        });
        let registry = InterfaceRegistry::new(RegistryConfig::default(), store)
            .with_timeout(Duration::from_millis(20));

        let err = registry.add(request("slow")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_retryable());

        let err = registry
            .list_by_page(InterfaceQuery::page(10, 1))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Timeout {
                operation: "scan",
                timeout: Duration::from_millis(20)
            }
        );

        registry.increment_call_count(1, 1).await;
        assert!(!registry.is_available().await);
        assert_eq!(registry.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_request_token_replay() {
        let registry = registry();
        let mut first = request("users");
        first.request_token = Some("tok-1".to_string());

        let a = registry.add(first.clone()).await.unwrap();
        let again = registry.add(first.clone()).await.unwrap();
        assert_eq!(a, again);
        assert_eq!(
            registry
                .list_by_page(InterfaceQuery::page(10, 1))
                .await
                .unwrap()
                .total,
            1
        );

        let mut conflicting = request("orders");
        conflicting.request_token = Some("tok-1".to_string());
        assert_eq!(
            registry.add(conflicting).await.unwrap_err().kind(),
            ErrorKind::DuplicateKey
        );

        let mut blank = request("users");
        blank.request_token = Some("   ".to_string());
        let c = registry.add(blank).await.unwrap();
        assert_ne!(a, c);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_with_one_token_insert_once() {
        let registry = registry();
        let mut shared = request("users");
        shared.request_token = Some("tok-burst".to_string());

        let mut handles = Vec::new();
        for _ in 0..50 {
            let registry = registry.clone();
            let shared = shared.clone();
            handles.push(tokio::spawn(async move { registry.add(shared).await }));
        }
        let mut ids = BTreeSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap().unwrap());
        }
        assert_eq!(ids.len(), 1);

        let page = registry
            .list_by_page(InterfaceQuery::page(10, 1))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_grant_lifecycle() {
        let registry = registry();
        let interface_id = registry.add(request("users")).await.unwrap();

        let grant_id = registry
            .add_user_interface(AddUserInterfaceRequest {
                user_id: 42,
                interface_info_id: interface_id,
                left_num: 5,
            })
            .await
            .unwrap();
        let duplicate = registry
            .add_user_interface(AddUserInterfaceRequest {
                user_id: 42,
                interface_info_id: interface_id,
                left_num: 1,
            })
            .await
            .unwrap_err();
        assert_eq!(duplicate.kind(), ErrorKind::DuplicateKey);

        let patch = UserInterfacePatch {
            left_num: Some(9),
            ..Default::default()
        };
        let updated = registry.update_user_interface(grant_id, patch).await.unwrap();
        assert_eq!(updated.left_num, 9);

        let page = registry
            .list_user_interfaces(UserInterfaceQuery::page(10, 1))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert!(
            registry
                .list_user_interfaces(UserInterfaceQuery::page(0, 1))
                .await
                .is_err()
        );

        registry.delete_user_interface(grant_id).await.unwrap();
        assert_eq!(
            registry.get_user_interface(grant_id).await,
            Err(RegistryError::GrantNotFound { id: grant_id })
        );
        assert_eq!(
            registry.delete_user_interface(grant_id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_invoke_as_feeds_call_counts() {
        let registry = registry();
        let hot = registry.add(request("hot")).await.unwrap();
        let cold = registry.add(request("cold")).await.unwrap();
        registry.online(hot).await.unwrap();
        registry.online(cold).await.unwrap();
        for (user_id, interface_id) in [(1, hot), (2, hot), (1, cold)] {
            registry
                .add_user_interface(AddUserInterfaceRequest {
                    user_id,
                    interface_info_id: interface_id,
                    left_num: 2,
                })
                .await
                .unwrap();
        }

        for user_id in [1, 2, 1, 2] {
            registry.invoke_as(user_id, hot).await.unwrap();
        }
        let grant = registry.invoke_as(1, cold).await.unwrap();
        assert_eq!((grant.total_num, grant.left_num), (1, 1));

        let exhausted = registry.invoke_as(1, hot).await.unwrap_err();
        assert_eq!(exhausted.kind(), ErrorKind::Forbidden);
        let stranger = registry.invoke_as(3, hot).await.unwrap_err();
        assert_eq!(stranger.kind(), ErrorKind::Forbidden);

        let top = registry.top_invocations(2).await.unwrap();
        let ranked: Vec<(InterfaceId, u64)> = top.iter().map(|r| (r.id, r.call_no)).collect();
        assert_eq!(ranked, vec![(hot, 4), (cold, 1)]);
    }

    #[tokio::test]
    async fn test_open_local_fs_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig {
            storage: StorageConfig::LocalFs {
                path: dir.path().join("data").to_string_lossy().into_owned(),
            },
            ..Default::default()
        };

        let registry = InterfaceRegistry::open(config.clone()).await.unwrap();
        let id = registry.add(request("users")).await.unwrap();
        registry.online(id).await.unwrap();
        registry.increment_call_count(id, 4).await;
        let grant_id = registry
            .add_user_interface(AddUserInterfaceRequest {
                user_id: 7,
                interface_info_id: id,
                left_num: 3,
            })
            .await
            .unwrap();
        registry.invoke_as(7, id).await.unwrap();
        registry.flush().await.unwrap();

        let reopened = InterfaceRegistry::open(config).await.unwrap();
        let info = reopened.get(id).await.unwrap();
        assert_eq!(info.status, InterfaceStatus::Online);
        assert_eq!(info.call_no, 5);
        let grant = reopened.get_user_interface(grant_id).await.unwrap();
        assert_eq!((grant.total_num, grant.left_num), (1, 2));
        assert!(reopened.is_available().await);
        assert!(dir.path().join("data/interfaces").is_dir());
        assert!(dir.path().join("data/user_interfaces").is_dir());
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let config = RegistryConfig {
            bulk_concurrency: 0,
            ..Default::default()
        };
        assert!(matches!(
            InterfaceRegistry::open(config).await,
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_store_errors_map_to_registry_errors() {
        let err: RegistryError = StoreError::Unavailable("disk gone".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    }
}
