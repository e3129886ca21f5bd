//! Mock inventory store for unit testing
//!
//! Keeps records in memory, behaves like the API server for the cases the
//! orchestration code cares about (409 on duplicate create, 404 on missing
//! records or namespaces, merge-patch semantics), and lets tests inject a
//! failure code for any single operation on any single target.
//!
//! Every operation records itself and then yields once before touching the
//! store, so tests can observe which requests were issued before any of them
//! completed.

mod merge;

use crate::error::{StoreError, CONFLICT, NOT_FOUND};
use crate::store_trait::InventoryStoreTrait;
use crds::{BareMetalAsset, OpaqueSecret};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Store operations, used for failure injection and call recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListAssets,
    GetAsset,
    CreateAsset,
    PatchAsset,
    GetSecret,
    CreateSecret,
    PatchSecret,
    CreateNamespace,
}

/// One recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub operation: Operation,
    /// `namespace/name` for namespaced records, the bare name for namespaces
    pub target: String,
}

type Key = (String, String);

/// Mock inventory store for testing
#[derive(Clone, Default)]
pub struct MockInventoryStore {
    pub(crate) assets: Arc<Mutex<HashMap<Key, BareMetalAsset>>>,
    pub(crate) secrets: Arc<Mutex<HashMap<Key, OpaqueSecret>>>,
    pub(crate) namespaces: Arc<Mutex<HashSet<String>>>,
    pub(crate) failures: Arc<Mutex<HashMap<(Operation, String), u16>>>,
    pub(crate) calls: Arc<Mutex<Vec<StoreCall>>>,
    pub(crate) next_uid: Arc<Mutex<u64>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn target(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

fn record_key(meta: &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta, kind: &str) -> Result<Key, StoreError> {
    match (&meta.namespace, &meta.name) {
        (Some(ns), Some(name)) => Ok((ns.clone(), name.clone())),
        _ => Err(StoreError::InvalidRecord(format!("{} needs a name and namespace", kind))),
    }
}

impl MockInventoryStore {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing namespace (for test setup)
    pub fn add_namespace(&self, name: impl Into<String>) {
        lock(&self.namespaces).insert(name.into());
    }

    /// Add an asset to the mock store (for test setup); its namespace is registered too
    pub fn add_asset(&self, asset: BareMetalAsset) {
        if let Ok(key) = record_key(&asset.metadata, "BareMetalAsset") {
            self.add_namespace(key.0.clone());
            lock(&self.assets).insert(key, asset);
        }
    }

    /// Add a secret to the mock store (for test setup); its namespace is registered too
    pub fn add_secret(&self, secret: OpaqueSecret) {
        if let Ok(key) = record_key(&secret.metadata, "Secret") {
            self.add_namespace(key.0.clone());
            lock(&self.secrets).insert(key, secret);
        }
    }

    /// Make `operation` on `target` fail with `code`
    ///
    /// `target` is `namespace/name`, or the bare name for `CreateNamespace`
    /// and the namespace (or `*`) for `ListAssets`.
    pub fn fail(&self, operation: Operation, target: impl Into<String>, code: u16) {
        lock(&self.failures).insert((operation, target.into()), code);
    }

    /// Every call made so far, in issue order
    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }

    /// Calls of one operation kind, in issue order
    pub fn calls_of(&self, operation: Operation) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter(|c| c.operation == operation)
            .map(|c| c.target.clone())
            .collect()
    }

    /// Current stored copy of an asset
    pub fn asset(&self, name: &str, namespace: &str) -> Option<BareMetalAsset> {
        lock(&self.assets).get(&(namespace.to_string(), name.to_string())).cloned()
    }

    /// Current stored copy of a secret
    pub fn secret(&self, name: &str, namespace: &str) -> Option<OpaqueSecret> {
        lock(&self.secrets).get(&(namespace.to_string(), name.to_string())).cloned()
    }

    /// True when the namespace exists
    pub fn has_namespace(&self, name: &str) -> bool {
        lock(&self.namespaces).contains(name)
    }

    /// Record the call, yield once, then report any injected failure
    async fn enter(&self, operation: Operation, target: String) -> Result<(), StoreError> {
        lock(&self.calls).push(StoreCall {
            operation,
            target: target.clone(),
        });
        tokio::task::yield_now().await;
        match lock(&self.failures).get(&(operation, target.clone())) {
            Some(code) => Err(StoreError::api(*code, format!("injected failure for {:?} {}", operation, target))),
            None => Ok(()),
        }
    }

    fn require_namespace(&self, namespace: &str) -> Result<(), StoreError> {
        if self.has_namespace(namespace) {
            Ok(())
        } else {
            Err(StoreError::api(NOT_FOUND, format!("namespaces \"{}\" not found", namespace)))
        }
    }

    fn next_uid(&self) -> String {
        let mut next = lock(&self.next_uid);
        *next += 1;
        format!("uid-{}", *next)
    }
}

#[async_trait::async_trait]
impl InventoryStoreTrait for MockInventoryStore {
    async fn list_assets(&self, namespace: Option<&str>) -> Result<Vec<BareMetalAsset>, StoreError> {
        self.enter(Operation::ListAssets, namespace.unwrap_or("*").to_string()).await?;
        let assets = lock(&self.assets);
        Ok(assets
            .iter()
            .filter(|((ns, _), _)| namespace.is_none_or(|wanted| wanted == ns))
            .map(|(_, asset)| asset.clone())
            .collect())
    }

    async fn get_asset(&self, name: &str, namespace: &str) -> Result<BareMetalAsset, StoreError> {
        self.enter(Operation::GetAsset, target(namespace, name)).await?;
        self.asset(name, namespace).ok_or_else(|| {
            StoreError::api(NOT_FOUND, format!("baremetalassets \"{}\" not found", name))
        })
    }

    async fn create_asset(&self, asset: &BareMetalAsset) -> Result<BareMetalAsset, StoreError> {
        let key = record_key(&asset.metadata, "BareMetalAsset")?;
        self.enter(Operation::CreateAsset, target(&key.0, &key.1)).await?;
        self.require_namespace(&key.0)?;

        let mut assets = lock(&self.assets);
        if assets.contains_key(&key) {
            return Err(StoreError::api(CONFLICT, format!("baremetalassets \"{}\" already exists", key.1)));
        }
        let mut created = asset.clone();
        created.metadata.uid = Some(self.next_uid());
        assets.insert(key, created.clone());
        Ok(created)
    }

    async fn patch_asset(&self, name: &str, namespace: &str, patch: &serde_json::Value) -> Result<BareMetalAsset, StoreError> {
        self.enter(Operation::PatchAsset, target(namespace, name)).await?;
        let key = (namespace.to_string(), name.to_string());
        let mut assets = lock(&self.assets);
        let current = assets.get(&key).ok_or_else(|| {
            StoreError::api(NOT_FOUND, format!("baremetalassets \"{}\" not found", name))
        })?;
        let mut value = serde_json::to_value(current)?;
        merge::merge_patch(&mut value, patch);
        let patched: BareMetalAsset = serde_json::from_value(value)?;
        assets.insert(key, patched.clone());
        Ok(patched)
    }

    async fn get_secret(&self, name: &str, namespace: &str) -> Result<OpaqueSecret, StoreError> {
        self.enter(Operation::GetSecret, target(namespace, name)).await?;
        self.secret(name, namespace).ok_or_else(|| {
            StoreError::api(NOT_FOUND, format!("secrets \"{}\" not found", name))
        })
    }

    async fn create_secret(&self, secret: &OpaqueSecret) -> Result<OpaqueSecret, StoreError> {
        let key = record_key(&secret.metadata, "Secret")?;
        self.enter(Operation::CreateSecret, target(&key.0, &key.1)).await?;
        self.require_namespace(&key.0)?;

        let mut secrets = lock(&self.secrets);
        if secrets.contains_key(&key) {
            return Err(StoreError::api(CONFLICT, format!("secrets \"{}\" already exists", key.1)));
        }
        let mut created = secret.clone();
        created.metadata.uid = Some(self.next_uid());
        secrets.insert(key, created.clone());
        Ok(created)
    }

    async fn patch_secret(&self, name: &str, namespace: &str, patch: &serde_json::Value) -> Result<OpaqueSecret, StoreError> {
        self.enter(Operation::PatchSecret, target(namespace, name)).await?;
        let key = (namespace.to_string(), name.to_string());
        let mut secrets = lock(&self.secrets);
        let current = secrets.get(&key).ok_or_else(|| {
            StoreError::api(NOT_FOUND, format!("secrets \"{}\" not found", name))
        })?;
        let mut value = serde_json::to_value(current)?;
        merge::merge_patch(&mut value, patch);
        let patched: OpaqueSecret = serde_json::from_value(value)?;
        secrets.insert(key, patched.clone());
        Ok(patched)
    }

    async fn create_namespace(&self, name: &str) -> Result<(), StoreError> {
        self.enter(Operation::CreateNamespace, name.to_string()).await?;
        let mut namespaces = lock(&self.namespaces);
        if !namespaces.insert(name.to_string()) {
            return Err(StoreError::api(CONFLICT, format!("namespaces \"{}\" already exists", name)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::{BareMetalAssetSpec, BmcReference};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn asset(name: &str, namespace: &str) -> BareMetalAsset {
        BareMetalAsset {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            spec: BareMetalAssetSpec {
                bmc: BmcReference {
                    address: "ipmi://10.0.0.1".to_string(),
                    credentials_name: format!("{}-bmc-secret", name),
                },
                boot_mac_address: "00:90:7F:12:DE:7F".to_string(),
                ..Default::default()
            },
            status: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_uid_and_rejects_duplicates() {
        let store = MockInventoryStore::new();
        store.add_namespace("lab");

        let created = store.create_asset(&asset("host-0", "lab")).await.unwrap();
        assert!(created.metadata.uid.is_some());

        let err = store.create_asset(&asset("host-0", "lab")).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_create_into_missing_namespace_is_not_found() {
        let store = MockInventoryStore::new();
        let err = store.create_asset(&asset("host-0", "nowhere")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_namespace_conflict_and_injected_failure() {
        let store = MockInventoryStore::new();
        store.create_namespace("lab").await.unwrap();
        assert!(store.create_namespace("lab").await.unwrap_err().is_conflict());

        store.fail(Operation::CreateNamespace, "locked", 403);
        let err = store.create_namespace("locked").await.unwrap_err();
        assert_eq!(err.code(), Some(403));
        assert_eq!(store.calls_of(Operation::CreateNamespace).len(), 3);
    }

    #[tokio::test]
    async fn test_patch_asset_merges_into_stored_copy() {
        let store = MockInventoryStore::new();
        store.add_asset(asset("host-0", "lab"));

        let patched = store
            .patch_asset(
                "host-0",
                "lab",
                &serde_json::json!({ "spec": { "role": "worker", "owner": { "name": "c1", "namespace": "c1" } } }),
            )
            .await
            .unwrap();
        assert_eq!(patched.spec.role, Some(crds::HostRole::Worker));
        assert_eq!(store.asset("host-0", "lab").unwrap().spec.owner.unwrap().name, "c1");
        assert_eq!(patched.spec.bmc.address, "ipmi://10.0.0.1");
    }

    #[tokio::test]
    async fn test_list_assets_filters_by_namespace() {
        let store = MockInventoryStore::new();
        store.add_asset(asset("a", "lab"));
        store.add_asset(asset("b", "prod"));

        assert_eq!(store.list_assets(None).await.unwrap().len(), 2);
        let lab = store.list_assets(Some("lab")).await.unwrap();
        assert_eq!(lab.len(), 1);
        assert_eq!(lab[0].metadata.name.as_deref(), Some("a"));
    }
}
