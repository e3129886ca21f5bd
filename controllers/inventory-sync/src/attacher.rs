//! Attacher: links records to an owning workload

use crds::{BareMetalAsset, HostRole, WorkloadReference};
use futures::future::join_all;
use inventory_client::InventoryStoreTrait;
use serde_json::json;
use tracing::{debug, info, warn};

/// A record that could not be attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachError {
    /// Identity key of the record
    pub key: String,
    pub message: String,
    pub code: Option<u16>,
}

/// Merge patch setting role and owner
pub fn attach_patch(role: HostRole, owner: &WorkloadReference) -> serde_json::Value {
    json!({
        "spec": {
            "role": role,
            "owner": owner,
        }
    })
}

/// Patch role and owner onto every record, in parallel
///
/// The same patch is sent whatever the current state, so repeating a call is
/// harmless. One failed patch does not hold back the others.
pub async fn attach(
    store: &dyn InventoryStoreTrait,
    records: &[BareMetalAsset],
    role: HostRole,
    owner: &WorkloadReference,
) -> Vec<AttachError> {
    if records.is_empty() {
        return Vec::new();
    }
    info!(
        "Attaching {} record(s) as {} to {}/{}",
        records.len(),
        role,
        owner.namespace,
        owner.name
    );

    let patch = attach_patch(role, owner);
    let patches = records.iter().map(|record| {
        let patch = &patch;
        async move {
            let key = record.identity_key();
            let (Some(name), Some(namespace)) =
                (record.metadata.name.as_deref(), record.metadata.namespace.as_deref())
            else {
                return Err(AttachError {
                    key,
                    message: "record has no name or namespace".to_string(),
                    code: None,
                });
            };
            debug!("Patching {}/{}", namespace, name);
            store
                .patch_asset(name, namespace, patch)
                .await
                .map(|_| ())
                .map_err(|e| AttachError {
                    key,
                    message: e.to_string(),
                    code: e.code(),
                })
        }
    });

    let errors: Vec<AttachError> = join_all(patches)
        .await
        .into_iter()
        .filter_map(Result::err)
        .collect();
    for error in &errors {
        warn!("Failed to attach {}: {}", error.key, error.message);
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use inventory_client::{MockInventoryStore, Operation};

    fn seeded(names: &[&str]) -> (MockInventoryStore, Vec<BareMetalAsset>) {
        let store = MockInventoryStore::new();
        let records: Vec<BareMetalAsset> = names.iter().map(|n| create_test_asset(n, "lab")).collect();
        for record in &records {
            store.add_asset(record.clone());
        }
        (store, records)
    }

    #[test]
    fn test_attach_patch_shape() {
        let patch = attach_patch(HostRole::Master, &WorkloadReference::new("c1", "c1-ns"));
        assert_eq!(
            patch,
            json!({"spec": {"role": "master", "owner": {"name": "c1", "namespace": "c1-ns"}}})
        );
    }

    #[tokio::test]
    async fn test_attach_sets_role_and_owner() {
        let (store, records) = seeded(&["a", "b"]);
        let owner = WorkloadReference::new("c1", "c1-ns");

        let errors = attach(&store, &records, HostRole::Worker, &owner).await;

        assert!(errors.is_empty());
        for name in ["a", "b"] {
            let stored = store.asset(name, "lab").unwrap();
            assert_eq!(stored.spec.role, Some(HostRole::Worker));
            assert_eq!(stored.spec.owner.as_ref(), Some(&owner));
            // Untouched fields survive the merge
            assert_eq!(stored.spec.bmc.credentials_name, format!("{}-bmc-secret", name));
        }
    }

    #[tokio::test]
    async fn test_attach_is_idempotent() {
        let (store, records) = seeded(&["a", "b"]);
        let owner = WorkloadReference::new("c1", "c1-ns");

        assert!(attach(&store, &records, HostRole::Master, &owner).await.is_empty());
        let first = store.asset("a", "lab").unwrap();
        assert!(attach(&store, &records, HostRole::Master, &owner).await.is_empty());
        let second = store.asset("a", "lab").unwrap();

        assert_eq!(first.spec, second.spec);
        assert_eq!(store.calls_of(Operation::PatchAsset).len(), 4);
    }

    #[tokio::test]
    async fn test_attach_failure_does_not_block_others() {
        let (store, records) = seeded(&["a", "b", "c"]);
        store.fail(Operation::PatchAsset, "lab/b", 500);
        let owner = WorkloadReference::new("c1", "c1-ns");

        let errors = attach(&store, &records, HostRole::Worker, &owner).await;

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].key, "b-lab");
        assert_eq!(errors[0].code, Some(500));
        assert!(store.asset("a", "lab").unwrap().spec.owner.is_some());
        assert!(store.asset("b", "lab").unwrap().spec.owner.is_none());
        assert!(store.asset("c", "lab").unwrap().spec.owner.is_some());
    }

    #[tokio::test]
    async fn test_attach_reports_missing_records() {
        let store = MockInventoryStore::new();
        let mut unnamed = create_test_asset("x", "lab");
        unnamed.metadata.name = None;
        let records = vec![create_test_asset("gone", "lab"), unnamed];

        let errors = attach(&store, &records, HostRole::Worker, &WorkloadReference::new("c1", "c1")).await;

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].code, Some(404));
        assert_eq!(errors[1].code, None);
        assert_eq!(store.calls_of(Operation::PatchAsset), vec!["lab/gone"]);
    }
}
