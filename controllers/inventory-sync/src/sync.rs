//! Aggregate calls: the full sync of a desired host set, and attach

use crate::attacher::{AttachError, attach};
use crate::codec::{decode_document, encode_document};
use crate::error::{ItemError, SyncError};
use crate::hosts::HostRequest;
use crate::provisioner::provision;
use crate::reconciler::{apply_credentials, reconcile, recover_credentials};
use crds::{BareMetalAsset, HostRole, WorkloadReference};
use inventory_client::InventoryStoreTrait;
use tracing::info;

/// Result of [`sync_hosts`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncOutcome {
    /// Records that already existed for desired hosts
    pub matched: Vec<BareMetalAsset>,
    /// Records created by this call
    pub created: Vec<BareMetalAsset>,
    /// One entry per failed host, plus any failed namespace
    pub errors: Vec<ItemError>,
    /// Credential lookups that failed during recovery
    pub credential_errors: Vec<ItemError>,
    /// Desired hosts, with any recovered credentials applied
    pub hosts: Vec<HostRequest>,
    /// Re-encoded install-config document, only when it changed
    pub install_document: Option<String>,
}

impl SyncOutcome {
    /// `matched` followed by `created`
    pub fn working_inventory(&self) -> Vec<BareMetalAsset> {
        self.matched.iter().chain(&self.created).cloned().collect()
    }

    /// Number of hosts that ended up in `errors`
    pub fn failed_hosts(&self) -> usize {
        self.errors.iter().filter(|e| e.is_host()).count()
    }
}

/// Reconcile `desired` against `existing` and provision what is missing
///
/// When an encoded install-config document is supplied, credentials missing
/// from it are recovered from the credential entries of matching records and
/// written into both the document and the desired hosts. A document that does
/// not decode is the only error returned; per-host failures are collected in
/// the outcome.
pub async fn sync_hosts(
    store: &dyn InventoryStoreTrait,
    mut desired: Vec<HostRequest>,
    existing: &[BareMetalAsset],
    install_document: Option<&str>,
) -> Result<SyncOutcome, SyncError> {
    info!("Syncing {} host(s) against {} record(s)", desired.len(), existing.len());
    let document = install_document.map(decode_document).transpose()?;

    let mut outcome = SyncOutcome::default();
    if let Some(document) = document {
        let recovery = recover_credentials(store, &document, existing).await;
        apply_credentials(&mut desired, &recovery.credentials);

        let updated = document.with_host_credentials(&recovery.credentials);
        if updated != document {
            outcome.install_document = Some(encode_document(&updated)?);
        }
        outcome.credential_errors = recovery.errors;
    }

    let reconciliation = reconcile(desired.clone(), existing);
    outcome.matched = reconciliation.matched.into_iter().map(|m| m.asset).collect();

    let provisioned = provision(store, &reconciliation.to_create).await;
    outcome.created = provisioned.created;
    outcome.errors = provisioned.errors;
    outcome.hosts = desired;

    info!(
        "Sync finished: {} matched, {} created, {} failed",
        outcome.matched.len(),
        outcome.created.len(),
        outcome.failed_hosts()
    );
    Ok(outcome)
}

/// Attach records to `owner` under `role`
pub async fn attach_hosts(
    store: &dyn InventoryStoreTrait,
    records: &[BareMetalAsset],
    role: HostRole,
    owner: &WorkloadReference,
) -> Vec<AttachError> {
    attach(store, records, role, owner).await
}
