//! Provisioner
//!
//! Creates what missing hosts need, in two fan-out phases:
//! 1. one namespace per distinct host namespace (409 is ignored)
//! 2. per host, a credential entry and then the record that references it
//!
//! Every request in a phase is issued before any is awaited, and every one
//! settles before the phase ends. A failed credential entry stops that host
//! only. If the record fails after its credential entry was created, the
//! entry is left behind.

use crate::codec::credentials_secret;
use crate::error::{ErrorItem, ItemError};
use crate::hosts::{HostRequest, MANAGED_BY, MANAGED_BY_LABEL};
use crds::{BareMetalAsset, BareMetalAssetSpec, BmcReference};
use futures::future::join_all;
use inventory_client::InventoryStoreTrait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Hardware profile recorded when the host does not name one
pub const DEFAULT_HARDWARE_PROFILE: &str = "default";

/// Result of one provisioning call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvisionOutcome {
    pub created: Vec<BareMetalAsset>,
    pub errors: Vec<ItemError>,
}

/// Progress of a single host through phase 2
#[derive(Debug)]
enum HostProvisioning {
    CreatingCredential(HostRequest),
    CreatingInventory(HostRequest),
    Done(BareMetalAsset),
    Failed(ItemError),
}

impl HostProvisioning {
    async fn step(self, store: &dyn InventoryStoreTrait) -> Self {
        match self {
            HostProvisioning::CreatingCredential(host) => {
                debug!("Creating credential entry {}/{}", host.namespace, host.credentials_name());
                match store.create_secret(&credentials_secret(&host)).await {
                    Ok(_) => HostProvisioning::CreatingInventory(host),
                    Err(e) => {
                        warn!("Credential entry for {} failed: {}", host.identity_key(), e);
                        HostProvisioning::Failed(ItemError::from_store(&e, ErrorItem::Host(host)))
                    }
                }
            }
            HostProvisioning::CreatingInventory(host) => {
                debug!("Creating inventory record {}/{}", host.namespace, host.name);
                match store.create_asset(&asset_for_host(&host)).await {
                    Ok(asset) => HostProvisioning::Done(asset),
                    Err(e) => {
                        warn!("Inventory record for {} failed: {}", host.identity_key(), e);
                        HostProvisioning::Failed(ItemError::from_store(&e, ErrorItem::Host(host)))
                    }
                }
            }
            settled => settled,
        }
    }

    async fn run(mut self, store: &dyn InventoryStoreTrait) -> Result<BareMetalAsset, ItemError> {
        loop {
            self = match self {
                HostProvisioning::Done(asset) => return Ok(asset),
                HostProvisioning::Failed(error) => return Err(error),
                pending => pending.step(store).await,
            };
        }
    }
}

/// Record to create for a host; credentials are referenced, never embedded
pub fn asset_for_host(host: &HostRequest) -> BareMetalAsset {
    BareMetalAsset {
        metadata: ObjectMeta {
            name: Some(host.name.clone()),
            namespace: Some(host.namespace.clone()),
            labels: Some(BTreeMap::from([(
                MANAGED_BY_LABEL.to_string(),
                MANAGED_BY.to_string(),
            )])),
            ..Default::default()
        },
        spec: BareMetalAssetSpec {
            bmc: BmcReference {
                address: host.bmc.address.clone(),
                credentials_name: host.credentials_name(),
            },
            boot_mac_address: host.boot_mac_address.clone(),
            hardware_profile: Some(
                host.hardware_profile
                    .clone()
                    .unwrap_or_else(|| DEFAULT_HARDWARE_PROFILE.to_string()),
            ),
            role: host.role,
            owner: None,
        },
        status: None,
    }
}

/// Provision every host in `missing`
///
/// The outcome always carries every record that was created, alongside one
/// error per failed host and one per failed namespace.
pub async fn provision(store: &dyn InventoryStoreTrait, missing: &[HostRequest]) -> ProvisionOutcome {
    let mut outcome = ProvisionOutcome::default();
    if missing.is_empty() {
        return outcome;
    }

    outcome.errors.extend(create_namespaces(store, missing).await);

    info!("Provisioning {} host(s)", missing.len());
    let pipelines = missing
        .iter()
        .cloned()
        .map(|host| HostProvisioning::CreatingCredential(host).run(store));
    for result in join_all(pipelines).await {
        match result {
            Ok(asset) => outcome.created.push(asset),
            Err(error) => outcome.errors.push(error),
        }
    }

    info!(
        "Provisioning finished: {} created, {} failed",
        outcome.created.len(),
        outcome.errors.iter().filter(|e| e.is_host()).count()
    );
    outcome
}

/// Phase 1: create each distinct namespace once
async fn create_namespaces(store: &dyn InventoryStoreTrait, hosts: &[HostRequest]) -> Vec<ItemError> {
    let namespaces: BTreeSet<&str> = hosts.iter().map(|h| h.namespace.as_str()).collect();
    info!("Ensuring {} namespace(s)", namespaces.len());

    let requests = namespaces
        .into_iter()
        .map(|ns| async move { (ns, store.create_namespace(ns).await) });

    join_all(requests)
        .await
        .into_iter()
        .filter_map(|(ns, result)| match result {
            Ok(()) => {
                debug!("Created namespace {}", ns);
                None
            }
            Err(e) if e.is_conflict() => {
                debug!("Namespace {} already exists", ns);
                None
            }
            Err(e) => {
                warn!("Failed to create namespace {}: {}", ns, e);
                Some(ItemError::from_store(&e, ErrorItem::Namespace(ns.to_string())))
            }
        })
        .collect()
}
