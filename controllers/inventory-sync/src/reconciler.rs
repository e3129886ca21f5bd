//! Inventory reconciler
//!
//! Matches desired hosts against existing records by identity key, and
//! recovers credentials for install-config hosts that lost them.

use crate::codec::{InstallConfigDocument, credentials_from_secret, decode_credential};
use crate::error::{ErrorItem, ItemError, SyncError};
use crate::hosts::{BmcCredentials, BmcDetails, HostRequest};
use crds::{BareMetalAsset, PASSWORD_KEY, USERNAME_KEY};
use futures::future::join_all;
use inventory_client::InventoryStoreTrait;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A desired host that already has a record
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedHost {
    pub host: HostRequest,
    pub asset: BareMetalAsset,
}

/// Partition of the desired hosts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub matched: Vec<MatchedHost>,
    pub to_create: Vec<HostRequest>,
}

/// Credentials recovered from existing credential entries
#[derive(Debug, Default)]
pub struct CredentialRecovery {
    /// Keyed by host identity key
    pub credentials: HashMap<String, BmcCredentials>,
    pub errors: Vec<ItemError>,
}

/// Index existing records by identity key
pub fn index_by_key(existing: &[BareMetalAsset]) -> HashMap<String, &BareMetalAsset> {
    existing.iter().map(|a| (a.identity_key(), a)).collect()
}

/// Split desired hosts into those with a matching record and those without
///
/// Input order is preserved in both halves.
pub fn reconcile(desired: Vec<HostRequest>, existing: &[BareMetalAsset]) -> Reconciliation {
    let index = index_by_key(existing);
    let mut result = Reconciliation::default();
    for host in desired {
        match index.get(&host.identity_key()) {
            Some(asset) => result.matched.push(MatchedHost {
                asset: (*asset).clone(),
                host,
            }),
            None => result.to_create.push(host),
        }
    }
    debug!(
        "Reconciled hosts: {} matched, {} to create",
        result.matched.len(),
        result.to_create.len()
    );
    result
}

/// Fetch credentials for document hosts that lack a username
///
/// Only hosts with an existing record are looked up; the record's
/// `credentialsName` names the entry. All lookups are issued together and
/// every one settles.
pub async fn recover_credentials(
    store: &dyn InventoryStoreTrait,
    document: &InstallConfigDocument,
    existing: &[BareMetalAsset],
) -> CredentialRecovery {
    let index = index_by_key(existing);
    let targets: Vec<(String, &BareMetalAsset)> = document
        .hosts_missing_credentials()
        .into_iter()
        .filter_map(|h| {
            let key = h.identity_key();
            index.get(&key).map(|asset| (key, *asset))
        })
        .collect();

    let mut recovery = CredentialRecovery::default();
    if targets.is_empty() {
        return recovery;
    }
    info!("Recovering credentials for {} host(s)", targets.len());

    let lookups = targets.into_iter().map(|(key, asset)| async move {
        let namespace = asset.namespace_or_default();
        let name = &asset.spec.bmc.credentials_name;
        debug!("Fetching credentials {}/{} for {}", namespace, name, key);
        let result = match store.get_secret(name, &namespace).await {
            Ok(secret) => credentials_from_secret(&secret)
                .map_err(|e| ItemError::new(e.to_string(), ErrorItem::Asset(asset.clone()))),
            Err(e) => Err(ItemError::from_store(&e, ErrorItem::Asset(asset.clone()))),
        };
        (key, result)
    });

    for (key, result) in join_all(lookups).await {
        match result {
            Ok(credentials) => {
                recovery.credentials.insert(key, credentials);
            }
            Err(error) => {
                warn!("Could not recover credentials for {}: {}", key, error.message);
                recovery.errors.push(error);
            }
        }
    }
    recovery
}

/// Copy recovered credentials onto matching desired hosts
pub fn apply_credentials(hosts: &mut [HostRequest], credentials: &HashMap<String, BmcCredentials>) {
    for host in hosts {
        if let Some(creds) = credentials.get(&host.identity_key()) {
            host.set_credentials(creds);
        }
    }
}

/// Unpack a record (and its credential entry) into an editable host request
///
/// A missing credential entry yields a host without credentials.
pub async fn load_host(
    store: &dyn InventoryStoreTrait,
    name: &str,
    namespace: &str,
) -> Result<HostRequest, SyncError> {
    let asset = store.get_asset(name, namespace).await?;
    let mut host = host_from_asset(&asset);

    match store.get_secret(&asset.spec.bmc.credentials_name, namespace).await {
        Ok(secret) => {
            host.bmc.username = decode_credential(secret.field(USERNAME_KEY))?;
            host.bmc.password = decode_credential(secret.field(PASSWORD_KEY))?;
        }
        Err(e) if e.is_not_found() => {
            debug!("No credential entry for {}/{}", namespace, name);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(host)
}

/// Host request view of a record, without credentials
pub fn host_from_asset(asset: &BareMetalAsset) -> HostRequest {
    HostRequest {
        name: asset.name_or_default(),
        namespace: asset.namespace_or_default(),
        role: asset.spec.role,
        boot_mac_address: asset.spec.boot_mac_address.clone(),
        bmc: BmcDetails {
            address: asset.spec.bmc.address.clone(),
            ..Default::default()
        },
        hardware_profile: asset.spec.hardware_profile.clone(),
    }
}
