//! Inventory Sync
//!
//! One-shot run of the inventory pipeline against the cluster:
//! - Imports the desired hosts from a CSV file
//! - Recovers credentials missing from the install-config Secret, or seeds
//!   the Secret with the synced hosts when it has no document yet
//! - Creates namespaces, credential Secrets and BareMetalAssets for new hosts
//! - Optionally attaches the synced hosts to an owning workload, per role

use inventory_client::{InventoryStoreTrait, KubeInventoryStore};
use inventory_sync::codec::{INSTALL_CONFIG_KEY, seed_document};
use inventory_sync::config::SyncConfig;
use inventory_sync::csv_import::{UuidGenerator, import_from_text};
use inventory_sync::hosts::group_by_role;
use inventory_sync::{SyncError, attach_hosts, sync_hosts};
use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), SyncError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Inventory Sync");

    let config = SyncConfig::from_env()?;
    info!("Configuration:");
    info!("  Hosts CSV: {}", config.hosts_csv.display());
    info!("  Namespace: {}", config.watch_namespace.as_deref().unwrap_or("all namespaces"));
    if let Some(location) = &config.install_config {
        info!("  Install config: {}/{}", location.namespace, location.name);
    }
    if let Some(owner) = &config.owner {
        info!("  Owner: {}/{}", owner.namespace, owner.name);
    }

    let raw = tokio::fs::read_to_string(&config.hosts_csv).await?;
    let import = import_from_text(&raw, &mut UuidGenerator)?;
    if import.skipped_rows > 0 {
        warn!("Skipped {} malformed row(s) in {}", import.skipped_rows, config.hosts_csv.display());
    }
    let desired = import.into_hosts();
    info!("Imported {} host(s)", desired.len());

    let store = KubeInventoryStore::try_default().await?;
    let existing = store.list_assets(config.watch_namespace.as_deref()).await?;

    let install_secret = match &config.install_config {
        Some(location) => Some(store.get_secret(&location.name, &location.namespace).await?),
        None => None,
    };
    let document = install_secret.as_ref().and_then(|s| s.field(INSTALL_CONFIG_KEY));

    let outcome = sync_hosts(&store, desired, &existing, document).await?;

    for failure in outcome.credential_errors.iter().chain(&outcome.errors) {
        error!("{}: {}", failure.key(), failure.message);
    }

    // A Secret without a document is seeded with the synced hosts
    let replacement = match (&outcome.install_document, document) {
        (Some(encoded), _) => Some(encoded.clone()),
        (None, None) if install_secret.is_some() => Some(seed_document(&outcome.hosts)?),
        _ => None,
    };
    if let (Some(encoded), Some(location)) = (replacement, &config.install_config) {
        let patch = json!({ "data": { INSTALL_CONFIG_KEY: encoded } });
        store.patch_secret(&location.name, &location.namespace, &patch).await?;
        info!("Updated install config {}/{}", location.namespace, location.name);
    }

    if let Some(owner) = &config.owner {
        let working = outcome.working_inventory();
        let grouped = group_by_role(&working, &outcome.hosts);
        let unroled = working.len() - grouped.values().map(Vec::len).sum::<usize>();
        if unroled > 0 {
            warn!("{} host(s) have no role and were not attached", unroled);
        }
        for (role, records) in &grouped {
            for failure in attach_hosts(&store, records, *role, owner).await {
                error!("Attach {}: {}", failure.key, failure.message);
            }
        }
    }

    let failed = outcome.failed_hosts();
    info!(
        "Inventory sync complete: {} matched, {} created, {} failed",
        outcome.matched.len(),
        outcome.created.len(),
        failed
    );
    if failed > 0 {
        return Err(SyncError::Incomplete { failed });
    }
    Ok(())
}
