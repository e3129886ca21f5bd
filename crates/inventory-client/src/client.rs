//! Kubernetes-backed inventory store
//!
//! Implements `InventoryStoreTrait` on top of `kube::Api`. Secrets are moved
//! between the `OpaqueSecret` wire view and `k8s_openapi` `Secret` through
//! their shared JSON form, so data values stay base64 text on our side.

use crate::error::StoreError;
use crate::store_trait::InventoryStoreTrait;
use crds::{BareMetalAsset, OpaqueSecret};
use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client};
use tracing::debug;

/// Inventory store client talking to the Kubernetes API server
#[derive(Clone)]
pub struct KubeInventoryStore {
    client: Client,
}

impl KubeInventoryStore {
    /// Wrap an existing Kubernetes client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient kubeconfig / in-cluster environment
    pub async fn try_default() -> Result<Self, StoreError> {
        let client = Client::try_default().await?;
        Ok(Self::new(client))
    }

    fn assets(&self, namespace: &str) -> Api<BareMetalAsset> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Namespace a record must carry to be created
fn record_namespace<'a>(metadata: &'a ObjectMeta, kind: &str) -> Result<&'a str, StoreError> {
    metadata
        .namespace
        .as_deref()
        .ok_or_else(|| StoreError::InvalidRecord(format!("{} has no namespace", kind)))
}

fn to_core_secret(secret: &OpaqueSecret) -> Result<Secret, StoreError> {
    Ok(serde_json::from_value(serde_json::to_value(secret)?)?)
}

fn from_core_secret(secret: &Secret) -> Result<OpaqueSecret, StoreError> {
    Ok(serde_json::from_value(serde_json::to_value(secret)?)?)
}

#[async_trait::async_trait]
impl InventoryStoreTrait for KubeInventoryStore {
    async fn list_assets(&self, namespace: Option<&str>) -> Result<Vec<BareMetalAsset>, StoreError> {
        let api: Api<BareMetalAsset> = match namespace {
            Some(ns) => self.assets(ns),
            None => Api::all(self.client.clone()),
        };
        debug!("Listing BareMetalAssets in {}", namespace.unwrap_or("all namespaces"));
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn get_asset(&self, name: &str, namespace: &str) -> Result<BareMetalAsset, StoreError> {
        debug!("Getting BareMetalAsset {}/{}", namespace, name);
        Ok(self.assets(namespace).get(name).await?)
    }

    async fn create_asset(&self, asset: &BareMetalAsset) -> Result<BareMetalAsset, StoreError> {
        let namespace = record_namespace(&asset.metadata, "BareMetalAsset")?;
        debug!(
            "Creating BareMetalAsset {}/{}",
            namespace,
            asset.metadata.name.as_deref().unwrap_or_default()
        );
        Ok(self.assets(namespace).create(&PostParams::default(), asset).await?)
    }

    async fn patch_asset(&self, name: &str, namespace: &str, patch: &serde_json::Value) -> Result<BareMetalAsset, StoreError> {
        debug!("Patching BareMetalAsset {}/{}", namespace, name);
        Ok(self
            .assets(namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await?)
    }

    async fn get_secret(&self, name: &str, namespace: &str) -> Result<OpaqueSecret, StoreError> {
        debug!("Getting Secret {}/{}", namespace, name);
        let secret = self.secrets(namespace).get(name).await?;
        from_core_secret(&secret)
    }

    async fn create_secret(&self, secret: &OpaqueSecret) -> Result<OpaqueSecret, StoreError> {
        let namespace = record_namespace(&secret.metadata, "Secret")?;
        debug!(
            "Creating Secret {}/{}",
            namespace,
            secret.metadata.name.as_deref().unwrap_or_default()
        );
        let created = self
            .secrets(namespace)
            .create(&PostParams::default(), &to_core_secret(secret)?)
            .await?;
        from_core_secret(&created)
    }

    async fn patch_secret(&self, name: &str, namespace: &str, patch: &serde_json::Value) -> Result<OpaqueSecret, StoreError> {
        debug!("Patching Secret {}/{}", namespace, name);
        let patched = self
            .secrets(namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        from_core_secret(&patched)
    }

    async fn create_namespace(&self, name: &str) -> Result<(), StoreError> {
        debug!("Creating Namespace {}", name);
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.create(&PostParams::default(), &namespace).await?;
        Ok(())
    }
}
