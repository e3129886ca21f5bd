//! InventoryStoreTrait for mocking
//!
//! This trait abstracts the resource store so the orchestration code can run
//! against the Kubernetes API in production and an in-memory mock in tests.

use crate::error::StoreError;
use crds::{BareMetalAsset, OpaqueSecret};

/// Trait for resource store operations
///
/// Every call is a suspension point. Dropping the returned future abandons
/// the request; requests already sent are not rolled back.
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait InventoryStoreTrait: Send + Sync {
    // Inventory records
    async fn list_assets(&self, namespace: Option<&str>) -> Result<Vec<BareMetalAsset>, StoreError>;
    async fn get_asset(&self, name: &str, namespace: &str) -> Result<BareMetalAsset, StoreError>;
    async fn create_asset(&self, asset: &BareMetalAsset) -> Result<BareMetalAsset, StoreError>;
    /// Apply a JSON merge patch to an asset
    async fn patch_asset(&self, name: &str, namespace: &str, patch: &serde_json::Value) -> Result<BareMetalAsset, StoreError>;

    // Secrets
    async fn get_secret(&self, name: &str, namespace: &str) -> Result<OpaqueSecret, StoreError>;
    async fn create_secret(&self, secret: &OpaqueSecret) -> Result<OpaqueSecret, StoreError>;
    /// Apply a JSON merge patch to a secret
    async fn patch_secret(&self, name: &str, namespace: &str, patch: &serde_json::Value) -> Result<OpaqueSecret, StoreError>;

    // Namespaces
    /// Create a namespace; an existing namespace surfaces as a 409 `StoreError::Api`
    async fn create_namespace(&self, name: &str) -> Result<(), StoreError>;
}
