//! Cross-resource references for inventory CRDs

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to the workload that owns an inventory record
///
/// Set on `BareMetalAsset.spec.owner` by the attach step. The workload is
/// addressed by name and namespace only; no Kubernetes owner reference is
/// created, so deleting the workload does not garbage-collect the asset.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadReference {
    /// Name of the owning workload
    pub name: String,

    /// Namespace of the owning workload
    pub namespace: String,
}

impl WorkloadReference {
    /// Create a new reference
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}
