//! BareMetalAsset Custom Resource Definition
//!
//! Inventory record for a single piece of bare-metal hardware. The BMC
//! credentials live in a separate Secret referenced by name from
//! `spec.bmc.credentialsName`.

use crate::references::WorkloadReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// BareMetalAssetSpec defines the desired state of an inventory record
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "dcops.microscaler.io",
    version = "v1alpha1",
    kind = "BareMetalAsset",
    namespaced,
    status = "BareMetalAssetStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct BareMetalAssetSpec {
    /// Baseboard management controller connection details
    pub bmc: BmcReference,

    /// MAC address of the NIC the host PXE boots from
    #[serde(rename = "bootMACAddress")]
    #[schemars(rename = "bootMACAddress")]
    pub boot_mac_address: String,

    /// Hardware profile used by the installer (e.g. "default")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_profile: Option<String>,

    /// Role the host plays in its owning workload (set on attach)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<HostRole>,

    /// Owning workload (set on attach). Unset means the asset is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<WorkloadReference>,
}

/// BMC address plus a by-name back-reference to the credentials Secret
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BmcReference {
    /// BMC address (ipmi://, idrac://, irmc://, redfish://...)
    pub address: String,

    /// Name of the Secret (same namespace) holding `username` and `password`
    pub credentials_name: String,
}

/// Role of a host inside its owning workload
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HostRole {
    Master,
    Worker,
}

impl HostRole {
    /// Wire value of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            HostRole::Master => "master",
            HostRole::Worker => "worker",
        }
    }

    /// Parse a role, ignoring case and surrounding whitespace
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "master" => Some(HostRole::Master),
            "worker" => Some(HostRole::Worker),
            _ => None,
        }
    }
}

impl std::fmt::Display for HostRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// BareMetalAssetStatus defines the observed state of an inventory record
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BareMetalAssetStatus {
    /// Conditions reported by the inventory operator
    #[serde(default)]
    pub conditions: Vec<AssetCondition>,
}

/// A single status condition
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetCondition {
    /// Condition type (e.g. "CredentialsFound")
    #[serde(rename = "type")]
    #[schemars(rename = "type")]
    pub type_: String,

    /// "True", "False" or "Unknown"
    pub status: String,

    /// Machine-readable reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition changed status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<chrono::DateTime<chrono::Utc>>,
}

impl BareMetalAsset {
    /// Identity key used to match assets against host requests (`name-namespace`)
    pub fn identity_key(&self) -> String {
        identity_key(
            self.metadata.name.as_deref().unwrap_or_default(),
            self.metadata.namespace.as_deref().unwrap_or_default(),
        )
    }

    /// Record name, empty when unset
    pub fn name_or_default(&self) -> String {
        self.metadata.name.clone().unwrap_or_default()
    }

    /// Record namespace, empty when unset
    pub fn namespace_or_default(&self) -> String {
        self.metadata.namespace.clone().unwrap_or_default()
    }

    /// True when no workload has claimed this asset
    pub fn is_available(&self) -> bool {
        self.spec.owner.is_none()
    }
}

/// Builds the composite identity key shared by host requests and assets
pub fn identity_key(name: &str, namespace: &str) -> String {
    format!("{}-{}", name, namespace)
}
