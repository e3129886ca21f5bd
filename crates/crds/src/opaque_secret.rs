//! Wire view of a core/v1 Secret
//!
//! `data` values are kept exactly as they travel over the API: base64 text.
//! This is the representation the credential codec works against, for both
//! BMC credential entries and the configuration Secret that embeds the
//! install-config document.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of the BMC username in a credentials Secret
pub const USERNAME_KEY: &str = "username";
/// Key of the BMC password in a credentials Secret
pub const PASSWORD_KEY: &str = "password";
/// Key of the embedded document in the install configuration Secret
pub const INSTALL_CONFIG_KEY: &str = "install-config.yaml";
/// Secret type used for everything this workspace creates
pub const OPAQUE_SECRET_TYPE: &str = "Opaque";

/// Secret with base64-encoded data values
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpaqueSecret {
    /// Always "v1"
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Always "Secret"
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Standard object metadata
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// Secret type (e.g. "Opaque")
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// Base64-encoded values keyed by field name
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_kind() -> String {
    "Secret".to_string()
}

impl OpaqueSecret {
    /// Create an empty Opaque Secret with the given name and namespace
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some(namespace.into()),
                ..Default::default()
            },
            type_: Some(OPAQUE_SECRET_TYPE.to_string()),
            data: BTreeMap::new(),
        }
    }

    /// Raw (still encoded) value of a data field
    pub fn field(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}
