//! Host requests: the caller-declared desired state for one inventory record

use crds::{BareMetalAsset, HostRole};
use std::collections::{BTreeMap, HashMap};

/// Suffix of the credentials Secret created for each host
pub const CREDENTIALS_SUFFIX: &str = "-bmc-secret";

/// Label stamped on every record this crate creates
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
/// Value of [`MANAGED_BY_LABEL`]
pub const MANAGED_BY: &str = "inventory-sync";

/// Desired state for one piece of inventory
///
/// Identity is `name-namespace`; two requests with the same key in one batch
/// are a caller error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostRequest {
    pub name: String,
    pub namespace: String,
    /// Optional until attach time
    pub role: Option<HostRole>,
    pub boot_mac_address: String,
    pub bmc: BmcDetails,
    pub hardware_profile: Option<String>,
}

/// BMC connection details, including transient plaintext credentials
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BmcDetails {
    pub address: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub disable_certificate_verification: bool,
}

// Keeps plaintext passwords out of logs and panic messages.
impl std::fmt::Debug for BmcDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BmcDetails")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("disable_certificate_verification", &self.disable_certificate_verification)
            .finish()
    }
}

/// Plaintext username/password pair
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BmcCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for BmcCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BmcCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HostRequest {
    /// Composite identity key (`name-namespace`)
    pub fn identity_key(&self) -> String {
        crds::identity_key(&self.name, &self.namespace)
    }

    /// Name of the credentials Secret backing this host
    pub fn credentials_name(&self) -> String {
        format!("{}{}", self.name, CREDENTIALS_SUFFIX)
    }

    /// Overwrite the plaintext credentials
    pub fn set_credentials(&mut self, credentials: &BmcCredentials) {
        self.bmc.username = credentials.username.clone();
        self.bmc.password = credentials.password.clone();
    }
}

/// Assets no workload has claimed yet
pub fn available_assets(records: &[BareMetalAsset]) -> Vec<BareMetalAsset> {
    records.iter().filter(|a| a.is_available()).cloned().collect()
}

/// Partition records by the role declared on the matching host request
///
/// Falls back to the role already on the record. Records with no role from
/// either source are left out; they cannot be attached.
pub fn group_by_role(
    records: &[BareMetalAsset],
    hosts: &[HostRequest],
) -> BTreeMap<HostRole, Vec<BareMetalAsset>> {
    let roles: HashMap<String, HostRole> = hosts
        .iter()
        .filter_map(|h| h.role.map(|r| (h.identity_key(), r)))
        .collect();

    let mut grouped: BTreeMap<HostRole, Vec<BareMetalAsset>> = BTreeMap::new();
    for record in records {
        let role = roles.get(&record.identity_key()).copied().or(record.spec.role);
        if let Some(role) = role {
            grouped.entry(role).or_default().push(record.clone());
        }
    }
    grouped
}
