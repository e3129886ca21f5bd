//! Runtime configuration, read from environment variables

use crate::error::SyncError;
use crds::WorkloadReference;
use std::env;
use std::path::PathBuf;

/// Name and namespace of the Secret carrying the install-config document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretLocation {
    pub name: String,
    pub namespace: String,
}

/// Settings for one sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// CSV host list to import (`HOSTS_CSV`)
    pub hosts_csv: PathBuf,
    /// Namespace to list existing records from; all when unset (`WATCH_NAMESPACE`)
    pub watch_namespace: Option<String>,
    /// `INSTALL_CONFIG_SECRET` / `INSTALL_CONFIG_NAMESPACE`
    pub install_config: Option<SecretLocation>,
    /// `OWNER_NAME` / `OWNER_NAMESPACE`; synced hosts are attached when set
    pub owner: Option<WorkloadReference>,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, SyncError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SyncError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let hosts_csv = get("HOSTS_CSV").map(PathBuf::from).ok_or_else(|| {
            SyncError::InvalidConfig("HOSTS_CSV environment variable is required".to_string())
        })?;

        let install_config = pair(
            get("INSTALL_CONFIG_SECRET"),
            get("INSTALL_CONFIG_NAMESPACE"),
            "INSTALL_CONFIG_SECRET",
            "INSTALL_CONFIG_NAMESPACE",
        )?
        .map(|(name, namespace)| SecretLocation { name, namespace });

        let owner = pair(get("OWNER_NAME"), get("OWNER_NAMESPACE"), "OWNER_NAME", "OWNER_NAMESPACE")?
            .map(|(name, namespace)| WorkloadReference::new(name, namespace));

        Ok(Self {
            hosts_csv,
            watch_namespace: get("WATCH_NAMESPACE"),
            install_config,
            owner,
        })
    }
}

fn pair(
    first: Option<String>,
    second: Option<String>,
    first_key: &str,
    second_key: &str,
) -> Result<Option<(String, String)>, SyncError> {
    match (first, second) {
        (Some(a), Some(b)) => Ok(Some((a, b))),
        (None, None) => Ok(None),
        _ => Err(SyncError::InvalidConfig(format!(
            "{} and {} must be set together",
            first_key, second_key
        ))),
    }
}
