//! Test utilities for unit testing the sync pipeline
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::csv_import::IdGenerator;
use crate::hosts::{BmcDetails, HostRequest};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use crds::{BareMetalAsset, BareMetalAssetSpec, BmcReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Deterministic ids: `row-1`, `row-2`, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: u64,
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> String {
        self.next += 1;
        format!("row-{}", self.next)
    }
}

fn test_mac(name: &str) -> String {
    let index: u8 = name
        .rsplit('-')
        .next()
        .and_then(|suffix| suffix.parse().ok())
        .unwrap_or(0);
    format!("aa:bb:cc:dd:ee:{:02x}", index)
}

/// Helper to create a host request with credentials `admin` / `s3cret`
pub fn create_test_host(name: &str, namespace: &str) -> HostRequest {
    HostRequest {
        name: name.to_string(),
        namespace: namespace.to_string(),
        role: None,
        boot_mac_address: test_mac(name),
        bmc: BmcDetails {
            address: "redfish://10.0.0.10".to_string(),
            username: Some("admin".to_string()),
            password: Some("s3cret".to_string()),
            disable_certificate_verification: false,
        },
        hardware_profile: None,
    }
}

/// Helper to create an unowned asset referencing `<name>-bmc-secret`
pub fn create_test_asset(name: &str, namespace: &str) -> BareMetalAsset {
    BareMetalAsset {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: BareMetalAssetSpec {
            bmc: BmcReference {
                address: "redfish://10.0.0.10".to_string(),
                credentials_name: format!("{}-bmc-secret", name),
            },
            boot_mac_address: test_mac(name),
            ..Default::default()
        },
        status: None,
    }
}

/// Install-config with two hosts in `lab`: `host-0` without credentials and
/// `host-1` with its own
pub const INSTALL_CONFIG_YAML: &str = r#"apiVersion: v1
metadata:
  name: cluster-a
platform:
  baremetal:
    hosts:
      - name: host-0
        namespace: lab
        role: master
        bmc:
          address: redfish://10.0.0.10
          disableCertificateVerification: true
          username: null
          password: null
        bootMACAddress: aa:bb:cc:dd:ee:00
        hardwareProfile: default
      - name: host-1
        namespace: lab
        role: worker
        bmc:
          address: redfish://10.0.0.11
          disableCertificateVerification: true
          username: ops
          password: hunter2
        bootMACAddress: aa:bb:cc:dd:ee:01
        hardwareProfile: default
"#;

/// [`INSTALL_CONFIG_YAML`], base64 encoded
pub fn encoded_install_config() -> String {
    STANDARD.encode(INSTALL_CONFIG_YAML)
}
