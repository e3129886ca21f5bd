//! Credential and install-config codec
//!
//! Secret data values are standard base64 with padding. The install-config
//! document travels as base64 YAML under [`INSTALL_CONFIG_KEY`]; hosts live at
//! `platform.baremetal.hosts[]`.

use crate::hosts::{BmcCredentials, HostRequest, MANAGED_BY, MANAGED_BY_LABEL};
use crate::provisioner::DEFAULT_HARDWARE_PROFILE;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use crds::{OpaqueSecret, PASSWORD_KEY, USERNAME_KEY};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

pub use crds::INSTALL_CONFIG_KEY;

/// Errors raised while decoding secret payloads
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decoded value is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid install-config document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("credentials secret {0} has no username")]
    MissingUsername(String),
}

/// Encode a plaintext credential. `None` stays `None`; `""` encodes to `""`.
pub fn encode_credential(plaintext: Option<&str>) -> Option<String> {
    plaintext.map(|p| STANDARD.encode(p.as_bytes()))
}

/// Decode a base64 credential. `None` stays `None`; `""` decodes to `""`.
pub fn decode_credential(encoded: Option<&str>) -> Result<Option<String>, CodecError> {
    encoded
        .map(|e| {
            let bytes = STANDARD.decode(e.trim())?;
            Ok(String::from_utf8(bytes)?)
        })
        .transpose()
}

/// Build the Opaque credentials Secret for a host
///
/// The Secret is named after the host and lives in the host's namespace.
/// Absent credentials are left out of `data`.
pub fn credentials_secret(host: &HostRequest) -> OpaqueSecret {
    let mut secret = OpaqueSecret::new(host.credentials_name(), host.namespace.clone());
    secret.metadata.labels = Some(BTreeMap::from([(
        MANAGED_BY_LABEL.to_string(),
        MANAGED_BY.to_string(),
    )]));
    if let Some(username) = encode_credential(host.bmc.username.as_deref()) {
        secret.data.insert(USERNAME_KEY.to_string(), username);
    }
    if let Some(password) = encode_credential(host.bmc.password.as_deref()) {
        secret.data.insert(PASSWORD_KEY.to_string(), password);
    }
    secret
}

/// Recover plaintext credentials from a credentials Secret
pub fn credentials_from_secret(secret: &OpaqueSecret) -> Result<BmcCredentials, CodecError> {
    let username = decode_credential(secret.field(USERNAME_KEY))?;
    if username.as_deref().is_none_or(str::is_empty) {
        let name = secret.metadata.name.clone().unwrap_or_default();
        return Err(CodecError::MissingUsername(name));
    }
    Ok(BmcCredentials {
        username,
        password: decode_credential(secret.field(PASSWORD_KEY))?,
    })
}

/// A host entry read out of the install-config document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHost {
    pub name: String,
    pub namespace: String,
    pub username: Option<String>,
}

impl DocumentHost {
    pub fn identity_key(&self) -> String {
        crds::identity_key(&self.name, &self.namespace)
    }

    /// Null, missing and empty usernames all count as missing
    pub fn lacks_username(&self) -> bool {
        self.username.as_deref().is_none_or(str::is_empty)
    }
}

/// Decoded install-config document
///
/// Only the host list is interpreted; everything else is carried through
/// untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallConfigDocument(Value);

impl InstallConfigDocument {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    fn host_entries(&self) -> &[Value] {
        self.0
            .get("platform")
            .and_then(|p| p.get("baremetal"))
            .and_then(|b| b.get("hosts"))
            .and_then(Value::as_sequence)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Hosts declared under `platform.baremetal.hosts`
    pub fn hosts(&self) -> Vec<DocumentHost> {
        self.host_entries().iter().filter_map(document_host).collect()
    }

    /// Hosts whose BMC username is missing, null or empty
    pub fn hosts_missing_credentials(&self) -> Vec<DocumentHost> {
        self.hosts().into_iter().filter(DocumentHost::lacks_username).collect()
    }

    /// Copy of the document with credentials filled in
    ///
    /// `credentials` is keyed by host identity key. Only hosts lacking a
    /// username are touched; the receiver is left unchanged.
    pub fn with_host_credentials(&self, credentials: &HashMap<String, BmcCredentials>) -> Self {
        let mut value = self.0.clone();
        let hosts = value
            .get_mut("platform")
            .and_then(|p| p.get_mut("baremetal"))
            .and_then(|b| b.get_mut("hosts"))
            .and_then(Value::as_sequence_mut);

        for entry in hosts.into_iter().flatten() {
            let Some(host) = document_host(entry) else {
                continue;
            };
            if !host.lacks_username() {
                continue;
            }
            let Some(creds) = credentials.get(&host.identity_key()) else {
                continue;
            };
            let Some(map) = entry.as_mapping_mut() else {
                continue;
            };
            if !map.get("bmc").is_some_and(Value::is_mapping) {
                map.insert(Value::from("bmc"), Value::Mapping(Mapping::new()));
            }
            if let Some(bmc) = map.get_mut("bmc").and_then(Value::as_mapping_mut) {
                bmc.insert(Value::from("username"), optional_string(&creds.username));
                bmc.insert(Value::from("password"), optional_string(&creds.password));
            }
        }
        Self(value)
    }

    /// Copy of the document listing exactly `hosts` under
    /// `platform.baremetal.hosts`, creating the path when absent
    pub fn with_hosts(&self, hosts: &[HostRequest]) -> Self {
        let mut value = self.0.clone();
        if !value.is_mapping() {
            value = Value::Mapping(Mapping::new());
        }
        if !value["platform"].is_mapping() {
            value["platform"] = Value::Mapping(Mapping::new());
        }
        if !value["platform"]["baremetal"].is_mapping() {
            value["platform"]["baremetal"] = Value::Mapping(Mapping::new());
        }
        value["platform"]["baremetal"]["hosts"] =
            Value::Sequence(hosts.iter().map(host_descriptor).collect());
        Self(value)
    }
}

/// Install-config descriptor for one host, credentials in plaintext
pub fn host_descriptor(host: &HostRequest) -> Value {
    let mut bmc = Mapping::new();
    bmc.insert(Value::from("address"), Value::from(host.bmc.address.as_str()));
    bmc.insert(
        Value::from("disableCertificateVerification"),
        Value::from(host.bmc.disable_certificate_verification),
    );
    bmc.insert(Value::from("username"), optional_string(&host.bmc.username));
    bmc.insert(Value::from("password"), optional_string(&host.bmc.password));

    let mut entry = Mapping::new();
    entry.insert(Value::from("name"), Value::from(host.name.as_str()));
    entry.insert(Value::from("namespace"), Value::from(host.namespace.as_str()));
    if let Some(role) = host.role {
        entry.insert(Value::from("role"), Value::from(role.as_str()));
    }
    entry.insert(Value::from("bmc"), Value::Mapping(bmc));
    entry.insert(Value::from("bootMACAddress"), Value::from(host.boot_mac_address.as_str()));
    entry.insert(
        Value::from("hardwareProfile"),
        Value::from(host.hardware_profile.as_deref().unwrap_or(DEFAULT_HARDWARE_PROFILE)),
    );
    Value::Mapping(entry)
}

fn optional_string(value: &Option<String>) -> Value {
    value.as_deref().map(Value::from).unwrap_or(Value::Null)
}

fn document_host(entry: &Value) -> Option<DocumentHost> {
    let name = entry.get("name")?.as_str()?.to_string();
    let namespace = entry
        .get("namespace")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let username = entry
        .get("bmc")
        .and_then(|b| b.get("username"))
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(DocumentHost { name, namespace, username })
}

/// Decode a base64 YAML install-config document
pub fn decode_document(encoded: &str) -> Result<InstallConfigDocument, CodecError> {
    let bytes = STANDARD.decode(encoded.trim())?;
    let text = String::from_utf8(bytes)?;
    Ok(InstallConfigDocument(serde_yaml::from_str(&text)?))
}

/// Encode an install-config document as base64 YAML
pub fn encode_document(document: &InstallConfigDocument) -> Result<String, CodecError> {
    let text = serde_yaml::to_string(&document.0)?;
    Ok(STANDARD.encode(text.as_bytes()))
}

/// Encoded document listing only `hosts`, for a Secret that has none yet
pub fn seed_document(hosts: &[HostRequest]) -> Result<String, CodecError> {
    encode_document(&InstallConfigDocument::default().with_hosts(hosts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_credential_known_values() {
        assert_eq!(encode_credential(Some("root")).as_deref(), Some("cm9vdA=="));
        assert_eq!(
            decode_credential(Some("cm9vdA==")).unwrap().as_deref(),
            Some("root")
        );
    }

    #[test]
    fn test_credential_absent_and_empty() {
        assert_eq!(encode_credential(None), None);
        assert_eq!(decode_credential(None).unwrap(), None);
        assert_eq!(encode_credential(Some("")).as_deref(), Some(""));
        assert_eq!(decode_credential(Some("")).unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_credential_roundtrip_unicode() {
        for value in ["p@ss:w0rd/+=", "пароль", "🔑 key"] {
            let encoded = encode_credential(Some(value));
            let decoded = decode_credential(encoded.as_deref()).unwrap();
            assert_eq!(decoded.as_deref(), Some(value));
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_credential(Some("not base64!")),
            Err(CodecError::Base64(_))
        ));
        // Valid base64 of bytes that are not UTF-8
        assert!(matches!(
            decode_credential(Some("/w==")),
            Err(CodecError::Utf8(_))
        ));
    }

    #[test]
    fn test_credentials_secret_shape() {
        let host = create_test_host("host-0", "lab");
        let secret = credentials_secret(&host);

        assert_eq!(secret.metadata.name.as_deref(), Some("host-0-bmc-secret"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("lab"));
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));
        assert_eq!(secret.field(USERNAME_KEY), Some("YWRtaW4="));
        assert_eq!(secret.field(PASSWORD_KEY), Some("czNjcmV0"));
    }

    #[test]
    fn test_credentials_secret_omits_absent() {
        let mut host = create_test_host("host-0", "lab");
        host.bmc.password = None;
        let secret = credentials_secret(&host);
        assert!(secret.field(PASSWORD_KEY).is_none());
        assert!(secret.field(USERNAME_KEY).is_some());
    }

    #[test]
    fn test_credentials_from_secret() {
        let host = create_test_host("host-0", "lab");
        let creds = credentials_from_secret(&credentials_secret(&host)).unwrap();
        assert_eq!(creds.username.as_deref(), Some("admin"));
        assert_eq!(creds.password.as_deref(), Some("s3cret"));

        let empty = OpaqueSecret::new("host-1-bmc-secret", "lab");
        assert!(matches!(
            credentials_from_secret(&empty),
            Err(CodecError::MissingUsername(name)) if name == "host-1-bmc-secret"
        ));
    }

    #[test]
    fn test_document_hosts() {
        let doc = decode_document(&encoded_install_config()).unwrap();
        let hosts = doc.hosts();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].identity_key(), "host-0-lab");
        assert!(hosts[0].lacks_username());
        assert_eq!(hosts[1].username.as_deref(), Some("ops"));
        assert_eq!(doc.hosts_missing_credentials().len(), 1);
    }

    #[test]
    fn test_with_host_credentials_is_pure() {
        let doc = decode_document(&encoded_install_config()).unwrap();
        let creds = HashMap::from([
            (
                "host-0-lab".to_string(),
                BmcCredentials {
                    username: Some("admin".to_string()),
                    password: Some("s3cret".to_string()),
                },
            ),
            (
                "host-1-lab".to_string(),
                BmcCredentials {
                    username: Some("ignored".to_string()),
                    password: None,
                },
            ),
        ]);

        let updated = doc.with_host_credentials(&creds);

        assert_ne!(updated, doc);
        assert!(doc.hosts()[0].lacks_username());
        let hosts = updated.hosts();
        assert_eq!(hosts[0].username.as_deref(), Some("admin"));
        assert_eq!(hosts[1].username.as_deref(), Some("ops"));
        let bmc = &updated.as_value()["platform"]["baremetal"]["hosts"][0]["bmc"];
        assert_eq!(bmc["password"].as_str(), Some("s3cret"));
        assert_eq!(bmc["address"].as_str(), Some("redfish://10.0.0.10"));
        // Untouched keys are carried through
        assert_eq!(updated.as_value()["metadata"]["name"].as_str(), Some("cluster-a"));
    }

    #[test]
    fn test_document_roundtrip() {
        let doc = decode_document(&encoded_install_config()).unwrap();
        let again = decode_document(&encode_document(&doc).unwrap()).unwrap();
        assert_eq!(again, doc);
    }

    #[test]
    fn test_decode_document_errors() {
        assert!(matches!(decode_document("%%%"), Err(CodecError::Base64(_))));
        let bad_yaml = STANDARD.encode("hosts: [unterminated");
        assert!(matches!(decode_document(&bad_yaml), Err(CodecError::Yaml(_))));
    }

    #[test]
    fn test_document_without_hosts() {
        let doc = decode_document(&STANDARD.encode("apiVersion: v1\n")).unwrap();
        assert!(doc.hosts().is_empty());
        assert_eq!(doc.with_host_credentials(&HashMap::new()), doc);
    }

    #[test]
    fn test_with_hosts_writes_descriptors() {
        let doc = decode_document(&STANDARD.encode("metadata:\n  name: cluster-b\n")).unwrap();
        let mut host = create_test_host("host-9", "lab");
        host.role = Some(crds::HostRole::Worker);
        host.bmc.disable_certificate_verification = true;

        let updated = doc.with_hosts(&[host]);

        let entry = &updated.as_value()["platform"]["baremetal"]["hosts"][0];
        assert_eq!(entry["name"].as_str(), Some("host-9"));
        assert_eq!(entry["role"].as_str(), Some("worker"));
        assert_eq!(entry["bootMACAddress"].as_str(), Some("aa:bb:cc:dd:ee:09"));
        assert_eq!(entry["hardwareProfile"].as_str(), Some("default"));
        assert_eq!(entry["bmc"]["disableCertificateVerification"].as_bool(), Some(true));
        assert_eq!(entry["bmc"]["username"].as_str(), Some("admin"));
        assert_eq!(updated.as_value()["metadata"]["name"].as_str(), Some("cluster-b"));
        assert_eq!(updated.hosts().len(), 1);
    }

    #[test]
    fn test_seed_document() {
        let mut host = create_test_host("host-3", "lab");
        host.hardware_profile = Some("dell".to_string());

        let doc = decode_document(&seed_document(&[host]).unwrap()).unwrap();

        let hosts = doc.hosts();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].identity_key(), "host-3-lab");
        assert_eq!(hosts[0].username.as_deref(), Some("admin"));
        let entry = &doc.as_value()["platform"]["baremetal"]["hosts"][0];
        assert_eq!(entry["hardwareProfile"].as_str(), Some("dell"));
        assert_eq!(entry["bmc"]["disableCertificateVerification"].as_bool(), Some(false));
        assert!(entry.get("role").is_none());
    }

    #[test]
    fn test_document_roundtrip_odd_values() {
        let yaml = r#"apiVersion: v1
metadata:
  name: "0123"
  annotations:
    build: "42"
    empty: null
    tilde: ~
sshKey: !secret ref-1
networking:
  machineCIDR: 10.0.0.0/16
  replicas: 3
  ratio: 0.5
  enabled: yes
platform:
  baremetal:
    apiVIP: "10.0.0.5"
    hosts:
      - name: host-0
        namespace: lab
        bmc:
          address: 'ipmi://10.0.0.10:623'
          username: ""
          password: null
"#;
        let doc = decode_document(&STANDARD.encode(yaml)).unwrap();
        let again = decode_document(&encode_document(&doc).unwrap()).unwrap();

        assert_eq!(again, doc);
        assert_eq!(again.as_value()["metadata"]["name"].as_str(), Some("0123"));
        assert_eq!(again.as_value()["metadata"]["annotations"]["build"].as_str(), Some("42"));
        assert!(again.as_value()["metadata"]["annotations"]["tilde"].is_null());
        assert!(matches!(again.as_value()["sshKey"], Value::Tagged(_)));
        assert!(again.hosts()[0].lacks_username());
    }
}
